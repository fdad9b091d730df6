//! Options for the tagbind demo application.
//!
//! [`DemoConfig`] derives [`confique::Config`] so its defaults and doc
//! comments live on the struct; [`Bind`] turns them into flags through
//! [`Tags::from_meta`]. The `server` section is nested and registers its
//! fields on the same flag set.
//!
//! | Flag                | Env var                 | Config key          |
//! |---------------------|-------------------------|---------------------|
//! | `--name`            | `DEMO_NAME`             | `name`              |
//! | `--verbose`         | `DEMO_VERBOSE`          | `verbose`           |
//! | `--greetings`       | `DEMO_GREETINGS`        | `greetings`         |
//! | `--host`            | `DEMO_HOST`             | `host`              |
//! | `--port`            | `DEMO_PORT`             | `port`              |

use confique::Config;
use serde::{Deserialize, Serialize};
use tagbind::{Bind, Tags};

#[derive(Config, Serialize, Deserialize, Debug)]
pub struct DemoConfig {
    /// Name shown in the banner.
    #[config(default = "tagbind-demo")]
    pub name: String,

    /// Log what tagbind binds and injects.
    #[config(default = false)]
    pub verbose: bool,

    /// Greetings to print, comma separated in env vars.
    #[config(default = ["hello", "hi"])]
    pub greetings: Vec<String>,

    #[config(nested)]
    pub server: ServerConfig,
}

#[derive(Config, Serialize, Deserialize, Debug)]
pub struct ServerConfig {
    /// Host to pretend to listen on.
    #[config(default = "127.0.0.1")]
    pub host: String,

    /// Port to pretend to listen on.
    #[config(default = 8080)]
    pub port: u16,
}

impl Bind for DemoConfig {
    fn tags() -> Tags {
        Tags::from_meta(&DemoConfig::META)
    }
}
