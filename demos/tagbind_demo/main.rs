//! # tagbind demo application
//!
//! A small CLI whose options come from flags, `DEMO_*` environment variables
//! and an optional `tagbind-demo.toml` in the working directory. It exists
//! to exercise tagbind by hand.
//!
//! ```sh
//! cargo run --example tagbind_demo
//! cargo run --example tagbind_demo -- --port 9000 --greetings hey --greetings yo
//! DEMO_HOST=0.0.0.0 cargo run --example tagbind_demo -- --verbose
//! echo 'port = 7000' > tagbind-demo.toml && cargo run --example tagbind_demo
//! ```

mod config;

use std::error::Error;

use confique::Config;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tagbind::{FlagSet, SearchPath, Source, Tagbind, TagbindError};

use config::DemoConfig;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    // Logging has to be up before flags are bound, so peek at the raw args.
    init_tracing(args.iter().any(|a| a == "--verbose" || a == "--verbose=true"));

    let mut config = DemoConfig::builder().load()?;
    let mut flags = FlagSet::new();
    tagbind::register(&mut flags, &config)?;

    match flags.parse_from(args.iter()) {
        Ok(()) => {}
        Err(TagbindError::Cli(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    }

    let file = Source::builder()
        .app_name("tagbind-demo")
        .search_paths(vec![SearchPath::Cwd])
        .build()?;

    Tagbind::builder::<DemoConfig>()
        .env_prefix("demo")
        .source(file)
        .resolve_into(&mut flags, &mut config)?;

    println!("{} listening on {}:{}", config.name, config.server.host, config.server.port);
    for greeting in &config.greetings {
        println!("  {greeting}");
    }
    if config.verbose {
        for flag in flags.iter() {
            println!("  --{} = {} ({:?})", flag.name(), flag.value(), flag.source());
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
