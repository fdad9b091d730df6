//! Bind command-line flags, environment variables and config files to the
//! fields of a plain struct.
//!
//! Tag the fields you want exposed, register them on a [`FlagSet`], and
//! tagbind fills the struct from whichever source has a value:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize, Default)]
//! struct Options {
//!     host: String,
//!     port: u16,
//!     tags: Vec<String>,
//! }
//!
//! impl Bind for Options {
//!     fn tags() -> Tags {
//!         Tags::new()
//!             .field("host", FieldTag::new("host").short('H').default_value("localhost"))
//!             .field("port", FieldTag::new("port").default_value("8080"))
//!             .field("tags", FieldTag::new("tag").desc("repeatable label").optional())
//!     }
//! }
//!
//! let opts: Options = Tagbind::builder().prefix("app").parse()?;
//! ```
//!
//! That call registers `--host`, `--port` and `--tag`, parses the process
//! arguments with clap, consults `APP_HOST`, `APP_PORT` and `APP_TAG` (and
//! any config source you attach), and hands back a populated `Options`.
//!
//! # Precedence
//!
//! ```text
//! Tag defaults          default:"..."
//!        ↑ overridden by
//! Lookup sources        config files, bound environment variables
//!        ↑ overridden by
//! Command line          only flags the user actually passed
//! ```
//!
//! A flag counts as set on the command line only when its
//! [`ValueSource`] is `CommandLine`. Values injected from a source are marked
//! `Lookup`, so a later source can still replace them.
//!
//! # Three stages
//!
//! The builder is a thin chain over three free functions, usable on their
//! own:
//!
//! 1. [`register`] walks the tagged fields and adds one typed flag per
//!    field: string, bool, int (any integer width) or string array. A
//!    struct-typed field tagged with [`Tags::nested`] registers its own
//!    fields on the same flag set, one level deep.
//! 2. [`bind`] derives a lookup key (`prefix-flag`) and an environment
//!    variable (`PREFIX_FLAG`, optionally behind an env prefix) per flag,
//!    binds them on each [`LookupSource`], and injects values into flags the
//!    command line left alone.
//! 3. [`populate`] copies every flag value into its field. Assignment is all
//!    or nothing: on error the destination is left as it was.
//!
//! # Tags without reflection
//!
//! Field kinds are learned by running the struct's `Deserialize` impl
//! against an inspecting deserializer, so they depend on the type alone and
//! any `Serialize + Deserialize` struct can be bound. The tag table is supplied by [`Bind::tags`], built by hand, parsed
//! from struct-tag strings (`arg:"db-host" short:"d" default:"x"`), or
//! derived from a [confique](https://docs.rs/confique) `Config` with
//! [`Tags::from_meta`].
//!
//! # Config files
//!
//! [`Source::builder`] discovers TOML files the same way across platforms.
//! [`SearchPath`] lists directories in priority-ascending order and
//! [`SearchMode`] chooses between merging every file found and keeping only
//! the nearest one. Keys are matched case-insensitively.
//!
//! # Clap adapter
//!
//! With the `clap` feature (on by default) a [`FlagSet`] can build a
//! runtime `clap::Command` and apply parsed matches. Without it the core
//! works with programmatic [`FlagSet::set`] calls:
//!
//! ```toml
//! tagbind = { version = "...", default-features = false }
//! ```
//!
//! # Error handling
//!
//! All fallible operations return [`TagbindError`]. Nothing is retried; a
//! binding error is meant to stop startup.

pub mod error;
pub mod types;

mod binder;
mod builder;
#[cfg(feature = "clap")]
mod cli;
mod content;
mod file;
mod flags;
pub(crate) mod merge;
mod populate;
mod probe;
mod register;
mod schema;
pub mod source;
mod tag;

#[cfg(test)]
mod fixtures;

pub use binder::{BindOptions, bind, env_var_name, lookup_key};
pub use builder::{Tagbind, TagbindBuilder};
pub use error::TagbindError;
pub use flags::{Flag, FlagKind, FlagSet, FlagValue, ValueSource};
pub use populate::{populate, populate_with};
pub use probe::{Kind, Shape};
pub use register::register;
pub use schema::{Binding, FieldDescriptor, MAX_NESTING, Node, NodeId, Schema, SchemaFlag};
pub use source::{Env, LookupSource, Source, SourceBuilder};
pub use tag::{Bind, FieldTag, TagEntry, Tags};
pub use types::{Boundary, SearchMode, SearchPath};
