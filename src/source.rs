//! Lookup sources: where flag values come from when not given on the
//! command line.
//!
//! A [`LookupSource`] answers "is key K set, and to what?" after the binder
//! has told it which environment variable backs each key. [`Source`] is the
//! stock implementation, layering programmatic overrides, bound environment
//! variables and a TOML config table:
//!
//! ```text
//! Config table        keys from discovered TOML files, lower-cased
//!        ↑ overridden by
//! Environment vars    only those bound with bind_env, non-empty values
//!        ↑ overridden by
//! Overrides           Source::set
//! ```
//!
//! A process-wide instance lives behind [`global`] and is what the binder
//! uses when the caller passes no sources.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use toml::{Table, Value};
use tracing::debug;

use crate::error::TagbindError;
use crate::file::{load_config_files, load_file};
use crate::merge::{deep_merge, lowercase_keys, table_get};
use crate::types::{SearchMode, SearchPath};

/// A key→value provider consulted by the binder.
///
/// Keys are case-insensitive; implementations lower-case them.
pub trait LookupSource {
    /// Associate `key` with environment variable `env_var`.
    fn bind_env(&mut self, key: &str, env_var: &str) -> Result<(), TagbindError>;

    fn get(&self, key: &str) -> Option<Value>;

    fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Where a [`Source`] reads environment variables from.
#[derive(Debug, Clone, Default)]
pub enum Env {
    /// The live process environment.
    #[default]
    Process,
    /// A fixed map, for tests and embedding.
    Fixed(HashMap<String, String>),
}

impl Env {
    /// The variable's value, treating set-but-empty as unset.
    fn var(&self, name: &str) -> Option<String> {
        let value = match self {
            Env::Process => std::env::var(name).ok(),
            Env::Fixed(vars) => vars.get(name).cloned(),
        };
        value.filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Source {
    config: Table,
    overrides: HashMap<String, Value>,
    env_bindings: HashMap<String, String>,
    env: Env,
}

impl Source {
    /// An empty source backed by the process environment.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SourceBuilder {
        SourceBuilder::default()
    }

    /// A source whose config table is parsed from inline TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, TagbindError> {
        let table = content
            .parse::<Table>()
            .map_err(|e| TagbindError::ParseError {
                path: PathBuf::from("<inline>"),
                source: e,
            })?;
        Ok(Self::from_table(table))
    }

    pub fn from_table(table: Table) -> Self {
        Self {
            config: lowercase_keys(table),
            ..Self::default()
        }
    }

    /// Read environment variables from `vars` instead of the process.
    pub fn with_env<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Env::Fixed(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Set `key` directly. Overrides beat environment and config values.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.overrides.insert(key.to_lowercase(), value.into());
    }

    pub fn config(&self) -> &Table {
        &self.config
    }

    /// The environment variable bound to `key`, if any.
    pub fn env_binding(&self, key: &str) -> Option<&str> {
        self.env_bindings.get(&key.to_lowercase()).map(String::as_str)
    }
}

impl LookupSource for Source {
    fn bind_env(&mut self, key: &str, env_var: &str) -> Result<(), TagbindError> {
        let invalid = |reason: &str| TagbindError::BindEnv {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        if key.is_empty() {
            return Err(invalid("key is empty"));
        }
        if env_var.is_empty() {
            return Err(invalid("environment variable name is empty"));
        }
        if env_var.contains(['=', '\0']) {
            return Err(invalid("environment variable name contains '=' or NUL"));
        }
        self.env_bindings
            .insert(key.to_lowercase(), env_var.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        let key = key.to_lowercase();
        if let Some(value) = self.overrides.get(&key) {
            return Some(value.clone());
        }
        if let Some(value) = self.env_bindings.get(&key).and_then(|var| self.env.var(var)) {
            return Some(Value::String(value));
        }
        table_get(&self.config, &key).cloned()
    }
}

static GLOBAL: LazyLock<Mutex<Source>> = LazyLock::new(|| Mutex::new(Source::new()));

/// The process-wide source. Holds the lock until the guard drops.
pub fn global() -> MutexGuard<'static, Source> {
    GLOBAL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replace the process-wide source, e.g. with one built from config files.
pub fn set_global(source: Source) {
    *global() = source;
}

/// Builds a [`Source`] from discovered config files.
///
/// ```ignore
/// let source = Source::builder()
///     .app_name("myapp")
///     .search_paths(vec![SearchPath::Platform, SearchPath::Cwd])
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SourceBuilder {
    app_name: Option<String>,
    file_name: Option<String>,
    search_paths: Option<Vec<SearchPath>>,
    search_mode: SearchMode,
    config_files: Vec<PathBuf>,
    env: Env,
}

impl SourceBuilder {
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// File to look for in each search path. Defaults to `{app_name}.toml`.
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    /// Replace the search paths. Defaults to `[Platform]` when an app name
    /// is set, nothing otherwise.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search path (highest priority so far).
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        let default = self.default_search_paths();
        self.search_paths.get_or_insert(default).push(path);
        self
    }

    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Load this exact file on top of anything discovered. It must exist.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_files.push(path.into());
        self
    }

    /// Read environment variables from `vars` instead of the process.
    pub fn env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Env::Fixed(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    fn default_search_paths(&self) -> Vec<SearchPath> {
        match self.app_name {
            Some(_) => vec![SearchPath::Platform],
            None => vec![],
        }
    }

    pub fn build(self) -> Result<Source, TagbindError> {
        let search_paths = self
            .search_paths
            .clone()
            .unwrap_or_else(|| self.default_search_paths());

        let mut config = Table::new();
        if !search_paths.is_empty() {
            let file_name = match (&self.file_name, &self.app_name) {
                (Some(name), _) => name.clone(),
                (None, Some(app)) => format!("{app}.toml"),
                (None, None) => return Err(TagbindError::AppNameRequired),
            };
            let files = load_config_files(
                &search_paths,
                &file_name,
                self.app_name.as_deref(),
                self.search_mode,
            )?;
            for (_, table) in files {
                config = deep_merge(config, table);
            }
        }
        for path in &self.config_files {
            debug!(path = %path.display(), "loading explicit config file");
            config = deep_merge(config, load_file(path)?);
        }

        Ok(Source {
            config,
            env: self.env,
            ..Source::default()
        })
    }
}
