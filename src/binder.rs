//! Precedence binding: fill flags the command line left alone from lookup
//! sources.
//!
//! For each flag the binder derives a lookup key and an environment
//! variable name:
//!
//! ```text
//! flag db-host, prefix app                 → key app-db-host, env APP_DB_HOST
//! flag db-host, prefix app, env prefix corp → key app-db-host, env CORP_APP_DB_HOST
//! ```
//!
//! The pair is bound on every source. A flag set explicitly keeps its value;
//! any other flag takes the value of the last source that has its key.

use toml::Value;
use tracing::debug;

use crate::error::TagbindError;
use crate::flags::{FlagKind, FlagSet, FlagValue, ValueSource};
use crate::source::{self, LookupSource};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindOptions {
    pub prefix: Option<String>,
    pub env_prefix: Option<String>,
}

impl BindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn env_prefix(mut self, env_prefix: &str) -> Self {
        self.env_prefix = Some(env_prefix.to_string());
        self
    }

    pub fn lookup_key(&self, flag: &str) -> String {
        lookup_key(self.prefix.as_deref(), flag)
    }

    pub fn env_var(&self, flag: &str) -> String {
        env_var_name(self.env_prefix.as_deref(), &self.lookup_key(flag))
    }
}

/// `prefix-flag`, or the bare flag name without a prefix.
pub fn lookup_key(prefix: Option<&str>, flag: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}-{flag}"),
        _ => flag.to_string(),
    }
}

/// Upper-case `key`, replace `-` with `_`, and prepend `ENVPREFIX_` if given.
pub fn env_var_name(env_prefix: Option<&str>, key: &str) -> String {
    let name = key.to_uppercase().replace('-', "_");
    match env_prefix {
        Some(env_prefix) if !env_prefix.is_empty() => {
            format!("{}_{name}", env_prefix.to_uppercase().replace('-', "_"))
        }
        _ => name,
    }
}

/// Bind every flag on every source, in order, then inject source values
/// into flags not set on the command line.
///
/// With an empty `sources` slice the process-wide [`source::global`] is used.
pub fn bind(
    flags: &mut FlagSet,
    opts: &BindOptions,
    sources: &mut [&mut dyn LookupSource],
) -> Result<(), TagbindError> {
    if sources.is_empty() {
        let mut global = source::global();
        return bind_source(flags, opts, &mut *global);
    }
    for source in sources.iter_mut() {
        bind_source(flags, opts, &mut **source)?;
    }
    Ok(())
}

fn bind_source(
    flags: &mut FlagSet,
    opts: &BindOptions,
    source: &mut dyn LookupSource,
) -> Result<(), TagbindError> {
    let plan: Vec<(String, FlagKind, bool)> = flags
        .iter()
        .map(|f| (f.name().to_string(), f.kind(), f.changed()))
        .collect();

    for (name, kind, changed) in plan {
        let key = opts.lookup_key(&name);
        let env_var = opts.env_var(&name);
        source.bind_env(&key, &env_var)?;
        debug!(flag = %name, key = %key, env = %env_var, "bound flag");

        if changed {
            continue;
        }
        if let Some(raw) = source.get(&key) {
            let value = value_for_flag(&name, kind, &raw)?;
            debug!(flag = %name, key = %key, value = %value, "injected value from source");
            flags.set_value(&name, value, ValueSource::Lookup)?;
        }
    }
    Ok(())
}

/// Convert a source value into a flag value of `kind`.
///
/// Strings parse per kind (arrays split on `,`); other scalars are
/// stringified first. Arrays only fill string-array flags.
fn value_for_flag(flag: &str, kind: FlagKind, raw: &Value) -> Result<FlagValue, TagbindError> {
    let invalid = |value: String, reason: String| TagbindError::InvalidValue {
        flag: flag.to_string(),
        value,
        reason,
    };

    match raw {
        Value::Array(items) if kind == FlagKind::StrArray => items
            .iter()
            .map(|item| scalar_text(item).ok_or_else(|| invalid(item.to_string(), "expected a scalar".into())))
            .collect::<Result<Vec<_>, _>>()
            .map(FlagValue::StrArray),
        Value::Array(_) | Value::Table(_) => Err(invalid(
            raw.to_string(),
            format!("cannot assign a {} to a {} flag", raw.type_str(), kind.name()),
        )),
        scalar => {
            let text = scalar_text(scalar).unwrap_or_default();
            FlagValue::parse(kind, &text).map_err(|reason| invalid(text, reason))
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        Value::Array(_) | Value::Table(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Nested, TypesStruct};
    use crate::register::register;
    use crate::source::Source;

    fn types_flags() -> FlagSet {
        let mut flags = FlagSet::new();
        register(&mut flags, &TypesStruct::default()).unwrap();
        flags
    }

    #[test]
    fn key_and_env_with_prefix() {
        let opts = BindOptions::new().prefix("app");
        assert_eq!(opts.lookup_key("db-host"), "app-db-host");
        assert_eq!(opts.env_var("db-host"), "APP_DB_HOST");
    }

    #[test]
    fn key_and_env_without_prefix() {
        let opts = BindOptions::new();
        assert_eq!(opts.lookup_key("db-host"), "db-host");
        assert_eq!(opts.env_var("db-host"), "DB_HOST");
    }

    #[test]
    fn env_prefix_is_prepended() {
        let opts = BindOptions::new().prefix("app").env_prefix("my-corp");
        assert_eq!(opts.lookup_key("db-host"), "app-db-host");
        assert_eq!(opts.env_var("db-host"), "MY_CORP_APP_DB_HOST");
    }

    #[test]
    fn source_value_beats_default() {
        let mut flags = types_flags();
        let mut source = Source::new().with_env([("STRING", "from-env")]);
        bind(&mut flags, &BindOptions::new(), &mut [&mut source]).unwrap();

        assert_eq!(flags.get_string("string").unwrap(), "from-env");
        assert_eq!(flags.lookup("string").unwrap().source(), ValueSource::Lookup);
        assert!(!flags.changed("string"));
    }

    #[test]
    fn explicit_value_beats_source() {
        let mut flags = types_flags();
        flags.set("string", "from-cli").unwrap();
        let mut source = Source::new().with_env([("STRING", "from-env")]);
        bind(&mut flags, &BindOptions::new(), &mut [&mut source]).unwrap();

        assert_eq!(flags.get_string("string").unwrap(), "from-cli");
    }

    #[test]
    fn binding_registers_env_names() {
        let mut flags = FlagSet::new();
        register(&mut flags, &Nested::default()).unwrap();
        let mut source = Source::new();
        bind(&mut flags, &BindOptions::new().prefix("app"), &mut [&mut source]).unwrap();
        assert_eq!(source.env_binding("app-db-host"), Some("APP_DB_HOST"));
        assert_eq!(source.env_binding("app-verbose"), Some("APP_VERBOSE"));
    }

    #[test]
    fn config_values_convert_per_kind() {
        let mut flags = types_flags();
        let mut source = Source::from_toml_str(
            r#"
            bool = true
            integer = "42"
            slice = ["a", 1]
            "#,
        )
        .unwrap();
        bind(&mut flags, &BindOptions::new(), &mut [&mut source]).unwrap();

        assert!(flags.get_bool("bool").unwrap());
        assert_eq!(flags.get_int("integer").unwrap(), 42);
        assert_eq!(flags.get_string_array("slice").unwrap(), vec!["a", "1"]);
    }

    #[test]
    fn env_string_splits_into_array() {
        let mut flags = types_flags();
        let mut source = Source::new().with_env([("SLICE", "x,y")]);
        bind(&mut flags, &BindOptions::new(), &mut [&mut source]).unwrap();
        assert_eq!(flags.get_string_array("slice").unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn later_source_overwrites_earlier() {
        let mut flags = types_flags();
        let mut first = Source::from_toml_str("string = \"first\"\ninteger = 1\n").unwrap();
        let mut second = Source::from_toml_str("string = \"second\"\n").unwrap();
        bind(
            &mut flags,
            &BindOptions::new(),
            &mut [&mut first, &mut second],
        )
        .unwrap();
        assert_eq!(flags.get_string("string").unwrap(), "second");
        assert_eq!(flags.get_int("integer").unwrap(), 1);
    }

    #[test]
    fn unparsable_value_aborts() {
        let mut flags = types_flags();
        let mut source = Source::new().with_env([("INTEGER", "ten")]);
        let err = bind(&mut flags, &BindOptions::new(), &mut [&mut source]).unwrap_err();
        assert!(matches!(err, TagbindError::InvalidValue { flag, .. } if flag == "integer"));
    }

    #[test]
    fn table_for_scalar_flag_aborts() {
        let mut flags = types_flags();
        let mut source = Source::from_toml_str("[string]\nx = 1\n").unwrap();
        let err = bind(&mut flags, &BindOptions::new(), &mut [&mut source]).unwrap_err();
        assert!(err.to_string().contains("cannot assign a table"));
    }

    #[test]
    fn no_sources_uses_global() {
        let mut flags = FlagSet::new();
        flags.string("tagbind-binder-global", None, "", "").unwrap();
        source::global().set("tagbind-binder-global", "from-global");

        bind(&mut flags, &BindOptions::new(), &mut []).unwrap();
        assert_eq!(
            flags.get_string("tagbind-binder-global").unwrap(),
            "from-global"
        );
    }
}
