use std::path::PathBuf;
use thiserror::Error;

use crate::probe::Kind;

#[derive(Debug, Error)]
pub enum TagbindError {
    #[error("{context}: kind {kind} is not supported; expecting {}", kind_list(.expected))]
    UnsupportedKind {
        kind: Kind,
        expected: Vec<Kind>,
        context: String,
    },

    #[error("Destination must be a struct, got kind {kind}")]
    NotAStruct { kind: Kind },

    #[error("Unknown flag '--{0}'")]
    UnknownFlag(String),

    #[error("Flag '--{flag}' holds a {actual} value, not {expected}")]
    FlagTypeMismatch {
        flag: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid value '{value}' for '--{flag}': {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },

    #[error("Invalid default '{value}' for field '{field}': {reason}")]
    InvalidDefault {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid tag `{tag}`: {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("Tag names field '{field}', which the struct does not have")]
    UnknownField { field: String },

    #[error("Flag '--{0}' is registered more than once")]
    DuplicateFlag(String),

    #[error("Shorthand '-{short}' is already used by '--{flag}'")]
    DuplicateShort { short: char, flag: String },

    #[error("Failed to bind '{key}' to its environment variable: {reason}")]
    BindEnv { key: String, reason: String },

    #[error("An app name is required to search the platform or home config directories")]
    AppNameRequired,

    #[error("Field '{field}' nests a struct inside a nested struct; only one level is supported")]
    NestingTooDeep { field: String },

    #[error("Required flag(s) not set: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("Failed to inspect value: {reason}")]
    Inspect { reason: String },

    #[error("Failed to populate destination: {reason}")]
    Populate { reason: String },

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[cfg(feature = "clap")]
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

fn kind_list(kinds: &[Kind]) -> String {
    let names: Vec<String> = kinds.iter().map(Kind::to_string).collect();
    format!("[{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_kind_names_offender_and_expected() {
        let err = TagbindError::UnsupportedKind {
            kind: Kind::Float,
            expected: vec![Kind::String, Kind::Bool, Kind::Int, Kind::Slice],
            context: "field 'ratio'".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("float"));
        assert!(msg.contains("[string, bool, int, slice]"));
        assert!(msg.contains("ratio"));
    }

    #[test]
    fn missing_required_lists_all_flags() {
        let err = TagbindError::MissingRequired(vec!["token".into(), "db-host".into()]);
        assert_eq!(err.to_string(), "Required flag(s) not set: token, db-host");
    }

    #[test]
    fn not_a_struct_formats() {
        let err = TagbindError::NotAStruct { kind: Kind::String };
        assert!(err.to_string().contains("string"));
    }
}
