//! A typed flag set: the command-line side of the binding.
//!
//! Each [`Flag`] has a kind, a default, a current value and a
//! [`ValueSource`] recording where that value came from. Only values set
//! through [`FlagSet::set`] (or the clap adapter) count as *explicitly set*;
//! values injected from a lookup source are marked [`ValueSource::Lookup`]
//! so a later source may still replace them.

use std::fmt;

use crate::error::TagbindError;

/// The value type of a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Str,
    Bool,
    Int,
    StrArray,
}

impl FlagKind {
    pub fn name(&self) -> &'static str {
        match self {
            FlagKind::Str => "string",
            FlagKind::Bool => "bool",
            FlagKind::Int => "int",
            FlagKind::StrArray => "stringArray",
        }
    }

    pub fn zero(&self) -> FlagValue {
        match self {
            FlagKind::Str => FlagValue::Str(String::new()),
            FlagKind::Bool => FlagValue::Bool(false),
            FlagKind::Int => FlagValue::Int(0),
            FlagKind::StrArray => FlagValue::StrArray(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Str(String),
    Bool(bool),
    Int(i64),
    StrArray(Vec<String>),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            FlagValue::Str(_) => FlagKind::Str,
            FlagValue::Bool(_) => FlagKind::Bool,
            FlagValue::Int(_) => FlagKind::Int,
            FlagValue::StrArray(_) => FlagKind::StrArray,
        }
    }

    /// Parse a raw string into a value of `kind`.
    ///
    /// Bools accept `1 t T TRUE true True` and `0 f F FALSE false False`.
    /// String arrays split on `,`; an empty string is an empty array.
    pub fn parse(kind: FlagKind, raw: &str) -> Result<FlagValue, String> {
        match kind {
            FlagKind::Str => Ok(FlagValue::Str(raw.to_string())),
            FlagKind::Bool => parse_bool(raw).map(FlagValue::Bool),
            FlagKind::Int => raw
                .trim()
                .parse::<i64>()
                .map(FlagValue::Int)
                .map_err(|e| e.to_string()),
            FlagKind::StrArray => Ok(FlagValue::StrArray(split_list(raw))),
        }
    }

    fn is_zero(&self) -> bool {
        *self == self.kind().zero()
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Str(s) => f.write_str(s),
            FlagValue::Bool(b) => write!(f, "{b}"),
            FlagValue::Int(i) => write!(f, "{i}"),
            FlagValue::StrArray(items) => write!(f, "[{}]", items.join(",")),
        }
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(format!("'{other}' is not a boolean")),
    }
}

pub(crate) fn split_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::to_string).collect()
}

/// Where a flag's current value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueSource {
    #[default]
    Default,
    /// Injected from a config file or environment variable.
    Lookup,
    /// Set explicitly on the command line (or programmatically via [`FlagSet::set`]).
    CommandLine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    name: String,
    short: Option<char>,
    desc: String,
    default: FlagValue,
    value: FlagValue,
    required: bool,
    source: ValueSource,
}

impl Flag {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short(&self) -> Option<char> {
        self.short
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn kind(&self) -> FlagKind {
        self.default.kind()
    }

    pub fn value(&self) -> &FlagValue {
        &self.value
    }

    pub fn default_value(&self) -> &FlagValue {
        &self.default
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn source(&self) -> ValueSource {
        self.source
    }

    /// Whether the value was set explicitly rather than defaulted or looked up.
    pub fn changed(&self) -> bool {
        self.source == ValueSource::CommandLine
    }
}

/// Typed flags in registration order.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    flags: Vec<Flag>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flag. Its kind is the kind of `default`.
    pub fn register(
        &mut self,
        name: &str,
        short: Option<char>,
        default: FlagValue,
        desc: &str,
    ) -> Result<(), TagbindError> {
        if self.lookup(name).is_some() {
            return Err(TagbindError::DuplicateFlag(name.to_string()));
        }
        if let Some(c) = short
            && let Some(other) = self.flags.iter().find(|f| f.short == Some(c))
        {
            return Err(TagbindError::DuplicateShort {
                short: c,
                flag: other.name.clone(),
            });
        }
        self.flags.push(Flag {
            name: name.to_string(),
            short,
            desc: desc.to_string(),
            value: default.clone(),
            default,
            required: false,
            source: ValueSource::Default,
        });
        Ok(())
    }

    pub fn string(
        &mut self,
        name: &str,
        short: Option<char>,
        default: &str,
        desc: &str,
    ) -> Result<(), TagbindError> {
        self.register(name, short, FlagValue::Str(default.to_string()), desc)
    }

    pub fn bool(
        &mut self,
        name: &str,
        short: Option<char>,
        default: bool,
        desc: &str,
    ) -> Result<(), TagbindError> {
        self.register(name, short, FlagValue::Bool(default), desc)
    }

    pub fn int(
        &mut self,
        name: &str,
        short: Option<char>,
        default: i64,
        desc: &str,
    ) -> Result<(), TagbindError> {
        self.register(name, short, FlagValue::Int(default), desc)
    }

    pub fn string_array(
        &mut self,
        name: &str,
        short: Option<char>,
        default: Vec<String>,
        desc: &str,
    ) -> Result<(), TagbindError> {
        self.register(name, short, FlagValue::StrArray(default), desc)
    }

    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|f| f.name == name)
    }

    fn lookup_mut(&mut self, name: &str) -> Result<&mut Flag, TagbindError> {
        self.flags
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| TagbindError::UnknownFlag(name.to_string()))
    }

    /// All flags in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Whether `name` was set explicitly. Unknown flags were never set.
    pub fn changed(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(Flag::changed)
    }

    pub fn mark_required(&mut self, name: &str) -> Result<(), TagbindError> {
        self.lookup_mut(name)?.required = true;
        Ok(())
    }

    /// Set a flag explicitly from its raw command-line text.
    ///
    /// String arrays follow repeated-flag semantics: the first explicit set
    /// replaces the default (or looked-up value), later sets append.
    pub fn set(&mut self, name: &str, raw: &str) -> Result<(), TagbindError> {
        let flag = self.lookup_mut(name)?;
        if let FlagValue::StrArray(items) = &mut flag.value {
            if flag.source != ValueSource::CommandLine {
                items.clear();
            }
            items.push(raw.to_string());
            flag.source = ValueSource::CommandLine;
            return Ok(());
        }
        let value = FlagValue::parse(flag.kind(), raw).map_err(|reason| {
            TagbindError::InvalidValue {
                flag: name.to_string(),
                value: raw.to_string(),
                reason,
            }
        })?;
        flag.value = value;
        flag.source = ValueSource::CommandLine;
        Ok(())
    }

    /// Set a flag from a lookup source's raw text. The flag is not marked
    /// changed, so later sources and the command line may still override it.
    pub fn set_from_source(&mut self, name: &str, raw: &str) -> Result<(), TagbindError> {
        let kind = self
            .lookup(name)
            .ok_or_else(|| TagbindError::UnknownFlag(name.to_string()))?
            .kind();
        let value = FlagValue::parse(kind, raw).map_err(|reason| TagbindError::InvalidValue {
            flag: name.to_string(),
            value: raw.to_string(),
            reason,
        })?;
        self.set_value(name, value, ValueSource::Lookup)
    }

    /// Replace a flag's value, recording where it came from.
    pub fn set_value(
        &mut self,
        name: &str,
        value: FlagValue,
        source: ValueSource,
    ) -> Result<(), TagbindError> {
        let flag = self.lookup_mut(name)?;
        if value.kind() != flag.kind() {
            return Err(mismatch(name, flag.kind(), &value));
        }
        flag.value = value;
        flag.source = source;
        Ok(())
    }

    fn get(&self, name: &str) -> Result<&FlagValue, TagbindError> {
        self.lookup(name)
            .map(Flag::value)
            .ok_or_else(|| TagbindError::UnknownFlag(name.to_string()))
    }

    pub fn get_string(&self, name: &str) -> Result<String, TagbindError> {
        match self.get(name)? {
            FlagValue::Str(s) => Ok(s.clone()),
            other => Err(mismatch(name, FlagKind::Str, other)),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, TagbindError> {
        match self.get(name)? {
            FlagValue::Bool(b) => Ok(*b),
            other => Err(mismatch(name, FlagKind::Bool, other)),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64, TagbindError> {
        match self.get(name)? {
            FlagValue::Int(i) => Ok(*i),
            other => Err(mismatch(name, FlagKind::Int, other)),
        }
    }

    pub fn get_string_array(&self, name: &str) -> Result<Vec<String>, TagbindError> {
        match self.get(name)? {
            FlagValue::StrArray(items) => Ok(items.clone()),
            other => Err(mismatch(name, FlagKind::StrArray, other)),
        }
    }

    /// Fail with every required flag that has no default and was set by
    /// neither the command line nor a lookup source.
    ///
    /// A default equal to the kind's zero value (`""`, `false`, `0`, `[]`)
    /// does not count as a default.
    pub fn check_required(&self) -> Result<(), TagbindError> {
        let missing: Vec<String> = self
            .flags
            .iter()
            .filter(|f| f.required && f.source == ValueSource::Default && f.default.is_zero())
            .map(|f| f.name.clone())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TagbindError::MissingRequired(missing))
        }
    }
}

fn mismatch(flag: &str, expected: FlagKind, actual: &FlagValue) -> TagbindError {
    TagbindError::FlagTypeMismatch {
        flag: flag.to_string(),
        expected: expected.name(),
        actual: actual.kind().name(),
    }
}
