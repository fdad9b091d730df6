//! Per-field binding metadata.
//!
//! A [`FieldTag`] says how one struct field maps to a flag: its name, short
//! alias, description, default and whether it is required. A [`Tags`] table
//! maps Rust field names to tags (or to a nested table for struct-typed
//! fields) and is what a [`Bind`] implementation hands to the registrar.
//!
//! Tags can be built three ways:
//!
//! ```ignore
//! // builder
//! Tags::new()
//!     .field("host", FieldTag::new("db-host").short('H').default_value("localhost"))
//!     .field("token", FieldTag::new("token").desc("API token").optional());
//!
//! // struct-tag strings
//! Tags::new().tagged("host", r#"arg:"db-host" short:"H" default:"localhost""#)?;
//!
//! // from a confique Config struct
//! Tags::from_meta(&AppConfig::META);
//! ```

use std::str::FromStr;

use confique::meta::{Expr, FieldKind, LeafKind, Meta};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::TagbindError;

/// A struct whose fields can be bound to flags.
///
/// The struct's `Deserialize` impl declares its field kinds and assigns
/// resolved values; its `Serialize` impl carries the untagged fields across
/// population. Plain `#[derive(Serialize, Deserialize)]` structs only need
/// to supply their tag table.
pub trait Bind: Serialize + DeserializeOwned {
    fn tags() -> Tags;
}

/// Binding metadata for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTag {
    pub flag: String,
    pub short: Option<char>,
    pub desc: String,
    pub default: Option<String>,
    pub required: bool,
}

impl FieldTag {
    /// A required tag for flag `--{flag}` with no default.
    pub fn new(flag: &str) -> Self {
        Self {
            flag: flag.to_string(),
            short: None,
            desc: String::new(),
            default: None,
            required: true,
        }
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn desc(mut self, desc: &str) -> Self {
        self.desc = desc.to_string();
        self
    }

    /// String-encoded default. Bools are `true` only for exactly `"true"`,
    /// integers parse as `i64`, string arrays split on `,`.
    pub fn default_value(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Shorthand for `.required(false)`.
    pub fn optional(self) -> Self {
        self.required(false)
    }

    /// The default as written, or `""` when none was given.
    pub fn default_str(&self) -> &str {
        self.default.as_deref().unwrap_or("")
    }
}

/// Parse a struct-tag string such as
/// `arg:"db-host" short:"d" desc:"database host" default:"localhost" required:"false"`.
///
/// Unknown keys are ignored so tags can be shared with other tooling. A tag
/// without `arg` yields an empty flag name, which the registrar skips.
/// `required` is `false` only when its value is exactly `"false"`.
impl FromStr for FieldTag {
    type Err = TagbindError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut tag = FieldTag::new("");
        for (key, value) in parse_pairs(raw)? {
            match key.as_str() {
                "arg" => tag.flag = value,
                "desc" => tag.desc = value,
                "default" => tag.default = Some(value),
                "required" => tag.required = value != "false",
                "short" => {
                    let mut chars = value.chars();
                    tag.short = match (chars.next(), chars.next()) {
                        (None, _) => None,
                        (Some(c), None) => Some(c),
                        _ => {
                            return Err(TagbindError::InvalidTag {
                                tag: raw.to_string(),
                                reason: format!("short alias '{value}' must be a single character"),
                            });
                        }
                    };
                }
                _ => {}
            }
        }
        Ok(tag)
    }
}

fn parse_pairs(raw: &str) -> Result<Vec<(String, String)>, TagbindError> {
    let invalid = |reason: &str| TagbindError::InvalidTag {
        tag: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut pairs = Vec::new();
    let mut rest = raw.trim_start();
    while !rest.is_empty() {
        let (key, after_key) = rest
            .split_once(':')
            .ok_or_else(|| invalid("expected key:\"value\""))?;
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(invalid("malformed key"));
        }
        let body = after_key
            .strip_prefix('"')
            .ok_or_else(|| invalid("value must be double-quoted"))?;

        let mut value = String::new();
        let mut chars = body.char_indices();
        let mut end = None;
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                '"' => {
                    end = Some(i);
                    break;
                }
                other => value.push(other),
            }
        }
        let end = end.ok_or_else(|| invalid("unterminated value"))?;

        pairs.push((key.to_string(), value));
        rest = body[end + 1..].trim_start();
    }
    Ok(pairs)
}

/// One entry in a [`Tags`] table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEntry {
    Field(FieldTag),
    /// A struct-typed field whose own fields register on the same flag set.
    Nested(Tags),
}

/// Field name → binding metadata, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    entries: Vec<(String, TagEntry)>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag field `name`. A later entry for the same field replaces the earlier one.
    pub fn field(mut self, name: &str, tag: FieldTag) -> Self {
        self.insert(name, TagEntry::Field(tag));
        self
    }

    /// Tag field `name` from a struct-tag string (see [`FieldTag::from_str`]).
    pub fn tagged(self, name: &str, raw: &str) -> Result<Self, TagbindError> {
        Ok(self.field(name, raw.parse()?))
    }

    /// Mark struct-typed field `name` as nested, with its own tag table.
    pub fn nested(mut self, name: &str, tags: Tags) -> Self {
        self.insert(name, TagEntry::Nested(tags));
        self
    }

    pub fn get(&self, name: &str) -> Option<&TagEntry> {
        self.entries
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: &str, entry: TagEntry) {
        match self.entries.iter_mut().find(|(field, _)| field == name) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((name.to_string(), entry)),
        }
    }

    /// Derive a tag table from a confique `Config` struct.
    ///
    /// - flag name: field name with `_` replaced by `-`
    /// - description: the field's doc comment, lines joined
    /// - default: `#[config(default = ...)]`, arrays joined with `,`
    /// - fields without a default are required; `Option<T>` fields are skipped
    /// - `#[config(nested)]` fields become nested tables
    pub fn from_meta(meta: &Meta) -> Self {
        let mut tags = Tags::new();
        for field in meta.fields {
            match &field.kind {
                FieldKind::Leaf {
                    kind: LeafKind::Required { default },
                    ..
                } => {
                    let doc: Vec<&str> = field.doc.iter().map(|line| line.trim()).collect();
                    let mut tag = FieldTag::new(&field.name.replace('_', "-")).desc(&doc.join(" "));
                    if let Some(value) = default.as_ref().and_then(expr_to_string) {
                        tag = tag.default_value(&value).optional();
                    }
                    tags = tags.field(field.name, tag);
                }
                // An unset Option carries no kind to register a flag with.
                FieldKind::Leaf {
                    kind: LeafKind::Optional,
                    ..
                } => {}
                FieldKind::Nested { meta, .. } => {
                    tags = tags.nested(field.name, Tags::from_meta(meta));
                }
            }
        }
        tags
    }
}

fn expr_to_string(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Str(s) => Some(s.to_string()),
        Expr::Bool(b) => Some(b.to_string()),
        Expr::Integer(i) => Some(i.to_string()),
        Expr::Float(f) => Some(f.to_string()),
        Expr::Array(items) => items
            .iter()
            .map(expr_to_string)
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(",")),
        _ => None,
    }
}
