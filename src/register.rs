//! Flag registration: one typed flag per bound field.

use tracing::trace;

use crate::error::TagbindError;
use crate::flags::{FlagKind, FlagSet, FlagValue, split_list};
use crate::schema::Schema;
use crate::tag::{Bind, FieldTag};

/// Register a flag on `flags` for every tagged field of `value`.
///
/// Field kinds come from `T`; `value` is only read for fields whose type
/// gives no shape of its own, and its contents are never used as defaults. Nested structs register their fields on the same flag set.
/// Flags whose tag is required are marked so that
/// [`FlagSet::check_required`] can enforce them later.
pub fn register<T: Bind>(flags: &mut FlagSet, value: &T) -> Result<(), TagbindError> {
    let schema = Schema::build(&T::tags(), value)?;
    for flag in schema.flags() {
        let tag = flag.tag;
        let default = from_default(&flag.path.join("."), tag, flag.kind)?;
        trace!(flag = %tag.flag, kind = flag.kind.name(), default = %default, "registering flag");
        flags.register(&tag.flag, tag.short, default, &tag.desc)?;
        if tag.required {
            flags.mark_required(&tag.flag)?;
        }
    }
    Ok(())
}

fn from_default(field: &str, tag: &FieldTag, kind: FlagKind) -> Result<FlagValue, TagbindError> {
    let raw = tag.default_str();
    Ok(match kind {
        FlagKind::Str => FlagValue::Str(raw.to_string()),
        FlagKind::Bool => FlagValue::Bool(raw == "true"),
        FlagKind::Int if raw.is_empty() => FlagValue::Int(0),
        FlagKind::Int => FlagValue::Int(raw.parse().map_err(|e: std::num::ParseIntError| {
            TagbindError::InvalidDefault {
                field: field.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            }
        })?),
        FlagKind::StrArray => FlagValue::StrArray(split_list(raw)),
    })
}
