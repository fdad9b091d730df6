//! Struct population: copy resolved flag values into the destination.
//!
//! The destination is captured into an in-memory [`Content`] tree that keeps
//! every serde detail, the bound fields in that tree are replaced with flag
//! values, and the tree is deserialized back into a fresh value. Untagged
//! fields are replayed exactly as captured. Nothing is written to the
//! destination unless every step succeeds.

use tracing::debug;

use crate::binder::{BindOptions, bind};
use crate::content::{Content, ContentDeserializer, capture};
use crate::error::TagbindError;
use crate::flags::{FlagKind, FlagSet};
use crate::probe::Shape;
use crate::schema::{Binding, NodeId, Schema};
use crate::source::LookupSource;
use crate::tag::Bind;

/// Assign the current value of every bound flag to its field in `dest`.
pub fn populate<T: Bind>(flags: &FlagSet, dest: &mut T) -> Result<(), TagbindError> {
    let mut content = capture(&*dest).map_err(|e| TagbindError::Inspect {
        reason: e.to_string(),
    })?;
    let shape = Shape::of(&content);
    if !matches!(shape, Shape::Struct(_)) {
        return Err(TagbindError::NotAStruct { kind: shape.kind() });
    }

    let schema = Schema::build(&T::tags(), &*dest)?;
    overlay(&schema, schema.root(), flags, &mut content)?;

    let populated = T::deserialize(ContentDeserializer::new(content)).map_err(|e| {
        TagbindError::Populate {
            reason: e.to_string(),
        }
    })?;
    *dest = populated;
    debug!(flags = flags.len(), "populated destination");
    Ok(())
}

/// Bind `flags` against `sources` (see [`bind`]), then [`populate`] `dest`.
pub fn populate_with<T: Bind>(
    flags: &mut FlagSet,
    dest: &mut T,
    opts: &BindOptions,
    sources: &mut [&mut dyn LookupSource],
) -> Result<(), TagbindError> {
    bind(flags, opts, sources)?;
    populate(flags, dest)
}

fn populate_error(reason: String) -> TagbindError {
    TagbindError::Populate { reason }
}

/// Replace the bound fields of `content` with the values of their flags.
fn overlay(schema: &Schema, id: NodeId, flags: &FlagSet, content: &mut Content) -> Result<(), TagbindError> {
    let node = schema
        .node(id)
        .ok_or_else(|| populate_error("schema node is missing".to_string()))?;
    let fields = struct_fields(content)
        .ok_or_else(|| populate_error("bound value did not serialize as a struct".to_string()))?;

    for desc in node.fields() {
        let slot = fields.iter().position(|(name, _)| *name == desc.field);
        match &desc.binding {
            Binding::Nested(child) => {
                let i = slot
                    .ok_or_else(|| populate_error(format!("field '{}' was not serialized", desc.field)))?;
                overlay(schema, *child, flags, &mut fields[i].1)?;
            }
            Binding::Flag { tag, kind } => {
                let value = flag_content(flags, &tag.flag, *kind)?;
                match slot {
                    Some(i) => fields[i].1 = value,
                    None => fields.push((desc.field, value)),
                }
            }
        }
    }
    Ok(())
}

fn struct_fields(content: &mut Content) -> Option<&mut Vec<(&'static str, Content)>> {
    match content {
        Content::Struct(fields) => Some(fields),
        Content::Newtype(inner) => struct_fields(inner),
        _ => None,
    }
}

fn flag_content(flags: &FlagSet, name: &str, kind: FlagKind) -> Result<Content, TagbindError> {
    Ok(match kind {
        FlagKind::Str => Content::String(flags.get_string(name)?),
        FlagKind::Bool => Content::Bool(flags.get_bool(name)?),
        FlagKind::Int => Content::I64(flags.get_int(name)?),
        FlagKind::StrArray => Content::Seq(
            flags
                .get_string_array(name)?
                .into_iter()
                .map(Content::String)
                .collect(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Db, Nested, TypesStruct};
    use crate::register::register;
    use crate::source::Source;
    use crate::tag::{FieldTag, Tags};
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::marker::PhantomData;

    #[test]
    fn round_trip_every_kind() {
        let mut flags = FlagSet::new();
        register(&mut flags, &TypesStruct::default()).unwrap();
        flags.set("string", "x").unwrap();
        flags.set("bool", "true").unwrap();
        flags.set("integer", "10").unwrap();
        flags.set("slice", "a").unwrap();
        flags.set("slice", "b").unwrap();

        let mut dest = TypesStruct::default();
        populate(&flags, &mut dest).unwrap();
        assert_eq!(dest.string, "x");
        assert!(dest.bool);
        assert_eq!(dest.integer, 10);
        assert_eq!(dest.slice, vec!["a", "b"]);
    }

    #[test]
    fn untagged_fields_keep_their_value() {
        let mut flags = FlagSet::new();
        register(&mut flags, &TypesStruct::default()).unwrap();

        let mut dest = TypesStruct {
            untagged: "keep".into(),
            ..Default::default()
        };
        populate(&flags, &mut dest).unwrap();
        assert_eq!(dest.untagged, "keep");
    }

    #[test]
    fn nested_struct_is_filled() {
        let mut flags = FlagSet::new();
        register(&mut flags, &Nested::default()).unwrap();
        flags.set("db-port", "6543").unwrap();

        let mut dest = Nested::default();
        populate(&flags, &mut dest).unwrap();
        assert_eq!(
            dest.db,
            Db {
                host: "localhost".into(),
                port: 6543
            }
        );
    }

    #[test]
    fn non_struct_destination_is_untouched() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Label(String);
        impl Bind for Label {
            fn tags() -> Tags {
                Tags::new()
            }
        }

        let mut dest = Label("before".into());
        let err = populate(&FlagSet::new(), &mut dest).unwrap_err();
        assert!(matches!(
            err,
            TagbindError::NotAStruct {
                kind: crate::probe::Kind::String
            }
        ));
        assert_eq!(dest, Label("before".into()));
    }

    #[test]
    fn missing_flag_fails_without_partial_writes() {
        let mut flags = FlagSet::new();
        flags.string("string", None, "x", "").unwrap();

        let mut dest = TypesStruct::default();
        let err = populate(&flags, &mut dest).unwrap_err();
        assert!(matches!(err, TagbindError::UnknownFlag(name) if name == "slice"));
        assert_eq!(dest, TypesStruct::default());
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let mut flags = FlagSet::new();
        register(&mut flags, &TypesStruct::default()).unwrap();

        #[derive(Serialize, Deserialize, Default)]
        struct Other {
            string: bool,
        }
        impl Bind for Other {
            fn tags() -> Tags {
                Tags::new().field("string", FieldTag::new("string"))
            }
        }

        let err = populate(&flags, &mut Other::default()).unwrap_err();
        assert!(matches!(err, TagbindError::FlagTypeMismatch { .. }));
    }

    #[test]
    fn out_of_range_int_is_a_populate_error() {
        let mut flags = FlagSet::new();
        register(&mut flags, &Nested::default()).unwrap();
        flags.set("db-port", "70000").unwrap();

        let mut dest = Nested::default();
        let err = populate(&flags, &mut dest).unwrap_err();
        assert!(matches!(err, TagbindError::Populate { .. }));
        assert_eq!(dest, Nested::default());
    }

    #[test]
    fn populate_with_binds_first() {
        let mut flags = FlagSet::new();
        register(&mut flags, &Nested::default()).unwrap();
        let mut source = Source::new().with_env([("APP_DB_HOST", "db.internal")]);

        let mut dest = Nested::default();
        populate_with(
            &mut flags,
            &mut dest,
            &BindOptions::new().prefix("app"),
            &mut [&mut source],
        )
        .unwrap();
        assert_eq!(dest.db.host, "db.internal");
    }

    #[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
    enum Mode {
        #[default]
        Fast,
        Tuned {
            level: u8,
        },
    }

    #[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
    struct Service {
        host: String,
        by_port: HashMap<u16, String>,
        id: u64,
        marker: PhantomData<String>,
        unit: (),
        mode: Mode,
        timeout: Option<u32>,
    }

    impl Bind for Service {
        fn tags() -> Tags {
            Tags::new().field("host", FieldTag::new("host").optional())
        }
    }

    #[test]
    fn untagged_map_with_integer_keys_is_kept() {
        let mut flags = FlagSet::new();
        register(&mut flags, &Service::default()).unwrap();
        flags.set("host", "example.org").unwrap();

        let mut dest = Service {
            by_port: HashMap::from([(80, "http".to_string()), (443, "https".to_string())]),
            ..Default::default()
        };
        populate(&flags, &mut dest).unwrap();
        assert_eq!(dest.host, "example.org");
        assert_eq!(dest.by_port.get(&443).map(String::as_str), Some("https"));
        assert_eq!(dest.by_port.len(), 2);
    }

    #[test]
    fn untagged_u64_above_i64_max_is_kept() {
        let mut flags = FlagSet::new();
        register(&mut flags, &Service::default()).unwrap();

        let mut dest = Service {
            id: u64::MAX,
            ..Default::default()
        };
        populate(&flags, &mut dest).unwrap();
        assert_eq!(dest.id, u64::MAX);
    }

    #[test]
    fn untagged_unit_enum_and_option_fields_are_kept() {
        let mut flags = FlagSet::new();
        register(&mut flags, &Service::default()).unwrap();
        flags.set("host", "h").unwrap();

        let mut dest = Service {
            mode: Mode::Tuned { level: 9 },
            timeout: Some(30),
            ..Default::default()
        };
        populate(&flags, &mut dest).unwrap();
        assert_eq!(
            dest,
            Service {
                host: "h".into(),
                mode: Mode::Tuned { level: 9 },
                timeout: Some(30),
                ..Default::default()
            }
        );
    }

    #[test]
    fn field_skipped_by_serialize_is_still_assigned() {
        #[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
        struct Sparse {
            #[serde(default, skip_serializing_if = "String::is_empty")]
            name: String,
        }
        impl Bind for Sparse {
            fn tags() -> Tags {
                Tags::new().field("name", FieldTag::new("name").optional())
            }
        }

        let mut flags = FlagSet::new();
        register(&mut flags, &Sparse::default()).unwrap();
        flags.set("name", "set").unwrap();

        let mut dest = Sparse::default();
        populate(&flags, &mut dest).unwrap();
        assert_eq!(dest.name, "set");
    }
}
