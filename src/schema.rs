//! The bound fields of a struct, compiled into an arena.
//!
//! A [`Schema`] joins a [`Tags`] table with the [`Shape`] the struct type
//! declares. Each node holds the descriptors of one struct level; a
//! nested field points at its child node by [`NodeId`]. Untagged fields are
//! left out entirely, so every descriptor in the arena is something the
//! registrar registers and the populator assigns.

use std::collections::HashSet;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::content::capture;
use crate::error::TagbindError;
use crate::flags::FlagKind;
use crate::probe::{Kind, Shape};
use crate::tag::{FieldTag, TagEntry, Tags};

/// Deepest accepted nesting: a root struct and one level of sub-structs.
pub const MAX_NESTING: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Flag { tag: FieldTag, kind: FlagKind },
    Nested(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name as the struct serializes it.
    pub field: &'static str,
    pub binding: Binding,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    fields: Vec<FieldDescriptor>,
}

impl Node {
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

/// A flag in registration order, with the field path that leads to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaFlag<'a> {
    pub path: Vec<&'a str>,
    pub tag: &'a FieldTag,
    pub kind: FlagKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    nodes: Vec<Node>,
}

impl Schema {
    /// Compile the bound fields of `T` against `tags`.
    ///
    /// Field kinds come from `T` itself, so every value of `T` yields the same
    /// schema. `value` is only read when `T` contains a field whose type
    /// describes itself solely through its data; the shape is then taken from
    /// `value`, and an empty sequence there has no element kind to bind.
    pub fn build<T: Serialize + DeserializeOwned>(tags: &Tags, value: &T) -> Result<Self, TagbindError> {
        let shape = match Shape::of_type::<T>() {
            Ok(shape) => shape,
            Err(e) => {
                debug!(reason = %e, "type shape unavailable, reading it from the value");
                let content = capture(value).map_err(|e| TagbindError::Inspect {
                    reason: e.to_string(),
                })?;
                Shape::of(&content)
            }
        };
        Self::from_shape(tags, &shape)
    }

    pub fn from_shape(tags: &Tags, shape: &Shape) -> Result<Self, TagbindError> {
        let Shape::Struct(fields) = shape else {
            return Err(TagbindError::UnsupportedKind {
                kind: shape.kind(),
                expected: vec![Kind::Struct],
                context: "bound value".to_string(),
            });
        };

        let mut builder = SchemaBuilder {
            nodes: Vec::new(),
            seen: HashSet::new(),
        };
        builder.node(tags, fields, 0)?;
        Ok(Schema {
            nodes: builder.nodes,
        })
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The node `id` names, or `None` for an id from another schema.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Every bound flag, depth first in field order.
    pub fn flags(&self) -> Vec<SchemaFlag<'_>> {
        let mut out = Vec::new();
        self.collect(self.root(), &mut Vec::new(), &mut out);
        out
    }

    fn collect<'a>(&'a self, id: NodeId, path: &mut Vec<&'a str>, out: &mut Vec<SchemaFlag<'a>>) {
        let Some(node) = self.node(id) else {
            return;
        };
        for desc in node.fields() {
            path.push(desc.field);
            match &desc.binding {
                Binding::Flag { tag, kind } => out.push(SchemaFlag {
                    path: path.clone(),
                    tag,
                    kind: *kind,
                }),
                Binding::Nested(child) => self.collect(*child, path, out),
            }
            path.pop();
        }
    }
}

struct SchemaBuilder {
    nodes: Vec<Node>,
    seen: HashSet<String>,
}

impl SchemaBuilder {
    fn node(
        &mut self,
        tags: &Tags,
        fields: &[(&'static str, Shape)],
        depth: usize,
    ) -> Result<NodeId, TagbindError> {
        if let Some((name, _)) = tags
            .iter()
            .find(|(name, _)| !fields.iter().any(|(field, _)| field == name))
        {
            return Err(TagbindError::UnknownField {
                field: name.to_string(),
            });
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::default());

        let mut descriptors = Vec::new();
        for (field, shape) in fields {
            let binding = match tags.get(field) {
                None => continue,
                Some(TagEntry::Field(tag)) if tag.flag.is_empty() => continue,
                Some(TagEntry::Field(tag)) => {
                    let kind = flag_kind(field, shape)?;
                    if !self.seen.insert(tag.flag.clone()) {
                        return Err(TagbindError::DuplicateFlag(tag.flag.clone()));
                    }
                    trace!(field, flag = %tag.flag, kind = kind.name(), "bound field");
                    Binding::Flag {
                        tag: tag.clone(),
                        kind,
                    }
                }
                Some(TagEntry::Nested(inner)) => {
                    let Shape::Struct(inner_fields) = shape else {
                        return Err(TagbindError::UnsupportedKind {
                            kind: shape.kind(),
                            expected: vec![Kind::Struct],
                            context: format!("field '{field}': nested tag"),
                        });
                    };
                    if depth + 1 > MAX_NESTING {
                        return Err(TagbindError::NestingTooDeep {
                            field: field.to_string(),
                        });
                    }
                    Binding::Nested(self.node(inner, inner_fields, depth + 1)?)
                }
            };
            descriptors.push(FieldDescriptor {
                field: *field,
                binding,
            });
        }

        self.nodes[id.0].fields = descriptors;
        Ok(id)
    }
}

fn flag_kind(field: &str, shape: &Shape) -> Result<FlagKind, TagbindError> {
    match shape {
        Shape::Leaf(Kind::String) => Ok(FlagKind::Str),
        Shape::Leaf(Kind::Bool) => Ok(FlagKind::Bool),
        Shape::Leaf(Kind::Int) => Ok(FlagKind::Int),
        Shape::Seq(None) => Err(TagbindError::UnsupportedKind {
            kind: Kind::Slice,
            expected: vec![Kind::String],
            context: format!("field '{field}': element kind of an empty slice"),
        }),
        Shape::Seq(Some(elem)) if elem.kind() == Kind::String => Ok(FlagKind::StrArray),
        Shape::Seq(Some(elem)) => Err(TagbindError::UnsupportedKind {
            kind: elem.kind(),
            expected: vec![Kind::String],
            context: format!("field '{field}': slice element"),
        }),
        other => Err(TagbindError::UnsupportedKind {
            kind: other.kind(),
            expected: vec![Kind::String, Kind::Bool, Kind::Int, Kind::Slice],
            context: format!("field '{field}'"),
        }),
    }
}
