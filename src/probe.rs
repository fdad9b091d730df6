//! Field kinds without runtime reflection.
//!
//! [`Shape::of_type`] runs a type's own `Deserialize` impl against a
//! deserializer that answers every request with a placeholder and writes
//! down what was asked for. A derived struct asks for its fields by name and
//! each field asks for its primitive kind, so the resulting [`Shape`] depends
//! only on the type: an empty `Vec<u16>` and a full one look the same, and so
//! do `None` and `Some`.
//!
//! Types that only describe themselves through their data (those that call
//! `deserialize_any`) cannot be inspected this way. For those,
//! [`Shape::of`] reads the shape of a captured value instead.

use std::fmt;

use serde::de::value::StrDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, Visitor};

use crate::content::{Content, ContentError};

/// The primitive kind of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    Float,
    Char,
    String,
    Bytes,
    Option,
    Unit,
    Slice,
    Tuple,
    Map,
    Struct,
    Enum,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Char => "char",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Option => "option",
            Kind::Unit => "unit",
            Kind::Slice => "slice",
            Kind::Tuple => "tuple",
            Kind::Map => "map",
            Kind::Struct => "struct",
            Kind::Enum => "enum",
        };
        f.write_str(name)
    }
}

/// Shape of a type or value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A leaf with no inner structure we care about.
    Leaf(Kind),
    /// A sequence, with the shape of its element when known.
    Seq(Option<Box<Shape>>),
    /// A struct, fields in declaration order.
    Struct(Vec<(&'static str, Shape)>),
}

impl Shape {
    pub fn kind(&self) -> Kind {
        match self {
            Shape::Leaf(kind) => *kind,
            Shape::Seq(_) => Kind::Slice,
            Shape::Struct(_) => Kind::Struct,
        }
    }

    /// The shape `T` declares through its `Deserialize` impl.
    pub(crate) fn of_type<T: DeserializeOwned>() -> Result<Shape, ContentError> {
        let mut shape = None;
        T::deserialize(TypeInspector { out: &mut shape })?;
        Ok(shape.unwrap_or(Shape::Leaf(Kind::Unit)))
    }

    /// The shape of a captured value. An empty sequence has no element shape.
    pub(crate) fn of(content: &Content) -> Shape {
        match content {
            Content::Bool(_) => Shape::Leaf(Kind::Bool),
            Content::I8(_)
            | Content::I16(_)
            | Content::I32(_)
            | Content::I64(_)
            | Content::I128(_)
            | Content::U8(_)
            | Content::U16(_)
            | Content::U32(_)
            | Content::U64(_)
            | Content::U128(_) => Shape::Leaf(Kind::Int),
            Content::F32(_) | Content::F64(_) => Shape::Leaf(Kind::Float),
            Content::Char(_) => Shape::Leaf(Kind::Char),
            Content::String(_) => Shape::Leaf(Kind::String),
            Content::Bytes(_) => Shape::Leaf(Kind::Bytes),
            Content::None | Content::Some(_) => Shape::Leaf(Kind::Option),
            Content::Unit => Shape::Leaf(Kind::Unit),
            Content::Newtype(inner) => Shape::of(inner),
            Content::Seq(items) => Shape::Seq(items.first().map(|item| Box::new(Shape::of(item)))),
            Content::Tuple(_) => Shape::Leaf(Kind::Tuple),
            Content::Map(_) => Shape::Leaf(Kind::Map),
            Content::Struct(fields) => Shape::Struct(
                fields
                    .iter()
                    .map(|(name, value)| (*name, Shape::of(value)))
                    .collect(),
            ),
            Content::Variant(..) => Shape::Leaf(Kind::Enum),
        }
    }
}

// --- Type inspector ---

/// Records the first shape requested of it, then hands the visitor a
/// placeholder of that kind.
struct TypeInspector<'a> {
    out: &'a mut Option<Shape>,
}

impl TypeInspector<'_> {
    fn record(self, shape: Shape) {
        *self.out = Some(shape);
    }
}

macro_rules! leaf {
    ($($method:ident => $kind:ident, $visit:ident($placeholder:expr);)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ContentError> {
                self.record(Shape::Leaf(Kind::$kind));
                visitor.$visit($placeholder)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for TypeInspector<'_> {
    type Error = ContentError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, ContentError> {
        Err(de::Error::custom("type does not declare its shape"))
    }

    leaf! {
        deserialize_bool => Bool, visit_bool(false);
        deserialize_i8 => Int, visit_i8(0);
        deserialize_i16 => Int, visit_i16(0);
        deserialize_i32 => Int, visit_i32(0);
        deserialize_i64 => Int, visit_i64(0);
        deserialize_i128 => Int, visit_i128(0);
        deserialize_u8 => Int, visit_u8(0);
        deserialize_u16 => Int, visit_u16(0);
        deserialize_u32 => Int, visit_u32(0);
        deserialize_u64 => Int, visit_u64(0);
        deserialize_u128 => Int, visit_u128(0);
        deserialize_f32 => Float, visit_f32(0.0);
        deserialize_f64 => Float, visit_f64(0.0);
        deserialize_char => Char, visit_char(' ');
        deserialize_str => String, visit_str("");
        deserialize_string => String, visit_str("");
        deserialize_identifier => String, visit_str("");
        deserialize_bytes => Bytes, visit_bytes(&[]);
        deserialize_byte_buf => Bytes, visit_bytes(&[]);
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ContentError> {
        self.record(Shape::Leaf(Kind::Option));
        visitor.visit_none()
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ContentError> {
        self.record(Shape::Leaf(Kind::Unit));
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ContentError> {
        self.record(Shape::Leaf(Kind::Unit));
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ContentError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ContentError> {
        let mut element = None;
        let value = visitor.visit_seq(OneElement {
            out: &mut element,
            done: false,
        })?;
        self.record(Shape::Seq(element.map(Box::new)));
        Ok(value)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, ContentError> {
        self.record(Shape::Leaf(Kind::Tuple));
        visitor.visit_seq(Placeholders { remaining: len })
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, ContentError> {
        self.record(Shape::Leaf(Kind::Tuple));
        visitor.visit_seq(Placeholders { remaining: len })
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ContentError> {
        self.record(Shape::Leaf(Kind::Map));
        visitor.visit_map(NoEntries)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ContentError> {
        let mut access = Fields {
            names: fields,
            shapes: Vec::with_capacity(fields.len()),
        };
        let value = visitor.visit_map(&mut access)?;
        self.record(Shape::Struct(access.shapes));
        Ok(value)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ContentError> {
        self.record(Shape::Leaf(Kind::Enum));
        visitor.visit_enum(FirstVariant { variants })
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ContentError> {
        visitor.visit_unit()
    }
}

/// Inspect a value whose shape is not kept.
fn placeholder<'de, S: DeserializeSeed<'de>>(seed: S) -> Result<S::Value, ContentError> {
    let mut discard = None;
    seed.deserialize(TypeInspector { out: &mut discard })
}

/// A sequence of exactly one element, whose shape is recorded.
struct OneElement<'a> {
    out: &'a mut Option<Shape>,
    done: bool,
}

impl<'de> de::SeqAccess<'de> for OneElement<'_> {
    type Error = ContentError;

    fn next_element_seed<S: DeserializeSeed<'de>>(
        &mut self,
        seed: S,
    ) -> Result<Option<S::Value>, ContentError> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        seed.deserialize(TypeInspector { out: &mut *self.out }).map(Some)
    }
}

struct Placeholders {
    remaining: usize,
}

impl<'de> de::SeqAccess<'de> for Placeholders {
    type Error = ContentError;

    fn next_element_seed<S: DeserializeSeed<'de>>(
        &mut self,
        seed: S,
    ) -> Result<Option<S::Value>, ContentError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        placeholder(seed).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

struct NoEntries;

impl<'de> de::MapAccess<'de> for NoEntries {
    type Error = ContentError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, _seed: K) -> Result<Option<K::Value>, ContentError> {
        Ok(None)
    }

    fn next_value_seed<S: DeserializeSeed<'de>>(&mut self, _seed: S) -> Result<S::Value, ContentError> {
        Err(de::Error::custom("map has no entries"))
    }
}

/// Offers every declared field once, in order, recording each field's shape.
struct Fields {
    names: &'static [&'static str],
    shapes: Vec<(&'static str, Shape)>,
}

impl<'de> de::MapAccess<'de> for Fields {
    type Error = ContentError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, ContentError> {
        match self.names.get(self.shapes.len()) {
            Some(name) => seed.deserialize(StrDeserializer::<ContentError>::new(name)).map(Some),
            None => Ok(None),
        }
    }

    fn next_value_seed<S: DeserializeSeed<'de>>(&mut self, seed: S) -> Result<S::Value, ContentError> {
        let name = *self
            .names
            .get(self.shapes.len())
            .ok_or_else(|| de::Error::custom("value requested past the last field"))?;
        let mut shape = None;
        let value = seed.deserialize(TypeInspector { out: &mut shape })?;
        self.shapes.push((name, shape.unwrap_or(Shape::Leaf(Kind::Unit))));
        Ok(value)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.names.len() - self.shapes.len())
    }
}

/// Picks the first declared variant and fills it with placeholders.
struct FirstVariant {
    variants: &'static [&'static str],
}

impl<'de> de::EnumAccess<'de> for FirstVariant {
    type Error = ContentError;
    type Variant = VariantPlaceholder;

    fn variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<(S::Value, VariantPlaceholder), ContentError> {
        let first = self
            .variants
            .first()
            .ok_or_else(|| de::Error::custom("enum has no variants"))?;
        let value = seed.deserialize(StrDeserializer::<ContentError>::new(first))?;
        Ok((value, VariantPlaceholder))
    }
}

struct VariantPlaceholder;

impl<'de> de::VariantAccess<'de> for VariantPlaceholder {
    type Error = ContentError;

    fn unit_variant(self) -> Result<(), ContentError> {
        Ok(())
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, ContentError> {
        placeholder(seed)
    }

    fn tuple_variant<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, ContentError> {
        visitor.visit_seq(Placeholders { remaining: len })
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ContentError> {
        visitor.visit_map(Fields {
            names: fields,
            shapes: Vec::new(),
        })
    }
}
