//! A lossless in-memory copy of a serde value.
//!
//! [`capture`] serializes any value into a [`Content`] tree that keeps every
//! detail of the serde data model: integer widths, map keys of any type, unit
//! values and enum variants. [`ContentDeserializer`] replays that tree into a
//! `Deserialize` type. Population uses the pair to rebuild a struct with only
//! its bound fields swapped out, so the other fields never pass through a
//! config format.

use std::fmt;

use serde::de::value::{MapDeserializer, SeqDeserializer, StrDeserializer, StringDeserializer};
use serde::de::{self, DeserializeSeed, IntoDeserializer, Unexpected, Visitor};
use serde::forward_to_deserialize_any;
use serde::ser::{self, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Content {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),
    Bytes(Vec<u8>),
    None,
    Some(Box<Content>),
    Unit,
    Newtype(Box<Content>),
    Seq(Vec<Content>),
    Tuple(Vec<Content>),
    Map(Vec<(Content, Content)>),
    Struct(Vec<(&'static str, Content)>),
    Variant(&'static str, VariantContent),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum VariantContent {
    Unit,
    Newtype(Box<Content>),
    Tuple(Vec<Content>),
    Struct(Vec<(&'static str, Content)>),
}

impl Content {
    fn unexpected(&self) -> Unexpected<'_> {
        match self {
            Content::Bool(v) => Unexpected::Bool(*v),
            Content::I8(v) => Unexpected::Signed(i64::from(*v)),
            Content::I16(v) => Unexpected::Signed(i64::from(*v)),
            Content::I32(v) => Unexpected::Signed(i64::from(*v)),
            Content::I64(v) => Unexpected::Signed(*v),
            Content::I128(_) => Unexpected::Other("i128"),
            Content::U8(v) => Unexpected::Unsigned(u64::from(*v)),
            Content::U16(v) => Unexpected::Unsigned(u64::from(*v)),
            Content::U32(v) => Unexpected::Unsigned(u64::from(*v)),
            Content::U64(v) => Unexpected::Unsigned(*v),
            Content::U128(_) => Unexpected::Other("u128"),
            Content::F32(v) => Unexpected::Float(f64::from(*v)),
            Content::F64(v) => Unexpected::Float(*v),
            Content::Char(v) => Unexpected::Char(*v),
            Content::String(v) => Unexpected::Str(v),
            Content::Bytes(v) => Unexpected::Bytes(v),
            Content::None | Content::Some(_) => Unexpected::Option,
            Content::Unit => Unexpected::Unit,
            Content::Newtype(_) => Unexpected::NewtypeStruct,
            Content::Seq(_) | Content::Tuple(_) => Unexpected::Seq,
            Content::Map(_) | Content::Struct(_) => Unexpected::Map,
            Content::Variant(..) => Unexpected::Enum,
        }
    }
}

impl VariantContent {
    fn unexpected(&self) -> Unexpected<'static> {
        match self {
            VariantContent::Unit => Unexpected::UnitVariant,
            VariantContent::Newtype(_) => Unexpected::NewtypeVariant,
            VariantContent::Tuple(_) => Unexpected::TupleVariant,
            VariantContent::Struct(_) => Unexpected::StructVariant,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ContentError(String);

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ContentError {}

impl ser::Error for ContentError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ContentError(msg.to_string())
    }
}

impl de::Error for ContentError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ContentError(msg.to_string())
    }
}

/// Copy `value` into a [`Content`] tree.
pub(crate) fn capture<S: Serialize + ?Sized>(value: &S) -> Result<Content, ContentError> {
    value.serialize(Capture)
}

// --- Serializer ---

struct Capture;

impl ser::Serializer for Capture {
    type Ok = Content;
    type Error = ContentError;
    type SerializeSeq = SeqCapture;
    type SerializeTuple = SeqCapture;
    type SerializeTupleStruct = SeqCapture;
    type SerializeTupleVariant = SeqCapture;
    type SerializeMap = MapCapture;
    type SerializeStruct = StructCapture;
    type SerializeStructVariant = StructCapture;

    fn serialize_bool(self, v: bool) -> Result<Content, ContentError> {
        Ok(Content::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Content, ContentError> {
        Ok(Content::I8(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Content, ContentError> {
        Ok(Content::I16(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Content, ContentError> {
        Ok(Content::I32(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Content, ContentError> {
        Ok(Content::I64(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Content, ContentError> {
        Ok(Content::I128(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Content, ContentError> {
        Ok(Content::U8(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Content, ContentError> {
        Ok(Content::U16(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Content, ContentError> {
        Ok(Content::U32(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Content, ContentError> {
        Ok(Content::U64(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Content, ContentError> {
        Ok(Content::U128(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Content, ContentError> {
        Ok(Content::F32(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Content, ContentError> {
        Ok(Content::F64(v))
    }

    fn serialize_char(self, v: char) -> Result<Content, ContentError> {
        Ok(Content::Char(v))
    }

    fn serialize_str(self, v: &str) -> Result<Content, ContentError> {
        Ok(Content::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Content, ContentError> {
        Ok(Content::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Content, ContentError> {
        Ok(Content::None)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Content, ContentError> {
        Ok(Content::Some(Box::new(value.serialize(Capture)?)))
    }

    fn serialize_unit(self) -> Result<Content, ContentError> {
        Ok(Content::Unit)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Content, ContentError> {
        Ok(Content::Unit)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Content, ContentError> {
        Ok(Content::Variant(variant, VariantContent::Unit))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Content, ContentError> {
        Ok(Content::Newtype(Box::new(value.serialize(Capture)?)))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Content, ContentError> {
        let inner = Box::new(value.serialize(Capture)?);
        Ok(Content::Variant(variant, VariantContent::Newtype(inner)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqCapture, ContentError> {
        Ok(SeqCapture::new(SeqKind::Seq, len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqCapture, ContentError> {
        Ok(SeqCapture::new(SeqKind::Tuple, len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqCapture, ContentError> {
        Ok(SeqCapture::new(SeqKind::Tuple, len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqCapture, ContentError> {
        Ok(SeqCapture::new(SeqKind::Variant(variant), len))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapCapture, ContentError> {
        Ok(MapCapture {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<StructCapture, ContentError> {
        Ok(StructCapture {
            variant: None,
            fields: Vec::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<StructCapture, ContentError> {
        Ok(StructCapture {
            variant: Some(variant),
            fields: Vec::with_capacity(len),
        })
    }
}

// --- Compound captures ---

enum SeqKind {
    Seq,
    Tuple,
    Variant(&'static str),
}

struct SeqCapture {
    kind: SeqKind,
    items: Vec<Content>,
}

impl SeqCapture {
    fn new(kind: SeqKind, len: usize) -> Self {
        Self {
            kind,
            items: Vec::with_capacity(len),
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ContentError> {
        self.items.push(value.serialize(Capture)?);
        Ok(())
    }

    fn finish(self) -> Result<Content, ContentError> {
        Ok(match self.kind {
            SeqKind::Seq => Content::Seq(self.items),
            SeqKind::Tuple => Content::Tuple(self.items),
            SeqKind::Variant(variant) => Content::Variant(variant, VariantContent::Tuple(self.items)),
        })
    }
}

impl ser::SerializeSeq for SeqCapture {
    type Ok = Content;
    type Error = ContentError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ContentError> {
        self.push(value)
    }

    fn end(self) -> Result<Content, ContentError> {
        self.finish()
    }
}

impl ser::SerializeTuple for SeqCapture {
    type Ok = Content;
    type Error = ContentError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ContentError> {
        self.push(value)
    }

    fn end(self) -> Result<Content, ContentError> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for SeqCapture {
    type Ok = Content;
    type Error = ContentError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ContentError> {
        self.push(value)
    }

    fn end(self) -> Result<Content, ContentError> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for SeqCapture {
    type Ok = Content;
    type Error = ContentError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ContentError> {
        self.push(value)
    }

    fn end(self) -> Result<Content, ContentError> {
        self.finish()
    }
}

struct MapCapture {
    entries: Vec<(Content, Content)>,
    key: Option<Content>,
}

impl ser::SerializeMap for MapCapture {
    type Ok = Content;
    type Error = ContentError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), ContentError> {
        self.key = Some(key.serialize(Capture)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ContentError> {
        let key = self
            .key
            .take()
            .ok_or_else(|| ContentError("map value serialized before its key".to_string()))?;
        self.entries.push((key, value.serialize(Capture)?));
        Ok(())
    }

    fn end(self) -> Result<Content, ContentError> {
        Ok(Content::Map(self.entries))
    }
}

struct StructCapture {
    variant: Option<&'static str>,
    fields: Vec<(&'static str, Content)>,
}

impl StructCapture {
    fn push<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), ContentError> {
        self.fields.push((key, value.serialize(Capture)?));
        Ok(())
    }
}

impl ser::SerializeStruct for StructCapture {
    type Ok = Content;
    type Error = ContentError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ContentError> {
        self.push(key, value)
    }

    fn end(self) -> Result<Content, ContentError> {
        Ok(Content::Struct(self.fields))
    }
}

impl ser::SerializeStructVariant for StructCapture {
    type Ok = Content;
    type Error = ContentError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ContentError> {
        self.push(key, value)
    }

    fn end(self) -> Result<Content, ContentError> {
        match self.variant {
            Some(variant) => Ok(Content::Variant(variant, VariantContent::Struct(self.fields))),
            None => Ok(Content::Struct(self.fields)),
        }
    }
}

// --- Deserializer ---

/// Replays a [`Content`] tree into any `Deserialize` type.
pub(crate) struct ContentDeserializer {
    content: Content,
}

impl ContentDeserializer {
    pub(crate) fn new(content: Content) -> Self {
        Self { content }
    }
}

impl<'de> IntoDeserializer<'de, ContentError> for Content {
    type Deserializer = ContentDeserializer;

    fn into_deserializer(self) -> ContentDeserializer {
        ContentDeserializer::new(self)
    }
}

fn visit_seq<'de, V: Visitor<'de>>(items: Vec<Content>, visitor: V) -> Result<V::Value, ContentError> {
    let mut seq: SeqDeserializer<_, ContentError> = SeqDeserializer::new(items.into_iter());
    let value = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(value)
}

fn visit_map<'de, K, V>(entries: Vec<(K, Content)>, visitor: V) -> Result<V::Value, ContentError>
where
    K: IntoDeserializer<'de, ContentError>,
    V: Visitor<'de>,
{
    let mut map: MapDeserializer<'de, _, ContentError> = MapDeserializer::new(entries.into_iter());
    let value = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(value)
}

impl<'de> de::Deserializer<'de> for ContentDeserializer {
    type Error = ContentError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ContentError> {
        match self.content {
            Content::Bool(v) => visitor.visit_bool(v),
            Content::I8(v) => visitor.visit_i8(v),
            Content::I16(v) => visitor.visit_i16(v),
            Content::I32(v) => visitor.visit_i32(v),
            Content::I64(v) => visitor.visit_i64(v),
            Content::I128(v) => visitor.visit_i128(v),
            Content::U8(v) => visitor.visit_u8(v),
            Content::U16(v) => visitor.visit_u16(v),
            Content::U32(v) => visitor.visit_u32(v),
            Content::U64(v) => visitor.visit_u64(v),
            Content::U128(v) => visitor.visit_u128(v),
            Content::F32(v) => visitor.visit_f32(v),
            Content::F64(v) => visitor.visit_f64(v),
            Content::Char(v) => visitor.visit_char(v),
            Content::String(v) => visitor.visit_string(v),
            Content::Bytes(v) => visitor.visit_byte_buf(v),
            Content::None => visitor.visit_none(),
            Content::Some(v) => visitor.visit_some(ContentDeserializer::new(*v)),
            Content::Unit => visitor.visit_unit(),
            Content::Newtype(v) => visitor.visit_newtype_struct(ContentDeserializer::new(*v)),
            Content::Seq(items) | Content::Tuple(items) => visit_seq(items, visitor),
            Content::Map(entries) => visit_map(entries, visitor),
            Content::Struct(fields) => visit_map(fields, visitor),
            Content::Variant(variant, content) => visitor.visit_enum(EnumDeserializer { variant, content }),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ContentError> {
        match self.content {
            Content::None | Content::Unit => visitor.visit_none(),
            Content::Some(v) => visitor.visit_some(ContentDeserializer::new(*v)),
            other => visitor.visit_some(ContentDeserializer::new(other)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ContentError> {
        match self.content {
            Content::Newtype(v) => visitor.visit_newtype_struct(ContentDeserializer::new(*v)),
            other => visitor.visit_newtype_struct(ContentDeserializer::new(other)),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ContentError> {
        match self.content {
            Content::Variant(variant, content) => visitor.visit_enum(EnumDeserializer { variant, content }),
            Content::String(s) => visitor.visit_enum(StringDeserializer::<ContentError>::new(s)),
            other => Err(de::Error::invalid_type(other.unexpected(), &"enum")),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

struct EnumDeserializer {
    variant: &'static str,
    content: VariantContent,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = ContentError;
    type Variant = VariantDeserializer;

    fn variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<(S::Value, VariantDeserializer), ContentError> {
        let variant = seed.deserialize(StrDeserializer::<ContentError>::new(self.variant))?;
        Ok((variant, VariantDeserializer(self.content)))
    }
}

struct VariantDeserializer(VariantContent);

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = ContentError;

    fn unit_variant(self) -> Result<(), ContentError> {
        match self.0 {
            VariantContent::Unit => Ok(()),
            other => Err(de::Error::invalid_type(other.unexpected(), &"unit variant")),
        }
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, ContentError> {
        match self.0 {
            VariantContent::Newtype(v) => seed.deserialize(ContentDeserializer::new(*v)),
            other => Err(de::Error::invalid_type(other.unexpected(), &"newtype variant")),
        }
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, ContentError> {
        match self.0 {
            VariantContent::Tuple(items) => visit_seq(items, visitor),
            other => Err(de::Error::invalid_type(other.unexpected(), &"tuple variant")),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ContentError> {
        match self.0 {
            VariantContent::Struct(fields) => visit_map(fields, visitor),
            other => Err(de::Error::invalid_type(other.unexpected(), &"struct variant")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Serialize};
    use std::collections::{BTreeMap, HashMap};
    use std::marker::PhantomData;

    fn replay<T: Serialize + DeserializeOwned>(value: &T) -> T {
        T::deserialize(ContentDeserializer::new(capture(value).unwrap())).unwrap()
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    enum Mode {
        Off,
        Level(u8),
        Pair(i16, String),
        Custom { name: String, weight: f32 },
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Unit;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Everything {
        id: u64,
        big: i128,
        letter: char,
        raw: Vec<u8>,
        by_port: HashMap<u16, String>,
        ordered: BTreeMap<i32, Vec<bool>>,
        pair: (u8, String),
        marker: PhantomData<u32>,
        unit: (),
        unit_struct: Unit,
        maybe: Option<Option<u8>>,
        modes: Vec<Mode>,
    }

    #[test]
    fn struct_replays_unchanged() {
        let value = Everything {
            id: u64::MAX,
            big: i128::MIN,
            letter: 'λ',
            raw: vec![0, 255],
            by_port: HashMap::from([(80, "http".to_string()), (443, "https".to_string())]),
            ordered: BTreeMap::from([(-1, vec![true, false])]),
            pair: (7, "seven".into()),
            marker: PhantomData,
            unit: (),
            unit_struct: Unit,
            maybe: Some(None),
            modes: vec![
                Mode::Off,
                Mode::Level(3),
                Mode::Pair(-2, "p".into()),
                Mode::Custom {
                    name: "c".into(),
                    weight: 0.25,
                },
            ],
        };
        assert_eq!(replay(&value), value);
    }

    #[test]
    fn map_keys_keep_their_type() {
        let map: HashMap<u16, String> = HashMap::from([(8080, "alt".to_string())]);
        let Content::Map(entries) = capture(&map).unwrap() else {
            panic!("expected a map");
        };
        assert_eq!(entries[0].0, Content::U16(8080));
    }

    #[test]
    fn wide_integer_is_range_checked_on_replay() {
        let err = u16::deserialize(ContentDeserializer::new(Content::I64(70000))).unwrap_err();
        assert!(err.to_string().contains("70000"), "{err}");
    }

    #[test]
    fn string_replays_as_unit_variant() {
        let mode = Mode::deserialize(ContentDeserializer::new(Content::String("Off".into()))).unwrap();
        assert_eq!(mode, Mode::Off);
    }

    #[test]
    fn unexpected_shape_names_what_was_found() {
        let err = Mode::deserialize(ContentDeserializer::new(Content::Bool(true))).unwrap_err();
        assert!(err.to_string().contains("boolean"), "{err}");
    }
}
