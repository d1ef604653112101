//! A `serde::Deserializer` over a borrowed `serde_json::Value` that applies
//! the options: member names are matched through the naming policy, enums
//! and newtypes are routed through the first matching converter, and
//! nesting depth is bounded.

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeSeed, Visitor};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Value};

use super::converter::TypeDescriptor;
use super::options::SerializerOptions;
use crate::error::{kind_name, ConversionError};

#[derive(Clone, Copy)]
pub(crate) struct NodeDeserializer<'de> {
    node: &'de Value,
    options: &'de SerializerOptions,
    depth: usize,
}

impl<'de> NodeDeserializer<'de> {
    pub(crate) fn new(node: &'de Value, options: &'de SerializerOptions) -> Self {
        Self {
            node,
            options,
            depth: 0,
        }
    }

    fn enter(&self) -> Result<usize, ConversionError> {
        let depth = self.depth + 1;
        if depth > self.options.max_depth() {
            return Err(ConversionError::DepthExceeded {
                max: self.options.max_depth(),
            });
        }
        Ok(depth)
    }

    fn unexpected(&self, type_name: &str) -> ConversionError {
        ConversionError::UnexpectedShape {
            type_name: type_name.to_string(),
            found: kind_name(self.node),
        }
    }

    fn visit_array<V: Visitor<'de>>(
        self,
        items: &'de [Value],
        visitor: V,
    ) -> Result<V::Value, ConversionError> {
        let depth = self.enter()?;
        visitor.visit_seq(ArrayAccess {
            items: items.iter(),
            options: self.options,
            depth,
        })
    }

    fn visit_object<V: Visitor<'de>>(
        self,
        map: &'de Map<String, Value>,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ConversionError> {
        let depth = self.enter()?;
        // Wire name -> declared field name, for fields the policy renames.
        let renames = fields
            .iter()
            .filter_map(|&field| {
                let wire = self.options.member_name(field);
                (wire != field).then(|| (wire.into_owned(), field))
            })
            .collect();
        visitor.visit_map(ObjectAccess {
            entries: map.iter(),
            renames,
            value: None,
            options: self.options,
            depth,
        })
    }
}

impl<'de> de::Deserializer<'de> for NodeDeserializer<'de> {
    type Error = ConversionError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConversionError> {
        match self.node {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    visitor.visit_u64(u)
                } else if let Some(i) = n.as_i64() {
                    visitor.visit_i64(i)
                } else if let Some(f) = n.as_f64() {
                    visitor.visit_f64(f)
                } else {
                    Err(self.unexpected("number"))
                }
            }
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Array(items) => self.visit_array(items, visitor),
            Value::Object(map) => self.visit_object(map, &[], visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConversionError> {
        match self.node {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ConversionError> {
        let ty = TypeDescriptor::newtype(name);
        if let Some(converter) = self.options.converter_for(&ty) {
            let converted = converter.read(&ty, self.node, self.options)?;
            return visitor
                .visit_newtype_struct(converted)
                .map_err(ConversionError::from);
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ConversionError> {
        // Converters name unit variants only. A single-key object holds a data
        // variant under its declared name.
        if !self.node.is_object() {
            let ty = TypeDescriptor::enumeration(name, variants);
            if let Some(converter) = self.options.converter_for(&ty) {
                let converted = converter.read(&ty, self.node, self.options)?;
                return visitor.visit_enum(EnumAccessor {
                    variant: declared_variant(&ty, &converted)?,
                    content: None,
                });
            }
        }

        match self.node {
            Value::String(variant) => visitor.visit_enum(EnumAccessor {
                variant,
                content: None,
            }),
            Value::Object(map) if map.len() == 1 => {
                let depth = self.enter()?;
                let (variant, content) = map.iter().next().ok_or_else(|| self.unexpected(name))?;
                visitor.visit_enum(EnumAccessor {
                    variant,
                    content: Some(NodeDeserializer {
                        node: content,
                        options: self.options,
                        depth,
                    }),
                })
            }
            _ => Err(self.unexpected(name)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ConversionError> {
        match self.node {
            Value::Object(map) => self.visit_object(map, fields, visitor),
            Value::Array(items) => self.visit_array(items, visitor),
            _ => Err(self.unexpected(name)),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
        ignored_any
    }
}

struct ArrayAccess<'de> {
    items: std::slice::Iter<'de, Value>,
    options: &'de SerializerOptions,
    depth: usize,
}

impl<'de> de::SeqAccess<'de> for ArrayAccess<'de> {
    type Error = ConversionError;

    fn next_element_seed<S: DeserializeSeed<'de>>(
        &mut self,
        seed: S,
    ) -> Result<Option<S::Value>, ConversionError> {
        match self.items.next() {
            Some(node) => seed
                .deserialize(NodeDeserializer {
                    node,
                    options: self.options,
                    depth: self.depth,
                })
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Stands in for a key that must not match any declared field.
const UNMATCHED_KEY: &str = "\u{0}unmatched";

struct ObjectAccess<'de> {
    entries: serde_json::map::Iter<'de>,
    renames: Vec<(String, &'static str)>,
    value: Option<&'de Value>,
    options: &'de SerializerOptions,
    depth: usize,
}

impl<'de> de::MapAccess<'de> for ObjectAccess<'de> {
    type Error = ConversionError;

    fn next_key_seed<S: DeserializeSeed<'de>>(
        &mut self,
        seed: S,
    ) -> Result<Option<S::Value>, ConversionError> {
        let Some((key, value)) = self.entries.next() else {
            return Ok(None);
        };
        self.value = Some(value);

        // A declared name the policy renames only matches under its wire name.
        let key: &'de str = match self.renames.iter().find(|(wire, _)| wire == key) {
            Some(&(_, field)) => field,
            None if self.renames.iter().any(|&(_, field)| field == key) => UNMATCHED_KEY,
            None => key.as_str(),
        };
        seed.deserialize(KeyDeserializer {
            key,
            options: self.options,
        })
        .map(Some)
    }

    fn next_value_seed<S: DeserializeSeed<'de>>(
        &mut self,
        seed: S,
    ) -> Result<S::Value, ConversionError> {
        let node = self
            .value
            .take()
            .ok_or_else(|| {
                ConversionError::Message("map value requested before its key".to_string())
            })?;
        seed.deserialize(NodeDeserializer {
            node,
            options: self.options,
            depth: self.depth,
        })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct EnumAccessor<'de> {
    variant: &'de str,
    content: Option<NodeDeserializer<'de>>,
}

impl<'de> de::EnumAccess<'de> for EnumAccessor<'de> {
    type Error = ConversionError;
    type Variant = Self;

    fn variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<(S::Value, Self), ConversionError> {
        let variant =
            seed.deserialize(BorrowedStrDeserializer::<ConversionError>::new(self.variant))?;
        Ok((variant, self))
    }
}

impl<'de> de::VariantAccess<'de> for EnumAccessor<'de> {
    type Error = ConversionError;

    fn unit_variant(self) -> Result<(), ConversionError> {
        match self.content {
            None => Ok(()),
            Some(content) if content.node.is_null() => Ok(()),
            Some(content) => Err(content.unexpected("unit variant")),
        }
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<S::Value, ConversionError> {
        match self.content {
            Some(content) => seed.deserialize(content),
            None => Err(ConversionError::UnexpectedShape {
                type_name: "newtype variant".to_string(),
                found: "string",
            }),
        }
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, ConversionError> {
        match self.content {
            Some(content) => de::Deserializer::deserialize_seq(content, visitor),
            None => Err(ConversionError::UnexpectedShape {
                type_name: "tuple variant".to_string(),
                found: "string",
            }),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ConversionError> {
        match self.content {
            Some(content) => de::Deserializer::deserialize_struct(content, "", fields, visitor),
            None => Err(ConversionError::UnexpectedShape {
                type_name: "struct variant".to_string(),
                found: "string",
            }),
        }
    }
}

/// Maps a converter's read result back onto one of the declared variant
/// names, which outlive any borrowed input.
fn declared_variant(
    ty: &TypeDescriptor<'static>,
    converted: &Value,
) -> Result<&'static str, ConversionError> {
    match converted {
        Value::String(name) => ty
            .variants
            .iter()
            .copied()
            .find(|variant| variant == name)
            .ok_or_else(|| ConversionError::UnknownEnumValue {
                type_name: ty.name.to_string(),
                value: name.clone(),
            }),
        other => Err(ConversionError::UnexpectedShape {
            type_name: ty.name.to_string(),
            found: kind_name(other),
        }),
    }
}

/// Deserializer for object keys. Keys are always strings in JSON; numeric
/// and boolean map keys are parsed back from their text.
struct KeyDeserializer<'de> {
    key: &'de str,
    options: &'de SerializerOptions,
}

macro_rules! deserialize_parsed_key {
    ($($method:ident => $visit:ident : $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConversionError> {
                match self.key.parse::<$ty>() {
                    Ok(parsed) => visitor.$visit(parsed),
                    Err(_) => visitor.visit_borrowed_str(self.key),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'de> {
    type Error = ConversionError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConversionError> {
        visitor.visit_borrowed_str(self.key)
    }

    deserialize_parsed_key! {
        deserialize_bool => visit_bool: bool,
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConversionError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ConversionError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ConversionError> {
        let ty = TypeDescriptor::enumeration(name, variants);
        let converter = self.options.converter_for(&ty);

        // Keys were written as the converter's name for the variant with the
        // dictionary-key policy applied on top.
        for &variant in variants {
            let written = match converter {
                Some(converter) => {
                    converter.write(&ty, Value::String(variant.to_owned()), self.options)?
                }
                None => Value::String(variant.to_owned()),
            };
            if let Value::String(written) = written {
                if self.options.dictionary_key(written) == self.key {
                    return visitor.visit_enum(EnumAccessor {
                        variant,
                        content: None,
                    });
                }
            }
        }

        match converter {
            Some(converter) => {
                let key = Value::String(self.key.to_owned());
                let converted = converter.read(&ty, &key, self.options)?;
                visitor.visit_enum(EnumAccessor {
                    variant: declared_variant(&ty, &converted)?,
                    content: None,
                })
            }
            None => visitor.visit_enum(EnumAccessor {
                variant: self.key,
                content: None,
            }),
        }
    }

    forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        first_name: String,
        nick_name: Option<String>,
        #[serde(default)]
        scores: HashMap<u32, String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    enum Shape {
        Dot,
        Circle { radius_cm: u32 },
        Pair(u8, u8),
    }

    #[test]
    fn test_member_names_matched_through_policy() {
        let options = SerializerOptions::builder().build();
        let node = json!({ "firstName": "Ada", "scores": { "7": "seven" } });
        let sample: Sample = options.from_node(&node).unwrap();
        assert_eq!(sample.first_name, "Ada");
        assert_eq!(sample.nick_name, None);
        assert_eq!(sample.scores.get(&7).map(String::as_str), Some("seven"));
    }

    #[test]
    fn test_member_names_are_case_sensitive() {
        let options = SerializerOptions::builder().build();
        let node = json!({ "FirstName": "Ada" });
        assert!(options.from_node::<Sample>(&node).is_err());
    }

    #[test]
    fn test_declared_names_rejected_when_policy_renames_them() {
        let options = SerializerOptions::builder().build();
        let err = options
            .from_node::<Sample>(&json!({ "first_name": "Ada" }))
            .unwrap_err();
        assert!(err.to_string().contains("first_name"));

        // Only the policy name counts, so the declared name is not a duplicate.
        let both: Sample = options
            .from_node(&json!({ "firstName": "Ada", "first_name": "Bob" }))
            .unwrap();
        assert_eq!(both.first_name, "Ada");

        let verbatim = SerializerOptions::builder().property_naming_policy(None).build();
        let sample: Sample = verbatim.from_node(&json!({ "first_name": "Ada" })).unwrap();
        assert_eq!(sample.first_name, "Ada");
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Labelled {
        label_text: String,
        #[serde(flatten)]
        extra: Extra,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Extra {
        unit_count: u32,
    }

    #[test]
    fn test_flattened_structs_only_round_trip_without_policies() {
        let labelled = Labelled {
            label_text: "crate".into(),
            extra: Extra { unit_count: 2 },
        };

        // Flattening turns the outer struct into a map, so its keys take the
        // dictionary policy on write and are matched verbatim on read.
        let options = SerializerOptions::builder().build();
        let node = options.to_node(&labelled).unwrap();
        assert_eq!(node, json!({ "labelText": "crate", "unitCount": 2 }));
        assert!(options.from_node::<Labelled>(&node).is_err());

        let verbatim = SerializerOptions::builder()
            .property_naming_policy(None)
            .dictionary_key_policy(None)
            .build();
        let node = verbatim.to_node(&labelled).unwrap();
        assert_eq!(node, json!({ "label_text": "crate", "unit_count": 2 }));
        assert_eq!(verbatim.from_node::<Labelled>(&node).unwrap(), labelled);
    }

    #[test]
    fn test_enum_shapes_without_converters() {
        let options = SerializerOptions::builder().build();
        let shapes: Vec<Shape> = options
            .from_node(&json!(["Dot", { "Circle": { "radiusCm": 4 } }, { "Pair": [1, 2] }]))
            .unwrap();
        assert_eq!(
            shapes,
            vec![Shape::Dot, Shape::Circle { radius_cm: 4 }, Shape::Pair(1, 2)]
        );
    }

    #[test]
    fn test_depth_limit_on_read() {
        let options = SerializerOptions::builder().max_depth(2).build();
        assert!(options.from_node::<Vec<Vec<u8>>>(&json!([[1]])).is_ok());
        let err = options.from_node::<Value>(&json!([[[1]]])).unwrap_err();
        assert!(matches!(err, ConversionError::DepthExceeded { max: 2 }));
    }
}
