//! A `serde::Serializer` that builds a `serde_json::Value` while applying the
//! options: member and dictionary key naming, null omission, depth limits and
//! first-match-wins converter resolution for enums and newtypes.

use serde::ser::{self, Serialize};
use serde_json::{Map, Number, Value};

use super::converter::TypeDescriptor;
use super::options::SerializerOptions;
use crate::bag::PropertyBag;
use crate::error::ConversionError;

#[derive(Clone, Copy)]
pub(crate) struct NodeSerializer<'o> {
    options: &'o SerializerOptions,
    depth: usize,
}

impl<'o> NodeSerializer<'o> {
    pub(crate) fn new(options: &'o SerializerOptions) -> Self {
        Self { options, depth: 0 }
    }

    /// Serializer for the contents of a container one level deeper.
    fn nested(self) -> Result<Self, ConversionError> {
        let depth = self.depth + 1;
        if depth > self.options.max_depth() {
            return Err(ConversionError::DepthExceeded {
                max: self.options.max_depth(),
            });
        }
        Ok(Self {
            options: self.options,
            depth,
        })
    }
}

impl<'o> ser::Serializer for NodeSerializer<'o> {
    type Ok = Value;
    type Error = ConversionError;

    type SerializeSeq = SeqBuilder<'o>;
    type SerializeTuple = SeqBuilder<'o>;
    type SerializeTupleStruct = SeqBuilder<'o>;
    type SerializeTupleVariant = VariantSeqBuilder<'o>;
    type SerializeMap = MapBuilder<'o>;
    type SerializeStruct = StructBuilder<'o>;
    type SerializeStructVariant = VariantStructBuilder<'o>;

    fn serialize_bool(self, v: bool) -> Result<Value, ConversionError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, ConversionError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, ConversionError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, ConversionError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, ConversionError> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, ConversionError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, ConversionError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, ConversionError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, ConversionError> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, ConversionError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, ConversionError> {
        // Non-finite numbers have no JSON form; serde_json writes them as null too.
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn serialize_char(self, v: char) -> Result<Value, ConversionError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, ConversionError> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, ConversionError> {
        Ok(Value::Array(
            v.iter().map(|&b| Value::Number(b.into())).collect(),
        ))
    }

    fn serialize_none(self) -> Result<Value, ConversionError> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, ConversionError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, ConversionError> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, ConversionError> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, ConversionError> {
        let ty = TypeDescriptor::enumeration(name, &[]);
        let value = Value::String(variant.to_owned());
        match self.options.converter_for(&ty) {
            Some(converter) => converter.write(&ty, value, self.options),
            None => Ok(value),
        }
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Value, ConversionError> {
        // A nested bag is already canonical; its keys are never renamed.
        if name == PropertyBag::SERDE_NAME {
            let node = serde_json::to_value(value)?;
            self.options.check_depth_at(&node, self.depth)?;
            return Ok(node);
        }

        let ty = TypeDescriptor::newtype(name);
        let inner = value.serialize(self)?;
        match self.options.converter_for(&ty) {
            Some(converter) => converter.write(&ty, inner, self.options),
            None => Ok(inner),
        }
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, ConversionError> {
        let inner = value.serialize(self.nested()?)?;
        let mut map = Map::new();
        map.insert(variant.to_owned(), inner);
        Ok(Value::Object(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder<'o>, ConversionError> {
        Ok(SeqBuilder {
            ser: self.nested()?,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder<'o>, ConversionError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqBuilder<'o>, ConversionError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSeqBuilder<'o>, ConversionError> {
        Ok(VariantSeqBuilder {
            ser: self.nested()?.nested()?,
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapBuilder<'o>, ConversionError> {
        Ok(MapBuilder {
            ser: self.nested()?,
            map: Map::new(),
            next_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<StructBuilder<'o>, ConversionError> {
        Ok(StructBuilder {
            ser: self.nested()?,
            map: Map::new(),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantStructBuilder<'o>, ConversionError> {
        Ok(VariantStructBuilder {
            fields: StructBuilder {
                ser: self.nested()?.nested()?,
                map: Map::new(),
            },
            variant,
        })
    }
}

pub(crate) struct SeqBuilder<'o> {
    ser: NodeSerializer<'o>,
    items: Vec<Value>,
}

impl<'o> ser::SerializeSeq for SeqBuilder<'o> {
    type Ok = Value;
    type Error = ConversionError;

    fn serialize_element<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), ConversionError> {
        self.items.push(value.serialize(self.ser)?);
        Ok(())
    }

    fn end(self) -> Result<Value, ConversionError> {
        Ok(Value::Array(self.items))
    }
}

impl<'o> ser::SerializeTuple for SeqBuilder<'o> {
    type Ok = Value;
    type Error = ConversionError;

    fn serialize_element<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), ConversionError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, ConversionError> {
        ser::SerializeSeq::end(self)
    }
}

impl<'o> ser::SerializeTupleStruct for SeqBuilder<'o> {
    type Ok = Value;
    type Error = ConversionError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConversionError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, ConversionError> {
        ser::SerializeSeq::end(self)
    }
}

pub(crate) struct VariantSeqBuilder<'o> {
    ser: NodeSerializer<'o>,
    variant: &'static str,
    items: Vec<Value>,
}

impl<'o> ser::SerializeTupleVariant for VariantSeqBuilder<'o> {
    type Ok = Value;
    type Error = ConversionError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConversionError> {
        self.items.push(value.serialize(self.ser)?);
        Ok(())
    }

    fn end(self) -> Result<Value, ConversionError> {
        let mut map = Map::new();
        map.insert(self.variant.to_owned(), Value::Array(self.items));
        Ok(Value::Object(map))
    }
}

pub(crate) struct MapBuilder<'o> {
    ser: NodeSerializer<'o>,
    map: Map<String, Value>,
    next_key: Option<String>,
}

impl<'o> ser::SerializeMap for MapBuilder<'o> {
    type Ok = Value;
    type Error = ConversionError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), ConversionError> {
        let key = map_key(key.serialize(self.ser)?)?;
        self.next_key = Some(self.ser.options.dictionary_key(key));
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConversionError> {
        let key = self.next_key.take().ok_or_else(|| {
            ConversionError::Message("map value serialized before its key".to_string())
        })?;
        self.map.insert(key, value.serialize(self.ser)?);
        Ok(())
    }

    fn end(self) -> Result<Value, ConversionError> {
        Ok(Value::Object(self.map))
    }
}

fn map_key(node: Value) -> Result<String, ConversionError> {
    match node {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(ConversionError::Message(format!(
            "map key must be a string, number or boolean, found {}",
            crate::error::kind_name(&other)
        ))),
    }
}

pub(crate) struct StructBuilder<'o> {
    ser: NodeSerializer<'o>,
    map: Map<String, Value>,
}

impl<'o> StructBuilder<'o> {
    fn field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ConversionError> {
        let node = value.serialize(self.ser)?;
        if node.is_null() && self.ser.options.ignore_null_values() {
            return Ok(());
        }
        let name = self.ser.options.member_name(key).into_owned();
        self.map.insert(name, node);
        Ok(())
    }
}

impl<'o> ser::SerializeStruct for StructBuilder<'o> {
    type Ok = Value;
    type Error = ConversionError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ConversionError> {
        self.field(key, value)
    }

    fn end(self) -> Result<Value, ConversionError> {
        Ok(Value::Object(self.map))
    }
}

pub(crate) struct VariantStructBuilder<'o> {
    fields: StructBuilder<'o>,
    variant: &'static str,
}

impl<'o> ser::SerializeStructVariant for VariantStructBuilder<'o> {
    type Ok = Value;
    type Error = ConversionError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ConversionError> {
        self.fields.field(key, value)
    }

    fn end(self) -> Result<Value, ConversionError> {
        let mut map = Map::new();
        map.insert(self.variant.to_owned(), Value::Object(self.fields.map));
        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::PropertyBagFactory;
    use serde::Serialize;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Sample {
        first_name: String,
        nick_name: Option<String>,
        scores: BTreeMap<String, u32>,
    }

    #[test]
    fn test_member_and_dictionary_policies() {
        let options = SerializerOptions::builder().build();
        let mut scores = BTreeMap::new();
        scores.insert("MathScore".to_string(), 3);
        let sample = Sample {
            first_name: "Ada".into(),
            nick_name: None,
            scores,
        };

        let node = options.to_node(&sample).unwrap();
        assert_eq!(
            node,
            json!({ "firstName": "Ada", "scores": { "mathScore": 3 } })
        );
    }

    #[test]
    fn test_nulls_kept_when_not_ignored() {
        let options = SerializerOptions::builder()
            .ignore_null_values(false)
            .property_naming_policy(None)
            .build();
        let sample = Sample {
            first_name: "Ada".into(),
            nick_name: None,
            scores: BTreeMap::new(),
        };

        let node = options.to_node(&sample).unwrap();
        assert_eq!(node["nick_name"], Value::Null);
        assert_eq!(node["first_name"], "Ada");
    }

    #[test]
    fn test_depth_limit_on_write() {
        let options = SerializerOptions::builder().max_depth(2).build();
        assert!(options.to_node(&vec![vec![1]]).is_ok());
        let err = options.to_node(&vec![vec![vec![1]]]).unwrap_err();
        assert!(matches!(err, ConversionError::DepthExceeded { max: 2 }));
    }

    #[test]
    fn test_nested_bag_depth_counts_from_its_position() {
        let factory = PropertyBagFactory::new(SerializerOptions::builder().max_depth(3).build());
        let inner = factory.create_from_str(r#"{"a":{"b":1}}"#).unwrap();
        let options = factory.options();

        assert_eq!(
            options.to_node(&vec![inner.clone()]).unwrap(),
            json!([{ "a": { "b": 1 } }])
        );
        let err = options.to_node(&vec![vec![inner]]).unwrap_err();
        assert!(matches!(err, ConversionError::DepthExceeded { max: 3 }));
    }
}
