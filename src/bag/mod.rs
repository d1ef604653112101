//! Property bags: open-ended named values stored as one canonical JSON object.

mod factory;
mod scan;
mod value;
mod writer;

pub use factory::{JsonSink, PropertyBagFactory};
pub use scan::EntryKind;
pub use value::PropertyValue;
pub use writer::{PropertyBagWriter, WriterState};

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, Visitor};
use serde::{ser, Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::error::{kind_name, ConversionError, PropertyBagError, Result};
use crate::serialization::SerializerOptions;

const EMPTY: &str = "{}";

/// An immutable snapshot of named values backed by canonical JSON text.
///
/// Clones share the text. The text of a given bag only changes when a
/// [`PropertyBagWriter`] commits, which needs `&mut` access, so shared
/// references can always be read concurrently.
#[derive(Clone)]
pub struct PropertyBag {
    raw: Arc<str>,
    options: Arc<SerializerOptions>,
}

impl PropertyBag {
    pub const SERDE_NAME: &'static str = "PropertyBag";

    pub(crate) fn from_canonical(raw: Arc<str>, options: Arc<SerializerOptions>) -> Self {
        Self { raw, options }
    }

    pub(crate) fn from_object(
        object: &Map<String, Value>,
        options: Arc<SerializerOptions>,
    ) -> std::result::Result<Self, ConversionError> {
        let raw = serde_json::to_string(object)?;
        Ok(Self::from_canonical(raw.into(), options))
    }

    /// A bag with no properties.
    pub fn empty(options: Arc<SerializerOptions>) -> Self {
        Self::from_canonical(Arc::from(EMPTY), options)
    }

    pub fn options(&self) -> &Arc<SerializerOptions> {
        &self.options
    }

    /// The canonical JSON text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub(crate) fn set_raw(&mut self, raw: Arc<str>) {
        self.raw = raw;
    }

    pub(crate) fn shares_options(&self, options: &Arc<SerializerOptions>) -> bool {
        Arc::ptr_eq(&self.options, options)
    }

    /// Look up `key` and convert its value to `T`.
    ///
    /// Returns `Ok(None)` when the key is absent, and an error when it is
    /// present but cannot be converted. `serde_json::Value` is returned as
    /// stored, without converters; a nested `PropertyBag` shares this bag's
    /// options.
    pub fn try_get<T: DeserializeOwned + 'static>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.try_get_raw(key) else {
            return Ok(None);
        };

        if TypeId::of::<T>() == TypeId::of::<PropertyBag>() {
            return Ok(cast(self.nested_bag(key, raw)?));
        }

        let node: Value = serde_json::from_str(raw.get())
            .map_err(|e| PropertyBagError::conversion(key, e.into()))?;
        if TypeId::of::<T>() == TypeId::of::<Value>() {
            return Ok(cast(node));
        }

        self.options
            .from_node::<T>(&node)
            .map(Some)
            .map_err(|e| PropertyBagError::conversion(key, e))
    }

    /// The raw JSON of `key`'s value, borrowed from the bag's text.
    pub fn try_get_raw(&self, key: &str) -> Option<&RawValue> {
        match scan::find(&self.raw, key) {
            Ok(found) => found,
            Err(e) => {
                log::warn!(
                    "Treating malformed property bag as empty while looking up '{}': {}",
                    key,
                    e
                );
                None
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.try_get_raw(key).is_some()
    }

    /// Every top-level property name with the kind of its value, in text order.
    pub fn entries(&self) -> Vec<(String, EntryKind)> {
        scan::entries(&self.raw).unwrap_or_else(|e| {
            log::warn!("Treating malformed property bag as empty while listing entries: {}", e);
            Vec::new()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// The properties as JSON nodes.
    pub fn to_map(&self) -> Result<Map<String, Value>> {
        serde_json::from_str(&self.raw).map_err(|e| PropertyBagError::Malformed(e.into()))
    }

    /// Open a staged edit over this bag.
    pub fn writer(&mut self) -> PropertyBagWriter<'_> {
        PropertyBagWriter::new(self)
    }

    fn nested_bag(&self, key: &str, raw: &RawValue) -> Result<PropertyBag> {
        match EntryKind::of(raw) {
            EntryKind::Object => Ok(Self::from_canonical(
                Arc::from(raw.get()),
                Arc::clone(&self.options),
            )),
            other => Err(PropertyBagError::conversion(
                key,
                ConversionError::UnexpectedShape {
                    type_name: Self::SERDE_NAME.to_string(),
                    found: other.name(),
                },
            )),
        }
    }
}

fn cast<T: 'static, U: 'static>(value: U) -> Option<T> {
    let boxed: Box<dyn Any> = Box::new(value);
    boxed.downcast::<T>().ok().map(|b| *b)
}

impl Default for PropertyBag {
    fn default() -> Self {
        Self::empty(SerializerOptions::shared_default())
    }
}

impl PartialEq for PropertyBag {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl fmt::Display for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyBag").field(&&*self.raw).finish()
    }
}

impl Serialize for PropertyBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let raw: &RawValue = serde_json::from_str(&self.raw).map_err(ser::Error::custom)?;
        serializer.serialize_newtype_struct(Self::SERDE_NAME, raw)
    }
}

impl<'de> Deserialize<'de> for PropertyBag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(Self::SERDE_NAME, PropertyBagVisitor)
    }
}

struct PropertyBagVisitor;

impl PropertyBagVisitor {
    fn from_node<E: de::Error>(node: Value) -> std::result::Result<PropertyBag, E> {
        match node {
            Value::Object(object) => {
                PropertyBag::from_object(&object, SerializerOptions::shared_default())
                    .map_err(E::custom)
            }
            other => Err(E::custom(PropertyBagError::NotAnObject(kind_name(&other)))),
        }
    }
}

impl<'de> Visitor<'de> for PropertyBagVisitor {
    type Value = PropertyBag;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<PropertyBag, D::Error> {
        Self::from_node(Value::deserialize(deserializer)?)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> std::result::Result<PropertyBag, A::Error> {
        let object = Map::<String, Value>::deserialize(de::value::MapAccessDeserializer::new(map))?;
        Self::from_node(Value::Object(object))
    }
}
