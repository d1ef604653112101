use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::value::PropertyValue;
use super::PropertyBag;
use crate::error::{kind_name, ConversionError, PropertyBagError, Result};
use crate::serialization::{SerializerOptions, SerializerOptionsProvider};

/// The streaming sink handed to [`PropertyBagFactory::create_with`].
pub type JsonSink<'a> = serde_json::Serializer<&'a mut Vec<u8>>;

/// Creates bags bound to one shared options instance, and diffs them.
///
/// Bags remember the options they were created with; operations that
/// expose a bag's text only accept bags made with the same instance.
#[derive(Clone, Debug)]
pub struct PropertyBagFactory {
    options: Arc<SerializerOptions>,
}

impl PropertyBagFactory {
    pub fn new(options: Arc<SerializerOptions>) -> Self {
        Self { options }
    }

    pub fn from_provider(provider: &dyn SerializerOptionsProvider) -> Self {
        Self::new(provider.instance())
    }

    pub fn options(&self) -> &Arc<SerializerOptions> {
        &self.options
    }

    pub fn create_empty(&self) -> PropertyBag {
        PropertyBag::empty(Arc::clone(&self.options))
    }

    /// Build a bag from key/value pairs.
    ///
    /// Keys are written exactly as given; naming policies only apply inside
    /// the values. A repeated key keeps its last value.
    pub fn create<I, K, V>(&self, properties: I) -> Result<PropertyBag>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        let mut object = Map::new();
        for (key, value) in properties {
            let key = key.into();
            let node = value
                .into()
                .to_entry_node(&self.options)
                .map_err(|e| PropertyBagError::conversion(key.as_str(), e))?;
            object.insert(key, node);
        }
        self.bag_from_object(&object)
    }

    /// Build a bag from UTF-8 JSON text, which must hold one object.
    pub fn create_from_json(&self, json: &[u8]) -> Result<PropertyBag> {
        let text = std::str::from_utf8(json)
            .map_err(|e| PropertyBagError::Malformed(ConversionError::Message(e.to_string())))?;
        self.create_from_str(text)
    }

    pub fn create_from_str(&self, json: &str) -> Result<PropertyBag> {
        let node = self.options.parse(json).map_err(PropertyBagError::Malformed)?;
        self.create_from_node(&node)
    }

    /// Build a bag holding a copy of `node`, which must be an object.
    pub fn create_from_node(&self, node: &Value) -> Result<PropertyBag> {
        match node {
            Value::Object(object) => {
                self.options
                    .check_depth(node)
                    .map_err(PropertyBagError::Malformed)?;
                self.bag_from_object(object)
            }
            other => Err(PropertyBagError::NotAnObject(kind_name(other))),
        }
    }

    /// Build a bag from whatever `write` emits into a JSON sink.
    pub fn create_with<F>(&self, write: F) -> Result<PropertyBag>
    where
        F: FnOnce(&mut JsonSink<'_>) -> std::result::Result<(), serde_json::Error>,
    {
        self.create_with_context((), |(), sink| write(sink))
    }

    /// Like [`create_with`](Self::create_with), passing `context` through to
    /// the callback untouched.
    pub fn create_with_context<C, F>(&self, context: C, write: F) -> Result<PropertyBag>
    where
        F: FnOnce(C, &mut JsonSink<'_>) -> std::result::Result<(), serde_json::Error>,
    {
        let mut buffer = Vec::new();
        {
            let mut sink = serde_json::Serializer::new(&mut buffer);
            write(context, &mut sink).map_err(|e| PropertyBagError::Malformed(e.into()))?;
        }
        self.create_from_json(&buffer)
    }

    /// A new bag with `input`'s properties, overlaid by `set_or_add` and
    /// without `remove`. `input` is left as it was.
    ///
    /// Fails before doing anything else if a key is both set and removed.
    pub fn create_modified<I, K, V, R, S>(
        &self,
        input: &PropertyBag,
        set_or_add: I,
        remove: R,
    ) -> Result<PropertyBag>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set_or_add: Vec<(String, PropertyValue)> = set_or_add
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let remove: BTreeSet<String> = remove.into_iter().map(Into::into).collect();

        if let Some((key, _)) = set_or_add.iter().find(|(k, _)| remove.contains(k)) {
            return Err(PropertyBagError::ConflictingEdit(key.clone()));
        }

        let mut object = input.to_map()?;
        object.retain(|key, _| !remove.contains(key));
        for (key, value) in set_or_add {
            let node = value
                .to_entry_node(&self.options)
                .map_err(|e| PropertyBagError::conversion(key.as_str(), e))?;
            object.insert(key, node);
        }

        log::debug!("Created modified property bag with {} properties", object.len());
        self.bag_from_object(&object)
    }

    /// Stream `bag`'s canonical text to `sink`.
    pub fn write_to<W: io::Write>(&self, bag: &PropertyBag, mut sink: W) -> Result<()> {
        self.check_compatible(bag)?;
        sink.write_all(bag.as_str().as_bytes())?;
        Ok(())
    }

    /// `bag`'s properties as one JSON object node.
    pub fn as_json_value(&self, bag: &PropertyBag) -> Result<Value> {
        self.check_compatible(bag)?;
        Ok(Value::Object(bag.to_map()?))
    }

    fn check_compatible(&self, bag: &PropertyBag) -> Result<()> {
        if bag.shares_options(&self.options) {
            Ok(())
        } else {
            Err(PropertyBagError::IncompatibleBag)
        }
    }

    fn bag_from_object(&self, object: &Map<String, Value>) -> Result<PropertyBag> {
        let bag = PropertyBag::from_object(object, Arc::clone(&self.options))
            .map_err(PropertyBagError::Malformed)?;
        log::debug!("Created property bag with {} properties", object.len());
        Ok(bag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::{SerializeMap, Serializer};
    use serde_json::json;

    fn factory() -> PropertyBagFactory {
        PropertyBagFactory::new(SerializerOptions::builder().build())
    }

    #[test]
    fn test_create_keeps_top_level_keys() {
        let bag = factory()
            .create([("Foo", PropertyValue::from(1)), ("bar", json!(2).into())])
            .unwrap();
        assert_eq!(bag.as_str(), r#"{"Foo":1,"bar":2}"#);
    }

    #[test]
    fn test_create_writes_explicit_nulls() {
        let none: Option<i32> = None;
        let bag = factory().create([("gone", none)]).unwrap();
        assert_eq!(bag.as_str(), r#"{"gone":null}"#);
    }

    #[test]
    fn test_create_from_text_rejects_non_objects() {
        let factory = factory();
        assert!(matches!(
            factory.create_from_str("[1]"),
            Err(PropertyBagError::NotAnObject("array"))
        ));
        assert!(matches!(
            factory.create_from_json(b"{\"a\":"),
            Err(PropertyBagError::Malformed(_))
        ));
        let bag = factory.create_from_json(b"{ \"a\" : 1 /* one */ }").unwrap();
        assert_eq!(bag.as_str(), r#"{"a":1}"#);
    }

    #[test]
    fn test_construction_paths_converge() {
        let factory = factory();
        let from_text = factory.create_from_str(r#"{"k":[1,{"x":null}]}"#).unwrap();
        let from_node = factory.create_from_node(&json!({ "k": [1, { "x": null }] })).unwrap();
        let from_sink = factory
            .create_with(|sink| {
                let mut map = sink.serialize_map(Some(1))?;
                map.serialize_entry("k", &json!([1, { "x": null }]))?;
                map.end()
            })
            .unwrap();
        assert_eq!(from_text, from_node);
        assert_eq!(from_text, from_sink);
    }

    #[test]
    fn test_create_modified_overlays_and_removes() {
        let factory = factory();
        let input = factory.create_from_str(r#"{"a":1,"b":2,"c":3}"#).unwrap();
        let output = factory
            .create_modified(
                &input,
                [("b", PropertyValue::from("two")), ("d", PropertyValue::from(4))],
                ["c"],
            )
            .unwrap();
        assert_eq!(output.as_str(), r#"{"a":1,"b":"two","d":4}"#);
        assert_eq!(input.as_str(), r#"{"a":1,"b":2,"c":3}"#);
    }

    #[test]
    fn test_create_modified_conflict() {
        let factory = factory();
        let input = factory.create_empty();
        let err = factory
            .create_modified(&input, [("x", 1)], ["x"])
            .unwrap_err();
        assert!(matches!(err, PropertyBagError::ConflictingEdit(ref key) if key == "x"));
    }

    #[test]
    fn test_nested_bags_count_toward_max_depth() {
        let inner_text = r#"{"a":{"b":{"c":1}}}"#;

        let shallow = PropertyBagFactory::new(SerializerOptions::builder().max_depth(5).build());
        let inner = shallow.create_from_str(inner_text).unwrap();
        let err = shallow.create([("x", vec![vec![inner]])]).unwrap_err();
        assert!(matches!(
            err,
            PropertyBagError::Serialization {
                ref key,
                source: ConversionError::DepthExceeded { max: 5 },
            } if key == "x"
        ));

        let roomy = PropertyBagFactory::new(SerializerOptions::builder().max_depth(6).build());
        let inner = roomy.create_from_str(inner_text).unwrap();
        let outer = roomy.create([("x", vec![vec![inner]])]).unwrap();
        assert_eq!(outer.as_str(), r#"{"x":[[{"a":{"b":{"c":1}}}]]}"#);
        assert_eq!(roomy.create_from_str(outer.as_str()).unwrap(), outer);
    }

    #[test]
    fn test_entry_depth_matches_parse_depth() {
        let factory = PropertyBagFactory::new(SerializerOptions::builder().max_depth(2).build());
        assert!(factory.create([("x", vec![1])]).is_ok());
        assert!(factory.create_from_str(r#"{"x":[1]}"#).is_ok());
        assert!(factory.create([("x", vec![vec![1]])]).is_err());
        assert!(factory.create_from_str(r#"{"x":[[1]]}"#).is_err());
    }

    #[test]
    fn test_write_to_requires_same_options() {
        let factory = factory();
        let bag = factory.create_from_str(r#"{"a":true}"#).unwrap();
        let mut out = Vec::new();
        factory.write_to(&bag, &mut out).unwrap();
        assert_eq!(out, br#"{"a":true}"#);

        let other = PropertyBagFactory::new(SerializerOptions::builder().build());
        assert!(matches!(
            other.write_to(&bag, Vec::new()),
            Err(PropertyBagError::IncompatibleBag)
        ));
        assert!(matches!(other.as_json_value(&bag), Err(PropertyBagError::IncompatibleBag)));
        assert_eq!(factory.as_json_value(&bag).unwrap(), json!({ "a": true }));
    }
}
