//! Shared, immutable serializer configuration and the builder that produces it.
//!
//! Options are assembled once from an ordered, append-only converter list and
//! then frozen behind an `Arc`. Nothing mutates a published instance; property
//! bags and factories hold clones of the `Arc`.

use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::converter::{JsonConverter, TypeDescriptor};
use super::converters::{EnumPolicy, LocaleTagConverter, SpecificEnumConverter, TimestampConverter};
use super::de::NodeDeserializer;
use super::lenient;
use super::naming::NamingPolicy;
use super::ser::NodeSerializer;
use crate::error::ConversionError;

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// How comments in JSON text are treated when parsing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentHandling {
    /// Comments are a parse error.
    Disallow,
    /// `//` and `/* */` comments are skipped.
    #[default]
    Skip,
}

/// Serializable form of the option knobs, for loading from configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub property_naming_policy: Option<NamingPolicy>,
    pub dictionary_key_policy: Option<NamingPolicy>,
    pub ignore_null_values: bool,
    pub allow_trailing_commas: bool,
    pub comment_handling: CommentHandling,
    pub max_depth: usize,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            property_naming_policy: Some(NamingPolicy::CamelCase),
            dictionary_key_policy: Some(NamingPolicy::CamelCase),
            ignore_null_values: true,
            allow_trailing_commas: false,
            comment_handling: CommentHandling::Skip,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The shared serializer configuration used for every typed conversion.
#[derive(Debug)]
pub struct SerializerOptions {
    property_naming_policy: Option<NamingPolicy>,
    dictionary_key_policy: Option<NamingPolicy>,
    ignore_null_values: bool,
    allow_trailing_commas: bool,
    comment_handling: CommentHandling,
    max_depth: usize,
    converters: Vec<Arc<dyn JsonConverter>>,
}

impl SerializerOptions {
    pub fn builder() -> SerializerOptionsBuilder {
        SerializerOptionsBuilder::new()
    }

    /// Options with the default policy bundle and no converters.
    ///
    /// Used by bags that are created without a factory, and by bags that are
    /// deserialized as plain values.
    pub fn shared_default() -> Arc<SerializerOptions> {
        static DEFAULT: OnceLock<Arc<SerializerOptions>> = OnceLock::new();
        Arc::clone(DEFAULT.get_or_init(|| SerializerOptionsBuilder::new().build()))
    }

    pub fn property_naming_policy(&self) -> Option<NamingPolicy> {
        self.property_naming_policy
    }

    pub fn dictionary_key_policy(&self) -> Option<NamingPolicy> {
        self.dictionary_key_policy
    }

    pub fn ignore_null_values(&self) -> bool {
        self.ignore_null_values
    }

    pub fn allow_trailing_commas(&self) -> bool {
        self.allow_trailing_commas
    }

    pub fn comment_handling(&self) -> CommentHandling {
        self.comment_handling
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The registered converters, in resolution order.
    pub fn converters(&self) -> &[Arc<dyn JsonConverter>] {
        &self.converters
    }

    /// Resolve the converter for a type: the first registered one that accepts it.
    pub fn converter_for(&self, ty: &TypeDescriptor<'_>) -> Option<&dyn JsonConverter> {
        let found = self
            .converters
            .iter()
            .find(|c| c.can_convert(ty))
            .map(|c| c.as_ref());
        if let Some(converter) = found {
            log::trace!("Resolved converter {:?} for {}", converter, ty.name);
        }
        found
    }

    /// Apply the member naming policy to a struct field name.
    pub fn member_name<'n>(&self, name: &'n str) -> Cow<'n, str> {
        match self.property_naming_policy {
            Some(policy) => Cow::Owned(policy.convert(name)),
            None => Cow::Borrowed(name),
        }
    }

    /// Apply the dictionary key policy to a map key.
    pub fn dictionary_key(&self, key: String) -> String {
        match self.dictionary_key_policy {
            Some(policy) => policy.convert(&key),
            None => key,
        }
    }

    /// Convert a value to a JSON node through the converter pipeline.
    pub fn to_node<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, ConversionError> {
        value.serialize(NodeSerializer::new(self))
    }

    /// Convert a JSON node to a value through the converter pipeline.
    pub fn from_node<T: DeserializeOwned>(&self, node: &Value) -> Result<T, ConversionError> {
        T::deserialize(NodeDeserializer::new(node, self))
    }

    pub fn to_json_string<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<String, ConversionError> {
        Ok(serde_json::to_string(&self.to_node(value)?)?)
    }

    pub fn from_json_str<T: DeserializeOwned>(&self, json: &str) -> Result<T, ConversionError> {
        let node = self.parse(json)?;
        self.from_node(&node)
    }

    /// Parse JSON text honouring the comment, trailing comma and depth settings.
    pub fn parse(&self, json: &str) -> Result<Value, ConversionError> {
        let text = lenient::relax(json, self.comment_handling, self.allow_trailing_commas);
        let node: Value = serde_json::from_str(&text)?;
        self.check_depth(&node)?;
        Ok(node)
    }

    pub(crate) fn check_depth(&self, node: &Value) -> Result<(), ConversionError> {
        self.check_depth_at(node, 0)
    }

    /// Depth check for a node that sits below `depth` enclosing containers.
    pub(crate) fn check_depth_at(&self, node: &Value, depth: usize) -> Result<(), ConversionError> {
        if exceeds_depth(node, depth, self.max_depth) {
            return Err(ConversionError::DepthExceeded {
                max: self.max_depth,
            });
        }
        Ok(())
    }
}

fn exceeds_depth(node: &Value, depth: usize, max: usize) -> bool {
    match node {
        Value::Array(items) => {
            depth + 1 > max || items.iter().any(|v| exceeds_depth(v, depth + 1, max))
        }
        Value::Object(map) => {
            depth + 1 > max || map.values().any(|v| exceeds_depth(v, depth + 1, max))
        }
        _ => false,
    }
}

/// Supplies the one shared options instance an application uses.
pub trait SerializerOptionsProvider: Send + Sync {
    fn instance(&self) -> Arc<SerializerOptions>;
}

impl SerializerOptionsProvider for Arc<SerializerOptions> {
    fn instance(&self) -> Arc<SerializerOptions> {
        Arc::clone(self)
    }
}

enum Registration {
    Converter(Arc<dyn JsonConverter>),
    /// Placeholder for the specific-enum converter; its position is fixed
    /// by the first enum policy registered.
    SpecificEnums,
}

/// Assembles a [`SerializerOptions`] from policy settings and an ordered
/// converter list.
pub struct SerializerOptionsBuilder {
    property_naming_policy: Option<NamingPolicy>,
    dictionary_key_policy: Option<NamingPolicy>,
    ignore_null_values: bool,
    allow_trailing_commas: bool,
    comment_handling: CommentHandling,
    max_depth: usize,
    registrations: Vec<Registration>,
    enum_policies: Vec<EnumPolicy>,
    has_locale_tag_converter: bool,
    has_timestamp_converter: bool,
}

impl SerializerOptionsBuilder {
    pub fn new() -> Self {
        Self::from_config(&OptionsConfig::default())
    }

    pub fn from_config(config: &OptionsConfig) -> Self {
        Self {
            property_naming_policy: config.property_naming_policy,
            dictionary_key_policy: config.dictionary_key_policy,
            ignore_null_values: config.ignore_null_values,
            allow_trailing_commas: config.allow_trailing_commas,
            comment_handling: config.comment_handling,
            max_depth: config.max_depth,
            registrations: Vec::new(),
            enum_policies: Vec::new(),
            has_locale_tag_converter: false,
            has_timestamp_converter: false,
        }
    }

    pub fn property_naming_policy(mut self, policy: Option<NamingPolicy>) -> Self {
        self.property_naming_policy = policy;
        self
    }

    pub fn dictionary_key_policy(mut self, policy: Option<NamingPolicy>) -> Self {
        self.dictionary_key_policy = policy;
        self
    }

    pub fn ignore_null_values(mut self, ignore: bool) -> Self {
        self.ignore_null_values = ignore;
        self
    }

    pub fn allow_trailing_commas(mut self, allow: bool) -> Self {
        self.allow_trailing_commas = allow;
        self
    }

    pub fn comment_handling(mut self, handling: CommentHandling) -> Self {
        self.comment_handling = handling;
        self
    }

    /// Maximum container nesting accepted on read and produced on write.
    /// Zero selects the default.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Append a converter to the end of the resolution order.
    pub fn add_converter(self, converter: impl JsonConverter + 'static) -> Self {
        self.add_shared_converter(Arc::new(converter))
    }

    pub fn add_shared_converter(mut self, converter: Arc<dyn JsonConverter>) -> Self {
        self.registrations.push(Registration::Converter(converter));
        self
    }

    /// Append converters in the order the iterator yields them.
    pub fn add_converters<I>(self, converters: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn JsonConverter>>,
    {
        converters
            .into_iter()
            .fold(self, |builder, c| builder.add_shared_converter(c))
    }

    /// Serialize locale tags as their canonical tag string. Registering twice
    /// has no further effect.
    pub fn add_locale_tag_converter(mut self) -> Self {
        if !self.has_locale_tag_converter {
            self.has_locale_tag_converter = true;
            self = self.add_converter(LocaleTagConverter);
        }
        self
    }

    /// Serialize timestamps as an object holding both the ISO 8601 text and
    /// the Unix time in milliseconds. Registering twice has no further effect.
    pub fn add_timestamp_converter(mut self) -> Self {
        if !self.has_timestamp_converter {
            self.has_timestamp_converter = true;
            self = self.add_converter(TimestampConverter);
        }
        self
    }

    /// Give one enum type its own naming policy.
    ///
    /// Must be called before registering any converter that handles every
    /// enum type, otherwise that converter wins for this type too.
    pub fn add_enum_policy(mut self, policy: EnumPolicy) -> Self {
        if self.enum_policies.is_empty() {
            self.registrations.push(Registration::SpecificEnums);
        }
        self.enum_policies.push(policy);
        self
    }

    pub fn add_enum_policies<I>(self, policies: I) -> Self
    where
        I: IntoIterator<Item = EnumPolicy>,
    {
        policies
            .into_iter()
            .fold(self, |builder, p| builder.add_enum_policy(p))
    }

    /// Freeze the configuration.
    pub fn build(self) -> Arc<SerializerOptions> {
        let mut specific = Some(SpecificEnumConverter::new(self.enum_policies));
        let converters = self
            .registrations
            .into_iter()
            .filter_map(|registration| match registration {
                Registration::Converter(converter) => Some(converter),
                Registration::SpecificEnums => specific
                    .take()
                    .map(|c| Arc::new(c) as Arc<dyn JsonConverter>),
            })
            .collect::<Vec<_>>();

        log::debug!("Built serializer options with {} converters", converters.len());

        Arc::new(SerializerOptions {
            property_naming_policy: self.property_naming_policy,
            dictionary_key_policy: self.dictionary_key_policy,
            ignore_null_values: self.ignore_null_values,
            allow_trailing_commas: self.allow_trailing_commas,
            comment_handling: self.comment_handling,
            max_depth: if self.max_depth == 0 {
                DEFAULT_MAX_DEPTH
            } else {
                self.max_depth
            },
            converters,
        })
    }
}

impl Default for SerializerOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
