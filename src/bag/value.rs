use std::any::Any;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ConversionError;
use crate::serialization::SerializerOptions;

trait ErasedValue: Send + Sync {
    fn to_node(&self, options: &SerializerOptions) -> Result<Value, ConversionError>;
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T> ErasedValue for T
where
    T: Serialize + Send + Sync + 'static,
{
    fn to_node(&self, options: &SerializerOptions) -> Result<Value, ConversionError> {
        // A JSON node is stored as given, without naming policies.
        if let Some(node) = (self as &dyn Any).downcast_ref::<Value>() {
            return Ok(node.clone());
        }
        options.to_node(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A typed value waiting to be written into a bag.
///
/// Any serializable value converts into one. Conversion to JSON is deferred
/// until the value is committed, and goes through the bag's options.
pub struct PropertyValue(Box<dyn ErasedValue>);

impl PropertyValue {
    pub fn new<T: Serialize + Send + Sync + 'static>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// An explicit JSON null.
    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    pub fn to_node(&self, options: &SerializerOptions) -> Result<Value, ConversionError> {
        self.0.to_node(options)
    }

    /// The node stored under a bag key. The bag's own object counts as the
    /// first level of nesting.
    pub(crate) fn to_entry_node(
        &self,
        options: &SerializerOptions,
    ) -> Result<Value, ConversionError> {
        let node = self.to_node(options)?;
        options.check_depth_at(&node, 1)?;
        Ok(node)
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl<T: Serialize + Send + Sync + 'static> From<T> for PropertyValue {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyValue").field(&self.0.type_name()).finish()
    }
}
