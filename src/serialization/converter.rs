//! The converter abstraction used by the serialization pipeline.

use std::fmt;

use serde_json::Value;

use super::options::SerializerOptions;
use crate::error::ConversionError;

/// The shape of a type as serde reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeShape {
    /// A unit-variant enum value.
    Enum,
    /// A newtype struct such as `Timestamp` or `LocaleTag`.
    Newtype,
}

/// Describes the type a converter is being asked about.
///
/// `name` is the serde container name, which for derived types is the
/// type's identifier. `variants` is only populated for enums on read.
#[derive(Clone, Copy, Debug)]
pub struct TypeDescriptor<'a> {
    pub name: &'a str,
    pub shape: TypeShape,
    pub variants: &'a [&'static str],
}

impl<'a> TypeDescriptor<'a> {
    pub fn enumeration(name: &'a str, variants: &'a [&'static str]) -> Self {
        Self {
            name,
            shape: TypeShape::Enum,
            variants,
        }
    }

    pub fn newtype(name: &'a str) -> Self {
        Self {
            name,
            shape: TypeShape::Newtype,
            variants: &[],
        }
    }
}

/// A pluggable translator between one type family and its JSON form.
///
/// Converters work on nodes: `write` receives the node the type produces on
/// its own and returns the wire node, `read` receives the wire node and must
/// return a node the type's own `Deserialize` implementation accepts.
///
/// Resolution over the registered list is first-match-wins, so a converter
/// for one specific type must be registered ahead of any converter that
/// handles its whole family.
pub trait JsonConverter: Send + Sync + fmt::Debug {
    fn can_convert(&self, ty: &TypeDescriptor<'_>) -> bool;

    fn write(
        &self,
        ty: &TypeDescriptor<'_>,
        value: Value,
        options: &SerializerOptions,
    ) -> Result<Value, ConversionError>;

    fn read(
        &self,
        ty: &TypeDescriptor<'_>,
        node: &Value,
        options: &SerializerOptions,
    ) -> Result<Value, ConversionError>;
}
