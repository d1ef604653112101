use std::collections::HashMap;

use serde_json::Value;

use crate::error::{kind_name, ConversionError};
use crate::serialization::converter::{JsonConverter, TypeDescriptor, TypeShape};
use crate::serialization::naming::NamingPolicy;
use crate::serialization::options::SerializerOptions;

/// Writes unit variants as strings transformed by a naming policy, for every
/// enum type.
///
/// On read a string matches a variant if it equals either the transformed
/// or the declared variant name. Integers are accepted as variant indices
/// only when `allow_integer_values` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringEnumConverter {
    naming: Option<NamingPolicy>,
    allow_integer_values: bool,
}

impl StringEnumConverter {
    pub fn new(naming: Option<NamingPolicy>, allow_integer_values: bool) -> Self {
        Self {
            naming,
            allow_integer_values,
        }
    }

    pub fn naming(&self) -> Option<NamingPolicy> {
        self.naming
    }

    pub fn allow_integer_values(&self) -> bool {
        self.allow_integer_values
    }

    fn wire_name(&self, variant: &str) -> String {
        match self.naming {
            Some(policy) => policy.convert(variant),
            None => variant.to_owned(),
        }
    }

    fn write_node(&self, value: Value) -> Value {
        match value {
            Value::String(variant) => Value::String(self.wire_name(&variant)),
            other => other,
        }
    }

    fn read_node(&self, ty: &TypeDescriptor<'_>, node: &Value) -> Result<Value, ConversionError> {
        match node {
            Value::String(text) => ty
                .variants
                .iter()
                .find(|v| **v == text.as_str() || self.wire_name(v) == *text)
                .map(|v| Value::String((*v).to_owned()))
                .ok_or_else(|| ConversionError::UnknownEnumValue {
                    type_name: ty.name.to_string(),
                    value: text.clone(),
                }),
            Value::Number(number) => {
                if !self.allow_integer_values {
                    return Err(ConversionError::IntegerEnumValueNotAllowed(ty.name.to_string()));
                }
                number
                    .as_u64()
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| ty.variants.get(i))
                    .map(|v| Value::String((*v).to_owned()))
                    .ok_or_else(|| ConversionError::UnknownEnumValue {
                        type_name: ty.name.to_string(),
                        value: number.to_string(),
                    })
            }
            // Data-carrying variants are left to the type's own shape.
            Value::Object(_) => Ok(node.clone()),
            other => Err(ConversionError::UnexpectedShape {
                type_name: ty.name.to_string(),
                found: kind_name(other),
            }),
        }
    }
}

impl Default for StringEnumConverter {
    fn default() -> Self {
        Self::new(None, true)
    }
}

impl JsonConverter for StringEnumConverter {
    fn can_convert(&self, ty: &TypeDescriptor<'_>) -> bool {
        ty.shape == TypeShape::Enum
    }

    fn write(
        &self,
        _ty: &TypeDescriptor<'_>,
        value: Value,
        _options: &SerializerOptions,
    ) -> Result<Value, ConversionError> {
        Ok(self.write_node(value))
    }

    fn read(
        &self,
        ty: &TypeDescriptor<'_>,
        node: &Value,
        _options: &SerializerOptions,
    ) -> Result<Value, ConversionError> {
        self.read_node(ty, node)
    }
}

/// A naming policy for one enum type, keyed by its serde name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumPolicy {
    type_name: String,
    naming: Option<NamingPolicy>,
    allow_integer_values: bool,
}

impl EnumPolicy {
    /// `type_name` is the serde container name, which is the type's
    /// identifier unless `#[serde(rename)]` says otherwise.
    pub fn named(
        type_name: impl Into<String>,
        naming: Option<NamingPolicy>,
        allow_integer_values: bool,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            naming,
            allow_integer_values,
        }
    }

    /// Policy keyed by the Rust type's own identifier.
    ///
    /// Only the last path segment is kept, because serde's container name is
    /// all a serializer sees. Two enums with the same identifier in different
    /// modules therefore share one policy. Use [`named`](Self::named) with a
    /// `#[serde(rename)]` container name to tell them apart.
    pub fn for_type<T: ?Sized>(naming: Option<NamingPolicy>, allow_integer_values: bool) -> Self {
        Self::named(short_type_name::<T>(), naming, allow_integer_values)
    }

    pub fn camel_case<T: ?Sized>() -> Self {
        Self::for_type::<T>(Some(NamingPolicy::CamelCase), false)
    }

    pub fn pascal_case<T: ?Sized>() -> Self {
        Self::for_type::<T>(Some(NamingPolicy::PascalCase), false)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Applies per-type enum policies. Types without a policy are left to
/// later converters.
#[derive(Debug, Clone, Default)]
pub struct SpecificEnumConverter {
    policies: HashMap<String, StringEnumConverter>,
}

impl SpecificEnumConverter {
    /// When a type is given more than one policy the last one applies.
    pub fn new(policies: impl IntoIterator<Item = EnumPolicy>) -> Self {
        let policies = policies
            .into_iter()
            .map(|p| {
                (
                    p.type_name,
                    StringEnumConverter::new(p.naming, p.allow_integer_values),
                )
            })
            .collect();
        Self { policies }
    }

    fn policy_for(&self, ty: &TypeDescriptor<'_>) -> Result<&StringEnumConverter, ConversionError> {
        self.policies
            .get(ty.name)
            .ok_or_else(|| {
                ConversionError::Message(format!("no enum policy registered for {}", ty.name))
            })
    }
}

impl JsonConverter for SpecificEnumConverter {
    fn can_convert(&self, ty: &TypeDescriptor<'_>) -> bool {
        ty.shape == TypeShape::Enum && self.policies.contains_key(ty.name)
    }

    fn write(
        &self,
        ty: &TypeDescriptor<'_>,
        value: Value,
        _options: &SerializerOptions,
    ) -> Result<Value, ConversionError> {
        Ok(self.policy_for(ty)?.write_node(value))
    }

    fn read(
        &self,
        ty: &TypeDescriptor<'_>,
        node: &Value,
        _options: &SerializerOptions,
    ) -> Result<Value, ConversionError> {
        self.policy_for(ty)?.read_node(ty, node)
    }
}
