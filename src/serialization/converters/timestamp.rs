use serde_json::{Map, Value};

use crate::error::{kind_name, ConversionError};
use crate::serialization::converter::{JsonConverter, TypeDescriptor, TypeShape};
use crate::serialization::options::SerializerOptions;
use crate::types::Timestamp;

const ISO_FIELD: &str = "dateTimeOffset";
const UNIX_FIELD: &str = "unixTime";

/// Writes timestamps as `{"dateTimeOffset": <ISO 8601>, "unixTime": <ms>}`.
///
/// Reads either that object or a bare ISO 8601 string. Only the ISO field
/// is consulted on read; the Unix time is informational.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampConverter;

impl JsonConverter for TimestampConverter {
    fn can_convert(&self, ty: &TypeDescriptor<'_>) -> bool {
        ty.shape == TypeShape::Newtype && ty.name == Timestamp::SERDE_NAME
    }

    fn write(
        &self,
        ty: &TypeDescriptor<'_>,
        value: Value,
        _options: &SerializerOptions,
    ) -> Result<Value, ConversionError> {
        let Value::String(text) = value else {
            return Err(ConversionError::UnexpectedShape {
                type_name: ty.name.to_string(),
                found: kind_name(&value),
            });
        };
        let timestamp = Timestamp::parse(&text)?;

        let mut object = Map::new();
        object.insert(ISO_FIELD.to_string(), Value::String(timestamp.to_iso8601()));
        object.insert(UNIX_FIELD.to_string(), Value::from(timestamp.unix_time_millis()));
        Ok(Value::Object(object))
    }

    fn read(
        &self,
        ty: &TypeDescriptor<'_>,
        node: &Value,
        _options: &SerializerOptions,
    ) -> Result<Value, ConversionError> {
        let text = match node {
            Value::String(text) => text,
            Value::Object(object) => match object.get(ISO_FIELD) {
                Some(Value::String(text)) => text,
                Some(other) => {
                    return Err(ConversionError::InvalidTimestamp(format!(
                        "'{}' must be a string, found {}",
                        ISO_FIELD,
                        kind_name(other)
                    )))
                }
                None => {
                    return Err(ConversionError::InvalidTimestamp(format!(
                        "missing '{}' field",
                        ISO_FIELD
                    )))
                }
            },
            other => {
                return Err(ConversionError::UnexpectedShape {
                    type_name: ty.name.to_string(),
                    found: kind_name(other),
                })
            }
        };

        Ok(Value::String(Timestamp::parse(text)?.to_iso8601()))
    }
}
