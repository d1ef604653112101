use serde_json::Value;

use crate::error::{kind_name, ConversionError};
use crate::serialization::converter::{JsonConverter, TypeDescriptor, TypeShape};
use crate::serialization::options::SerializerOptions;
use crate::types::LocaleTag;

/// Writes locale tags as their canonical tag string and reads them back
/// from any casing or separator style.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocaleTagConverter;

impl LocaleTagConverter {
    fn canonical(ty: &TypeDescriptor<'_>, node: &Value) -> Result<Value, ConversionError> {
        match node {
            Value::Null => Ok(Value::Null),
            Value::String(tag) => Ok(Value::String(LocaleTag::parse(tag)?.as_str().to_owned())),
            other => Err(ConversionError::UnexpectedShape {
                type_name: ty.name.to_string(),
                found: kind_name(other),
            }),
        }
    }
}

impl JsonConverter for LocaleTagConverter {
    fn can_convert(&self, ty: &TypeDescriptor<'_>) -> bool {
        ty.shape == TypeShape::Newtype && ty.name == LocaleTag::SERDE_NAME
    }

    fn write(
        &self,
        ty: &TypeDescriptor<'_>,
        value: Value,
        _options: &SerializerOptions,
    ) -> Result<Value, ConversionError> {
        Self::canonical(ty, &value)
    }

    fn read(
        &self,
        ty: &TypeDescriptor<'_>,
        node: &Value,
        _options: &SerializerOptions,
    ) -> Result<Value, ConversionError> {
        Self::canonical(ty, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_through_options() {
        let options = SerializerOptions::builder().add_locale_tag_converter().build();
        let tag = LocaleTag::parse("pt-BR").unwrap();

        let node = options.to_node(&tag).unwrap();
        assert_eq!(node, json!("pt-BR"));

        let read: LocaleTag = options.from_node(&json!("pt_br")).unwrap();
        assert_eq!(read, tag);
    }

    #[test]
    fn test_null_stays_null() {
        let options = SerializerOptions::builder().add_locale_tag_converter().build();
        let none: Option<LocaleTag> = None;
        assert_eq!(options.to_node(&none).unwrap(), Value::Null);
        let read: Option<LocaleTag> = options.from_node(&Value::Null).unwrap();
        assert_eq!(read, None);
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let options = SerializerOptions::builder().add_locale_tag_converter().build();
        let err = options.from_node::<LocaleTag>(&json!(42)).unwrap_err();
        assert!(matches!(err, ConversionError::UnexpectedShape { found: "number", .. }));
    }
}
