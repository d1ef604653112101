use std::fmt::Display;

use thiserror::Error;

/// The underlying reason a value could not be converted to or from JSON.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),

    #[error("Maximum nesting depth of {max} exceeded")]
    DepthExceeded { max: usize },

    #[error("Invalid locale tag '{0}'")]
    InvalidLocaleTag(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Unknown value '{value}' for enum {type_name}")]
    UnknownEnumValue { type_name: String, value: String },

    #[error("Integer values are not allowed for enum {0}")]
    IntegerEnumValueNotAllowed(String),

    #[error("Cannot read {type_name} from {found}")]
    UnexpectedShape {
        type_name: String,
        found: &'static str,
    },
}

impl serde::ser::Error for ConversionError {
    fn custom<T: Display>(msg: T) -> Self {
        ConversionError::Message(msg.to_string())
    }
}

impl serde::de::Error for ConversionError {
    fn custom<T: Display>(msg: T) -> Self {
        ConversionError::Message(msg.to_string())
    }
}

/// Errors surfaced by property bags, their writers and the factory.
#[derive(Error, Debug)]
pub enum PropertyBagError {
    /// A present property could not be converted to or from the requested type.
    #[error("Failed to convert property '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: ConversionError,
    },

    #[error("Property '{0}' is both set and removed")]
    ConflictingEdit(String),

    #[error("This property bag did not come from this factory")]
    IncompatibleBag,

    #[error("Property bag JSON must be an object, found {0}")]
    NotAnObject(&'static str),

    #[error("Malformed property bag JSON: {0}")]
    Malformed(#[source] ConversionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PropertyBagError {
    pub(crate) fn conversion(key: impl Into<String>, source: ConversionError) -> Self {
        PropertyBagError::Serialization {
            key: key.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PropertyBagError>;

/// Short JSON kind name used in error messages.
pub(crate) fn kind_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
