//! Serializer options and the converter pipeline.
//!
//! Every typed value that enters or leaves a property bag passes through a
//! [`SerializerOptions`] instance: naming policies, null omission, depth
//! limits and the ordered converter list all live there.

pub mod converter;
pub mod converters;
mod de;
mod lenient;
pub mod naming;
pub mod options;
mod ser;

pub use converter::{JsonConverter, TypeDescriptor, TypeShape};
pub use converters::{
    EnumPolicy, LocaleTagConverter, SpecificEnumConverter, StringEnumConverter, TimestampConverter,
};
pub use naming::NamingPolicy;
pub use options::{
    CommentHandling, OptionsConfig, SerializerOptions, SerializerOptionsBuilder,
    SerializerOptionsProvider, DEFAULT_MAX_DEPTH,
};
