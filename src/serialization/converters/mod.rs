//! Built-in converters.

mod enums;
mod locale;
mod timestamp;

pub use enums::{EnumPolicy, SpecificEnumConverter, StringEnumConverter};
pub use locale::LocaleTagConverter;
pub use timestamp::TimestampConverter;
