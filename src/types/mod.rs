//! Value types that the converter pipeline knows how to shape.
//!
//! Both serialize as serde newtypes, so they round-trip as plain strings
//! through any serde format and are picked up by their converters when a
//! bag's options register them.

mod locale;
mod timestamp;

pub use locale::LocaleTag;
pub use timestamp::Timestamp;
