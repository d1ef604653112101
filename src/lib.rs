//! Open-ended property bags stored as one canonical JSON object.
//!
//! A [`PropertyBag`] is an immutable snapshot of named values. Values are
//! converted lazily on lookup through a shared [`SerializerOptions`]
//! instance, which carries naming policies and an ordered, first-match-wins
//! converter list. Edits go through a [`PropertyBagWriter`] and new bags
//! come from a [`PropertyBagFactory`].
//!
//! ```
//! use jsonbag::{PropertyBagFactory, SerializerOptions};
//!
//! let factory = PropertyBagFactory::new(SerializerOptions::builder().build());
//! let mut bag = factory.create_from_str(r#"{"a":"1"}"#).unwrap();
//! assert_eq!(bag.try_get::<String>("a").unwrap().as_deref(), Some("1"));
//!
//! let mut writer = bag.writer();
//! writer.set("a", 2);
//! writer.commit().unwrap();
//! drop(writer);
//! assert_eq!(bag.as_str(), r#"{"a":2}"#);
//! ```

pub mod bag;
pub mod error;
pub mod serialization;
pub mod types;

pub use bag::{
    EntryKind, JsonSink, PropertyBag, PropertyBagFactory, PropertyBagWriter, PropertyValue,
    WriterState,
};
pub use error::{ConversionError, PropertyBagError, Result};
pub use serialization::{
    CommentHandling, EnumPolicy, JsonConverter, NamingPolicy, OptionsConfig, SerializerOptions,
    SerializerOptionsBuilder, SerializerOptionsProvider,
};
pub use types::{LocaleTag, Timestamp};
