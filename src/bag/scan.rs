//! Single forward passes over a bag's canonical text.
//!
//! Values are captured as `&RawValue` borrowed from the text, so a lookup
//! allocates nothing beyond escaped keys.

use std::borrow::Cow;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde_json::value::RawValue;

/// Kind of a top-level entry, decided once from the first byte of its raw
/// text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Object,
    Array,
    String,
    /// A number that fits in an `i64`.
    Integer,
    /// Any other number.
    Decimal,
    Boolean,
    Null,
}

impl EntryKind {
    pub(crate) fn of(raw: &RawValue) -> Self {
        let text = raw.get().trim_start();
        match text.as_bytes().first() {
            Some(b'{') => EntryKind::Object,
            Some(b'[') => EntryKind::Array,
            Some(b'"') => EntryKind::String,
            Some(b't') | Some(b'f') => EntryKind::Boolean,
            Some(b'n') | None => EntryKind::Null,
            Some(_) if text.trim_end().parse::<i64>().is_ok() => EntryKind::Integer,
            Some(_) => EntryKind::Decimal,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            EntryKind::Object => "object",
            EntryKind::Array => "array",
            EntryKind::String => "string",
            EntryKind::Integer | EntryKind::Decimal => "number",
            EntryKind::Boolean => "boolean",
            EntryKind::Null => "null",
        }
    }
}

/// An object key, borrowed unless it contained escapes.
struct ScanKey<'de>(Cow<'de, str>);

impl<'de> Deserialize<'de> for ScanKey<'de> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = ScanKey<'de>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a property name")
            }

            fn visit_borrowed_str<E: de::Error>(self, v: &'de str) -> Result<Self::Value, E> {
                Ok(ScanKey(Cow::Borrowed(v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(ScanKey(Cow::Owned(v.to_owned())))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(ScanKey(Cow::Owned(v)))
            }
        }

        deserializer.deserialize_str(KeyVisitor)
    }
}

struct FindEntry<'k> {
    key: &'k str,
}

impl<'de, 'k> Visitor<'de> for FindEntry<'k> {
    type Value = Option<&'de RawValue>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut found = None;
        while let Some(ScanKey(name)) = map.next_key()? {
            // First occurrence of a duplicated key wins.
            if found.is_none() && name == self.key {
                found = Some(map.next_value::<&'de RawValue>()?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(found)
    }
}

struct ListEntries;

impl<'de> Visitor<'de> for ListEntries {
    type Value = Vec<(String, EntryKind)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(ScanKey(name)) = map.next_key()? {
            let raw = map.next_value::<&'de RawValue>()?;
            entries.push((name.into_owned(), EntryKind::of(raw)));
        }
        Ok(entries)
    }
}

/// Find the raw value stored under `key`, comparing names exactly.
///
/// The whole document is consumed, so text that is malformed after the
/// match is still an error.
pub(crate) fn find<'a>(
    json: &'a str,
    key: &str,
) -> Result<Option<&'a RawValue>, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(json);
    let found = (&mut de).deserialize_map(FindEntry { key })?;
    de.end()?;
    Ok(found)
}

pub(crate) fn entries(json: &str) -> Result<Vec<(String, EntryKind)>, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(json);
    let entries = (&mut de).deserialize_map(ListEntries)?;
    de.end()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_is_exact_and_first_wins() {
        let json = r#"{"Name":1,"name":{"x":[1,2]},"name":3}"#;
        assert_eq!(find(json, "name").unwrap().unwrap().get(), r#"{"x":[1,2]}"#);
        assert_eq!(find(json, "Name").unwrap().unwrap().get(), "1");
        assert!(find(json, "NAME").unwrap().is_none());
    }

    #[test]
    fn test_find_escaped_key() {
        let json = r#"{"a\"b":true}"#;
        assert_eq!(find(json, "a\"b").unwrap().unwrap().get(), "true");
    }

    #[test]
    fn test_malformed_after_match_is_error() {
        assert!(find(r#"{"a":1,"b":}"#, "a").is_err());
        assert!(find("[1,2]", "a").is_err());
    }

    #[test]
    fn test_entry_kinds() {
        let json = concat!(
            r#"{"o":{},"a":[],"s":"x","i":-4,"d":1.5,"#,
            r#""big":18446744073709551616,"b":false,"n":null}"#
        );
        let kinds: Vec<EntryKind> = entries(json).unwrap().into_iter().map(|(_, k)| k).collect();
        assert_eq!(
            kinds,
            vec![
                EntryKind::Object,
                EntryKind::Array,
                EntryKind::String,
                EntryKind::Integer,
                EntryKind::Decimal,
                EntryKind::Decimal,
                EntryKind::Boolean,
                EntryKind::Null,
            ]
        );
    }
}
