use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ConversionError;

/// A BCP 47 language tag kept in canonical casing.
///
/// The empty tag is the invariant locale.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocaleTag(String);

impl LocaleTag {
    pub const SERDE_NAME: &'static str = "LocaleTag";

    pub fn invariant() -> Self {
        Self(String::new())
    }

    /// Parse and canonicalize a tag: language lowercase, script titlecase,
    /// region uppercase, everything else lowercase. `_` is accepted as a
    /// subtag separator.
    pub fn parse(tag: &str) -> Result<Self, ConversionError> {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Ok(Self::invariant());
        }

        let invalid = || ConversionError::InvalidLocaleTag(tag.to_string());
        let mut subtags: Vec<String> = Vec::new();
        let mut in_extension = false;

        for (i, subtag) in trimmed.split(['-', '_']).enumerate() {
            let len = subtag.len();
            if len == 0 || len > 8 || !subtag.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(invalid());
            }

            let alphabetic = subtag.bytes().all(|b| b.is_ascii_alphabetic());
            let canonical = if i == 0 {
                if len < 2 || !alphabetic {
                    return Err(invalid());
                }
                subtag.to_ascii_lowercase()
            } else if in_extension {
                subtag.to_ascii_lowercase()
            } else if len == 1 {
                in_extension = true;
                subtag.to_ascii_lowercase()
            } else if i == 1 && len == 4 && alphabetic {
                titlecase(subtag)
            } else if (len == 2 && alphabetic)
                || (len == 3 && subtag.bytes().all(|b| b.is_ascii_digit()))
            {
                subtag.to_ascii_uppercase()
            } else {
                subtag.to_ascii_lowercase()
            };
            subtags.push(canonical);
        }

        Ok(Self(subtags.join("-")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_invariant(&self) -> bool {
        self.0.is_empty()
    }

    /// The primary language subtag, empty for the invariant locale.
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }

    pub fn region(&self) -> Option<&str> {
        self.0
            .split('-')
            .skip(1)
            .take_while(|s| s.len() > 1)
            .find(|s| s.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()))
    }
}

fn titlecase(subtag: &str) -> String {
    let lower = subtag.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => lower,
    }
}

impl FromStr for LocaleTag {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LocaleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for LocaleTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(Self::SERDE_NAME, self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for LocaleTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(Self::SERDE_NAME, LocaleTagVisitor)
    }
}

struct LocaleTagVisitor;

impl<'de> Visitor<'de> for LocaleTagVisitor {
    type Value = LocaleTag;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a language tag")
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<LocaleTag, D::Error> {
        let text = String::deserialize(deserializer)?;
        LocaleTag::parse(&text).map_err(de::Error::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<LocaleTag, E> {
        LocaleTag::parse(v).map_err(E::custom)
    }
}
