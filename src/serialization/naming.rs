//! Naming policies applied to member names, dictionary keys and enum values.

use serde::{Deserialize, Serialize};

/// A deterministic name transform.
///
/// Names are split into words on `_`, `-`, whitespace and case boundaries
/// (`firstName`, `first_name` and `FirstName` all split into `first` and
/// `name`), then re-joined in the target convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    CamelCase,
    PascalCase,
    SnakeCaseLower,
    SnakeCaseUpper,
    KebabCaseLower,
    KebabCaseUpper,
}

impl NamingPolicy {
    pub fn convert(&self, name: &str) -> String {
        let words = split_words(name);
        match self {
            NamingPolicy::CamelCase => {
                let mut out = String::with_capacity(name.len());
                for (i, word) in words.iter().enumerate() {
                    if i == 0 {
                        out.push_str(&word.to_lowercase());
                    } else {
                        push_capitalized(&mut out, word);
                    }
                }
                out
            }
            NamingPolicy::PascalCase => {
                let mut out = String::with_capacity(name.len());
                for word in &words {
                    push_capitalized(&mut out, word);
                }
                out
            }
            NamingPolicy::SnakeCaseLower => join_mapped(&words, "_", str::to_lowercase),
            NamingPolicy::SnakeCaseUpper => join_mapped(&words, "_", str::to_uppercase),
            NamingPolicy::KebabCaseLower => join_mapped(&words, "-", str::to_lowercase),
            NamingPolicy::KebabCaseUpper => join_mapped(&words, "-", str::to_uppercase),
        }
    }
}

fn push_capitalized(out: &mut String, word: &str) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(&chars.as_str().to_lowercase());
    }
}

fn join_mapped(words: &[&str], separator: &str, map: fn(&str) -> String) -> String {
    words
        .iter()
        .map(|w| map(w))
        .collect::<Vec<_>>()
        .join(separator)
}

fn is_separator(c: char) -> bool {
    c == '_' || c == '-' || c.is_whitespace()
}

/// Split an identifier into its words.
///
/// An uppercase run followed by a lowercase letter ends one character early,
/// so `HTTPServer` splits into `HTTP` and `Server`.
fn split_words(name: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = name.char_indices().collect();
    let mut words = Vec::new();
    let mut start: Option<usize> = None;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        if is_separator(c) {
            if let Some(s) = start.take() {
                words.push(&name[s..pos]);
            }
            continue;
        }

        match start {
            None => start = Some(pos),
            Some(s) => {
                let prev = chars[i - 1].1;
                let next = chars.get(i + 1).map(|&(_, n)| n);
                let boundary = c.is_uppercase()
                    && (prev.is_lowercase()
                        || prev.is_ascii_digit()
                        || (prev.is_uppercase() && next.is_some_and(char::is_lowercase)));
                if boundary {
                    words.push(&name[s..pos]);
                    start = Some(pos);
                }
            }
        }
    }

    if let Some(s) = start {
        words.push(&name[s..]);
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_from_rust_names() {
        let policy = NamingPolicy::CamelCase;
        assert_eq!(policy.convert("first_name"), "firstName");
        assert_eq!(policy.convert("InProgress"), "inProgress");
        assert_eq!(policy.convert("Foo"), "foo");
        assert_eq!(policy.convert("dateTimeOffset"), "dateTimeOffset");
        assert_eq!(policy.convert("URLValue"), "urlValue");
        assert_eq!(policy.convert(""), "");
    }

    #[test]
    fn test_other_policies() {
        assert_eq!(NamingPolicy::PascalCase.convert("first_value"), "FirstValue");
        assert_eq!(NamingPolicy::SnakeCaseLower.convert("FirstValue"), "first_value");
        assert_eq!(NamingPolicy::SnakeCaseUpper.convert("firstValue"), "FIRST_VALUE");
        assert_eq!(NamingPolicy::KebabCaseLower.convert("HTTPServer"), "http-server");
        assert_eq!(NamingPolicy::KebabCaseUpper.convert("item2Name"), "ITEM2-NAME");
    }

    #[test]
    fn test_policy_names_in_config() {
        let policy: NamingPolicy = serde_json::from_str("\"kebab_case_lower\"").unwrap();
        assert_eq!(policy, NamingPolicy::KebabCaseLower);
    }
}
