//! Pre-pass that strips comments and trailing commas before strict parsing.
//!
//! serde_json only accepts strict JSON, so the relaxations the options allow
//! are applied here, outside string literals, before the text reaches it.

use std::borrow::Cow;

use super::options::CommentHandling;

pub(crate) fn relax(
    input: &str,
    comments: CommentHandling,
    allow_trailing_commas: bool,
) -> Cow<'_, str> {
    let skip_comments = comments == CommentHandling::Skip;
    let may_have_comments = skip_comments && input.contains('/');
    let may_have_commas = allow_trailing_commas && input.contains(',');
    if !may_have_comments && !may_have_commas {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut changed = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let end = string_end(bytes, i);
                out.extend_from_slice(&bytes[i..end]);
                i = end;
            }
            b'/' if skip_comments && matches!(bytes.get(i + 1), Some(b'/') | Some(b'*')) => {
                match comment_end(bytes, i) {
                    Some(end) => {
                        out.push(b' ');
                        i = end;
                        changed = true;
                    }
                    None => {
                        // Unterminated comment: leave it for the parser to reject.
                        out.extend_from_slice(&bytes[i..]);
                        i = bytes.len();
                    }
                }
            }
            b',' if allow_trailing_commas
                && matches!(
                    next_significant(bytes, i + 1, skip_comments),
                    Some(b']') | Some(b'}')
                ) =>
            {
                i += 1;
                changed = true;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    if !changed {
        return Cow::Borrowed(input);
    }

    match String::from_utf8(out) {
        Ok(text) => Cow::Owned(text),
        Err(_) => Cow::Borrowed(input),
    }
}

/// Index just past the closing quote of the string starting at `start`.
fn string_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index just past the comment starting at `start`, or `None` if a block
/// comment is never closed.
fn comment_end(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes.get(start + 1) == Some(&b'/') {
        let end = bytes[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |p| start + p);
        return Some(end);
    }

    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map(|p| start + 2 + p + 2)
}

fn next_significant(bytes: &[u8], from: usize, skip_comments: bool) -> Option<u8> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'/' if skip_comments && matches!(bytes.get(i + 1), Some(b'/') | Some(b'*')) => {
                i = comment_end(bytes, i)?;
            }
            b => return Some(b),
        }
    }
    None
}
