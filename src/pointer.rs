//! JSON Pointer (RFC 6901) in URI fragment identifier representation.
//!
//! Pointers are the native `$ref` syntax of the schemas we read, and the form
//! every path takes in diagnostics (`#/definitions/location`).

use crate::error::PointerError;

/// Escape a single pointer segment (`~` → `~0`, then `/` → `~1`).
pub fn part_encode(part: &str) -> String {
    part.replace('~', "~0").replace('/', "~1")
}

/// Reverse [`part_encode`].
pub fn part_decode(part: &str) -> String {
    part.replace("~1", "/").replace("~0", "~")
}

/// Encode all segments of a path into a URI fragment pointer.
///
/// Each segment is escaped, then percent-encoded, and the result is joined
/// with `/` behind `prefix`.
///
/// ```
/// use schema_model::pointer::encode;
///
/// assert_eq!(encode::<&str>(&[], "#"), "#");
/// assert_eq!(encode(&["foo", "bar"], "#"), "#/foo/bar");
/// assert_eq!(encode(&["0", " ", "~"], "#"), "#/0/%20/~0");
/// ```
pub fn encode<S: AsRef<str>>(segments: &[S], prefix: &str) -> String {
    let mut pointer = String::from(prefix);
    for segment in segments {
        pointer.push('/');
        pointer.push_str(&urlencoding::encode(&part_encode(segment.as_ref())));
    }
    pointer
}

/// Decode a URI fragment pointer into its segments.
///
/// # Errors
///
/// Returns `PointerError::MissingPrefix` if the pointer does not start with
/// `prefix`, or `PointerError::InvalidEncoding` if a segment does not
/// percent-decode to UTF-8.
///
/// ```
/// use schema_model::pointer::decode;
///
/// assert_eq!(decode("#", "#").unwrap(), Vec::<String>::new());
/// assert_eq!(decode("#/0/%20/~0", "#").unwrap(), vec!["0", " ", "~"]);
/// assert!(decode("/foo", "#").is_err());
/// ```
pub fn decode(pointer: &str, prefix: &str) -> Result<Vec<String>, PointerError> {
    let mut segments = pointer.split('/').map(decode_segment);

    let actual = segments.next().unwrap_or_else(|| Ok(String::new()))?;
    if actual != prefix {
        return Err(PointerError::MissingPrefix {
            expected: prefix.to_string(),
            actual,
        });
    }

    segments.collect()
}

fn decode_segment(segment: &str) -> Result<String, PointerError> {
    let unquoted = urlencoding::decode(segment).map_err(|_| PointerError::InvalidEncoding {
        segment: segment.to_string(),
    })?;
    Ok(part_decode(&unquoted))
}
