//! Parsers for the packed `headers` and `params` form fields.
//!
//! `headers` arrives as `key1:value1;key2:value2` and `params` as
//! `key1=value1&key2=value2`. A malformed entry is a caller error, not
//! a panic.

use crate::error::{OcrError, Result};
use std::collections::HashMap;

/// Parse a packed `headers` field into a map.
pub fn parse_headers(raw: &str) -> Result<HashMap<String, String>> {
    parse_pairs(raw, ';', ':')
}

/// Parse a packed `params` field into a map.
pub fn parse_params(raw: &str) -> Result<HashMap<String, String>> {
    parse_pairs(raw, '&', '=')
}

/// Split `raw` on `sep` and each entry once on `delim`. Empty entries
/// (a trailing separator) are skipped; an entry with no `delim` fails.
fn parse_pairs(raw: &str, sep: char, delim: char) -> Result<HashMap<String, String>> {
    let mut pairs = HashMap::new();
    for entry in raw.split(sep).filter(|e| !e.is_empty()) {
        let (key, value) = entry.split_once(delim).ok_or_else(|| {
            OcrError::MalformedKeyValue(format!("entry {entry:?} is missing {delim:?}"))
        })?;
        pairs.insert(key.to_string(), value.to_string());
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_packed_headers() {
        let map = parse_headers("Referer:https://example.com;User-Agent:test").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["Referer"], "https://example.com");
        assert_eq!(map["User-Agent"], "test");
    }

    #[test]
    fn parses_packed_params() {
        let map = parse_params("id=42&token=abc").unwrap();
        assert_eq!(map["id"], "42");
        assert_eq!(map["token"], "abc");
    }

    #[test]
    fn value_keeps_later_delimiters() {
        // only the first ':' splits; URLs stay intact
        let map = parse_headers("Referer:https://example.com/a:b").unwrap();
        assert_eq!(map["Referer"], "https://example.com/a:b");
    }

    #[test]
    fn trailing_separator_is_tolerated() {
        let map = parse_params("id=42&").unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn missing_delimiter_is_an_error() {
        let err = parse_headers("no-colon-here").unwrap_err();
        assert!(matches!(err, OcrError::MalformedKeyValue(_)));

        let err = parse_params("id=42&broken").unwrap_err();
        assert!(matches!(err, OcrError::MalformedKeyValue(_)));
    }
}
