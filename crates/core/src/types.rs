//! Shared value types: keys, document ids and candidate pairs
//!
//! Keys and table indexes are written as fixed-width lowercase hex in every
//! text format, so their codecs live here next to the types.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Fingerprint of one k-gram. Zero is reserved as "no key".
pub type HashKey = u64;

/// Positive, 1-based document id assigned in ingest order.
pub type DocId = u32;

/// Document id given to a query document compared against a corpus.
pub const QUERY_DOC_ID: DocId = 9_999_999;

/// Hex digits in a written full key.
pub const KEY_DIGITS: usize = 16;

/// Hex digits in a written key table index.
pub const INDEX_DIGITS: usize = 8;

// ============================================================================
// Hex codecs
// ============================================================================

/// Format a full key as 16 lowercase hex digits.
pub fn format_key(key: HashKey) -> String {
    format!("{:016x}", key)
}

/// Format a key table index as 8 lowercase hex digits.
pub fn format_index(index: u32) -> String {
    format!("{:08x}", index)
}

/// Parse a full key written by [`format_key`].
pub fn parse_key(s: &str) -> Result<HashKey> {
    parse_hex(s, KEY_DIGITS)
}

/// Parse a key table index written by [`format_index`].
pub fn parse_index(s: &str) -> Result<u32> {
    // at most 8 digits, so the value fits
    parse_hex(s, INDEX_DIGITS).map(|v| v as u32)
}

fn parse_hex(s: &str, digits: usize) -> Result<u64> {
    if s.len() != digits {
        return Err(Error::malformed(
            0,
            format!("bad key length {}, expected {} hex digits", s.len(), digits),
        ));
    }
    if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
        return Err(Error::malformed(0, format!("bad character in key '{}'", s)));
    }
    u64::from_str_radix(s, 16).map_err(|e| Error::malformed(0, format!("bad key '{}': {}", s, e)))
}

// ============================================================================
// DocPair
// ============================================================================

/// Two documents and the number of keys they share.
///
/// Written as `"<a> <b> <shared>"`, one pair per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocPair {
    /// First document (the smaller id for corpus pairs)
    pub a: DocId,
    /// Second document
    pub b: DocId,
    /// Shared key count
    pub shared: u32,
}

impl DocPair {
    /// Create a pair
    pub fn new(a: DocId, b: DocId, shared: u32) -> Self {
        DocPair { a, b, shared }
    }
}

impl fmt::Display for DocPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.a, self.b, self.shared)
    }
}

impl FromStr for DocPair {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut fields = s.split_whitespace();
        let mut next = |what: &str| -> Result<u32> {
            let field = fields
                .next()
                .ok_or_else(|| Error::malformed(0, format!("missing {} in pair '{}'", what, s)))?;
            field
                .parse()
                .map_err(|_| Error::malformed(0, format!("bad {} '{}' in pair", what, field)))
        };
        let pair = DocPair::new(next("first id")?, next("second id")?, next("shared count")?);
        if fields.next().is_some() {
            return Err(Error::malformed(0, format!("trailing data in pair '{}'", s)));
        }
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_hex_is_fixed_width() {
        assert_eq!(format_key(0xabc), "0000000000000abc");
        assert_eq!(format_index(0x1f), "0000001f");
        assert_eq!(parse_key("0000000000000abc").unwrap(), 0xabc);
        assert_eq!(parse_index("0000001f").unwrap(), 0x1f);
    }

    #[test]
    fn test_parse_key_rejects_bad_input() {
        assert!(parse_key("abc").is_err());
        assert!(parse_key("000000000000ABCD").is_err());
        assert!(parse_index("0000zz00").is_err());
    }

    #[test]
    fn test_doc_pair_display() {
        assert_eq!(DocPair::new(3, 17, 42).to_string(), "3 17 42");
    }

    #[test]
    fn test_doc_pair_parse() {
        let pair: DocPair = "3 17 42".parse().unwrap();
        assert_eq!(pair, DocPair::new(3, 17, 42));
        assert!("3 17".parse::<DocPair>().is_err());
        assert!("3 17 42 1".parse::<DocPair>().is_err());
        assert!("3 x 42".parse::<DocPair>().is_err());
    }
}
