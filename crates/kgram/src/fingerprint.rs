//! Word splitting and the k-gram fingerprint
//!
//! Sentences are expected to be pre-normalized: lowercase words separated
//! by single spaces. Splitting is on the space byte exactly, so two
//! consecutive spaces produce an empty word.

use std::ops::Range;

use docsim_core::HashKey;

/// Alphabet size plus one: `a..=z` map to `1..=26`.
pub const BASE: u64 = 27;

/// Modulus of the rolling hash. `PRIME * BASE + BASE` fits in 64 bits.
pub const PRIME: u64 = 682_551_457_733_942_743;

#[inline]
fn symbol(b: u8) -> u64 {
    if b.is_ascii_lowercase() {
        u64::from(b - b'a' + 1)
    } else {
        0
    }
}

/// Fingerprint a piece of text.
///
/// Only `a..=z` contribute; every other byte is skipped. The result is
/// offset by one so it is never zero.
///
/// # Example
///
/// ```
/// use docsim_kgram::fingerprint;
///
/// assert_eq!(fingerprint("a"), 2);
/// assert_eq!(fingerprint("a b"), fingerprint("ab"));
/// ```
pub fn fingerprint(text: &str) -> HashKey {
    let mut res: u64 = 0;
    for &b in text.as_bytes() {
        let s = symbol(b);
        if s != 0 {
            res = (res * BASE + s) % PRIME;
        }
    }
    res + 1
}

/// Byte ranges of the words of `sentence`, split on single spaces.
pub fn word_spans(sentence: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (j, b) in sentence.bytes().enumerate() {
        if b == b' ' {
            spans.push(start..j);
            start = j + 1;
        }
    }
    spans.push(start..sentence.len());
    spans
}

/// Words of `sentence`, split on single spaces.
///
/// # Example
///
/// ```
/// use docsim_kgram::split_words;
///
/// assert_eq!(split_words("a  b"), vec!["a", "", "b"]);
/// ```
pub fn split_words(sentence: &str) -> Vec<&str> {
    sentence.split(' ').collect()
}

/// Text of the k-gram of `k` words starting at word `first`.
///
/// Callers guarantee `first + k <= spans.len()`.
pub(crate) fn kgram_text<'a>(
    sentence: &'a str,
    spans: &[Range<usize>],
    first: usize,
    k: usize,
) -> &'a str {
    &sentence[spans[first].start..spans[first + k - 1].end]
}

/// Fingerprint of every k-gram of `k` words in `sentence`, in order.
pub fn kgram_keys(sentence: &str, spans: &[Range<usize>], k: usize, out: &mut Vec<HashKey>) {
    out.clear();
    if k == 0 || spans.len() < k {
        return;
    }
    for first in 0..=spans.len() - k {
        out.push(fingerprint(kgram_text(sentence, spans, first, k)));
    }
}
