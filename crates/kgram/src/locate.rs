//! Locating k-grams in text
//!
//! These helpers work backwards from keys to words: which text produced a
//! key, and which words of a sentence are covered by matching k-grams.

use rustc_hash::FxHashSet;

use docsim_core::{check_bits, HashKey, KgramConfig, Result};

use crate::fingerprint::{fingerprint, kgram_text, word_spans};

/// Text of the first k-gram in `sentence` whose key equals `key`.
pub fn find_kgram<'a>(key: HashKey, sentence: &'a str, config: &KgramConfig) -> Option<&'a str> {
    find_kgram_with_mask(key, u64::MAX, sentence, config)
}

/// Text of the first k-gram in `sentence` whose key, masked by `mask`,
/// equals `key`.
///
/// Used to recover text for truncated KeyTable indexes.
pub fn find_kgram_with_mask<'a>(
    key: HashKey,
    mask: u64,
    sentence: &'a str,
    config: &KgramConfig,
) -> Option<&'a str> {
    let spans = word_spans(sentence);
    let k = config.kgram_len;
    if spans.len() < config.min_sentence_words || k == 0 || spans.len() < k {
        return None;
    }
    (0..=spans.len() - k)
        .map(|first| kgram_text(sentence, &spans, first, k))
        .find(|text| fingerprint(text) & mask == key)
}

/// Words of one sentence covered by matching k-grams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KgramWords {
    /// For each word, the number of matching k-grams containing it.
    pub counts: Vec<u32>,
    /// For each word, the key of the matching k-gram starting there, or 0.
    pub key_starts: Vec<HashKey>,
    /// Number of words in at least one matching k-gram.
    pub matching_words: usize,
}

/// Mark the words of `sentence` that fall inside a k-gram whose key is in
/// `keys`.
///
/// Returns `None` when the sentence has fewer than `min_sentence_words`
/// words.
pub fn find_words_in_kgrams(
    sentence: &str,
    keys: &FxHashSet<HashKey>,
    config: &KgramConfig,
) -> Option<KgramWords> {
    let spans = word_spans(sentence);
    let n = spans.len();
    if n < config.min_sentence_words {
        return None;
    }
    let mut counts = vec![0u32; n];
    let mut key_starts = vec![0; n];
    let k = config.kgram_len;
    if k > 0 && n >= k {
        for first in 0..=n - k {
            let fp = fingerprint(kgram_text(sentence, &spans, first, k));
            if keys.contains(&fp) {
                for c in &mut counts[first..first + k] {
                    *c += 1;
                }
                key_starts[first] = fp;
            }
        }
    }
    let matching_words = counts.iter().filter(|&&c| c > 0).count();
    Some(KgramWords {
        counts,
        key_starts,
        matching_words,
    })
}

/// Fingerprint free text and truncate it to a KeyTable index of `bits`
/// bits.
///
/// The text is hashed as-is, without checking its word count.
pub fn kgram_key_for_bits(text: &str, bits: u32) -> Result<u32> {
    check_bits(bits)?;
    let mask = (1u64 << bits) - 1;
    Ok((fingerprint(text) & mask) as u32)
}
