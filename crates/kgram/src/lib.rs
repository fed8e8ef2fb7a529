//! K-gram fingerprinting and winnowing
//!
//! This crate turns normalized sentences into hash keys:
//! - `fingerprint`: rolling polynomial hash of a k-gram, never zero
//! - `Winnower`: per-sentence key extraction with winnowing selection
//! - `find_kgram`, `find_words_in_kgrams`: map keys back to text

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fingerprint;
pub mod locate;
pub mod winnow;

pub use fingerprint::{fingerprint, kgram_keys, split_words, word_spans, BASE, PRIME};
pub use locate::{
    find_kgram, find_kgram_with_mask, find_words_in_kgrams, kgram_key_for_bits, KgramWords,
};
pub use winnow::{select_winnowed, Winnower};
