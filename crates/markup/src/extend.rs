//! Extending k-gram matches word by word
//!
//! Shared keys only mark whole k-grams. Around every pair of positions
//! where both documents start the same matching k-gram, neighbouring words
//! are compared as text, backwards from the word before the k-gram and
//! forwards from the word after it, until the first mismatch.

use rustc_hash::FxHashMap;

use docsim_core::HashKey;

use crate::doc::{MarkedDoc, EXTENDED};

/// Whether two words match on their leading `a..=z` runs.
///
/// The runs must be equal and end at the same place; whatever follows
/// (punctuation, digits) is ignored.
pub fn words_match(a: &str, b: &str) -> bool {
    letters(a) == letters(b)
}

fn letters(word: &str) -> &[u8] {
    let bytes = word.as_bytes();
    let len = bytes.iter().take_while(|b| b.is_ascii_lowercase()).count();
    &bytes[..len]
}

/// Flag words around each shared k-gram as `EXTENDED` in both documents
/// while their text keeps matching.
///
/// `kgram_len` is the number of words covered by each k-gram.
pub fn extend_markups(doc1: &mut MarkedDoc, doc2: &mut MarkedDoc, kgram_len: usize) {
    let mut starts2: FxHashMap<HashKey, Vec<usize>> = FxHashMap::default();
    for (word2, &key) in doc2.keys().iter().enumerate() {
        if key != 0 {
            starts2.entry(key).or_default().push(word2);
        }
    }
    let (n1, n2) = (doc1.len(), doc2.len());
    for word1 in 0..n1 {
        let key = doc1.keys()[word1];
        if key == 0 {
            continue;
        }
        let Some(matches) = starts2.get(&key) else {
            continue;
        };
        for &word2 in matches {
            let mut back = 1;
            while back <= word1 && back <= word2 {
                if !words_match(doc1.word(word1 - back), doc2.word(word2 - back)) {
                    break;
                }
                doc1.flags[word1 - back] |= EXTENDED;
                doc2.flags[word2 - back] |= EXTENDED;
                back += 1;
            }
            let mut fwd = kgram_len;
            while word1 + fwd < n1 && word2 + fwd < n2 {
                if !words_match(doc1.word(word1 + fwd), doc2.word(word2 + fwd)) {
                    break;
                }
                doc1.flags[word1 + fwd] |= EXTENDED;
                doc2.flags[word2 + fwd] |= EXTENDED;
                fwd += 1;
            }
        }
    }
}
