//! MarkedDoc: one document annotated word by word
//!
//! Built one sentence (line) at a time. Each word carries a flag byte, the
//! key of the matching k-gram starting at it (0 for none), and after
//! alignment, the alignment number of its sentence.

use std::fmt;
use std::ops::Range;

use docsim_core::{Error, HashKey, Result};
use docsim_kgram::{word_spans, KgramWords};

/// Word lies in a sentence too short to fingerprint.
pub const SHORT_SENTENCE: u8 = 1;
/// Word lies in a k-gram whose key is shared.
pub const IN_KGRAM: u8 = 2;
/// Word was matched by extending a shared k-gram word by word.
pub const EXTENDED: u8 = 4;

/// Whether a flag byte marks a matching word.
#[inline]
pub fn is_match(flag: u8) -> bool {
    flag & (IN_KGRAM | EXTENDED) != 0
}

/// Per-word annotated document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkedDoc {
    text: String,
    words: Vec<Range<usize>>,
    sentence_starts: Vec<bool>,
    pub(crate) flags: Vec<u8>,
    keys: Vec<HashKey>,
    pub(crate) alignments: Vec<Option<usize>>,
}

impl MarkedDoc {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sentence.
    ///
    /// `found` is the result of matching the sentence's k-grams against a
    /// key set; `None` marks a sentence too short to fingerprint.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if `found` describes a different number of
    /// words than `sentence` has.
    pub fn add_line(&mut self, sentence: &str, found: Option<&KgramWords>) -> Result<()> {
        let spans = word_spans(sentence);
        if let Some(found) = found {
            if found.counts.len() != spans.len() || found.key_starts.len() != spans.len() {
                return Err(Error::invariant(format!(
                    "sentence has {} words but markup covers {}",
                    spans.len(),
                    found.counts.len()
                )));
            }
        }
        let base = self.text.len();
        self.text.push_str(sentence);
        self.text.push('\n');
        for (j, span) in spans.into_iter().enumerate() {
            let mut flag = 0;
            let mut key = 0;
            match found {
                Some(found) => {
                    if found.counts[j] > 0 {
                        flag |= IN_KGRAM;
                    }
                    key = found.key_starts[j];
                }
                None => flag |= SHORT_SENTENCE,
            }
            self.words.push(base + span.start..base + span.end);
            self.sentence_starts.push(j == 0);
            self.flags.push(flag);
            self.keys.push(key);
        }
        self.alignments.clear();
        Ok(())
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether no words were added.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// All text, one sentence per line.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text of word `i`.
    pub fn word(&self, i: usize) -> &str {
        &self.text[self.words[i].clone()]
    }

    /// Flag byte of every word.
    pub fn flags(&self) -> &[u8] {
        &self.flags
    }

    /// Key of the matching k-gram starting at every word, or 0.
    pub fn keys(&self) -> &[HashKey] {
        &self.keys
    }

    /// Whether word `i` begins a sentence.
    pub fn is_sentence_start(&self, i: usize) -> bool {
        self.sentence_starts[i]
    }

    /// Keys of matching k-grams in word order, without the gaps.
    pub fn key_sequence(&self) -> Vec<HashKey> {
        self.keys.iter().copied().filter(|&k| k != 0).collect()
    }

    /// Alignment number at word `i`, with `i == len()` the end sentinel.
    ///
    /// Before alignment every position is unaligned except the end.
    pub fn alignment(&self, i: usize) -> Option<usize> {
        match self.alignments.get(i) {
            Some(&a) => a,
            None if i == self.len() => Some(usize::MAX),
            None => None,
        }
    }

    /// Counts of matching words and the longest matching run.
    pub fn similarity_stats(&self) -> SimilarityStats {
        let mut stats = SimilarityStats {
            words: self.len(),
            ..SimilarityStats::default()
        };
        let mut run = 0;
        let mut run_start = 0;
        for (j, &flag) in self.flags.iter().enumerate() {
            if is_match(flag) {
                if run == 0 {
                    run_start = j;
                }
                run += 1;
                stats.matching += 1;
                if run > stats.longest_run {
                    stats.longest_run = run;
                    stats.longest_start = run_start;
                }
            } else {
                run = 0;
            }
        }
        stats
    }
}

/// Summary of how much of one document matches the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimilarityStats {
    /// Words in the document.
    pub words: usize,
    /// Words flagged as matching.
    pub matching: usize,
    /// Length of the longest run of matching words.
    pub longest_run: usize,
    /// First word of that run.
    pub longest_start: usize,
}

impl SimilarityStats {
    /// Matching words as a percentage of all words, 0 for an empty
    /// document.
    pub fn percent(&self) -> f64 {
        if self.words == 0 {
            0.0
        } else {
            100.0 * self.matching as f64 / self.words as f64
        }
    }
}

impl fmt::Display for SimilarityStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.words, self.matching, self.longest_run)
    }
}

/// Plain-text markup of one sentence: matched words upper-cased, a too
/// short sentence wrapped in brackets.
pub fn uppercase_matches(sentence: &str, found: Option<&KgramWords>) -> String {
    let found = match found {
        Some(found) => found,
        None => return format!("[{}]", sentence),
    };
    if found.matching_words == 0 {
        return sentence.to_string();
    }
    let mut out = String::with_capacity(sentence.len());
    for (j, word) in sentence.split(' ').enumerate() {
        if j > 0 {
            out.push(' ');
        }
        if found.counts.get(j).map_or(false, |&c| c > 0) {
            out.push_str(&word.to_ascii_uppercase());
        } else {
            out.push_str(word);
        }
    }
    out
}
