//! Winnowing selection of k-gram keys
//!
//! A window of `W = T - K + 1` consecutive k-gram keys slides over the
//! sentence. Each window selects its smallest key; ties go to the key the
//! previous window selected if it is still inside the window, otherwise to
//! the rightmost one. A key is emitted only when the selected *position*
//! changes, so a value may legitimately appear more than once.
//!
//! Any run of at least `T` words shared by two sentences covers one full
//! window in both, and both select that window's minimum value, so the two
//! selected sets always intersect.
//!
//! The previous-selection tie-break keeps the density near `1/W` for
//! degenerate input such as the same word repeated hundreds of times.

use std::ops::Range;

use docsim_core::{Error, HashKey, KgramConfig, Result};

use crate::fingerprint::{kgram_keys, word_spans};

/// Position of the smallest key in `keys[start..=end]`.
///
/// Ties prefer `last` when it lies in the range and holds the minimum,
/// else the rightmost tied position.
fn smallest(keys: &[HashKey], start: usize, end: usize, last: Option<usize>) -> usize {
    let mut res = start;
    for k in start + 1..=end {
        if keys[k] < keys[res] || (keys[k] == keys[res] && Some(res) != last) {
            res = k;
        }
    }
    res
}

/// Select the winnowed subset of `keys` into `out`.
///
/// With `keys.len() <= window` the single smallest key is selected.
pub fn select_winnowed(keys: &[HashKey], window: usize, out: &mut Vec<HashKey>) {
    out.clear();
    if keys.is_empty() || window == 0 {
        return;
    }
    if keys.len() <= window {
        out.push(keys[smallest(keys, 0, keys.len() - 1, None)]);
        return;
    }
    let mut last: Option<usize> = None;
    for k in 0..=keys.len() - window {
        let pos = smallest(keys, k, k + window - 1, last);
        if Some(pos) != last {
            out.push(keys[pos]);
            last = Some(pos);
        }
    }
}

/// Turns sentences into k-gram keys.
///
/// Owns its scratch buffers, so one `Winnower` is used per document or
/// per thread and reused across that document's sentences.
///
/// # Example
///
/// ```
/// use docsim_core::KgramConfig;
/// use docsim_kgram::Winnower;
///
/// let mut w = Winnower::new(&KgramConfig::default()).unwrap();
/// assert!(w.get_kgrams("too short").is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Winnower {
    kgram_len: usize,
    window: usize,
    min_words: usize,
    winnow: bool,
    spans: Vec<Range<usize>>,
    all: Vec<HashKey>,
    selected: Vec<HashKey>,
}

impl Winnower {
    /// Create a winnower for the given k-gram settings.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when `kgram_len` is zero, `guarantee_threshold` is
    /// below `kgram_len`, or `min_sentence_words` is zero.
    pub fn new(config: &KgramConfig) -> Result<Self> {
        if config.kgram_len == 0 {
            return Err(Error::invalid_config("kgram_len must be at least 1"));
        }
        if config.guarantee_threshold < config.kgram_len {
            return Err(Error::invalid_config(format!(
                "guarantee_threshold ({}) must be at least kgram_len ({})",
                config.guarantee_threshold, config.kgram_len
            )));
        }
        if config.min_sentence_words == 0 {
            return Err(Error::invalid_config("min_sentence_words must be at least 1"));
        }
        Ok(Winnower {
            kgram_len: config.kgram_len,
            window: config.window(),
            min_words: config.min_sentence_words,
            winnow: config.winnow,
            spans: Vec::new(),
            all: Vec::new(),
            selected: Vec::new(),
        })
    }

    /// Same settings with winnowing switched on or off.
    pub fn with_winnow(mut self, winnow: bool) -> Self {
        self.winnow = winnow;
        self
    }

    /// Words per k-gram.
    pub fn kgram_len(&self) -> usize {
        self.kgram_len
    }

    /// Winnowing window length.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Whether keys are winnowed.
    pub fn winnows(&self) -> bool {
        self.winnow
    }

    /// Keys for one sentence.
    ///
    /// Empty when the sentence has fewer than `min_sentence_words` words
    /// or fewer than `kgram_len` words. Otherwise every k-gram key in
    /// order, or the winnowed selection when winnowing is on. The slice is
    /// valid until the next call.
    pub fn get_kgrams(&mut self, sentence: &str) -> &[HashKey] {
        self.spans = word_spans(sentence);
        if self.spans.len() < self.min_words {
            self.all.clear();
            return &self.all;
        }
        kgram_keys(sentence, &self.spans, self.kgram_len, &mut self.all);
        if !self.winnow || self.all.is_empty() {
            return &self.all;
        }
        select_winnowed(&self.all, self.window, &mut self.selected);
        &self.selected
    }
}
