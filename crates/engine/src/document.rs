//! Documents: normalized text files identified by a document id
//!
//! A document is read as a list of sentences. With `respect_sentences`
//! every line is a sentence; otherwise the whole file is one sentence with
//! its newlines turned into spaces.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use docsim_core::{DocId, Error, HashKey, KgramConfig, Result};
use docsim_index::{KeyMap, KeyTable};
use docsim_kgram::{find_kgram_with_mask, find_words_in_kgrams, Winnower};
use docsim_markup::{uppercase_matches, MarkedDoc};

/// Split document text into sentences.
///
/// Line ends are never part of a sentence. Without `respect_sentences`,
/// one trailing space left by the final newline is dropped; empty text has
/// no sentences.
pub fn sentences(text: &str, respect_sentences: bool) -> Vec<String> {
    if respect_sentences {
        return text.lines().map(str::to_string).collect();
    }
    if text.is_empty() {
        return Vec::new();
    }
    let mut joined = text.replace("\r\n", " ").replace('\n', " ");
    if joined.ends_with(' ') {
        joined.pop();
    }
    vec![joined]
}

/// Add the keys of `text` to `map` under document `id`. Returns the number
/// of keys seen.
pub fn add_text_to_keymap(
    text: &str,
    id: DocId,
    map: &mut KeyMap,
    winnower: &mut Winnower,
    config: &KgramConfig,
    max_ids: usize,
) -> Result<usize> {
    let mut seen = 0;
    for sentence in sentences(text, config.respect_sentences) {
        for &key in winnower.get_kgrams(&sentence) {
            map.add_occurrence(key, id, max_ids)?;
            seen += 1;
        }
    }
    Ok(seen)
}

/// Add the keys of `text` to `table` under document `id`. Returns the
/// number of keys seen, including keys outside the table's partition.
pub fn add_text_to_keytable(
    text: &str,
    id: DocId,
    table: &mut KeyTable,
    winnower: &mut Winnower,
    config: &KgramConfig,
) -> Result<usize> {
    let mut seen = 0;
    for sentence in sentences(text, config.respect_sentences) {
        for &key in winnower.get_kgrams(&sentence) {
            table.add_key(key, id)?;
            seen += 1;
        }
    }
    Ok(seen)
}

/// A text file in a corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    id: DocId,
}

impl Document {
    /// Document `id` stored at `path`.
    pub fn new(path: impl Into<PathBuf>, id: DocId) -> Self {
        Document {
            path: path.into(),
            id,
        }
    }

    /// Location on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Document id.
    pub fn id(&self) -> DocId {
        self.id
    }

    /// Whole file as text. Invalid UTF-8 is replaced, never rejected.
    pub fn read_text(&self) -> Result<String> {
        let bytes = fs::read(&self.path).map_err(|e| Error::io(&self.path, "reading document", e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Sentences of the file.
    pub fn read_sentences(&self, config: &KgramConfig) -> Result<Vec<String>> {
        Ok(sentences(&self.read_text()?, config.respect_sentences))
    }

    /// Add this document's keys to `map`.
    pub fn add_to_keymap(
        &self,
        map: &mut KeyMap,
        winnower: &mut Winnower,
        config: &KgramConfig,
        max_ids: usize,
    ) -> Result<usize> {
        let text = self.read_text()?;
        add_text_to_keymap(&text, self.id, map, winnower, config, max_ids)
    }

    /// Add this document's keys to `table`.
    ///
    /// # Errors
    ///
    /// `OutOfOrder` when a document with a higher id was added before.
    pub fn add_to_keytable(
        &self,
        table: &mut KeyTable,
        winnower: &mut Winnower,
        config: &KgramConfig,
    ) -> Result<usize> {
        let text = self.read_text()?;
        add_text_to_keytable(&text, self.id, table, winnower, config)
    }

    /// Text of the first k-gram whose key, masked by `mask`, equals `key`.
    ///
    /// Pass `u64::MAX` for full keys, or a table's `max_index` for its
    /// truncated indexes.
    pub fn find_kgram(
        &self,
        key: HashKey,
        mask: u64,
        config: &KgramConfig,
    ) -> Result<Option<String>> {
        let found = self
            .read_sentences(config)?
            .iter()
            .find_map(|s| find_kgram_with_mask(key, mask, s, config).map(str::to_string));
        Ok(found)
    }

    /// Word-level markup of this document against a set of shared keys.
    pub fn mark_up(&self, keys: &FxHashSet<HashKey>, config: &KgramConfig) -> Result<MarkedDoc> {
        let mut doc = MarkedDoc::new();
        for sentence in self.read_sentences(config)? {
            let found = find_words_in_kgrams(&sentence, keys, config);
            doc.add_line(&sentence, found.as_ref())?;
        }
        Ok(doc)
    }

    /// Plain-text markup, one sentence per line, matched words upper-cased.
    pub fn mark_up_text(&self, keys: &FxHashSet<HashKey>, config: &KgramConfig) -> Result<String> {
        let mut out = String::new();
        for sentence in self.read_sentences(config)? {
            let found = find_words_in_kgrams(&sentence, keys, config);
            out.push_str(&uppercase_matches(&sentence, found.as_ref()));
            out.push('\n');
        }
        Ok(out)
    }
}
