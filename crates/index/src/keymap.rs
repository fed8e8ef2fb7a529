//! KeyMap: exact index from full keys to posting lists
//!
//! Used for small corpora and single-document comparison, where keeping the
//! full 64-bit key is affordable. Text form is one entry per line:
//!
//! ```text
//! <16 hex digit key> [occurrences,count] id1 id2 ...
//! <16 hex digit key> [null]
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use docsim_core::{format_key, parse_key, DocId, DocPair, Error, HashKey, Result};

use crate::overlap::OverlapIndex;
use crate::posting::PostingList;

/// Exact map of key to posting list. At most one list per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    entries: FxHashMap<HashKey, PostingList>,
}

impl KeyMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the list for `key`, returning the old one.
    pub fn insert(&mut self, key: HashKey, list: PostingList) -> Option<PostingList> {
        self.entries.insert(key, list)
    }

    /// Posting list for `key`.
    pub fn get(&self, key: HashKey) -> Option<&PostingList> {
        self.entries.get(&key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: HashKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Remove `key`, returning its list.
    pub fn remove(&mut self, key: HashKey) -> Option<PostingList> {
        self.entries.remove(&key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = HashKey> + '_ {
        self.entries.keys().copied()
    }

    /// Entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (HashKey, &PostingList)> + '_ {
        self.entries.iter().map(|(&k, v)| (k, v))
    }

    /// Record a hit of `key` in document `id`, creating the entry on first
    /// sight. See [`PostingList::add_occurrence`] for `max_ids`.
    pub fn add_occurrence(&mut self, key: HashKey, id: DocId, max_ids: usize) -> Result<()> {
        match self.entries.get_mut(&key) {
            Some(list) => list.add_occurrence(id, max_ids),
            None => {
                self.entries.insert(key, PostingList::with_id(id));
                Ok(())
            }
        }
    }

    /// Keys present in both `a` and `b`, each with a copy of `a`'s list.
    pub fn filter_by_intersection(a: &KeyMap, b: &KeyMap) -> KeyMap {
        let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        let entries = small
            .entries
            .keys()
            .filter(|k| large.entries.contains_key(k))
            .filter_map(|k| a.entries.get(k).map(|list| (*k, list.clone())))
            .collect();
        KeyMap { entries }
    }

    /// Documents occurring in more than `threshold` entries, each reported
    /// as `(id, tag, count)`.
    ///
    /// Every entry counts, including single-document ones. The counting
    /// array is sized by the largest id present, not by the number of
    /// documents.
    pub fn common_docs(&self, threshold: u32, tag: DocId) -> Vec<DocPair> {
        let max = self.max_doc_id() as usize;
        let mut counts = vec![0u32; max + 1];
        for list in self.entries.values() {
            for &id in list.ids() {
                counts[id as usize] += 1;
            }
        }
        (1..=max)
            .filter(|&j| counts[j] > threshold)
            .map(|j| DocPair::new(j as DocId, tag, counts[j]))
            .collect()
    }

    /// Move every entry with at least `threshold` documents out of this
    /// map and return them.
    pub fn strip_common(&mut self, threshold: usize) -> KeyMap {
        let common_keys: Vec<HashKey> = self
            .entries
            .iter()
            .filter(|(_, list)| list.len() >= threshold)
            .map(|(&k, _)| k)
            .collect();
        let mut common = KeyMap::new();
        for key in common_keys {
            if let Some(list) = self.entries.remove(&key) {
                common.entries.insert(key, list);
            }
        }
        info!(
            target: "docsim::index",
            threshold,
            common = common.len(),
            remaining = self.len(),
            "Stripped common keys"
        );
        common
    }

    // ========================================================================
    // Text format
    // ========================================================================

    /// Write one line per entry, sorted by key.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut keys: Vec<HashKey> = self.entries.keys().copied().collect();
        keys.sort_unstable();
        for key in keys {
            let list = &self.entries[&key];
            if list.is_empty() && list.occurrences() == 0 {
                writeln!(out, "{} [null]", format_key(key))?;
            } else {
                writeln!(out, "{} {}", format_key(key), list)?;
            }
        }
        Ok(())
    }

    /// Read entries written by [`KeyMap::write_to`].
    ///
    /// Any malformed line fails the whole read.
    pub fn read_from<R: BufRead>(input: R) -> Result<KeyMap> {
        let mut map = KeyMap::new();
        for (n, line) in input.lines().enumerate() {
            let line = line?;
            let lineno = n + 1;
            if line.trim().is_empty() {
                continue;
            }
            let (key_str, rest) = line
                .split_once(' ')
                .ok_or_else(|| Error::malformed(lineno, "expected key and posting list"))?;
            let key = parse_key(key_str).map_err(|e| relocate(e, lineno))?;
            let list = if rest.trim_end() == "[null]" {
                PostingList::new()
            } else {
                rest.parse::<PostingList>().map_err(|e| relocate(e, lineno))?
            };
            if map.entries.insert(key, list).is_some() {
                return Err(Error::malformed(
                    lineno,
                    format!("duplicate key {}", key_str),
                ));
            }
        }
        debug!(target: "docsim::index", keys = map.len(), "Read key map");
        Ok(map)
    }

    /// Write to a file.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, "creating key map", e))?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)?;
        out.flush().map_err(|e| Error::io(path, "writing key map", e))
    }

    /// Read from a file.
    pub fn read_file(path: &Path) -> Result<KeyMap> {
        let file = File::open(path).map_err(|e| Error::io(path, "opening key map", e))?;
        KeyMap::read_from(BufReader::new(file))
    }
}

/// Attach a line number to an error raised by a field parser.
pub(crate) fn relocate(err: Error, line: usize) -> Error {
    match err {
        Error::Malformed { reason, .. } => Error::malformed(line, reason),
        other => other,
    }
}

impl OverlapIndex for KeyMap {
    fn max_doc_id(&self) -> DocId {
        self.entries
            .values()
            .filter_map(PostingList::last)
            .max()
            .unwrap_or(0)
    }

    fn for_each_shared(&self, f: &mut dyn FnMut(&[DocId])) {
        for list in self.entries.values() {
            if list.len() >= 2 {
                f(list.ids());
            }
        }
    }

    fn docids(&self, key: HashKey) -> Result<Vec<DocId>> {
        Ok(self
            .entries
            .get(&key)
            .map(|list| list.ids().to_vec())
            .unwrap_or_default())
    }

    fn overlap_keys(&self, source: &KeyMap) -> Result<KeyMap> {
        Ok(KeyMap::filter_by_intersection(self, source))
    }
}
