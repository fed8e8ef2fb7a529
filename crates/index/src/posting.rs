//! Posting list: the documents containing one key
//!
//! Text form is `[occurrences,count] id1 id2 ...`. Ids are strictly
//! ascending; `occurrences` also counts repeat hits from the same document.

use std::fmt;
use std::str::FromStr;

use docsim_core::{DocId, Error, Result};

/// Document ids for one key plus a total hit counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    ids: Vec<DocId>,
    occurrences: u32,
}

impl PostingList {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// List holding a single document seen once.
    pub fn with_id(id: DocId) -> Self {
        PostingList {
            ids: vec![id],
            occurrences: 1,
        }
    }

    /// List from already ascending, unique ids.
    ///
    /// Real occurrence counts are unknown here, so `occurrences` is set to
    /// the number of ids.
    pub fn from_ids(ids: Vec<DocId>) -> Self {
        let occurrences = ids.len() as u32;
        PostingList { ids, occurrences }
    }

    /// Record one hit of this key in document `id`.
    ///
    /// A new id is appended only if it differs from the last id. When
    /// `max_ids` is non-zero, no ids are appended beyond that many, though
    /// hits are still counted.
    ///
    /// # Errors
    ///
    /// `OutOfOrder` if `id` is below the last recorded id.
    pub fn add_occurrence(&mut self, id: DocId, max_ids: usize) -> Result<()> {
        if let Some(&last) = self.ids.last() {
            if id < last {
                return Err(Error::OutOfOrder { id, last });
            }
            if id > last && (max_ids == 0 || self.ids.len() < max_ids) {
                self.ids.push(id);
            }
        } else {
            self.ids.push(id);
        }
        self.occurrences = self.occurrences.saturating_add(1);
        Ok(())
    }

    /// Number of distinct documents.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no documents are recorded.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Total hits, including repeats within a document.
    pub fn occurrences(&self) -> u32 {
        self.occurrences
    }

    /// Document ids, ascending.
    pub fn ids(&self) -> &[DocId] {
        &self.ids
    }

    /// Last (largest) document id.
    pub fn last(&self) -> Option<DocId> {
        self.ids.last().copied()
    }
}

impl fmt::Display for PostingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.occurrences, self.ids.len())?;
        for id in &self.ids {
            write!(f, " {}", id)?;
        }
        Ok(())
    }
}

impl FromStr for PostingList {
    type Err = Error;

    /// Parse `[occurrences,count] id1 id2 ...`, allowing trailing spaces.
    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix('[')
            .ok_or_else(|| Error::malformed(0, "posting list must start with '['"))?;
        let close = body
            .find(']')
            .ok_or_else(|| Error::malformed(0, "expected ']' in posting list header"))?;
        let (header, rest) = (&body[..close], &body[close + 1..]);
        let (occ, count) = header
            .split_once(',')
            .ok_or_else(|| Error::malformed(0, "expected ',' in posting list header"))?;
        let occurrences: u32 = occ
            .parse()
            .map_err(|_| Error::malformed(0, format!("bad occurrence count '{}'", occ)))?;
        let count: usize = count
            .parse()
            .map_err(|_| Error::malformed(0, format!("bad id count '{}'", count)))?;

        if !rest.bytes().all(|b| b == b' ' || b.is_ascii_digit()) {
            return Err(Error::malformed(0, "only spaces and ids may follow the header"));
        }
        let mut ids = Vec::with_capacity(count);
        for field in rest.split_whitespace() {
            let id: DocId = field
                .parse()
                .map_err(|_| Error::malformed(0, format!("bad document id '{}'", field)))?;
            if id == 0 || ids.last().map_or(false, |&last| id <= last) {
                return Err(Error::malformed(
                    0,
                    format!("document id {} is zero or not ascending", id),
                ));
            }
            ids.push(id);
        }
        if ids.len() != count {
            return Err(Error::malformed(
                0,
                format!("header says {} ids, found {}", count, ids.len()),
            ));
        }
        Ok(PostingList { ids, occurrences })
    }
}
