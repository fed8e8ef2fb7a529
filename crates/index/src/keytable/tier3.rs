//! Tier 3 lists: keys held by three or more documents
//!
//! Most shared keys stay small, so each list starts with room for three ids
//! and grows to `(capacity + 1) * 2` when full. Bulk loads pass the final
//! size up front instead.

use docsim_core::DocId;

/// Growable, ascending list of document ids owned by one tier 2 entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tier3List {
    ids: Vec<DocId>,
}

/// Capacity of a new list when no size hint is available.
pub(crate) const INITIAL_CAPACITY: usize = 3;

impl Tier3List {
    /// Empty list with room for `capacity` ids.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Tier3List {
            ids: Vec::with_capacity(capacity.max(INITIAL_CAPACITY)),
        }
    }

    /// List holding `ids`, which must already be ascending and unique.
    pub(crate) fn from_slice(ids: &[DocId]) -> Self {
        let mut list = Tier3List::with_capacity(ids.len());
        list.ids.extend_from_slice(ids);
        list
    }

    pub(crate) fn push(&mut self, id: DocId) {
        if self.ids.len() == self.ids.capacity() {
            let target = (self.ids.capacity() + 1) * 2;
            self.ids.reserve_exact(target - self.ids.len());
        }
        self.ids.push(id);
    }

    pub(crate) fn last(&self) -> Option<DocId> {
        self.ids.last().copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn as_slice(&self) -> &[DocId] {
        &self.ids
    }

    /// Heap bytes held, including unused capacity.
    pub(crate) fn size_in_bytes(&self) -> usize {
        self.ids.capacity() * std::mem::size_of::<DocId>()
    }
}
