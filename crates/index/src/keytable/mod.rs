//! KeyTable: dense three-tier index over truncated keys
//!
//! Keys are truncated to their low `bits` bits and used directly as an
//! index. Almost every key occurs in zero or one document, so storage is
//! tiered:
//!
//! - tier 1: one slot per index, holding nothing, a single document, or a
//!   reference into tier 2
//! - tier 2: a pair of documents, or a reference into tier 3
//! - tier 3: a growable list for keys held by three or more documents
//!
//! Ids in every per-key list are strictly ascending and unique. Tier 1 can
//! be dropped once only shared keys matter, which frees `2^bits` slots.
//!
//! An optional partition restricts a table to keys whose bits between
//! `bits` and `select_bits` equal a fixed value, so disjoint shards can be
//! built independently and concatenated afterwards.

mod format;
mod tier3;

pub use format::{
    key_indexes, multi_file_name, read_multi_file_into_keymap, read_tables123_into_keymap,
    ChunkProgress, TableFormat,
};

use tracing::{info, warn};

use docsim_core::{
    check_bits, check_partition, DocId, Error, HashKey, IndexConfig, PartitionConfig, Result,
    MAX_PRUNE_ABOVE,
};

use crate::keymap::KeyMap;
use crate::overlap::OverlapIndex;
use crate::posting::PostingList;

use tier3::{Tier3List, INITIAL_CAPACITY};

/// High bit of a packed slot or entry: set for a reference into the next
/// tier, clear for a document id.
const REF_BIT: u32 = 1 << 31;

/// Largest document id or tier offset a packed slot can hold.
pub(crate) const MAX_PACKED: u32 = REF_BIT - 1;

/// Contents of one tier 1 slot, as stored in a [`PackedSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tier1Slot {
    /// No document has this key.
    Empty,
    /// Exactly one document has this key.
    Doc(DocId),
    /// Two or more documents; offset into tier 2.
    Shared(u32),
}

/// Contents of one tier 2 entry, as stored in a [`PackedEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tier2Entry {
    /// Exactly two documents, ascending.
    Pair(DocId, DocId),
    /// Three or more documents; offset into tier 3.
    Spill(u32),
}

fn packed(value: u32, what: &str) -> Result<u32> {
    if value > MAX_PACKED {
        return Err(Error::CapacityExhausted(format!(
            "{} {} does not fit in a packed table slot",
            what, value
        )));
    }
    Ok(value)
}

/// Tier 1 slot in four bytes: 0 is empty, a clear high bit holds a
/// document id, a set high bit holds a tier 2 offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub(crate) struct PackedSlot(u32);

impl PackedSlot {
    pub(crate) const EMPTY: PackedSlot = PackedSlot(0);

    pub(crate) fn pack(slot: Tier1Slot) -> Result<Self> {
        Ok(match slot {
            Tier1Slot::Empty => PackedSlot::EMPTY,
            Tier1Slot::Doc(id) => PackedSlot(packed(id, "document id")?),
            Tier1Slot::Shared(t2) => PackedSlot(REF_BIT | packed(t2, "tier 2 offset")?),
        })
    }

    pub(crate) fn get(self) -> Tier1Slot {
        match self.0 {
            0 => Tier1Slot::Empty,
            v if v & REF_BIT != 0 => Tier1Slot::Shared(v & MAX_PACKED),
            v => Tier1Slot::Doc(v),
        }
    }
}

/// Tier 2 entry in eight bytes: two document ids, or a first word with the
/// high bit set holding a tier 3 offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub(crate) struct PackedEntry([u32; 2]);

impl PackedEntry {
    pub(crate) fn pack(entry: Tier2Entry) -> Result<Self> {
        Ok(match entry {
            Tier2Entry::Pair(a, b) => {
                PackedEntry([packed(a, "document id")?, packed(b, "document id")?])
            }
            Tier2Entry::Spill(j) => PackedEntry([REF_BIT | packed(j, "tier 3 offset")?, 0]),
        })
    }

    pub(crate) fn get(self) -> Tier2Entry {
        match self.0 {
            [v, _] if v & REF_BIT != 0 => Tier2Entry::Spill(v & MAX_PACKED),
            [a, b] => Tier2Entry::Pair(a, b),
        }
    }
}

/// Occupancy and memory figures for a KeyTable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyTableStats {
    /// Index bit width.
    pub bits: u32,
    /// Tier 1 slots allocated (0 once dropped).
    pub tier1_slots: usize,
    /// Tier 1 slots holding a single document.
    pub tier1_single: usize,
    /// Tier 1 slots referring to tier 2.
    pub tier1_shared: usize,
    /// Tier 2 entries in use.
    pub tier2_len: usize,
    /// Tier 2 entries allocated.
    pub tier2_capacity: usize,
    /// Tier 2 entries holding a pair directly.
    pub tier2_pairs: usize,
    /// Tier 3 lists.
    pub tier3_lists: usize,
    /// Shortest tier 3 list.
    pub tier3_min: usize,
    /// Longest tier 3 list.
    pub tier3_max: usize,
    /// Mean tier 3 list length.
    pub tier3_mean: f64,
    /// Largest document id seen.
    pub max_doc_id: DocId,
    /// Estimated heap bytes held by all tiers.
    pub memory_bytes: usize,
}

impl KeyTableStats {
    /// Emit the figures as one structured log event.
    pub fn log(&self) {
        info!(
            target: "docsim::index",
            bits = self.bits,
            tier1_slots = self.tier1_slots,
            tier1_single = self.tier1_single,
            tier1_shared = self.tier1_shared,
            tier2_len = self.tier2_len,
            tier2_capacity = self.tier2_capacity,
            tier2_pairs = self.tier2_pairs,
            tier3_lists = self.tier3_lists,
            tier3_min = self.tier3_min,
            tier3_max = self.tier3_max,
            tier3_mean = self.tier3_mean,
            max_doc_id = self.max_doc_id,
            memory_mb = self.memory_bytes as f64 / (1024.0 * 1024.0),
            "KeyTable stats"
        );
    }
}

/// Dense index from truncated keys to ascending document id lists.
#[derive(Debug, Clone)]
pub struct KeyTable {
    bits: u32,
    max_index: u64,
    table_size: usize,
    select_mask: u64,
    select_match: u64,
    tier1: Option<Vec<PackedSlot>>,
    tier2: Vec<PackedEntry>,
    tier2_capacity: usize,
    tier3: Vec<Tier3List>,
    max_doc_id: DocId,
    prune_above: u32,
    load_hint: Option<usize>,
}

impl KeyTable {
    /// Table over the low `bits` bits of each key.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `bits` is outside the range this host supports.
    pub fn new(bits: u32) -> Result<Self> {
        check_bits(bits)?;
        let table_size = 1usize << bits;
        let tier2_capacity = table_size / 4;
        info!(
            target: "docsim::index",
            bits,
            max_index = table_size - 1,
            "Creating KeyTable"
        );
        Ok(KeyTable {
            bits,
            max_index: (table_size - 1) as u64,
            table_size,
            select_mask: 0,
            select_match: 0,
            tier1: Some(vec![PackedSlot::EMPTY; table_size]),
            tier2: Vec::with_capacity(tier2_capacity),
            tier2_capacity,
            tier3: Vec::new(),
            max_doc_id: 0,
            prune_above: 0,
            load_hint: None,
        })
    }

    /// Table restricted to one partition of the key space.
    pub fn with_partition(bits: u32, partition: PartitionConfig) -> Result<Self> {
        check_bits(bits)?;
        check_partition(bits, partition)?;
        let mut table = KeyTable::new(bits)?;
        table.select_mask = ((1u64 << partition.select_bits) - 1) - table.max_index;
        table.select_match = partition.select_match << bits;
        info!(
            target: "docsim::index",
            select_mask = table.select_mask,
            select_match = table.select_match,
            "KeyTable restricted to partition"
        );
        Ok(table)
    }

    /// Table shaped by an `[index]` config section.
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        let mut table = match config.partition {
            Some(p) => KeyTable::with_partition(config.bits, p)?,
            None => KeyTable::new(config.bits)?,
        };
        table.set_prune_above(config.prune_above)?;
        Ok(table)
    }

    /// Index bit width.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Largest index value, `2^bits - 1`.
    pub fn max_index(&self) -> u64 {
        self.max_index
    }

    /// Whether tier 1 is still present.
    pub fn has_tier1(&self) -> bool {
        self.tier1.is_some()
    }

    /// Number of multi-document keys.
    pub fn shared_len(&self) -> usize {
        self.tier2.len()
    }

    /// Records with more documents than this are skipped on load. 0 keeps
    /// everything.
    pub fn set_prune_above(&mut self, n: u32) -> Result<()> {
        if n > MAX_PRUNE_ABOVE {
            return Err(Error::invalid_config(format!(
                "prune_above ({}) must be at most {}",
                n, MAX_PRUNE_ABOVE
            )));
        }
        self.prune_above = n;
        Ok(())
    }

    /// Current load pruning ceiling.
    pub fn prune_above(&self) -> u32 {
        self.prune_above
    }

    /// Tier 1 index for `key`, or `None` when the key lies outside this
    /// table's partition.
    pub fn index_of(&self, key: HashKey) -> Option<u32> {
        if self.select_mask != 0 && key & self.select_mask != self.select_match {
            return None;
        }
        Some((key & self.max_index) as u32)
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Record that document `id` contains `key`.
    ///
    /// Keys outside the partition are ignored. Adding the same id twice in
    /// a row is a no-op.
    ///
    /// # Errors
    ///
    /// `OutOfOrder` if `id` is below the key's last id, `CapacityExhausted`
    /// if tier 2 cannot grow, `InvariantViolation` if tier 1 was dropped.
    pub fn add_key(&mut self, key: HashKey, id: DocId) -> Result<()> {
        match self.index_of(key) {
            Some(index) => self.add_at(index, id),
            None => Ok(()),
        }
    }

    /// Record that document `id` has a key truncating to `index`.
    pub fn add_at(&mut self, index: u32, id: DocId) -> Result<()> {
        if id == 0 {
            return Err(Error::invariant("document ids start at 1"));
        }
        packed(id, "document id")?;
        let i = index as usize;
        let current = self.slot(i)?;
        let next = match current {
            Tier1Slot::Empty => Tier1Slot::Doc(id),
            Tier1Slot::Doc(d) if d == id => return Ok(()),
            Tier1Slot::Doc(d) if id < d => return Err(Error::OutOfOrder { id, last: d }),
            Tier1Slot::Doc(d) => Tier1Slot::Shared(self.push_tier2(Tier2Entry::Pair(d, id))?),
            Tier1Slot::Shared(t2) => {
                self.add_to_tier2(t2, id)?;
                current
            }
        };
        self.set_slot(i, next)?;
        self.max_doc_id = self.max_doc_id.max(id);
        Ok(())
    }

    fn add_to_tier2(&mut self, t2: u32, id: DocId) -> Result<()> {
        match self.tier2_entry(t2)? {
            Tier2Entry::Pair(_, b) if b == id => Ok(()),
            Tier2Entry::Pair(_, b) if id < b => Err(Error::OutOfOrder { id, last: b }),
            Tier2Entry::Pair(a, b) => {
                let mut list = Tier3List::with_capacity(self.load_hint.unwrap_or(INITIAL_CAPACITY));
                list.push(a);
                list.push(b);
                list.push(id);
                let j = self.push_tier3(list)?;
                self.set_tier2(t2, Tier2Entry::Spill(j))
            }
            Tier2Entry::Spill(j) => {
                let list = self.tier3_list_mut(j)?;
                match list.last() {
                    Some(last) if last == id => Ok(()),
                    Some(last) if id < last => Err(Error::OutOfOrder { id, last }),
                    _ => {
                        list.push(id);
                        Ok(())
                    }
                }
            }
        }
    }

    fn push_tier2(&mut self, entry: Tier2Entry) -> Result<u32> {
        if self.tier2.len() >= self.tier2_capacity {
            self.grow_tier2()?;
        }
        let index = u32::try_from(self.tier2.len())
            .ok()
            .filter(|&n| n <= MAX_PACKED)
            .ok_or_else(|| {
                Error::CapacityExhausted(
                    "tier 2 offset no longer fits in a tier 1 slot".to_string(),
                )
            })?;
        self.tier2.push(PackedEntry::pack(entry)?);
        Ok(index)
    }

    fn push_tier3(&mut self, list: Tier3List) -> Result<u32> {
        let index = u32::try_from(self.tier3.len())
            .ok()
            .filter(|&n| n <= MAX_PACKED)
            .ok_or_else(|| {
                Error::CapacityExhausted(
                    "tier 3 offset no longer fits in a tier 2 entry".to_string(),
                )
            })?;
        self.tier3.push(list);
        Ok(index)
    }

    /// Double tier 2, capped at what a tier 1 slot can refer to.
    fn grow_tier2(&mut self) -> Result<()> {
        let old = self.tier2_capacity;
        let limit = (self.table_size + 1).min(MAX_PACKED as usize + 1);
        if old >= limit {
            return Err(Error::CapacityExhausted(format!(
                "tier 2 already holds {} entries for a table of {} slots",
                old, self.table_size
            )));
        }
        let new = (old * 2).max(1).min(limit);
        self.tier2.reserve_exact(new - self.tier2.len());
        self.tier2_capacity = new;
        warn!(
            target: "docsim::index",
            from = old,
            to = new,
            "KeyTable tier 2 grown"
        );
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    fn slot(&self, i: usize) -> Result<Tier1Slot> {
        let tier1 = self
            .tier1
            .as_ref()
            .ok_or_else(|| Error::invariant("tier 1 has been dropped"))?;
        tier1.get(i).map(|s| s.get()).ok_or_else(|| {
            Error::invariant(format!("index {} outside table of {} slots", i, tier1.len()))
        })
    }

    fn set_slot(&mut self, i: usize, slot: Tier1Slot) -> Result<()> {
        let value = PackedSlot::pack(slot)?;
        if let Some(tier1) = self.tier1.as_mut() {
            tier1[i] = value;
        }
        Ok(())
    }

    fn tier2_entry(&self, t2: u32) -> Result<Tier2Entry> {
        self.tier2
            .get(t2 as usize)
            .map(|e| e.get())
            .ok_or_else(|| Error::invariant(format!("tier 2 entry {} does not exist", t2)))
    }

    fn set_tier2(&mut self, t2: u32, entry: Tier2Entry) -> Result<()> {
        let value = PackedEntry::pack(entry)?;
        let slot = self
            .tier2
            .get_mut(t2 as usize)
            .ok_or_else(|| Error::invariant(format!("tier 2 entry {} does not exist", t2)))?;
        *slot = value;
        Ok(())
    }

    fn tier3_list(&self, j: u32) -> Result<&Tier3List> {
        self.tier3
            .get(j as usize)
            .ok_or_else(|| Error::invariant(format!("tier 3 entry {} does not exist", j)))
    }

    fn tier3_list_mut(&mut self, j: u32) -> Result<&mut Tier3List> {
        self.tier3
            .get_mut(j as usize)
            .ok_or_else(|| Error::invariant(format!("tier 3 entry {} does not exist", j)))
    }

    fn tier2_ids(&self, t2: u32) -> Result<Vec<DocId>> {
        match self.tier2_entry(t2)? {
            Tier2Entry::Pair(a, b) => Ok(vec![a, b]),
            Tier2Entry::Spill(j) => Ok(self.tier3_list(j)?.as_slice().to_vec()),
        }
    }

    /// Documents with a key truncating to `index`, ascending.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if tier 1 was dropped or `index` is out of
    /// range.
    pub fn docids_at(&self, index: u32) -> Result<Vec<DocId>> {
        match self.slot(index as usize)? {
            Tier1Slot::Empty => Ok(Vec::new()),
            Tier1Slot::Doc(d) => Ok(vec![d]),
            Tier1Slot::Shared(t2) => self.tier2_ids(t2),
        }
    }

    /// Documents containing `key`, ascending. Empty for keys outside the
    /// partition.
    pub fn get_docids(&self, key: HashKey) -> Result<Vec<DocId>> {
        match self.index_of(key) {
            Some(index) => self.docids_at(index),
            None => Ok(Vec::new()),
        }
    }

    /// Indexes of every key in `map`, sorted and without repeats. Keys
    /// outside the partition are left out.
    pub fn keys_to_indexes(&self, map: &KeyMap) -> Vec<u32> {
        let mut indexes: Vec<u32> = map.keys().filter_map(|k| self.index_of(k)).collect();
        indexes.sort_unstable();
        indexes.dedup();
        indexes
    }

    /// KeyMap keyed by index, holding this table's documents for each of
    /// `indexes` that is occupied.
    pub fn get_overlap_indexes(&self, indexes: &[u32]) -> Result<KeyMap> {
        let mut out = KeyMap::new();
        for &index in indexes {
            let ids = self.docids_at(index)?;
            if !ids.is_empty() {
                out.insert(HashKey::from(index), PostingList::from_ids(ids));
            }
        }
        Ok(out)
    }

    /// Compare a document's keys against this corpus table.
    ///
    /// The result is keyed by truncated index, not by full key.
    pub fn get_overlap_keys(&self, source: &KeyMap) -> Result<KeyMap> {
        self.get_overlap_indexes(&self.keys_to_indexes(source))
    }

    // ========================================================================
    // Bulk loading
    // ========================================================================

    /// Add a whole ascending id list read from a file to slot `index`.
    ///
    /// Lists from concatenated shard files may interleave with ids already
    /// present, in which case the two lists are merged.
    pub(crate) fn load_record(&mut self, index: u32, ids: &[DocId]) -> Result<()> {
        let first = match ids.first() {
            Some(&first) => first,
            None => return Ok(()),
        };
        let existing_last = match self.slot(index as usize)? {
            Tier1Slot::Empty => None,
            Tier1Slot::Doc(d) => Some(d),
            Tier1Slot::Shared(t2) => match self.tier2_entry(t2)? {
                Tier2Entry::Pair(_, b) => Some(b),
                Tier2Entry::Spill(j) => self.tier3_list(j)?.last(),
            },
        };
        if existing_last.map_or(true, |last| first >= last) {
            let n = ids.len();
            self.load_hint = Some(n + 1 + n / 4);
            let res = ids.iter().try_for_each(|&id| self.add_at(index, id));
            self.load_hint = None;
            return res;
        }
        let existing = self.docids_at(index)?;
        let merged = merge_ascending(&existing, ids);
        self.replace_ids(index, &merged)
    }

    /// Replace the list at `index` with `ids`, which has at least as many
    /// entries as the current list.
    fn replace_ids(&mut self, index: u32, ids: &[DocId]) -> Result<()> {
        let i = index as usize;
        match self.slot(i)? {
            Tier1Slot::Empty | Tier1Slot::Doc(_) => {
                self.set_slot(i, Tier1Slot::Empty)?;
                self.load_hint = Some(ids.len());
                let res = ids.iter().try_for_each(|&id| self.add_at(index, id));
                self.load_hint = None;
                return res;
            }
            Tier1Slot::Shared(t2) => match (self.tier2_entry(t2)?, ids) {
                (Tier2Entry::Pair(..), &[a, b]) => {
                    self.set_tier2(t2, Tier2Entry::Pair(a, b))?;
                }
                (Tier2Entry::Pair(..), _) => {
                    let j = self.push_tier3(Tier3List::from_slice(ids))?;
                    self.set_tier2(t2, Tier2Entry::Spill(j))?;
                }
                (Tier2Entry::Spill(j), _) => {
                    *self.tier3_list_mut(j)? = Tier3List::from_slice(ids);
                }
            },
        }
        if let Some(&last) = ids.last() {
            self.max_doc_id = self.max_doc_id.max(last);
        }
        Ok(())
    }

    /// Append a shared entry that has no tier 1 slot, as read from a
    /// shared-keys file.
    pub(crate) fn push_shared(&mut self, ids: &[DocId]) -> Result<()> {
        if self.tier1.is_some() {
            return Err(Error::invariant(
                "shared entries without a key need tier 1 to be dropped first",
            ));
        }
        let entry = match *ids {
            [] | [_] => {
                return Err(Error::malformed(
                    0,
                    "shared key record needs at least two ids",
                ))
            }
            [a, b] => Tier2Entry::Pair(a, b),
            _ => Tier2Entry::Spill(self.push_tier3(Tier3List::from_slice(ids))?),
        };
        self.push_tier2(entry)?;
        if let Some(&last) = ids.last() {
            self.max_doc_id = self.max_doc_id.max(last);
        }
        Ok(())
    }

    // ========================================================================
    // Pruning
    // ========================================================================

    /// Discard tier 1, keeping only shared keys.
    pub fn drop_tier1(&mut self) {
        if self.tier1.take().is_some() {
            info!(
                target: "docsim::index",
                slots = self.table_size,
                shared = self.tier2.len(),
                "Dropped KeyTable tier 1"
            );
        }
    }

    /// Remove every key held by more than `max_docs` documents, compacting
    /// tiers 2 and 3. Returns the number of keys removed.
    pub fn prune_common(&mut self, max_docs: usize) -> Result<usize> {
        if max_docs == 0 {
            return Err(Error::invalid_config("prune_common needs max_docs of at least 1"));
        }
        let old2 = std::mem::take(&mut self.tier2);
        let mut old3: Vec<Option<Tier3List>> =
            std::mem::take(&mut self.tier3).into_iter().map(Some).collect();

        let mut remap: Vec<Option<u32>> = vec![None; old2.len()];
        let mut new2 = Vec::with_capacity(self.tier2_capacity);
        let mut new3 = Vec::new();
        let mut removed = 0;
        for (i, entry) in old2.into_iter().enumerate() {
            let entry = entry.get();
            let kept = match entry {
                Tier2Entry::Pair(..) => (max_docs >= 2).then_some(entry),
                Tier2Entry::Spill(j) => {
                    let list = old3
                        .get_mut(j as usize)
                        .and_then(Option::take)
                        .ok_or_else(|| Error::invariant(format!("tier 3 entry {} missing", j)))?;
                    if list.len() > max_docs {
                        None
                    } else {
                        new3.push(list);
                        Some(Tier2Entry::Spill((new3.len() - 1) as u32))
                    }
                }
            };
            match kept {
                Some(e) => {
                    remap[i] = Some(new2.len() as u32);
                    new2.push(PackedEntry::pack(e)?);
                }
                None => removed += 1,
            }
        }
        if let Some(tier1) = self.tier1.as_mut() {
            for slot in tier1.iter_mut() {
                if let Tier1Slot::Shared(t2) = slot.get() {
                    *slot = match remap.get(t2 as usize).copied().flatten() {
                        Some(n) => PackedSlot::pack(Tier1Slot::Shared(n))?,
                        None => PackedSlot::EMPTY,
                    };
                }
            }
        }
        self.tier2 = new2;
        self.tier3 = new3;
        info!(
            target: "docsim::index",
            max_docs,
            removed,
            remaining = self.tier2.len(),
            "Pruned common keys"
        );
        Ok(removed)
    }

    // ========================================================================
    // Stats
    // ========================================================================

    /// Occupancy and memory figures.
    pub fn stats(&self) -> KeyTableStats {
        let mut stats = KeyTableStats {
            bits: self.bits,
            tier2_len: self.tier2.len(),
            tier2_capacity: self.tier2_capacity,
            tier3_lists: self.tier3.len(),
            max_doc_id: self.max_doc_id,
            ..KeyTableStats::default()
        };
        if let Some(tier1) = &self.tier1 {
            stats.tier1_slots = tier1.len();
            for slot in tier1 {
                match slot.get() {
                    Tier1Slot::Empty => {}
                    Tier1Slot::Doc(_) => stats.tier1_single += 1,
                    Tier1Slot::Shared(_) => stats.tier1_shared += 1,
                }
            }
        }
        stats.tier2_pairs = self
            .tier2
            .iter()
            .filter(|e| matches!(e.get(), Tier2Entry::Pair(..)))
            .count();
        let mut total3 = 0;
        let mut bytes3 = 0;
        stats.tier3_min = usize::MAX;
        for list in &self.tier3 {
            total3 += list.len();
            bytes3 += list.size_in_bytes();
            stats.tier3_min = stats.tier3_min.min(list.len());
            stats.tier3_max = stats.tier3_max.max(list.len());
        }
        if self.tier3.is_empty() {
            stats.tier3_min = 0;
        } else {
            stats.tier3_mean = total3 as f64 / self.tier3.len() as f64;
        }
        stats.memory_bytes = stats.tier1_slots * std::mem::size_of::<PackedSlot>()
            + self.tier2_capacity * std::mem::size_of::<PackedEntry>()
            + self.tier3.capacity() * std::mem::size_of::<Tier3List>()
            + bytes3;
        stats
    }
}

/// Union of two ascending, unique id lists.
fn merge_ascending(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

impl OverlapIndex for KeyTable {
    fn max_doc_id(&self) -> DocId {
        self.max_doc_id
    }

    fn for_each_shared(&self, f: &mut dyn FnMut(&[DocId])) {
        for entry in &self.tier2 {
            match entry.get() {
                Tier2Entry::Pair(a, b) => f(&[a, b]),
                Tier2Entry::Spill(j) => {
                    if let Some(list) = self.tier3.get(j as usize) {
                        f(list.as_slice());
                    }
                }
            }
        }
    }

    fn docids(&self, key: HashKey) -> Result<Vec<DocId>> {
        self.get_docids(key)
    }

    fn overlap_keys(&self, source: &KeyMap) -> Result<KeyMap> {
        self.get_overlap_keys(source)
    }
}
