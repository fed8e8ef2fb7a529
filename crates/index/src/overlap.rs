//! Overlap extraction shared by both index backends
//!
//! Documents are compared only by the number of shared keys. Counting runs
//! over "shared" posting lists, those with at least two documents; keys
//! seen in a single document never contribute.
//!
//! Boilerplate keys found in very many documents should be stripped before
//! counting (`KeyMap::strip_common`, `KeyTable::prune_common`), otherwise
//! they dominate every pairwise count.

use std::io::{BufRead, Write};

use tracing::info;

use docsim_core::{DocId, DocPair, Error, HashKey, Result};

use crate::keymap::KeyMap;

/// An index that maps keys to ascending document id lists.
pub trait OverlapIndex {
    /// Largest document id recorded, 0 when empty.
    fn max_doc_id(&self) -> DocId;

    /// Call `f` with every posting list holding two or more documents.
    fn for_each_shared(&self, f: &mut dyn FnMut(&[DocId]));

    /// Documents containing `key`.
    fn docids(&self, key: HashKey) -> Result<Vec<DocId>>;

    /// For every key of `source` also present here, this index's document
    /// list for it.
    fn overlap_keys(&self, source: &KeyMap) -> Result<KeyMap>;

    /// Documents that appear in more than `threshold` shared posting lists.
    fn overlap_ids(&self, threshold: u32) -> Vec<DocId> {
        let max = self.max_doc_id() as usize;
        let mut counts = vec![0u32; max + 1];
        self.for_each_shared(&mut |ids| {
            for &id in ids {
                counts[id as usize] += 1;
            }
        });
        let ids: Vec<DocId> = (1..=max)
            .filter(|&j| counts[j] > threshold)
            .map(|j| j as DocId)
            .collect();
        info!(
            target: "docsim::index",
            examined = max,
            threshold,
            found = ids.len(),
            "Collected overlapping document ids"
        );
        ids
    }

    /// Pairs `(j, k)` with `j` a candidate, `k > j`, sharing at least
    /// `threshold` keys.
    ///
    /// Each candidate costs one pass over all shared postings. Only ids
    /// after `j` in each ascending list are counted, which avoids self
    /// pairs and double counting. Two different k-grams whose truncated
    /// keys coincide count once, so overlap can be undercounted.
    fn overlap_docs(&self, candidates: &[DocId], threshold: u32) -> Vec<DocPair> {
        let max = self.max_doc_id() as usize;
        let mut sorted = candidates.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut overlap = vec![0u32; max + 1];
        let mut pairs = Vec::new();
        for &j in &sorted {
            let ju = j as usize;
            if ju >= max {
                continue;
            }
            overlap[ju + 1..].iter_mut().for_each(|c| *c = 0);
            self.for_each_shared(&mut |ids| {
                if let Ok(pos) = ids.binary_search(&j) {
                    for &k in &ids[pos + 1..] {
                        overlap[k as usize] += 1;
                    }
                }
            });
            for k in ju + 1..=max {
                let n = overlap[k];
                if n > 0 && n >= threshold {
                    pairs.push(DocPair::new(j, k as DocId, n));
                }
            }
        }
        info!(
            target: "docsim::index",
            candidates = sorted.len(),
            threshold,
            pairs = pairs.len(),
            "Found document pairs"
        );
        pairs
    }
}

/// Candidate duplicate pairs sharing at least `keys_for_match` keys.
///
/// Documents with fewer than `keys_for_match` shared keys overall cannot
/// form such a pair, so they are filtered out first.
pub fn find_candidate_pairs<I: OverlapIndex + ?Sized>(
    index: &I,
    keys_for_match: u32,
) -> Vec<DocPair> {
    let ids = index.overlap_ids(keys_for_match.saturating_sub(1));
    index.overlap_docs(&ids, keys_for_match)
}

// ============================================================================
// Candidate list I/O
// ============================================================================

/// Write pairs as `"<a> <b> <shared>"` lines.
pub fn write_pairs<W: Write>(out: &mut W, pairs: &[DocPair]) -> Result<()> {
    for pair in pairs {
        writeln!(out, "{}", pair)?;
    }
    Ok(())
}

/// Read pairs written by [`write_pairs`]. Blank lines are skipped.
pub fn read_pairs<R: BufRead>(input: R) -> Result<Vec<DocPair>> {
    let mut pairs = Vec::new();
    for (n, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let pair = line.parse::<DocPair>().map_err(|e| match e {
            Error::Malformed { reason, .. } => Error::malformed(n + 1, reason),
            other => other,
        })?;
        pairs.push(pair);
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::PostingList;

    fn map_of(lists: &[&[DocId]]) -> KeyMap {
        let mut map = KeyMap::new();
        for (k, ids) in lists.iter().enumerate() {
            map.insert(k as HashKey + 1, PostingList::from_ids(ids.to_vec()));
        }
        map
    }

    #[test]
    fn test_overlap_ids_strictly_above_threshold() {
        let map = map_of(&[&[1, 2], &[1, 2], &[2, 3], &[4]]);
        // counts: 1->2, 2->3, 3->1, 4 not shared
        assert_eq!(map.overlap_ids(1), vec![1, 2]);
        assert_eq!(map.overlap_ids(2), vec![2]);
        assert!(map.overlap_ids(3).is_empty());
    }

    #[test]
    fn test_overlap_docs_counts_each_pair_once() {
        let map = map_of(&[&[1, 2, 3], &[1, 2], &[2, 3]]);
        let pairs = map.overlap_docs(&[1, 2, 3], 1);
        assert_eq!(
            pairs,
            vec![
                DocPair::new(1, 2, 2),
                DocPair::new(1, 3, 1),
                DocPair::new(2, 3, 2),
            ]
        );
    }

    // Inclusive on purpose: two documents sharing exactly one key form a
    // candidate pair at threshold 1. Keep `>=`.
    #[test]
    fn test_overlap_docs_threshold_is_inclusive() {
        let map = map_of(&[&[1, 2], &[1, 2]]);
        assert_eq!(map.overlap_docs(&[1], 2), vec![DocPair::new(1, 2, 2)]);
        assert!(map.overlap_docs(&[1], 3).is_empty());
    }

    #[test]
    fn test_overlap_docs_zero_threshold_skips_unrelated() {
        let map = map_of(&[&[1, 2], &[3, 4]]);
        assert_eq!(map.overlap_docs(&[1], 0), vec![DocPair::new(1, 2, 1)]);
    }

    #[test]
    fn test_find_candidate_pairs() {
        let map = map_of(&[&[1, 2], &[1, 2], &[1, 3], &[2, 3]]);
        assert_eq!(find_candidate_pairs(&map, 2), vec![DocPair::new(1, 2, 2)]);
    }

    #[test]
    fn test_pairs_round_trip() {
        let pairs = vec![DocPair::new(1, 2, 10), DocPair::new(3, 9, 12)];
        let mut buf = Vec::new();
        write_pairs(&mut buf, &pairs).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "1 2 10\n3 9 12\n");
        assert_eq!(read_pairs(&buf[..]).unwrap(), pairs);
    }

    #[test]
    fn test_read_pairs_reports_line() {
        let err = read_pairs(&b"1 2 3\n1 two 3\n"[..]).unwrap_err();
        assert!(matches!(err, Error::Malformed { line: 2, .. }));
    }
}
