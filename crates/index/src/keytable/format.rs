//! KeyTable text formats
//!
//! Two line-oriented formats, one record per line:
//!
//! ```text
//! tables123: <8 hex digit index> id1 id2 ...     every occupied slot
//! tables23:  XX<6 hex digit sequence> id1 id2 ...  shared entries only
//! ```
//!
//! Large tables are split across `<base>_1.keytable`, `<base>_2.keytable`,
//! ... with a byte budget per file. A record is never split; a file may
//! exceed the budget only if its first record alone does.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use tracing::{debug, info};

use docsim_core::{check_bits, format_index, parse_index, DocId, Error, HashKey, Result};

use super::{KeyTable, PackedSlot, Tier1Slot, Tier2Entry};
use crate::keymap::{relocate, KeyMap};
use crate::posting::PostingList;

/// On-disk record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Every occupied tier 1 slot, keyed by index.
    Tables123,
    /// Tier 2 entries only, keyed by sequence number.
    Tables23,
}

impl TableFormat {
    /// Format of a file starting with `first`. Sequence tags start with
    /// `X`, index tags with a hex digit.
    pub fn detect(first: u8) -> TableFormat {
        if first == b'X' {
            TableFormat::Tables23
        } else {
            TableFormat::Tables123
        }
    }
}

/// Where a budgeted write stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Bytes written by this call.
    pub bytes: u64,
    /// Position to resume from, `None` when everything was written.
    pub next: Option<usize>,
}

/// Path of the `n`th file (1-based) of a multi-file table.
pub fn multi_file_name(base: &Path, n: usize) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("_{}.keytable", n));
    PathBuf::from(name)
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Index(u32),
    Sequence(u32),
}

const SEQUENCE_PREFIX: &str = "XX";
const SEQUENCE_DIGITS: usize = 6;

fn parse_record(line: &str, lineno: usize) -> Result<(Tag, Vec<DocId>)> {
    if line.is_empty() {
        return Err(Error::malformed(lineno, "empty record"));
    }
    let (tag, rest) = if let Some(seq) = line.strip_prefix(SEQUENCE_PREFIX) {
        let end = seq.find(' ').unwrap_or(seq.len());
        let digits = &seq[..end];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::malformed(
                lineno,
                format!("bad sequence tag 'XX{}'", digits),
            ));
        }
        let n = u32::from_str_radix(digits, 16)
            .map_err(|_| {
                Error::malformed(lineno, format!("sequence tag 'XX{}' too large", digits))
            })?;
        (Tag::Sequence(n), &seq[end..])
    } else {
        let head = line
            .get(..8)
            .ok_or_else(|| Error::malformed(lineno, "record shorter than its index"))?;
        let index = parse_index(head).map_err(|e| relocate(e, lineno))?;
        (Tag::Index(index), &line[8..])
    };

    if !rest.is_empty() && !rest.starts_with(' ') {
        return Err(Error::malformed(lineno, "expected a space after the record tag"));
    }
    if !rest.bytes().all(|b| b == b' ' || b.is_ascii_digit()) {
        return Err(Error::malformed(lineno, "only spaces and ids may follow the tag"));
    }
    let mut ids: Vec<DocId> = Vec::new();
    for field in rest.split(' ').filter(|f| !f.is_empty()) {
        let id: DocId = field
            .parse()
            .map_err(|_| Error::malformed(lineno, format!("bad document id '{}'", field)))?;
        if id == 0 || ids.last().map_or(false, |&last| id <= last) {
            return Err(Error::malformed(
                lineno,
                format!("document id {} is zero or not ascending", id),
            ));
        }
        ids.push(id);
    }
    if ids.is_empty() {
        return Err(Error::malformed(lineno, "record has no document ids"));
    }
    Ok((tag, ids))
}

fn for_each_record<R, F>(input: R, mut f: F) -> Result<usize>
where
    R: BufRead,
    F: FnMut(usize, Tag, Vec<DocId>) -> Result<()>,
{
    let mut records = 0;
    for (n, line) in input.lines().enumerate() {
        let line = line?;
        let lineno = n + 1;
        let (tag, ids) = parse_record(&line, lineno)?;
        f(lineno, tag, ids).map_err(|e| relocate(e, lineno))?;
        records += 1;
        if records % 1_000_000 == 0 {
            debug!(target: "docsim::index", records, "Reading key table");
        }
    }
    Ok(records)
}

fn write_record<W: Write>(out: &mut W, tag: &str, ids: &[DocId]) -> Result<u64> {
    let mut line = String::with_capacity(tag.len() + ids.len() * 8 + 1);
    line.push_str(tag);
    for id in ids {
        line.push(' ');
        line.push_str(&id.to_string());
    }
    line.push('\n');
    out.write_all(line.as_bytes())?;
    Ok(line.len() as u64)
}

fn record_len(tag: &str, ids: &[DocId]) -> u64 {
    let digits: usize = ids.iter().map(|id| decimal_len(*id) + 1).sum();
    (tag.len() + digits + 1) as u64
}

fn decimal_len(mut n: DocId) -> usize {
    let mut len = 1;
    while n >= 10 {
        n /= 10;
        len += 1;
    }
    len
}

fn sequence_tag(n: usize) -> String {
    format!("{}{:0width$x}", SEQUENCE_PREFIX, n, width = SEQUENCE_DIGITS)
}

/// Stop before a record that would overflow `budget`, unless nothing has
/// been written yet.
fn over_budget(budget: Option<u64>, written: u64, next_len: u64) -> bool {
    match budget {
        Some(limit) => written > 0 && written + next_len > limit,
        None => false,
    }
}

fn open_table(path: &Path) -> Result<Option<(TableFormat, BufReader<File>)>> {
    let file = File::open(path).map_err(|e| Error::io(path, "opening key table", e))?;
    let mut reader = BufReader::new(file);
    let first = reader
        .fill_buf()
        .map_err(|e| Error::io(path, "reading key table", e))?
        .first()
        .copied();
    Ok(first.map(|b| (TableFormat::detect(b), reader)))
}

// ============================================================================
// Writing
// ============================================================================

impl KeyTable {
    /// Write every occupied slot from `start` on, within `budget` bytes.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if tier 1 was dropped.
    pub fn write_tables123<W: Write>(
        &self,
        out: &mut W,
        start: usize,
        budget: Option<u64>,
    ) -> Result<ChunkProgress> {
        let tier1 = self
            .tier1
            .as_ref()
            .ok_or_else(|| Error::invariant("tables123 output needs tier 1"))?;
        let mut written = 0u64;
        for (i, slot) in tier1.iter().enumerate().skip(start) {
            let ids = match slot.get() {
                Tier1Slot::Empty => continue,
                Tier1Slot::Doc(d) => vec![d],
                Tier1Slot::Shared(t2) => self.tier2_ids(t2)?,
            };
            let tag = format_index((i as u64 | self.select_match) as u32);
            if over_budget(budget, written, record_len(&tag, &ids)) {
                return Ok(ChunkProgress {
                    bytes: written,
                    next: Some(i),
                });
            }
            written += write_record(out, &tag, &ids)?;
        }
        Ok(ChunkProgress {
            bytes: written,
            next: None,
        })
    }

    /// Write every tier 2 entry from `start` on, within `budget` bytes.
    /// Sequence numbers are tier 2 positions.
    pub fn write_tables23<W: Write>(
        &self,
        out: &mut W,
        start: usize,
        budget: Option<u64>,
    ) -> Result<ChunkProgress> {
        let mut written = 0u64;
        for (i, entry) in self.tier2.iter().enumerate().skip(start) {
            let pair;
            let ids: &[DocId] = match entry.get() {
                Tier2Entry::Pair(a, b) => {
                    pair = [a, b];
                    &pair
                }
                Tier2Entry::Spill(j) => self.tier3_list(j)?.as_slice(),
            };
            let tag = sequence_tag(i);
            if over_budget(budget, written, record_len(&tag, ids)) {
                return Ok(ChunkProgress {
                    bytes: written,
                    next: Some(i),
                });
            }
            written += write_record(out, &tag, ids)?;
        }
        Ok(ChunkProgress {
            bytes: written,
            next: None,
        })
    }

    /// Write the whole table, as tables123 while tier 1 exists and as
    /// tables23 after it was dropped. Returns bytes written.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<u64> {
        let progress = match self.preferred_format() {
            TableFormat::Tables123 => self.write_tables123(out, 0, None)?,
            TableFormat::Tables23 => self.write_tables23(out, 0, None)?,
        };
        Ok(progress.bytes)
    }

    /// Format `write_to` would use.
    pub fn preferred_format(&self) -> TableFormat {
        if self.tier1.is_some() {
            TableFormat::Tables123
        } else {
            TableFormat::Tables23
        }
    }

    /// Write the table across numbered files of at most `max_bytes` each.
    /// At least one file is always written. Returns the number of files.
    pub fn write_multi_file(
        &self,
        base: &Path,
        format: TableFormat,
        max_bytes: u64,
    ) -> Result<usize> {
        let mut start = 0;
        let mut files = 0;
        let mut total = 0u64;
        loop {
            files += 1;
            let path = multi_file_name(base, files);
            let file = File::create(&path).map_err(|e| Error::io(&path, "creating key table", e))?;
            let mut out = BufWriter::new(file);
            let progress = match format {
                TableFormat::Tables123 => self.write_tables123(&mut out, start, Some(max_bytes))?,
                TableFormat::Tables23 => self.write_tables23(&mut out, start, Some(max_bytes))?,
            };
            out.flush()
                .map_err(|e| Error::io(&path, "writing key table", e))?;
            total += progress.bytes;
            debug!(
                target: "docsim::index",
                path = %path.display(),
                bytes = progress.bytes,
                "Wrote key table file"
            );
            match progress.next {
                Some(next) => start = next,
                None => break,
            }
        }

        // Files left over from an earlier, larger table would be read back.
        let mut stale = files + 1;
        loop {
            let path = multi_file_name(base, stale);
            if !path.exists() {
                break;
            }
            fs::remove_file(&path).map_err(|e| Error::io(&path, "removing stale key table", e))?;
            stale += 1;
        }

        info!(
            target: "docsim::index",
            base = %base.display(),
            ?format,
            files,
            bytes = total,
            "Wrote key table"
        );
        Ok(files)
    }

    /// Write the table to a single file.
    pub fn write_file(&self, path: &Path) -> Result<u64> {
        let file = File::create(path).map_err(|e| Error::io(path, "creating key table", e))?;
        let mut out = BufWriter::new(file);
        let bytes = self.write_to(&mut out)?;
        out.flush()
            .map_err(|e| Error::io(path, "writing key table", e))?;
        Ok(bytes)
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Merge tables123 records into this table. Returns records loaded.
    ///
    /// Records outside the partition and records longer than
    /// `prune_above` are skipped. Indexes wider than this table fold onto
    /// its low bits, so shards can be read back into one table.
    pub fn read_tables123<R: BufRead>(&mut self, input: R) -> Result<usize> {
        let mut loaded = 0;
        let records = for_each_record(input, |lineno, tag, ids| {
            let value = match tag {
                Tag::Index(v) => v,
                Tag::Sequence(_) => {
                    return Err(Error::malformed(lineno, "tables23 record in tables123 input"))
                }
            };
            if self.skips(&ids) || self.index_of(HashKey::from(value)).is_none() {
                return Ok(());
            }
            self.load_record((HashKey::from(value) & self.max_index) as u32, &ids)?;
            loaded += 1;
            Ok(())
        })?;
        debug!(target: "docsim::index", records, loaded, "Read tables123");
        Ok(loaded)
    }

    /// Append tables23 records as shared entries, dropping tier 1 first.
    /// Returns records loaded.
    ///
    /// Records carry no index, so they cannot be merged with keys already
    /// in tier 1. A table without tier 1 takes further tables23 chunks as
    /// appended entries.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if tier 1 still holds any key.
    pub fn read_tables23<R: BufRead>(&mut self, input: R) -> Result<usize> {
        if let Some(tier1) = &self.tier1 {
            if tier1.iter().any(|slot| *slot != PackedSlot::EMPTY) {
                return Err(Error::invariant(
                    "tables23 records cannot be merged into a table with tier 1 keys",
                ));
            }
        }
        self.drop_tier1();
        let mut loaded = 0;
        let mut last_seq: Option<u32> = None;
        let records = for_each_record(input, |lineno, tag, ids| {
            let seq = match tag {
                Tag::Sequence(n) => n,
                Tag::Index(_) => {
                    return Err(Error::malformed(lineno, "tables123 record in tables23 input"))
                }
            };
            if last_seq.map_or(false, |last| seq <= last) {
                return Err(Error::malformed(
                    lineno,
                    format!("sequence number {} out of order", seq),
                ));
            }
            last_seq = Some(seq);
            if self.skips(&ids) {
                return Ok(());
            }
            self.push_shared(&ids)?;
            loaded += 1;
            Ok(())
        })?;
        debug!(target: "docsim::index", records, loaded, "Read tables23");
        Ok(loaded)
    }

    /// Read records in whichever format `input` holds.
    pub fn read_from<R: BufRead>(&mut self, mut input: R) -> Result<usize> {
        let first = input.fill_buf()?.first().copied();
        match first.map(TableFormat::detect) {
            None => Ok(0),
            Some(TableFormat::Tables123) => self.read_tables123(input),
            Some(TableFormat::Tables23) => self.read_tables23(input),
        }
    }

    /// Read a single table file.
    pub fn read_file(&mut self, path: &Path) -> Result<usize> {
        match open_table(path)? {
            Some((_, reader)) => self.read_from(reader),
            None => Ok(0),
        }
    }

    /// Read `<base>_1.keytable`, `<base>_2.keytable`, ... until one is
    /// missing. Returns the number of files read.
    ///
    /// # Errors
    ///
    /// `Io` if the first file is missing, `Malformed` if the files mix
    /// formats or any record is bad.
    pub fn read_multi_file(&mut self, base: &Path) -> Result<usize> {
        let first = multi_file_name(base, 1);
        if !first.exists() {
            return Err(Error::io(
                &first,
                "opening key table",
                std::io::Error::new(std::io::ErrorKind::NotFound, "first table file missing"),
            ));
        }
        let mut format: Option<TableFormat> = None;
        let mut files = 0;
        let mut loaded = 0;
        loop {
            let path = multi_file_name(base, files + 1);
            if !path.exists() {
                break;
            }
            files += 1;
            if let Some((found, reader)) = open_table(&path)? {
                if format.map_or(false, |f| f != found) {
                    return Err(Error::malformed(
                        0,
                        format!("{} does not match the format of earlier files", path.display()),
                    ));
                }
                format = Some(found);
                loaded += match found {
                    TableFormat::Tables123 => self.read_tables123(reader)?,
                    TableFormat::Tables23 => self.read_tables23(reader)?,
                };
            }
        }
        info!(
            target: "docsim::index",
            base = %base.display(),
            files,
            records = loaded,
            "Read key table"
        );
        Ok(files)
    }

    fn skips(&self, ids: &[DocId]) -> bool {
        self.prune_above > 0 && ids.len() > self.prune_above as usize
    }
}

// ============================================================================
// KeyMap loading
// ============================================================================

/// Indexes of every key in `map` truncated to `bits` bits, for use as a
/// load filter without allocating a table.
pub fn key_indexes(map: &KeyMap, bits: u32) -> Result<FxHashSet<u32>> {
    check_bits(bits)?;
    let max_index = (1u64 << bits) - 1;
    Ok(map.keys().map(|k| (k & max_index) as u32).collect())
}

/// Read tables123 records into a KeyMap keyed by index.
///
/// With a `filter`, only indexes in it are kept. Indexes are folded onto
/// the low `bits` bits before filtering. Records longer than `prune_above`
/// (when non-zero) are skipped.
pub fn read_tables123_into_keymap<R: BufRead>(
    input: R,
    bits: u32,
    filter: Option<&FxHashSet<u32>>,
    prune_above: u32,
) -> Result<KeyMap> {
    let mut map = KeyMap::new();
    load_into_keymap(input, bits, filter, prune_above, &mut map)?;
    Ok(map)
}

/// Multi-file form of [`read_tables123_into_keymap`].
pub fn read_multi_file_into_keymap(
    base: &Path,
    bits: u32,
    filter: Option<&FxHashSet<u32>>,
    prune_above: u32,
) -> Result<KeyMap> {
    let mut map = KeyMap::new();
    let mut n = 1;
    loop {
        let path = multi_file_name(base, n);
        if !path.exists() {
            if n == 1 {
                return Err(Error::io(
                    &path,
                    "opening key table",
                    std::io::Error::new(std::io::ErrorKind::NotFound, "first table file missing"),
                ));
            }
            break;
        }
        match open_table(&path)? {
            Some((TableFormat::Tables23, _)) => {
                return Err(Error::malformed(
                    0,
                    format!("{} holds shared keys only and cannot be filtered", path.display()),
                ))
            }
            Some((TableFormat::Tables123, reader)) => {
                load_into_keymap(reader, bits, filter, prune_above, &mut map)?;
            }
            None => {}
        }
        n += 1;
    }
    info!(
        target: "docsim::index",
        base = %base.display(),
        files = n - 1,
        keys = map.len(),
        "Read key table into key map"
    );
    Ok(map)
}

fn load_into_keymap<R: BufRead>(
    input: R,
    bits: u32,
    filter: Option<&FxHashSet<u32>>,
    prune_above: u32,
    map: &mut KeyMap,
) -> Result<()> {
    check_bits(bits)?;
    let max_index = (1u64 << bits) - 1;
    for_each_record(input, |lineno, tag, ids| {
        let value = match tag {
            Tag::Index(v) => v,
            Tag::Sequence(_) => {
                return Err(Error::malformed(
                    lineno,
                    "shared keys only, cannot filter by index",
                ))
            }
        };
        if prune_above > 0 && ids.len() > prune_above as usize {
            return Ok(());
        }
        let index = (u64::from(value) & max_index) as u32;
        if filter.map_or(false, |f| !f.contains(&index)) {
            return Ok(());
        }
        let key = HashKey::from(index);
        let ids = match map.remove(key) {
            Some(existing) => super::merge_ascending(existing.ids(), &ids),
            None => ids,
        };
        map.insert(key, PostingList::from_ids(ids));
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::OverlapIndex;
    use docsim_core::PartitionConfig;
    use tempfile::TempDir;

    fn sample() -> KeyTable {
        let mut t = KeyTable::new(8).unwrap();
        t.add_at(0x05, 1).unwrap();
        t.add_at(0x05, 2).unwrap();
        t.add_at(0x10, 3).unwrap();
        for id in [1, 3, 4] {
            t.add_at(0xfe, id).unwrap();
        }
        t
    }

    #[test]
    fn test_parse_record() {
        assert_eq!(
            parse_record("000000ff 1 2 3", 1).unwrap(),
            (Tag::Index(0xff), vec![1, 2, 3])
        );
        assert_eq!(
            parse_record("XX00000a 4 9", 1).unwrap(),
            (Tag::Sequence(10), vec![4, 9])
        );
        assert_eq!(parse_record("00000001 7  ", 1).unwrap().1, vec![7]);
    }

    #[test]
    fn test_parse_record_rejects_malformed() {
        for bad in [
            "",
            "000000ff",
            "000000ff 1 x",
            "000000ff 3 2",
            "000000ff 0 2",
            "000000fg 1",
            "000000ff1",
            "0000ff 1",
            "XX 1 2",
        ] {
            let err = parse_record(bad, 7).unwrap_err();
            assert!(
                matches!(err, Error::Malformed { line: 7, .. }),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_tables123_text() {
        let mut buf = Vec::new();
        sample().write_to(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "00000005 1 2\n00000010 3\n000000fe 1 3 4\n"
        );
    }

    #[test]
    fn test_tables23_text() {
        let mut t = sample();
        t.drop_tier1();
        let mut buf = Vec::new();
        t.write_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "XX000000 1 2\nXX000001 1 3 4\n");
    }

    #[test]
    fn test_tables123_needs_tier1() {
        let mut t = sample();
        t.drop_tier1();
        assert!(matches!(
            t.write_tables123(&mut Vec::new(), 0, None),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_tables123_round_trip() {
        let t = sample();
        let mut buf = Vec::new();
        t.write_to(&mut buf).unwrap();

        let mut back = KeyTable::new(8).unwrap();
        assert_eq!(back.read_from(&buf[..]).unwrap(), 3);
        for index in [0x05, 0x10, 0xfe, 0x11] {
            assert_eq!(back.docids_at(index).unwrap(), t.docids_at(index).unwrap());
        }
    }

    #[test]
    fn test_tables23_round_trip() {
        let mut t = sample();
        t.drop_tier1();
        let mut buf = Vec::new();
        t.write_to(&mut buf).unwrap();

        let mut back = KeyTable::new(8).unwrap();
        assert_eq!(back.read_from(&buf[..]).unwrap(), 2);
        assert!(!back.has_tier1());
        assert_eq!(back.overlap_ids(0), t.overlap_ids(0));
        assert_eq!(back.overlap_docs(&[1], 1), t.overlap_docs(&[1], 1));
    }

    #[test]
    fn test_tables23_into_populated_table() {
        let mut t = KeyTable::new(8).unwrap();
        t.add_key(1, 1).unwrap();
        t.add_key(2, 5).unwrap();
        let err = t.read_tables23(&b"XX000000 3 4\n"[..]).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        // nothing was dropped
        assert!(t.has_tier1());
        assert_eq!(t.get_docids(1).unwrap(), vec![1]);
        assert_eq!(t.get_docids(2).unwrap(), vec![5]);
        assert_eq!(t.shared_len(), 0);
    }

    #[test]
    fn test_tables23_chunks_append() {
        let mut t = KeyTable::new(8).unwrap();
        assert_eq!(t.read_tables23(&b"XX000000 1 2\n"[..]).unwrap(), 1);
        assert_eq!(t.read_tables23(&b"XX000001 1 3 4\n"[..]).unwrap(), 1);
        assert_eq!(t.shared_len(), 2);
        assert_eq!(t.overlap_ids(1), vec![1]);
    }

    #[test]
    fn test_tables23_rejects_single_id() {
        let mut t = KeyTable::new(8).unwrap();
        let err = t.read_tables23(&b"XX000000 1 2\nXX000001 5\n"[..]).unwrap_err();
        assert!(matches!(err, Error::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_tables23_rejects_sequence_going_back() {
        let mut t = KeyTable::new(8).unwrap();
        let err = t
            .read_tables23(&b"XX000004 1 2\nXX000002 1 3\n"[..])
            .unwrap_err();
        assert!(matches!(err, Error::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_read_prune_above() {
        let mut t = KeyTable::new(8).unwrap();
        t.set_prune_above(2).unwrap();
        t.read_tables123(&b"00000001 1 2\n00000002 1 2 3\n"[..])
            .unwrap();
        assert_eq!(t.docids_at(1).unwrap(), vec![1, 2]);
        assert!(t.docids_at(2).unwrap().is_empty());
        assert!(t.set_prune_above(1_000_001).is_err());
    }

    #[test]
    fn test_read_respects_partition() {
        let partition = PartitionConfig {
            select_bits: 10,
            select_match: 1,
        };
        let mut t = KeyTable::with_partition(8, partition).unwrap();
        t.read_tables123(&b"00000105 1 2\n00000205 3 4\n"[..])
            .unwrap();
        assert_eq!(t.docids_at(5).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_partition_written_with_full_index() {
        let partition = PartitionConfig {
            select_bits: 10,
            select_match: 3,
        };
        let mut t = KeyTable::with_partition(8, partition).unwrap();
        t.add_key(0x3_07, 1).unwrap();
        let mut buf = Vec::new();
        t.write_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "00000307 1\n");

        // a wider table folds the index back onto its own bits
        let mut whole = KeyTable::new(8).unwrap();
        whole.read_from(&buf[..]).unwrap();
        assert_eq!(whole.docids_at(7).unwrap(), vec![1]);
    }

    #[test]
    fn test_chunked_write() {
        let t = sample();
        let mut first = Vec::new();
        let progress = t.write_tables123(&mut first, 0, Some(20)).unwrap();
        assert_eq!(String::from_utf8(first).unwrap(), "00000005 1 2\n");
        assert_eq!(progress.bytes, 13);
        assert_eq!(progress.next, Some(0x10));

        // an oversized first record is still written
        let mut tiny = Vec::new();
        let progress = t.write_tables123(&mut tiny, 0, Some(1)).unwrap();
        assert_eq!(progress.bytes, 13);
    }

    #[test]
    fn test_multi_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("allkeys");
        let t = sample();
        assert_eq!(t.write_multi_file(&base, TableFormat::Tables123, 20).unwrap(), 3);
        assert!(multi_file_name(&base, 3).exists());

        let mut back = KeyTable::new(8).unwrap();
        assert_eq!(back.read_multi_file(&base).unwrap(), 3);
        assert_eq!(back.docids_at(0xfe).unwrap(), vec![1, 3, 4]);
        assert_eq!(back.docids_at(0x10).unwrap(), vec![3]);

        // a smaller rewrite removes the leftover files
        assert_eq!(
            t.write_multi_file(&base, TableFormat::Tables123, 1_000).unwrap(),
            1
        );
        assert!(!multi_file_name(&base, 2).exists());
    }

    #[test]
    fn test_empty_table_writes_one_file() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("empty");
        let t = KeyTable::new(4).unwrap();
        assert_eq!(t.write_multi_file(&base, TableFormat::Tables123, 100).unwrap(), 1);
        let mut back = KeyTable::new(4).unwrap();
        assert_eq!(back.read_multi_file(&base).unwrap(), 1);
    }

    #[test]
    fn test_read_multi_file_missing_first() {
        let dir = TempDir::new().unwrap();
        let mut t = KeyTable::new(4).unwrap();
        let err = t.read_multi_file(&dir.path().join("nothing")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_read_multi_file_rejects_mixed_formats() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("mixed");
        fs::write(multi_file_name(&base, 1), "00000001 1 2\n").unwrap();
        fs::write(multi_file_name(&base, 2), "XX000000 1 2\n").unwrap();
        let mut t = KeyTable::new(8).unwrap();
        assert!(matches!(
            t.read_multi_file(&base),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_key_indexes_truncate() {
        let mut map = KeyMap::new();
        map.add_occurrence(0x1_0005, 1, 10).unwrap();
        map.add_occurrence(0x2_0005, 1, 10).unwrap();
        map.add_occurrence(0x0107, 1, 10).unwrap();
        let set = key_indexes(&map, 8).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&0x05) && set.contains(&0x07));
        assert!(key_indexes(&map, 2).is_err());
    }

    #[test]
    fn test_read_into_keymap_filtered() {
        let input = b"00000105 1 2\n00000010 3\n000000fe 1 3 4\n";
        let mut filter = FxHashSet::default();
        filter.insert(0x05);
        filter.insert(0xfe);
        let map = read_tables123_into_keymap(&input[..], 8, Some(&filter), 2).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(0x05).unwrap().ids(), &[1, 2]);

        let all = read_tables123_into_keymap(&input[..], 8, None, 0).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_multi_file_into_keymap() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("allkeys");
        sample()
            .write_multi_file(&base, TableFormat::Tables123, 20)
            .unwrap();
        let map = read_multi_file_into_keymap(&base, 8, None, 0).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(0xfe).unwrap().ids(), &[1, 3, 4]);

        let shared = dir.path().join("shared");
        let mut t = sample();
        t.drop_tier1();
        t.write_multi_file(&shared, TableFormat::Tables23, 100)
            .unwrap();
        assert!(read_multi_file_into_keymap(&shared, 8, None, 0).is_err());
    }
}
