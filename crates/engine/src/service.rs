//! Overlap service: a loaded corpus KeyTable answering queries
//!
//! The table is read-only while serving. Queries clone the current
//! `Arc<KeyTable>` under a short read lock and work on it without holding
//! any lock. A reload builds the new table off-lock and swaps the `Arc`;
//! queries already running finish on the table they started with.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use docsim_core::{DocPair, DocsimConfig, Error, Result, QUERY_DOC_ID};
use docsim_index::{write_pairs, KeyMap, KeyTable};
use docsim_kgram::Winnower;

use crate::document::add_text_to_keymap;

/// Reply of [`OverlapService::status`] while the service is up.
pub const STATUS_OK: &str = "I_AM_HAPPY";

/// Longest candidate listing returned by a query.
pub const MAX_RESPONSE_BYTES: usize = 100_000;

/// Where the served table is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    /// Single tables123 file.
    File(PathBuf),
    /// Base name of a tables123 multi-file set.
    MultiFile(PathBuf),
}

/// Answer to one overlap query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    /// Number of corpus documents overlapping the query.
    pub matches: usize,
    /// `"<id> <tag> <shared>"` lines, cut at a line boundary to at most
    /// [`MAX_RESPONSE_BYTES`].
    pub docs: String,
    /// Whether lines were left out of `docs`.
    pub truncated: bool,
}

impl QueryResponse {
    fn from_pairs(pairs: &[DocPair]) -> Result<Self> {
        let mut out = Vec::new();
        write_pairs(&mut out, pairs)?;
        let mut docs = String::from_utf8_lossy(&out).into_owned();
        let truncated = docs.len() > MAX_RESPONSE_BYTES;
        if truncated {
            let cut = docs[..MAX_RESPONSE_BYTES].rfind('\n').map_or(0, |i| i + 1);
            docs.truncate(cut);
        }
        Ok(QueryResponse {
            matches: pairs.len(),
            docs,
            truncated,
        })
    }
}

/// Reloadable query front end over a corpus KeyTable.
pub struct OverlapService {
    config: DocsimConfig,
    source: TableSource,
    table: RwLock<Arc<KeyTable>>,
    reload_lock: Mutex<()>,
    queries: AtomicU64,
}

impl OverlapService {
    /// Load the table and start serving.
    ///
    /// # Errors
    ///
    /// Configuration errors, unreadable or malformed table files, and
    /// tables23 files, which hold no per-key lookup.
    pub fn open(config: DocsimConfig, source: TableSource) -> Result<Self> {
        config.validate()?;
        let table = load_table(&config, &source)?;
        Ok(OverlapService {
            config,
            source,
            table: RwLock::new(Arc::new(table)),
            reload_lock: Mutex::new(()),
            queries: AtomicU64::new(0),
        })
    }

    /// Liveness check for watchdogs.
    pub fn status(&self) -> &'static str {
        STATUS_OK
    }

    /// Where the table is loaded from.
    pub fn source(&self) -> &TableSource {
        &self.source
    }

    /// The table currently served.
    pub fn snapshot(&self) -> Arc<KeyTable> {
        Arc::clone(&self.table.read())
    }

    /// Queries answered so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    /// Corpus documents sharing more than `keys_for_match` keys with
    /// `text`.
    ///
    /// A failed query is rejected and leaves the service untouched.
    pub fn query(&self, text: &str) -> Result<QueryResponse> {
        self.answer(text).map_err(|e| {
            warn!(
                target: "docsim::service",
                error = %e,
                fatal = e.is_fatal(),
                "Rejected overlap query"
            );
            e
        })
    }

    fn answer(&self, text: &str) -> Result<QueryResponse> {
        let table = self.snapshot();
        let mut winnower = Winnower::new(&self.config.kgram)?;
        let mut keys = KeyMap::new();
        add_text_to_keymap(
            text,
            QUERY_DOC_ID,
            &mut keys,
            &mut winnower,
            &self.config.kgram,
            self.config.overlap.max_dupes_to_count,
        )?;
        let shared = table.get_overlap_keys(&keys)?;
        let pairs = shared.common_docs(self.config.overlap.keys_for_match, QUERY_DOC_ID);
        let response = QueryResponse::from_pairs(&pairs)?;
        let n = self.queries.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            target: "docsim::service",
            query = n,
            bytes = text.len(),
            keys = keys.len(),
            shared = shared.len(),
            matches = response.matches,
            truncated = response.truncated,
            "Answered overlap query"
        );
        Ok(response)
    }

    /// Re-read the table from its source.
    ///
    /// Reloads run one at a time. On failure the old table keeps serving.
    pub fn reload(&self) -> Result<()> {
        let _guard = self.reload_lock.lock();
        info!(target: "docsim::service", source = ?self.source, "Reloading key table");
        match load_table(&self.config, &self.source) {
            Ok(table) => {
                let shared = table.shared_len();
                *self.table.write() = Arc::new(table);
                info!(target: "docsim::service", shared, "Reloaded key table");
                Ok(())
            }
            Err(e) => {
                warn!(
                    target: "docsim::service",
                    error = %e,
                    fatal = e.is_fatal(),
                    "Reload failed, keeping old key table"
                );
                Err(e)
            }
        }
    }
}

fn load_table(config: &DocsimConfig, source: &TableSource) -> Result<KeyTable> {
    let mut table = KeyTable::from_config(&config.index)?;
    match source {
        TableSource::File(path) => {
            let file = File::open(path).map_err(|e| Error::io(path, "opening key table", e))?;
            table.read_from(BufReader::new(file))?;
        }
        TableSource::MultiFile(base) => {
            table.read_multi_file(base)?;
        }
    }
    if !table.has_tier1() {
        return Err(Error::invalid_config(
            "the overlap service needs a tables123 key table",
        ));
    }
    table.stats().log();
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use docsim_core::KgramConfig;
    use docsim_index::{OverlapIndex, TableFormat};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config() -> DocsimConfig {
        let mut config = DocsimConfig {
            kgram: KgramConfig {
                kgram_len: 3,
                guarantee_threshold: 3,
                min_sentence_words: 3,
                respect_sentences: true,
                winnow: false,
            },
            ..DocsimConfig::default()
        };
        config.index.bits = 16;
        config.overlap.keys_for_match = 1;
        config
    }

    fn build(dir: &Path, texts: &[&str], base: &Path) -> KeyTable {
        let mut corpus = Corpus::new(dir);
        for (i, text) in texts.iter().enumerate() {
            let name = format!("doc{}.txt", i + 1);
            fs::write(dir.join(&name), text).unwrap();
            corpus.add_file(&name).unwrap();
        }
        let mut table = KeyTable::new(16).unwrap();
        corpus.add_to_keytable(&mut table, None, &config()).unwrap();
        table
            .write_multi_file(base, TableFormat::Tables123, 1 << 20)
            .unwrap();
        table
    }

    #[test]
    fn test_query() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("allkeys");
        build(
            dir.path(),
            &["one two three four five", "six seven eight nine ten"],
            &base,
        );
        let service = OverlapService::open(config(), TableSource::MultiFile(base)).unwrap();
        assert_eq!(service.status(), STATUS_OK);

        let response = service.query("zero one two three four").unwrap();
        assert_eq!(response.matches, 1);
        assert_eq!(response.docs, "1 9999999 2\n");
        assert!(!response.truncated);

        let none = service.query("nothing at all matches here").unwrap();
        assert_eq!(none.matches, 0);
        assert!(none.docs.is_empty());
        assert_eq!(service.query_count(), 2);
    }

    #[test]
    fn test_single_file_source() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("allkeys");
        let table = build(dir.path(), &["one two three four five"], &base);
        let path = dir.path().join("table.keytable");
        table.write_file(&path).unwrap();

        let service = OverlapService::open(config(), TableSource::File(path)).unwrap();
        assert_eq!(service.query("one two three four").unwrap().matches, 1);
    }

    #[test]
    fn test_open_rejects_shared_only_table() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("allkeys");
        let mut table = build(dir.path(), &["a b c d", "a b c e"], &base);
        table.drop_tier1();
        let shared = dir.path().join("sharedkeys");
        table
            .write_multi_file(&shared, TableFormat::Tables23, 1 << 20)
            .unwrap();
        assert!(OverlapService::open(config(), TableSource::MultiFile(shared)).is_err());
    }

    #[test]
    fn test_reload_swaps_table() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("allkeys");
        build(dir.path(), &["one two three four"], &base);
        let service = OverlapService::open(config(), TableSource::MultiFile(base.clone())).unwrap();
        let old = service.snapshot();
        assert_eq!(service.query("six seven eight nine").unwrap().matches, 0);

        build(
            dir.path(),
            &["one two three four", "six seven eight nine"],
            &base,
        );
        service.reload().unwrap();
        assert_eq!(service.query("six seven eight nine").unwrap().matches, 1);
        // the old snapshot is untouched
        assert_eq!(old.max_doc_id(), 1);
        assert_eq!(service.snapshot().max_doc_id(), 2);
    }

    #[test]
    fn test_failed_reload_keeps_old_table() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("allkeys");
        build(dir.path(), &["one two three four"], &base);
        let service = OverlapService::open(config(), TableSource::MultiFile(base.clone())).unwrap();

        fs::write(docsim_index::multi_file_name(&base, 1), "not a table\n").unwrap();
        assert!(service.reload().is_err());
        assert_eq!(service.query("one two three four").unwrap().matches, 1);
    }

    #[test]
    fn test_queries_during_reload() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("allkeys");
        build(dir.path(), &["one two three four x", "one two three four y"], &base);
        let service = OverlapService::open(config(), TableSource::MultiFile(base)).unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..20 {
                        let r = service.query("one two three four").unwrap();
                        assert_eq!(r.matches, 2);
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..5 {
                    service.reload().unwrap();
                }
            });
        });
        assert_eq!(service.query_count(), 80);
    }

    #[test]
    fn test_response_truncated_on_line_boundary() {
        let pairs: Vec<DocPair> = (1..=20_000)
            .map(|id| DocPair::new(id, QUERY_DOC_ID, 12))
            .collect();
        let response = QueryResponse::from_pairs(&pairs).unwrap();
        assert_eq!(response.matches, 20_000);
        assert!(response.truncated);
        assert!(response.docs.len() <= MAX_RESPONSE_BYTES);
        assert!(response.docs.ends_with('\n'));
    }
}
