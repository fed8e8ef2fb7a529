//! Comparing documents
//!
//! - [`compare_document`]: one new document against a whole corpus index,
//!   reporting the corpus documents it shares keys with
//! - [`compare_pair`]: two documents word by word, with markup, alignment
//!   and similarity statistics

use std::fs::File;
use std::io::BufReader;
use std::ops::Range;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use tracing::info;

use docsim_core::{DocPair, DocsimConfig, Error, HashKey, Result, QUERY_DOC_ID};
use docsim_index::{key_indexes, read_multi_file_into_keymap, read_tables123_into_keymap, KeyMap};
use docsim_kgram::Winnower;
use docsim_markup::{aligned_chunks, extend_markups, find_alignments, MarkedDoc, SimilarityStats};

use crate::document::Document;

/// Where a corpus index is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusSource {
    /// KeyMap text file.
    KeyMap(PathBuf),
    /// Single tables123 file.
    KeyTableFile(PathBuf),
    /// Base name of a tables123 multi-file set.
    KeyTableBase(PathBuf),
}

/// Result of [`compare_document`].
#[derive(Debug, Clone)]
pub struct DocumentComparison {
    /// Keys of the new document.
    pub keys: KeyMap,
    /// Corpus posting lists for the keys the new document shares with the
    /// corpus. Keyed by truncated index for KeyTable sources.
    pub shared: KeyMap,
    /// Corpus documents sharing more than `keys_for_match` keys, each
    /// paired with the query tag.
    pub pairs: Vec<DocPair>,
}

/// Compare the document at `path` against a corpus index.
///
/// KeyTable sources are read only for the indexes the new document
/// touches, so the full table is never held in memory.
pub fn compare_document(
    path: &Path,
    source: &CorpusSource,
    config: &DocsimConfig,
) -> Result<DocumentComparison> {
    config.validate()?;
    let doc = Document::new(path, QUERY_DOC_ID);
    let mut winnower = Winnower::new(&config.kgram)?;
    let mut keys = KeyMap::new();
    doc.add_to_keymap(
        &mut keys,
        &mut winnower,
        &config.kgram,
        config.overlap.max_dupes_to_count,
    )?;

    let bits = config.index.bits;
    let prune_above = config.index.prune_above;
    let shared = match source {
        CorpusSource::KeyMap(file) => {
            let all = KeyMap::read_file(file)?;
            KeyMap::filter_by_intersection(&all, &keys)
        }
        CorpusSource::KeyTableFile(file) => {
            let filter = key_indexes(&keys, bits)?;
            let input = File::open(file).map_err(|e| Error::io(file, "opening key table", e))?;
            read_tables123_into_keymap(BufReader::new(input), bits, Some(&filter), prune_above)?
        }
        CorpusSource::KeyTableBase(base) => {
            let filter = key_indexes(&keys, bits)?;
            read_multi_file_into_keymap(base, bits, Some(&filter), prune_above)?
        }
    };
    let pairs = shared.common_docs(config.overlap.keys_for_match, QUERY_DOC_ID);
    info!(
        target: "docsim::engine",
        path = %path.display(),
        keys = keys.len(),
        shared = shared.len(),
        matches = pairs.len(),
        "Compared document with corpus"
    );
    Ok(DocumentComparison {
        keys,
        shared,
        pairs,
    })
}

/// Result of [`compare_pair`].
#[derive(Debug, Clone)]
pub struct PairComparison {
    /// Keys found in both documents.
    pub shared: KeyMap,
    /// First document, marked up and aligned.
    pub doc1: MarkedDoc,
    /// Second document, marked up and aligned.
    pub doc2: MarkedDoc,
}

impl PairComparison {
    /// Similarity figures for each document.
    pub fn stats(&self) -> (SimilarityStats, SimilarityStats) {
        (self.doc1.similarity_stats(), self.doc2.similarity_stats())
    }

    /// `#STATS#: <words> <matching> <longest>` for both documents.
    pub fn stats_line(&self) -> String {
        let (s1, s2) = self.stats();
        format!("#STATS#: {} {}", s1, s2)
    }

    /// Corresponding word ranges for side by side display.
    pub fn chunks(&self) -> Vec<(Range<usize>, Range<usize>)> {
        aligned_chunks(&self.doc1, &self.doc2)
    }
}

/// Compare two documents word by word.
///
/// Every k-gram is kept (no winnowing), the keys found in both documents
/// mark matching words, matches are extended word by word and the two
/// documents are aligned on their common keys.
pub fn compare_pair(path1: &Path, path2: &Path, config: &DocsimConfig) -> Result<PairComparison> {
    config.validate()?;
    let first = Document::new(path1, 1);
    let second = Document::new(path2, 2);
    let mut winnower = Winnower::new(&config.kgram)?.with_winnow(false);
    let max_ids = config.overlap.max_dupes_to_count.max(2);
    let mut map = KeyMap::new();
    first.add_to_keymap(&mut map, &mut winnower, &config.kgram, max_ids)?;
    second.add_to_keymap(&mut map, &mut winnower, &config.kgram, max_ids)?;
    let shared = map.strip_common(2);

    let keys: FxHashSet<HashKey> = shared.keys().collect();
    let mut doc1 = first.mark_up(&keys, &config.kgram)?;
    let mut doc2 = second.mark_up(&keys, &config.kgram)?;
    extend_markups(&mut doc1, &mut doc2, config.kgram.kgram_len);
    find_alignments(&mut doc1, &mut doc2)?;

    let result = PairComparison { shared, doc1, doc2 };
    let (s1, s2) = result.stats();
    info!(
        target: "docsim::engine",
        first = %path1.display(),
        second = %path2.display(),
        shared = result.shared.len(),
        matching1 = s1.matching,
        matching2 = s2.matching,
        "Compared document pair"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use docsim_core::KgramConfig;
    use docsim_index::{multi_file_name, KeyTable, TableFormat};
    use std::fs;
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
        config.overlap.keys_for_match = 2;
        config
    }

    const CORPUS: &[&str] = &[
        "one two three four five six\n",
        "alpha beta gamma delta epsilon\n",
        "seven eight nine ten\none two three four\n",
    ];

    fn corpus_in(dir: &Path) -> Corpus {
        let mut corpus = Corpus::new(dir);
        for (i, text) in CORPUS.iter().enumerate() {
            let name = format!("doc{}.txt", i + 1);
            fs::write(dir.join(&name), text).unwrap();
            corpus.add_file(&name).unwrap();
        }
        corpus
    }

    fn matched_ids(pairs: &[DocPair]) -> Vec<u32> {
        let mut ids: Vec<u32> = pairs.iter().map(|p| p.a).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_compare_document_all_sources_agree() {
        let dir = TempDir::new().unwrap();
        let corpus = corpus_in(dir.path());
        let config = config();

        let map_path = dir.path().join("allkeys.keymap");
        corpus
            .build_keymap(None, &config, false)
            .unwrap()
            .write_file(&map_path)
            .unwrap();
        let mut table = KeyTable::new(16).unwrap();
        corpus.add_to_keytable(&mut table, None, &config).unwrap();
        let table_path = dir.path().join("single.keytable");
        table.write_file(&table_path).unwrap();
        let base = dir.path().join("allkeys");
        table.write_multi_file(&base, TableFormat::Tables123, 40).unwrap();
        assert!(multi_file_name(&base, 2).exists());

        let query = dir.path().join("query.txt");
        fs::write(&query, "zero one two three four five\n").unwrap();

        let sources = [
            CorpusSource::KeyMap(map_path),
            CorpusSource::KeyTableFile(table_path),
            CorpusSource::KeyTableBase(base),
        ];
        for source in &sources {
            let result = compare_document(&query, source, &config).unwrap();
            assert_eq!(result.keys.len(), 4);
            // doc 1 shares three k-grams, doc 3 only "one two three" and
            // "two three four"
            assert_eq!(matched_ids(&result.pairs), vec![1], "{:?}", source);
            assert!(result.pairs.iter().all(|p| p.b == QUERY_DOC_ID));
            assert_eq!(result.pairs[0].shared, 3);
        }
    }

    #[test]
    fn test_compare_document_missing_source() {
        let dir = TempDir::new().unwrap();
        let query = dir.path().join("query.txt");
        fs::write(&query, "one two three four\n").unwrap();
        let source = CorpusSource::KeyTableBase(dir.path().join("nothing"));
        assert!(compare_document(&query, &source, &config()).is_err());
    }

    #[test]
    fn test_compare_pair() {
        let dir = TempDir::new().unwrap();
        let p1 = dir.path().join("a.txt");
        let p2 = dir.path().join("b.txt");
        fs::write(&p1, "the cat sat on the mat today\nshort one\n").unwrap();
        fs::write(&p2, "yesterday the cat sat on the mat\n").unwrap();

        let result = compare_pair(&p1, &p2, &config()).unwrap();
        // "the cat sat", "cat sat on", "sat on the", "on the mat"
        assert_eq!(result.shared.len(), 4);
        let (s1, s2) = result.stats();
        assert_eq!((s1.words, s1.matching, s1.longest_run), (9, 6, 6));
        assert_eq!((s2.words, s2.matching, s2.longest_run), (7, 6, 6));
        assert_eq!(result.stats_line(), "#STATS#: 9 6 6 7 6 6");

        let chunks = result.chunks();
        assert_eq!(chunks.first().map(|c| c.0.start), Some(0));
        assert_eq!(chunks.last().map(|c| (c.0.end, c.1.end)), Some((9, 7)));
    }

    #[test]
    fn test_compare_pair_unrelated() {
        let dir = TempDir::new().unwrap();
        let p1 = dir.path().join("a.txt");
        let p2 = dir.path().join("b.txt");
        fs::write(&p1, "one two three four\n").unwrap();
        fs::write(&p2, "five six seven eight\n").unwrap();

        let result = compare_pair(&p1, &p2, &config()).unwrap();
        assert!(result.shared.is_empty());
        assert_eq!(result.stats().0.matching, 0);
        assert_eq!(result.chunks(), vec![(0..4, 0..4)]);
    }
}
