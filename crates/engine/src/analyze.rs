//! Whole-corpus analysis
//!
//! Builds the corpus index and writes it out, optionally with the list of
//! candidate duplicate pairs.
//!
//! KeyTable outputs, `<suffix>` being `_<first>_<last>` for a range:
//! - `docids.txt`
//! - `allkeys<suffix>_N.keytable` (tables123, every key)
//! - `sharedkeys<suffix>_N.keytable` (tables23, keys in two or more docs)
//! - `candidate<suffix>.txt` (when requested)
//!
//! KeyMap outputs: `docids.txt`, `allkeys<suffix>.keymap` with the common
//! keys stripped, `commonkeys<suffix>.keymap`, and the candidate list.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use docsim_core::{DocPair, DocsimConfig, Error, Result};
use docsim_index::{find_candidate_pairs, write_pairs, KeyTable, TableFormat};

use crate::corpus::{Corpus, DocRange};
use crate::shard::build_sharded;

/// Document id list written next to the index.
pub const DOC_IDS_FILE: &str = "docids.txt";

/// Which index structure to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Dense three-tier table over truncated keys.
    #[default]
    KeyTable,
    /// Exact map over full keys.
    KeyMap,
}

/// What to build and where.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Directory receiving every output file.
    pub out_dir: PathBuf,
    /// Index structure.
    pub backend: Backend,
    /// Only add these documents.
    pub range: Option<DocRange>,
    /// Multi-file table base loaded before adding documents (KeyTable
    /// only).
    pub preload: Option<PathBuf>,
    /// Build `2^n` partitions in parallel (KeyTable only, whole corpus).
    pub shard_bits: Option<u32>,
    /// Extract and write candidate pairs.
    pub candidates: bool,
}

impl AnalyzeOptions {
    /// KeyTable build of the whole corpus into `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        AnalyzeOptions {
            out_dir: out_dir.into(),
            backend: Backend::KeyTable,
            range: None,
            preload: None,
            shard_bits: None,
            candidates: false,
        }
    }

    fn suffix(&self) -> String {
        self.range.map(|r| r.suffix()).unwrap_or_default()
    }

    fn check(&self) -> Result<()> {
        if self.backend == Backend::KeyMap
            && (self.preload.is_some() || self.shard_bits.is_some())
        {
            return Err(Error::invalid_config(
                "preloading and sharding need the KeyTable backend",
            ));
        }
        if self.shard_bits.is_some() && (self.preload.is_some() || self.range.is_some()) {
            return Err(Error::invalid_config(
                "sharded builds cover the whole corpus without a preload",
            ));
        }
        Ok(())
    }
}

/// Files written and pairs found by [`analyze_corpus`].
#[derive(Debug, Clone, Default)]
pub struct AnalyzeReport {
    /// Documents added.
    pub documents: usize,
    /// Every file written, in order.
    pub outputs: Vec<PathBuf>,
    /// Candidate pairs, when requested.
    pub pairs: Vec<DocPair>,
}

/// Build and write the corpus index.
///
/// The document id list is written unless the range starts after the
/// first document, so the parts of a ranged build write it once.
pub fn analyze_corpus(
    corpus: &Corpus,
    config: &DocsimConfig,
    options: &AnalyzeOptions,
) -> Result<AnalyzeReport> {
    config.validate()?;
    options.check()?;
    fs::create_dir_all(&options.out_dir)
        .map_err(|e| Error::io(&options.out_dir, "creating output directory", e))?;

    let mut report = AnalyzeReport {
        documents: corpus.documents(options.range).len(),
        ..AnalyzeReport::default()
    };
    info!(
        target: "docsim::engine",
        documents = report.documents,
        backend = ?options.backend,
        out_dir = %options.out_dir.display(),
        "Analyzing corpus"
    );

    if options.range.map_or(true, |r| r.first == 1) {
        let path = options.out_dir.join(DOC_IDS_FILE);
        corpus.write_doc_ids_file(&path)?;
        report.outputs.push(path);
    }

    match options.backend {
        Backend::KeyTable => analyze_keytable(corpus, config, options, &mut report)?,
        Backend::KeyMap => analyze_keymap(corpus, config, options, &mut report)?,
    }
    info!(
        target: "docsim::engine",
        outputs = report.outputs.len(),
        pairs = report.pairs.len(),
        "Finished analysis"
    );
    Ok(report)
}

fn analyze_keytable(
    corpus: &Corpus,
    config: &DocsimConfig,
    options: &AnalyzeOptions,
    report: &mut AnalyzeReport,
) -> Result<()> {
    let suffix = options.suffix();
    let max_bytes = config.index.max_file_bytes;
    let mut table = match options.shard_bits {
        Some(shard_bits) => {
            let shard_dir = options.out_dir.join("shards");
            fs::create_dir_all(&shard_dir)
                .map_err(|e| Error::io(&shard_dir, "creating shard directory", e))?;
            build_sharded(corpus, config, shard_bits, &shard_dir)?
        }
        None => {
            let mut table = KeyTable::from_config(&config.index)?;
            if let Some(base) = &options.preload {
                table.read_multi_file(base)?;
            }
            corpus.add_to_keytable(&mut table, options.range, config)?;
            table
        }
    };
    table.stats().log();

    let all = options.out_dir.join(format!("allkeys{}", suffix));
    let files = table.write_multi_file(&all, TableFormat::Tables123, max_bytes)?;
    push_multi_file(report, &all, files);

    table.drop_tier1();
    table.stats().log();

    let shared = options.out_dir.join(format!("sharedkeys{}", suffix));
    let files = table.write_multi_file(&shared, TableFormat::Tables23, max_bytes)?;
    push_multi_file(report, &shared, files);

    if options.candidates {
        let common = config.overlap.common_threshold as usize;
        table.prune_common(common - 1)?;
        report.pairs = find_candidate_pairs(&table, config.overlap.keys_for_match);
        let path = options.out_dir.join(format!("candidate{}.txt", suffix));
        write_pairs_file(&path, &report.pairs)?;
        report.outputs.push(path);
    }
    Ok(())
}

fn analyze_keymap(
    corpus: &Corpus,
    config: &DocsimConfig,
    options: &AnalyzeOptions,
    report: &mut AnalyzeReport,
) -> Result<()> {
    let suffix = options.suffix();
    let mut map = corpus.build_keymap(options.range, config, config.kgram.winnow)?;
    let common = map.strip_common(config.overlap.common_threshold as usize);

    let all = options.out_dir.join(format!("allkeys{}.keymap", suffix));
    map.write_file(&all)?;
    report.outputs.push(all);
    let common_path = options.out_dir.join(format!("commonkeys{}.keymap", suffix));
    common.write_file(&common_path)?;
    report.outputs.push(common_path);

    if options.candidates {
        report.pairs = find_candidate_pairs(&map, config.overlap.keys_for_match);
        let path = options.out_dir.join(format!("candidate{}.txt", suffix));
        write_pairs_file(&path, &report.pairs)?;
        report.outputs.push(path);
    }
    Ok(())
}

fn push_multi_file(report: &mut AnalyzeReport, base: &Path, files: usize) {
    report
        .outputs
        .extend((1..=files).map(|n| docsim_index::multi_file_name(base, n)));
}

fn write_pairs_file(path: &Path, pairs: &[DocPair]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, "creating candidate list", e))?;
    let mut out = BufWriter::new(file);
    write_pairs(&mut out, pairs)?;
    out.flush()
        .map_err(|e| Error::io(path, "writing candidate list", e))?;
    Ok(())
}
