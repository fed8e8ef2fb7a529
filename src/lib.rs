//! docsim - near-duplicate detection for large document corpora
//!
//! Documents are fingerprinted as hashed k-grams of words, thinned by
//! winnowing, and indexed from key to document ids. Pairs of documents
//! sharing enough keys are reported as candidate duplicates, and any pair
//! can be compared word by word.
//!
//! # Quick Start
//!
//! ```ignore
//! use docsim::{analyze_corpus, AnalyzeOptions, Corpus, DocsimConfig};
//!
//! let config = DocsimConfig::from_file(Path::new("docsim.toml"))?;
//! let corpus = Corpus::read_file_list(Path::new("files.txt"), "data")?;
//! let mut options = AnalyzeOptions::new("out");
//! options.candidates = true;
//! let report = analyze_corpus(&corpus, &config, &options)?;
//! ```
//!
//! # Crates
//!
//! - `docsim-core`: errors, configuration, shared types
//! - `docsim-kgram`: fingerprints and winnowing
//! - `docsim-index`: KeyMap and KeyTable indexes, overlap extraction
//! - `docsim-markup`: word markup and LCS alignment
//! - `docsim-engine`: corpus pipelines and the overlap service

pub use docsim_core::{
    DocId, DocPair, DocsimConfig, Error, HashKey, IndexConfig, KgramConfig, OverlapConfig,
    PartitionConfig, Result, QUERY_DOC_ID,
};
pub use docsim_engine::*;
pub use docsim_index::{
    find_candidate_pairs, KeyMap, KeyTable, KeyTableStats, OverlapIndex, PostingList, TableFormat,
};
pub use docsim_kgram::{fingerprint, Winnower};
pub use docsim_markup::{MarkedDoc, SimilarityStats};
