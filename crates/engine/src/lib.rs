//! Pipelines over corpora of normalized text files
//!
//! This crate ties the lower layers to files on disk:
//! - Document / Corpus: numbered text files and their sentences
//! - analyze: full corpus builds into KeyMap or KeyTable files
//! - shard: partitioned parallel KeyTable builds and their concatenation
//! - compare: one new document against a corpus, or two documents word by word
//! - service: a reloadable in-memory KeyTable answering overlap queries

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analyze;
pub mod compare;
pub mod corpus;
pub mod document;
pub mod service;
pub mod shard;

pub use analyze::{analyze_corpus, AnalyzeOptions, AnalyzeReport, Backend, DOC_IDS_FILE};
pub use compare::{compare_document, compare_pair, CorpusSource, DocumentComparison, PairComparison};
pub use corpus::{Corpus, DocRange};
pub use document::{add_text_to_keymap, add_text_to_keytable, sentences, Document};
pub use service::{OverlapService, QueryResponse, TableSource, MAX_RESPONSE_BYTES, STATUS_OK};
pub use shard::{build_sharded, concat_tables, shard_base};
