//! Core types for docsim
//!
//! This crate defines the foundations shared by every other crate:
//! - Error: error taxonomy and `Result` alias
//! - DocsimConfig: tuning values loaded from `docsim.toml`
//! - HashKey, DocId, DocPair: keys, document ids and candidate pairs
//! - Hex codecs for keys and key table indexes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    check_bits, check_partition, DocsimConfig, IndexConfig, KgramConfig, OverlapConfig,
    PartitionConfig, CONFIG_FILE_NAME, MAX_INDEX_BITS, MAX_PRUNE_ABOVE, MIN_INDEX_BITS,
};
pub use error::{Error, Result};
pub use types::{
    format_index, format_key, parse_index, parse_key, DocId, DocPair, HashKey, INDEX_DIGITS,
    KEY_DIGITS, QUERY_DOC_ID,
};
