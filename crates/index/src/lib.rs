//! Indexes from hash keys to document ids
//!
//! - `PostingList`: ascending document ids for one key
//! - `KeyMap`: exact map from full keys, for small corpora and queries
//! - `KeyTable`: dense three-tier table over truncated keys, for corpora
//!   of millions of documents
//! - `OverlapIndex`: overlap counting shared by both indexes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod keymap;
pub mod keytable;
pub mod overlap;
pub mod posting;

pub use keymap::KeyMap;
pub use keytable::{
    key_indexes, multi_file_name, read_multi_file_into_keymap, read_tables123_into_keymap,
    ChunkProgress, KeyTable, KeyTableStats, TableFormat,
};
pub use overlap::{find_candidate_pairs, read_pairs, write_pairs, OverlapIndex};
pub use posting::PostingList;
