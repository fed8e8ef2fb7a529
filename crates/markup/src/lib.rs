//! Word-level markup and alignment of two documents
//!
//! Once two documents are known to overlap, their words are flagged as
//! matching or not, matches are extended word by word past k-gram edges,
//! and the documents are aligned sentence by sentence on the longest common
//! subsequence of their matching keys. Rendering is left to the caller.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod align;
pub mod doc;
pub mod extend;
pub mod lcs;

pub use align::{add_alignments, aligned_chunks, find_alignments};
pub use doc::{
    is_match, uppercase_matches, MarkedDoc, SimilarityStats, EXTENDED, IN_KGRAM, SHORT_SENTENCE,
};
pub use extend::{extend_markups, words_match};
pub use lcs::longest_common_subsequence;
