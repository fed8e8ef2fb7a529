//! Sentence alignment of two marked documents
//!
//! The longest common subsequence of the two documents' matching keys is
//! numbered 0, 1, 2, ... and each sentence is labelled with the lowest
//! number whose key it contains. Equal labels in the two documents mark
//! where side-by-side layout should line up.

use std::ops::Range;

use tracing::debug;

use docsim_core::{HashKey, Result};

use crate::doc::MarkedDoc;
use crate::lcs::longest_common_subsequence;

/// Label sentences of `doc` with positions in `common`.
///
/// Words are walked in order; each word whose key equals the next
/// unconsumed entry of `common` consumes it, and the first such entry in a
/// sentence labels that sentence's first word. One extra end sentinel
/// follows the last word.
pub fn add_alignments(doc: &mut MarkedDoc, common: &[HashKey]) {
    let n = doc.len();
    let mut alignments = vec![None; n + 1];
    let mut next = 0;
    let mut sentence_start = 0;
    for word in 0..n {
        if doc.is_sentence_start(word) {
            sentence_start = word;
        }
        if next < common.len() && common[next] == doc.keys()[word] {
            if alignments[sentence_start].is_none() {
                alignments[sentence_start] = Some(next);
            }
            next += 1;
        }
    }
    alignments[n] = Some(usize::MAX);
    doc.alignments = alignments;
}

/// Align two documents on the longest common subsequence of their
/// matching keys.
pub fn find_alignments(doc1: &mut MarkedDoc, doc2: &mut MarkedDoc) -> Result<()> {
    let a = doc1.key_sequence();
    let b = doc2.key_sequence();
    let common = longest_common_subsequence(&a, &b)?;
    debug!(
        target: "docsim::markup",
        keys1 = a.len(),
        keys2 = b.len(),
        common = common.len(),
        "Aligned documents"
    );
    add_alignments(doc1, &common);
    add_alignments(doc2, &common);
    Ok(())
}

/// Split two aligned documents into corresponding word ranges for side by
/// side display.
///
/// Each pair ends just before the next sentence both documents label with
/// the same alignment number. Unaligned documents come back as a single
/// pair covering everything.
pub fn aligned_chunks(doc1: &MarkedDoc, doc2: &MarkedDoc) -> Vec<(Range<usize>, Range<usize>)> {
    let (n1, n2) = (doc1.len(), doc2.len());
    let mut chunks = Vec::new();
    let (mut word1, mut word2) = (0, 0);
    let (mut end1, mut end2) = (0, 0);
    while word1 < n1 && word2 < n2 {
        while end1 < n1
            && end2 < n2
            && !same_label(doc1.alignment(end1 + 1), doc2.alignment(end2 + 1))
        {
            while end1 < n1 && labelled_before(doc1.alignment(end1 + 1), doc2.alignment(end2 + 1)) {
                end1 += 1;
            }
            while end2 < n2 && labelled_before(doc2.alignment(end2 + 1), doc1.alignment(end1 + 1)) {
                end2 += 1;
            }
        }
        let stop1 = (end1 + 1).min(n1);
        let stop2 = (end2 + 1).min(n2);
        chunks.push((word1..stop1, word2..stop2));
        end1 += 1;
        end2 += 1;
        word1 = end1;
        word2 = end2;
    }
    chunks
}

fn same_label(a: Option<usize>, b: Option<usize>) -> bool {
    a.is_some() && a == b
}

/// An unlabelled sentence never ends a chunk. `None` orders below every
/// label.
fn labelled_before(a: Option<usize>, other: Option<usize>) -> bool {
    a.is_none() || a < other
}
