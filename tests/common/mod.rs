//! Shared helpers for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub use docsim::{Corpus, DocsimConfig, KgramConfig};
pub use tempfile::TempDir;

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Config with small k-grams suited to short test documents.
pub fn small_config(kgram_len: usize, guarantee_threshold: usize) -> DocsimConfig {
    let mut config = DocsimConfig {
        kgram: KgramConfig {
            kgram_len,
            guarantee_threshold,
            min_sentence_words: kgram_len,
            respect_sentences: false,
            winnow: true,
        },
        ..DocsimConfig::default()
    };
    config.index.bits = 16;
    config.overlap.keys_for_match = 1;
    config.overlap.common_threshold = 3;
    config
}

/// Write `texts` as `doc1.txt`, `doc2.txt`, ... under `dir` and list them
/// in `files.txt`, one name per line.
pub fn write_corpus(dir: &Path, texts: &[&str]) -> Corpus {
    init_logging();
    let mut list = String::new();
    for (i, text) in texts.iter().enumerate() {
        let name = format!("doc{}.txt", i + 1);
        fs::write(dir.join(&name), text).unwrap();
        list.push_str(&name);
        list.push('\n');
    }
    let list_path = dir.join("files.txt");
    fs::write(&list_path, list).unwrap();
    Corpus::read_file_list(&list_path, dir).unwrap()
}

/// Deterministic pseudo-random word soup, `words` words long.
pub fn word_soup(seed: u64, words: usize) -> String {
    const VOCAB: &[&str] = &[
        "river", "stone", "lantern", "orchard", "harbor", "meadow", "copper", "falcon", "willow",
        "ember", "thistle", "canyon", "marble", "juniper", "quartz", "saffron", "tundra", "velvet",
        "zephyr", "bramble",
    ];
    let mut state = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    (0..words)
        .map(|_| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            VOCAB[(state >> 33) as usize % VOCAB.len()]
        })
        .collect::<Vec<_>>()
        .join(" ")
}
