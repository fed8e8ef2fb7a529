//! Candidate pair extraction from files on disk through both backends

use crate::common::*;
use docsim::{
    analyze_corpus, find_candidate_pairs, AnalyzeOptions, Backend, DocPair, KeyTable, OverlapIndex,
};
use docsim_index::read_pairs;
use std::fs::File;
use std::io::BufReader;

fn corpus_texts() -> Vec<String> {
    let mut texts: Vec<String> = (0..20).map(|i| word_soup(i, 200)).collect();
    // doc 21: doc 5 with every 40th word replaced
    let edited: Vec<&str> = texts[4]
        .split(' ')
        .enumerate()
        .map(|(i, w)| if i % 40 == 39 { "xyzzy" } else { w })
        .collect();
    texts.push(edited.join(" "));
    // doc 22: first half of doc 12 followed by new text
    let half: Vec<&str> = texts[11].split(' ').take(100).collect();
    texts.push(format!("{} {}", half.join(" "), word_soup(99, 100)));
    texts
}

fn dup_config() -> DocsimConfig {
    let mut config = small_config(6, 9);
    config.index.bits = 20;
    config.overlap.keys_for_match = 5;
    config
}

fn pair_ids(pairs: &[DocPair]) -> Vec<(u32, u32)> {
    let mut ids: Vec<(u32, u32)> = pairs.iter().map(|p| (p.a, p.b)).collect();
    ids.sort_unstable();
    ids
}

#[test]
fn test_cat_mat_share_one_key() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(
        dir.path(),
        &["the cat sat on the mat today yes", "the cat sat on the mat today no"],
    );
    let config = small_config(7, 7);

    let mut table = KeyTable::from_config(&config.index).unwrap();
    corpus.add_to_keytable(&mut table, None, &config).unwrap();
    assert_eq!(table.overlap_docs(&[1], 1), vec![DocPair::new(1, 2, 1)]);
    assert_eq!(find_candidate_pairs(&table, 1), vec![DocPair::new(1, 2, 1)]);

    let map = corpus.build_keymap(None, &config, true).unwrap();
    assert_eq!(map.overlap_docs(&[1], 1), vec![DocPair::new(1, 2, 1)]);
    // exactly one shared key: strictly more than one is never reached
    assert!(table.overlap_ids(1).is_empty());
}

#[test]
fn test_keytable_pipeline_finds_duplicates() {
    let dir = TempDir::new().unwrap();
    let texts = corpus_texts();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let corpus = write_corpus(dir.path(), &refs);

    let mut options = AnalyzeOptions::new(dir.path().join("out"));
    options.candidates = true;
    let report = analyze_corpus(&corpus, &dup_config(), &options).unwrap();
    assert_eq!(report.documents, 22);
    assert_eq!(pair_ids(&report.pairs), vec![(5, 21), (12, 22)]);

    let written = File::open(dir.path().join("out").join("candidate.txt")).unwrap();
    assert_eq!(read_pairs(BufReader::new(written)).unwrap(), report.pairs);
}

#[test]
fn test_backends_and_sharding_agree() {
    let dir = TempDir::new().unwrap();
    let texts = corpus_texts();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let corpus = write_corpus(dir.path(), &refs);
    let config = dup_config();

    let mut plain = AnalyzeOptions::new(dir.path().join("plain"));
    plain.candidates = true;
    let mut keymap = AnalyzeOptions::new(dir.path().join("keymap"));
    keymap.backend = Backend::KeyMap;
    keymap.candidates = true;
    let mut sharded = AnalyzeOptions::new(dir.path().join("sharded"));
    sharded.shard_bits = Some(3);
    sharded.candidates = true;

    let plain = analyze_corpus(&corpus, &config, &plain).unwrap();
    let keymap = analyze_corpus(&corpus, &config, &keymap).unwrap();
    let sharded = analyze_corpus(&corpus, &config, &sharded).unwrap();
    assert_eq!(pair_ids(&keymap.pairs), pair_ids(&plain.pairs));
    assert_eq!(sharded.pairs, plain.pairs);
}

#[test]
fn test_small_file_budget_round_trips() {
    let dir = TempDir::new().unwrap();
    let texts = corpus_texts();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let corpus = write_corpus(dir.path(), &refs);
    let mut config = dup_config();
    config.index.max_file_bytes = 4096;

    let out = dir.path().join("out");
    let report = analyze_corpus(&corpus, &config, &AnalyzeOptions::new(&out)).unwrap();
    let all_files = report
        .outputs
        .iter()
        .filter(|p| p.to_string_lossy().contains("allkeys"))
        .count();
    assert!(all_files > 1);

    let mut whole = KeyTable::from_config(&config.index).unwrap();
    corpus.add_to_keytable(&mut whole, None, &config).unwrap();
    let mut loaded = KeyTable::from_config(&config.index).unwrap();
    loaded.read_multi_file(&out.join("allkeys")).unwrap();
    assert_eq!(
        find_candidate_pairs(&loaded, 5),
        find_candidate_pairs(&whole, 5)
    );
    assert_eq!(loaded.stats().tier2_len, whole.stats().tier2_len);
}
