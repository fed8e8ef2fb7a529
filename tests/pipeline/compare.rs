//! New documents against an analyzed corpus, and pairs word by word

use crate::common::*;
use docsim::{
    analyze_corpus, compare_document, compare_pair, AnalyzeOptions, Backend, CorpusSource,
    QUERY_DOC_ID,
};
use std::fs;
use std::path::Path;

fn corpus(dir: &Path) -> Corpus {
    let texts: Vec<String> = (0..10).map(|i| word_soup(100 + i, 150)).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    write_corpus(dir, &refs)
}

fn config() -> DocsimConfig {
    let mut config = small_config(5, 8);
    config.overlap.keys_for_match = 3;
    config
}

#[test]
fn test_compare_document_against_each_source() {
    let dir = TempDir::new().unwrap();
    let corpus = corpus(dir.path());
    let config = config();
    let out = dir.path().join("out");
    analyze_corpus(&corpus, &config, &AnalyzeOptions::new(&out)).unwrap();
    let mut keymap = AnalyzeOptions::new(&out);
    keymap.backend = Backend::KeyMap;
    analyze_corpus(&corpus, &config, &keymap).unwrap();

    // the middle of doc 7 embedded in new text
    let doc7 = fs::read_to_string(dir.path().join("doc7.txt")).unwrap();
    let middle: Vec<&str> = doc7.split(' ').skip(40).take(60).collect();
    let query = dir.path().join("query.txt");
    fs::write(
        &query,
        format!("{} {} {}", word_soup(7, 30), middle.join(" "), word_soup(8, 30)),
    )
    .unwrap();

    for source in [
        CorpusSource::KeyTableBase(out.join("allkeys")),
        CorpusSource::KeyTableFile(docsim_index::multi_file_name(&out.join("allkeys"), 1)),
        CorpusSource::KeyMap(out.join("allkeys.keymap")),
    ] {
        let result = compare_document(&query, &source, &config).unwrap();
        let ids: Vec<u32> = result.pairs.iter().map(|p| p.a).collect();
        assert_eq!(ids, vec![7], "{:?}", source);
        assert_eq!(result.pairs[0].b, QUERY_DOC_ID);
        assert!(result.pairs[0].shared > 3);
    }
}

#[test]
fn test_compare_pair_partial_copy() {
    let dir = TempDir::new().unwrap();
    let original = word_soup(1, 120);
    let words: Vec<&str> = original.split(' ').collect();
    let copy = format!("{} {}", words[..60].join(" "), word_soup(2, 60));
    let p1 = dir.path().join("original.txt");
    let p2 = dir.path().join("copy.txt");
    fs::write(&p1, &original).unwrap();
    fs::write(&p2, &copy).unwrap();

    let result = compare_pair(&p1, &p2, &config()).unwrap();
    let (s1, s2) = result.stats();
    assert_eq!(s1.words, 120);
    assert_eq!(s2.words, 120);
    // the copied half matches word for word
    assert!(s1.longest_run >= 60);
    assert_eq!(s1.longest_start, 0);
    assert!(s2.matching >= 60);
    assert!(s1.matching < 120);
    assert!(result.stats_line().starts_with("#STATS#: 120 "));

    let chunks = result.chunks();
    assert_eq!(chunks.last().map(|c| (c.0.end, c.1.end)), Some((120, 120)));
}
