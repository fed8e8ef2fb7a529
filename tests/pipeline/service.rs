//! The overlap service over a freshly analyzed corpus

use crate::common::*;
use docsim::{analyze_corpus, AnalyzeOptions, OverlapService, TableSource, STATUS_OK};
use std::fs;

#[test]
fn test_service_queries_and_reload() {
    let dir = TempDir::new().unwrap();
    let texts: Vec<String> = (0..6).map(|i| word_soup(200 + i, 120)).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let corpus = write_corpus(dir.path(), &refs);
    let mut config = small_config(5, 8);
    config.overlap.keys_for_match = 3;

    let out = dir.path().join("out");
    analyze_corpus(&corpus, &config, &AnalyzeOptions::new(&out)).unwrap();
    let service =
        OverlapService::open(config.clone(), TableSource::MultiFile(out.join("allkeys"))).unwrap();
    assert_eq!(service.status(), STATUS_OK);

    let response = service.query(&texts[3]).unwrap();
    assert_eq!(response.matches, 1);
    assert!(response.docs.starts_with("4 9999999 "));

    let newcomer = word_soup(999, 120);
    assert_eq!(service.query(&newcomer).unwrap().matches, 0);

    // add the newcomer to the corpus and rebuild in place
    fs::write(dir.path().join("doc7.txt"), &newcomer).unwrap();
    let mut corpus = corpus;
    corpus.add_file("doc7.txt").unwrap();
    analyze_corpus(&corpus, &config, &AnalyzeOptions::new(&out)).unwrap();
    service.reload().unwrap();

    let response = service.query(&newcomer).unwrap();
    assert_eq!(response.matches, 1);
    assert!(response.docs.starts_with("7 9999999 "));
}
