//! Corpus: the numbered set of documents an index is built from
//!
//! Documents get ids 1, 2, 3, ... in the order they are added. A file list
//! is plain text with names separated by any whitespace; names are taken
//! relative to the data directory unless they start with `/` or `.`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use docsim_core::{DocId, DocsimConfig, Error, Result};
use docsim_index::{KeyMap, KeyTable};
use docsim_kgram::Winnower;

use crate::document::Document;

/// Documents logged between progress reports.
const PROGRESS_EVERY: usize = 1000;

/// Inclusive range of document ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocRange {
    /// First id in the range.
    pub first: DocId,
    /// Last id in the range.
    pub last: DocId,
}

impl DocRange {
    /// Range `first..=last`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `first` is 0 or after `last`.
    pub fn new(first: DocId, last: DocId) -> Result<Self> {
        if first == 0 || first > last {
            return Err(Error::invalid_config(format!(
                "document range {}..={} is empty or starts before 1",
                first, last
            )));
        }
        Ok(DocRange { first, last })
    }

    /// Suffix added to output file names, `_<first>_<last>`.
    pub fn suffix(&self) -> String {
        format!("_{}_{}", self.first, self.last)
    }
}

/// Resolve `name` against `data_dir`.
fn resolve(data_dir: &Path, name: &str) -> PathBuf {
    if data_dir.as_os_str().is_empty() || name.starts_with('/') || name.starts_with('.') {
        PathBuf::from(name)
    } else {
        data_dir.join(name)
    }
}

/// An ordered set of documents.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    data_dir: PathBuf,
    docs: Vec<Document>,
}

impl Corpus {
    /// Empty corpus with names resolved against `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Corpus {
            data_dir: data_dir.into(),
            docs: Vec::new(),
        }
    }

    /// Corpus of every file named in `list`, with ids in list order.
    pub fn read_file_list(list: &Path, data_dir: impl Into<PathBuf>) -> Result<Self> {
        let text = fs::read_to_string(list).map_err(|e| Error::io(list, "reading file list", e))?;
        let mut corpus = Corpus::new(data_dir);
        for name in text.split_whitespace() {
            corpus.add_file(name)?;
        }
        info!(
            target: "docsim::engine",
            list = %list.display(),
            documents = corpus.len(),
            "Read file list"
        );
        Ok(corpus)
    }

    /// Add a document and return its id.
    ///
    /// # Errors
    ///
    /// `CapacityExhausted` when document ids run out.
    pub fn add_file(&mut self, name: &str) -> Result<DocId> {
        let id = DocId::try_from(self.docs.len() + 1)
            .map_err(|_| Error::CapacityExhausted("document ids exhausted".to_string()))?;
        self.docs.push(Document::new(resolve(&self.data_dir, name), id));
        Ok(id)
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the corpus has no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Documents in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> + '_ {
        self.docs.iter()
    }

    /// Document `id`.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` for 0 or an id past the end.
    pub fn get(&self, id: DocId) -> Result<&Document> {
        (id as usize)
            .checked_sub(1)
            .and_then(|i| self.docs.get(i))
            .ok_or_else(|| {
                Error::invariant(format!(
                    "no document {} in a corpus of {}",
                    id,
                    self.docs.len()
                ))
            })
    }

    /// Documents within `range`, clipped to the corpus. All documents
    /// without a range.
    pub fn documents(&self, range: Option<DocRange>) -> &[Document] {
        match range {
            None => &self.docs,
            Some(r) => {
                let start = (r.first as usize - 1).min(self.docs.len());
                let end = (r.last as usize).min(self.docs.len());
                &self.docs[start..end]
            }
        }
    }

    /// Write `"<id>\t<path>"` lines.
    pub fn write_doc_ids<W: Write>(&self, out: &mut W) -> Result<()> {
        for doc in &self.docs {
            writeln!(out, "{}\t{}", doc.id(), doc.path().display())?;
        }
        Ok(())
    }

    /// Write the id list to `path`.
    pub fn write_doc_ids_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, "creating document id list", e))?;
        let mut out = BufWriter::new(file);
        self.write_doc_ids(&mut out)?;
        out.flush()
            .map_err(|e| Error::io(path, "writing document id list", e))?;
        Ok(())
    }

    // ========================================================================
    // Index builds
    // ========================================================================

    /// Exact KeyMap of the documents in `range`.
    ///
    /// `winnow` overrides the configured winnowing; pair comparison needs
    /// every key.
    pub fn build_keymap(
        &self,
        range: Option<DocRange>,
        config: &DocsimConfig,
        winnow: bool,
    ) -> Result<KeyMap> {
        let mut winnower = Winnower::new(&config.kgram)?.with_winnow(winnow);
        let mut map = KeyMap::new();
        let docs = self.documents(range);
        for (n, doc) in docs.iter().enumerate() {
            doc.add_to_keymap(
                &mut map,
                &mut winnower,
                &config.kgram,
                config.overlap.max_dupes_to_count,
            )?;
            if (n + 1) % PROGRESS_EVERY == 0 {
                info!(
                    target: "docsim::engine",
                    documents = n + 1,
                    keys = map.len(),
                    "Building key map"
                );
            }
        }
        info!(
            target: "docsim::engine",
            documents = docs.len(),
            keys = map.len(),
            "Built key map"
        );
        Ok(map)
    }

    /// Add the documents in `range` to `table`, in id order.
    pub fn add_to_keytable(
        &self,
        table: &mut KeyTable,
        range: Option<DocRange>,
        config: &DocsimConfig,
    ) -> Result<()> {
        let mut winnower = Winnower::new(&config.kgram)?;
        let docs = self.documents(range);
        let mut keys = 0;
        for (n, doc) in docs.iter().enumerate() {
            keys += doc.add_to_keytable(table, &mut winnower, &config.kgram)?;
            if (n + 1) % PROGRESS_EVERY == 0 {
                info!(
                    target: "docsim::engine",
                    documents = n + 1,
                    last_id = doc.id(),
                    keys,
                    "Adding documents to key table"
                );
            }
        }
        info!(
            target: "docsim::engine",
            documents = docs.len(),
            keys,
            "Added documents to key table"
        );
        Ok(())
    }
}
