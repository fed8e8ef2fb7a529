//! Configuration via `docsim.toml`
//!
//! Every fingerprinting, indexing and overlap operation takes its tuning
//! values from a [`DocsimConfig`] passed in at construction time. A default
//! `docsim.toml` can be written next to a corpus and edited by hand.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Config file name placed in a corpus data directory.
pub const CONFIG_FILE_NAME: &str = "docsim.toml";

/// Smallest supported index bit width.
pub const MIN_INDEX_BITS: u32 = 4;

/// Largest supported index bit width on this host.
///
/// Tier 2 offsets must be addressable from tier 1, so 32-bit hosts stop
/// at 28 bits.
pub const MAX_INDEX_BITS: u32 = if usize::BITS >= 64 { 32 } else { 28 };

/// Largest accepted `prune_above` value.
pub const MAX_PRUNE_ABOVE: u32 = 1_000_000;

// ============================================================================
// Sections
// ============================================================================

/// `[kgram]` section: how documents are turned into keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KgramConfig {
    /// Number of words per k-gram (K).
    pub kgram_len: usize,
    /// Shared runs of at least this many words are guaranteed to share a
    /// selected key (T).
    pub guarantee_threshold: usize,
    /// Sentences with fewer words are not fingerprinted.
    pub min_sentence_words: usize,
    /// Treat each input line as a sentence. When false the whole file is
    /// one sentence.
    pub respect_sentences: bool,
    /// Select a winnowed subset of keys rather than every k-gram key.
    pub winnow: bool,
}

impl Default for KgramConfig {
    fn default() -> Self {
        Self {
            kgram_len: 7,
            guarantee_threshold: 12,
            min_sentence_words: 7,
            respect_sentences: false,
            winnow: true,
        }
    }
}

impl KgramConfig {
    /// Winnowing window length, `W = T - K + 1`.
    pub fn window(&self) -> usize {
        self.guarantee_threshold + 1 - self.kgram_len
    }
}

/// `[index.partition]` section: static key-space sharding.
///
/// A key is accepted when bits `bits..select_bits` of the key equal
/// `select_match`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartitionConfig {
    /// Total number of low key bits examined by the partition check.
    pub select_bits: u32,
    /// Required value of the bits above the index bits.
    pub select_match: u64,
}

/// `[index]` section: KeyTable shape and file layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexConfig {
    /// Number of low key bits used as the tier 1 index (B).
    pub bits: u32,
    /// Skip loaded keys with more documents than this. 0 keeps everything.
    pub prune_above: u32,
    /// Byte budget for each file of a multi-file key table.
    pub max_file_bytes: u64,
    /// Optional static partition of the key space.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionConfig>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            bits: 28,
            prune_above: 0,
            max_file_bytes: 2_100_000_000,
            partition: None,
        }
    }
}

/// `[overlap]` section: candidate extraction thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OverlapConfig {
    /// Shared-key threshold for a candidate pair.
    pub keys_for_match: u32,
    /// Keys found in at least this many documents are common boilerplate.
    pub common_threshold: u32,
    /// Cap on distinct documents recorded per KeyMap posting list.
    pub max_dupes_to_count: usize,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            keys_for_match: 10,
            common_threshold: 10,
            max_dupes_to_count: 100,
        }
    }
}

// ============================================================================
// DocsimConfig
// ============================================================================

/// Configuration loaded from `docsim.toml`.
///
/// # Example
///
/// ```toml
/// [kgram]
/// kgram_len = 7
/// guarantee_threshold = 12
///
/// [index]
/// bits = 24
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DocsimConfig {
    /// Fingerprinting settings.
    pub kgram: KgramConfig,
    /// Index settings.
    pub index: IndexConfig,
    /// Overlap extraction settings.
    pub overlap: OverlapConfig,
}

impl DocsimConfig {
    /// Check every setting, failing on the first bad one.
    pub fn validate(&self) -> Result<()> {
        let k = &self.kgram;
        if k.kgram_len == 0 {
            return Err(Error::invalid_config("kgram.kgram_len must be at least 1"));
        }
        if k.guarantee_threshold < k.kgram_len {
            return Err(Error::invalid_config(format!(
                "kgram.guarantee_threshold ({}) must be at least kgram.kgram_len ({})",
                k.guarantee_threshold, k.kgram_len
            )));
        }
        if k.min_sentence_words == 0 {
            return Err(Error::invalid_config(
                "kgram.min_sentence_words must be at least 1",
            ));
        }

        let ix = &self.index;
        check_bits(ix.bits)?;
        if let Some(p) = ix.partition {
            check_partition(ix.bits, p)?;
        }
        if ix.max_file_bytes == 0 {
            return Err(Error::invalid_config("index.max_file_bytes must be positive"));
        }
        if ix.prune_above > MAX_PRUNE_ABOVE {
            return Err(Error::invalid_config(format!(
                "index.prune_above ({}) must be at most {}",
                ix.prune_above, MAX_PRUNE_ABOVE
            )));
        }

        let ov = &self.overlap;
        if ov.keys_for_match == 0 {
            return Err(Error::invalid_config(
                "overlap.keys_for_match must be at least 1",
            ));
        }
        if ov.common_threshold < 2 {
            return Err(Error::invalid_config(
                "overlap.common_threshold must be at least 2",
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docsim configuration

[kgram]
# Words per k-gram (K)
kgram_len = 7
# Shared runs of this many words always share a selected key (T).
# Winnowing window is T - K + 1 k-grams.
guarantee_threshold = 12
# Sentences with fewer words are skipped
min_sentence_words = 7
# true: each line is a sentence. false: the whole file is one sentence.
respect_sentences = false
winnow = true

[index]
# Low key bits used as the key table index (4..=28 on 32-bit hosts, 4..=32 on 64-bit)
bits = 28
# Skip loaded keys found in more documents than this (0 = keep all)
prune_above = 0
# Byte budget for each file of a multi-file key table
max_file_bytes = 2100000000

# Static partition of the key space for sharded builds.
# [index.partition]
# select_bits = 30
# select_match = 1

[overlap]
# Shared keys needed for a candidate pair
keys_for_match = 10
# Keys in at least this many documents are stripped as boilerplate
common_threshold = 10
# Cap on documents recorded per key map posting list
max_dupes_to_count = 100
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path, "reading config file", e))?;
        let config: DocsimConfig = toml::from_str(&content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())
                .map_err(|e| Error::io(path, "writing default config file", e))?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::invalid_config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| Error::io(path, "writing config file", e))
    }
}

/// Validate an index bit width for this host.
pub fn check_bits(bits: u32) -> Result<()> {
    if !(MIN_INDEX_BITS..=MAX_INDEX_BITS).contains(&bits) {
        return Err(Error::invalid_config(format!(
            "index.bits ({}) must be between {} and {} on this host",
            bits, MIN_INDEX_BITS, MAX_INDEX_BITS
        )));
    }
    Ok(())
}

/// Validate a partition against the index bit width.
pub fn check_partition(bits: u32, p: PartitionConfig) -> Result<()> {
    if p.select_bits <= bits || p.select_bits > 32 {
        return Err(Error::invalid_config(format!(
            "index.partition.select_bits ({}) must be above index.bits ({}) and at most 32",
            p.select_bits, bits
        )));
    }
    if p.select_match >= 1u64 << (p.select_bits - bits) {
        return Err(Error::invalid_config(format!(
            "index.partition.select_match ({}) does not fit in {} bits",
            p.select_match,
            p.select_bits - bits
        )));
    }
    Ok(())
}
