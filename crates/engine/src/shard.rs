//! Sharded KeyTable builds
//!
//! A table over `bits` bits is split into `2^shard_bits` partitions. Shard
//! `s` is a table over `bits - shard_bits` bits that keeps only keys whose
//! next `shard_bits` bits equal `s`, so shards hold disjoint keys and
//! every posting list lives in exactly one of them. Shards are built in
//! parallel, written as tables123 files, then read back into one table.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use docsim_core::{DocsimConfig, Error, IndexConfig, PartitionConfig, Result, MIN_INDEX_BITS};
use docsim_index::{KeyTable, TableFormat};

use crate::corpus::Corpus;

/// Multi-file base name of shard `shard` under `dir`.
pub fn shard_base(dir: &Path, shard: u64) -> PathBuf {
    dir.join(format!("shard_{}", shard))
}

/// Build the corpus table as `2^shard_bits` partitions in parallel, write
/// each under `out_dir`, and return their concatenation.
///
/// # Errors
///
/// `InvalidConfig` if `shard_bits` is 0, leaves shards narrower than the
/// minimum table width, or `config.index` already names a partition.
pub fn build_sharded(
    corpus: &Corpus,
    config: &DocsimConfig,
    shard_bits: u32,
    out_dir: &Path,
) -> Result<KeyTable> {
    let bits = config.index.bits;
    if config.index.partition.is_some() {
        return Err(Error::invalid_config(
            "sharded builds cannot start from a partitioned index",
        ));
    }
    if shard_bits == 0 || bits < MIN_INDEX_BITS + shard_bits {
        return Err(Error::invalid_config(format!(
            "shard_bits ({}) must be at least 1 and leave {} index bits of {}",
            shard_bits, MIN_INDEX_BITS, bits
        )));
    }
    let shards = 1u64 << shard_bits;
    info!(
        target: "docsim::engine",
        shards,
        bits,
        documents = corpus.len(),
        "Building sharded key table"
    );

    let bases = (0..shards)
        .into_par_iter()
        .map(|shard| build_shard(corpus, config, bits - shard_bits, shard, out_dir))
        .collect::<Result<Vec<_>>>()?;

    concat_tables(&bases, &config.index)
}

fn build_shard(
    corpus: &Corpus,
    config: &DocsimConfig,
    shard_table_bits: u32,
    shard: u64,
    out_dir: &Path,
) -> Result<PathBuf> {
    let partition = PartitionConfig {
        select_bits: config.index.bits,
        select_match: shard,
    };
    let mut table = KeyTable::with_partition(shard_table_bits, partition)?;
    corpus.add_to_keytable(&mut table, None, config)?;
    let base = shard_base(out_dir, shard);
    let files = table.write_multi_file(&base, TableFormat::Tables123, config.index.max_file_bytes)?;
    debug!(
        target: "docsim::engine",
        shard,
        files,
        base = %base.display(),
        "Wrote shard"
    );
    Ok(base)
}

/// Read tables123 multi-file sets into one table over `config.bits` bits,
/// skipping lists longer than `config.prune_above`.
///
/// Sets may come from separate shards or separate document ranges; lists
/// for the same index are merged.
pub fn concat_tables(bases: &[PathBuf], config: &IndexConfig) -> Result<KeyTable> {
    let mut table = KeyTable::new(config.bits)?;
    table.set_prune_above(config.prune_above)?;
    for base in bases {
        table.read_multi_file(base)?;
    }
    info!(
        target: "docsim::engine",
        sets = bases.len(),
        shared = table.shared_len(),
        "Concatenated key tables"
    );
    table.stats().log();
    Ok(table)
}
