//! Resumable corpus feature caching.
//!
//! For a fixed set of partitions, computes and persists fbank features,
//! skipping partitions whose cuts artifact already exists. Existence of the
//! artifact is the sole completion signal: a partial file left by a crash is
//! indistinguishable from a complete one on the next run.

use crate::cuts::CutSet;
use crate::error::Result;
use crate::features::{Fbank, FbankConfig};
use crate::manifest::read_manifests;
use std::path::PathBuf;

/// Partitions processed by every caching run.
pub const DATASET_PARTS: [&str; 3] = ["train", "dev", "test"];

/// Upper bound on the worker pool regardless of core count.
pub const MAX_JOBS: usize = 48;

/// Caching run configuration.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Directory holding the recording/supervision manifests
    pub manifest_dir: PathBuf,
    /// Directory receiving cuts artifacts and feature storage
    pub output_dir: PathBuf,
    /// Artifact naming prefix (`<prefix>_cuts_<partition>.<suffix>`)
    pub prefix: String,
    /// Artifact naming suffix
    pub suffix: String,
    /// Accepted but not applied: no length filtering is wired up
    pub bpe_model: Option<PathBuf>,
    /// Accepted but not applied: all partitions are always processed
    pub dataset: Option<String>,
}

impl CacheConfig {
    pub fn new(manifest_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            manifest_dir,
            output_dir,
            prefix: "corpus".to_string(),
            suffix: "jsonl".to_string(),
            bpe_model: None,
            dataset: None,
        }
    }

    /// Expected artifact path for one partition; its existence marks the
    /// partition complete.
    pub fn cuts_path(&self, partition: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_cuts_{}.{}", self.prefix, partition, self.suffix))
    }

    /// Per-partition feature storage directory.
    pub fn feats_dir(&self, partition: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_feats_{}", self.prefix, partition))
    }
}

fn num_jobs() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    MAX_JOBS.min(cpus)
}

/// Run the caching pipeline over all partitions.
///
/// Partitions are processed sequentially; each partition's segments are
/// farmed out to a worker pool sized once before the loop. Already-cached
/// partitions are skipped; a missing manifest for any declared partition is
/// fatal before any computation starts.
pub fn run(config: &CacheConfig) -> Result<()> {
    if let Some(bpe_model) = &config.bpe_model {
        tracing::info!(path = %bpe_model.display(), "bpe model supplied (not applied)");
    }
    if let Some(dataset) = &config.dataset {
        tracing::info!(%dataset, "dataset filter supplied (not applied)");
    }

    std::fs::create_dir_all(&config.output_dir)
        .map_err(crate::error::ManifestError::Io)?;

    let manifests = read_manifests(
        &config.manifest_dir,
        &config.prefix,
        &config.suffix,
        &DATASET_PARTS,
    )?;

    // Pool size is fixed before any parallel work begins
    let num_jobs = num_jobs();
    let fbank = Fbank::new(FbankConfig::default());

    for (partition, manifest) in &manifests {
        let cuts_path = config.cuts_path(partition);
        if cuts_path.is_file() {
            tracing::info!("{partition} already exists - skipping");
            continue;
        }

        tracing::info!("processing {partition}");

        let cut_set = CutSet::from_manifests(manifest);
        let cut_set = cut_set.compute_and_store_features(
            &fbank,
            &manifest.recordings,
            &config.feats_dir(partition),
            num_jobs,
        )?;
        let cut_set = cut_set.trim_to_supervisions();

        // This write makes the partition complete for future runs
        cut_set.to_file(&cuts_path)?;

        tracing::info!(
            partition = %partition,
            cuts = cut_set.len(),
            "partition cached"
        );
    }

    Ok(())
}
