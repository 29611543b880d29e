//! Fbank subcommand - compute and cache corpus features.

use eyre::{Result, WrapErr};
use rnnt_asr::cache::{self, CacheConfig};
use std::path::PathBuf;

/// CLI arguments for feature caching.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to the BPE model (accepted; length filtering is not applied)
    #[arg(long)]
    pub bpe_model: Option<PathBuf>,

    /// Partition filter (accepted; all partitions are always processed)
    #[arg(long)]
    pub dataset: Option<String>,

    /// Directory holding the corpus manifests
    #[arg(long)]
    pub manifestpath: PathBuf,

    /// Output directory for cuts artifacts and feature storage
    #[arg(long)]
    pub fbankpath: PathBuf,
}

impl From<Args> for CacheConfig {
    fn from(args: Args) -> Self {
        let mut config = CacheConfig::new(args.manifestpath, args.fbankpath);
        config.bpe_model = args.bpe_model;
        config.dataset = args.dataset;
        config
    }
}

pub fn execute(config: CacheConfig) -> Result<()> {
    tracing::info!(
        manifests = %config.manifest_dir.display(),
        output = %config.output_dir.display(),
        "caching fbank features"
    );

    cache::run(&config).wrap_err("feature caching failed")
}
