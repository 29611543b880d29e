//! Transcribe subcommand - batched offline decoding of sound files.

use eyre::{Result, WrapErr};
#[allow(unused_imports)]
use ort::execution_providers::*;
use ort::session::Session;
use rnnt_asr::decode::DecodingMethod;
use rnnt_asr::detokenizer::BpeDetokenizer;
use rnnt_asr::features::{Fbank, FbankConfig};
use rnnt_asr::model::{ModelConfig, load_transducer};
use rnnt_asr::pipeline::{Transcriber, format_transcripts};
use std::path::PathBuf;
use std::time::Instant;

/// CLI arguments for transcription.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to the checkpoint directory (encoder.onnx, decoder.onnx, joiner.onnx)
    #[arg(long)]
    pub checkpoint: PathBuf,

    /// Path to the BPE tokenizer model
    #[arg(long)]
    pub bpe_model: Option<PathBuf>,

    /// Decoding method: greedy_search or beam_search
    #[arg(long, default_value = "greedy_search")]
    pub method: String,

    /// Beam width, used only with beam_search
    #[arg(long, default_value_t = 5)]
    pub beam_size: usize,

    /// Input sound files (16kHz WAV)
    #[arg(required = true)]
    pub sound_files: Vec<PathBuf>,
}

/// Resolved configuration for transcription.
#[derive(Debug)]
pub struct Config {
    pub checkpoint: PathBuf,
    pub bpe_model: PathBuf,
    pub method: DecodingMethod,
    pub beam_size: usize,
    pub sound_files: Vec<PathBuf>,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        // The method is validated before any model or audio work starts
        let method: DecodingMethod = args.method.parse()?;

        let bpe_model = args
            .bpe_model
            .ok_or_else(|| eyre::eyre!("--bpe-model is required to decode token ids"))?;

        Ok(Self {
            checkpoint: args.checkpoint,
            bpe_model,
            method,
            beam_size: args.beam_size,
            sound_files: args.sound_files,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    tracing::info!(
        checkpoint = %config.checkpoint.display(),
        method = %config.method,
        files = config.sound_files.len(),
        "transcribing"
    );

    let detokenizer = BpeDetokenizer::from_file(&config.bpe_model)
        .wrap_err_with(|| format!("failed to load bpe model: {}", config.bpe_model.display()))?;

    let s = Instant::now();

    let builder = Session::builder()?.with_execution_providers([
        #[cfg(feature = "cuda")]
        CUDAExecutionProvider::default().build(),
        #[cfg(feature = "tensorrt")]
        TensorRTExecutionProvider::default().build(),
        #[cfg(feature = "openvino")]
        OpenVINOExecutionProvider::default().build(),
        #[cfg(feature = "directml")]
        DirectMLExecutionProvider::default().build(),
        #[cfg(feature = "coreml")]
        CoreMLExecutionProvider::default().build(),
    ])?;

    let model = load_transducer(
        &config.checkpoint,
        builder,
        ModelConfig::default(),
        detokenizer.blank_id(),
    )
    .wrap_err_with(|| format!("failed to load checkpoint: {}", config.checkpoint.display()))?;

    tracing::info!(duration = ?s.elapsed(), "model loaded");

    let mut transcriber = Transcriber::new(model, Fbank::new(FbankConfig::default()), detokenizer);

    let s = Instant::now();

    let transcripts = transcriber
        .transcribe_files(&config.sound_files, config.method, config.beam_size)
        .wrap_err("transcription failed")?;

    tracing::info!(duration = ?s.elapsed(), "inference completed");
    tracing::info!("{}", format_transcripts(&transcripts));

    Ok(())
}
