//! rnnt-asr: offline transducer speech-to-text with corpus feature caching.
//!
//! Two subsystems share this crate:
//!
//! - A batched inference pipeline: variable-length waveform loading, log-mel
//!   fbank extraction, padded batching, one encoder pass, and per-utterance
//!   greedy or beam search over the transducer networks.
//! - A resumable feature-caching pipeline that computes and persists fbank
//!   features for a fixed set of corpus partitions, skipping partitions
//!   whose cuts artifact already exists.
//!
//! The encoder, decoder, and joiner networks are consumed through the
//! [`model::Encoder`], [`model::Decoder`], and [`model::Joiner`] traits, so
//! tests substitute deterministic stubs for the ONNX-backed sessions.
//!
//! # Quick start
//!
//! ```ignore
//! use rnnt_asr::decode::DecodingMethod;
//! use rnnt_asr::detokenizer::BpeDetokenizer;
//! use rnnt_asr::features::{Fbank, FbankConfig};
//! use rnnt_asr::model::{ModelConfig, load_transducer};
//! use rnnt_asr::pipeline::Transcriber;
//! use ort::session::Session;
//!
//! let detokenizer = BpeDetokenizer::from_file("bpe/tokenizer.json")?;
//! let model = load_transducer(
//!     "exp/checkpoint",
//!     Session::builder()?,
//!     ModelConfig::default(),
//!     detokenizer.blank_id(),
//! )?;
//!
//! let mut transcriber =
//!     Transcriber::new(model, Fbank::new(FbankConfig::default()), detokenizer);
//! let transcripts =
//!     transcriber.transcribe_files(&files, DecodingMethod::GreedySearch, 5)?;
//! ```

pub mod audio;
pub mod batch;
pub mod cache;
pub mod cuts;
pub mod decode;
pub mod detokenizer;
pub mod error;
pub mod features;
pub mod manifest;
pub mod model;
pub mod pipeline;
pub mod search;
pub mod storage;
