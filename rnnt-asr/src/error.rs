//! Error types for rnnt-asr organized by processing stage.

use ndarray::ShapeError;
use ndarray_stats::errors::MinMaxError;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration stage error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Audio loading stage error
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Model inference stage error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Manifest / cut-set stage error
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Configuration errors (decoding method, model loading).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown decoding method name
    #[error("unsupported decoding method: {0}")]
    UnsupportedMethod(String),

    /// Model file not found in the checkpoint directory
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),

    /// Tokenizer model missing or unreadable
    #[error("failed to load bpe model: {0}")]
    BpeModel(String),
}

/// Audio loading and validation errors.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Sample rate validation failed
    #[error("{path}: expected sample rate {expected}Hz, got {got}Hz")]
    SampleRateMismatch {
        path: PathBuf,
        expected: u32,
        got: u32,
    },

    /// File declares no audio channels
    #[error("{0}: no audio channels")]
    NoChannels(PathBuf),

    /// Requested segment lies outside the recording
    #[error("segment [{start}, {end}) out of range for {path} ({len} samples)")]
    SegmentOutOfRange {
        path: PathBuf,
        start: usize,
        end: usize,
        len: usize,
    },

    /// IO error during audio loading
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WAV file format error
    #[error(transparent)]
    Hound(#[from] hound::Error),
}

/// Model inference errors (ONNX, ndarray operations).
#[derive(Debug, Error)]
pub enum ModelError {
    /// Missing expected output tensor
    #[error("missing model output: {name}")]
    MissingOutput { name: String },

    /// Feature matrices with inconsistent dimensionality in one batch
    #[error("feature dim mismatch in batch: expected {expected}, got {got}")]
    FeatureDimMismatch { expected: usize, got: usize },

    /// Empty batch handed to the encoder
    #[error("empty feature batch")]
    EmptyBatch,

    /// Decoded token id not present in the vocabulary
    #[error("invalid token id: {0}")]
    InvalidTokenId(u32),

    /// ONNX Runtime error
    #[error(transparent)]
    Ort(#[from] ort::Error),

    /// ndarray shape error
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// ndarray-stats min/max error
    #[error(transparent)]
    MinMax(#[from] MinMaxError),
}

/// Manifest and cut-set errors for the feature-caching pipeline.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A declared partition's manifest file is absent
    #[error("missing manifest for partition {partition}: {path}")]
    Missing { partition: String, path: PathBuf },

    /// Cut references a recording absent from the recording manifest
    #[error("cut {cut_id} references unknown recording {recording_id}")]
    UnknownRecording { cut_id: String, recording_id: String },

    /// Feature storage file is malformed
    #[error("bad feature file {path}: {reason}")]
    BadFeatureFile { path: PathBuf, reason: String },

    /// IO error while reading or writing manifests
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Manifest line failed to parse
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias for rnnt-asr operations.
pub type Result<T> = std::result::Result<T, Error>;

// Nested From implementations for automatic error conversion chains

// hound::Error → AudioError → Error
impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::Audio(AudioError::Hound(e))
    }
}

// ort::Error → ModelError → Error
impl From<ort::Error> for Error {
    fn from(e: ort::Error) -> Self {
        Error::Model(ModelError::Ort(e))
    }
}

// ShapeError → ModelError → Error
impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        Error::Model(ModelError::Shape(e))
    }
}

// MinMaxError → ModelError → Error
impl From<MinMaxError> for Error {
    fn from(e: MinMaxError) -> Self {
        Error::Model(ModelError::MinMax(e))
    }
}

// serde_json::Error → ManifestError → Error
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Manifest(ManifestError::Json(e))
    }
}
