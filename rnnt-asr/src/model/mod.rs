//! Transducer model capability traits and configuration.
//!
//! The encoder, decoder, and joiner networks are consumed through fixed
//! tensor interfaces so the pipeline and its tests can substitute
//! deterministic stubs for the ONNX-backed implementations.

pub mod onnx;

use crate::batch::FeatureBatch;
use crate::error::Result;
use ndarray::{Array1, Array3, ArrayView1};

pub use onnx::{OnnxDecoder, OnnxEncoder, OnnxJoiner, load_transducer};

/// Model shape constants the checkpoint is expected to match.
///
/// These are contracts, not validated against the checkpoint; a mismatch
/// surfaces downstream as a tensor-shape failure.
#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub sample_rate: u32,
    pub feature_dim: usize,
    pub encoder_out_dim: usize,
    pub subsampling_factor: usize,
    pub nhead: usize,
    pub dim_feedforward: usize,
    pub num_encoder_layers: usize,
    pub decoder_embedding_dim: usize,
    pub decoder_hidden_dim: usize,
    pub num_decoder_layers: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            feature_dim: 80,
            encoder_out_dim: 512,
            subsampling_factor: 4,
            nhead: 8,
            dim_feedforward: 2048,
            num_encoder_layers: 12,
            decoder_embedding_dim: 1024,
            decoder_hidden_dim: 512,
            num_decoder_layers: 2,
        }
    }
}

/// Hidden-state sequences for a batch, one row block per utterance.
///
/// `lengths` holds per-utterance valid lengths after the encoder's temporal
/// subsampling; utterance count and order match the feature batch.
#[derive(Clone, Debug)]
pub struct EncoderOutput {
    /// (utterance, time, encoder_out_dim)
    pub outputs: Array3<f32>,
    pub lengths: Vec<usize>,
}

/// Recurrent state of the label-history decoder, cloneable per hypothesis.
#[derive(Clone, Debug)]
pub struct DecoderState {
    /// (num_layers, 1, hidden)
    pub h: Array3<f32>,
    /// (num_layers, 1, hidden)
    pub c: Array3<f32>,
}

impl DecoderState {
    pub fn zeros(num_layers: usize, hidden_dim: usize) -> Self {
        Self {
            h: Array3::zeros((num_layers, 1, hidden_dim)),
            c: Array3::zeros((num_layers, 1, hidden_dim)),
        }
    }
}

/// Audio encoder: padded batch + lengths to hidden states + reduced lengths.
pub trait Encoder {
    /// Note: `&mut self` because ONNX Runtime's `Session::run` requires it.
    fn forward(&mut self, batch: &FeatureBatch) -> Result<EncoderOutput>;
}

/// Label-history network, advanced one token at a time.
pub trait Decoder {
    fn start_state(&self) -> DecoderState;

    /// Advance the decoder by one token, returning its output vector and
    /// the successor state.
    fn step(&mut self, token: u32, state: &DecoderState) -> Result<(Array1<f32>, DecoderState)>;
}

/// Combines one encoder frame with one decoder output into symbol logits.
pub trait Joiner {
    fn join(
        &mut self,
        encoder_frame: ArrayView1<'_, f32>,
        decoder_out: ArrayView1<'_, f32>,
    ) -> Result<Array1<f32>>;
}

/// The three networks bundled with the ids they share.
pub struct TransducerModel<E, D, J> {
    pub encoder: E,
    pub decoder: D,
    pub joiner: J,
    pub blank_id: u32,
}
