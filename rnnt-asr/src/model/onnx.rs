//! ONNX-backed transducer networks.

use crate::batch::FeatureBatch;
use crate::error::{ConfigError, ModelError, Result};
use crate::model::{Decoder, DecoderState, Encoder, EncoderOutput, Joiner, ModelConfig, TransducerModel};
use ndarray::prelude::*;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use ort::{inputs, value::Value};
use std::path::{Path, PathBuf};

fn missing(name: &str) -> ModelError {
    ModelError::MissingOutput {
        name: name.to_string(),
    }
}

/// Encoder network session.
pub struct OnnxEncoder {
    session: Session,
}

impl Encoder for OnnxEncoder {
    fn forward(&mut self, batch: &FeatureBatch) -> Result<EncoderOutput> {
        let lengths = Array1::from_iter(batch.lengths.iter().map(|&l| l as i64));

        let x = Value::from_array(batch.features.clone())?;
        let x_lens = Value::from_array(lengths)?;

        let mut outputs = self.session.run(inputs!(
            "x" => x,
            "x_lens" => x_lens,
        ))?;

        let encoder_out = outputs
            .remove("encoder_out")
            .ok_or_else(|| missing("encoder_out"))?;
        let encoder_out_lens = outputs
            .remove("encoder_out_lens")
            .ok_or_else(|| missing("encoder_out_lens"))?;

        let outputs = encoder_out
            .try_extract_array::<f32>()?
            .to_owned()
            .into_dimensionality::<Ix3>()?;

        let lengths = encoder_out_lens
            .try_extract_array::<i64>()?
            .iter()
            .map(|&l| l as usize)
            .collect();

        Ok(EncoderOutput { outputs, lengths })
    }
}

/// Label-history decoder network session (2-layer LSTM).
pub struct OnnxDecoder {
    session: Session,
    config: ModelConfig,
}

impl Decoder for OnnxDecoder {
    fn start_state(&self) -> DecoderState {
        DecoderState::zeros(self.config.num_decoder_layers, self.config.decoder_hidden_dim)
    }

    fn step(&mut self, token: u32, state: &DecoderState) -> Result<(Array1<f32>, DecoderState)> {
        let y = Value::from_array(Array2::from_elem((1, 1), token as i64))?;
        let h = Value::from_array(state.h.clone())?;
        let c = Value::from_array(state.c.clone())?;

        let mut outputs = self.session.run(inputs!(
            "y" => y,
            "h" => h,
            "c" => c,
        ))?;

        let decoder_out = outputs
            .remove("decoder_out")
            .ok_or_else(|| missing("decoder_out"))?
            .try_extract_array::<f32>()?
            .to_owned()
            .flatten()
            .to_owned();

        let next_h = outputs
            .remove("next_h")
            .ok_or_else(|| missing("next_h"))?
            .try_extract_array::<f32>()?
            .to_owned()
            .into_dimensionality::<Ix3>()?;

        let next_c = outputs
            .remove("next_c")
            .ok_or_else(|| missing("next_c"))?
            .try_extract_array::<f32>()?
            .to_owned()
            .into_dimensionality::<Ix3>()?;

        Ok((
            decoder_out,
            DecoderState {
                h: next_h,
                c: next_c,
            },
        ))
    }
}

/// Joiner network session.
pub struct OnnxJoiner {
    session: Session,
}

impl Joiner for OnnxJoiner {
    fn join(
        &mut self,
        encoder_frame: ArrayView1<'_, f32>,
        decoder_out: ArrayView1<'_, f32>,
    ) -> Result<Array1<f32>> {
        let encoder_out = Value::from_array(encoder_frame.to_owned().insert_axis(Axis(0)))?;
        let decoder_out = Value::from_array(decoder_out.to_owned().insert_axis(Axis(0)))?;

        let mut outputs = self.session.run(inputs!(
            "encoder_out" => encoder_out,
            "decoder_out" => decoder_out,
        ))?;

        let logits = outputs
            .remove("logits")
            .ok_or_else(|| missing("logits"))?
            .try_extract_array::<f32>()?
            .to_owned()
            .flatten()
            .to_owned();

        Ok(logits)
    }
}

fn resolve(checkpoint_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let path = checkpoint_dir.join(file_name);
    if !path.is_file() {
        return Err(ConfigError::ModelNotFound(path).into());
    }
    Ok(path)
}

/// Load the three networks from a checkpoint directory.
///
/// Expects `encoder.onnx`, `decoder.onnx`, and `joiner.onnx`; a missing file
/// is a fatal configuration error surfaced before any audio is read.
pub fn load_transducer(
    checkpoint_dir: impl AsRef<Path>,
    session_builder: SessionBuilder,
    config: ModelConfig,
    blank_id: u32,
) -> Result<TransducerModel<OnnxEncoder, OnnxDecoder, OnnxJoiner>> {
    let checkpoint_dir = checkpoint_dir.as_ref();

    let encoder_path = resolve(checkpoint_dir, "encoder.onnx")?;
    let decoder_path = resolve(checkpoint_dir, "decoder.onnx")?;
    let joiner_path = resolve(checkpoint_dir, "joiner.onnx")?;

    let encoder_session = session_builder.clone().commit_from_file(&encoder_path)?;
    let decoder_session = session_builder.clone().commit_from_file(&decoder_path)?;
    let joiner_session = session_builder.commit_from_file(&joiner_path)?;

    Ok(TransducerModel {
        encoder: OnnxEncoder {
            session: encoder_session,
        },
        decoder: OnnxDecoder {
            session: decoder_session,
            config,
        },
        joiner: OnnxJoiner {
            session: joiner_session,
        },
        blank_id,
    })
}
