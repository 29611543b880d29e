//! Padding variable-length feature matrices into one dense batch.

use crate::error::{ModelError, Result};
use crate::features::ENERGY_FLOOR;
use ndarray::{Array2, Array3, s};

/// Sentinel written into padded frames.
///
/// Log of the energy floor, so padding cannot be mistaken for real energy.
pub fn pad_value() -> f32 {
    ENERGY_FLOOR.ln()
}

/// Dense (utterance, time, feature) batch plus per-utterance valid lengths.
///
/// Lengths are stored in the same order as the input list; later stages
/// re-associate transcripts to files by index.
#[derive(Clone, Debug)]
pub struct FeatureBatch {
    pub features: Array3<f32>,
    pub lengths: Vec<usize>,
}

impl FeatureBatch {
    pub fn num_utterances(&self) -> usize {
        self.lengths.len()
    }
}

/// Pad feature matrices of equal width but varying length into one batch.
///
/// Row `i` of the result holds matrix `i` in frames `[0, length_i)` and the
/// pad sentinel everywhere beyond. Output order equals input order.
pub fn pad_features(matrices: &[Array2<f32>]) -> Result<FeatureBatch> {
    let first = matrices.first().ok_or(ModelError::EmptyBatch)?;
    let dim = first.ncols();

    for m in matrices {
        if m.ncols() != dim {
            return Err(ModelError::FeatureDimMismatch {
                expected: dim,
                got: m.ncols(),
            }
            .into());
        }
    }

    let lengths: Vec<usize> = matrices.iter().map(|m| m.nrows()).collect();
    let max_length = lengths.iter().copied().max().unwrap_or(0);

    let mut features = Array3::from_elem((matrices.len(), max_length, dim), pad_value());
    for (i, m) in matrices.iter().enumerate() {
        features
            .slice_mut(s![i, 0..m.nrows(), ..])
            .assign(&m.view());
    }

    Ok(FeatureBatch { features, lengths })
}
