//! Binary on-disk format for per-segment feature matrices.
//!
//! Layout: 4-byte magic, u32 row count, u32 column count, then row-major
//! f32 payload, all little-endian.

use crate::error::{ManifestError, Result};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"RNTF";

fn bad(path: &Path, reason: impl Into<String>) -> ManifestError {
    ManifestError::BadFeatureFile {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Persist one feature matrix.
pub fn write_features(path: &Path, features: &Array2<f32>) -> Result<()> {
    let file = File::create(path).map_err(ManifestError::Io)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(MAGIC).map_err(ManifestError::Io)?;
    writer
        .write_all(&(features.nrows() as u32).to_le_bytes())
        .map_err(ManifestError::Io)?;
    writer
        .write_all(&(features.ncols() as u32).to_le_bytes())
        .map_err(ManifestError::Io)?;

    for &v in features.iter() {
        writer.write_all(&v.to_le_bytes()).map_err(ManifestError::Io)?;
    }

    writer.flush().map_err(ManifestError::Io)?;
    Ok(())
}

/// Load a frame range `[first_frame, first_frame + num_frames)` of a stored
/// feature matrix.
pub fn read_features(path: &Path, first_frame: usize, num_frames: usize) -> Result<Array2<f32>> {
    let file = File::open(path).map_err(ManifestError::Io)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(ManifestError::Io)?;
    if &magic != MAGIC {
        return Err(bad(path, "bad magic").into());
    }

    let mut word = [0u8; 4];
    reader.read_exact(&mut word).map_err(ManifestError::Io)?;
    let rows = u32::from_le_bytes(word) as usize;
    reader.read_exact(&mut word).map_err(ManifestError::Io)?;
    let cols = u32::from_le_bytes(word) as usize;

    if first_frame + num_frames > rows {
        return Err(bad(
            path,
            format!(
                "frame range [{first_frame}, {}) exceeds {rows} stored frames",
                first_frame + num_frames
            ),
        )
        .into());
    }

    let mut payload = vec![0u8; rows * cols * 4];
    reader.read_exact(&mut payload).map_err(ManifestError::Io)?;

    let offset = first_frame * cols;
    let values: Vec<f32> = payload
        .chunks_exact(4)
        .skip(offset)
        .take(num_frames * cols)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Array2::from_shape_vec((num_frames, cols), values)
        .map_err(|e| bad(path, e.to_string()).into())
}

/// Load a full stored feature matrix.
pub fn read_all_features(path: &Path) -> Result<Array2<f32>> {
    let file = File::open(path).map_err(ManifestError::Io)?;
    let mut reader = BufReader::new(file);

    let mut header = [0u8; 12];
    reader.read_exact(&mut header).map_err(ManifestError::Io)?;
    if &header[0..4] != MAGIC {
        return Err(bad(path, "bad magic").into());
    }
    let rows = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    drop(reader);

    read_features(path, 0, rows)
}
