//! Waveform loading and validation.

use crate::error::{AudioError, Result};
use hound::{SampleFormat, WavReader, WavSpec};
use std::path::Path;

/// Expected sample rate for the acoustic model (16kHz).
pub const SAMPLE_RATE: u32 = 16000;

/// Load all samples from a WAV file, interleaved as stored.
///
/// Supports 16-bit integer and 32-bit float PCM.
fn load_samples<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<hound::Result<_>>()?,
        SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
            .collect::<hound::Result<_>>()?,
    };

    Ok((samples, spec))
}

/// Read one sound file into a 1-D f32 waveform.
///
/// The file's native sample rate must equal `expected_rate`; a mismatch is
/// fatal for the whole batch because feature extraction assumes a uniform
/// rate. Multi-channel audio keeps the first channel only.
pub fn read_waveform(path: impl AsRef<Path>, expected_rate: u32) -> Result<Vec<f32>> {
    let path = path.as_ref();
    let (samples, spec) = load_samples(path)?;

    if spec.sample_rate != expected_rate {
        return Err(AudioError::SampleRateMismatch {
            path: path.to_path_buf(),
            expected: expected_rate,
            got: spec.sample_rate,
        }
        .into());
    }

    if spec.channels == 0 {
        return Err(AudioError::NoChannels(path.to_path_buf()).into());
    }

    let channels = spec.channels as usize;
    if channels == 1 {
        return Ok(samples);
    }

    Ok(samples.iter().step_by(channels).copied().collect())
}

/// Read a list of sound files in input order.
///
/// The first failing file aborts the whole batch.
pub fn read_waveforms<P: AsRef<Path>>(paths: &[P], expected_rate: u32) -> Result<Vec<Vec<f32>>> {
    paths
        .iter()
        .map(|p| read_waveform(p, expected_rate))
        .collect()
}

/// Read a bounded sample range of one channel from a WAV file.
///
/// Used by the caching pipeline to load exactly the region a cut covers.
pub fn read_segment(
    path: impl AsRef<Path>,
    expected_rate: u32,
    channel: u16,
    start: usize,
    num_samples: usize,
) -> Result<Vec<f32>> {
    let path = path.as_ref();
    let (samples, spec) = load_samples(path)?;

    if spec.sample_rate != expected_rate {
        return Err(AudioError::SampleRateMismatch {
            path: path.to_path_buf(),
            expected: expected_rate,
            got: spec.sample_rate,
        }
        .into());
    }

    let channels = spec.channels as usize;
    if channels == 0 || channel as usize >= channels {
        return Err(AudioError::NoChannels(path.to_path_buf()).into());
    }

    let frames = samples.len() / channels;
    let end = start + num_samples;
    if end > frames {
        return Err(AudioError::SegmentOutOfRange {
            path: path.to_path_buf(),
            start,
            end,
            len: frames,
        }
        .into());
    }

    Ok((start..end)
        .map(|i| samples[i * channels + channel as usize])
        .collect())
}
