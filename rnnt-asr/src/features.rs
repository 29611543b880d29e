//! Log-mel filterbank feature extraction.

use ndarray::Array2;
use std::f32::consts::PI;

/// Floor applied before the log so padding and silence share a fixed scale.
pub const ENERGY_FLOOR: f32 = 1e-10;

/// Filterbank extractor configuration.
///
/// Frame count is a deterministic function of the sample count and this
/// config, which the batching and cut-trimming code relies on.
#[derive(Clone, Debug)]
pub struct FbankConfig {
    /// Number of mel bins
    pub num_bins: usize,
    /// Analysis window length in samples
    pub frame_length: usize,
    /// Hop between successive frames in samples
    pub frame_shift: usize,
    /// FFT size (>= frame_length)
    pub n_fft: usize,
    /// Preemphasis coefficient
    pub preemphasis: f32,
    /// Input sample rate in Hz
    pub sample_rate: u32,
}

impl Default for FbankConfig {
    fn default() -> Self {
        // 25ms window / 10ms hop at 16kHz, 80 mel bins
        Self {
            num_bins: 80,
            frame_length: 400,
            frame_shift: 160,
            n_fft: 512,
            preemphasis: 0.97,
            sample_rate: crate::audio::SAMPLE_RATE,
        }
    }
}

impl FbankConfig {
    /// Number of frames produced for `num_samples` input samples.
    pub fn num_frames(&self, num_samples: usize) -> usize {
        if num_samples < self.frame_length {
            0
        } else {
            (num_samples - self.frame_length) / self.frame_shift + 1
        }
    }

    /// Frame shift in seconds.
    pub fn frame_shift_secs(&self) -> f64 {
        self.frame_shift as f64 / self.sample_rate as f64
    }
}

/// Log-mel filterbank extractor.
///
/// The mel filterbank is built once at construction and reused across
/// utterances, so one extractor can be shared by a batch or a worker.
#[derive(Clone, Debug)]
pub struct Fbank {
    config: FbankConfig,
    filterbank: Array2<f32>,
    window: Vec<f32>,
}

impl Fbank {
    pub fn new(config: FbankConfig) -> Self {
        let filterbank = mel_filterbank(config.n_fft, config.num_bins, config.sample_rate);
        let window = hann_window(config.frame_length);
        Self {
            config,
            filterbank,
            window,
        }
    }

    pub fn config(&self) -> &FbankConfig {
        &self.config
    }

    /// Compute log-mel features for one waveform.
    ///
    /// Returns a (frames, num_bins) matrix. An utterance shorter than one
    /// analysis window yields zero frames.
    pub fn compute(&self, waveform: &[f32]) -> Array2<f32> {
        let num_frames = self.config.num_frames(waveform.len());
        if num_frames == 0 {
            return Array2::zeros((0, self.config.num_bins));
        }

        let emphasized = preemphasis(waveform, self.config.preemphasis);
        let spectrogram = self.power_spectrogram(&emphasized, num_frames);

        let mel = self.filterbank.dot(&spectrogram);
        let log_mel = mel.mapv(|x| x.max(ENERGY_FLOOR).ln());
        log_mel.t().to_owned()
    }

    /// Power spectrogram of shape (freq_bins, num_frames).
    fn power_spectrogram(&self, audio: &[f32], num_frames: usize) -> Array2<f32> {
        use rustfft::{FftPlanner, num_complex::Complex};

        let n_fft = self.config.n_fft;
        let hop = self.config.frame_shift;
        let win = self.config.frame_length;
        let freq_bins = n_fft / 2 + 1;

        let mut spectrogram = Array2::<f32>::zeros((freq_bins, num_frames));

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);

        for frame_idx in 0..num_frames {
            let start = frame_idx * hop;

            let mut frame: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); n_fft];
            for i in 0..win.min(audio.len() - start) {
                frame[i] = Complex::new(audio[start + i] * self.window[i], 0.0);
            }

            fft.process(&mut frame);

            for k in 0..freq_bins {
                let magnitude = frame[k].norm();
                spectrogram[[k, frame_idx]] = magnitude * magnitude;
            }
        }

        spectrogram
    }
}

/// `y[i] = x[i] - coef * x[i-1]`
fn preemphasis(audio: &[f32], coef: f32) -> Vec<f32> {
    let mut result = Vec::with_capacity(audio.len());
    result.push(audio[0]);
    for i in 1..audio.len() {
        result.push(audio[i] - coef * audio[i - 1]);
    }
    result
}

fn hann_window(window_length: usize) -> Vec<f32> {
    (0..window_length)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (window_length as f32 - 1.0)).cos())
        .collect()
}

fn hz_to_mel(freq: f32) -> f32 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank of shape (num_bins, n_fft / 2 + 1).
fn mel_filterbank(n_fft: usize, num_bins: usize, sample_rate: u32) -> Array2<f32> {
    let freq_bins = n_fft / 2 + 1;
    let mut filterbank = Array2::<f32>::zeros((num_bins, freq_bins));

    let min_mel = hz_to_mel(0.0);
    let max_mel = hz_to_mel(sample_rate as f32 / 2.0);

    let mel_points: Vec<f32> = (0..=num_bins + 1)
        .map(|i| mel_to_hz(min_mel + (max_mel - min_mel) * i as f32 / (num_bins + 1) as f32))
        .collect();

    let freq_bin_width = sample_rate as f32 / n_fft as f32;

    for mel_idx in 0..num_bins {
        let left = mel_points[mel_idx];
        let center = mel_points[mel_idx + 1];
        let right = mel_points[mel_idx + 2];

        for freq_idx in 0..freq_bins {
            let freq = freq_idx as f32 * freq_bin_width;

            if freq >= left && freq <= center {
                filterbank[[mel_idx, freq_idx]] = (freq - left) / (center - left);
            } else if freq > center && freq <= right {
                filterbank[[mel_idx, freq_idx]] = (right - freq) / (right - center);
            }
        }
    }

    filterbank
}
