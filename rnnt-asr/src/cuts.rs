//! Cut sets: bounded audio segments with annotations and cached features.

use crate::audio::read_segment;
use crate::error::{ManifestError, Result};
use crate::features::Fbank;
use crate::manifest::{PartitionManifest, Recording, Supervision, write_jsonl};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Reference into a stored feature matrix.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub storage_path: PathBuf,
    pub first_frame: usize,
    pub num_frames: usize,
    pub num_features: usize,
    /// Frame shift in seconds, for time/frame arithmetic
    pub frame_shift: f64,
}

/// One bounded audio region, the unit of feature computation and storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cut {
    pub id: String,
    pub recording_id: String,
    /// Offset into the recording in seconds
    pub start: f64,
    pub duration: f64,
    pub channel: u16,
    pub supervisions: Vec<Supervision>,
    pub features: Option<FeatureDescriptor>,
}

/// Ordered set of cuts for one partition.
#[derive(Clone, Debug, Default)]
pub struct CutSet(pub Vec<Cut>);

impl CutSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One whole-recording cut per recording, carrying its supervisions.
    pub fn from_manifests(manifest: &PartitionManifest) -> Self {
        let cuts = manifest
            .recordings
            .iter()
            .map(|r| {
                let supervisions = manifest
                    .supervisions
                    .iter()
                    .filter(|s| s.recording_id == r.id)
                    .cloned()
                    .collect();
                Cut {
                    id: r.id.clone(),
                    recording_id: r.id.clone(),
                    start: 0.0,
                    duration: r.duration,
                    channel: r.channels.first().copied().unwrap_or(0),
                    supervisions,
                    features: None,
                }
            })
            .collect();
        CutSet(cuts)
    }

    /// Compute and persist features for every cut using a worker pool.
    ///
    /// Cuts are split into `num_jobs` contiguous slices processed by scoped
    /// threads; slice results are collected in order, so the output cut
    /// order equals the input order. The first failing segment aborts the
    /// whole partition.
    pub fn compute_and_store_features(
        &self,
        fbank: &Fbank,
        recordings: &[Recording],
        storage_dir: &Path,
        num_jobs: usize,
    ) -> Result<CutSet> {
        std::fs::create_dir_all(storage_dir).map_err(ManifestError::Io)?;

        let by_id: HashMap<&str, &Recording> =
            recordings.iter().map(|r| (r.id.as_str(), r)).collect();

        let num_jobs = num_jobs.max(1).min(self.0.len().max(1));
        let chunk_size = self.0.len().div_ceil(num_jobs);

        let results: Vec<Result<Vec<Cut>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .0
                .chunks(chunk_size.max(1))
                .map(|slice| {
                    let by_id = &by_id;
                    scope.spawn(move || {
                        slice
                            .iter()
                            .map(|cut| compute_one(cut, fbank, by_id, storage_dir))
                            .collect()
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut cuts = Vec::with_capacity(self.0.len());
        for slice in results {
            cuts.extend(slice?);
        }

        Ok(CutSet(cuts))
    }

    /// Trim cuts to their supervision boundaries.
    ///
    /// One cut per supervision, bounded to the annotated region. Dropped:
    /// supervisions on a different channel than the cut (overlapping-channel
    /// duplicates) and supervisions without a finite positive duration.
    /// Trimmed features reference the parent storage by frame range.
    pub fn trim_to_supervisions(&self) -> CutSet {
        let mut cuts = Vec::new();

        for cut in &self.0 {
            for sup in &cut.supervisions {
                if sup.channel != cut.channel {
                    continue;
                }
                let Some(duration) = sup.duration else {
                    continue;
                };
                if !duration.is_finite() || duration <= 0.0 {
                    continue;
                }

                let offset = (sup.start - cut.start).max(0.0);
                let duration = duration.min(cut.duration - offset);
                if duration <= 0.0 {
                    continue;
                }

                let features = cut.features.as_ref().map(|f| {
                    let first = f.first_frame + (offset / f.frame_shift).round() as usize;
                    let frames = (duration / f.frame_shift).round() as usize;
                    let available = (f.first_frame + f.num_frames).saturating_sub(first);
                    FeatureDescriptor {
                        storage_path: f.storage_path.clone(),
                        first_frame: first.min(f.first_frame + f.num_frames),
                        num_frames: frames.min(available),
                        num_features: f.num_features,
                        frame_shift: f.frame_shift,
                    }
                });

                let mut rebased = sup.clone();
                rebased.start = 0.0;

                cuts.push(Cut {
                    id: sup.id.clone(),
                    recording_id: cut.recording_id.clone(),
                    start: cut.start + offset,
                    duration,
                    channel: cut.channel,
                    supervisions: vec![rebased],
                    features,
                });
            }
        }

        CutSet(cuts)
    }

    /// Persist the cut descriptors as JSON Lines.
    ///
    /// This write is what marks a partition complete for future runs.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        write_jsonl(path, &self.0)
    }

    /// Load cut descriptors from a JSON Lines file.
    pub fn from_file(path: &Path) -> Result<CutSet> {
        let file = File::open(path).map_err(ManifestError::Io)?;
        let reader = BufReader::new(file);

        let mut cuts = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(ManifestError::Io)?;
            if line.trim().is_empty() {
                continue;
            }
            cuts.push(serde_json::from_str(&line)?);
        }
        Ok(CutSet(cuts))
    }
}

/// Compute and store one cut's features, returning the cut with its
/// feature descriptor attached.
fn compute_one(
    cut: &Cut,
    fbank: &Fbank,
    recordings: &HashMap<&str, &Recording>,
    storage_dir: &Path,
) -> Result<Cut> {
    let recording = recordings.get(cut.recording_id.as_str()).ok_or_else(|| {
        ManifestError::UnknownRecording {
            cut_id: cut.id.clone(),
            recording_id: cut.recording_id.clone(),
        }
    })?;

    let rate = recording.sampling_rate;
    let start_sample = (cut.start * rate as f64).round() as usize;
    let num_samples = ((cut.duration * rate as f64).round() as usize)
        .min(recording.num_samples.saturating_sub(start_sample));

    let waveform = read_segment(&recording.path, rate, cut.channel, start_sample, num_samples)?;
    let features = fbank.compute(&waveform);

    let storage_path = storage_dir.join(format!("{}.llf", cut.id));
    crate::storage::write_features(&storage_path, &features)?;

    tracing::debug!(cut = %cut.id, frames = features.nrows(), "stored features");

    let mut cut = cut.clone();
    cut.features = Some(FeatureDescriptor {
        storage_path,
        first_frame: 0,
        num_frames: features.nrows(),
        num_features: features.ncols(),
        frame_shift: fbank.config().frame_shift_secs(),
    });
    Ok(cut)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::tests::create_test_wav;
    use crate::features::FbankConfig;

    pub(crate) fn make_recording(dir: &Path, id: &str, secs: f64) -> Recording {
        let path = dir.join(format!("{id}.wav"));
        let num_samples = (secs * 16000.0) as usize;
        let samples: Vec<f32> = (0..num_samples)
            .map(|i| (i as f32 * 0.03).sin() * 0.4)
            .collect();
        create_test_wav(&path, 16000, 1, &samples).unwrap();

        Recording {
            id: id.to_string(),
            path,
            sampling_rate: 16000,
            num_samples,
            duration: secs,
            channels: vec![0],
        }
    }

    fn make_supervision(id: &str, recording_id: &str, start: f64, duration: Option<f64>) -> Supervision {
        Supervision {
            id: id.to_string(),
            recording_id: recording_id.to_string(),
            start,
            duration,
            channel: 0,
            text: format!("text {id}"),
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn builds_one_cut_per_recording() {
        let dir = temp_dir("rnnt_cuts_from_manifests");
        let manifest = PartitionManifest {
            recordings: vec![make_recording(&dir, "r1", 1.0), make_recording(&dir, "r2", 0.5)],
            supervisions: vec![
                make_supervision("s1", "r1", 0.0, Some(0.5)),
                make_supervision("s2", "r2", 0.0, Some(0.5)),
                make_supervision("s3", "r1", 0.5, Some(0.4)),
            ],
        };

        let cuts = CutSet::from_manifests(&manifest);

        assert_eq!(cuts.len(), 2);
        assert_eq!(cuts.0[0].id, "r1");
        assert_eq!(cuts.0[0].supervisions.len(), 2);
        assert_eq!(cuts.0[1].supervisions.len(), 1);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn computes_features_for_every_cut_in_order() {
        let dir = temp_dir("rnnt_cuts_compute");
        let storage = dir.join("feats");

        let manifest = PartitionManifest {
            recordings: vec![
                make_recording(&dir, "a", 0.6),
                make_recording(&dir, "b", 0.4),
                make_recording(&dir, "c", 0.5),
            ],
            supervisions: vec![],
        };

        let cuts = CutSet::from_manifests(&manifest);
        let fbank = Fbank::new(FbankConfig::default());
        let computed = cuts
            .compute_and_store_features(&fbank, &manifest.recordings, &storage, 2)
            .unwrap();

        assert_eq!(computed.len(), 3);
        let ids: Vec<_> = computed.0.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        for cut in &computed.0 {
            let desc = cut.features.as_ref().unwrap();
            assert!(desc.storage_path.is_file());
            assert_eq!(desc.num_features, 80);
            assert!(desc.num_frames > 0);
        }

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn failing_segment_aborts_the_partition() {
        let dir = temp_dir("rnnt_cuts_abort");
        let storage = dir.join("feats");

        let mut manifest = PartitionManifest {
            recordings: vec![make_recording(&dir, "ok", 0.5)],
            supervisions: vec![],
        };
        // A recording whose file does not exist
        manifest.recordings.push(Recording {
            id: "ghost".to_string(),
            path: dir.join("ghost.wav"),
            sampling_rate: 16000,
            num_samples: 8000,
            duration: 0.5,
            channels: vec![0],
        });

        let cuts = CutSet::from_manifests(&manifest);
        let fbank = Fbank::new(FbankConfig::default());
        let result = cuts.compute_and_store_features(&fbank, &manifest.recordings, &storage, 2);

        assert!(result.is_err());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn trims_to_supervision_boundaries() {
        let dir = temp_dir("rnnt_cuts_trim");
        let storage = dir.join("feats");

        let manifest = PartitionManifest {
            recordings: vec![make_recording(&dir, "r", 2.0)],
            supervisions: vec![
                make_supervision("keep1", "r", 0.2, Some(0.5)),
                make_supervision("keep2", "r", 1.0, Some(0.8)),
                // Unbounded duration is dropped
                make_supervision("unbounded", "r", 0.0, None),
                // Different channel is dropped
                Supervision {
                    channel: 1,
                    ..make_supervision("other_channel", "r", 0.5, Some(0.2))
                },
            ],
        };

        let fbank = Fbank::new(FbankConfig::default());
        let cuts = CutSet::from_manifests(&manifest)
            .compute_and_store_features(&fbank, &manifest.recordings, &storage, 1)
            .unwrap();

        let trimmed = cuts.trim_to_supervisions();

        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed.0[0].id, "keep1");
        assert!((trimmed.0[0].start - 0.2).abs() < 1e-9);
        assert!((trimmed.0[0].duration - 0.5).abs() < 1e-9);
        assert_eq!(trimmed.0[1].id, "keep2");

        // Each trimmed cut carries exactly its own supervision, rebased
        for cut in &trimmed.0 {
            assert_eq!(cut.supervisions.len(), 1);
            assert_eq!(cut.supervisions[0].start, 0.0);

            let desc = cut.features.as_ref().unwrap();
            let frames = crate::storage::read_features(
                &desc.storage_path,
                desc.first_frame,
                desc.num_frames,
            )
            .unwrap();
            assert_eq!(frames.nrows(), desc.num_frames);
        }

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn cut_set_round_trips_through_file() {
        let dir = temp_dir("rnnt_cuts_io");
        let path = dir.join("cuts.jsonl");

        let manifest = PartitionManifest {
            recordings: vec![make_recording(&dir, "r", 0.5)],
            supervisions: vec![make_supervision("s", "r", 0.0, Some(0.5))],
        };
        let cuts = CutSet::from_manifests(&manifest);

        cuts.to_file(&path).unwrap();
        let loaded = CutSet::from_file(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.0[0].id, "r");
        assert_eq!(loaded.0[0].supervisions.len(), 1);

        std::fs::remove_dir_all(dir).ok();
    }
}
