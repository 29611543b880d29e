//! Corpus manifests: recording and supervision descriptors per partition.
//!
//! Manifests are JSON Lines files named
//! `<prefix>_recordings_<partition>.<suffix>` and
//! `<prefix>_supervisions_<partition>.<suffix>` in the manifest directory.

use crate::error::{ManifestError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One recorded audio file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub path: PathBuf,
    pub sampling_rate: u32,
    pub num_samples: usize,
    pub duration: f64,
    #[serde(default = "default_channels")]
    pub channels: Vec<u16>,
}

fn default_channels() -> Vec<u16> {
    vec![0]
}

/// One annotated region within a recording.
///
/// `duration` is `None` for unbounded supervisions, which the trimming
/// stage drops.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Supervision {
    pub id: String,
    pub recording_id: String,
    pub start: f64,
    pub duration: Option<f64>,
    #[serde(default)]
    pub channel: u16,
    pub text: String,
}

/// Recording and supervision manifests of one partition.
#[derive(Clone, Debug, Default)]
pub struct PartitionManifest {
    pub recordings: Vec<Recording>,
    pub supervisions: Vec<Supervision>,
}

/// `<prefix>_<kind>_<partition>.<suffix>` inside `dir`.
pub fn manifest_path(dir: &Path, prefix: &str, kind: &str, partition: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{prefix}_{kind}_{partition}.{suffix}"))
}

fn read_jsonl<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(ManifestError::Io)?;
    let reader = BufReader::new(file);

    let mut items = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(ManifestError::Io)?;
        if line.trim().is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line)?);
    }
    Ok(items)
}

/// Load the manifests of every declared partition.
///
/// A missing manifest file for any declared partition is fatal.
pub fn read_manifests(
    dir: &Path,
    prefix: &str,
    suffix: &str,
    partitions: &[&str],
) -> Result<Vec<(String, PartitionManifest)>> {
    let mut manifests = Vec::with_capacity(partitions.len());

    for &partition in partitions {
        let recordings_path = manifest_path(dir, prefix, "recordings", partition, suffix);
        let supervisions_path = manifest_path(dir, prefix, "supervisions", partition, suffix);

        for path in [&recordings_path, &supervisions_path] {
            if !path.is_file() {
                return Err(ManifestError::Missing {
                    partition: partition.to_string(),
                    path: path.clone(),
                }
                .into());
            }
        }

        let recordings = read_jsonl(&recordings_path)?;
        let supervisions = read_jsonl(&supervisions_path)?;

        manifests.push((
            partition.to_string(),
            PartitionManifest {
                recordings,
                supervisions,
            },
        ));
    }

    Ok(manifests)
}

/// Serialize items to a JSON Lines file.
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    use std::io::Write;

    let mut file = File::create(path).map_err(ManifestError::Io)?;
    for item in items {
        let line = serde_json::to_string(item)?;
        writeln!(file, "{line}").map_err(ManifestError::Io)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recording(id: &str) -> Recording {
        Recording {
            id: id.to_string(),
            path: PathBuf::from(format!("{id}.wav")),
            sampling_rate: 16000,
            num_samples: 16000,
            duration: 1.0,
            channels: vec![0],
        }
    }

    #[test]
    fn manifest_paths_follow_naming_pattern() {
        let path = manifest_path(Path::new("data"), "corpus", "recordings", "train", "jsonl");
        assert_eq!(
            path,
            Path::new("data").join("corpus_recordings_train.jsonl")
        );
    }

    #[test]
    fn round_trips_jsonl() {
        let dir = std::env::temp_dir().join("rnnt_manifest_roundtrip");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("recordings.jsonl");

        let recordings = vec![sample_recording("a"), sample_recording("b")];
        write_jsonl(&path, &recordings).unwrap();

        let loaded: Vec<Recording> = read_jsonl(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a");
        assert_eq!(loaded[1].id, "b");

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_partition_manifest_is_fatal() {
        let dir = std::env::temp_dir().join("rnnt_manifest_missing");
        std::fs::create_dir_all(&dir).unwrap();

        let result = read_manifests(&dir, "corpus", "jsonl", &["train"]);

        assert!(matches!(
            result,
            Err(crate::error::Error::Manifest(ManifestError::Missing { .. }))
        ));

        std::fs::remove_dir_all(dir).ok();
    }
}
