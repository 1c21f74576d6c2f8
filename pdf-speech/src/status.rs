//! Artifact status records.
//!
//! Each generated artifact has a JSON sidecar `<artifact>.status.json`
//! recording whether it is absent, being generated, or complete. A record
//! left `in_progress` means a previous run died before finishing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    Absent,
    InProgress,
    Complete,
}

impl ArtifactState {
    /// Whether moving from `self` to `to` is allowed.
    ///
    /// `in_progress -> in_progress` restarts a run that was interrupted.
    pub fn can_transition(self, to: ArtifactState) -> bool {
        use ArtifactState::*;
        matches!(
            (self, to),
            (Absent, InProgress)
                | (InProgress, InProgress)
                | (InProgress, Complete)
                | (InProgress, Absent)
                | (Complete, InProgress)
        )
    }
}

impl std::fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ArtifactState::Absent => "absent",
            ArtifactState::InProgress => "in progress",
            ArtifactState::Complete => "complete",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Cannot move artifact from {from} to {to}")]
    IllegalTransition {
        from: ArtifactState,
        to: ArtifactState,
    },

    #[error("Status record error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatusError>;

/// Persisted status of one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub state: ArtifactState,
    /// Run that last started generating this artifact
    pub run_id: Option<String>,
    /// Hash of the input the artifact was generated from
    pub source_hash: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StatusRecord {
    fn with_state(state: ArtifactState) -> Self {
        Self {
            state,
            run_id: None,
            source_hash: None,
            started_at: None,
            completed_at: None,
        }
    }
}

/// Tracks and persists the state of a single artifact file.
#[derive(Debug)]
pub struct ArtifactTracker {
    artifact: PathBuf,
    record_path: PathBuf,
    record: StatusRecord,
}

impl ArtifactTracker {
    /// Load the status of `artifact`, reconciling the record with the filesystem.
    pub fn load(artifact: &Path) -> Result<Self> {
        let record_path = record_path_for(artifact);

        let record = if record_path.exists() {
            let file = File::open(&record_path)?;
            let mut record: StatusRecord = serde_json::from_reader(BufReader::new(file))?;
            match record.state {
                ArtifactState::Complete if !artifact.exists() => {
                    log::warn!("{} is recorded complete but missing", artifact.display());
                    record = StatusRecord::with_state(ArtifactState::Absent);
                }
                // Final writes are renamed into place, so a file on disk is whole
                ArtifactState::Absent if artifact.exists() => {
                    record.state = ArtifactState::Complete;
                }
                _ => {}
            }
            record
        } else if artifact.exists() {
            // Produced before status records existed
            StatusRecord::with_state(ArtifactState::Complete)
        } else {
            StatusRecord::with_state(ArtifactState::Absent)
        };

        Ok(Self {
            artifact: artifact.to_path_buf(),
            record_path,
            record,
        })
    }

    pub fn state(&self) -> ArtifactState {
        self.record.state
    }

    pub fn record(&self) -> &StatusRecord {
        &self.record
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Mark generation started.
    pub fn begin(&mut self, run_id: &str, source_hash: Option<String>) -> Result<()> {
        self.transition(ArtifactState::InProgress)?;
        self.record.run_id = Some(run_id.to_string());
        self.record.source_hash = source_hash;
        self.record.started_at = Some(Utc::now());
        self.record.completed_at = None;
        self.save()
    }

    /// Mark generation finished; the artifact file must exist.
    pub fn complete(&mut self) -> Result<()> {
        self.transition(ArtifactState::Complete)?;
        self.record.completed_at = Some(Utc::now());
        self.save()
    }

    /// Mark generation failed. An artifact still on disk is one written by an
    /// earlier successful run, so it stays complete.
    pub fn abort(&mut self) -> Result<()> {
        let target = if self.artifact.exists() {
            ArtifactState::Complete
        } else {
            ArtifactState::Absent
        };
        self.transition(target)?;
        if target == ArtifactState::Absent {
            self.record.completed_at = None;
        }
        self.save()
    }

    fn transition(&mut self, to: ArtifactState) -> Result<()> {
        let from = self.record.state;
        if !from.can_transition(to) {
            return Err(StatusError::IllegalTransition { from, to });
        }
        log::debug!("{}: {} -> {}", self.artifact.display(), from, to);
        self.record.state = to;
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.record)?;
        fs::write(&self.record_path, json)?;
        Ok(())
    }
}

fn record_path_for(artifact: &Path) -> PathBuf {
    let mut name = artifact.file_name().unwrap_or_default().to_os_string();
    name.push(".status.json");
    artifact.with_file_name(name)
}

/// Compute a hash of a source file to detect a changed input.
///
/// Uses SHA256 of the first 1MB for speed with large files.
pub fn compute_source_hash(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file).take(1024 * 1024);

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    let mut hasher = Sha256::new();
    hasher.update(&buffer);
    let result = hasher.finalize();

    Ok(format!("{:x}", result)[..16].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_transition_table() {
        use ArtifactState::*;
        assert!(Absent.can_transition(InProgress));
        assert!(InProgress.can_transition(Complete));
        assert!(InProgress.can_transition(Absent));
        assert!(InProgress.can_transition(InProgress));
        assert!(Complete.can_transition(InProgress));

        assert!(!Absent.can_transition(Complete));
        assert!(!Complete.can_transition(Absent));
        assert!(!Absent.can_transition(Absent));
        assert!(!Complete.can_transition(Complete));
    }

    #[test]
    fn test_fresh_artifact_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = ArtifactTracker::load(&temp_dir.path().join("book.wav")).unwrap();
        assert_eq!(tracker.state(), ArtifactState::Absent);
    }

    #[test]
    fn test_legacy_artifact_is_complete() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("book.wav");
        fs::write(&artifact, b"RIFF").unwrap();
        let tracker = ArtifactTracker::load(&artifact).unwrap();
        assert_eq!(tracker.state(), ArtifactState::Complete);
    }

    #[test]
    fn test_generation_lifecycle_persists() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("book.wav");

        let mut tracker = ArtifactTracker::load(&artifact).unwrap();
        tracker.begin("run1", Some("abc".to_string())).unwrap();
        assert_eq!(
            ArtifactTracker::load(&artifact).unwrap().state(),
            ArtifactState::InProgress
        );

        fs::write(&artifact, b"RIFF").unwrap();
        tracker.complete().unwrap();

        let reloaded = ArtifactTracker::load(&artifact).unwrap();
        assert_eq!(reloaded.state(), ArtifactState::Complete);
        assert_eq!(reloaded.record().run_id.as_deref(), Some("run1"));
        assert_eq!(reloaded.record().source_hash.as_deref(), Some("abc"));
        assert!(reloaded.record().completed_at.is_some());
        assert!(temp_dir.path().join("book.wav.status.json").exists());
    }

    #[test]
    fn test_interrupted_run_is_in_progress() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("book.wav");
        ArtifactTracker::load(&artifact).unwrap().begin("crashed", None).unwrap();

        // A later run may restart it
        let mut tracker = ArtifactTracker::load(&artifact).unwrap();
        assert_eq!(tracker.state(), ArtifactState::InProgress);
        tracker.begin("retry", None).unwrap();
        assert_eq!(tracker.record().run_id.as_deref(), Some("retry"));
    }

    #[test]
    fn test_abort_first_generation_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("book.wav");
        let mut tracker = ArtifactTracker::load(&artifact).unwrap();
        tracker.begin("run1", None).unwrap();
        tracker.abort().unwrap();
        assert_eq!(tracker.state(), ArtifactState::Absent);
    }

    #[test]
    fn test_abort_regeneration_keeps_previous() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("book.wav");
        fs::write(&artifact, b"RIFF").unwrap();

        let mut tracker = ArtifactTracker::load(&artifact).unwrap();
        tracker.begin("regen", None).unwrap();
        tracker.abort().unwrap();
        assert_eq!(
            ArtifactTracker::load(&artifact).unwrap().state(),
            ArtifactState::Complete
        );
    }

    #[test]
    fn test_failed_retry_after_crash_keeps_existing_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("book.wav");
        fs::write(&artifact, b"RIFF").unwrap();

        ArtifactTracker::load(&artifact).unwrap().begin("crashed", None).unwrap();

        let mut tracker = ArtifactTracker::load(&artifact).unwrap();
        assert_eq!(tracker.state(), ArtifactState::InProgress);
        tracker.begin("retry", None).unwrap();
        tracker.abort().unwrap();

        assert_eq!(
            ArtifactTracker::load(&artifact).unwrap().state(),
            ArtifactState::Complete
        );
    }

    #[test]
    fn test_absent_record_with_file_is_complete() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("book.wav");
        let mut tracker = ArtifactTracker::load(&artifact).unwrap();
        tracker.begin("run1", None).unwrap();
        tracker.abort().unwrap();
        assert_eq!(tracker.state(), ArtifactState::Absent);

        fs::write(&artifact, b"RIFF").unwrap();
        assert_eq!(
            ArtifactTracker::load(&artifact).unwrap().state(),
            ArtifactState::Complete
        );
    }

    #[test]
    fn test_complete_record_without_file_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("book.wav");
        fs::write(&artifact, b"RIFF").unwrap();
        let mut tracker = ArtifactTracker::load(&artifact).unwrap();
        tracker.begin("run1", None).unwrap();
        tracker.complete().unwrap();
        fs::remove_file(&artifact).unwrap();

        assert_eq!(
            ArtifactTracker::load(&artifact).unwrap().state(),
            ArtifactState::Absent
        );
    }

    #[test]
    fn test_complete_from_absent_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = ArtifactTracker::load(&temp_dir.path().join("x.wav")).unwrap();
        let err = tracker.complete().unwrap_err();
        assert!(matches!(err, StatusError::IllegalTransition { .. }));
    }

    #[test]
    fn test_compute_source_hash() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("book.pdf");
        fs::write(&path, b"consistent content").unwrap();

        let hash1 = compute_source_hash(&path).unwrap();
        let hash2 = compute_source_hash(&path).unwrap();
        assert_eq!(hash1.len(), 16);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash1, hash2);
    }
}
