//! Working directory layout and per-run scratch space.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File name of a reference voice persisted from an upload.
const REFERENCE_VOICE_FILE: &str = "user_voice_sample.wav";

/// Output paths for one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// Synthesized speech: `<stem>.wav`
    pub speech: PathBuf,
    /// Voice-converted speech: `<stem>_converted.wav`
    pub converted: PathBuf,
}

/// Directory holding staged PDFs, generated audio and run scratch space.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open (creating if needed) a workspace rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create output directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy a source PDF into the workspace unless it already lives there.
    pub fn stage_source(&self, pdf: &Path) -> Result<PathBuf> {
        let name = pdf
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Not a file path: {}", pdf.display()))?;
        let staged = self.root.join(name);

        let same_file = match (fs::canonicalize(pdf), fs::canonicalize(&staged)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same_file {
            fs::copy(pdf, &staged)
                .with_context(|| format!("Failed to copy {} into workspace", pdf.display()))?;
        }

        Ok(staged)
    }

    /// Artifact paths derived from the PDF's base name.
    pub fn artifacts(&self, pdf: &Path) -> Artifacts {
        let stem = pdf.file_stem().unwrap_or_default().to_string_lossy();
        Artifacts {
            speech: self.root.join(format!("{}.wav", stem)),
            converted: self.root.join(format!("{}_converted.wav", stem)),
        }
    }

    /// Canonical location for an uploaded reference voice.
    pub fn reference_voice_path(&self) -> PathBuf {
        self.root.join(REFERENCE_VOICE_FILE)
    }

    /// Create a scratch directory unique to this run.
    pub fn begin_run(&self) -> Result<Scratch> {
        let run_id = new_run_id();
        let dir = tempfile::Builder::new()
            .prefix(&format!(".scratch-{}-", run_id))
            .tempdir_in(&self.root)
            .context("Failed to create scratch directory")?;
        log::debug!("Run {} scratch: {}", run_id, dir.path().display());
        Ok(Scratch { run_id, dir })
    }
}

/// Identifier for a single generation run.
pub fn new_run_id() -> String {
    format!(
        "{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        std::process::id()
    )
}

/// Scratch space for one run's temporary audio; removed when dropped.
#[derive(Debug)]
pub struct Scratch {
    run_id: String,
    dir: TempDir,
}

impl Scratch {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Temporary file for a synthesized chunk.
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("chunk_{:04}.wav", index))
    }

    /// Temporary (input, output) files for a conversion window.
    pub fn window_paths(&self, index: usize) -> (PathBuf, PathBuf) {
        (
            self.dir.path().join(format!("window_{:04}_in.wav", index)),
            self.dir.path().join(format!("window_{:04}_out.wav", index)),
        )
    }

    /// Delete a scratch file if it exists.
    pub fn remove(&self, path: &Path) {
        if path.exists() {
            if let Err(e) = fs::remove_file(path) {
                log::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("outputs");
        let workspace = Workspace::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(workspace.root(), root.as_path());
    }

    #[test]
    fn test_artifact_paths() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = Workspace::open(temp_dir.path()).unwrap();
        let artifacts = workspace.artifacts(Path::new("/books/My Book.pdf"));
        assert_eq!(artifacts.speech, temp_dir.path().join("My Book.wav"));
        assert_eq!(
            artifacts.converted,
            temp_dir.path().join("My Book_converted.wav")
        );
        assert_eq!(
            workspace.reference_voice_path(),
            temp_dir.path().join("user_voice_sample.wav")
        );
    }

    #[test]
    fn test_stage_source_copies_once() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("book.pdf");
        fs::write(&source, b"%PDF-1.5").unwrap();

        let workspace = Workspace::open(temp_dir.path().join("out")).unwrap();
        let staged = workspace.stage_source(&source).unwrap();
        assert_eq!(staged, temp_dir.path().join("out").join("book.pdf"));
        assert_eq!(fs::read(&staged).unwrap(), b"%PDF-1.5");

        // Staging the staged copy is a no-op
        let again = workspace.stage_source(&staged).unwrap();
        assert_eq!(again, staged);
    }

    #[test]
    fn test_runs_get_distinct_scratch_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = Workspace::open(temp_dir.path()).unwrap();
        let a = workspace.begin_run().unwrap();
        let b = workspace.begin_run().unwrap();
        assert_ne!(a.path(), b.path());
        assert_ne!(a.chunk_path(0), b.chunk_path(0));
        assert!(a.path().starts_with(temp_dir.path()));
    }

    #[test]
    fn test_scratch_removed_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = Workspace::open(temp_dir.path()).unwrap();
        let scratch = workspace.begin_run().unwrap();
        let dir = scratch.path().to_path_buf();
        fs::write(scratch.chunk_path(3), b"data").unwrap();
        drop(scratch);
        assert!(!dir.exists());
    }

    #[test]
    fn test_remove_is_existence_guarded() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = Workspace::open(temp_dir.path()).unwrap();
        let scratch = workspace.begin_run().unwrap();
        let (input, output) = scratch.window_paths(7);
        fs::write(&input, b"x").unwrap();
        scratch.remove(&input);
        scratch.remove(&output);
        assert!(!input.exists());
        assert!(input.to_string_lossy().ends_with("window_0007_in.wav"));
    }
}
