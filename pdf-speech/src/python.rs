//! Embedded Python runtime setup for the Coqui TTS models.

use anyhow::{Context, Result};
use pyo3::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Once;

/// Initialize Python runtime once.
static PYTHON_INIT: Once = Once::new();

/// Python executable inside a venv, or the system `python3`.
pub fn python_executable(venv: Option<&Path>) -> PathBuf {
    match venv {
        Some(dir) => dir.join("bin").join("python"),
        None => PathBuf::from("python3"),
    }
}

/// Find `lib/python3.*/site-packages` inside a venv.
pub fn find_site_packages(venv: &Path) -> Option<PathBuf> {
    let lib = venv.join("lib");
    let mut candidates: Vec<PathBuf> = fs::read_dir(&lib)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("python3"))
        .map(|entry| entry.path().join("site-packages"))
        .filter(|path| path.is_dir())
        .collect();

    candidates.sort();
    candidates.into_iter().next()
}

/// Check that Coqui TTS can be imported by the interpreter we will embed.
pub fn check_coqui(venv: Option<&Path>) -> Result<()> {
    let python = python_executable(venv);
    let output = Command::new(&python)
        .args(["-c", "import TTS.api; print('ok')"])
        .output()
        .with_context(|| format!("Failed to run {}", python.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "Coqui TTS is not importable by {}.\n\
             Install it with `pip install TTS` (or point `venv` in the config at an environment that has it).\n{}",
            python.display(),
            stderr.trim()
        );
    }

    Ok(())
}

/// Prepare the embedded interpreter, adding the venv's site-packages to `sys.path`.
pub fn ensure_initialized(venv: Option<&Path>) {
    PYTHON_INIT.call_once(|| {
        let site_packages = venv.and_then(find_site_packages);

        pyo3::prepare_freethreaded_python();

        if let Some(site_packages) = site_packages {
            let result = Python::with_gil(|py| -> PyResult<()> {
                let sys = py.import("sys")?;
                let path = sys.getattr("path")?;
                path.call_method1("insert", (0, site_packages.to_string_lossy().into_owned()))?;
                Ok(())
            });
            match result {
                Ok(()) => log::debug!("Added {} to sys.path", site_packages.display()),
                Err(e) => {
                    log::warn!("Could not add {} to sys.path: {}", site_packages.display(), e)
                }
            }
        } else if let Some(venv) = venv {
            log::warn!("No site-packages found under {}", venv.display());
        }
    });
}
