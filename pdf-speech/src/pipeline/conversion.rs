//! Voice conversion of synthesized speech, window by window.

use super::{ItemOutcome, ItemReport, count_succeeded, failed_indices};
use crate::audio::Waveform;
use crate::tts::VoiceConverter;
use crate::workspace::{Scratch, Workspace};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the target voice sample comes from.
#[derive(Debug, Clone)]
pub enum ReferenceVoice {
    /// A WAV file already on disk
    Path(PathBuf),
    /// Raw WAV bytes (e.g. read from stdin)
    Upload(Vec<u8>),
}

/// Result of converting a whole recording.
#[derive(Debug)]
pub struct ConversionReport {
    /// One entry per window, in time order
    pub items: Vec<ItemReport>,
    pub output_path: PathBuf,
    pub duration_ms: u64,
}

impl ConversionReport {
    pub fn succeeded(&self) -> usize {
        count_succeeded(&self.items)
    }

    pub fn failed(&self) -> Vec<usize> {
        failed_indices(&self.items)
    }
}

/// Resolve the reference voice to a file path, writing uploads to the
/// workspace's canonical reference location.
pub fn persist_reference(reference: &ReferenceVoice, workspace: &Workspace) -> Result<PathBuf> {
    match reference {
        ReferenceVoice::Path(path) => {
            if !path.is_file() {
                anyhow::bail!("Voice sample not found: {}", path.display());
            }
            Ok(path.clone())
        }
        ReferenceVoice::Upload(bytes) => {
            if bytes.is_empty() {
                anyhow::bail!("Uploaded voice sample is empty");
            }
            let path = workspace.reference_voice_path();
            fs::write(&path, bytes)
                .with_context(|| format!("Failed to save voice sample to {}", path.display()))?;
            Ok(path)
        }
    }
}

/// Load `primary`, falling back once to `fallback` if it is unavailable.
///
/// Returns the loaded value and the name of the model that was used. A
/// fallback failure is returned as the error.
pub fn load_with_fallback<T, F>(primary: &str, fallback: &str, mut load: F) -> Result<(T, String)>
where
    F: FnMut(&str) -> Result<T>,
{
    match load(primary) {
        Ok(model) => Ok((model, primary.to_string())),
        Err(e) => {
            log::warn!("{} not available, falling back to {}: {:#}", primary, fallback, e);
            let model = load(fallback)
                .with_context(|| format!("Fallback model {} also failed to load", fallback))?;
            Ok((model, fallback.to_string()))
        }
    }
}

/// Split audio into fixed wall-clock windows: ⌈duration / window_ms⌉ of them.
pub fn split_windows(audio: &Waveform, window_ms: u64) -> Vec<Waveform> {
    audio.windows(window_ms)
}

/// Convert `source` to the voice of `reference`, writing the result to `output`.
///
/// The source is cut into `window_ms` windows that are converted one at a
/// time; windows that fail are logged and left out. The run fails only if no
/// window succeeds. `on_progress` receives `(done, total)` after each window.
pub async fn convert_voice<F>(
    converter: &dyn VoiceConverter,
    reference: &Path,
    source: &Path,
    scratch: &Scratch,
    output: &Path,
    window_ms: u64,
    mut on_progress: F,
) -> Result<ConversionReport>
where
    F: FnMut(usize, usize),
{
    let audio = Waveform::load(source)
        .with_context(|| format!("Failed to load speech {}", source.display()))?;
    let windows = split_windows(&audio, window_ms);
    if windows.is_empty() {
        anyhow::bail!("{} contains no audio", source.display());
    }

    let mut converted = Waveform::empty();
    let mut items = Vec::with_capacity(windows.len());

    for (index, window) in windows.iter().enumerate() {
        let (temp_in, temp_out) = scratch.window_paths(index);

        let result =
            convert_window(converter, window, reference, &temp_in, &temp_out, &mut converted).await;
        let outcome = match result {
            Ok(duration_ms) => ItemOutcome::Succeeded { duration_ms },
            Err(e) => {
                log::warn!("Skipping window {} due to error: {:#}", index, e);
                ItemOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        };
        scratch.remove(&temp_in);
        scratch.remove(&temp_out);

        items.push(ItemReport { index, outcome });
        on_progress(index + 1, windows.len());
    }

    if count_succeeded(&items) == 0 {
        anyhow::bail!("All {} windows failed to convert", windows.len());
    }

    converted
        .export_atomic(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(ConversionReport {
        items,
        output_path: output.to_path_buf(),
        duration_ms: converted.duration_ms(),
    })
}

async fn convert_window(
    converter: &dyn VoiceConverter,
    window: &Waveform,
    reference: &Path,
    temp_in: &Path,
    temp_out: &Path,
    converted: &mut Waveform,
) -> Result<u64> {
    window.export(temp_in)?;
    converter.convert(temp_in, reference, temp_out).await?;
    let segment = Waveform::load(temp_out)?;
    converted.append(&segment)?;
    Ok(segment.duration_ms())
}
