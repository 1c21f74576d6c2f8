//! Text-to-speech over a chunked document.

use super::{ItemOutcome, ItemReport, count_succeeded, failed_indices};
use crate::audio::Waveform;
use crate::text::TextChunk;
use crate::tts::SpeechSynthesizer;
use crate::workspace::Scratch;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Result of synthesizing a whole document.
#[derive(Debug)]
pub struct SynthesisReport {
    /// One entry per chunk, in chunk order
    pub items: Vec<ItemReport>,
    pub speaker: Option<String>,
    pub output_path: PathBuf,
    /// Concatenated audio of the chunks that succeeded
    pub waveform: Waveform,
    /// `waveform` encoded as WAV, for immediate playback
    pub wav_bytes: Vec<u8>,
}

impl SynthesisReport {
    pub fn succeeded(&self) -> usize {
        count_succeeded(&self.items)
    }

    pub fn failed(&self) -> Vec<usize> {
        failed_indices(&self.items)
    }
}

/// Pick the preferred speaker if the model offers it, otherwise the first one.
///
/// Returns `None` for single-speaker models.
pub fn select_speaker(available: &[String], preferred: Option<&str>) -> Option<String> {
    if let Some(preferred) = preferred {
        if available.iter().any(|s| s == preferred) {
            return Some(preferred.to_string());
        }
        log::warn!("Speaker {:?} not offered by the model; using the first speaker", preferred);
    }
    available.first().cloned()
}

/// Synthesize every chunk in order and write the concatenation to `output`.
///
/// A chunk that fails is logged and left out; the run fails only if no chunk
/// succeeds. `on_progress` receives `(done, total)` after each chunk.
pub async fn synthesize_document<F>(
    synth: &dyn SpeechSynthesizer,
    speaker: Option<&str>,
    chunks: &[TextChunk],
    scratch: &Scratch,
    output: &Path,
    mut on_progress: F,
) -> Result<SynthesisReport>
where
    F: FnMut(usize, usize),
{
    if chunks.is_empty() {
        anyhow::bail!("Nothing to synthesize: no text chunks");
    }

    let mut waveform = Waveform::empty();
    let mut items = Vec::with_capacity(chunks.len());

    for (done, chunk) in chunks.iter().enumerate() {
        let temp_file = scratch.chunk_path(chunk.index);

        let outcome = match render_chunk(synth, speaker, chunk, &temp_file, &mut waveform).await {
            Ok(duration_ms) => ItemOutcome::Succeeded { duration_ms },
            Err(e) => {
                log::warn!("Skipping chunk {} due to error: {:#}", chunk.index, e);
                ItemOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        };
        scratch.remove(&temp_file);

        items.push(ItemReport {
            index: chunk.index,
            outcome,
        });
        on_progress(done + 1, chunks.len());
    }

    if count_succeeded(&items) == 0 {
        anyhow::bail!("All {} chunks failed to synthesize", chunks.len());
    }

    waveform
        .export_atomic(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    let wav_bytes = waveform.to_wav_bytes()?;

    Ok(SynthesisReport {
        items,
        speaker: speaker.map(str::to_string),
        output_path: output.to_path_buf(),
        waveform,
        wav_bytes,
    })
}

async fn render_chunk(
    synth: &dyn SpeechSynthesizer,
    speaker: Option<&str>,
    chunk: &TextChunk,
    temp_file: &Path,
    waveform: &mut Waveform,
) -> Result<u64> {
    synth.synthesize(&chunk.text, speaker, temp_file).await?;
    let segment = Waveform::load(temp_file)?;
    if segment.is_empty() {
        anyhow::bail!("Model produced no audio");
    }
    waveform.append(&segment)?;
    Ok(segment.duration_ms())
}
