//! In-memory PCM waveform with pydub-style append/slice/export operations.

use super::wav::{read_wav, write_wav};
use super::{AudioError, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

/// Interleaved PCM samples normalized to [-1, 1].
///
/// A waveform created with [`Waveform::empty`] has no format yet and adopts
/// the format of the first waveform appended to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl Waveform {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels,
            samples,
        }
    }

    /// A waveform with no format and no samples.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a WAV file.
    pub fn load(path: &Path) -> Result<Self> {
        read_wav(path)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn has_format(&self) -> bool {
        self.sample_rate > 0 && self.channels > 0
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames() as u64 * 1000 / self.sample_rate as u64
    }

    /// Append `other` to the end of this waveform.
    pub fn append(&mut self, other: &Waveform) -> Result<()> {
        if !other.has_format() {
            return Ok(());
        }

        if !self.has_format() {
            self.sample_rate = other.sample_rate;
            self.channels = other.channels;
        } else if self.sample_rate != other.sample_rate || self.channels != other.channels {
            return Err(AudioError::FormatMismatch {
                expected_rate: self.sample_rate,
                expected_channels: self.channels,
                found_rate: other.sample_rate,
                found_channels: other.channels,
            });
        }

        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Copy of the audio between `start_ms` and `end_ms`, clamped to the waveform.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> Waveform {
        let start = self.frame_at(start_ms);
        let end = self.frame_at(end_ms).max(start);
        self.slice_frames(start, end)
    }

    /// Split into consecutive windows of `window_ms`; the last one may be shorter.
    pub fn windows(&self, window_ms: u64) -> Vec<Waveform> {
        if !self.has_format() {
            return Vec::new();
        }
        let window_ms = window_ms.max(1);

        let mut windows = Vec::new();
        let mut start_ms: u64 = 0;
        while self.frame_at(start_ms) < self.frames() {
            let end_ms = start_ms.saturating_add(window_ms);
            windows.push(self.slice_ms(start_ms, end_ms));
            start_ms = end_ms;
        }
        windows
    }

    fn frame_at(&self, ms: u64) -> usize {
        let frame = ms.saturating_mul(self.sample_rate as u64) / 1000;
        usize::try_from(frame).unwrap_or(usize::MAX).min(self.frames())
    }

    fn slice_frames(&self, start: usize, end: usize) -> Waveform {
        let channels = self.channels as usize;
        Waveform {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: self.samples[start * channels..end * channels].to_vec(),
        }
    }

    /// Write as a WAV file, replacing any existing file.
    pub fn export(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        write_wav(self, BufWriter::new(file))
    }

    /// Write to `<path>.part` and rename into place, so `path` is never half-written.
    pub fn export_atomic(&self, path: &Path) -> Result<()> {
        let partial = partial_path(path);
        if let Err(e) = self.export(&partial) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, path)?;
        Ok(())
    }

    /// Encode as an in-memory WAV file.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        write_wav(self, &mut cursor)?;
        Ok(cursor.into_inner())
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
