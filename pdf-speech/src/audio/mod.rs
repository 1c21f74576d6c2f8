//! In-memory waveforms and WAV file I/O.

mod wav;
pub mod waveform;

pub use waveform::Waveform;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to read WAV {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to write WAV: {0}")]
    Write(#[from] hound::Error),

    #[error(
        "Cannot append {found_rate} Hz/{found_channels}ch audio to {expected_rate} Hz/{expected_channels}ch waveform"
    )]
    FormatMismatch {
        expected_rate: u32,
        expected_channels: u16,
        found_rate: u32,
        found_channels: u16,
    },

    #[error("Waveform has no samples to export")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AudioError>;
