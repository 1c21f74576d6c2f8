//! pdf-speech configuration management.

use crate::text::chunker::{DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

// Coqui model identifiers
pub const DEFAULT_TTS_MODEL: &str = "tts_models/en/vctk/vits";
pub const DEFAULT_VC_MODEL: &str = "voice_conversion_models/multilingual/vctk/freevc24";
pub const DEFAULT_VC_FALLBACK_MODEL: &str = "voice_conversion_models/multilingual/vctk/freevc";

/// Scanner watermark stripped from extracted text.
pub const DEFAULT_WATERMARK: &str = "Scan to Download";

/// Length of a voice conversion window in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 15_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfSpeechConfig {
    /// Working directory for staged PDFs and generated audio
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum characters per synthesis chunk
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Chunks whose trimmed length is at or below this are dropped
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    /// Voice conversion window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Coqui TTS model name
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    /// Preferred speaker identity. None means the model's first speaker.
    #[serde(default)]
    pub speaker: Option<String>,

    /// Primary voice conversion model
    #[serde(default = "default_vc_model")]
    pub vc_model: String,

    /// Voice conversion model used when the primary fails to load
    #[serde(default = "default_vc_fallback_model")]
    pub vc_fallback_model: String,

    /// Boilerplate phrase removed from extracted text (case-insensitive)
    #[serde(default = "default_watermark")]
    pub watermark: String,

    /// Python virtual environment holding Coqui TTS. None uses the system interpreter.
    #[serde(default)]
    pub venv: Option<PathBuf>,

    /// Run models on the GPU
    #[serde(default)]
    pub gpu: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_min_chars() -> usize {
    DEFAULT_MIN_CHARS
}

fn default_window_ms() -> u64 {
    DEFAULT_WINDOW_MS
}

fn default_tts_model() -> String {
    DEFAULT_TTS_MODEL.to_string()
}

fn default_vc_model() -> String {
    DEFAULT_VC_MODEL.to_string()
}

fn default_vc_fallback_model() -> String {
    DEFAULT_VC_FALLBACK_MODEL.to_string()
}

fn default_watermark() -> String {
    DEFAULT_WATERMARK.to_string()
}

impl Default for PdfSpeechConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_chars: default_max_chars(),
            min_chars: default_min_chars(),
            window_ms: default_window_ms(),
            tts_model: default_tts_model(),
            speaker: None,
            vc_model: default_vc_model(),
            vc_fallback_model: default_vc_fallback_model(),
            watermark: default_watermark(),
            venv: None,
            gpu: false,
        }
    }
}

impl PdfSpeechConfig {
    /// Get the config file path: ~/.config/cli-programs/pdf-speech.toml
    pub fn config_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home
            .join(".config")
            .join("cli-programs")
            .join("pdf-speech.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: PdfSpeechConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }
}
