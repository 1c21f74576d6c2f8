//! Speech model traits and types.

pub mod coqui;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Options for loading a pretrained model.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Python virtual environment holding Coqui TTS
    pub venv: Option<PathBuf>,
    /// Run inference on the GPU
    pub gpu: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            venv: None,
            gpu: false,
        }
    }
}

impl ModelOptions {
    /// Create new model options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the virtual environment path.
    pub fn with_venv(mut self, venv: Option<PathBuf>) -> Self {
        self.venv = venv;
        self
    }

    /// Enable or disable GPU inference.
    pub fn with_gpu(mut self, gpu: bool) -> Self {
        self.gpu = gpu;
        self
    }
}

/// Text-to-speech model.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speaker identities offered by the model. Empty for single-speaker models.
    fn speakers(&self) -> &[String];

    /// Render `text` spoken by `speaker` to a WAV file.
    async fn synthesize(&self, text: &str, speaker: Option<&str>, output_path: &Path)
    -> Result<()>;
}

/// Voice conversion model.
#[async_trait]
pub trait VoiceConverter: Send + Sync {
    /// Re-voice `source` with the timbre of `target`, writing a WAV file.
    async fn convert(&self, source: &Path, target: &Path, output_path: &Path) -> Result<()>;
}

/// Load the text-to-speech model `model_name`.
pub fn create_synthesizer(
    model_name: &str,
    options: &ModelOptions,
) -> Result<Box<dyn SpeechSynthesizer>> {
    Ok(Box::new(coqui::CoquiSynthesizer::load(model_name, options)?))
}

/// Load the voice conversion model `model_name`.
pub fn create_converter(
    model_name: &str,
    options: &ModelOptions,
) -> Result<Box<dyn VoiceConverter>> {
    Ok(Box::new(coqui::CoquiConverter::load(model_name, options)?))
}
