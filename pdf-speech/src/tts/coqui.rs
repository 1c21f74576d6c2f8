//! Coqui TTS models embedded through PyO3.
//!
//! Both the speech synthesizer and the voice converter are instances of
//! `TTS.api.TTS`; they differ only in the model they load and the method
//! they call. Python calls are blocking, so each one runs on tokio's
//! blocking pool.

use super::{ModelOptions, SpeechSynthesizer, VoiceConverter};
use crate::python;
use anyhow::{Context, Result};
use async_trait::async_trait;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::Path;
use std::sync::Arc;

/// Instantiate `TTS.api.TTS(model_name=..., progress_bar=False, gpu=...)`.
fn load_model(model_name: &str, options: &ModelOptions) -> Result<Py<PyAny>> {
    python::ensure_initialized(options.venv.as_deref());

    Python::with_gil(|py| -> Result<Py<PyAny>> {
        let api = py.import("TTS.api").context("Failed to import TTS.api")?;
        let class = api.getattr("TTS")?;

        let kwargs = PyDict::new(py);
        kwargs.set_item("model_name", model_name)?;
        kwargs.set_item("progress_bar", false)?;
        kwargs.set_item("gpu", options.gpu)?;

        let model = class
            .call((), Some(&kwargs))
            .with_context(|| format!("Failed to load model {}", model_name))?;
        Ok(model.unbind())
    })
}

/// Call `method` on the model with keyword arguments, off the async runtime.
async fn call_blocking(
    model: &Arc<Py<PyAny>>,
    method: &'static str,
    args: Vec<(&'static str, String)>,
) -> Result<()> {
    let model = Arc::clone(model);

    tokio::task::spawn_blocking(move || {
        Python::with_gil(|py| -> Result<()> {
            let kwargs = PyDict::new(py);
            for (key, value) in &args {
                kwargs.set_item(*key, value.as_str())?;
            }
            model.bind(py).call_method(method, (), Some(&kwargs))?;
            Ok(())
        })
    })
    .await
    .context("Task join error")?
}

/// Multi-speaker text-to-speech model such as `tts_models/en/vctk/vits`.
pub struct CoquiSynthesizer {
    model: Arc<Py<PyAny>>,
    speakers: Vec<String>,
}

impl CoquiSynthesizer {
    pub fn load(model_name: &str, options: &ModelOptions) -> Result<Self> {
        let model = load_model(model_name, options)?;

        let speakers = Python::with_gil(|py| -> Result<Vec<String>> {
            let speakers = model.bind(py).getattr("speakers")?;
            if speakers.is_none() {
                return Ok(Vec::new());
            }
            Ok(speakers.extract()?)
        })
        .context("Failed to read model speakers")?;

        log::info!("Loaded {} ({} speakers)", model_name, speakers.len());

        Ok(Self {
            model: Arc::new(model),
            speakers,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for CoquiSynthesizer {
    fn speakers(&self) -> &[String] {
        &self.speakers
    }

    async fn synthesize(
        &self,
        text: &str,
        speaker: Option<&str>,
        output_path: &Path,
    ) -> Result<()> {
        let mut args = vec![("text", text.to_string())];
        if let Some(speaker) = speaker {
            args.push(("speaker", speaker.to_string()));
        }
        args.push(("file_path", output_path.to_string_lossy().into_owned()));

        call_blocking(&self.model, "tts_to_file", args).await
    }
}

/// Voice conversion model such as `voice_conversion_models/multilingual/vctk/freevc24`.
pub struct CoquiConverter {
    model: Arc<Py<PyAny>>,
}

impl CoquiConverter {
    pub fn load(model_name: &str, options: &ModelOptions) -> Result<Self> {
        let model = load_model(model_name, options)?;
        log::info!("Loaded {}", model_name);
        Ok(Self {
            model: Arc::new(model),
        })
    }
}

#[async_trait]
impl VoiceConverter for CoquiConverter {
    async fn convert(&self, source: &Path, target: &Path, output_path: &Path) -> Result<()> {
        let args = vec![
            ("source_wav", source.to_string_lossy().into_owned()),
            ("target_wav", target.to_string_lossy().into_owned()),
            ("file_path", output_path.to_string_lossy().into_owned()),
        ];

        call_blocking(&self.model, "voice_conversion_to_file", args).await
    }
}
