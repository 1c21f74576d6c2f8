//! Sequential synthesis and voice conversion runs.

pub mod conversion;
pub mod synthesis;

/// Result of processing one chunk or window.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Succeeded { duration_ms: u64 },
    Failed { reason: String },
}

/// Outcome of one chunk or window, by position.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub index: usize,
    pub outcome: ItemOutcome,
}

impl ItemReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Succeeded { .. })
    }
}

fn count_succeeded(items: &[ItemReport]) -> usize {
    items.iter().filter(|item| item.succeeded()).count()
}

/// Indices of items that failed, in order.
fn failed_indices(items: &[ItemReport]) -> Vec<usize> {
    items
        .iter()
        .filter(|item| !item.succeeded())
        .map(|item| item.index)
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory stand-ins for the speech models.

    use crate::audio::Waveform;
    use crate::tts::{SpeechSynthesizer, VoiceConverter};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    pub const RATE: u32 = 1000;

    /// Renders each text as `10 * len` frames at a level derived from its length.
    /// Texts containing "FAIL" are rejected.
    pub struct FakeSynthesizer {
        pub speakers: Vec<String>,
        pub calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl FakeSynthesizer {
        pub fn new() -> Self {
            Self {
                speakers: vec!["p225".to_string(), "p226".to_string()],
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn render(text: &str) -> Waveform {
            let level = (text.len() % 10) as f32 / 10.0;
            Waveform::new(RATE, 1, vec![level; text.len() * 10])
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynthesizer {
        fn speakers(&self) -> &[String] {
            &self.speakers
        }

        async fn synthesize(
            &self,
            text: &str,
            speaker: Option<&str>,
            output_path: &Path,
        ) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), speaker.map(str::to_string)));
            if text.contains("FAIL") {
                anyhow::bail!("model rejected input");
            }
            Self::render(text).export(output_path)?;
            Ok(())
        }
    }

    /// Halves the amplitude of each window. Fails on the listed window indices.
    pub struct FakeConverter {
        pub fail_windows: Vec<usize>,
        pub calls: Mutex<Vec<(PathBuf, PathBuf)>>,
    }

    impl FakeConverter {
        pub fn failing_on(fail_windows: Vec<usize>) -> Self {
            Self {
                fail_windows,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VoiceConverter for FakeConverter {
        async fn convert(&self, source: &Path, target: &Path, output_path: &Path) -> Result<()> {
            let index = self.calls.lock().unwrap().len();
            self.calls
                .lock()
                .unwrap()
                .push((source.to_path_buf(), target.to_path_buf()));
            if self.fail_windows.contains(&index) {
                anyhow::bail!("conversion diverged");
            }
            let input = Waveform::load(source)?;
            let halved = input.samples().iter().map(|s| s * 0.5).collect();
            Waveform::new(input.sample_rate(), input.channels(), halved).export(output_path)?;
            Ok(())
        }
    }
}
