//! pdf-speech - Convert PDF documents to speech, then re-voice it from a short sample

mod audio;
mod config;
mod pdf;
mod pipeline;
mod python;
mod status;
mod text;
mod tts;
mod workspace;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::PdfSpeechConfig;
use indicatif::{ProgressBar, ProgressStyle};
use pipeline::conversion::{self, ReferenceVoice};
use pipeline::synthesis;
use pipeline::{ItemOutcome, ItemReport};
use status::{ArtifactState, ArtifactTracker};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tts::ModelOptions;
use workspace::Workspace;

#[derive(Parser, Debug)]
#[command(name = "pdf-speech")]
#[command(about = "Convert PDF documents to speech and re-voice them from a short voice sample", long_about = None)]
#[command(version)]
struct Args {
    /// Enable debug output
    #[arg(short, long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct WorkspaceArgs {
    /// Directory for staged PDFs and generated audio (default from config: outputs)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate speech for a PDF
    Speak {
        /// Path to the PDF file
        pdf: PathBuf,

        /// Generate again even if speech already exists
        #[arg(long)]
        regenerate: bool,

        /// Maximum characters per synthesis chunk
        #[arg(long)]
        max_chars: Option<usize>,

        /// Speaker identity to use (default: the model's first speaker)
        #[arg(long)]
        speaker: Option<String>,

        /// Coqui TTS model name
        #[arg(long)]
        model: Option<String>,

        /// Run the model on the GPU
        #[arg(long)]
        gpu: bool,

        /// Also write the generated WAV to stdout
        #[arg(long)]
        stdout: bool,

        #[command(flatten)]
        workspace: WorkspaceArgs,
    },
    /// Re-voice previously generated speech to match a voice sample
    Convert {
        /// Path to the PDF whose speech should be converted
        pdf: PathBuf,

        /// Voice sample (WAV, ~15 seconds)
        #[arg(long, required_unless_present = "voice_stdin", conflicts_with = "voice_stdin")]
        voice: Option<PathBuf>,

        /// Read the voice sample WAV from stdin
        #[arg(long)]
        voice_stdin: bool,

        /// Convert again even if converted speech already exists
        #[arg(long)]
        regenerate: bool,

        /// Conversion window length in seconds
        #[arg(long, value_parser = parse_window_secs)]
        window_secs: Option<f64>,

        /// Run the model on the GPU
        #[arg(long)]
        gpu: bool,

        #[command(flatten)]
        workspace: WorkspaceArgs,
    },
    /// Show the state of a PDF's generated audio
    Status {
        /// Path to the PDF file
        pdf: PathBuf,

        #[command(flatten)]
        workspace: WorkspaceArgs,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default output directory
    SetOutputDir {
        /// Directory path
        path: PathBuf,
    },
    /// Set default maximum chunk size
    SetMaxChars {
        /// Characters per chunk
        value: usize,
    },
    /// Set default speaker identity
    SetSpeaker {
        /// Speaker name as listed by the model
        name: String,
    },
    /// Set the Python virtual environment holding Coqui TTS
    SetVenv {
        /// Path to the venv
        path: PathBuf,
    },
    /// Set the watermark phrase stripped from extracted text
    SetWatermark {
        /// Phrase (empty string disables stripping)
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    match args.command {
        Commands::Config { action } => handle_config_command(&action),
        Commands::Speak {
            pdf,
            regenerate,
            max_chars,
            speaker,
            model,
            gpu,
            stdout,
            workspace,
        } => {
            let mut config = load_config(&workspace)?;
            if let Some(max_chars) = max_chars {
                config.max_chars = max_chars;
            }
            if speaker.is_some() {
                config.speaker = speaker;
            }
            if let Some(model) = model {
                config.tts_model = model;
            }
            config.gpu |= gpu;
            run_speak(&pdf, &config, regenerate, stdout).await
        }
        Commands::Convert {
            pdf,
            voice,
            voice_stdin,
            regenerate,
            window_secs,
            gpu,
            workspace,
        } => {
            let mut config = load_config(&workspace)?;
            if let Some(secs) = window_secs {
                config.window_ms = (secs * 1000.0).round().max(1.0) as u64;
            }
            config.gpu |= gpu;
            let reference = read_reference(voice, voice_stdin)?;
            run_convert(&pdf, &config, reference, regenerate).await
        }
        Commands::Status { pdf, workspace } => {
            let config = load_config(&workspace)?;
            show_status(&pdf, &config)
        }
    }
}

/// Window length in seconds: finite and positive.
fn parse_window_secs(value: &str) -> std::result::Result<f64, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number of seconds", value))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("window must be a positive number of seconds, got {}", value));
    }
    Ok(secs)
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Load configuration and apply the workspace override.
fn load_config(workspace: &WorkspaceArgs) -> Result<PdfSpeechConfig> {
    let mut config = PdfSpeechConfig::load().context("Failed to load configuration")?;
    if let Some(dir) = &workspace.output_dir {
        config.output_dir = dir.clone();
    }
    log::debug!("Configuration: {:?}", config);
    Ok(config)
}

fn read_reference(voice: Option<PathBuf>, voice_stdin: bool) -> Result<ReferenceVoice> {
    if voice_stdin {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read voice sample from stdin")?;
        return Ok(ReferenceVoice::Upload(bytes));
    }
    voice
        .map(ReferenceVoice::Path)
        .ok_or_else(|| anyhow::anyhow!("A voice sample is required (--voice or --voice-stdin)"))
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn model_options(config: &PdfSpeechConfig) -> ModelOptions {
    ModelOptions::new()
        .with_venv(config.venv.clone())
        .with_gpu(config.gpu)
}

/// Extract, chunk and synthesize a PDF.
async fn run_speak(
    pdf_path: &Path,
    config: &PdfSpeechConfig,
    regenerate: bool,
    to_stdout: bool,
) -> Result<()> {
    if !pdf_path.exists() {
        anyhow::bail!("PDF file not found: {}", pdf_path.display());
    }

    let workspace = Workspace::open(&config.output_dir)?;
    let staged = workspace.stage_source(pdf_path)?;
    log::debug!("Workspace: {}", workspace.root().display());
    let artifacts = workspace.artifacts(&staged);
    let mut tracker = ArtifactTracker::load(&artifacts.speech)?;

    match tracker.state() {
        ArtifactState::Complete if !regenerate => {
            eprintln!("Speech already generated: {}", artifacts.speech.display());
            eprintln!("Use --regenerate to generate it again.");
            return Ok(());
        }
        ArtifactState::InProgress => {
            eprintln!("A previous run did not finish; starting over.");
        }
        _ => {}
    }

    eprintln!("Extracting text: {}", staged.display());
    let document = pdf::extract_text(&staged, &config.watermark)?;
    if document.is_empty() {
        anyhow::bail!("No text could be extracted from this PDF.");
    }

    let chunks = text::split_text(&document, config.max_chars, config.min_chars);
    log::debug!(
        "Longest chunk: {} chars",
        chunks.iter().map(|c| c.char_len()).max().unwrap_or(0)
    );
    eprintln!(
        "Words: ~{}, chunks: {}",
        document.split_whitespace().count(),
        chunks.len()
    );
    if chunks.is_empty() {
        anyhow::bail!("Extracted text is too short to synthesize.");
    }

    python::check_coqui(config.venv.as_deref())?;
    eprintln!("Loading TTS model: {}", config.tts_model);
    let synth = tts::create_synthesizer(&config.tts_model, &model_options(config))?;
    let speaker = synthesis::select_speaker(synth.speakers(), config.speaker.as_deref());
    eprintln!("Using speaker: {}", speaker.as_deref().unwrap_or("(default)"));

    let scratch = workspace.begin_run()?;
    log::debug!("Run {} scratch: {}", scratch.run_id(), scratch.path().display());
    let source_hash = status::compute_source_hash(&staged).ok();
    tracker.begin(scratch.run_id(), source_hash)?;

    let pb = progress_bar(chunks.len() as u64)?;
    let result = synthesis::synthesize_document(
        synth.as_ref(),
        speaker.as_deref(),
        &chunks,
        &scratch,
        &artifacts.speech,
        |done, _| pb.set_position(done as u64),
    )
    .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            pb.abandon();
            if let Err(abort_err) = tracker.abort() {
                log::warn!("Failed to record aborted run: {}", abort_err);
            }
            return Err(e);
        }
    };
    pb.finish_with_message("Speech generation complete!");
    tracker.complete()?;

    eprintln!(
        "\nCompleted: {}, Failed: {}",
        report.succeeded(),
        report.failed().len()
    );
    log_failures("chunk", &report.items);
    if let Some(speaker) = &report.speaker {
        eprintln!("Speaker: {}", speaker);
    }
    eprintln!(
        "Output: {} ({:.1} min, {:.1} MB)",
        report.output_path.display(),
        report.waveform.duration_ms() as f64 / 60_000.0,
        report.wav_bytes.len() as f64 / (1024.0 * 1024.0)
    );

    if to_stdout {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&report.wav_bytes)?;
        stdout.flush()?;
    }

    Ok(())
}

/// Re-voice a PDF's generated speech to match a reference sample.
async fn run_convert(
    pdf_path: &Path,
    config: &PdfSpeechConfig,
    reference: ReferenceVoice,
    regenerate: bool,
) -> Result<()> {
    let workspace = Workspace::open(&config.output_dir)?;
    let artifacts = workspace.artifacts(pdf_path);

    let speech = ArtifactTracker::load(&artifacts.speech)?;
    if speech.state() != ArtifactState::Complete {
        anyhow::bail!(
            "No speech generated for {} yet. Run `pdf-speech speak {}` first.",
            pdf_path.display(),
            pdf_path.display()
        );
    }
    warn_if_source_changed(&speech, pdf_path);

    let mut tracker = ArtifactTracker::load(&artifacts.converted)?;
    match tracker.state() {
        ArtifactState::Complete if !regenerate => {
            eprintln!("Converted speech already exists: {}", artifacts.converted.display());
            eprintln!("Use --regenerate to convert it again.");
            return Ok(());
        }
        ArtifactState::InProgress => {
            eprintln!("A previous conversion did not finish; starting over.");
        }
        _ => {}
    }

    let reference_path = conversion::persist_reference(&reference, &workspace)?;
    eprintln!("Voice sample: {}", reference_path.display());

    python::check_coqui(config.venv.as_deref())?;
    let options = model_options(config);
    let (converter, model_name) =
        conversion::load_with_fallback(&config.vc_model, &config.vc_fallback_model, |name| {
            tts::create_converter(name, &options)
        })?;
    eprintln!("Using voice conversion model: {}", model_name);

    let scratch = workspace.begin_run()?;
    log::debug!("Run {} scratch: {}", scratch.run_id(), scratch.path().display());
    tracker.begin(scratch.run_id(), speech.record().source_hash.clone())?;

    let pb = progress_bar(0)?;
    let result = conversion::convert_voice(
        converter.as_ref(),
        &reference_path,
        &artifacts.speech,
        &scratch,
        &artifacts.converted,
        config.window_ms,
        |done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        },
    )
    .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            pb.abandon();
            if let Err(abort_err) = tracker.abort() {
                log::warn!("Failed to record aborted run: {}", abort_err);
            }
            return Err(e);
        }
    };
    pb.finish_with_message("Conversion complete!");
    tracker.complete()?;

    eprintln!(
        "\nCompleted: {}, Failed: {}",
        report.succeeded(),
        report.failed().len()
    );
    log_failures("window", &report.items);
    eprintln!(
        "Output: {} ({:.1} min)",
        report.output_path.display(),
        report.duration_ms as f64 / 60_000.0
    );

    Ok(())
}

fn log_failures(kind: &str, items: &[ItemReport]) {
    for item in items {
        match &item.outcome {
            ItemOutcome::Failed { reason } => {
                eprintln!("  Skipped {} {}: {}", kind, item.index, reason);
            }
            ItemOutcome::Succeeded { duration_ms } => {
                log::debug!("{} {}: {} ms", kind, item.index, duration_ms);
            }
        }
    }
}

/// Warn when speech was generated from a different version of the PDF.
fn warn_if_source_changed(speech: &ArtifactTracker, pdf_path: &Path) {
    let Some(recorded) = speech.record().source_hash.as_deref() else {
        return;
    };
    let staged = speech.artifact().with_file_name(pdf_path.file_name().unwrap_or_default());
    let candidate = if pdf_path.exists() { pdf_path } else { staged.as_path() };

    match status::compute_source_hash(candidate) {
        Ok(current) if current != recorded => {
            eprintln!(
                "Warning: {} changed since its speech was generated; consider `speak --regenerate`.",
                pdf_path.display()
            );
        }
        Ok(_) => {}
        Err(e) => log::debug!("Could not hash {}: {}", candidate.display(), e),
    }
}

fn show_status(pdf_path: &Path, config: &PdfSpeechConfig) -> Result<()> {
    let workspace = Workspace::open(&config.output_dir)?;
    let artifacts = workspace.artifacts(pdf_path);

    for (label, path) in [("Speech", &artifacts.speech), ("Converted", &artifacts.converted)] {
        let tracker = ArtifactTracker::load(path)?;
        let record = tracker.record();
        println!("{}: {} ({})", label, tracker.state(), path.display());
        if tracker.state() == ArtifactState::InProgress {
            println!("  run {} did not finish", record.run_id.as_deref().unwrap_or("?"));
        }
        if let Some(completed_at) = record.completed_at {
            println!("  completed {}", completed_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }

    let speech = ArtifactTracker::load(&artifacts.speech)?;
    if speech.state() == ArtifactState::Complete {
        warn_if_source_changed(&speech, pdf_path);
    }
    Ok(())
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = PdfSpeechConfig::load()?;
            println!("Configuration file: {:?}", PdfSpeechConfig::config_path()?);
            println!();
            println!("output_dir = \"{}\"", config.output_dir.display());
            println!("max_chars = {}", config.max_chars);
            println!("min_chars = {}", config.min_chars);
            println!("window_ms = {}", config.window_ms);
            println!("tts_model = \"{}\"", config.tts_model);
            match &config.speaker {
                Some(speaker) => println!("speaker = \"{}\"", speaker),
                None => println!("speaker = (first available)"),
            }
            println!("vc_model = \"{}\"", config.vc_model);
            println!("vc_fallback_model = \"{}\"", config.vc_fallback_model);
            println!("watermark = \"{}\"", config.watermark);
            match &config.venv {
                Some(venv) => println!("venv = \"{}\"", venv.display()),
                None => println!("venv = (system python)"),
            }
            println!("gpu = {}", config.gpu);
        }
        ConfigAction::SetOutputDir { path } => {
            let mut config = PdfSpeechConfig::load()?;
            config.output_dir = path.clone();
            config.save()?;
            println!("Default output directory set to: {}", path.display());
        }
        ConfigAction::SetMaxChars { value } => {
            let mut config = PdfSpeechConfig::load()?;
            config.max_chars = (*value).max(1);
            config.save()?;
            println!("Default max chars set to: {}", config.max_chars);
        }
        ConfigAction::SetSpeaker { name } => {
            let mut config = PdfSpeechConfig::load()?;
            config.speaker = Some(name.clone());
            config.save()?;
            println!("Default speaker set to: {}", name);
        }
        ConfigAction::SetVenv { path } => {
            let mut config = PdfSpeechConfig::load()?;
            config.venv = Some(path.clone());
            config.save()?;
            println!("Python venv set to: {}", path.display());
        }
        ConfigAction::SetWatermark { text } => {
            let mut config = PdfSpeechConfig::load()?;
            config.watermark = text.clone();
            config.save()?;
            println!("Watermark set to: {:?}", text);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_speak() {
        let args = Args::try_parse_from([
            "pdf-speech",
            "speak",
            "book.pdf",
            "--regenerate",
            "--max-chars",
            "900",
            "--output-dir",
            "/tmp/out",
        ])
        .unwrap();
        match args.command {
            Commands::Speak {
                pdf,
                regenerate,
                max_chars,
                workspace,
                ..
            } => {
                assert_eq!(pdf, PathBuf::from("book.pdf"));
                assert!(regenerate);
                assert_eq!(max_chars, Some(900));
                assert_eq!(workspace.output_dir, Some(PathBuf::from("/tmp/out")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_convert_requires_voice() {
        assert!(Args::try_parse_from(["pdf-speech", "convert", "book.pdf"]).is_err());
        assert!(
            Args::try_parse_from(["pdf-speech", "convert", "book.pdf", "--voice", "me.wav"]).is_ok()
        );
        assert!(
            Args::try_parse_from(["pdf-speech", "convert", "book.pdf", "--voice-stdin"]).is_ok()
        );
        assert!(
            Args::try_parse_from([
                "pdf-speech",
                "convert",
                "book.pdf",
                "--voice",
                "me.wav",
                "--voice-stdin"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_window_secs_must_be_positive() {
        for bad in ["-5", "0", "NaN", "inf", "soon"] {
            let arg = format!("--window-secs={}", bad);
            let result =
                Args::try_parse_from(["pdf-speech", "convert", "book.pdf", "--voice-stdin", &arg]);
            assert!(result.is_err(), "accepted {}", bad);
        }

        let args = Args::try_parse_from([
            "pdf-speech",
            "convert",
            "book.pdf",
            "--voice-stdin",
            "--window-secs",
            "7.5",
        ])
        .unwrap();
        match args.command {
            Commands::Convert { window_secs, .. } => assert_eq!(window_secs, Some(7.5)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_debug_flag_is_global() {
        let args = Args::try_parse_from(["pdf-speech", "status", "book.pdf", "-d"]).unwrap();
        assert!(args.debug);
    }

    #[test]
    fn test_read_reference_path() {
        let reference = read_reference(Some(PathBuf::from("me.wav")), false).unwrap();
        assert!(matches!(reference, ReferenceVoice::Path(p) if p == PathBuf::from("me.wav")));
        assert!(read_reference(None, false).is_err());
    }
}
