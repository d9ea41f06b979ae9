//! Spoken Language Identification CLI Application

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use audio_lid::config::OutputFormat;
use audio_lid::output::format_segment;
use audio_lid::{
    find_segments_with_retry, AudioLoader, Config, EnergyVoiceActivityModel, SearchParams,
    SpeechSegmenter, WavFileLoader,
};

/// Spoken Language Identification
#[derive(Parser)]
#[command(name = "audio-lid")]
#[command(about = "Identify the languages spoken in an audio file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Overrides for speech segment selection
#[derive(Args)]
struct SegmentArgs {
    /// Number of speech segments to classify
    #[arg(long)]
    segment_count: Option<usize>,

    /// Length of each speech segment in seconds
    #[arg(long)]
    segment_duration: Option<f32>,

    /// Minimum voice activity score, range 0-1
    #[arg(long)]
    score_threshold: Option<f32>,

    /// Leading seconds of audio to skip
    #[arg(long)]
    parse_start_offset: Option<f32>,
}

impl SegmentArgs {
    fn apply(self, config: &mut Config) {
        if let Some(count) = self.segment_count {
            config.segmenter.segment_count = count;
        }
        if let Some(duration) = self.segment_duration {
            config.segmenter.segment_duration = duration;
        }
        if let Some(threshold) = self.score_threshold {
            config.segmenter.score_threshold = threshold;
        }
        if let Some(offset) = self.parse_start_offset {
            config.segmenter.parse_start_offset = offset;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the spoken languages of a WAV file
    Identify {
        /// Input WAV file path
        input: String,

        /// Path to the language identification model
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Directory containing dict.lang.txt
        #[arg(long)]
        lang_dict_dir: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Save segments, manifests and predictions to the output path
        #[arg(long)]
        debug: bool,

        /// Directory for debug artifacts
        #[arg(short, long)]
        output_path: Option<PathBuf>,

        /// Predictions kept per segment
        #[arg(long)]
        top_k: Option<usize>,

        /// Longest classifier input in samples; longer segments are randomly cropped
        #[arg(long)]
        infer_num_samples: Option<usize>,

        /// Denoise model (accepted, not applied)
        #[arg(long)]
        denoise_model: Option<PathBuf>,

        #[command(flatten)]
        segments: SegmentArgs,
    },

    /// List the speech segments that would be classified
    Segments {
        /// Input WAV file path
        input: String,

        #[command(flatten)]
        segments: SegmentArgs,
    },

    /// Download a multilingual Whisper model
    DownloadModel {
        /// Model size
        #[arg(short, long, value_enum, default_value_t = ModelSize::Base)]
        size: ModelSize,

        /// Directory the model is saved to
        #[arg(short, long, default_value = "./pretrain")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Errors only unless -v is given
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    let mut config = match cli.config {
        Some(ref path) => Config::from_file(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Identify {
            input,
            model,
            lang_dict_dir,
            format,
            debug,
            output_path,
            top_k,
            infer_num_samples,
            denoise_model,
            segments,
        } => {
            // Flags take precedence over the config file
            if let Some(model) = model {
                config.model.language_model = model;
            }
            if let Some(dir) = lang_dict_dir {
                config.model.lang_dict_dir = dir;
            }
            if let Some(format) = format {
                config.output.format = format;
            }
            if debug {
                config.output.debug = true;
            }
            if let Some(path) = output_path {
                config.output.output_path = path;
            }
            if let Some(top_k) = top_k {
                config.classifier.top_k = top_k;
            }
            if infer_num_samples.is_some() {
                config.classifier.infer_num_samples = infer_num_samples;
            }
            if denoise_model.is_some() {
                config.model.denoise_model = denoise_model;
            }
            segments.apply(&mut config);
            config.validate().context("Invalid configuration")?;

            identify(config, &input)
        }
        Commands::Segments { input, segments } => {
            segments.apply(&mut config);
            config.validate().context("Invalid configuration")?;
            list_segments(config, &input)
        }
        Commands::DownloadModel { size, output_dir } => download_model(size, &output_dir),
    }
}

/// Run the full pipeline and print the ranked languages
#[cfg(feature = "whisper")]
fn identify(config: Config, input: &str) -> Result<()> {
    use audio_lid::output::{format_json, format_text};
    use audio_lid::{AudioLid, WhisperLanguageClassifier};

    let classifier = WhisperLanguageClassifier::new(&config.model, &config.classifier)
        .context("Failed to initialize language classifier")?;
    let mut lid = AudioLid::with_defaults(&config, classifier)
        .context("Failed to initialize pipeline")?;

    info!("Identifying languages in: {}", input);
    let identification = match lid.infer_language(input) {
        Ok(identification) => identification,
        Err(e) => {
            let status = e.status_code();
            return Err(anyhow::Error::new(e)
                .context(format!("Language identification failed (status {})", status)));
        }
    };

    info!(
        "Result status {}: {} segments, retried: {}",
        identification.status_code(),
        identification.segment_count,
        identification.retried
    );

    let output = match config.output.format {
        OutputFormat::Text => format_text(identification.languages()),
        OutputFormat::Json => format_json(identification.languages()),
    };
    println!("{}", output);

    Ok(())
}

#[cfg(not(feature = "whisper"))]
fn identify(_config: Config, _input: &str) -> Result<()> {
    anyhow::bail!("No language classifier available: rebuild with `--features whisper`")
}

/// Print the speech segments selected for classification
fn list_segments(config: Config, input: &str) -> Result<()> {
    info!("Listing speech segments in: {}", input);
    let buffer = WavFileLoader::new()
        .load(input)
        .with_context(|| format!("Failed to load audio from {}", input))?;

    let vad = EnergyVoiceActivityModel::new(&config.vad)?;
    let mut segmenter = SpeechSegmenter::new(vad, config.segmenter.clone());
    let search = find_segments_with_retry(
        &mut segmenter,
        &buffer,
        SearchParams::from_config(&config.segmenter),
    )?;

    if search.segments.is_empty() {
        println!("No speech segments found");
        return Ok(());
    }

    println!(
        "{} segments (threshold {:.2}, duration {:.1}s{})",
        search.segments.len(),
        search.params.score_threshold,
        search.params.segment_duration,
        if search.retried { ", relaxed" } else { "" }
    );
    for segment in &search.segments {
        println!("  {}", format_segment(segment));
    }

    Ok(())
}

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Smallest plausible ggml model; anything below is an error page
const MIN_MODEL_BYTES: u64 = 10_000_000;

/// Multilingual ggml Whisper checkpoints
///
/// The English-only `.en` variants have no language detection head.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    #[value(name = "large-v3")]
    LargeV3,
}

impl ModelSize {
    fn file_name(self) -> &'static str {
        match self {
            ModelSize::Tiny => "ggml-tiny.bin",
            ModelSize::Base => "ggml-base.bin",
            ModelSize::Small => "ggml-small.bin",
            ModelSize::Medium => "ggml-medium.bin",
            ModelSize::LargeV3 => "ggml-large-v3.bin",
        }
    }
}

/// Fetch a model with curl into `output_dir`, keeping an existing copy
fn download_model(size: ModelSize, output_dir: &Path) -> Result<()> {
    let target = output_dir.join(size.file_name());
    if target.exists() {
        println!("{} is already present, remove it to fetch again", target.display());
        return Ok(());
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Cannot create model directory {}", output_dir.display()))?;

    let url = format!("{}/{}", MODEL_BASE_URL, size.file_name());
    let partial = target.with_extension("bin.part");
    info!("Fetching {} into {}", url, partial.display());
    println!("{} -> {}", url, target.display());

    let status = std::process::Command::new("curl")
        .arg("--location")
        .arg("--fail")
        .arg("--progress-bar")
        .arg("--output")
        .arg(&partial)
        .arg(&url)
        .status()
        .context("Could not run curl, is it installed?")?;
    if !status.success() {
        let _ = std::fs::remove_file(&partial);
        anyhow::bail!("curl exited with {:?}", status.code());
    }

    let bytes = std::fs::metadata(&partial)
        .with_context(|| format!("Missing download {}", partial.display()))?
        .len();
    if bytes < MIN_MODEL_BYTES {
        std::fs::remove_file(&partial)?;
        anyhow::bail!("Fetched only {} bytes, not a model file", bytes);
    }

    std::fs::rename(&partial, &target)
        .with_context(|| format!("Cannot move model into {}", target.display()))?;

    println!("Saved {:.1} MB", bytes as f64 / 1_000_000.0);
    println!("Run: audio-lid identify --model {} <input.wav>", target.display());

    Ok(())
}
