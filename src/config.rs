//! Configuration structures for the audio-lid pipeline
//!
//! Every section rejects unknown keys, and [`Config::validate`] range-checks
//! the values after loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Sample rate every pipeline stage works at
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub model: ModelConfig,
    pub segmenter: SegmenterConfig,
    pub vad: VadConfig,
    pub classifier: ClassifierConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value against its valid range
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.segmenter.validate()?;
        self.vad.validate()?;
        self.classifier.validate()?;
        if self.model.threads == 0 {
            return Err(ConfigError::invalid("model.threads", self.model.threads));
        }
        Ok(())
    }
}

/// Model locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Path to the language identification model
    pub language_model: PathBuf,
    /// Directory holding the language dictionary (`dict.lang.txt`)
    pub lang_dict_dir: PathBuf,
    /// Optional denoise model; accepted but not applied
    pub denoise_model: Option<PathBuf>,
    /// Number of threads for inference
    pub threads: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            language_model: PathBuf::from("./pretrain/ggml-base.bin"),
            lang_dict_dir: PathBuf::from("./pretrain"),
            denoise_model: None,
            threads: 4,
        }
    }
}

/// Speech segment selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SegmenterConfig {
    /// Number of speech segments to collect
    pub segment_count: usize,
    /// Target length of each segment (seconds)
    pub segment_duration: f32,
    /// Minimum voice-activity score for a window to count as speech (0.0 - 1.0)
    pub score_threshold: f32,
    /// Leading audio to skip before scanning (seconds)
    pub parse_start_offset: f32,
    /// Scan step after a rejected window (seconds)
    pub hop_duration: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            segment_count: 5,
            segment_duration: 5.0,
            score_threshold: 0.7,
            parse_start_offset: 60.0,
            hop_duration: 0.5,
        }
    }
}

impl SegmenterConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_count == 0 {
            return Err(ConfigError::invalid(
                "segmenter.segment_count",
                self.segment_count,
            ));
        }
        if !(self.segment_duration > 0.0) {
            return Err(ConfigError::invalid(
                "segmenter.segment_duration",
                self.segment_duration,
            ));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ConfigError::invalid(
                "segmenter.score_threshold",
                self.score_threshold,
            ));
        }
        if !(self.parse_start_offset >= 0.0) {
            return Err(ConfigError::invalid(
                "segmenter.parse_start_offset",
                self.parse_start_offset,
            ));
        }
        if !(self.hop_duration > 0.0) {
            return Err(ConfigError::invalid(
                "segmenter.hop_duration",
                self.hop_duration,
            ));
        }
        Ok(())
    }
}

/// Energy-based voice activity model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VadConfig {
    /// RMS energy above which a frame counts as speech
    pub energy_threshold: f32,
    /// Analysis frame length (seconds)
    pub frame_duration: f32,
    /// High-pass filter cutoff frequency (Hz)
    pub high_pass_cutoff: f32,
    /// Low-pass filter cutoff frequency (Hz)
    pub low_pass_cutoff: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.02,
            frame_duration: 0.02,
            high_pass_cutoff: 300.0,
            low_pass_cutoff: 3400.0,
        }
    }
}

impl VadConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.energy_threshold > 0.0) {
            return Err(ConfigError::invalid(
                "vad.energy_threshold",
                self.energy_threshold,
            ));
        }
        if !(self.frame_duration > 0.0) {
            return Err(ConfigError::invalid(
                "vad.frame_duration",
                self.frame_duration,
            ));
        }
        let nyquist = TARGET_SAMPLE_RATE as f32 / 2.0;
        if !(self.high_pass_cutoff >= 0.0 && self.high_pass_cutoff < nyquist) {
            return Err(ConfigError::invalid(
                "vad.high_pass_cutoff",
                self.high_pass_cutoff,
            ));
        }
        if !(self.low_pass_cutoff >= 0.0 && self.low_pass_cutoff < nyquist) {
            return Err(ConfigError::invalid(
                "vad.low_pass_cutoff",
                self.low_pass_cutoff,
            ));
        }
        Ok(())
    }
}

/// Language classifier and aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Predictions kept per segment
    pub top_k: usize,
    /// Per-prediction confidence needed to count toward the result
    pub min_valid_score: f64,
    /// Longest input handed to the model; longer segments are randomly cropped
    pub infer_num_samples: Option<usize>,
    /// Seed of the classifier's random state
    pub seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_valid_score: 0.4,
            infer_num_samples: None,
            seed: 123,
        }
    }
}

impl ClassifierConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::invalid("classifier.top_k", self.top_k));
        }
        if !(self.min_valid_score > 0.0 && self.min_valid_score <= 1.0) {
            return Err(ConfigError::invalid(
                "classifier.min_valid_score",
                self.min_valid_score,
            ));
        }
        if self.infer_num_samples == Some(0) {
            return Err(ConfigError::invalid("classifier.infer_num_samples", 0));
        }
        Ok(())
    }
}

/// Result output and debug artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Write segments, manifests and predictions to `output_path`
    pub debug: bool,
    /// Directory for debug artifacts
    pub output_path: PathBuf,
    /// Result format on the console
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            debug: false,
            output_path: PathBuf::from("./temp"),
            format: OutputFormat::Text,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One language per line
    Text,
    /// JSON list of `[language, percentage]` pairs
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::invalid("output.format", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.segmenter.segment_count, 5);
        assert_eq!(config.segmenter.segment_duration, 5.0);
        assert_eq!(config.segmenter.score_threshold, 0.7);
        assert_eq!(config.segmenter.parse_start_offset, 60.0);
        assert_eq!(config.classifier.top_k, 3);
        assert_eq!(config.classifier.min_valid_score, 0.4);
        assert!(!config.output.debug);
        assert_eq!(config.output.output_path, PathBuf::from("./temp"));
        assert!(config.model.denoise_model.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
            [segmenter]
            segment_count = 3
            score_threshold = 0.5

            [classifier]
            top_k = 5
            infer_num_samples = 160000

            [output]
            debug = true
            format = "json"
        "#;

        let config = Config::from_toml(toml_str).unwrap();
        assert_eq!(config.segmenter.segment_count, 3);
        assert_eq!(config.segmenter.score_threshold, 0.5);
        assert_eq!(config.segmenter.segment_duration, 5.0);
        assert_eq!(config.classifier.top_k, 5);
        assert_eq!(config.classifier.infer_num_samples, Some(160000));
        assert!(config.output.debug);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml_str = r#"
            [segmenter]
            segment_count = 3
            speech_magic = true
        "#;

        let result = Config::from_toml(toml_str);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result = Config::from_toml("[realtime]\nmax_lag_seconds = 5.0\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let result = Config::from_toml("[segmenter]\nscore_threshold = 1.5\n");
        match result {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "segmenter.score_threshold");
            }
            other => panic!("expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_segment_count_rejected() {
        let mut config = Config::default();
        config.segmenter.segment_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("srt".parse::<OutputFormat>().is_err());
    }
}
