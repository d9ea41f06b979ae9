//! Error types for the audio-lid pipeline
//!
//! Every failure maps onto a negative status code (see [`LidError::status_code`]);
//! successful runs report a non-negative count instead.

use thiserror::Error;

/// Status code of a failed audio load
pub const ERROR_CODE_LOAD_FAILED: i32 = -1;
/// Status code of a voice-activity detection failure
pub const ERROR_CODE_DETECTION_FAILED: i32 = -2;
/// Status code of a language classifier failure
pub const ERROR_CODE_CLASSIFICATION_FAILED: i32 = -3;
/// Status code reported when no prediction cleared the validity floor
pub const ERROR_CODE_NO_VALID_LANGUAGE: i32 = -4;
/// Status code of an out-of-range call argument
pub const ERROR_CODE_INVALID_ARGUMENT: i32 = -5;
/// Status code of a configuration error
pub const ERROR_CODE_CONFIG: i32 = -6;
/// Status code of a filesystem error (debug artifacts)
pub const ERROR_CODE_IO: i32 = -7;

/// Main error type for the language identification pipeline
#[derive(Error, Debug)]
pub enum LidError {
    #[error("Audio load error: {0}")]
    Load(#[from] LoadError),

    #[error("Speech detection error: {0}")]
    Detection(#[from] DetectError),

    #[error("Language classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("No language prediction reached the validity floor")]
    NoValidLanguage,

    #[error("Invalid argument: {name} = {value}")]
    InvalidArgument { name: &'static str, value: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LidError {
    /// Negative status code for this error
    pub fn status_code(&self) -> i32 {
        match self {
            LidError::Load(_) => ERROR_CODE_LOAD_FAILED,
            LidError::Detection(_) => ERROR_CODE_DETECTION_FAILED,
            LidError::Classifier(_) => ERROR_CODE_CLASSIFICATION_FAILED,
            LidError::NoValidLanguage => ERROR_CODE_NO_VALID_LANGUAGE,
            LidError::InvalidArgument { .. } => ERROR_CODE_INVALID_ARGUMENT,
            LidError::Config(_) => ERROR_CODE_CONFIG,
            LidError::Io(_) => ERROR_CODE_IO,
        }
    }

    pub(crate) fn invalid_argument(name: &'static str, value: impl ToString) -> Self {
        LidError::InvalidArgument {
            name,
            value: value.to_string(),
        }
    }
}

/// Audio loading errors
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Audio file not found: {0}")]
    NotFound(String),

    #[error("Unsupported audio source: {0}")]
    UnsupportedSource(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Resampling error: {0}")]
    Resampling(String),

    #[error("Audio source contains no samples")]
    Empty,
}

/// Voice activity detection errors
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Failed to build filter: {0}")]
    Filter(String),

    #[error("Voice activity model failed: {0}")]
    Model(String),

    #[error("Voice activity score out of range: {0}")]
    ScoreOutOfRange(f32),
}

/// Language classifier errors
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to read language dictionary: {0}")]
    Dictionary(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid audio data for classification")]
    InvalidAudioData,

    #[error("Classifier returned {got} prediction lists for {expected} inputs")]
    BatchMismatch { expected: usize, got: usize },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, value: impl ToString) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LidError>;
