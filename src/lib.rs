//! Spoken Language Identification
//!
//! Finds the languages spoken in an audio file by picking a few speech-rich
//! segments, classifying each with a multilingual language identification
//! model and merging the per-segment guesses into one ranked distribution.
//!
//! # Architecture
//!
//! The system is organized into the following modules:
//!
//! - `audio`: Audio loading, preprocessing, voice activity scoring and segment selection
//! - `lid`: Language classifier contract, Whisper backend and score aggregation
//! - `pipeline`: The `AudioLid` orchestrator and its retry policy
//! - `output`: Result formatting and debug artifacts
//! - `config`: Configuration structures
//! - `error`: Error types and status codes
//!
//! # Example
//!
//! ```no_run
//! use audio_lid::{AudioLid, Config, LanguageClassifier, SegmentPredictionBatch};
//! use audio_lid::error::ClassifierError;
//!
//! struct AlwaysEnglish;
//!
//! impl LanguageClassifier for AlwaysEnglish {
//!     fn infer(&mut self, batch: &[&[f32]]) -> Result<SegmentPredictionBatch, ClassifierError> {
//!         Ok(batch
//!             .iter()
//!             .enumerate()
//!             .map(|(i, _)| (i.to_string(), vec![("eng", 0.9)]))
//!             .collect())
//!     }
//! }
//!
//! let config = Config::default();
//! let mut lid = AudioLid::with_defaults(&config, AlwaysEnglish).unwrap();
//! let identification = lid.infer_language("interview.wav").unwrap();
//! for language in identification.languages() {
//!     println!("{}: {:.1}%", language.language, language.percentage);
//! }
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod lid;
pub mod output;
pub mod pipeline;

// Re-exports for convenience
pub use audio::{
    AudioLoader, EnergyVoiceActivityModel, SampleBuffer, SpeechSegment, SpeechSegmenter,
    VoiceActivityModel, WavFileLoader,
};
pub use config::{ClassifierConfig, Config, ModelConfig, OutputConfig, SegmenterConfig, VadConfig};
pub use error::{ClassifierError, ConfigError, DetectError, LidError, LoadError, Result};
pub use lid::{
    Aggregation, LanguageClassifier, LanguagePrediction, LanguageResult, LanguageScore,
    ScoreAggregator, SegmentPredictionBatch,
};
#[cfg(feature = "whisper")]
pub use lid::WhisperLanguageClassifier;
pub use output::DebugWriter;
pub use pipeline::{find_segments_with_retry, AudioLid, Identification, SearchParams, SegmentSearch};
