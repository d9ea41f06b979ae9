//! Language identification: classifier contract and score aggregation

pub mod aggregate;
pub mod classifier;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use aggregate::{Aggregation, LanguageResult, LanguageScore, ScoreAggregator, MIN_VALID_SCORE};
pub use classifier::{
    LanguageClassifier, LanguageDictionary, LanguagePrediction, SegmentPredictionBatch,
    SegmentPredictions,
};
#[cfg(feature = "whisper")]
pub use whisper::WhisperLanguageClassifier;
