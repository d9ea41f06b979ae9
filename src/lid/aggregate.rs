//! Merging per-segment predictions into one language distribution

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{LidError, Result};
use crate::lid::classifier::SegmentPredictionBatch;

/// Predictions below this confidence are treated as noise
pub const MIN_VALID_SCORE: f64 = 0.4;

/// A language and its share of the surviving score mass, in percent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageScore {
    pub language: String,
    pub percentage: f64,
}

/// Ranked languages, best first, percentages summing to 100
pub type LanguageResult = Vec<LanguageScore>;

/// Outcome of a successful aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Number of (segment, language) pairs that cleared the validity floor
    pub valid_count: usize,
    /// Sum of the scores of those pairs
    pub total_score: f64,
    pub languages: LanguageResult,
}

impl Aggregation {
    /// Non-negative status code: the valid signal count
    pub fn status_code(&self) -> i32 {
        i32::try_from(self.valid_count).unwrap_or(i32::MAX)
    }

    /// Highest-ranked language
    pub fn top_language(&self) -> Option<&LanguageScore> {
        self.languages.first()
    }
}

/// Combines classifier output across segments
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    min_valid_score: f64,
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::new(MIN_VALID_SCORE)
    }
}

impl ScoreAggregator {
    pub fn new(min_valid_score: f64) -> Self {
        Self { min_valid_score }
    }

    pub fn min_valid_score(&self) -> f64 {
        self.min_valid_score
    }

    /// Sum the confidences of every prediction at or above the floor per
    /// language, then normalize over the surviving mass
    ///
    /// Percentages are relative to filtered-in scores only, so discarded tail
    /// predictions do not dilute the result. Ties are broken by language code.
    pub fn aggregate(&self, predictions: &SegmentPredictionBatch) -> Result<Aggregation> {
        let mut language_scores: BTreeMap<&str, f64> = BTreeMap::new();
        let mut total_score = 0.0f64;
        let mut valid_count = 0usize;

        for segment in predictions.iter() {
            for prediction in &segment.predictions {
                if !(prediction.score >= self.min_valid_score) {
                    continue;
                }
                valid_count += 1;
                total_score += prediction.score;
                *language_scores.entry(prediction.language.as_str()).or_insert(0.0) +=
                    prediction.score;
            }
        }

        debug!("Language score map: {:?}", language_scores);

        if language_scores.is_empty() {
            return Err(LidError::NoValidLanguage);
        }

        let mut languages: LanguageResult = language_scores
            .into_iter()
            .map(|(language, score)| LanguageScore {
                language: language.to_string(),
                percentage: score * 100.0 / total_score,
            })
            .collect();
        languages.sort_by(|a, b| {
            b.percentage
                .total_cmp(&a.percentage)
                .then_with(|| a.language.cmp(&b.language))
        });

        debug!("Aggregated {} valid predictions into {} languages", valid_count, languages.len());

        Ok(Aggregation {
            valid_count,
            total_score,
            languages,
        })
    }
}
