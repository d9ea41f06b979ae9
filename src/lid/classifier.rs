//! Language classifier contract and prediction types

use std::collections::HashSet;
use std::path::Path;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ClassifierError;

/// File inside the language dictionary directory listing the model's labels
pub const DICTIONARY_FILE: &str = "dict.lang.txt";

/// A single (language, confidence) guess for one segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguagePrediction {
    pub language: String,
    pub score: f64,
}

impl LanguagePrediction {
    pub fn new(language: impl Into<String>, score: f64) -> Self {
        Self {
            language: language.into(),
            score,
        }
    }
}

/// Ranked predictions for one segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPredictions {
    pub segment_id: String,
    pub predictions: Vec<LanguagePrediction>,
}

/// Classifier output for a batch of segments, in input order
///
/// Scores are raw model confidences: they need not sum to one and a segment
/// may carry fewer than top-k entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SegmentPredictionBatch {
    entries: Vec<SegmentPredictions>,
}

impl SegmentPredictionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the predictions of the next segment
    pub fn push(&mut self, segment_id: impl Into<String>, predictions: Vec<LanguagePrediction>) {
        self.entries.push(SegmentPredictions {
            segment_id: segment_id.into(),
            predictions,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentPredictions> {
        self.entries.iter()
    }

    /// Predictions of the segment with the given id
    pub fn get(&self, segment_id: &str) -> Option<&[LanguagePrediction]> {
        self.entries
            .iter()
            .find(|entry| entry.segment_id == segment_id)
            .map(|entry| entry.predictions.as_slice())
    }

    /// Number of segments in the batch
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S, L> FromIterator<(S, Vec<(L, f64)>)> for SegmentPredictionBatch
where
    S: Into<String>,
    L: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (S, Vec<(L, f64)>)>>(iter: I) -> Self {
        let mut batch = SegmentPredictionBatch::new();
        for (segment_id, predictions) in iter {
            batch.push(
                segment_id,
                predictions
                    .into_iter()
                    .map(|(language, score)| LanguagePrediction::new(language, score))
                    .collect(),
            );
        }
        batch
    }
}

/// Multilingual language identification model
///
/// Implementations return one prediction list per input buffer, in input
/// order, with segment ids `"0"`, `"1"`, ... Any sampling they do must come
/// from random state they own, so repeated runs on the same input agree.
pub trait LanguageClassifier {
    fn infer(&mut self, batch: &[&[f32]]) -> Result<SegmentPredictionBatch, ClassifierError>;
}

impl<C: LanguageClassifier + ?Sized> LanguageClassifier for Box<C> {
    fn infer(&mut self, batch: &[&[f32]]) -> Result<SegmentPredictionBatch, ClassifierError> {
        (**self).infer(batch)
    }
}

/// Keep the `k` best (language, score) pairs, best first
///
/// Equal scores are ordered by language code.
pub fn rank_top_k<I>(scores: I, k: usize) -> Vec<LanguagePrediction>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut ranked: Vec<LanguagePrediction> = scores
        .into_iter()
        .map(|(language, score)| LanguagePrediction { language, score })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.language.cmp(&b.language))
    });
    ranked.truncate(k);
    ranked
}

/// Crop `samples` to at most `max_samples`, picking the window offset at random
pub fn crop_for_inference<'a, R: Rng + ?Sized>(
    samples: &'a [f32],
    max_samples: Option<usize>,
    rng: &mut R,
) -> &'a [f32] {
    match max_samples {
        Some(max) if max > 0 && samples.len() > max => {
            let start = rng.gen_range(0..=samples.len() - max);
            &samples[start..start + max]
        }
        _ => samples,
    }
}

/// Language labels the model was trained on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageDictionary {
    labels: Vec<String>,
}

impl LanguageDictionary {
    /// Parse fairseq-style `label [count]` lines; blank lines are skipped
    pub fn parse(content: &str) -> Self {
        let labels = content
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .collect();
        Self { labels }
    }

    /// Load `dict.lang.txt` from `dir`; a missing file yields `None`
    pub fn load(dir: &Path) -> Result<Option<Self>, ClassifierError> {
        let path = dir.join(DICTIONARY_FILE);
        if !path.exists() {
            debug!("No language dictionary at {}", path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ClassifierError::Dictionary(format!("{}: {}", path.display(), e)))?;
        let dictionary = Self::parse(&content);
        if dictionary.is_empty() {
            return Err(ClassifierError::Dictionary(format!(
                "{}: no labels",
                path.display()
            )));
        }

        debug!("Loaded {} language labels from {}", dictionary.len(), path.display());
        Ok(Some(dictionary))
    }

    /// Count the labels the model can actually emit
    ///
    /// Fails when none match, since filtering by such a dictionary would
    /// drop every prediction.
    pub fn check_vocabulary<'a, I>(&self, vocabulary: I) -> Result<usize, ClassifierError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let vocabulary: HashSet<&str> = vocabulary.into_iter().collect();
        let unknown: Vec<&str> = self
            .labels
            .iter()
            .map(String::as_str)
            .filter(|label| !vocabulary.contains(label))
            .collect();
        let shared = self.labels.len() - unknown.len();

        if shared == 0 {
            return Err(ClassifierError::Dictionary(format!(
                "none of the {} dictionary labels are known to the model (first: {})",
                self.labels.len(),
                self.labels.first().map(String::as_str).unwrap_or_default()
            )));
        }
        if !unknown.is_empty() {
            warn!(
                "{} dictionary labels are unknown to the model and never predicted: {}",
                unknown.len(),
                unknown.join(", ")
            );
        }

        Ok(shared)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_batch_from_pairs() {
        let batch: SegmentPredictionBatch = vec![
            ("s1", vec![("eng", 0.8), ("fra", 0.3)]),
            ("s2", vec![("eng", 0.6)]),
        ]
        .into_iter()
        .collect();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.get("s1").map(|p| p.len()), Some(2));
        assert_eq!(batch.get("s2").unwrap()[0], LanguagePrediction::new("eng", 0.6));
        assert!(batch.get("s3").is_none());

        let ids: Vec<&str> = batch.iter().map(|s| s.segment_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[test]
    fn test_rank_top_k() {
        let scores = vec![
            ("fr".to_string(), 0.2),
            ("en".to_string(), 0.7),
            ("de".to_string(), 0.2),
            ("es".to_string(), 0.05),
        ];
        let ranked = rank_top_k(scores, 3);

        let languages: Vec<&str> = ranked.iter().map(|p| p.language.as_str()).collect();
        assert_eq!(languages, vec!["en", "de", "fr"]);
    }

    #[test]
    fn test_rank_top_k_fewer_than_k() {
        let ranked = rank_top_k(vec![("en".to_string(), 0.9)], 3);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_crop_short_input_untouched() {
        let mut rng = StdRng::seed_from_u64(123);
        let samples = vec![0.1; 100];
        assert_eq!(crop_for_inference(&samples, Some(200), &mut rng).len(), 100);
        assert_eq!(crop_for_inference(&samples, None, &mut rng).len(), 100);
    }

    #[test]
    fn test_crop_is_seeded() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32).collect();

        let mut first = StdRng::seed_from_u64(123);
        let mut second = StdRng::seed_from_u64(123);
        let a = crop_for_inference(&samples, Some(100), &mut first);
        let b = crop_for_inference(&samples, Some(100), &mut second);

        assert_eq!(a.len(), 100);
        assert_eq!(a, b);
        // Window stays contiguous
        assert_eq!(a[99] - a[0], 99.0);
    }

    #[test]
    fn test_dictionary_parse() {
        let dictionary = LanguageDictionary::parse("eng 1\nfra 1\n\ncmn\n");
        assert_eq!(dictionary.len(), 3);
        assert!(dictionary.contains("cmn"));
        assert!(!dictionary.contains("deu"));
    }

    #[test]
    fn test_dictionary_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LanguageDictionary::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_dictionary_load_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DICTIONARY_FILE), "\n\n").unwrap();
        assert!(matches!(
            LanguageDictionary::load(dir.path()),
            Err(ClassifierError::Dictionary(_))
        ));
    }

    #[test]
    fn test_dictionary_vocabulary_mismatch() {
        // Three-letter codes against two-letter model labels
        let dictionary = LanguageDictionary::parse("eng 1\nfra 1\n");
        let result = dictionary.check_vocabulary(["en", "fr", "de", "zh"]);
        assert!(matches!(result, Err(ClassifierError::Dictionary(_))));
    }

    #[test]
    fn test_dictionary_vocabulary_partial_match() {
        let dictionary = LanguageDictionary::parse("en 1\nfr 1\nxx 1\n");
        assert_eq!(dictionary.check_vocabulary(["en", "fr", "de", "zh"]).unwrap(), 2);
    }
}
