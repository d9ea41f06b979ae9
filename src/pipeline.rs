//! Language identification pipeline: load, segment, classify, aggregate

use tracing::{debug, info, warn};

use crate::audio::{
    AudioLoader, EnergyVoiceActivityModel, SampleBuffer, SpeechSegment, SpeechSegmenter,
    VoiceActivityModel, WavFileLoader,
};
use crate::config::{Config, SegmenterConfig};
use crate::error::{ClassifierError, Result};
use crate::lid::{Aggregation, LanguageClassifier, LanguageResult, ScoreAggregator, SegmentPredictionBatch};
use crate::output::DebugWriter;

const RETRY_THRESHOLD_STEP: f32 = 0.2;
const RETRY_MIN_THRESHOLD: f32 = 0.4;
const RETRY_DURATION_STEP: f32 = 2.0;
const RETRY_MIN_DURATION: f32 = 3.0;

/// Threshold and window length of one segmentation pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub score_threshold: f32,
    pub segment_duration: f32,
}

impl SearchParams {
    pub fn from_config(config: &SegmenterConfig) -> Self {
        Self {
            score_threshold: config.score_threshold,
            segment_duration: config.segment_duration,
        }
    }

    /// Parameters of the single retry pass: a lower threshold and shorter
    /// windows, each clamped to a floor
    pub fn relaxed(&self) -> Self {
        Self {
            score_threshold: (self.score_threshold - RETRY_THRESHOLD_STEP).max(RETRY_MIN_THRESHOLD),
            segment_duration: (self.segment_duration - RETRY_DURATION_STEP).max(RETRY_MIN_DURATION),
        }
    }
}

/// Segments selected for classification
#[derive(Debug, Clone)]
pub struct SegmentSearch {
    pub segments: Vec<SpeechSegment>,
    /// Parameters of the pass that produced `segments`
    pub params: SearchParams,
    pub retried: bool,
}

/// Outcome of a successful identification
#[derive(Debug, Clone)]
pub struct Identification {
    pub aggregation: Aggregation,
    /// Number of segments sent to the classifier
    pub segment_count: usize,
    pub retried: bool,
    pub predictions: SegmentPredictionBatch,
}

impl Identification {
    /// Non-negative status code: the number of valid classifier signals
    pub fn status_code(&self) -> i32 {
        self.aggregation.status_code()
    }

    pub fn languages(&self) -> &LanguageResult {
        &self.aggregation.languages
    }

    pub fn into_languages(self) -> LanguageResult {
        self.aggregation.languages
    }
}

/// Run the segmenter, then once more with [`SearchParams::relaxed`] when the
/// first pass found fewer segments than the configured count
///
/// A failed first pass is returned as is. The second pass result is final,
/// however few segments it yields.
pub fn find_segments_with_retry<V: VoiceActivityModel>(
    segmenter: &mut SpeechSegmenter<V>,
    buffer: &SampleBuffer,
    params: SearchParams,
) -> Result<SegmentSearch> {
    let target = segmenter.max_segments();

    let segments =
        segmenter.find_speech_segments(buffer, params.score_threshold, params.segment_duration)?;
    info!("Find speech result: {} of {} segments", segments.len(), target);

    if segments.len() >= target {
        return Ok(SegmentSearch {
            segments,
            params,
            retried: false,
        });
    }

    let relaxed = params.relaxed();
    debug!(
        "Retrying segmentation: threshold {:.2} -> {:.2}, duration {:.1}s -> {:.1}s",
        params.score_threshold,
        relaxed.score_threshold,
        params.segment_duration,
        relaxed.segment_duration
    );
    let segments =
        segmenter.find_speech_segments(buffer, relaxed.score_threshold, relaxed.segment_duration)?;
    info!("Retry find speech result: {} of {} segments", segments.len(), target);

    Ok(SegmentSearch {
        segments,
        params: relaxed,
        retried: true,
    })
}

/// Spoken language identification over a whole audio source
///
/// Runs synchronously: every stage completes before the next one starts.
pub struct AudioLid<L, V, C> {
    loader: L,
    segmenter: SpeechSegmenter<V>,
    classifier: C,
    aggregator: ScoreAggregator,
    params: SearchParams,
    debug_writer: Option<DebugWriter>,
}

impl<C: LanguageClassifier> AudioLid<WavFileLoader, EnergyVoiceActivityModel, C> {
    /// Pipeline with the WAV loader and the energy voice activity model
    pub fn with_defaults(config: &Config, classifier: C) -> Result<Self> {
        let vad = EnergyVoiceActivityModel::new(&config.vad)?;
        Self::new(config, WavFileLoader::new(), vad, classifier)
    }
}

impl<L, V, C> AudioLid<L, V, C>
where
    L: AudioLoader,
    V: VoiceActivityModel,
    C: LanguageClassifier,
{
    /// Assemble a pipeline from its collaborators
    pub fn new(config: &Config, loader: L, vad: V, classifier: C) -> Result<Self> {
        config.validate()?;

        if let Some(ref denoise) = config.model.denoise_model {
            warn!(
                "Denoise model {} is not supported and will be ignored",
                denoise.display()
            );
        }

        let debug_writer = config
            .output
            .debug
            .then(|| DebugWriter::new(&config.output.output_path));

        Ok(Self {
            loader,
            segmenter: SpeechSegmenter::new(vad, config.segmenter.clone()),
            classifier,
            aggregator: ScoreAggregator::new(config.classifier.min_valid_score),
            params: SearchParams::from_config(&config.segmenter),
            debug_writer,
        })
    }

    /// Identify the languages spoken in `source`
    ///
    /// In debug mode `predictions.txt` records the status of every run,
    /// failed loads included.
    pub fn infer_language(&mut self, source: &str) -> Result<Identification> {
        let result = match self.loader.load(source) {
            Ok(buffer) => self.run(&buffer),
            Err(e) => Err(e.into()),
        };
        self.record(result)
    }

    /// Status-code form of [`Self::infer_language`]: a non-negative signal
    /// count with the ranked languages, or a negative error code and `None`
    pub fn infer_language_with_status(&mut self, source: &str) -> (i32, Option<LanguageResult>) {
        match self.infer_language(source) {
            Ok(identification) => (identification.status_code(), Some(identification.into_languages())),
            Err(e) => {
                warn!("Language identification failed: {}", e);
                (e.status_code(), None)
            }
        }
    }

    /// Identify the languages spoken in an already loaded buffer
    pub fn identify_buffer(&mut self, buffer: &SampleBuffer) -> Result<Identification> {
        let result = self.run(buffer);
        self.record(result)
    }

    /// Select speech segments, retrying once when too few were found
    pub fn find_segments(&mut self, buffer: &SampleBuffer) -> Result<SegmentSearch> {
        find_segments_with_retry(&mut self.segmenter, buffer, self.params)
    }

    fn run(&mut self, buffer: &SampleBuffer) -> Result<Identification> {
        let search = self.find_segments(buffer)?;

        if let Some(ref writer) = self.debug_writer {
            if !search.segments.is_empty() {
                writer.write_segments(&search.segments)?;
            }
        }

        self.classify_and_aggregate(search)
    }

    /// Write `predictions.txt` in debug mode
    ///
    /// A write failure after a failed run is logged; the run's error wins.
    fn record(&self, result: Result<Identification>) -> Result<Identification> {
        let Some(ref writer) = self.debug_writer else {
            return result;
        };

        let written = match &result {
            Ok(identification) => writer.write_predictions(
                identification.status_code(),
                Some(identification.languages().as_slice()),
            ),
            Err(e) => writer.write_predictions(e.status_code(), None),
        };

        match (written, result) {
            (Ok(_), result) => result,
            (Err(e), Ok(_)) => Err(e.into()),
            (Err(write_error), Err(e)) => {
                warn!("Failed to write predictions: {}", write_error);
                Err(e)
            }
        }
    }

    fn classify_and_aggregate(&mut self, search: SegmentSearch) -> Result<Identification> {
        let predictions = if search.segments.is_empty() {
            warn!("No speech found, skipping classification");
            SegmentPredictionBatch::new()
        } else {
            let batch: Vec<&[f32]> = search.segments.iter().map(|s| s.samples.as_slice()).collect();
            let predictions = self.classifier.infer(&batch)?;
            if predictions.len() != batch.len() {
                return Err(ClassifierError::BatchMismatch {
                    expected: batch.len(),
                    got: predictions.len(),
                }
                .into());
            }
            debug!("Raw predictions: {:?}", predictions);
            predictions
        };

        let aggregation = self.aggregator.aggregate(&predictions)?;
        info!(
            "Identified {} languages from {} valid predictions",
            aggregation.languages.len(),
            aggregation.valid_count
        );

        Ok(Identification {
            aggregation,
            segment_count: search.segments.len(),
            retried: search.retried,
            predictions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relaxed_defaults() {
        let params = SearchParams::from_config(&SegmenterConfig::default());
        let relaxed = params.relaxed();
        assert!((relaxed.score_threshold - 0.5).abs() < 1e-6);
        assert!((relaxed.segment_duration - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_relaxed_floors() {
        let params = SearchParams {
            score_threshold: 0.5,
            segment_duration: 4.0,
        };
        let relaxed = params.relaxed();
        assert_eq!(relaxed.score_threshold, 0.4);
        assert_eq!(relaxed.segment_duration, 3.0);
    }

    #[test]
    fn test_relaxed_large_values() {
        let params = SearchParams {
            score_threshold: 0.9,
            segment_duration: 10.0,
        };
        let relaxed = params.relaxed();
        assert!((relaxed.score_threshold - 0.7).abs() < 1e-6);
        assert!((relaxed.segment_duration - 8.0).abs() < 1e-6);
    }
}
