//! Voice activity scoring and speech segment selection

use tracing::{debug, trace};

use crate::audio::buffer::SampleBuffer;
use crate::audio::preprocessing::SpeechBandFilter;
use crate::config::{SegmenterConfig, VadConfig, TARGET_SAMPLE_RATE};
use crate::error::{DetectError, LidError, Result};

/// Scores how likely a window of audio contains speech
pub trait VoiceActivityModel {
    /// Speech probability of `window` in [0.0, 1.0]
    fn score(&mut self, window: &[f32], sample_rate: u32) -> std::result::Result<f32, DetectError>;
}

impl<V: VoiceActivityModel + ?Sized> VoiceActivityModel for Box<V> {
    fn score(&mut self, window: &[f32], sample_rate: u32) -> std::result::Result<f32, DetectError> {
        (**self).score(window, sample_rate)
    }
}

/// Voice activity model using band-limited energy thresholding
///
/// The window is cut into short frames; a frame is speech when its RMS energy
/// in the voice band exceeds the absolute threshold or doubles the running
/// average. The score is the fraction of speech frames.
pub struct EnergyVoiceActivityModel {
    /// Energy threshold for speech frames
    threshold: f32,
    /// Analysis frame length (seconds)
    frame_duration: f32,
    /// Voice band filter, built for `filter_rate`
    filter: SpeechBandFilter,
    filter_rate: u32,
    config: VadConfig,
    /// Running average of energy for adaptive threshold
    energy_avg: f32,
    /// Smoothing factor for energy average
    energy_alpha: f32,
}

impl EnergyVoiceActivityModel {
    /// Create a new model for 16 kHz input
    pub fn new(config: &VadConfig) -> std::result::Result<Self, DetectError> {
        Ok(Self {
            threshold: config.energy_threshold,
            frame_duration: config.frame_duration,
            filter: SpeechBandFilter::new(config, TARGET_SAMPLE_RATE)?,
            filter_rate: TARGET_SAMPLE_RATE,
            config: config.clone(),
            energy_avg: 0.0,
            energy_alpha: 0.01, // Slow adaptation
        })
    }

    fn is_speech_frame(&mut self, frame: &[f32]) -> bool {
        let energy = calculate_energy(frame);

        self.energy_avg = self.energy_alpha * energy + (1.0 - self.energy_alpha) * self.energy_avg;

        energy > self.threshold || (self.energy_avg > 0.001 && energy > self.energy_avg * 2.0)
    }

    /// Get the current energy average
    pub fn energy_average(&self) -> f32 {
        self.energy_avg
    }
}

impl VoiceActivityModel for EnergyVoiceActivityModel {
    fn score(&mut self, window: &[f32], sample_rate: u32) -> std::result::Result<f32, DetectError> {
        if window.is_empty() {
            return Ok(0.0);
        }

        if sample_rate != self.filter_rate {
            self.filter = SpeechBandFilter::new(&self.config, sample_rate)?;
            self.filter_rate = sample_rate;
        }

        // Windows are scored independently
        self.filter.reset();
        self.energy_avg = 0.0;

        let filtered = self.filter.apply(window);
        let frame_size = ((self.frame_duration * sample_rate as f32) as usize).max(1);

        let mut frames = 0usize;
        let mut speech_frames = 0usize;
        for frame in filtered.chunks(frame_size) {
            frames += 1;
            if self.is_speech_frame(frame) {
                speech_frames += 1;
            }
        }

        let score = speech_frames as f32 / frames as f32;
        trace!("VAD: {}/{} speech frames (score {:.3})", speech_frames, frames, score);
        Ok(score)
    }
}

/// Calculate RMS energy of audio samples
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Window of audio selected as likely speech
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSegment {
    /// Position in selection order, starting at 0
    pub index: usize,
    /// Start time in seconds
    pub start: f32,
    /// Duration in seconds
    pub duration: f32,
    /// Audio samples
    pub samples: Vec<f32>,
    /// Sample rate of `samples`
    pub sample_rate: u32,
    /// Voice activity score of the window
    pub score: f32,
}

impl SpeechSegment {
    /// End time in seconds
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }
}

/// Scans a buffer for speech windows scored by a [`VoiceActivityModel`]
pub struct SpeechSegmenter<V> {
    model: V,
    config: SegmenterConfig,
}

impl<V: VoiceActivityModel> SpeechSegmenter<V> {
    /// Create a new speech segmenter
    pub fn new(model: V, config: SegmenterConfig) -> Self {
        Self { model, config }
    }

    /// Maximum number of segments a single scan returns
    pub fn max_segments(&self) -> usize {
        self.config.segment_count
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Find up to `segment_count` non-overlapping speech windows of
    /// `segment_duration` seconds scoring at least `score_threshold`
    ///
    /// Scanning starts at the parse start offset. A rejected window advances
    /// the scan by one hop, an accepted one by its whole length. Finding fewer
    /// segments than requested (even none) is not an error.
    pub fn find_speech_segments(
        &mut self,
        buffer: &SampleBuffer,
        score_threshold: f32,
        segment_duration: f32,
    ) -> Result<Vec<SpeechSegment>> {
        if !(0.0..=1.0).contains(&score_threshold) {
            return Err(LidError::invalid_argument("score_threshold", score_threshold));
        }
        if !(segment_duration > 0.0 && segment_duration.is_finite()) {
            return Err(LidError::invalid_argument("segment_duration", segment_duration));
        }

        let sample_rate = buffer.sample_rate();
        let window_len = buffer.seconds_to_samples(segment_duration);
        if window_len == 0 {
            return Err(LidError::invalid_argument("segment_duration", segment_duration));
        }
        let hop = buffer.seconds_to_samples(self.config.hop_duration).max(1);
        let mut position = (self.config.parse_start_offset.max(0.0) * sample_rate as f32).ceil() as usize;

        debug!(
            "Scanning {:.1}s of audio from {:.1}s: threshold {:.2}, duration {:.1}s, max {} segments",
            buffer.duration(),
            self.config.parse_start_offset,
            score_threshold,
            segment_duration,
            self.config.segment_count
        );

        let mut segments = Vec::new();
        while segments.len() < self.config.segment_count {
            let Some(window) = buffer.window(position, window_len) else {
                break;
            };

            let score = self.model.score(window, sample_rate)?;
            if !(0.0..=1.0).contains(&score) {
                return Err(DetectError::ScoreOutOfRange(score).into());
            }

            if score >= score_threshold {
                let segment = SpeechSegment {
                    index: segments.len(),
                    start: buffer.samples_to_seconds(position),
                    duration: buffer.samples_to_seconds(window_len),
                    samples: window.to_vec(),
                    sample_rate,
                    score,
                };
                trace!(
                    "Speech segment {}: {:.2}s - {:.2}s (score {:.3})",
                    segment.index,
                    segment.start,
                    segment.end(),
                    score
                );
                segments.push(segment);
                position += window_len;
            } else {
                position += hop;
            }
        }

        debug!("Found {} speech segments", segments.len());
        Ok(segments)
    }
}
