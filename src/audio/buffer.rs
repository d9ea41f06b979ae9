//! Decoded audio held in memory for segmentation

use crate::config::TARGET_SAMPLE_RATE;

/// Mono audio samples normalized to [-1.0, 1.0] at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Wrap samples recorded at `sample_rate`
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Wrap samples already at the pipeline rate (16 kHz)
    pub fn from_16khz(samples: Vec<f32>) -> Self {
        Self::new(samples, TARGET_SAMPLE_RATE)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the duration of the audio (seconds)
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Convert a time offset to a sample index
    pub fn seconds_to_samples(&self, seconds: f32) -> usize {
        (seconds.max(0.0) * self.sample_rate as f32).round() as usize
    }

    /// Convert a sample index to a time offset
    pub fn samples_to_seconds(&self, samples: usize) -> f32 {
        samples as f32 / self.sample_rate as f32
    }

    /// Borrow `len` samples starting at sample `start`, if fully inside the buffer
    pub fn window(&self, start: usize, len: usize) -> Option<&[f32]> {
        let end = start.checked_add(len)?;
        self.samples.get(start..end)
    }

    /// Consume the buffer, returning the raw samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Convert normalized samples to 16-bit PCM, clamping out-of-range values
pub fn to_i16_samples(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect()
}
