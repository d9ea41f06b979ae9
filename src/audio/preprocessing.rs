//! Audio preprocessing - downmixing, resampling and speech-band filtering

use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type, Q_BUTTERWORTH_F32};
use rubato::{FftFixedIn, Resampler};
use tracing::debug;

use crate::config::VadConfig;
use crate::error::{DetectError, LoadError};

const RESAMPLER_CHUNK_SIZE: usize = 1024;

/// Average interleaved frames down to a single channel
pub fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Resample a complete mono signal from `source_rate` to `target_rate`
///
/// The tail is zero-padded to a whole resampler chunk and the output is
/// trimmed back to the expected length.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, LoadError> {
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    debug!("Resampling {} samples: {} Hz -> {} Hz", samples.len(), source_rate, target_rate);

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        RESAMPLER_CHUNK_SIZE,
        1, // sub-chunks
        1, // channels
    )
    .map_err(|e| LoadError::Resampling(e.to_string()))?;

    let expected_len =
        (samples.len() as f64 * target_rate as f64 / source_rate as f64).round() as usize;
    let mut output = Vec::with_capacity(expected_len + RESAMPLER_CHUNK_SIZE);
    let mut position = 0;

    while position < samples.len() {
        let frames_needed = resampler.input_frames_next();
        let end = (position + frames_needed).min(samples.len());
        let mut chunk = samples[position..end].to_vec();
        chunk.resize(frames_needed, 0.0);
        position = end;

        let result = resampler
            .process(&[chunk], None)
            .map_err(|e| LoadError::Resampling(e.to_string()))?;

        if let Some(resampled) = result.into_iter().next() {
            output.extend(resampled);
        }
    }

    output.truncate(expected_len);
    Ok(output)
}

/// High-pass plus low-pass filter pair restricting audio to the voice band
pub struct SpeechBandFilter {
    high_pass: Option<DirectForm1<f32>>,
    low_pass: Option<DirectForm1<f32>>,
}

impl SpeechBandFilter {
    /// Build the filter pair; a cutoff of zero disables that side
    pub fn new(config: &VadConfig, sample_rate: u32) -> Result<Self, DetectError> {
        let high_pass = if config.high_pass_cutoff > 0.0 {
            let coeffs = Coefficients::<f32>::from_params(
                Type::HighPass,
                sample_rate.hz(),
                config.high_pass_cutoff.hz(),
                Q_BUTTERWORTH_F32,
            )
            .map_err(|e| DetectError::Filter(format!("High-pass filter error: {:?}", e)))?;
            Some(DirectForm1::<f32>::new(coeffs))
        } else {
            None
        };

        let low_pass = if config.low_pass_cutoff > 0.0 {
            let coeffs = Coefficients::<f32>::from_params(
                Type::LowPass,
                sample_rate.hz(),
                config.low_pass_cutoff.hz(),
                Q_BUTTERWORTH_F32,
            )
            .map_err(|e| DetectError::Filter(format!("Low-pass filter error: {:?}", e)))?;
            Some(DirectForm1::<f32>::new(coeffs))
        } else {
            None
        };

        Ok(Self {
            high_pass,
            low_pass,
        })
    }

    /// Filter a block of samples, carrying filter state across calls
    pub fn apply(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut output = samples.to_vec();

        if let Some(ref mut filter) = self.high_pass {
            for sample in output.iter_mut() {
                *sample = filter.run(*sample);
            }
        }

        if let Some(ref mut filter) = self.low_pass {
            for sample in output.iter_mut() {
                *sample = filter.run(*sample);
            }
        }

        output
    }

    /// Reset filter states
    pub fn reset(&mut self) {
        if let Some(ref mut filter) = self.high_pass {
            filter.reset_state();
        }
        if let Some(ref mut filter) = self.low_pass {
            filter.reset_state();
        }
    }
}
