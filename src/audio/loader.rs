//! Audio source loading

use std::path::Path;

use tracing::{debug, info};

use crate::audio::buffer::SampleBuffer;
use crate::audio::preprocessing::{downmix, resample};
use crate::config::TARGET_SAMPLE_RATE;
use crate::error::LoadError;

/// Turns an audio source identifier into a 16 kHz mono buffer
pub trait AudioLoader {
    fn load(&self, source: &str) -> Result<SampleBuffer, LoadError>;
}

impl<L: AudioLoader + ?Sized> AudioLoader for Box<L> {
    fn load(&self, source: &str) -> Result<SampleBuffer, LoadError> {
        (**self).load(source)
    }
}

/// Loads local WAV files, downmixing and resampling to 16 kHz
///
/// Remote URLs and compressed containers (mp3, mp4) must be fetched and
/// decoded by the caller first.
#[derive(Debug, Clone, Default)]
pub struct WavFileLoader;

impl WavFileLoader {
    pub fn new() -> Self {
        Self
    }
}

impl AudioLoader for WavFileLoader {
    fn load(&self, source: &str) -> Result<SampleBuffer, LoadError> {
        if is_remote(source) {
            return Err(LoadError::UnsupportedSource(format!(
                "{} (remote sources must be downloaded first)",
                source
            )));
        }

        let path = Path::new(source);
        if !path.exists() {
            return Err(LoadError::NotFound(source.to_string()));
        }

        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);
        if !is_wav {
            return Err(LoadError::UnsupportedSource(format!(
                "{} (only WAV input is decoded; convert mp3/mp4 first)",
                source
            )));
        }

        info!("Loading audio: {}", path.display());

        let mut reader = hound::WavReader::open(path).map_err(|e| LoadError::Decode(e.to_string()))?;
        let spec = reader.spec();
        debug!(
            "WAV format: {} channels, {} Hz, {} bits",
            spec.channels, spec.sample_rate, spec.bits_per_sample
        );

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| LoadError::Decode(e.to_string()))?,
            hound::SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / max_val))
                    .collect::<Result<_, _>>()
                    .map_err(|e| LoadError::Decode(e.to_string()))?
            }
        };

        let mono = downmix(&samples, spec.channels as usize);
        let resampled = resample(&mono, spec.sample_rate, TARGET_SAMPLE_RATE)?;
        if resampled.is_empty() {
            return Err(LoadError::Empty);
        }

        let buffer = SampleBuffer::from_16khz(resampled);
        info!(
            "Loaded {} samples ({:.2}s)",
            buffer.len(),
            buffer.duration()
        );
        Ok(buffer)
    }
}

fn is_remote(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_rejects_remote_source() {
        let result = WavFileLoader::new().load("http://example.com/video.mp4");
        assert!(matches!(result, Err(LoadError::UnsupportedSource(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = WavFileLoader::new().load("/nonexistent/audio.wav");
        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }

    #[test]
    fn test_rejects_non_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp3");
        std::fs::write(&path, b"ID3").unwrap();

        let result = WavFileLoader::new().load(path.to_str().unwrap());
        assert!(matches!(result, Err(LoadError::UnsupportedSource(_))));
    }

    #[test]
    fn test_loads_16khz_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        write_wav(&path, 16000, 1, &[0, 16384, -16384, 32767]);

        let buffer = WavFileLoader::new().load(path.to_str().unwrap()).unwrap();
        assert_eq!(buffer.sample_rate(), 16000);
        assert_eq!(buffer.len(), 4);
        assert!((buffer.samples()[1] - 0.5).abs() < 1e-4);
        assert!((buffer.samples()[2] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_downmixes_and_resamples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // One second of stereo audio at 32 kHz
        let samples: Vec<i16> = (0..64000).map(|i| if i % 2 == 0 { 1000 } else { -1000 }).collect();
        write_wav(&path, 32000, 2, &samples);

        let buffer = WavFileLoader::new().load(path.to_str().unwrap()).unwrap();
        assert_eq!(buffer.sample_rate(), 16000);
        assert_eq!(buffer.len(), 16000);
        assert!(buffer.samples().iter().all(|s| s.abs() < 0.01));
    }

    #[test]
    fn test_empty_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, 16000, 1, &[]);

        let result = WavFileLoader::new().load(path.to_str().unwrap());
        assert!(matches!(result, Err(LoadError::Empty)));
    }
}
