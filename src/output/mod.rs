//! Result formatting and debug artifact writing

pub mod formats;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::audio::{to_i16_samples, SpeechSegment};
use crate::lid::LanguageScore;

pub use formats::{format_json, format_predictions, format_segment, format_text};

/// Manifest listing the segment WAV files
pub const MANIFEST_TSV: &str = "manifest.tsv";
/// Manifest assigning a placeholder label to each segment
pub const MANIFEST_LANG: &str = "manifest.lang";
/// Final status and result
pub const PREDICTIONS_FILE: &str = "predictions.txt";

const PLACEHOLDER_LABEL: &str = "eng";

/// Writes intermediate segments, manifests and predictions for inspection
pub struct DebugWriter {
    dir: PathBuf,
}

impl DebugWriter {
    /// Create a writer for `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save each segment as `index_{n}.wav` (n from 1) and write both manifests
    ///
    /// Returns the absolute paths of the WAV files in segment order.
    pub fn write_segments(&self, segments: &[SpeechSegment]) -> io::Result<Vec<PathBuf>> {
        info!("Saving {} audio segments and manifests to {}", segments.len(), self.dir.display());
        std::fs::create_dir_all(&self.dir)?;

        let mut paths = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            debug!(
                "Segment {}: start {:.2}s, duration {:.2}s, score {:.3}",
                i + 1,
                segment.start,
                segment.duration,
                segment.score
            );
            let path = self.dir.join(format!("index_{}.wav", i + 1));
            write_wav(&path, &segment.samples, segment.sample_rate)?;
            paths.push(std::fs::canonicalize(&path)?);
        }

        let mut tsv = File::create(self.dir.join(MANIFEST_TSV))?;
        writeln!(tsv, "/")?;
        for (path, segment) in paths.iter().zip(segments) {
            writeln!(tsv, "{}\t{}", path.display(), segment.sample_rate)?;
        }
        tsv.flush()?;

        let mut lang = File::create(self.dir.join(MANIFEST_LANG))?;
        for _ in &paths {
            writeln!(lang, "{}\t1", PLACEHOLDER_LABEL)?;
        }
        lang.flush()?;

        Ok(paths)
    }

    /// Write `predictions.txt` with the status code and result list
    pub fn write_predictions(
        &self,
        status: i32,
        languages: Option<&[LanguageScore]>,
    ) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(PREDICTIONS_FILE);
        std::fs::write(&path, format_predictions(status, languages))?;
        debug!("Predictions written to {}", path.display());
        Ok(path)
    }
}

/// Write mono 16-bit PCM
fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> io::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(hound_to_io)?;
    for sample in to_i16_samples(samples) {
        writer.write_sample(sample).map_err(hound_to_io)?;
    }
    writer.finalize().map_err(hound_to_io)
}

fn hound_to_io(e: hound::Error) -> io::Error {
    match e {
        hound::Error::IoError(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(index: usize, len: usize) -> SpeechSegment {
        SpeechSegment {
            index,
            start: 60.0 + index as f32 * 5.0,
            duration: len as f32 / 16000.0,
            samples: vec![0.25; len],
            sample_rate: 16000,
            score: 0.9,
        }
    }

    #[test]
    fn test_write_segments_and_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DebugWriter::new(dir.path().join("debug"));
        assert!(!writer.dir().exists());

        let paths = writer
            .write_segments(&[segment(0, 1600), segment(1, 800)])
            .unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.is_absolute()));
        assert!(paths[0].ends_with("index_1.wav"));
        assert!(paths[1].ends_with("index_2.wav"));

        let reader = hound::WavReader::open(&paths[1]).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.len(), 800);

        let tsv = std::fs::read_to_string(writer.dir().join(MANIFEST_TSV)).unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], "/");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], format!("{}\t16000", paths[0].display()));

        let lang = std::fs::read_to_string(writer.dir().join(MANIFEST_LANG)).unwrap();
        assert_eq!(lang, "eng\t1\neng\t1\n");
    }

    #[test]
    fn test_write_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DebugWriter::new(dir.path().join("nested").join("debug"));
        let languages = vec![LanguageScore {
            language: "eng".to_string(),
            percentage: 100.0,
        }];

        let path = writer.write_predictions(2, Some(languages.as_slice())).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "ret:2\n[[\"eng\",100.0]]\n");
    }

    #[test]
    fn test_segments_keep_their_sample_rate() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DebugWriter::new(dir.path());
        let mut low_rate = segment(0, 800);
        low_rate.sample_rate = 8000;

        let paths = writer.write_segments(&[low_rate]).unwrap();
        let reader = hound::WavReader::open(&paths[0]).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);

        let tsv = std::fs::read_to_string(writer.dir().join(MANIFEST_TSV)).unwrap();
        assert!(tsv.lines().nth(1).unwrap().ends_with("index_1.wav\t8000"));
    }
}
