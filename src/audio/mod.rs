//! Audio loading, preprocessing and speech segment selection

pub mod buffer;
pub mod loader;
pub mod preprocessing;
pub mod vad;

pub use buffer::{to_i16_samples, SampleBuffer};
pub use loader::{AudioLoader, WavFileLoader};
pub use preprocessing::SpeechBandFilter;
pub use vad::{EnergyVoiceActivityModel, SpeechSegment, SpeechSegmenter, VoiceActivityModel};
