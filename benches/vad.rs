//! Benchmarks for voice activity scoring and segment selection

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use audio_lid::{
    EnergyVoiceActivityModel, SampleBuffer, SegmenterConfig, SpeechSegmenter, VadConfig,
    VoiceActivityModel,
};

const SAMPLE_RATE: u32 = 16000;

fn generate_speech_like_audio(duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            // Syllable-rate envelope over a voiced carrier
            let envelope = 0.5 + 0.5 * (2.0 * std::f32::consts::PI * 3.0 * t).sin();
            amplitude * envelope * (2.0 * std::f32::consts::PI * 500.0 * t).sin()
        })
        .collect()
}

fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.001; num_samples]
}

/// Alternating 10s stretches of silence and speech
fn generate_recording(duration_secs: usize) -> SampleBuffer {
    let mut audio = Vec::new();
    for i in 0..duration_secs / 10 {
        if i % 2 == 0 {
            audio.extend(generate_silence(10.0));
        } else {
            audio.extend(generate_speech_like_audio(10.0, 0.4));
        }
    }
    SampleBuffer::from_16khz(audio)
}

fn bench_energy_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("energy_model");
    let config = VadConfig::default();

    for secs in [1.0f32, 3.0, 5.0] {
        let speech = generate_speech_like_audio(secs, 0.3);
        group.bench_with_input(BenchmarkId::new("speech", secs), &speech, |b, window| {
            let mut model = EnergyVoiceActivityModel::new(&config).unwrap();
            b.iter(|| black_box(model.score(black_box(window), SAMPLE_RATE).unwrap()))
        });
    }

    let silence = generate_silence(5.0);
    group.bench_function("silence_5s", |b| {
        let mut model = EnergyVoiceActivityModel::new(&config).unwrap();
        b.iter(|| black_box(model.score(black_box(&silence), SAMPLE_RATE).unwrap()))
    });

    group.finish();
}

fn bench_segmenter(c: &mut Criterion) {
    let mut group = c.benchmark_group("speech_segmenter");
    group.sample_size(20);

    for minutes in [2usize, 5] {
        let buffer = generate_recording(minutes * 60);
        group.bench_with_input(BenchmarkId::new("minutes", minutes), &buffer, |b, buffer| {
            b.iter_with_setup(
                || {
                    let model = EnergyVoiceActivityModel::new(&VadConfig::default()).unwrap();
                    SpeechSegmenter::new(model, SegmenterConfig::default())
                },
                |mut segmenter| black_box(segmenter.find_speech_segments(buffer, 0.7, 5.0).unwrap()),
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_energy_model, bench_segmenter);
criterion_main!(benches);
