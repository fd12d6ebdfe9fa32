//! Voice, allocator and whole-engine benchmarks.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use nightdrive::synth::{OscillatorUpdate, VoiceAllocator, VoiceParams, VoiceParamsUpdate};
use nightdrive::synth::Voice;
use nightdrive::{Engine, EngineConfig};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_voice(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth/voice");
    let params = VoiceParams::default();

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Default patch: one sawtooth chain, osc2 disabled
        let mut voice = Voice::new(SAMPLE_RATE, &params);
        voice.trigger(110.0, 100, 45, 0.0);
        let mut now = 0.0;
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                buffer.fill(0.0);
                voice.render(black_box(&mut buffer), now);
                now += size as f64 / SAMPLE_RATE as f64;
            })
        });

        // Detune is re-evaluated per sample while it glides
        let mut gliding = Voice::new(SAMPLE_RATE, &params);
        gliding.trigger(110.0, 100, 45, 0.0);
        let mut now = 0.0;
        let mut flip = false;
        group.bench_with_input(BenchmarkId::new("detune_glide", size), &size, |b, _| {
            b.iter(|| {
                flip = !flip;
                let update = VoiceParamsUpdate {
                    osc1: Some(OscillatorUpdate {
                        detune: Some(if flip { 25.0 } else { -25.0 }),
                        ..Default::default()
                    }),
                    ..Default::default()
                };
                gliding.update_params(&update, now);
                buffer.fill(0.0);
                gliding.render(black_box(&mut buffer), now);
                now += size as f64 / SAMPLE_RATE as f64;
            })
        });
    }

    group.finish();
}

pub fn bench_allocator_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth/allocator");
    let params = VoiceParams::default();

    // Twelve notes into eight voices forces steals every block
    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        let mut allocator = VoiceAllocator::new(8, SAMPLE_RATE, &params);
        let mut now = 0.0;
        let mut note = 48u8;

        group.bench_with_input(BenchmarkId::new("churn", size), &size, |b, _| {
            b.iter(|| {
                allocator.note_on(black_box(note), 100, now);
                allocator.note_off(note.wrapping_sub(3).max(48), now);
                note = if note >= 59 { 48 } else { note + 1 };

                allocator.poll(now);
                buffer.fill(0.0);
                allocator.render(&mut buffer, now);
                now += size as f64 / SAMPLE_RATE as f64;
            })
        });
    }

    group.finish();
}

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth/engine");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        let mut engine = Engine::new(EngineConfig::default()).expect("default config is valid");
        engine.start_sequencer();
        for note in [48, 52, 55] {
            engine.note_on(note, 90);
        }

        group.bench_with_input(BenchmarkId::new("sequencer_plus_chord", size), &size, |b, _| {
            b.iter(|| {
                engine.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
