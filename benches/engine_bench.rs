//! Benchmarks for the synth engine.
//!
//! Run with: cargo bench
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - synth/*    Single voices, allocator churn, a full engine render
//!   - effects/*  The effects chain with every effect enabled

use criterion::{criterion_group, criterion_main};

mod effects;
mod synth;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

pub const SAMPLE_RATE: f32 = 48_000.0;

criterion_group!(
    benches,
    synth::bench_voice,
    synth::bench_allocator_churn,
    synth::bench_engine,
    effects::bench_effects_chain,
);
criterion_main!(benches);
