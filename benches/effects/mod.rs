//! Effects chain benchmarks.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use nightdrive::effects::{EffectsChain, EffectsParams};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_effects_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("effects/chain");

    let mut all_on = EffectsParams::default();
    all_on.reverb.enabled = true;
    all_on.distortion.enabled = true;
    all_on.chorus.enabled = true;
    all_on.eq.low_gain = 3.0;
    all_on.eq.high_gain = -3.0;

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / SAMPLE_RATE).sin() * 0.5)
            .collect();
        let mut buffer = input.clone();

        // EQ only, every slot bypassed
        let mut bypassed = EffectsChain::new(SAMPLE_RATE, &EffectsParams::default());
        let mut now = 0.0;
        group.bench_with_input(BenchmarkId::new("bypassed", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                bypassed.render(black_box(&mut buffer), now);
                now += size as f64 / SAMPLE_RATE as f64;
            })
        });

        let mut full = EffectsChain::new(SAMPLE_RATE, &all_on);
        let mut now = 0.0;
        group.bench_with_input(BenchmarkId::new("all_enabled", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                full.render(black_box(&mut buffer), now);
                now += size as f64 / SAMPLE_RATE as f64;
            })
        });
    }

    group.finish();
}
