//! Oversampling
//!
//! A nonlinear stage like a waveshaper creates harmonics far above the
//! input. Anything past Nyquist folds back down as inharmonic aliasing:
//! at 48 kHz the 9th harmonic of a 5 kHz tone (45 kHz) lands on 3 kHz.
//!
//! Running the nonlinearity at 4x the sample rate moves Nyquist up to 96 kHz,
//! and the harmonics between 24 and 96 kHz are filtered out before coming
//! back down:
//!
//!   input → zero-stuff ×4 → low-pass → f(x) → low-pass → keep every 4th
//!
//! Both low-passes are 4th-order Butterworth (two cascaded biquads) with the
//! corner at 0.45 · the base sample rate. Zero-stuffing spreads each input
//! sample's energy over four slots, so it is scaled by 4 to keep unity gain.

use super::biquad::{Biquad, BiquadKind};

pub const FACTOR: usize = 4;

// Q of the two sections of a 4th-order Butterworth
const BUTTERWORTH_Q: [f32; 2] = [0.5412, 1.3066];

#[derive(Debug, Clone)]
pub struct Oversampler {
    up: [Biquad; 2],
    down: [Biquad; 2],
}

impl Oversampler {
    pub fn new(sample_rate: f32) -> Self {
        let fast = sample_rate * FACTOR as f32;
        let corner = sample_rate * 0.45;
        let section = |q| Biquad::new(BiquadKind::LowPass, corner, q, 0.0, fast);
        Self {
            up: BUTTERWORTH_Q.map(section),
            down: BUTTERWORTH_Q.map(section),
        }
    }

    /// Run `stage` at the oversampled rate and return one base-rate sample.
    #[inline]
    pub fn process(&mut self, input: f32, mut stage: impl FnMut(f32) -> f32) -> f32 {
        let mut out = 0.0;
        for k in 0..FACTOR {
            let stuffed = if k == 0 { input * FACTOR as f32 } else { 0.0 };
            let first = self.up[0].process(stuffed);
            let x = self.up[1].process(first);
            let first = self.down[0].process(stage(x));
            out = self.down[1].process(first);
        }
        out
    }

    pub fn reset(&mut self) {
        for biquad in self.up.iter_mut().chain(self.down.iter_mut()) {
            biquad.reset();
        }
    }
}
