use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Waveforms
=========

  Sine       fundamental only, pure and hollow
  Triangle   odd harmonics falling off as 1/n², soft
  Sawtooth   every harmonic falling off as 1/n, bright and buzzy
  Square     odd harmonics falling off as 1/n, woody

Sawtooth and square have hard discontinuities. Rendering them naively aliases
badly above a few hundred Hz, so both get a PolyBLEP correction: a two-sample
polynomial residual subtracted around every jump, which removes most of the
fold-over at the cost of a couple of multiplies.

Phase runs 0.0..1.0 and is wrapped every sample; frequency is supplied per
sample so detune glides do not need a separate code path.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    Sine,
    Triangle,
    #[default]
    Sawtooth,
    Square,
}

/// A single running waveform generator.
#[derive(Debug, Clone)]
pub struct OscillatorBlock {
    waveform: Waveform,
    phase: f32,
}

impl OscillatorBlock {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Waveform changes are instantaneous and keep the current phase.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let dt = (frequency / sample_rate).clamp(0.0, 0.5);
        let t = self.phase;

        let sample = match self.waveform {
            Waveform::Sine => (TAU * t).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (t - 0.5).abs(),
            Waveform::Sawtooth => (2.0 * t - 1.0) - poly_blep(t, dt),
            Waveform::Square => {
                let naive = if t < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(t, dt) - poly_blep((t + 0.5).fract(), dt)
            }
        };

        self.phase += dt;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return 0.0;
    }
    if t < dt {
        let x = t / dt;
        x + x - x * x - 1.0
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt;
        x * x + x + x + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn sine_matches_reference() {
        let mut osc = OscillatorBlock::new(Waveform::Sine);
        let samples: Vec<f32> = (0..32).map(|_| osc.next_sample(440.0, SAMPLE_RATE)).collect();

        let index = 12;
        let expected = (TAU * 440.0 * index as f32 / SAMPLE_RATE).sin();
        assert!(
            (samples[index] - expected).abs() < 1e-4,
            "expected {expected}, got {}",
            samples[index]
        );
    }

    #[test]
    fn every_waveform_stays_in_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Triangle,
            Waveform::Sawtooth,
            Waveform::Square,
        ] {
            let mut osc = OscillatorBlock::new(waveform);
            for _ in 0..4_800 {
                let s = osc.next_sample(1_234.0, SAMPLE_RATE);
                assert!(s.abs() <= 1.05, "{waveform:?} produced {s}");
            }
        }
    }

    #[test]
    fn square_averages_to_zero() {
        let mut osc = OscillatorBlock::new(Waveform::Square);
        // 100 Hz at 48 kHz: 480 samples per cycle, render ten cycles
        let sum: f32 = (0..4_800).map(|_| osc.next_sample(100.0, SAMPLE_RATE)).sum();
        assert!((sum / 4_800.0).abs() < 0.01);
    }
}
