use log::trace;

use super::params::{EqParams, EqUpdate};
use super::slot::MIX_TIME_CONSTANT;
use crate::dsp::biquad::{Biquad, BiquadKind};
use crate::dsp::param::AutomatedParam;

/*
Three-band EQ
=============

  low shelf   320 Hz
  peaking     mid_freq, Q = 1
  high shelf  3200 Hz

The EQ is not an effect slot: the three stages are always in the signal path.
Disabling it glides every band gain to 0 dB, where each stage is transparent,
so there's no dry/wet blend to manage.

Coefficients are rebuilt at control rate while a gain or the mid frequency is
gliding, and not at all once they settle.
*/

const LOW_SHELF_HZ: f32 = 320.0;
const HIGH_SHELF_HZ: f32 = 3_200.0;
const MID_Q: f32 = 1.0;
/// Samples between coefficient refreshes
const CONTROL_INTERVAL: u32 = 32;

pub struct EqEffect {
    params: EqParams,
    low: Biquad,
    mid: Biquad,
    high: Biquad,
    low_gain: AutomatedParam,
    mid_gain: AutomatedParam,
    high_gain: AutomatedParam,
    mid_freq: AutomatedParam,
    sample_rate: f32,
    countdown: u32,
}

impl EqEffect {
    pub fn new(sample_rate: f32, params: &EqParams) -> Self {
        let gain = |db: f32| if params.enabled { db } else { 0.0 };
        Self {
            params: *params,
            low: Biquad::new(BiquadKind::LowShelf, LOW_SHELF_HZ, MID_Q, gain(params.low_gain), sample_rate),
            mid: Biquad::new(BiquadKind::Peaking, params.mid_freq, MID_Q, gain(params.mid_gain), sample_rate),
            high: Biquad::new(BiquadKind::HighShelf, HIGH_SHELF_HZ, MID_Q, gain(params.high_gain), sample_rate),
            low_gain: AutomatedParam::new(gain(params.low_gain)),
            mid_gain: AutomatedParam::new(gain(params.mid_gain)),
            high_gain: AutomatedParam::new(gain(params.high_gain)),
            mid_freq: AutomatedParam::new(params.mid_freq),
            sample_rate,
            countdown: 0,
        }
    }

    pub fn params(&self) -> &EqParams {
        &self.params
    }

    pub fn update(&mut self, update: &EqUpdate, now: f64) {
        self.params.merge(update);
        let p = self.params;
        let gain = |db: f32| if p.enabled { db } else { 0.0 };

        self.low_gain.approach(gain(p.low_gain), MIX_TIME_CONSTANT, now);
        self.mid_gain.approach(gain(p.mid_gain), MIX_TIME_CONSTANT, now);
        self.high_gain.approach(gain(p.high_gain), MIX_TIME_CONSTANT, now);

        if update.mid_freq.is_some() {
            self.mid_freq.approach(p.mid_freq, MIX_TIME_CONSTANT, now);
        }
        trace!(target: "nightdrive::effects", "eq update {:?}", p);
    }

    /// Band gains in dB at `time`: (low, mid, high).
    pub fn band_gains(&mut self, time: f64) -> (f32, f32, f32) {
        (
            self.low_gain.value_at(time),
            self.mid_gain.value_at(time),
            self.high_gain.value_at(time),
        )
    }

    pub fn render(&mut self, buffer: &mut [f32], now: f64) {
        let dt = 1.0 / self.sample_rate as f64;
        for (i, sample) in buffer.iter_mut().enumerate() {
            if self.countdown == 0 {
                self.refresh(now + i as f64 * dt);
                self.countdown = CONTROL_INTERVAL;
            }
            self.countdown -= 1;

            let x = self.low.process(*sample);
            let x = self.mid.process(x);
            *sample = self.high.process(x);
        }
    }

    pub fn reset(&mut self) {
        self.low.reset();
        self.mid.reset();
        self.high.reset();
    }

    fn refresh(&mut self, time: f64) {
        let (low, mid, high) = self.band_gains(time);
        let mid_freq = self.mid_freq.value_at(time);
        let sr = self.sample_rate;
        self.low.set_params(LOW_SHELF_HZ, MID_Q, low, sr);
        self.mid.set_params(mid_freq, MID_Q, mid, sr);
        self.high.set_params(HIGH_SHELF_HZ, MID_Q, high, sr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn test_flat_eq_is_transparent() {
        let mut eq = EqEffect::new(SAMPLE_RATE, &EqParams::default());
        let mut buffer: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let original = buffer.clone();
        eq.render(&mut buffer, 0.0);

        for (a, b) in buffer.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_disable_parks_gains_at_zero() {
        let params = EqParams {
            low_gain: 6.0,
            high_gain: -6.0,
            ..Default::default()
        };
        let mut eq = EqEffect::new(SAMPLE_RATE, &params);
        eq.update(
            &EqUpdate {
                enabled: Some(false),
                ..Default::default()
            },
            0.0,
        );

        let (low, mid, high) = eq.band_gains(1.0);
        assert!(low.abs() < 1e-3 && mid.abs() < 1e-3 && high.abs() < 1e-3);
        // The stored gains survive so re-enabling restores them
        assert_eq!(eq.params().low_gain, 6.0);
    }

    #[test]
    fn test_gain_glides_to_target() {
        let mut eq = EqEffect::new(SAMPLE_RATE, &EqParams::default());
        eq.update(
            &EqUpdate {
                mid_gain: Some(9.0),
                ..Default::default()
            },
            0.0,
        );

        let (_, early, _) = eq.band_gains(0.005);
        assert!(early > 0.0 && early < 9.0);
        let (_, settled, _) = eq.band_gains(0.5);
        assert!((settled - 9.0).abs() < 1e-3);
    }

    #[test]
    fn test_bass_boost_raises_low_end() {
        let params = EqParams {
            low_gain: 12.0,
            ..Default::default()
        };
        let mut eq = EqEffect::new(SAMPLE_RATE, &params);
        let mut buffer = vec![1.0; 48_000];
        eq.render(&mut buffer, 0.0);
        assert!(buffer[47_999] > 3.5, "got {}", buffer[47_999]);
    }
}
