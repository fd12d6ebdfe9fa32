use log::debug;

use super::chorus::ChorusEffect;
use super::distortion::DistortionEffect;
use super::eq::EqEffect;
use super::params::{EffectsParams, EffectsParamsUpdate};
use super::reverb::ReverbEffect;

/// The master effects rack, always in this order:
///
/// ```text
/// bus ──→ EQ ──→ Distortion ──→ Chorus ──→ Reverb ──→ out
/// ```
pub struct EffectsChain {
    eq: EqEffect,
    distortion: DistortionEffect,
    chorus: ChorusEffect,
    reverb: ReverbEffect,
}

impl EffectsChain {
    pub fn new(sample_rate: f32, params: &EffectsParams) -> Self {
        Self {
            eq: EqEffect::new(sample_rate, &params.eq),
            distortion: DistortionEffect::new(sample_rate, &params.distortion),
            chorus: ChorusEffect::new(sample_rate, &params.chorus),
            reverb: ReverbEffect::new(sample_rate, &params.reverb),
        }
    }

    /// Route each present partial to its unit; absent units are left alone.
    pub fn update_params(&mut self, update: &EffectsParamsUpdate, now: f64) {
        if update.is_empty() {
            return;
        }
        debug!(target: "nightdrive::effects", "effects update at {now:.3}s");

        if let Some(eq) = &update.eq {
            self.eq.update(eq, now);
        }
        if let Some(distortion) = &update.distortion {
            self.distortion.update(distortion, now);
        }
        if let Some(chorus) = &update.chorus {
            self.chorus.update(chorus, now);
        }
        if let Some(reverb) = &update.reverb {
            self.reverb.update(reverb, now);
        }
    }

    /// Snapshot of every unit's current parameters.
    pub fn params(&self) -> EffectsParams {
        EffectsParams {
            reverb: *self.reverb.params(),
            distortion: *self.distortion.params(),
            chorus: *self.chorus.params(),
            eq: *self.eq.params(),
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], now: f64) {
        self.eq.render(buffer, now);
        self.distortion.render(buffer, now);
        self.chorus.render(buffer, now);
        self.reverb.render(buffer, now);
    }

    pub fn reset(&mut self) {
        self.eq.reset();
        self.distortion.reset();
        self.chorus.reset();
        self.reverb.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::params::{ChorusUpdate, ReverbUpdate};

    #[test]
    fn test_default_chain_passes_signal_through() {
        let mut chain = EffectsChain::new(48_000.0, &EffectsParams::default());
        let mut buffer: Vec<f32> = (0..512).map(|i| (i as f32 * 0.03).sin() * 0.5).collect();
        let original = buffer.clone();
        chain.render(&mut buffer, 0.0);

        for (a, b) in buffer.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_empty_update_changes_nothing() {
        let mut chain = EffectsChain::new(48_000.0, &EffectsParams::default());
        chain.update_params(&EffectsParamsUpdate::default(), 0.0);
        assert_eq!(chain.params(), EffectsParams::default());
    }

    #[test]
    fn test_update_only_touches_named_units() {
        let mut chain = EffectsChain::new(48_000.0, &EffectsParams::default());
        chain.update_params(
            &EffectsParamsUpdate {
                reverb: Some(ReverbUpdate {
                    enabled: Some(true),
                    ..Default::default()
                }),
                chorus: Some(ChorusUpdate {
                    depth: Some(0.9),
                    ..Default::default()
                }),
                ..Default::default()
            },
            0.0,
        );

        let params = chain.params();
        assert!(params.reverb.enabled);
        assert_eq!(params.chorus.depth, 0.9);
        assert_eq!(params.distortion, EffectsParams::default().distortion);
        assert_eq!(params.eq, EffectsParams::default().eq);
    }
}
