#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::filter::FilterType;
use crate::dsp::oscillator::Waveform;

/// Envelope stage times in seconds, sustain as a fraction of peak.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for Adsr {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.2,
            sustain: 0.6,
            release: 0.3,
        }
    }
}

/// Everything one oscillator chain needs: generator, filter, envelope, level.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorSpec {
    pub waveform: Waveform,
    /// Cents
    pub detune: f32,
    pub enabled: bool,
    pub volume: f32,
    pub filter_type: FilterType,
    /// Hz
    pub filter_cutoff: f32,
    /// Resonance (Q), 0-30
    pub filter_q: f32,
    pub envelope: Adsr,
}

impl Default for OscillatorSpec {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sawtooth,
            detune: 0.0,
            enabled: true,
            volume: 0.8,
            filter_type: FilterType::LowPass,
            filter_cutoff: 2_000.0,
            filter_q: 5.0,
            envelope: Adsr::default(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    pub osc1: OscillatorSpec,
    pub osc2: OscillatorSpec,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            osc1: OscillatorSpec::default(),
            osc2: OscillatorSpec {
                waveform: Waveform::Square,
                enabled: false,
                ..OscillatorSpec::default()
            },
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdsrUpdate {
    pub attack: Option<f32>,
    pub decay: Option<f32>,
    pub sustain: Option<f32>,
    pub release: Option<f32>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OscillatorUpdate {
    pub waveform: Option<Waveform>,
    pub detune: Option<f32>,
    pub enabled: Option<bool>,
    pub volume: Option<f32>,
    pub filter_type: Option<FilterType>,
    pub filter_cutoff: Option<f32>,
    pub filter_q: Option<f32>,
    pub envelope: Option<AdsrUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorId {
    Osc1,
    Osc2,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VoiceParamsUpdate {
    pub osc1: Option<OscillatorUpdate>,
    pub osc2: Option<OscillatorUpdate>,
}

impl VoiceParamsUpdate {
    /// Update aimed at a single oscillator.
    pub fn for_oscillator(id: OscillatorId, update: OscillatorUpdate) -> Self {
        match id {
            OscillatorId::Osc1 => Self {
                osc1: Some(update),
                osc2: None,
            },
            OscillatorId::Osc2 => Self {
                osc1: None,
                osc2: Some(update),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.osc1.is_none() && self.osc2.is_none()
    }
}

// Stage times longer than this are treated as a typo, not a musical choice
const MAX_STAGE_SECONDS: f32 = 10.0;

fn merge(slot: &mut f32, value: Option<f32>, min: f32, max: f32) {
    if let Some(value) = value {
        if value.is_finite() {
            *slot = value.clamp(min, max);
        }
    }
}

impl Adsr {
    pub fn merge(&mut self, update: &AdsrUpdate) {
        merge(&mut self.attack, update.attack, 0.0, MAX_STAGE_SECONDS);
        merge(&mut self.decay, update.decay, 0.0, MAX_STAGE_SECONDS);
        merge(&mut self.sustain, update.sustain, 0.0, 1.0);
        merge(&mut self.release, update.release, 0.0, MAX_STAGE_SECONDS);
    }
}

impl OscillatorSpec {
    pub fn merge(&mut self, update: &OscillatorUpdate) {
        if let Some(waveform) = update.waveform {
            self.waveform = waveform;
        }
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(filter_type) = update.filter_type {
            self.filter_type = filter_type;
        }
        merge(&mut self.detune, update.detune, -1_200.0, 1_200.0);
        merge(&mut self.volume, update.volume, 0.0, 1.0);
        merge(&mut self.filter_cutoff, update.filter_cutoff, 20.0, 20_000.0);
        merge(&mut self.filter_q, update.filter_q, 0.0, 30.0);
        if let Some(envelope) = &update.envelope {
            self.envelope.merge(envelope);
        }
    }
}

impl VoiceParams {
    pub fn merge(&mut self, update: &VoiceParamsUpdate) {
        if let Some(osc1) = &update.osc1 {
            self.osc1.merge(osc1);
        }
        if let Some(osc2) = &update.osc2 {
            self.osc2.merge(osc2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_patch() {
        let params = VoiceParams::default();
        assert_eq!(params.osc1.waveform, Waveform::Sawtooth);
        assert!(params.osc1.enabled);
        assert_eq!(params.osc2.waveform, Waveform::Square);
        assert!(!params.osc2.enabled);
        assert_eq!(params.osc2.filter_cutoff, 2_000.0);
        assert_eq!(params.osc2.envelope, Adsr::default());
    }

    #[test]
    fn test_empty_update_is_noop() {
        let mut params = VoiceParams::default();
        params.merge(&VoiceParamsUpdate::default());
        params.merge(&VoiceParamsUpdate {
            osc1: Some(OscillatorUpdate::default()),
            osc2: Some(OscillatorUpdate {
                envelope: Some(AdsrUpdate::default()),
                ..Default::default()
            }),
        });
        assert_eq!(params, VoiceParams::default());
    }

    #[test]
    fn test_merge_touches_one_oscillator() {
        let mut params = VoiceParams::default();
        params.merge(&VoiceParamsUpdate::for_oscillator(
            OscillatorId::Osc2,
            OscillatorUpdate {
                filter_q: Some(99.0),
                envelope: Some(AdsrUpdate {
                    sustain: Some(1.5),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ));
        assert_eq!(params.osc1, VoiceParams::default().osc1);
        assert_eq!(params.osc2.filter_q, 30.0);
        assert_eq!(params.osc2.envelope.sustain, 1.0);
        assert_eq!(params.osc2.envelope.attack, 0.01);
    }
}
