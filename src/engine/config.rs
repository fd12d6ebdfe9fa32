#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::effects::params::EffectsParams;
use crate::sequencing::step::{default_steps, SequencerStep, DEFAULT_BPM, STEP_COUNT};
use crate::synth::params::VoiceParams;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample rate must be a positive, finite number of Hz (got {0})")]
    InvalidSampleRate(f32),
    #[error("polyphony must be at least 1")]
    ZeroPolyphony,
    #[error("master volume must be within 0.0..=1.0 (got {0})")]
    InvalidMasterVolume(f32),
}

/// Everything needed to build an [`Engine`](super::Engine).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub polyphony: usize,
    pub master_volume: f32,
    pub voice: VoiceParams,
    pub effects: EffectsParams,
    pub steps: [SequencerStep; STEP_COUNT],
    pub bpm: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            polyphony: 8,
            master_volume: 0.7,
            voice: VoiceParams::default(),
            effects: EffectsParams::default(),
            steps: default_steps(),
            bpm: DEFAULT_BPM,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_polyphony(mut self, polyphony: usize) -> Self {
        self.polyphony = polyphony;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.polyphony == 0 {
            return Err(ConfigError::ZeroPolyphony);
        }
        if !(0.0..=1.0).contains(&self.master_volume) {
            return Err(ConfigError::InvalidMasterVolume(self.master_volume));
        }
        Ok(())
    }
}
