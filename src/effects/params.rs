#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbParams {
    pub enabled: bool,
    pub mix: f32,
    /// Tail length in seconds (0.1-10)
    pub decay: f32,
    /// Seconds before the tail starts (0-0.1)
    pub pre_delay: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            enabled: false,
            mix: 0.3,
            decay: 2.0,
            pre_delay: 0.02,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistortionParams {
    pub enabled: bool,
    pub mix: f32,
    /// Waveshaper steepness (1-100)
    pub drive: f32,
    /// Post-shaper low-pass cutoff in Hz (200-8000)
    pub tone: f32,
}

impl Default for DistortionParams {
    fn default() -> Self {
        Self {
            enabled: false,
            mix: 0.5,
            drive: 10.0,
            tone: 4_000.0,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChorusParams {
    pub enabled: bool,
    pub mix: f32,
    /// LFO rate in Hz (0.1-10)
    pub rate: f32,
    /// Modulation depth (0-1, full depth swings the delay by 5 ms)
    pub depth: f32,
    /// Centre delay in ms (5-30)
    pub delay: f32,
}

impl Default for ChorusParams {
    fn default() -> Self {
        Self {
            enabled: false,
            mix: 0.5,
            rate: 1.5,
            depth: 0.5,
            delay: 15.0,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqParams {
    pub enabled: bool,
    /// dB, ±12
    pub low_gain: f32,
    pub mid_gain: f32,
    /// Peaking band centre in Hz (200-8000)
    pub mid_freq: f32,
    pub high_gain: f32,
}

impl Default for EqParams {
    fn default() -> Self {
        Self {
            enabled: true,
            low_gain: 0.0,
            mid_gain: 0.0,
            mid_freq: 1_000.0,
            high_gain: 0.0,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EffectsParams {
    pub reverb: ReverbParams,
    pub distortion: DistortionParams,
    pub chorus: ChorusParams,
    pub eq: EqParams,
}

// Partial updates: `None` leaves a field untouched

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReverbUpdate {
    pub enabled: Option<bool>,
    pub mix: Option<f32>,
    pub decay: Option<f32>,
    pub pre_delay: Option<f32>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistortionUpdate {
    pub enabled: Option<bool>,
    pub mix: Option<f32>,
    pub drive: Option<f32>,
    pub tone: Option<f32>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChorusUpdate {
    pub enabled: Option<bool>,
    pub mix: Option<f32>,
    pub rate: Option<f32>,
    pub depth: Option<f32>,
    pub delay: Option<f32>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EqUpdate {
    pub enabled: Option<bool>,
    pub low_gain: Option<f32>,
    pub mid_gain: Option<f32>,
    pub mid_freq: Option<f32>,
    pub high_gain: Option<f32>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EffectsParamsUpdate {
    pub reverb: Option<ReverbUpdate>,
    pub distortion: Option<DistortionUpdate>,
    pub chorus: Option<ChorusUpdate>,
    pub eq: Option<EqUpdate>,
}

impl EffectsParamsUpdate {
    pub fn is_empty(&self) -> bool {
        self.reverb.is_none()
            && self.distortion.is_none()
            && self.chorus.is_none()
            && self.eq.is_none()
    }
}

fn merge(slot: &mut f32, value: Option<f32>, min: f32, max: f32) {
    if let Some(value) = value {
        *slot = value.clamp(min, max);
    }
}

impl ReverbParams {
    pub fn merge(&mut self, update: &ReverbUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        merge(&mut self.mix, update.mix, 0.0, 1.0);
        merge(&mut self.decay, update.decay, 0.1, 10.0);
        merge(&mut self.pre_delay, update.pre_delay, 0.0, 0.1);
    }
}

impl DistortionParams {
    pub fn merge(&mut self, update: &DistortionUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        merge(&mut self.mix, update.mix, 0.0, 1.0);
        merge(&mut self.drive, update.drive, 1.0, 100.0);
        merge(&mut self.tone, update.tone, 200.0, 8_000.0);
    }
}

impl ChorusParams {
    pub fn merge(&mut self, update: &ChorusUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        merge(&mut self.mix, update.mix, 0.0, 1.0);
        merge(&mut self.rate, update.rate, 0.1, 10.0);
        merge(&mut self.depth, update.depth, 0.0, 1.0);
        merge(&mut self.delay, update.delay, 5.0, 30.0);
    }
}

impl EqParams {
    pub fn merge(&mut self, update: &EqUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        merge(&mut self.low_gain, update.low_gain, -12.0, 12.0);
        merge(&mut self.mid_gain, update.mid_gain, -12.0, 12.0);
        merge(&mut self.mid_freq, update.mid_freq, 200.0, 8_000.0);
        merge(&mut self.high_gain, update.high_gain, -12.0, 12.0);
    }
}
