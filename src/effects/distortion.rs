use log::debug;

use super::params::{DistortionParams, DistortionUpdate};
use super::slot::{EffectSlot, Processor, MIX_TIME_CONSTANT};
use crate::dsp::distortion::WaveshaperCurve;
use crate::dsp::filter::SVFilter;
use crate::dsp::oversample::Oversampler;
use crate::dsp::param::AutomatedParam;

/// 4x oversampled waveshaper followed by a tone low-pass.
pub struct DistortionProcessor {
    curve: WaveshaperCurve,
    oversampler: Oversampler,
    tone_filter: SVFilter,
    tone: AutomatedParam,
    sample_rate: f32,
}

impl DistortionProcessor {
    pub fn new(sample_rate: f32, drive: f32, tone: f32) -> Self {
        Self {
            curve: WaveshaperCurve::new(drive),
            oversampler: Oversampler::new(sample_rate),
            tone_filter: SVFilter::lowpass(tone, sample_rate),
            tone: AutomatedParam::new(tone),
            sample_rate,
        }
    }

    pub fn curve(&self) -> &WaveshaperCurve {
        &self.curve
    }
}

impl Processor for DistortionProcessor {
    #[inline]
    fn process(&mut self, input: f32, time: f64) -> f32 {
        let curve = &self.curve;
        let shaped = self.oversampler.process(input, |x| curve.shape(x));
        let cutoff = self.tone.value_at(time);
        self.tone_filter.set_params(cutoff, 0.707, self.sample_rate);
        self.tone_filter.process(shaped)
    }

    fn reset(&mut self) {
        self.oversampler.reset();
        self.tone_filter.reset();
    }
}

pub struct DistortionEffect {
    slot: EffectSlot<DistortionProcessor>,
    params: DistortionParams,
    sample_rate: f32,
}

impl DistortionEffect {
    pub fn new(sample_rate: f32, params: &DistortionParams) -> Self {
        let mut slot = EffectSlot::new(DistortionProcessor::new(sample_rate, params.drive, params.tone));
        slot.jump_to(params.enabled, params.mix);
        Self {
            slot,
            params: *params,
            sample_rate,
        }
    }

    pub fn params(&self) -> &DistortionParams {
        &self.params
    }

    pub fn slot(&self) -> &EffectSlot<DistortionProcessor> {
        &self.slot
    }

    pub fn update(&mut self, update: &DistortionUpdate, now: f64) {
        self.params.merge(update);
        if update.enabled.is_some() {
            self.slot.set_enabled(self.params.enabled, now);
        }
        if update.mix.is_some() {
            self.slot.set_mix(self.params.mix, now);
        }
        if update.drive.is_some() && self.slot.processor_mut().curve.set_drive(self.params.drive) {
            debug!(target: "nightdrive::effects", "distortion curve rebuilt, drive {}", self.params.drive);
        }
        if update.tone.is_some() {
            self.slot
                .processor_mut()
                .tone
                .approach(self.params.tone, MIX_TIME_CONSTANT, now);
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], now: f64) {
        self.slot.render(buffer, now, self.sample_rate);
    }

    pub fn reset(&mut self) {
        self.slot.reset();
    }
}
