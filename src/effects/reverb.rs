use log::debug;

use super::params::{ReverbParams, ReverbUpdate};
use super::slot::{EffectSlot, Processor, MIX_TIME_CONSTANT};
use crate::dsp::delay::DelayLine;
use crate::dsp::param::AutomatedParam;
use crate::dsp::reverb::SchroederReverb;

const MAX_PRE_DELAY_SECONDS: f32 = 0.2;
const DAMPING: f32 = 0.2;

/// Pre-delay line feeding a Schroeder tail.
pub struct ReverbProcessor {
    pre_delay_line: DelayLine,
    pre_delay: AutomatedParam,
    tail: SchroederReverb,
    sample_rate: f32,
}

impl ReverbProcessor {
    pub fn new(sample_rate: f32, params: &ReverbParams) -> Self {
        let mut tail = SchroederReverb::new(sample_rate, params.decay);
        tail.set_damping(DAMPING);
        Self {
            pre_delay_line: DelayLine::new(MAX_PRE_DELAY_SECONDS, sample_rate),
            pre_delay: AutomatedParam::new(params.pre_delay),
            tail,
            sample_rate,
        }
    }

    pub fn decay(&self) -> f32 {
        self.tail.decay()
    }
}

impl Processor for ReverbProcessor {
    #[inline]
    fn process(&mut self, input: f32, time: f64) -> f32 {
        let delay_samples = self.pre_delay.value_at(time) * self.sample_rate;
        let delayed = self.pre_delay_line.process(input, delay_samples);
        self.tail.process(delayed)
    }

    fn reset(&mut self) {
        self.pre_delay_line.reset();
        self.tail.reset();
    }
}

pub struct ReverbEffect {
    slot: EffectSlot<ReverbProcessor>,
    params: ReverbParams,
    sample_rate: f32,
}

impl ReverbEffect {
    pub fn new(sample_rate: f32, params: &ReverbParams) -> Self {
        let mut slot = EffectSlot::new(ReverbProcessor::new(sample_rate, params));
        slot.jump_to(params.enabled, params.mix);
        Self {
            slot,
            params: *params,
            sample_rate,
        }
    }

    pub fn params(&self) -> &ReverbParams {
        &self.params
    }

    pub fn slot(&self) -> &EffectSlot<ReverbProcessor> {
        &self.slot
    }

    pub fn update(&mut self, update: &ReverbUpdate, now: f64) {
        self.params.merge(update);
        if update.enabled.is_some() {
            self.slot.set_enabled(self.params.enabled, now);
        }
        if update.mix.is_some() {
            self.slot.set_mix(self.params.mix, now);
        }
        if update.pre_delay.is_some() {
            self.slot
                .processor_mut()
                .pre_delay
                .approach(self.params.pre_delay, MIX_TIME_CONSTANT, now);
        }
        if update.decay.is_some() && self.slot.processor_mut().tail.set_decay(self.params.decay) {
            debug!(target: "nightdrive::effects", "reverb tail retuned, decay {}s", self.params.decay);
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], now: f64) {
        self.slot.render(buffer, now, self.sample_rate);
    }

    pub fn reset(&mut self) {
        self.slot.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_update_retunes_tail() {
        let mut reverb = ReverbEffect::new(48_000.0, &ReverbParams::default());
        reverb.update(
            &ReverbUpdate {
                decay: Some(5.0),
                ..Default::default()
            },
            0.0,
        );
        assert_eq!(reverb.slot().processor().decay(), 5.0);
    }

    #[test]
    fn test_enabled_reverb_rings_after_input_stops() {
        let params = ReverbParams {
            enabled: true,
            mix: 0.5,
            ..Default::default()
        };
        let mut reverb = ReverbEffect::new(48_000.0, &params);
        let mut buffer = vec![0.0; 24_000];
        buffer[..100].fill(0.8);
        reverb.render(&mut buffer, 0.0);

        let tail_energy: f32 = buffer[12_000..].iter().map(|s| s * s).sum();
        assert!(tail_energy > 1e-4, "tail energy {tail_energy}");
    }

    #[test]
    fn test_pre_delay_holds_back_the_tail() {
        let params = ReverbParams {
            enabled: true,
            mix: 1.0,
            pre_delay: 0.1,
            ..Default::default()
        };
        let mut reverb = ReverbEffect::new(48_000.0, &params);
        let mut buffer = vec![0.0; 8_000];
        buffer[0] = 1.0;
        reverb.render(&mut buffer, 0.0);

        // Nothing before pre-delay plus the shortest comb
        assert!(buffer[..4_800].iter().all(|s| s.abs() < 1e-6));
        assert!(buffer[4_800..].iter().any(|s| s.abs() > 1e-4));
    }
}
