use std::f32::consts::TAU;

use super::params::{ChorusParams, ChorusUpdate};
use super::slot::{EffectSlot, Processor, MIX_TIME_CONSTANT};
use crate::dsp::delay::DelayLine;
use crate::dsp::param::AutomatedParam;

/*
Chorus
======

A short delay whose length is swept by a sine LFO. As the delay shrinks and
grows the copy is pitched slightly up and down against the dry signal, which
reads as several players on the same part.

  delay(t) = base + sin(2π · rate · t) · depth · 5 ms

  base    5-30 ms   shorter combs, longer slaps back
  depth   0-1       full depth swings ±5 ms
  rate    0.1-10 Hz slow shimmer up to vibrato wobble

All three glide with the usual 20 ms approach.
*/

/// Delay swing at full depth, in seconds
const DEPTH_SECONDS: f32 = 0.005;
/// Longest delay the line has to hold: 30 ms base plus full swing
const MAX_DELAY_SECONDS: f32 = 0.05;

pub struct ChorusProcessor {
    line: DelayLine,
    lfo_phase: f32,
    rate: AutomatedParam,
    depth: AutomatedParam,
    base_delay: AutomatedParam,
    sample_rate: f32,
}

impl ChorusProcessor {
    pub fn new(sample_rate: f32, params: &ChorusParams) -> Self {
        Self {
            line: DelayLine::new(MAX_DELAY_SECONDS, sample_rate),
            lfo_phase: 0.0,
            rate: AutomatedParam::new(params.rate),
            depth: AutomatedParam::new(params.depth * DEPTH_SECONDS),
            base_delay: AutomatedParam::new(params.delay / 1000.0),
            sample_rate,
        }
    }
}

impl Processor for ChorusProcessor {
    #[inline]
    fn process(&mut self, input: f32, time: f64) -> f32 {
        let lfo = (TAU * self.lfo_phase).sin();
        let delay_seconds = self.base_delay.value_at(time) + lfo * self.depth.value_at(time);
        let wet = self.line.process(input, delay_seconds * self.sample_rate);

        self.lfo_phase += self.rate.value_at(time) / self.sample_rate;
        if self.lfo_phase >= 1.0 {
            self.lfo_phase -= 1.0;
        }
        wet
    }

    fn reset(&mut self) {
        self.line.reset();
        self.lfo_phase = 0.0;
    }
}

pub struct ChorusEffect {
    slot: EffectSlot<ChorusProcessor>,
    params: ChorusParams,
    sample_rate: f32,
}

impl ChorusEffect {
    pub fn new(sample_rate: f32, params: &ChorusParams) -> Self {
        let mut slot = EffectSlot::new(ChorusProcessor::new(sample_rate, params));
        slot.jump_to(params.enabled, params.mix);
        Self {
            slot,
            params: *params,
            sample_rate,
        }
    }

    pub fn params(&self) -> &ChorusParams {
        &self.params
    }

    pub fn update(&mut self, update: &ChorusUpdate, now: f64) {
        self.params.merge(update);
        if update.enabled.is_some() {
            self.slot.set_enabled(self.params.enabled, now);
        }
        if update.mix.is_some() {
            self.slot.set_mix(self.params.mix, now);
        }

        let p = self.params;
        let processor = self.slot.processor_mut();
        if update.rate.is_some() {
            processor.rate.approach(p.rate, MIX_TIME_CONSTANT, now);
        }
        if update.depth.is_some() {
            processor.depth.approach(p.depth * DEPTH_SECONDS, MIX_TIME_CONSTANT, now);
        }
        if update.delay.is_some() {
            processor.base_delay.approach(p.delay / 1000.0, MIX_TIME_CONSTANT, now);
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], now: f64) {
        self.slot.render(buffer, now, self.sample_rate);
    }

    pub fn reset(&mut self) {
        self.slot.reset();
    }
}
