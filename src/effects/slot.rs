use crate::dsp::param::AutomatedParam;

/*
Effect Slot
===========

Every processing effect sits inside the same routing:

         input
        /     \
   dry gain   processor
       |         |
       |      wet gain
        \     /
         (+) ──→ output

  enabled:   dry = 1 - mix   wet = mix
  bypassed:  dry = 1         wet = 0

Both gains move with a 20 ms approach so toggling or re-mixing an effect never
clicks. The processor keeps running while bypassed: its delay lines and tails
stay warm, and switching it back on fades in a signal that is already there.

A new slot starts bypassed.
*/

/// Gain smoothing for enable/mix changes, in seconds
pub const MIX_TIME_CONSTANT: f64 = 0.02;

/// The wet path of an effect slot.
pub trait Processor {
    /// Process one sample. `time` is the audio-clock time of the sample.
    fn process(&mut self, input: f32, time: f64) -> f32;

    fn reset(&mut self) {}
}

pub struct EffectSlot<P: Processor> {
    processor: P,
    enabled: bool,
    mix: f32,
    dry: AutomatedParam,
    wet: AutomatedParam,
}

impl<P: Processor> EffectSlot<P> {
    pub fn new(processor: P) -> Self {
        Self {
            processor,
            enabled: false,
            mix: 0.5,
            dry: AutomatedParam::new(1.0),
            wet: AutomatedParam::new(0.0),
        }
    }

    /// Put the slot into a state with no transition. Used at construction.
    pub fn jump_to(&mut self, enabled: bool, mix: f32) {
        self.enabled = enabled;
        self.mix = mix.clamp(0.0, 1.0);
        let (dry, wet) = self.target_gains();
        self.dry.set_immediate(dry);
        self.wet.set_immediate(wet);
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    pub fn set_enabled(&mut self, enabled: bool, now: f64) {
        self.enabled = enabled;
        self.apply_mix(now);
    }

    /// The stored mix always updates; the gains only move while enabled.
    pub fn set_mix(&mut self, mix: f32, now: f64) {
        self.mix = mix.clamp(0.0, 1.0);
        if self.enabled {
            self.apply_mix(now);
        }
    }

    /// (dry, wet) gains at `time`.
    pub fn gains(&mut self, time: f64) -> (f32, f32) {
        (self.dry.value_at(time), self.wet.value_at(time))
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    pub fn render(&mut self, buffer: &mut [f32], now: f64, sample_rate: f32) {
        let dt = 1.0 / sample_rate as f64;
        for (i, sample) in buffer.iter_mut().enumerate() {
            let time = now + i as f64 * dt;
            let dry = *sample;
            let wet = self.processor.process(dry, time);
            *sample = dry * self.dry.value_at(time) + wet * self.wet.value_at(time);
        }
    }

    pub fn reset(&mut self) {
        self.processor.reset();
    }

    fn target_gains(&self) -> (f32, f32) {
        if self.enabled {
            (1.0 - self.mix, self.mix)
        } else {
            (1.0, 0.0)
        }
    }

    fn apply_mix(&mut self, now: f64) {
        let (dry, wet) = self.target_gains();
        self.dry.approach(dry, MIX_TIME_CONSTANT, now);
        self.wet.approach(wet, MIX_TIME_CONSTANT, now);
    }
}
