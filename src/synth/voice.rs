use log::trace;

use super::params::{OscillatorSpec, OscillatorUpdate, VoiceParams, VoiceParamsUpdate};
use crate::dsp::filter::SVFilter;
use crate::dsp::oscillator::OscillatorBlock;
use crate::dsp::param::AutomatedParam;

/*
Voice
=====

One note slot. Two independent oscillator chains sum into the voice output:

  generator(s) → envelope gain ─┐
                                ├→ filter → output gain ─→ voice out
  (retiring generator, fading) ─┘

A "generator" is the running waveform plus its own envelope. Generators are
created on trigger and thrown away afterwards; the filter and the output gain
belong to the chain and live as long as the voice does.

Retrigger
---------

Hard-stopping a generator mid-cycle clicks. On retrigger (or steal) every
running generator is told to fade to zero over 2 ms and is dropped once the
fade is over. The new generator starts at zero and climbs through its attack
at the same time, so for a couple of milliseconds both play.

    gain
     1 ┤  old ╲
       │       ╲ new ╱‾‾‾‾╲___
     0 ┤────────╳╱            ‾‾‾
       └────────┬──────────────→ t
             retrigger

State machine
-------------

  Idle ──trigger──→ Active ──release──→ Releasing ──teardown──→ Idle
                      ↑ trigger            │
                      └────────────────────┘

Teardown is driven from outside: `release` returns the time it is due and the
owner calls `complete_release` then. If the voice was retriggered in the
meantime the call does nothing.
*/

/// Smoothing for detune, volume, cutoff and resonance edits, seconds
pub const PARAM_SMOOTHING: f64 = 0.005;
/// Fade applied to a generator that is being replaced, seconds
pub const RETRIGGER_FADE: f64 = 0.002;
/// Grace period between the end of the release ramp and teardown, seconds
pub const TEARDOWN_GRACE: f64 = 0.1;

// Live + fading generators per chain. Only hit by retriggers faster than the
// fade, in which case the oldest fading generator is dropped early.
const MAX_GENERATORS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,      // No note, no generators
    Active,    // Held: attack, decay or sustain
    Releasing, // Key released, waiting for teardown
}

struct Generator {
    osc: OscillatorBlock,
    envelope: AutomatedParam,
    retire_at: Option<f64>,
}

impl Generator {
    fn is_live(&self) -> bool {
        self.retire_at.is_none()
    }

    fn retire(&mut self, now: f64) {
        if self.is_live() {
            self.envelope.ramp_linear(0.0, RETRIGGER_FADE, now);
            self.retire_at = Some(now + RETRIGGER_FADE);
        }
    }
}

struct OscillatorChain {
    spec: OscillatorSpec,
    generators: Vec<Generator>,
    filter: SVFilter,
    cutoff: AutomatedParam,
    resonance: AutomatedParam,
    detune: AutomatedParam,
    volume: AutomatedParam,
    // Cached 2^(cents/1200)
    detune_cents: f32,
    detune_ratio: f32,
}

impl OscillatorChain {
    fn new(spec: OscillatorSpec, sample_rate: f32) -> Self {
        Self {
            spec,
            generators: Vec::with_capacity(MAX_GENERATORS),
            filter: SVFilter::new(spec.filter_type, spec.filter_cutoff, spec.filter_q, sample_rate),
            cutoff: AutomatedParam::new(spec.filter_cutoff),
            resonance: AutomatedParam::new(spec.filter_q),
            detune: AutomatedParam::new(spec.detune),
            volume: AutomatedParam::new(spec.volume),
            detune_cents: 0.0,
            detune_ratio: 1.0,
        }
    }

    fn trigger(&mut self, amplitude: f32, now: f64) {
        for generator in &mut self.generators {
            generator.retire(now);
        }
        if !self.spec.enabled {
            return;
        }

        self.filter.set_filter_type(self.spec.filter_type);
        self.cutoff.approach(self.spec.filter_cutoff, PARAM_SMOOTHING, now);
        self.resonance.approach(self.spec.filter_q, PARAM_SMOOTHING, now);
        self.spawn(amplitude, now);
    }

    fn spawn(&mut self, amplitude: f32, now: f64) {
        if self.generators.len() == MAX_GENERATORS {
            self.generators.remove(0);
        }

        let adsr = self.spec.envelope;
        let peak_at = now + adsr.attack as f64;
        let sustain_at = peak_at + adsr.decay as f64;

        let mut envelope = AutomatedParam::new(0.0);
        envelope.cancel_and_hold(now);
        envelope.set_value_at(0.0, now);
        envelope.linear_ramp_to(amplitude, peak_at);
        envelope.linear_ramp_to(amplitude * adsr.sustain, sustain_at);

        self.generators.push(Generator {
            osc: OscillatorBlock::new(self.spec.waveform),
            envelope,
            retire_at: None,
        });
    }

    fn release(&mut self, now: f64) {
        let release = self.spec.envelope.release as f64;
        for generator in self.generators.iter_mut().filter(|g| g.is_live()) {
            generator.envelope.ramp_linear(0.0, release, now);
        }
    }

    fn update(&mut self, update: &OscillatorUpdate, now: f64, respawn_amplitude: Option<f32>) {
        let was_enabled = self.spec.enabled;
        self.spec.merge(update);
        let spec = self.spec;

        if update.waveform.is_some() {
            for generator in &mut self.generators {
                generator.osc.set_waveform(spec.waveform);
            }
        }
        if update.filter_type.is_some() {
            self.filter.set_filter_type(spec.filter_type);
        }
        if update.detune.is_some() {
            self.detune.approach(spec.detune, PARAM_SMOOTHING, now);
        }
        if update.volume.is_some() {
            self.volume.approach(spec.volume, PARAM_SMOOTHING, now);
        }
        if update.filter_cutoff.is_some() {
            self.cutoff.approach(spec.filter_cutoff, PARAM_SMOOTHING, now);
        }
        if update.filter_q.is_some() {
            self.resonance.approach(spec.filter_q, PARAM_SMOOTHING, now);
        }

        match (was_enabled, spec.enabled) {
            (false, true) => {
                if let Some(amplitude) = respawn_amplitude {
                    self.spawn(amplitude, now);
                }
            }
            (true, false) => {
                for generator in &mut self.generators {
                    generator.retire(now);
                }
            }
            _ => {}
        }
    }

    fn render(&mut self, out: &mut [f32], frequency: f32, now: f64, sample_rate: f32) {
        if self.generators.is_empty() {
            return;
        }

        let dt = 1.0 / sample_rate as f64;
        for (i, sample) in out.iter_mut().enumerate() {
            let time = now + i as f64 * dt;

            let cents = self.detune.value_at(time);
            if cents != self.detune_cents {
                self.detune_cents = cents;
                self.detune_ratio = (cents / 1_200.0).exp2();
            }
            let freq = frequency * self.detune_ratio;

            let mut sum = 0.0;
            for generator in &mut self.generators {
                sum += generator.osc.next_sample(freq, sample_rate) * generator.envelope.value_at(time);
            }

            let cutoff = self.cutoff.value_at(time);
            let q = self.resonance.value_at(time);
            self.filter.set_params(cutoff, q, sample_rate);
            *sample += self.filter.process(sum) * self.volume.value_at(time);
        }

        let end = now + out.len() as f64 * dt;
        self.generators
            .retain(|g| g.retire_at.map_or(true, |retire_at| retire_at > end));
    }

    fn clear(&mut self) {
        self.generators.clear();
        self.filter.reset();
    }
}

/// A single polyphonic note slot with two oscillator chains.
pub struct Voice {
    state: VoiceState,
    note: Option<u8>,
    velocity: u8,
    frequency: f32,
    triggered_at: f64,
    osc1: OscillatorChain,
    osc2: OscillatorChain,
    sample_rate: f32,
    disposed: bool,
}

impl Voice {
    pub fn new(sample_rate: f32, params: &VoiceParams) -> Self {
        Self {
            state: VoiceState::Idle,
            note: None,
            velocity: 0,
            frequency: 0.0,
            triggered_at: 0.0,
            osc1: OscillatorChain::new(params.osc1, sample_rate),
            osc2: OscillatorChain::new(params.osc2, sample_rate),
            sample_rate,
            disposed: false,
        }
    }

    /// Start (or restart) a note. Running generators fade out underneath the
    /// new ones instead of stopping dead.
    pub fn trigger(&mut self, frequency: f32, velocity: u8, note: u8, now: f64) {
        if self.disposed {
            return;
        }
        let velocity = velocity.min(127);
        let amplitude = velocity as f32 / 127.0;

        self.osc1.trigger(amplitude, now);
        self.osc2.trigger(amplitude, now);

        self.state = VoiceState::Active;
        self.note = Some(note.min(127));
        self.velocity = velocity;
        self.frequency = frequency;
        self.triggered_at = now;
    }

    /// Begin the release ramp. Returns the time teardown is due, or `None`
    /// when the voice wasn't held.
    pub fn release(&mut self, now: f64) -> Option<f64> {
        if self.state != VoiceState::Active {
            return None;
        }
        self.osc1.release(now);
        self.osc2.release(now);
        self.state = VoiceState::Releasing;

        let longest = self
            .osc1
            .spec
            .envelope
            .release
            .max(self.osc2.spec.envelope.release);
        Some(now + longest as f64 + TEARDOWN_GRACE)
    }

    /// Finish a release: drop the generators and go idle. Returns false (and
    /// does nothing) if the voice is no longer releasing.
    pub fn complete_release(&mut self) -> bool {
        if self.state != VoiceState::Releasing {
            return false;
        }
        self.osc1.clear();
        self.osc2.clear();
        self.state = VoiceState::Idle;
        self.note = None;
        trace!(target: "nightdrive::synth", "voice torn down");
        true
    }

    pub fn update_params(&mut self, update: &VoiceParamsUpdate, now: f64) {
        // Enabling an oscillator only brings it in under a held note
        let respawn = (self.state == VoiceState::Active).then(|| self.velocity as f32 / 127.0);
        if let Some(osc1) = &update.osc1 {
            self.osc1.update(osc1, now, respawn);
        }
        if let Some(osc2) = &update.osc2 {
            self.osc2.update(osc2, now, respawn);
        }
    }

    /// Add this voice's output into `out`.
    pub fn render(&mut self, out: &mut [f32], now: f64) {
        self.osc1.render(out, self.frequency, now, self.sample_rate);
        self.osc2.render(out, self.frequency, now, self.sample_rate);
    }

    /// Hard stop. The voice never sounds again.
    pub fn dispose(&mut self) {
        self.osc1.clear();
        self.osc2.clear();
        self.state = VoiceState::Idle;
        self.note = None;
        self.disposed = true;
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn note(&self) -> Option<u8> {
        self.note
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn triggered_at(&self) -> f64 {
        self.triggered_at
    }

    pub fn is_idle(&self) -> bool {
        self.state == VoiceState::Idle
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Running generators across both chains, fading ones included.
    pub fn generator_count(&self) -> usize {
        self.osc1.generators.len() + self.osc2.generators.len()
    }

    pub fn params(&self) -> VoiceParams {
        VoiceParams {
            osc1: self.osc1.spec,
            osc2: self.osc2.spec,
        }
    }
}
