//! The engine: clock, deferred actions and block rendering.
//!
//! ```text
//!  keyboard / MIDI ──→ rtrb ring ──┐
//!                                  ▼
//!  sequencer ──note on/off──→ voice allocator ──→ Σ voices ──→ master gain ──→ effects ──→ out
//! ```
//!
//! Audio is rendered in sub-blocks that end exactly on the next pending
//! deadline, whether that's a sequencer step, a sequencer tick or a voice
//! teardown. Due actions run between sub-blocks, so a step scheduled for
//! t = 1.05 s starts on the first sample at or after 1.05 s no matter how
//! large the host's callback buffer is.

pub mod clock;
pub mod config;
pub mod scheduler;

pub use clock::{AudioClock, SampleClock};
pub use config::{ConfigError, EngineConfig};
pub use scheduler::{EventId, Scheduler};

use log::{debug, trace};

use crate::analysis::tap::OutputTap;
use crate::dsp::param::AutomatedParam;
use crate::effects::chain::EffectsChain;
use crate::effects::params::EffectsParamsUpdate;
use crate::io::midi::cc;
use crate::sequencing::step::{StepListener, StepSequencer};
use crate::synth::allocator::VoiceAllocator;
use crate::synth::message::{MessageReceiver, SynthMessage};
use crate::synth::params::VoiceParamsUpdate;
use crate::MAX_BLOCK_SIZE;

/// Master volume glide, seconds
const MASTER_TIME_CONSTANT: f64 = 0.01;

pub struct Engine {
    clock: SampleClock,
    sample_rate: f32,
    allocator: VoiceAllocator,
    effects: EffectsChain,
    sequencer: StepSequencer,
    master: AutomatedParam,
    master_volume: f32,
    rx: Option<Box<dyn MessageReceiver + Send>>,
    tap: Option<Box<dyn OutputTap + Send>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let sample_rate = config.sample_rate;
        debug!(
            target: "nightdrive::engine",
            "engine at {sample_rate} Hz, {} voices",
            config.polyphony
        );

        Ok(Self {
            clock: SampleClock::new(sample_rate),
            sample_rate,
            allocator: VoiceAllocator::new(config.polyphony, sample_rate, &config.voice),
            effects: EffectsChain::new(sample_rate, &config.effects),
            sequencer: StepSequencer::with_steps(config.steps, config.bpm),
            master: AutomatedParam::new(config.master_volume),
            master_volume: config.master_volume,
            rx: None,
            tap: None,
        })
    }

    /// Attach the message queue drained at the start of every block.
    pub fn with_receiver(mut self, rx: impl MessageReceiver + Send + 'static) -> Self {
        self.rx = Some(Box::new(rx));
        self
    }

    /// Receive a copy of every rendered block, after the effects.
    pub fn with_output_tap(mut self, tap: impl OutputTap + Send + 'static) -> Self {
        self.tap = Some(Box::new(tap));
        self
    }

    pub fn with_step_listener(mut self, listener: impl StepListener + Send + 'static) -> Self {
        self.sequencer.add_listener(listener);
        self
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn note_on(&mut self, note: u8, velocity: u8) {
        let now = self.now();
        self.allocator.note_on(note, velocity, now);
    }

    pub fn note_off(&mut self, note: u8) {
        let now = self.now();
        self.allocator.note_off(note, now);
    }

    pub fn all_notes_off(&mut self) {
        let now = self.now();
        self.allocator.all_notes_off(now);
    }

    pub fn handle_message(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn { note, velocity } => self.note_on(note, velocity),
            SynthMessage::NoteOff { note, .. } => self.note_off(note),
            SynthMessage::AllNotesOff => self.all_notes_off(),
            SynthMessage::ControlChange { controller, value } => match controller {
                cc::VOLUME => self.set_master_volume(value as f32 / 127.0),
                cc::ALL_SOUND_OFF | cc::ALL_NOTES_OFF => self.all_notes_off(),
                _ => trace!(target: "nightdrive::engine", "ignoring CC {controller} = {value}"),
            },
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.master_volume = volume;
        let now = self.now();
        self.master.approach(volume, MASTER_TIME_CONSTANT, now);
    }

    pub fn update_voice_params(&mut self, update: &VoiceParamsUpdate) {
        let now = self.now();
        self.allocator.update_params(update, now);
    }

    pub fn update_effects_params(&mut self, update: &EffectsParamsUpdate) {
        let now = self.now();
        self.effects.update_params(update, now);
    }

    pub fn start_sequencer(&mut self) {
        let now = self.now();
        self.sequencer.start(now);
    }

    pub fn stop_sequencer(&mut self) {
        let now = self.now();
        self.sequencer.stop(now, &mut self.allocator);
    }

    pub fn toggle_sequencer(&mut self) {
        if self.sequencer.is_playing() {
            self.stop_sequencer();
        } else {
            self.start_sequencer();
        }
    }

    pub fn allocator(&self) -> &VoiceAllocator {
        &self.allocator
    }

    pub fn sequencer(&self) -> &StepSequencer {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut StepSequencer {
        &mut self.sequencer
    }

    pub fn effects(&self) -> &EffectsChain {
        &self.effects
    }

    /// Render mono audio into `out`, any length.
    pub fn render(&mut self, out: &mut [f32]) {
        self.drain_messages();

        let mut offset = 0;
        while offset < out.len() {
            let now = self.clock.now();
            self.dispatch_due(now);

            let mut frames = (out.len() - offset).min(MAX_BLOCK_SIZE);
            if let Some(deadline) = self.next_deadline() {
                frames = frames.min(self.clock.frames_until(deadline));
            }

            let block = &mut out[offset..offset + frames];
            block.fill(0.0);
            self.allocator.render(block, now);

            let dt = 1.0 / self.sample_rate as f64;
            for (i, sample) in block.iter_mut().enumerate() {
                *sample *= self.master.value_at(now + i as f64 * dt);
            }
            self.effects.render(block, now);
            if let Some(tap) = self.tap.as_mut() {
                tap.capture(block);
            }

            self.clock.advance(frames);
            offset += frames;
        }
    }

    fn drain_messages(&mut self) {
        let Some(mut rx) = self.rx.take() else {
            return;
        };
        while let Some(message) = rx.pop() {
            self.handle_message(message);
        }
        self.rx = Some(rx);
    }

    fn dispatch_due(&mut self, now: f64) {
        self.sequencer.poll(now, &mut self.allocator);
        self.allocator.poll(now);
    }

    fn next_deadline(&self) -> Option<f64> {
        match (self.sequencer.next_deadline(), self.allocator.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).unwrap()
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EngineConfig::default().with_polyphony(0);
        assert_eq!(Engine::new(config).err(), Some(ConfigError::ZeroPolyphony));
    }

    #[test]
    fn test_silence_without_notes() {
        let mut engine = engine();
        let mut buffer = vec![1.0; 4_096];
        engine.render(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.0));
        assert!((engine.now() - 4_096.0 / 48_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_note_produces_sound() {
        let mut engine = engine();
        engine.note_on(60, 100);
        let mut buffer = vec![0.0; 4_800];
        engine.render(&mut buffer);
        assert!(peak(&buffer) > 0.05);
    }

    #[test]
    fn test_teardown_runs_inside_render() {
        let mut engine = engine();
        engine.note_on(60, 100);
        let mut buffer = vec![0.0; 4_800];
        engine.render(&mut buffer);
        engine.note_off(60);

        // 0.3 s release + 0.1 s grace, rendered in one host callback
        let mut long = vec![0.0; 24_000];
        engine.render(&mut long);
        assert_eq!(engine.allocator().active_count(), 0);
    }

    #[test]
    fn test_sequencer_plays_through_render() {
        let mut engine = engine();
        engine.start_sequencer();
        let mut buffer = vec![0.0; 9_600]; // 0.2 s
        engine.render(&mut buffer);

        // First step sounds 50 ms in
        assert_eq!(peak(&buffer[..2_400]), 0.0);
        assert!(peak(&buffer[2_400..]) > 0.01);
        assert_eq!(engine.allocator().voices()[0].note(), Some(60));
    }

    #[test]
    fn test_stop_sequencer_releases_held_note() {
        let mut engine = engine();
        engine.start_sequencer();
        let mut buffer = vec![0.0; 4_800];
        engine.render(&mut buffer);
        engine.stop_sequencer();

        assert!(!engine.sequencer().is_playing());
        assert!(engine
            .allocator()
            .voices()
            .iter()
            .all(|v| v.state() != crate::synth::VoiceState::Active));
    }

    #[test]
    fn test_control_changes() {
        let mut engine = engine();
        engine.handle_message(SynthMessage::ControlChange {
            controller: cc::VOLUME,
            value: 127,
        });
        assert_eq!(engine.master_volume(), 1.0);

        engine.note_on(60, 100);
        engine.handle_message(SynthMessage::ControlChange {
            controller: cc::ALL_NOTES_OFF,
            value: 0,
        });
        assert_eq!(
            engine.allocator().voices()[0].state(),
            crate::synth::VoiceState::Releasing
        );
    }

    #[test]
    fn test_master_volume_is_clamped() {
        let mut engine = engine();
        engine.set_master_volume(3.0);
        assert_eq!(engine.master_volume(), 1.0);
        engine.set_master_volume(-1.0);
        assert_eq!(engine.master_volume(), 0.0);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn test_messages_drain_from_ring() {
        let (mut tx, rx) = rtrb::RingBuffer::<SynthMessage>::new(16);
        let mut engine = engine().with_receiver(rx);
        tx.push(SynthMessage::NoteOn {
            note: 64,
            velocity: 100,
        })
        .unwrap();

        let mut buffer = vec![0.0; 256];
        engine.render(&mut buffer);
        assert_eq!(engine.allocator().voices()[0].note(), Some(64));
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn test_output_tap_sees_rendered_audio() {
        let (tx, rx) = rtrb::RingBuffer::<f32>::new(8_192);
        let mut reader = crate::analysis::TapReader::new(rx, 1_024);
        let mut engine = engine().with_output_tap(tx);
        engine.note_on(60, 100);

        // Rendered as several MAX_BLOCK_SIZE sub-blocks
        let mut buffer = vec![0.0; 4_800];
        engine.render(&mut buffer);
        assert_eq!(reader.pull(), 4_800);

        let mut latest = vec![0.0; 1_024];
        reader.latest(&mut latest);
        assert_eq!(latest[..], buffer[4_800 - 1_024..]);
    }
}
