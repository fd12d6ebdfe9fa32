//! Nightdrive - audio device setup and the control loop

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info, warn};
use rtrb::RingBuffer;
use std::sync::atomic::Ordering;

use nightdrive::{
    analysis::{SpectrumAnalyzer, TapReader, FFT_SIZE},
    sequencing::{midi_note_name, StepChange, StepRing},
    synth::SynthMessage,
    Engine, EngineConfig, MAX_BLOCK_SIZE,
};

use super::keys::{Keyboard, KeyAction};

/// Commands sent from the terminal thread to the audio thread
#[derive(Clone, Copy, Debug)]
pub enum ControlMessage {
    Synth(SynthMessage),
    ToggleSequencer,
}

const CONTROL_RING: usize = 256;
const STEP_RING: usize = 64;
const TAP_RING: usize = 4 * FFT_SIZE;
/// Control-loop iterations between meter refreshes
const METER_EVERY: usize = 10;

pub struct Nightdrive {
    bpm: f32,
    polyphony: usize,
    volume: f32,
    autoplay: bool,
}

impl Nightdrive {
    pub fn new() -> Self {
        let defaults = EngineConfig::default();
        Self {
            bpm: defaults.bpm,
            polyphony: defaults.polyphony,
            volume: defaults.master_volume,
            autoplay: false,
        }
    }

    pub fn bpm(mut self, bpm: f32) -> Self {
        self.bpm = bpm;
        self
    }

    pub fn polyphony(mut self, polyphony: usize) -> Self {
        self.polyphony = polyphony;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Start the sequencer as soon as audio is running
    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    /// Open the audio device and run until Esc
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let engine_config = EngineConfig {
            sample_rate,
            polyphony: self.polyphony,
            master_volume: self.volume,
            bpm: self.bpm,
            ..EngineConfig::default()
        };
        let steps = engine_config.steps;

        let (step_tx, mut step_rx) = RingBuffer::<StepChange>::new(STEP_RING);
        let (mut control_tx, mut control_rx) = RingBuffer::<ControlMessage>::new(CONTROL_RING);
        let (tap_tx, tap_rx) = RingBuffer::<f32>::new(TAP_RING);

        let step_ring = StepRing::new(step_tx);
        let dropped_steps = step_ring.dropped();
        let mut reported_drops = 0;

        let mut tap = TapReader::new(tap_rx, FFT_SIZE);
        let mut spectrum = SpectrumAnalyzer::new(FFT_SIZE, sample_rate);
        let mut window = vec![0.0f32; FFT_SIZE];

        let mut engine = Engine::new(engine_config)
            .wrap_err("invalid engine configuration")?
            .with_step_listener(step_ring)
            .with_output_tap(tap_tx);
        if self.autoplay {
            engine.start_sequencer();
        }

        info!(
            target: "nightdrive::engine",
            "{sample_rate} Hz, {channels} channels, {} BPM, {} voices",
            engine.sequencer().bpm(),
            engine.allocator().polyphony()
        );

        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                while let Ok(message) = control_rx.pop() {
                    match message {
                        ControlMessage::Synth(message) => engine.handle_message(message),
                        ControlMessage::ToggleSequencer => engine.toggle_sequencer(),
                    }
                }

                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let block = &mut render_buf[..frames];
                    engine.render(block);

                    // Mono to all channels
                    let out_off = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        for ch in 0..channels {
                            data[out_off + i * channels + ch] = s;
                        }
                    }

                    frames_written += frames;
                }
            },
            |err| error!(target: "nightdrive::engine", "audio stream error: {err}"),
            None,
        )?;

        stream.play()?;

        let mut keyboard = Keyboard::open()?;
        keyboard.status("Z-M / Q-U play, space toggles the sequencer, Esc quits")?;

        let mut step_text = String::from("stopped");
        let mut iterations = 0usize;

        loop {
            let mut redraw = false;
            while let Ok(change) = step_rx.pop() {
                step_text = match change {
                    StepChange::Step(index) => {
                        let step = steps[index];
                        let name = if step.is_rest() {
                            "rest".to_string()
                        } else {
                            midi_note_name(step.note)
                        };
                        format!("step {} {name}", index + 1)
                    }
                    StepChange::Stopped => "stopped".to_string(),
                };
                redraw = true;
            }

            let lost = dropped_steps.load(Ordering::Relaxed);
            if lost > reported_drops {
                warn!(target: "nightdrive::sequencer", "{} step notifications dropped", lost - reported_drops);
                reported_drops = lost;
            }

            iterations += 1;
            if redraw || iterations % METER_EVERY == 0 {
                tap.pull();
                tap.latest(&mut window);
                spectrum.update(&window);
                let meter = match spectrum.peak() {
                    Some((freq, db)) => format!("{freq:>6.0} Hz {db:>6.1} dB"),
                    None => "silent".to_string(),
                };
                let peak = tap.peak();
                keyboard.status(&format!("{step_text:<12} | peak {peak:.2} | {meter}"))?;
            }

            let action = match keyboard.next_action()? {
                Some(action) => action,
                None => continue,
            };
            let message = match action {
                KeyAction::Quit => break,
                KeyAction::ToggleSequencer => ControlMessage::ToggleSequencer,
                KeyAction::NoteOn(note) => ControlMessage::Synth(SynthMessage::NoteOn {
                    note,
                    velocity: 100,
                }),
                KeyAction::NoteOff(note) => ControlMessage::Synth(SynthMessage::NoteOff {
                    note,
                    velocity: 0,
                }),
            };
            if control_tx.push(message).is_err() {
                warn!(target: "nightdrive::engine", "control ring full, dropped {message:?}");
            }
        }

        // Let the last releases ring out through the same queue
        let _ = control_tx.push(ControlMessage::Synth(SynthMessage::AllNotesOff));
        drop(keyboard);
        std::thread::sleep(std::time::Duration::from_millis(150));
        Ok(())
    }
}

impl Default for Nightdrive {
    fn default() -> Self {
        Self::new()
    }
}
