use crate::{io::midi::MidiEvent, synth::message::SynthMessage};

/// Translate a MIDI event on `channel_filter` into a synth message.
///
/// Note-on with velocity 0 is a note-off, as running-status keyboards send
/// it. Data bytes are masked to 7 bits.
pub fn midi_to_synth(midi: MidiEvent, channel_filter: u8) -> Option<SynthMessage> {
    if midi.channel() != channel_filter {
        return None;
    }
    match midi {
        MidiEvent::NoteOn { key, velocity: 0, .. } => Some(SynthMessage::NoteOff {
            note: key & 0x7f,
            velocity: 0,
        }),
        MidiEvent::NoteOn { key, velocity, .. } => Some(SynthMessage::NoteOn {
            note: key & 0x7f,
            velocity: velocity & 0x7f,
        }),
        MidiEvent::NoteOff { key, velocity, .. } => Some(SynthMessage::NoteOff {
            note: key & 0x7f,
            velocity: velocity & 0x7f,
        }),
        MidiEvent::ControlChange {
            controller, value, ..
        } => Some(SynthMessage::ControlChange {
            controller: controller & 0x7f,
            value: value & 0x7f,
        }),
        MidiEvent::PitchBend { .. } | MidiEvent::ProgramChange { .. } => None,
    }
}

/// Equal-tempered frequency, A4 (note 69) = 440 Hz. Notes above 127 play as
/// 127.
pub fn midi_to_freq(note: u8) -> f32 {
    let note = note.min(127);
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}
