// Purpose - external interfaces, format conversions

pub mod converter;
pub mod keymap;
pub mod midi;

pub use converter::{midi_to_freq, midi_to_synth};
pub use keymap::key_to_note;
pub use midi::MidiEvent;
