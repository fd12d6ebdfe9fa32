/*
Note Numbers
============

Middle C (C4) is MIDI note 60, A4 = 69 = 440 Hz.

  note = 12 * (octave + 1) + semitone

  semitone: C=0 C#=1 D=2 D#=3 E=4 F=5 F#=6 G=7 G#=8 A=9 A#=10 B=11

Names use sharps only, so note 61 is "C#4", never "Db4". Octave -1 covers
notes 0-11.
*/

pub const C2: u8 = 36;
pub const C3: u8 = 48;
pub const C4: u8 = 60;
pub const A4: u8 = 69;
pub const C5: u8 = 72;
pub const C6: u8 = 84;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Display name of a MIDI note, e.g. `60 → "C4"`.
pub fn midi_note_name(note: u8) -> String {
    let name = NOTE_NAMES[(note % 12) as usize];
    let octave = (note / 12) as i32 - 1;
    format!("{name}{octave}")
}
