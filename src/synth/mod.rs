// Purpose: voices, voice allocation, patch parameters
// This layer turns note events into running oscillator chains

pub mod allocator;
pub mod message;
pub mod params;
pub mod voice;

pub use allocator::VoiceAllocator;
pub use message::{MessageReceiver, SynthMessage};
pub use params::{
    Adsr, AdsrUpdate, OscillatorId, OscillatorSpec, OscillatorUpdate, VoiceParams,
    VoiceParamsUpdate,
};
pub use voice::{Voice, VoiceState};

/// Anything that can be played: the allocator in production, a recorder in
/// tests.
pub trait NoteHandler {
    fn note_on(&mut self, note: u8, velocity: u8, now: f64);
    fn note_off(&mut self, note: u8, now: f64);
}
