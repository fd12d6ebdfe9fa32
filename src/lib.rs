pub mod analysis; // Output tap and spectrum
pub mod dsp; // Signal primitives and parameter automation
pub mod effects; // Dry/wet effect slots and the series effects chain
pub mod engine; // Clock, scheduling and block rendering
pub mod io;
pub mod sequencing; // Look-ahead step sequencer
pub mod synth; // Voices, voice allocation and patch parameters

pub use engine::{ConfigError, Engine, EngineConfig};

pub const MAX_BLOCK_SIZE: usize = 2048;
