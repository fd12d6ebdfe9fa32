pub mod notes;
pub mod step;

pub use notes::midi_note_name;
#[cfg(feature = "rtrb")]
pub use step::StepRing;
pub use step::{SequencerStep, StepChange, StepListener, StepSequencer, STEP_COUNT};
