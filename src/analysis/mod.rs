// Purpose: read-only views of the rendered output
// The engine pushes every finished block into an OutputTap; a reader on
// another thread keeps a rolling window for scopes and the spectrum.

pub mod spectrum;
pub mod tap;

pub use spectrum::{SpectrumAnalyzer, FFT_SIZE};
#[cfg(feature = "rtrb")]
pub use tap::TapReader;
pub use tap::OutputTap;
