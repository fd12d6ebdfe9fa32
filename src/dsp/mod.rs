//! Low-level DSP primitives used by voices and effects.
//!
//! Everything in here is allocation-free once constructed, so it is safe to
//! embed directly inside voice and effect structs that run on the audio
//! callback.

/// Shelving, peaking and low-pass biquads.
pub mod biquad;
/// Interpolating circular delay line.
pub mod delay;
/// Lookup-table waveshaper.
pub mod distortion;
/// State-variable filter with four responses.
pub mod filter;
/// Band-limited waveform generators.
pub mod oscillator;
/// 4x oversampling around a nonlinear stage.
pub mod oversample;
/// Scheduled parameter trajectories (set, approach, linear ramp).
pub mod param;
/// Schroeder reverb network.
pub mod reverb;

pub use filter::FilterType;
pub use oscillator::Waveform;
pub use param::AutomatedParam;
