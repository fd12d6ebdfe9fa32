// Purpose: master-bus processing
// Each processing effect is an EffectSlot (dry/wet blend) around a Processor;
// the chain wires them in a fixed order behind the voice bus.

pub mod chain;
pub mod chorus;
pub mod distortion;
pub mod eq;
pub mod params;
pub mod reverb;
pub mod slot;

pub use chain::EffectsChain;
pub use params::{
    ChorusParams, ChorusUpdate, DistortionParams, DistortionUpdate, EffectsParams,
    EffectsParamsUpdate, EqParams, EqUpdate, ReverbParams, ReverbUpdate,
};
pub use slot::{EffectSlot, Processor};
