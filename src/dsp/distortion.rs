//! Distortion / Waveshaping
//!
//! Distortion adds harmonics by reshaping the waveform. A waveshaper applies
//! a transfer function to every sample:
//!
//!   output = f(input)
//!
//! The curve used here is a normalised hyperbolic tangent:
//!
//!   f(x) = tanh(k · x) / tanh(k)
//!
//! Dividing by `tanh(k)` pins f(±1) to ±1, so raising the drive `k` adds
//! saturation without changing the peak level.
//!
//! # Drive Values
//!
//!   1    = Barely coloured
//!   5-10 = Warm, obvious saturation
//!   50+  = Close to a square wave
//!
//! The curve is baked into a lookup table and read with linear
//! interpolation. Rebuilding the table is the expensive part, so it only
//! happens when the drive actually changes.

pub const CURVE_SAMPLES: usize = 1024;

#[derive(Debug, Clone)]
pub struct WaveshaperCurve {
    table: [f32; CURVE_SAMPLES],
    drive: f32,
}

impl WaveshaperCurve {
    pub fn new(drive: f32) -> Self {
        let mut curve = Self {
            table: [0.0; CURVE_SAMPLES],
            drive: f32::NAN,
        };
        curve.set_drive(drive);
        curve
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }

    /// Rebuild the table for a new drive. Returns false when the drive is
    /// unchanged and nothing was recomputed.
    pub fn set_drive(&mut self, drive: f32) -> bool {
        let drive = drive.max(0.01);
        if drive == self.drive {
            return false;
        }
        self.drive = drive;

        let norm = drive.tanh();
        for (i, slot) in self.table.iter_mut().enumerate() {
            let x = (2 * i) as f32 / (CURVE_SAMPLES - 1) as f32 - 1.0;
            *slot = (drive * x).tanh() / norm;
        }
        true
    }

    /// Shape one sample. Input outside [-1, 1] saturates at the curve ends.
    #[inline]
    pub fn shape(&self, sample: f32) -> f32 {
        let pos = (sample.clamp(-1.0, 1.0) + 1.0) * 0.5 * (CURVE_SAMPLES - 1) as f32;
        let index = (pos as usize).min(CURVE_SAMPLES - 2);
        let frac = pos - index as f32;
        self.table[index] * (1.0 - frac) + self.table[index + 1] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_endpoints_are_normalised() {
        let curve = WaveshaperCurve::new(10.0);
        assert!((curve.shape(1.0) - 1.0).abs() < 1e-5);
        assert!((curve.shape(-1.0) + 1.0).abs() < 1e-5);
        assert!(curve.shape(0.0).abs() < 0.01);
    }

    #[test]
    fn higher_drive_saturates_harder() {
        let soft = WaveshaperCurve::new(1.0);
        let hard = WaveshaperCurve::new(20.0);
        assert!(hard.shape(0.2) > soft.shape(0.2));
        assert!(hard.shape(0.2) > 0.9);
    }

    #[test]
    fn unchanged_drive_does_not_rebuild() {
        let mut curve = WaveshaperCurve::new(4.0);
        assert!(!curve.set_drive(4.0));
        assert!(curve.set_drive(8.0));
        assert_eq!(curve.drive(), 8.0);
    }

    #[test]
    fn input_beyond_range_saturates() {
        let curve = WaveshaperCurve::new(3.0);
        assert_eq!(curve.shape(4.0), curve.shape(1.0));
    }
}
