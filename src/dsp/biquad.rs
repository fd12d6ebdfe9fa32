//! Shelving and peaking biquads for tone shaping, plus a plain low-pass.
//!
//! Coefficients follow Robert Bristow-Johnson's Audio EQ Cookbook. The three
//! tone shapes are unity gain at 0 dB, so an EQ band with its gain parked at
//! zero is transparent. `LowPass` ignores the gain.

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiquadKind {
    LowPass,
    LowShelf,
    Peaking,
    HighShelf,
}

#[derive(Debug, Clone)]
pub struct Biquad {
    kind: BiquadKind,
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
    // Last parameters the coefficients were built from
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
}

impl Biquad {
    pub fn new(kind: BiquadKind, frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> Self {
        let mut biquad = Self {
            kind,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            frequency: f32::NAN,
            q,
            gain_db,
            sample_rate,
        };
        biquad.set_params(frequency, q, gain_db, sample_rate);
        biquad
    }

    /// Recompute coefficients if any parameter moved.
    pub fn set_params(&mut self, frequency: f32, q: f32, gain_db: f32, sample_rate: f32) {
        if frequency == self.frequency
            && q == self.q
            && gain_db == self.gain_db
            && sample_rate == self.sample_rate
        {
            return;
        }
        self.frequency = frequency;
        self.q = q;
        self.gain_db = gain_db;
        self.sample_rate = sample_rate;

        let fs = sample_rate as f64;
        let f0 = (frequency as f64).clamp(10.0, fs * 0.49);
        let a = 10f64.powf(gain_db as f64 / 40.0);
        let w0 = 2.0 * PI * f0 / fs;
        let (sin_w0, cos_w0) = w0.sin_cos();

        let (b0, b1, b2, a0, a1, a2) = match self.kind {
            BiquadKind::LowPass => {
                let alpha = sin_w0 / (2.0 * (q as f64).max(0.01));
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            BiquadKind::Peaking => {
                let alpha = sin_w0 / (2.0 * (q as f64).max(0.01));
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
            BiquadKind::LowShelf | BiquadKind::HighShelf => {
                // Shelf slope S = 1
                let alpha = sin_w0 / 2.0 * 2.0f64.sqrt();
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                if self.kind == BiquadKind::LowShelf {
                    (
                        a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                        2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                        a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                        (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                        -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                        (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                    )
                } else {
                    (
                        a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                        -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                        a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                        (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                        2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                        (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                    )
                }
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let x = input as f64;
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y as f32
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}
