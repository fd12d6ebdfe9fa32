//! Spectrum analysis
//!
//! FFT magnitude of the output, Hann windowed, with a log-spaced band view
//! for display.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Analysis window, samples
pub const FFT_SIZE: usize = 2048;

/// Number of log-spaced display bands
const BANDS: usize = 48;
const FLOOR_DB: f64 = -120.0;

pub struct SpectrumAnalyzer {
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    sample_rate: f32,
    /// Power in dB for every bin below Nyquist
    bins_db: Vec<f64>,
    /// (frequency Hz, bin index) per display band
    band_bins: Vec<(f64, usize)>,
    bands: Vec<(f64, f64)>,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize, sample_rate: f32) -> Self {
        let fft_size = fft_size.max(2);
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        // Hann window - reduces spectral leakage
        let denom = (fft_size - 1) as f32;
        let window = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / denom).cos()))
            .collect();

        let half = fft_size / 2;
        let max_freq = (sample_rate as f64 / 2.0).min(20_000.0).max(21.0);
        let ratio = max_freq / 20.0;
        let band_bins = (0..BANDS)
            .map(|i| {
                let freq = 20.0 * ratio.powf(i as f64 / (BANDS - 1) as f64);
                let index = (freq * fft_size as f64 / sample_rate as f64).round() as usize;
                (freq, index.min(half - 1))
            })
            .collect::<Vec<_>>();
        let bands = band_bins.iter().map(|&(f, _)| (f, FLOOR_DB)).collect();

        Self {
            window,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            sample_rate,
            bins_db: vec![FLOOR_DB; half],
            band_bins,
            bands,
        }
    }

    /// Analyse one window. Buffers of the wrong length are ignored and
    /// return false.
    pub fn update(&mut self, buffer: &[f32]) -> bool {
        if buffer.len() != self.window.len() {
            return false;
        }

        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(buffer).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        for (db, bin) in self.bins_db.iter_mut().zip(&self.scratch) {
            let power = (bin.re * bin.re + bin.im * bin.im) as f64;
            *db = if power > 1e-12 {
                10.0 * power.log10()
            } else {
                FLOOR_DB
            };
        }
        for (band, &(freq, index)) in self.bands.iter_mut().zip(&self.band_bins) {
            *band = (freq, self.bins_db[index]);
        }
        true
    }

    /// Display bands: (frequency Hz, magnitude dB).
    pub fn bands(&self) -> &[(f64, f64)] {
        &self.bands
    }

    /// Loudest bin above DC as (frequency Hz, magnitude dB).
    pub fn peak(&self) -> Option<(f64, f64)> {
        let bin_width = self.sample_rate as f64 / self.window.len() as f64;
        self.bins_db
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .filter(|&(_, &db)| db > FLOOR_DB)
            .map(|(i, &db)| (i as f64 * bin_width, db))
    }
}
