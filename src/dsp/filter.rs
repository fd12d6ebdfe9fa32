use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| type              | passes                 | rejects               |
| ----------------- | ---------------------- | --------------------- |
| low-pass          | below cutoff           | above cutoff          |
| high-pass         | above cutoff           | below cutoff          |
| band-pass         | around cutoff          | both sides            |
| notch / band-stop | everything but cutoff  | a narrow band         |

Topology-preserving (TPT) state-variable filter. One pass produces all four
responses; `filter_type` picks which one leaves the filter.

  g = tan(π · fc / fs)      integrator gain, pre-warped
  k = 1 / Q                 damping

Q is the resonance as the patch stores it (0-30). Low Q gives a gentle
rolloff, Q = 0.707 is Butterworth-flat, anything above ~5 rings audibly at the
cutoff. The structure stays stable for every positive k, so Q is only floored
to keep k finite.
*/

const MIN_Q: f32 = 0.05;
const MAX_Q: f32 = 30.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    #[default]
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
    pub notch: f32,
}

#[derive(Debug, Clone)]
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory
    filter_type: FilterType,
    cutoff_hz: f32,
    q: f32,
    sample_rate: f32,
    g: f32,
    k: f32,
}

impl SVFilter {
    pub fn new(filter_type: FilterType, cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            filter_type,
            cutoff_hz: 0.0,
            q: 0.0,
            sample_rate: 0.0,
            g: 0.0,
            k: 1.0,
        };
        filter.set_params(cutoff_hz, q, sample_rate);
        filter
    }

    pub fn lowpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::LowPass, cutoff_hz, 0.707, sample_rate)
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    /// Update cutoff and resonance. Coefficients are only recomputed when a
    /// value actually moved, so this is cheap to call every sample.
    #[inline]
    pub fn set_params(&mut self, cutoff_hz: f32, q: f32, sample_rate: f32) {
        if cutoff_hz == self.cutoff_hz && q == self.q && sample_rate == self.sample_rate {
            return;
        }
        self.cutoff_hz = cutoff_hz;
        self.q = q;
        self.sample_rate = sample_rate;

        let nyquist_guard = sample_rate * 0.49;
        let fc = cutoff_hz.clamp(10.0, nyquist_guard.max(10.0));
        self.g = (PI * fc / sample_rate).tan();
        self.k = 1.0 / q.clamp(MIN_Q, MAX_Q);
    }

    #[inline]
    pub fn next_sample(&mut self, sample: f32) -> FilterOutputs {
        let (g, k) = (self.g, self.k);
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
            notch: sample - k * v1,
        }
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let outputs = self.next_sample(sample);
        match self.filter_type {
            FilterType::LowPass => outputs.lowpass,
            FilterType::HighPass => outputs.highpass,
            FilterType::BandPass => outputs.bandpass,
            FilterType::Notch => outputs.notch,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
