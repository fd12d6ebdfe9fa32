//! Reverb - Room Simulation via Delay Networks
//!
//! A Schroeder network: four parallel feedback combs build the dense tail,
//! two series allpasses smear it so individual echoes blur together.
//!
//! ```text
//! Input ──┬──→ [Comb 1] ──┐
//!         ├──→ [Comb 2] ──┤
//!         ├──→ [Comb 3] ──┼──→ (+) ──→ [Allpass 1] ──→ [Allpass 2] ──→ Output
//!         └──→ [Comb 4] ──┘
//! ```
//!
//! ## Decay Time
//!
//! The tail length is expressed as RT60, the time it takes the tail to fall
//! by 60 dB. A comb with loop delay `d` loses `20·log10(g)` dB every trip
//! round the loop, so for a tail of `T` seconds each comb gets its own gain:
//!
//! ```text
//! g = 10^(-3 · d / T)
//! ```
//!
//! Longer combs need less feedback to ring for the same time. The gains are a
//! structural property of the network and are only recomputed when the decay
//! changes.

/// Comb loop delays in ms, mutually prime to avoid resonant build-up
const COMB_DELAYS_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];
const ALLPASS_DELAYS_MS: [f32; 2] = [5.0, 1.7];

pub struct CombFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
            feedback: 0.5,
            damp: 0.2,
            filter_state: 0.0,
        }
    }

    pub fn delay_samples(&self) -> usize {
        self.buffer.len()
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.995);
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.write_pos];

        // One-pole lowpass in the loop: highs die faster than lows
        self.filter_state = output * (1.0 - self.damp) + self.filter_state * self.damp;
        self.buffer[self.write_pos] = input + self.filter_state * self.feedback;

        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}

pub struct AllpassFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    feedback: f32,
}

impl AllpassFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
            feedback: 0.5,
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        let output = -self.feedback * input + delayed;
        self.buffer[self.write_pos] = input + self.feedback * output;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

pub struct SchroederReverb {
    combs: [CombFilter; 4],
    allpasses: [AllpassFilter; 2],
    sample_rate: f32,
    decay: f32,
}

impl SchroederReverb {
    pub fn new(sample_rate: f32, decay: f32) -> Self {
        let samples = |ms: f32| (ms * sample_rate / 1000.0) as usize;
        let mut reverb = Self {
            combs: COMB_DELAYS_MS.map(|ms| CombFilter::new(samples(ms))),
            allpasses: ALLPASS_DELAYS_MS.map(|ms| AllpassFilter::new(samples(ms))),
            sample_rate,
            decay: f32::NAN,
        };
        reverb.set_decay(decay);
        reverb
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Retune the comb feedback for a new RT60. Returns false when the decay
    /// is unchanged.
    pub fn set_decay(&mut self, decay: f32) -> bool {
        let decay = decay.max(0.01);
        if decay == self.decay {
            return false;
        }
        self.decay = decay;
        for comb in &mut self.combs {
            let loop_seconds = comb.delay_samples() as f32 / self.sample_rate;
            comb.set_feedback(10f32.powf(-3.0 * loop_seconds / decay));
        }
        true
    }

    pub fn comb_feedback(&self) -> [f32; 4] {
        [
            self.combs[0].feedback(),
            self.combs[1].feedback(),
            self.combs[2].feedback(),
            self.combs[3].feedback(),
        ]
    }

    pub fn set_damping(&mut self, damp: f32) {
        for comb in &mut self.combs {
            comb.set_damp(damp);
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let mut output = 0.0;
        for comb in &mut self.combs {
            output += comb.process(input);
        }
        output *= 0.25;

        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }
        output
    }

    pub fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.reset();
        }
        for allpass in &mut self.allpasses {
            allpass.reset();
        }
    }
}
