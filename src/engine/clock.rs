/// Source of audio time, in seconds.
pub trait AudioClock {
    fn now(&self) -> f64;
}

/// Audio time derived from the number of frames rendered so far.
#[derive(Debug, Clone, Copy)]
pub struct SampleClock {
    frames: u64,
    sample_rate: f64,
}

impl SampleClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frames: 0,
            sample_rate: sample_rate as f64,
        }
    }

    pub fn advance(&mut self, frames: usize) {
        self.frames += frames as u64;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Whole frames from now until `deadline`, rounded up, at least one.
    pub fn frames_until(&self, deadline: f64) -> usize {
        let frames = ((deadline - self.now()) * self.sample_rate).ceil();
        if frames.is_finite() && frames >= 1.0 {
            frames as usize
        } else {
            1
        }
    }
}

impl AudioClock for SampleClock {
    fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate
    }
}
