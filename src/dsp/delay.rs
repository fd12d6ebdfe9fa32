/// Circular delay buffer, allocated once at construction.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Create a delay line holding up to `max_seconds` of audio.
    pub fn new(max_seconds: f32, sample_rate: f32) -> Self {
        let len = ((max_seconds * sample_rate).ceil() as usize).max(2) + 2;
        Self {
            buffer: vec![0.0; len],
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len() - 2
    }

    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Read `delay_samples` behind the most recent write, linearly
    /// interpolating between neighbours so modulated delays glide.
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(1.0, self.capacity() as f32);
        let whole = delay.floor();
        let frac = delay - whole;

        let newest = (self.write_pos + len - 1) % len;
        let a = (newest + len - whole as usize + 1) % len;
        let b = (a + len - 1) % len;

        self.buffer[a] * (1.0 - frac) + self.buffer[b] * frac
    }

    /// Read then write: returns the sample from `delay_samples` ago.
    pub fn process(&mut self, sample: f32, delay_samples: f32) -> f32 {
        let delayed = self.read_interpolated(delay_samples);
        self.write(sample);
        delayed
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
