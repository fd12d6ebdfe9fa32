#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

/// Receives each rendered block on the audio thread. Must not block.
pub trait OutputTap {
    fn capture(&mut self, block: &[f32]);
}

impl<F> OutputTap for F
where
    F: FnMut(&[f32]) + Send,
{
    fn capture(&mut self, block: &[f32]) {
        self(block)
    }
}

/// Whatever doesn't fit in the ring is skipped; a scope only needs the
/// recent past.
#[cfg(feature = "rtrb")]
impl OutputTap for Producer<f32> {
    fn capture(&mut self, block: &[f32]) {
        let n = block.len().min(self.slots());
        if let Ok(chunk) = self.write_chunk_uninit(n) {
            chunk.fill_from_iter(block.iter().copied());
        }
    }
}

/// Reader side of a tap ring: keeps the most recent `history` samples.
#[cfg(feature = "rtrb")]
pub struct TapReader {
    rx: Consumer<f32>,
    history: Vec<f32>,
    write: usize,
}

#[cfg(feature = "rtrb")]
impl TapReader {
    pub fn new(rx: Consumer<f32>, history: usize) -> Self {
        Self {
            rx,
            history: vec![0.0; history.max(1)],
            write: 0,
        }
    }

    /// Move everything waiting in the ring into the history. Returns the
    /// number of samples read.
    pub fn pull(&mut self) -> usize {
        let mut read = 0;
        while let Ok(sample) = self.rx.pop() {
            self.history[self.write] = sample;
            self.write = (self.write + 1) % self.history.len();
            read += 1;
        }
        read
    }

    /// Copy the latest `out.len()` samples into `out`, oldest first.
    /// `out` longer than the history is left-padded with silence.
    pub fn latest(&self, out: &mut [f32]) {
        let len = self.history.len();
        let pad = out.len().saturating_sub(len);
        out[..pad].fill(0.0);
        let take = out.len() - pad;
        let start = (self.write + len - take) % len;
        for (i, slot) in out[pad..].iter_mut().enumerate() {
            *slot = self.history[(start + i) % len];
        }
    }

    /// Peak magnitude over the whole history.
    pub fn peak(&self) -> f32 {
        self.history.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }
}
