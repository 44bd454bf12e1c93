//! Windowed RMS estimate of the input signal, refreshed periodically
//!
//! The estimate is recomputed over the whole window once every `interval`
//! calls and held in between. Staleness is bounded by `interval` samples.

use crate::error::{zeroed, ChansimError, Result};

/// Window length used by the channel
pub const DEFAULT_WINDOW: usize = 256;

/// Refresh interval used by the channel
pub const DEFAULT_INTERVAL: usize = 64;

pub struct RmsEstimator {
    buffer: Vec<f32>,
    write_idx: usize,
    interval: usize,
    counter: usize,
    rms: f32,
}

impl RmsEstimator {
    pub fn new(window: usize, interval: usize) -> Result<Self> {
        if window == 0 || interval == 0 {
            return Err(ChansimError::InvalidConfig(format!(
                "RMS window ({}) and interval ({}) must be non-zero",
                window, interval
            )));
        }

        Ok(Self {
            buffer: zeroed(window, "RMS window")?,
            write_idx: 0,
            interval,
            counter: 0,
            rms: 0.0,
        })
    }

    /// Record `sample` and return the current (possibly stale) estimate
    pub fn update(&mut self, sample: f32) -> f32 {
        self.buffer[self.write_idx] = sample;
        self.write_idx = (self.write_idx + 1) % self.buffer.len();

        self.counter += 1;
        if self.counter == self.interval {
            self.rms = window_rms(&self.buffer);
            self.counter = 0;
        }

        self.rms
    }

    /// Last computed estimate
    pub fn value(&self) -> f32 {
        self.rms
    }

    pub fn window(&self) -> usize {
        self.buffer.len()
    }

    pub fn interval(&self) -> usize {
        self.interval
    }
}

/// sqrt(E[x²] - E[x]²), the AC RMS of the window
fn window_rms(buf: &[f32]) -> f32 {
    let (sum, power) = buf.iter().fold((0.0_f32, 0.0_f32), |(s, p), &x| (s + x, p + x * x));
    let len = buf.len() as f32;
    let mean = sum / len;
    (power / len - mean * mean).max(0.0).sqrt()
}
