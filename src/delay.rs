//! Tapped delay line for the second (delayed) propagation path

use tracing::warn;

use crate::error::{zeroed, Result};
use crate::ComplexSample;

/// Delay line capacity; the longest usable delay is `DELAY_TAPS - 1` samples
pub const DELAY_TAPS: usize = 256;

/// Fixed-capacity complex delay line.
///
/// The read position trails the write position by `taps` slots; both advance
/// together, modulo `DELAY_TAPS`.
pub struct DelayLine {
    buffer: Vec<ComplexSample>,
    write_idx: usize,
    read_idx: usize,
    taps: usize,
    requested_taps: usize,
}

impl DelayLine {
    /// Create a delay line for `delay_s` seconds at `sample_rate` Hz.
    ///
    /// The delay is rounded to whole samples with a minimum of one. Delays
    /// beyond `DELAY_TAPS - 1` samples are clamped with a warning.
    pub fn new(delay_s: f32, sample_rate: u32) -> Result<Self> {
        let requested = (delay_s.max(0.0) * sample_rate as f32).round() as usize;
        let mut taps = requested.max(1);

        if taps > DELAY_TAPS - 1 {
            taps = DELAY_TAPS - 1;
            warn!(
                requested_taps = requested,
                effective_taps = taps,
                "path delay too long, limiting to {:.1} ms",
                taps as f32 / sample_rate as f32 * 1000.0
            );
        }

        Ok(Self {
            buffer: zeroed(DELAY_TAPS, "delay line")?,
            write_idx: 0,
            read_idx: DELAY_TAPS - taps,
            taps,
            requested_taps: requested,
        })
    }

    /// Store `sample` and return the one pushed `taps` calls earlier
    pub fn push(&mut self, sample: ComplexSample) -> ComplexSample {
        self.buffer[self.write_idx] = sample;
        let out = self.buffer[self.read_idx];

        self.write_idx = (self.write_idx + 1) % DELAY_TAPS;
        self.read_idx = (self.read_idx + 1) % DELAY_TAPS;

        out
    }

    /// Effective delay in samples
    pub fn taps(&self) -> usize {
        self.taps
    }

    /// Delay in samples before clamping (may be 0)
    pub fn requested_taps(&self) -> usize {
        self.requested_taps
    }

    /// True when the requested delay did not fit and was limited
    pub fn is_clamped(&self) -> bool {
        self.requested_taps > self.taps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::capture_logs;

    fn ramp(n: usize) -> Vec<ComplexSample> {
        (0..n).map(|i| ComplexSample::new(i as f32 + 1.0, -(i as f32) - 1.0)).collect()
    }

    #[test]
    fn test_pure_delay() {
        for &(delay_s, expected_taps) in &[(0.5e-3_f32, 4usize), (1.0e-3, 8), (2.0e-3, 16), (0.03, 240)] {
            let mut line = DelayLine::new(delay_s, 8000).unwrap();
            assert_eq!(line.taps(), expected_taps);

            let input = ramp(1000);
            let output: Vec<ComplexSample> = input.iter().map(|&s| line.push(s)).collect();

            for (i, out) in output.iter().enumerate() {
                if i < expected_taps {
                    assert_eq!(*out, ComplexSample::new(0.0, 0.0), "Sample {} should be silent", i);
                } else {
                    assert_eq!(*out, input[i - expected_taps], "Sample {} not delayed by {}", i, expected_taps);
                }
            }
        }
    }

    #[test]
    fn test_zero_delay_rounds_up_to_one() {
        let mut line = DelayLine::new(0.0, 8000).unwrap();
        assert_eq!(line.taps(), 1);
        assert!(!line.is_clamped());

        let a = ComplexSample::new(1.0, 2.0);
        let b = ComplexSample::new(3.0, 4.0);
        assert_eq!(line.push(a), ComplexSample::new(0.0, 0.0));
        assert_eq!(line.push(b), a);
    }

    #[test]
    fn test_delay_rounding() {
        // 0.3 ms at 8000 Hz = 2.4 samples -> 2; 0.33 ms = 2.64 -> 3
        assert_eq!(DelayLine::new(0.3e-3, 8000).unwrap().taps(), 2);
        assert_eq!(DelayLine::new(0.33e-3, 8000).unwrap().taps(), 3);
    }

    #[test]
    fn test_long_delay_is_clamped() {
        let (line, logs) = capture_logs(|| DelayLine::new(0.040, 8000).unwrap());
        assert_eq!(line.requested_taps(), 320);
        assert_eq!(line.taps(), DELAY_TAPS - 1);
        assert!(line.is_clamped());

        assert!(logs.contains("WARN"), "Clamping should log a warning: {}", logs);
        assert!(logs.contains("path delay too long"), "Missing clamp message: {}", logs);
        assert!(logs.contains("requested_taps=320"), "Missing requested taps: {}", logs);
        assert!(logs.contains("effective_taps=255"), "Missing effective taps: {}", logs);
    }

    #[test]
    fn test_short_delay_logs_nothing() {
        let (line, logs) = capture_logs(|| DelayLine::new(0.002, 8000).unwrap());
        assert_eq!(line.taps(), 16);
        assert!(!logs.contains("path delay too long"), "Unexpected warning: {}", logs);
    }

    #[test]
    fn test_clamped_line_still_delays() {
        let mut line = DelayLine::new(1.0, 8000).unwrap();
        let input = ramp(600);
        let output: Vec<ComplexSample> = input.iter().map(|&s| line.push(s)).collect();

        for i in 255..600 {
            assert_eq!(output[i], input[i - 255]);
        }
    }

    #[test]
    fn test_max_unclamped_delay() {
        // 255 samples exactly fits
        let line = DelayLine::new(255.0 / 8000.0, 8000).unwrap();
        assert_eq!(line.taps(), 255);
        assert!(!line.is_clamped());
    }
}
