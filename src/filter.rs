//! Band-pass Hilbert transformer
//!
//! Turns a real input into an analytic (I/Q) signal limited to the channel
//! passband. Two FIR kernels share one design:
//! - in-phase: difference of two windowed sincs (band-pass)
//! - quadrature: difference of two windowed "cosc" terms (band-pass Hilbert)
//!
//! Both use a Hamming window and have -6 dB corners at `f1` and `f2`
//! (fractions of the sample rate).
//!
//! History is kept in linear buffers of `BUFFER_LEN` samples. When the cursor
//! reaches the end, the last `FILTER_LEN` samples are copied to the front, so
//! the dot product always reads one contiguous slice.

use std::f64::consts::PI;

use crate::error::{zeroed, ChansimError, Result};
use crate::ComplexSample;

/// Number of taps in each kernel
pub const FILTER_LEN: usize = 64;

/// History buffer length per channel (a multiple of `FILTER_LEN`)
pub const BUFFER_LEN: usize = 1024;

#[inline]
fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-10 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Impulse-response shape of an ideal band-limited Hilbert transformer
#[inline]
fn cosc(x: f64) -> f64 {
    if x.abs() < 1e-10 {
        0.0
    } else {
        (1.0 - (PI * x).cos()) / (PI * x)
    }
}

#[inline]
fn hamming(x: f64) -> f64 {
    0.54 - 0.46 * (2.0 * PI * x).cos()
}

/// FIR band-pass Hilbert transformer producing analytic samples
pub struct AnalyticFilter {
    i_kernel: Vec<f32>,
    q_kernel: Vec<f32>,
    i_history: Vec<f32>,
    q_history: Vec<f32>,
    // Next write position; always >= FILTER_LEN - 1
    cursor: usize,
}

impl AnalyticFilter {
    /// Design the filter for corners `f1 < f2`, both as fractions of the
    /// sample rate with `0 <= f1 < f2 <= 0.5`.
    pub fn new(f1: f32, f2: f32) -> Result<Self> {
        if !(f1 >= 0.0 && f1 < f2 && f2 <= 0.5) {
            return Err(ChansimError::InvalidBand { f1, f2 });
        }

        let mut i_kernel = zeroed(FILTER_LEN, "analytic filter I kernel")?;
        let mut q_kernel = zeroed(FILTER_LEN, "analytic filter Q kernel")?;
        let i_history = zeroed(BUFFER_LEN, "analytic filter I history")?;
        let q_history = zeroed(BUFFER_LEN, "analytic filter Q history")?;

        let (f1, f2) = (f1 as f64, f2 as f64);
        let center = (FILTER_LEN as f64 - 1.0) / 2.0;

        for n in 0..FILTER_LEN {
            let t = n as f64 - center;
            let window = hamming(n as f64 / (FILTER_LEN as f64 - 1.0));

            let ih = 2.0 * f2 * sinc(2.0 * f2 * t) - 2.0 * f1 * sinc(2.0 * f1 * t);
            let qh = 2.0 * f2 * cosc(2.0 * f2 * t) - 2.0 * f1 * cosc(2.0 * f1 * t);

            i_kernel[n] = (ih * window) as f32;
            // The dot product runs oldest-to-newest, i.e. time reversed.
            // The Hilbert kernel is antisymmetric, so reversal is a sign flip.
            q_kernel[n] = -(qh * window) as f32;
        }

        Ok(Self {
            i_kernel,
            q_kernel,
            i_history,
            q_history,
            cursor: FILTER_LEN - 1,
        })
    }

    /// Filter one complex input sample and return the analytic output
    pub fn process(&mut self, input: ComplexSample) -> ComplexSample {
        self.i_history[self.cursor] = input.re;
        self.q_history[self.cursor] = input.im;

        // Window ends at the sample just written: no extra sample of latency
        let start = self.cursor + 1 - FILTER_LEN;
        let end = self.cursor + 1;
        let re = dot(&self.i_history[start..end], &self.i_kernel);
        let im = dot(&self.q_history[start..end], &self.q_kernel);

        self.cursor += 1;
        if self.cursor == BUFFER_LEN {
            // Keep the newest FILTER_LEN - 1 samples in front of the cursor
            let keep = FILTER_LEN - 1;
            self.i_history.copy_within(BUFFER_LEN - keep..BUFFER_LEN, 0);
            self.q_history.copy_within(BUFFER_LEN - keep..BUFFER_LEN, 0);
            self.cursor = keep;
        }

        ComplexSample::new(re, im)
    }

    /// Filter a real sample (imaginary input zero)
    pub fn process_real(&mut self, x: f32) -> ComplexSample {
        self.process(ComplexSample::new(x, 0.0))
    }

    /// In-phase kernel, oldest tap first
    pub fn i_kernel(&self) -> &[f32] {
        &self.i_kernel
    }

    /// Quadrature kernel, oldest tap first
    pub fn q_kernel(&self) -> &[f32] {
        &self.q_kernel
    }

    /// Clear the sample history
    pub fn reset(&mut self) {
        self.i_history.iter_mut().for_each(|x| *x = 0.0);
        self.q_history.iter_mut().for_each(|x| *x = 0.0);
        self.cursor = FILTER_LEN - 1;
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const SAMPLE_RATE: f64 = 8000.0;

    fn default_filter() -> AnalyticFilter {
        AnalyticFilter::new(200.0 / 8000.0, 3200.0 / 8000.0).unwrap()
    }

    /// Feed a tone as (x, x) and return the settled analytic output
    fn run_tone(filter: &mut AnalyticFilter, freq_hz: f64, num_samples: usize) -> Vec<ComplexSample> {
        (0..num_samples)
            .map(|i| {
                let x = (2.0 * PI * freq_hz * i as f64 / SAMPLE_RATE).cos() as f32;
                filter.process(ComplexSample::new(x, x))
            })
            .collect()
    }

    fn rms(values: impl Iterator<Item = f32>) -> f64 {
        let (sum, n) = values.fold((0.0_f64, 0usize), |(s, n), v| (s + (v as f64).powi(2), n + 1));
        (sum / n as f64).sqrt()
    }

    #[test]
    fn test_rejects_invalid_band() {
        assert!(AnalyticFilter::new(0.3, 0.2).is_err());
        assert!(AnalyticFilter::new(-0.1, 0.2).is_err());
        assert!(AnalyticFilter::new(0.1, 0.6).is_err());
        assert!(AnalyticFilter::new(0.1, 0.1).is_err());
        assert!(AnalyticFilter::new(0.0, 0.5).is_ok());
    }

    #[test]
    fn test_kernel_symmetry() {
        let filter = default_filter();
        let (i, q) = (filter.i_kernel(), filter.q_kernel());

        for k in 0..FILTER_LEN / 2 {
            let mirror = FILTER_LEN - 1 - k;
            assert!((i[k] - i[mirror]).abs() < 1e-6,
                "I kernel not symmetric at {}: {} vs {}", k, i[k], i[mirror]);
            assert!((q[k] + q[mirror]).abs() < 1e-6,
                "Q kernel not antisymmetric at {}: {} vs {}", k, q[k], q[mirror]);
        }
    }

    #[test]
    fn test_zero_input_gives_zero_output() {
        let mut filter = default_filter();

        // Run past several buffer compactions
        for n in 0..5 * BUFFER_LEN {
            let y = filter.process(ComplexSample::new(0.0, 0.0));
            assert_eq!(y, ComplexSample::new(0.0, 0.0), "Non-zero output at sample {}", n);
        }
    }

    #[test]
    fn test_passband_gain() {
        for &freq in &[500.0, 1000.0, 1800.0, 2500.0, 3000.0] {
            let mut filter = default_filter();
            let out = run_tone(&mut filter, freq, 2000);

            let i_gain = rms(out[200..].iter().map(|s| s.re)) * 2.0_f64.sqrt();
            let q_gain = rms(out[200..].iter().map(|s| s.im)) * 2.0_f64.sqrt();

            assert!((i_gain - 1.0).abs() < 0.02, "I gain at {} Hz = {:.4}", freq, i_gain);
            assert!((q_gain - 1.0).abs() < 0.02, "Q gain at {} Hz = {:.4}", freq, q_gain);
        }
    }

    #[test]
    fn test_stopband_attenuation() {
        for &freq in &[3600.0, 3800.0] {
            let mut filter = default_filter();
            let out = run_tone(&mut filter, freq, 2000);

            let gain = rms(out[200..].iter().map(|s| s.re)) * 2.0_f64.sqrt();
            let attenuation_db = 20.0 * gain.log10();

            assert!(attenuation_db < -30.0,
                "Stopband attenuation at {} Hz = {:.1} dB, should be < -30 dB", freq, attenuation_db);
        }
    }

    #[test]
    fn test_output_is_positive_frequency_analytic() {
        let mut filter = default_filter();
        let freq = 1800.0;
        let out = run_tone(&mut filter, freq, 1500);

        // Constant envelope and phase advancing by +2π f / fs per sample
        let expected_inc = 2.0 * PI * freq / SAMPLE_RATE;
        for n in 300..1400 {
            let mag = out[n].norm() as f64;
            assert!((mag - 1.0).abs() < 0.02, "Envelope {} at sample {} should be ~1", mag, n);

            let inc = (out[n + 1] / out[n]).arg() as f64;
            assert!((inc - expected_inc).abs() < 0.01,
                "Phase increment {} at sample {}, expected {}", inc, n, expected_inc);
        }
    }

    #[test]
    fn test_compaction_is_seamless() {
        // Same tone through one filter, compared against the direct convolution
        let mut filter = default_filter();
        let input: Vec<f32> = (0..3 * BUFFER_LEN)
            .map(|n| ((n * 7919) % 1000) as f32 / 1000.0 - 0.5)
            .collect();

        for (n, &x) in input.iter().enumerate() {
            let y = filter.process_real(x);

            let mut expected = 0.0_f32;
            for k in 0..FILTER_LEN {
                // Kernel tap k multiplies the sample k - (FILTER_LEN - 1) steps from now
                let idx = n as isize + k as isize - (FILTER_LEN as isize - 1);
                if idx >= 0 {
                    expected += input[idx as usize] * filter.i_kernel()[k];
                }
            }
            assert!((y.re - expected).abs() < 1e-4,
                "Mismatch at sample {}: {} vs {}", n, y.re, expected);
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let mut filter = default_filter();
        for _ in 0..100 {
            filter.process_real(1.0);
        }
        filter.reset();
        assert_eq!(filter.process_real(0.0), ComplexSample::new(0.0, 0.0));
    }
}
