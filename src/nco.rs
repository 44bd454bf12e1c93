//! Numerically Controlled Oscillator (NCO)
//!
//! Phase-continuous complex oscillator. Drives the frequency-offset rotation
//! in the channel and the test-tone source.

use std::f64::consts::PI;

use crate::ComplexSample;

/// Numerically Controlled Oscillator
#[derive(Debug, Clone)]
pub struct Nco {
    phase: f64,
    phase_inc: f64,
    freq_hz: f64,
    sample_rate: f64,
}

impl Nco {
    /// Create a new NCO
    ///
    /// # Arguments
    /// * `freq_hz` - Frequency in Hz, may be negative
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(freq_hz: f64, sample_rate: u32) -> Self {
        let sample_rate_f = sample_rate as f64;
        Self {
            phase: 0.0,
            phase_inc: 2.0 * PI * freq_hz / sample_rate_f,
            freq_hz,
            sample_rate: sample_rate_f,
        }
    }

    /// Return the unit phasor at the current phase, then advance
    pub fn next_phasor(&mut self) -> ComplexSample {
        let (sin, cos) = self.phase.sin_cos();

        self.phase += self.phase_inc;
        // Keep phase in (-π, π]
        if self.phase > PI {
            self.phase -= 2.0 * PI;
        } else if self.phase <= -PI {
            self.phase += 2.0 * PI;
        }

        ComplexSample::new(cos as f32, sin as f32)
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn frequency(&self) -> f64 {
        self.freq_hz
    }

    /// Phase advance per sample in radians
    pub fn phase_increment(&self) -> f64 {
        self.phase_inc
    }

    pub fn set_frequency(&mut self, freq_hz: f64) {
        self.freq_hz = freq_hz;
        self.phase_inc = 2.0 * PI * freq_hz / self.sample_rate;
    }
}
