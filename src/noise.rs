//! Band-limited noise generator
//!
//! Raw draws (Gaussian, Laplacian or impulsive) are shaped by a 2nd-order
//! Butterworth low-pass at the channel bandwidth, then scaled by
//! `1/sqrt(2·bw/fs)` to make up for the power the filter removes.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::SQRT_2;
use std::f64::consts::PI;
use std::fmt;

use crate::error::{ChansimError, Result};
use crate::random::{box_muller, uniform};

/// Default impulse threshold: rare, sharp clicks
pub const DEFAULT_IMPULSE_THRESHOLD: f32 = 8.0;

/// Statistical shape of the raw noise
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum NoiseKind {
    /// Box-Muller Gaussian; the usual choice for HF simulation
    #[default]
    Gaussian,
    /// Laplacian via inverse CDF, unit variance
    Laplacian,
    /// Sparse impulses: `-√2·ln(U)` kept only when above `threshold`.
    ///
    /// Around 5 the result sounds like crackle, at 8 like a Geiger counter.
    /// Only meaningful at low SNR (about 5 dB or less).
    Impulsive { threshold: f32 },
}

impl fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseKind::Gaussian => write!(f, "Gaussian noise"),
            NoiseKind::Laplacian => write!(f, "Laplacian noise"),
            NoiseKind::Impulsive { threshold } => write!(f, "Impulse noise (threshold {})", threshold),
        }
    }
}

/// Band-limited noise source
pub struct NoiseGenerator {
    kind: NoiseKind,

    // Butterworth coefficients: numerator 1, 2, 1; denominator normalized by bn0
    bn0: f32,
    bn1: f32,
    bn2: f32,

    // Filter history, oldest first
    xv: [f32; 3],
    yv: [f32; 3],

    // Compensates for filter power loss
    gain: f32,

    rng: ChaCha8Rng,
}

impl NoiseGenerator {
    /// Create a generator of `kind` noise limited to `bandwidth_hz`.
    ///
    /// Draws its own seed from `seed_rng`.
    pub fn new(
        kind: NoiseKind,
        sample_rate: u32,
        bandwidth_hz: f32,
        seed_rng: &mut ChaCha8Rng,
    ) -> Result<Self> {
        let fs = sample_rate as f64;
        let bw = bandwidth_hz as f64;
        if !(bw > 0.0 && bw < fs / 2.0) {
            return Err(ChansimError::InvalidConfig(format!(
                "noise bandwidth {} Hz must be within (0, {}) Hz",
                bandwidth_hz,
                fs / 2.0
            )));
        }

        // Bilinear transform with prewarping
        let w = 1.0 / (PI * bw / fs).tan();
        let bn0 = w * w + std::f64::consts::SQRT_2 * w + 1.0;
        let bn1 = -2.0 * w * w + 2.0;
        let bn2 = w * w - std::f64::consts::SQRT_2 * w + 1.0;

        let seed: u64 = seed_rng.gen();

        Ok(Self {
            kind,
            bn0: bn0 as f32,
            bn1: (bn1 / bn0) as f32,
            bn2: (bn2 / bn0) as f32,
            xv: [0.0; 3],
            yv: [0.0; 3],
            gain: (1.0 / (2.0 * bw / fs).sqrt()) as f32,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Generate the next band-limited noise sample
    pub fn next_sample(&mut self) -> f32 {
        let z = self.raw_sample();
        self.shape(z) * self.gain
    }

    pub fn kind(&self) -> NoiseKind {
        self.kind
    }

    /// Power-loss compensation gain applied after the filter
    pub fn gain(&self) -> f32 {
        self.gain
    }

    fn raw_sample(&mut self) -> f32 {
        match self.kind {
            NoiseKind::Gaussian => box_muller(&mut self.rng).0,
            NoiseKind::Laplacian => {
                let u: f32 = self.rng.gen();
                if u < 0.5 {
                    (2.0 * u.max(1e-10)).ln() / SQRT_2
                } else {
                    -(2.0 * (1.0 - u)).ln() / SQRT_2
                }
            }
            NoiseKind::Impulsive { threshold } => {
                let z = -SQRT_2 * uniform(&mut self.rng).ln();
                if z.abs() <= threshold {
                    0.0
                } else {
                    z
                }
            }
        }
    }

    fn shape(&mut self, input: f32) -> f32 {
        self.xv = [self.xv[1], self.xv[2], input / self.bn0];
        self.yv = [self.yv[1], self.yv[2], 0.0];

        self.yv[2] = self.xv[2] + 2.0 * self.xv[1] + self.xv[0]
            - self.bn1 * self.yv[1]
            - self.bn2 * self.yv[0];

        self.yv[2]
    }
}
