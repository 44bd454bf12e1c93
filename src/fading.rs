//! Rayleigh fading gain generator
//!
//! Produces two independent complex fading gains (direct and delayed path)
//! at the tap update rate.
//!
//! ## Method: Gaussian-shaped IIR filtered noise
//!
//! Each of the four real processes (I/Q × direct/delayed) is white Gaussian
//! noise passed through a 2-pole, 2-zero IIR low-pass that approximates a
//! Gaussian frequency response:
//!
//!   y[n] = (g·(x[n] + 2x[n-1] + x[n-2]) - a1·y[n-1] - a2·y[n-2]) / a0
//!
//! Filtered Gaussian noise stays Gaussian, so each complex gain has Gaussian
//! I/Q and a Rayleigh-distributed magnitude.
//!
//! The filter -3 dB point is set to spread/√2, the 2σ bandwidth of the
//! Gaussian Doppler PSD. To keep a usable rolloff the filter runs at the
//! (low) tap update rate, not the audio sample rate.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::{PI, SQRT_2};
use tracing::debug;

use crate::random::box_muller;
use crate::ComplexSample;

/// Upper bound on the iterations spent priming the filter
pub const MAX_PRIMING_ITERATIONS: usize = 4096;

/// Tap update rate in Hz for a given Doppler spread: `round(50·spread) + 1`
pub fn tap_update_rate(spread_hz: f32) -> u32 {
    (50.0 * spread_hz.max(0.0)).round() as u32 + 1
}

/// IIR state: [y0, y1, y2, x0, x1, x2]
type FadeState = [f32; 6];

/// Gaussian-shaped IIR fading generator for a two-path channel
pub struct FadingGenerator {
    spread_hz: f32,
    update_rate_hz: f32,

    // Filter coefficients
    g: f32,
    a0: f32,
    a1: f32,
    a2: f32,

    // Direct path
    i_direct: FadeState,
    q_direct: FadeState,

    // Delayed path
    i_delayed: FadeState,
    q_delayed: FadeState,

    rng: ChaCha8Rng,
    priming_iterations: usize,
}

impl FadingGenerator {
    /// Build and prime a generator for `spread_hz` Doppler spread, updated
    /// `update_rate_hz` times per second.
    ///
    /// Returns `None` when the spread is zero (or negative): the channel is
    /// flat and the caller holds a constant gain instead. A seed is drawn from
    /// `seed_rng` either way so downstream draws do not depend on the spread.
    pub fn new(spread_hz: f32, update_rate_hz: f32, seed_rng: &mut ChaCha8Rng) -> Option<Self> {
        let seed: u64 = seed_rng.gen();

        if !(spread_hz > 0.0) || !(update_rate_hz > 0.0) {
            return None;
        }

        // Hz -> radians per update interval, then down to the 2σ bandwidth
        let w = spread_hz * 2.0 * PI / update_rate_hz / SQRT_2;

        // 2-pole Butterworth-style coefficients
        let a = (2.0 * PI).sqrt();
        let c = 1.5_f32;
        let big_a = a / w;
        let big_c = (c / w) * (c / w);

        // Compensates for filter power loss
        let g = (0.5 * (2.0 * PI).sqrt() / w).sqrt();

        let priming_iterations = ((1.0 / w).ceil() as usize).min(MAX_PRIMING_ITERATIONS);

        let mut generator = Self {
            spread_hz,
            update_rate_hz,
            g,
            a0: big_a + big_c + 1.0,
            a1: 2.0 * (1.0 - big_c),
            a2: big_c + 1.0 - big_a,
            i_direct: [0.0; 6],
            q_direct: [0.0; 6],
            i_delayed: [0.0; 6],
            q_delayed: [0.0; 6],
            rng: ChaCha8Rng::seed_from_u64(seed),
            priming_iterations,
        };

        for _ in 0..priming_iterations {
            generator.generate();
        }

        debug!(
            spread_hz,
            update_rate_hz,
            priming_iterations,
            "fading generator primed"
        );

        Some(generator)
    }

    /// Advance all four processes by one update and return
    /// `(direct_gain, delayed_gain)`.
    pub fn generate(&mut self) -> (ComplexSample, ComplexSample) {
        // New inputs land in slot 3 of each state vector
        let (i, q) = box_muller(&mut self.rng);
        self.i_direct[3] = i;
        self.q_direct[3] = q;
        let (i, q) = box_muller(&mut self.rng);
        self.i_delayed[3] = i;
        self.q_delayed[3] = q;

        let (g, a0, a1, a2) = (self.g, self.a0, self.a1, self.a2);
        gauss_filter(&mut self.i_direct, g, a0, a1, a2);
        gauss_filter(&mut self.q_direct, g, a0, a1, a2);
        gauss_filter(&mut self.i_delayed, g, a0, a1, a2);
        gauss_filter(&mut self.q_delayed, g, a0, a1, a2);

        (
            ComplexSample::new(self.i_direct[0], self.q_direct[0]),
            ComplexSample::new(self.i_delayed[0], self.q_delayed[0]),
        )
    }

    pub fn spread_hz(&self) -> f32 {
        self.spread_hz
    }

    pub fn update_rate_hz(&self) -> f32 {
        self.update_rate_hz
    }

    /// Iterations run before the first real update
    pub fn priming_iterations(&self) -> usize {
        self.priming_iterations
    }
}

#[inline]
fn gauss_filter(s: &mut FadeState, g: f32, a0: f32, a1: f32, a2: f32) {
    s[0] = (g * (s[3] + 2.0 * s[4] + s[5]) - a1 * s[1] - a2 * s[2]) / a0;

    s[2] = s[1];
    s[1] = s[0];
    s[5] = s[4];
    s[4] = s[3];
}
