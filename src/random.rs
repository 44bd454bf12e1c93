//! Uniform and Box-Muller draws shared by the fading and noise generators

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::PI;

/// Smallest uniform value handed to `ln()`
const MIN_UNIFORM: f32 = 1e-10;

/// Uniform draw in (0, 1)
#[inline]
pub(crate) fn uniform(rng: &mut ChaCha8Rng) -> f32 {
    rng.gen::<f32>().max(MIN_UNIFORM)
}

/// Polar Box-Muller: Rayleigh magnitude `sqrt(-2 ln U1)` at angle `2π U2`.
///
/// Returns the (cos, sin) projections, two independent unit-variance Gaussians.
#[inline]
pub(crate) fn box_muller(rng: &mut ChaCha8Rng) -> (f32, f32) {
    let r = (-2.0 * uniform(rng).ln()).sqrt();
    let theta = 2.0 * PI * rng.gen::<f32>();
    let (sin, cos) = theta.sin_cos();
    (r * cos, r * sin)
}
