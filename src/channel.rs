//! Watterson HF channel model
//!
//! Two-path Rayleigh fading channel with band-limited additive noise.
//! Per input sample:
//! 1. Scale by the input gain and form the analytic signal
//! 2. Rotate by the frequency offset, if any
//! 3. Refresh the fading gains every `sample_rate / tap_update_rate` samples
//! 4. Apply the direct-path gain, and the delayed-path gain to the output of
//!    the delay line (flat profiles use the direct path only, scaled by √2)
//! 5. Add noise scaled to the signal RMS and the target SNR
//!
//! The real input `x` enters the Hilbert filter as `(x/√2, x/√2)`, and the
//! gain held when fading is disabled is `(1+j)/√2` on both paths. Together
//! these keep the output power equal to the input power.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::{FRAC_1_SQRT_2, SQRT_2};
use tracing::{info, warn};

use crate::delay::DelayLine;
use crate::error::{ChansimError, Result};
use crate::fading::{tap_update_rate, FadingGenerator};
use crate::filter::AnalyticFilter;
use crate::nco::Nco;
use crate::noise::{NoiseGenerator, NoiseKind};
use crate::profile::ChannelProfile;
use crate::rms::{RmsEstimator, DEFAULT_INTERVAL, DEFAULT_WINDOW};
use crate::ComplexSample;

/// Lower edge of the channel passband in Hz
pub const BAND_LOW_HZ: f32 = 200.0;

/// Gain held on both paths when fading is disabled
const UNFADED_GAIN: ComplexSample = ComplexSample::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2);

/// Channel configuration, fixed for the lifetime of a channel
#[derive(Debug, Clone)]
pub struct ChannelParams {
    pub sample_rate: u32,
    pub snr_db: f32,
    pub profile: ChannelProfile,
    /// Fixed signal RMS used to scale the noise; 0 measures it from the input
    pub amplitude: f32,
    pub noise_bandwidth_hz: f32,
    pub freq_offset_hz: f32,
    pub input_gain: f32,
    pub noise: NoiseKind,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            snr_db: 30.0,
            profile: ChannelProfile::NoiseOnly,
            amplitude: 0.0,
            noise_bandwidth_hz: 3000.0,
            freq_offset_hz: 0.0,
            input_gain: 1.0,
            noise: NoiseKind::Gaussian,
        }
    }
}

impl ChannelParams {
    /// Check every field for a usable range
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(invalid("sample rate must be non-zero".to_string()));
        }
        if !self.snr_db.is_finite() {
            return Err(invalid(format!("SNR {} dB is not finite", self.snr_db)));
        }
        if !(self.amplitude.is_finite() && self.amplitude >= 0.0) {
            return Err(invalid(format!("amplitude {} must be finite and >= 0", self.amplitude)));
        }
        if !self.input_gain.is_finite() {
            return Err(invalid(format!("input gain {} is not finite", self.input_gain)));
        }
        if !self.freq_offset_hz.is_finite() {
            return Err(invalid(format!("frequency offset {} Hz is not finite", self.freq_offset_hz)));
        }

        let nyquist = self.sample_rate as f32 / 2.0;
        if !(self.noise_bandwidth_hz > 0.0 && self.noise_bandwidth_hz < nyquist) {
            return Err(invalid(format!(
                "noise bandwidth {} Hz must be within (0, {}) Hz",
                self.noise_bandwidth_hz, nyquist
            )));
        }
        if let NoiseKind::Impulsive { threshold } = self.noise {
            if !(threshold.is_finite() && threshold >= 0.0) {
                return Err(invalid(format!("impulse threshold {} must be finite and >= 0", threshold)));
            }
        }

        Ok(())
    }

    /// Target signal-to-noise voltage ratio, `10^(snr/20)`
    pub fn snr_ratio(&self) -> f32 {
        10.0_f32.powf(self.snr_db / 20.0)
    }
}

fn invalid(msg: String) -> ChansimError {
    ChansimError::InvalidConfig(msg)
}

/// Channel state for telemetry
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelState {
    pub sample_index: u64,
    pub direct_gain: ComplexSample,
    pub delayed_gain: ComplexSample,
    /// RMS currently used to scale the noise
    pub rms: f32,
}

/// Contributions of each path to one output sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathOutput {
    pub direct: ComplexSample,
    pub delayed: ComplexSample,
    pub noise: f32,
}

impl PathOutput {
    /// The real output sample
    pub fn output(&self) -> f32 {
        self.direct.re + self.delayed.re + self.noise
    }
}

/// Watterson two-path channel model
pub struct WattersonChannel {
    params: ChannelParams,
    sample_index: u64,

    filter: AnalyticFilter,
    offset: Option<Nco>,

    // None when the profile does not fade
    fading: Option<FadingGenerator>,
    fading_interval: usize,
    samples_until_refresh: usize,
    direct_gain: ComplexSample,
    delayed_gain: ComplexSample,

    // None for single-path profiles
    delay: Option<DelayLine>,

    noise: NoiseGenerator,
    rms: RmsEstimator,
    fixed_rms: Option<f32>,
    snr_ratio: f32,
}

impl WattersonChannel {
    /// Build a channel. All randomness derives from `seed`.
    pub fn new(params: ChannelParams, seed: u64) -> Result<Self> {
        params.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let sample_rate = params.sample_rate;
        let profile = params.profile;

        let f1 = BAND_LOW_HZ / sample_rate as f32;
        let mut f2 = (params.noise_bandwidth_hz + BAND_LOW_HZ) / sample_rate as f32;
        if f2 > 0.5 {
            warn!(
                upper_edge_hz = params.noise_bandwidth_hz + BAND_LOW_HZ,
                nyquist_hz = sample_rate as f32 / 2.0,
                "channel passband exceeds Nyquist, limiting to {} Hz",
                sample_rate as f32 / 2.0
            );
            f2 = 0.5;
        }
        let filter = AnalyticFilter::new(f1, f2)?;

        let spread = profile.doppler_spread_hz();
        let update_rate = tap_update_rate(spread);
        let fading_interval = (sample_rate / update_rate).max(1) as usize;
        let fading = FadingGenerator::new(spread, update_rate as f32, &mut rng);

        let delay = if profile.is_multipath() {
            Some(DelayLine::new(profile.path_delay_s(), sample_rate)?)
        } else {
            None
        };

        let noise = NoiseGenerator::new(params.noise, sample_rate, params.noise_bandwidth_hz, &mut rng)?;
        let rms = RmsEstimator::new(DEFAULT_WINDOW, DEFAULT_INTERVAL)?;

        // Taken as the RMS of the incoming signal, independent of input gain
        let fixed_rms = if params.amplitude != 0.0 {
            Some(params.amplitude)
        } else {
            None
        };

        let offset = if params.freq_offset_hz != 0.0 {
            Some(Nco::new(params.freq_offset_hz as f64, sample_rate))
        } else {
            None
        };

        match fixed_rms {
            Some(amplitude) => info!(
                profile = %profile,
                snr_db = params.snr_db,
                noise = %params.noise,
                noise_bandwidth_hz = params.noise_bandwidth_hz,
                amplitude,
                freq_offset_hz = params.freq_offset_hz,
                sample_rate,
                "channel ready"
            ),
            None => info!(
                profile = %profile,
                snr_db = params.snr_db,
                noise = %params.noise,
                noise_bandwidth_hz = params.noise_bandwidth_hz,
                amplitude = "runtime",
                freq_offset_hz = params.freq_offset_hz,
                sample_rate,
                "channel ready"
            ),
        }

        Ok(Self {
            snr_ratio: params.snr_ratio(),
            params,
            sample_index: 0,
            filter,
            offset,
            fading,
            fading_interval,
            samples_until_refresh: 0,
            direct_gain: UNFADED_GAIN,
            delayed_gain: UNFADED_GAIN,
            delay,
            noise,
            rms,
            fixed_rms,
        })
    }

    /// Run one sample through the channel, keeping the paths separate
    pub fn process_parts(&mut self, sample: f32) -> PathOutput {
        let x = sample * self.params.input_gain;

        let mut signal = self.filter.process(ComplexSample::new(x * FRAC_1_SQRT_2, x * FRAC_1_SQRT_2));

        if let Some(nco) = self.offset.as_mut() {
            signal *= nco.next_phasor();
        }

        if self.samples_until_refresh == 0 {
            if let Some(fading) = self.fading.as_mut() {
                let (direct, delayed) = fading.generate();
                self.direct_gain = direct;
                self.delayed_gain = delayed;
            }
            self.samples_until_refresh = self.fading_interval;
        }
        self.samples_until_refresh -= 1;

        let (direct, delayed) = match self.delay.as_mut() {
            Some(line) => (signal * self.direct_gain, line.push(signal) * self.delayed_gain),
            None => (signal * self.direct_gain * SQRT_2, ComplexSample::new(0.0, 0.0)),
        };

        let rms = match self.fixed_rms {
            Some(rms) => rms,
            None => self.rms.update(x),
        };
        let noise = self.noise.next_sample() * rms / self.snr_ratio;

        self.sample_index += 1;

        PathOutput { direct, delayed, noise }
    }

    /// Run one sample through the channel
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        self.process_parts(sample).output()
    }

    /// Process a block of samples through the channel
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        input.iter().map(|&x| self.process_sample(x)).collect()
    }

    /// Process a block in place
    pub fn process_in_place(&mut self, samples: &mut [f32]) {
        for x in samples.iter_mut() {
            *x = self.process_sample(*x);
        }
    }

    pub fn params(&self) -> &ChannelParams {
        &self.params
    }

    /// Effective delay of the second path in samples, if there is one
    pub fn delay_taps(&self) -> Option<usize> {
        self.delay.as_ref().map(DelayLine::taps)
    }

    /// Samples between fading gain refreshes
    pub fn fading_interval(&self) -> usize {
        self.fading_interval
    }

    pub fn is_fading(&self) -> bool {
        self.fading.is_some()
    }

    /// Get current channel state for telemetry
    pub fn state(&self) -> ChannelState {
        ChannelState {
            sample_index: self.sample_index,
            direct_gain: self.direct_gain,
            delayed_gain: self.delayed_gain,
            rms: self.fixed_rms.unwrap_or_else(|| self.rms.value()),
        }
    }
}
