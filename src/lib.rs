//! Watterson HF channel simulator
//!
//! Simulates ionospheric propagation of an audio-band signal:
//! - Two-path multipath with a fixed relative delay
//! - Independent Rayleigh fading on each path (Gaussian Doppler spectrum)
//! - Band-limited Gaussian, Laplacian or impulsive noise at a target SNR
//! - Optional frequency offset
//!
//! The channel is a per-sample pipeline with no runtime failure modes. All
//! errors surface at construction.
//!
//! ```no_run
//! use hf_chansim::{ChannelParams, ChannelProfile, WattersonChannel};
//!
//! let params = ChannelParams {
//!     profile: ChannelProfile::CcirModerate,
//!     snr_db: 10.0,
//!     ..ChannelParams::default()
//! };
//! let mut channel = WattersonChannel::new(params, 42)?;
//! let faded = channel.process(&[0.0_f32; 512]);
//! # Ok::<(), hf_chansim::ChansimError>(())
//! ```

pub mod channel;
pub mod delay;
pub mod error;
pub mod fading;
pub mod filter;
pub mod nco;
pub mod noise;
pub mod profile;
mod random;
pub mod rms;
pub mod stream;

#[cfg(test)]
mod testing;

/// Complex baseband sample
pub type ComplexSample = num_complex::Complex32;

pub use channel::{ChannelParams, ChannelState, PathOutput, WattersonChannel};
pub use delay::DelayLine;
pub use error::{ChansimError, Result};
pub use fading::{tap_update_rate, FadingGenerator};
pub use filter::AnalyticFilter;
pub use nco::Nco;
pub use noise::{NoiseGenerator, NoiseKind};
pub use profile::ChannelProfile;
pub use rms::RmsEstimator;
pub use stream::{run_stream, PcmSink, PipeSource, SampleSource, StreamStats, ToneSource};
