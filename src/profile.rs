//! Channel profile presets
//!
//! Each profile fixes the relative delay of the second path and the Doppler
//! spread of both paths. A zero delay means a single (flat) path, a zero
//! spread means no fading.

use std::fmt;

use crate::error::{ChansimError, Result};

/// One of the eight standard HF channel presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelProfile {
    /// No fading, no multipath: additive noise only
    #[default]
    NoiseOnly,
    /// Single path, 0.2 Hz spread
    Flat1,
    /// Single path, 1 Hz spread
    Flat2,
    /// CCIR good: 0.5 ms, 0.1 Hz
    CcirGood,
    /// CCIR moderate: 1 ms, 0.5 Hz
    CcirModerate,
    /// CCIR poor: 2 ms, 1 Hz
    CcirPoor,
    /// CCIR flutter fading: 0.5 ms, 10 Hz
    CcirFlutter,
    /// 2 ms, 5 Hz
    Extreme,
}

impl ChannelProfile {
    pub const ALL: [ChannelProfile; 8] = [
        ChannelProfile::NoiseOnly,
        ChannelProfile::Flat1,
        ChannelProfile::Flat2,
        ChannelProfile::CcirGood,
        ChannelProfile::CcirModerate,
        ChannelProfile::CcirPoor,
        ChannelProfile::CcirFlutter,
        ChannelProfile::Extreme,
    ];

    /// Look up a profile by its numeric index (0..=7)
    pub fn from_index(index: u8) -> Result<Self> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(ChansimError::UnknownProfile(index))
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Delay of the second path in seconds; 0 for single-path profiles
    pub fn path_delay_s(self) -> f32 {
        match self {
            ChannelProfile::NoiseOnly | ChannelProfile::Flat1 | ChannelProfile::Flat2 => 0.0,
            ChannelProfile::CcirGood | ChannelProfile::CcirFlutter => 0.5e-3,
            ChannelProfile::CcirModerate => 1.0e-3,
            ChannelProfile::CcirPoor | ChannelProfile::Extreme => 2.0e-3,
        }
    }

    /// Doppler spread in Hz; 0 disables fading
    pub fn doppler_spread_hz(self) -> f32 {
        match self {
            ChannelProfile::NoiseOnly => 0.0,
            ChannelProfile::Flat1 => 0.2,
            ChannelProfile::Flat2 => 1.0,
            ChannelProfile::CcirGood => 0.1,
            ChannelProfile::CcirModerate => 0.5,
            ChannelProfile::CcirPoor => 1.0,
            ChannelProfile::CcirFlutter => 10.0,
            ChannelProfile::Extreme => 5.0,
        }
    }

    pub fn is_multipath(self) -> bool {
        self.path_delay_s() > 0.0
    }

    pub fn is_fading(self) -> bool {
        self.doppler_spread_hz() > 0.0
    }

    pub fn name(self) -> &'static str {
        match self {
            ChannelProfile::NoiseOnly => "ONLY_NOISE",
            ChannelProfile::Flat1 => "FLAT 1",
            ChannelProfile::Flat2 => "FLAT 2",
            ChannelProfile::CcirGood => "CCIR GOOD",
            ChannelProfile::CcirModerate => "CCIR MODERATE",
            ChannelProfile::CcirPoor => "CCIR POOR",
            ChannelProfile::CcirFlutter => "CCIR FLUTTER_FADING",
            ChannelProfile::Extreme => "EXTREME",
        }
    }
}

impl fmt::Display for ChannelProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for ChannelProfile {
    type Error = ChansimError;

    fn try_from(index: u8) -> Result<Self> {
        Self::from_index(index)
    }
}
