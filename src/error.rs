//! Error types for channel construction and sample I/O

use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

/// Result type for channel operations
pub type Result<T> = std::result::Result<T, ChansimError>;

/// Errors that can occur while building a channel or streaming samples.
///
/// Per-sample processing never fails; everything here is raised before the
/// first sample is processed, except `Io` at the stream boundary.
#[derive(Error, Debug)]
pub enum ChansimError {
    /// A working buffer could not be allocated
    #[error("failed to allocate {what}: {source}")]
    Allocation {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },

    /// Analytic filter corners outside 0 <= f1 < f2 <= 0.5
    #[error("invalid filter band: f1={f1}, f2={f2} (need 0 <= f1 < f2 <= 0.5)")]
    InvalidBand { f1: f32, f2: f32 },

    /// A configuration value is out of its usable range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Channel profile index not in 0..=7
    #[error("unknown channel profile: {0} (expected 0..=7)")]
    UnknownProfile(u8),

    /// Sample source or sink failed
    #[error("sample I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Allocates a zero-filled buffer, reporting allocation failure as an error.
pub(crate) fn zeroed<T: Clone + Default>(len: usize, what: &'static str) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|source| ChansimError::Allocation { what, source })?;
    buf.resize(len, T::default());
    Ok(buf)
}
