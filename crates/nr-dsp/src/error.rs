//! Error types for transform primitives

use thiserror::Error;

/// Transform error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DspError {
    /// Block size not usable for planning
    #[error("Invalid block size: {0}")]
    InvalidSize(usize),

    /// Buffer length does not match the planned block size
    #[error("Buffer size mismatch: expected {expected}, got {got}")]
    BufferMismatch { expected: usize, got: usize },

    /// FFT backend failure
    #[error("FFT error: {0}")]
    Fft(String),
}

/// Result type for transform operations
pub type DspResult<T> = Result<T, DspError>;

pub(crate) fn check_len(expected: usize, got: usize) -> DspResult<()> {
    if expected != got {
        return Err(DspError::BufferMismatch { expected, got });
    }
    Ok(())
}
