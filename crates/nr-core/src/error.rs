//! Error types for core audio types

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Invalid interval: {start_ms}..{end_ms} ms")]
    InvalidInterval { start_ms: u64, end_ms: u64 },

    #[error("Buffer overrun: length {len} exceeds capacity {capacity}")]
    BufferOverrun { len: usize, capacity: usize },
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
