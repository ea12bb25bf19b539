//! Error types for audio effects

use nr_core::CoreError;
use nr_dsp::DspError;
use thiserror::Error;

use crate::effect::EffectState;

/// Effect error types
#[derive(Error, Debug)]
pub enum EffectError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Lifecycle call out of order
    #[error("Cannot {operation} while {state:?}")]
    InvalidState {
        /// Lifecycle call that was rejected
        operation: &'static str,
        /// State the effect was in
        state: EffectState,
    },

    /// Noise profile does not cover every frequency bin
    #[error("Profile length mismatch: expected {expected}, got {got}")]
    ProfileLength {
        /// Required bin count
        expected: usize,
        /// Bins supplied
        got: usize,
    },

    /// Buffer channel layout differs from the initialized format
    #[error("Channel mismatch: expected {expected}, got {actual}")]
    ChannelMismatch {
        /// Channels in the initialized format
        expected: usize,
        /// Channels in the buffer
        actual: usize,
    },

    /// Invalid stream format or buffer
    #[error("Format error: {0}")]
    Format(#[from] CoreError),

    /// Transform failure
    #[error("DSP error: {0}")]
    Dsp(#[from] DspError),

    /// Parameter (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for effect operations
pub type EffectResult<T> = Result<T, EffectError>;
