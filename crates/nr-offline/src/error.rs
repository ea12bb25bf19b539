//! Error types for offline processing

use nr_core::CoreError;
use nr_restore::EffectError;
use thiserror::Error;

/// Offline processing errors
#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Profiling interval of {duration_ms} ms is shorter than the {minimum_ms} ms minimum")]
    ProfileTooShort { duration_ms: u64, minimum_ms: u64 },

    #[error("Source is already restricted to {start_ms}..{end_ms} ms")]
    SourceRestricted { start_ms: u64, end_ms: u64 },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Sink is not open")]
    SinkNotOpen,

    #[error("Profiling pass produced no noise profile")]
    MissingProfile,

    #[error("Worker thread panicked")]
    WorkerPanicked,

    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),

    #[error("Format error: {0}")]
    Format(#[from] CoreError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for offline operations
pub type OfflineResult<T> = Result<T, OfflineError>;
