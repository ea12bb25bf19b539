//! Streaming Spectral Noise Reduction
//!
//! Two-step noise removal for recorded audio:
//!
//! ## Noise Profiling
//! - Non-overlapping 2048-sample analysis windows
//! - Per-bin average log-power noise floor
//! - Partial trailing window zero-padded at flush
//!
//! ## Noise Reduction
//! - 50% overlap-add short-time spectral analysis
//! - Hysteretic per-bin gating against the learned floor
//! - Isolated-bin ("tinkle") suppression
//! - One-window output delay, drained at flush
//!
//! Both effects follow the [`AudioEffect`] lifecycle:
//! `initialize -> execute* -> flush -> terminate`.

#![warn(missing_docs)]

pub mod effect;
pub mod gate;
pub mod params;
pub mod profile;
pub mod reduction;

mod error;

pub use effect::{AudioEffect, EffectOutcome, EffectState};
pub use error::{EffectError, EffectResult};
pub use params::{EffectParameters, NoiseProfile, NoiseProfilingParameters, NoiseReductionParameters};
pub use profile::NoiseProfiler;
pub use reduction::NoiseReduction;

/// Analysis window length in samples per channel
pub const WINDOW_SIZE: usize = 2048;

/// Hop size of the reducer (50% overlap)
pub const HALF_WINDOW: usize = WINDOW_SIZE / 2;

/// Number of frequency bins from DC through Nyquist
pub const FREQUENCY_COUNT: usize = HALF_WINDOW + 1;
