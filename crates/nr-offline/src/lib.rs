//! nr-offline — Offline Effect Host
//!
//! Drives the spectral noise effects over recorded audio:
//! - Random-access sources with an exclusive interval mode
//! - In-memory and WAV sinks
//! - Chunked effect runner with progress and cooperative cancellation
//! - Two-pass denoise job (profile, then reduce), optionally on a worker thread
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         DenoiseJob                           │
//! │                                                              │
//! │  ┌────────┐ restricted ┌──────────────┐                      │
//! │  │ Source │ ─────────→ │ NoiseProfiler│ → NoiseProfile ──┐   │
//! │  │        │            └──────────────┘                  │   │
//! │  │        │ full range ┌──────────────┐   ┌──────┐       │   │
//! │  │        │ ─────────→ │NoiseReduction│ → │ Sink │  ←────┘   │
//! │  └────────┘            └──────────────┘   └──────┘           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nr_offline::{DenoiseJob, DenoiseSettings, RandomAccessAudioSource, WavFileSink};
//!
//! let source = RandomAccessAudioSource::open_wav("lecture.wav")?;
//! let sink = WavFileSink::new("lecture-clean.wav", source.format());
//! let settings = DenoiseSettings::new(TimeInterval::new(0, 1500)?);
//!
//! let handle = DenoiseJob::new(source, sink, settings).spawn()?;
//! let outcome = handle.join()?;
//! ```

mod config;
mod denoise;
mod error;
mod progress;
mod runner;
mod sink;
mod source;

pub use config::*;
pub use denoise::*;
pub use error::*;
pub use progress::*;
pub use runner::*;
pub use sink::*;
pub use source::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
