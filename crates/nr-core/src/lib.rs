//! nr-core: Shared types for the noise reduction engine
//!
//! This crate provides the foundational types passed between the effect host
//! and the spectral effects:
//! - [`AudioFormat`]: immutable stream format, shared by reference
//! - [`SampleBuffer`]: format-tagged interleaved float samples with a valid length
//! - [`TimeInterval`]: millisecond range used for profiling and reduction spans

mod buffer;
mod error;
mod format;
mod time;

pub use buffer::*;
pub use error::*;
pub use format::*;
pub use time::*;
