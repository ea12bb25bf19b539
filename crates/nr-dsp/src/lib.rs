//! nr-dsp: Transform primitives for block spectral processing
//!
//! All primitives operate on fixed-length buffers planned once at
//! construction time:
//! - [`SpectralTransform`]: complex forward/inverse DFT (inverse scaled by `1/N`)
//! - [`PowerSpectrum`]: `|X[k]|^2` for bins `0..=N/2` of a real block
//! - [`HannWindow`]: periodic Hann window applied in place

mod error;
mod power;
mod transform;
mod window;

pub use error::{DspError, DspResult};
pub use power::PowerSpectrum;
pub use transform::SpectralTransform;
pub use window::HannWindow;
