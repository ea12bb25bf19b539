//! Power spectrum of a real block

use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use crate::error::{check_len, DspError, DspResult};

/// Power spectrum `re^2 + im^2` of an unscaled real DFT.
///
/// Produces `size / 2 + 1` bins, DC through Nyquist.
pub struct PowerSpectrum {
    size: usize,
    fft: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for PowerSpectrum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerSpectrum")
            .field("size", &self.size)
            .finish()
    }
}

impl PowerSpectrum {
    /// Plan for `size`-point blocks. `size` must be even.
    pub fn new(size: usize) -> DspResult<Self> {
        if size == 0 || size % 2 != 0 {
            return Err(DspError::InvalidSize(size));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let input = fft.make_input_vec();
        let spectrum = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();

        Ok(Self {
            size,
            fft,
            input,
            spectrum,
            scratch,
        })
    }

    /// Block size
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of output bins
    #[inline]
    pub fn bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Compute the power of every bin of `real_in` into `out`
    pub fn compute(&mut self, real_in: &[f32], out: &mut [f32]) -> DspResult<()> {
        check_len(self.size, real_in.len())?;
        check_len(self.bins(), out.len())?;

        self.input.copy_from_slice(real_in);
        self.fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .map_err(|e| DspError::Fft(e.to_string()))?;

        for (power, c) in out.iter_mut().zip(&self.spectrum) {
            *power = c.re * c.re + c.im * c.im;
        }
        Ok(())
    }
}
