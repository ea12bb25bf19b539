//! Complex discrete Fourier transform over a fixed block size

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::{check_len, DspError, DspResult};

/// Forward and inverse complex DFT of one fixed size.
///
/// The forward transform is unscaled; the inverse is scaled by `1/N` so that
/// `inverse(forward(x)) == x`.
pub struct SpectralTransform {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for SpectralTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralTransform")
            .field("size", &self.size)
            .finish()
    }
}

impl SpectralTransform {
    /// Plan transforms for `size`-point blocks
    pub fn new(size: usize) -> DspResult<Self> {
        if size == 0 {
            return Err(DspError::InvalidSize(size));
        }

        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Ok(Self {
            size,
            forward,
            inverse,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        })
    }

    /// Block size
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform. A missing imaginary input is treated as all zeros.
    pub fn forward(
        &mut self,
        real_in: &[f32],
        imag_in: Option<&[f32]>,
        real_out: &mut [f32],
        imag_out: &mut [f32],
    ) -> DspResult<()> {
        check_len(self.size, real_in.len())?;
        check_len(self.size, real_out.len())?;
        check_len(self.size, imag_out.len())?;

        match imag_in {
            Some(imag) => {
                check_len(self.size, imag.len())?;
                for (c, (&re, &im)) in self.buffer.iter_mut().zip(real_in.iter().zip(imag)) {
                    *c = Complex::new(re, im);
                }
            }
            None => {
                for (c, &re) in self.buffer.iter_mut().zip(real_in) {
                    *c = Complex::new(re, 0.0);
                }
            }
        }

        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (i, c) in self.buffer.iter().enumerate() {
            real_out[i] = c.re;
            imag_out[i] = c.im;
        }
        Ok(())
    }

    /// Inverse transform, scaled by `1/N`
    pub fn inverse(
        &mut self,
        real_in: &[f32],
        imag_in: &[f32],
        real_out: &mut [f32],
        imag_out: &mut [f32],
    ) -> DspResult<()> {
        check_len(self.size, real_in.len())?;
        check_len(self.size, imag_in.len())?;
        check_len(self.size, real_out.len())?;
        check_len(self.size, imag_out.len())?;

        for (c, (&re, &im)) in self.buffer.iter_mut().zip(real_in.iter().zip(imag_in)) {
            *c = Complex::new(re, im);
        }

        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let norm = 1.0 / self.size as f32;
        for (i, c) in self.buffer.iter().enumerate() {
            real_out[i] = c.re * norm;
            imag_out[i] = c.im * norm;
        }
        Ok(())
    }
}
