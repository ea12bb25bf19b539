//! Hann window

use std::f32::consts::PI;

/// Periodic Hann window of a fixed size.
///
/// Two copies offset by half the window length sum to exactly one, so a
/// half-overlapped synthesis window reconstructs at unity gain.
#[derive(Debug, Clone)]
pub struct HannWindow {
    coeffs: Vec<f32>,
}

impl HannWindow {
    pub fn new(size: usize) -> Self {
        let coeffs = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
            .collect();
        Self { coeffs }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.coeffs.len()
    }

    #[inline]
    pub fn coefficients(&self) -> &[f32] {
        &self.coeffs
    }

    /// Multiply `buffer` by the window in place. Extra samples beyond the
    /// window length are left untouched.
    pub fn apply(&self, buffer: &mut [f32]) {
        for (sample, &w) in buffer.iter_mut().zip(&self.coeffs) {
            *sample *= w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_endpoints_and_peak() {
        let window = HannWindow::new(8);
        let c = window.coefficients();
        assert_abs_diff_eq!(c[0], 0.0);
        assert_abs_diff_eq!(c[4], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(c[2], c[6], epsilon = 1e-6);
    }

    #[test]
    fn test_half_overlap_sums_to_one() {
        let n = 2048;
        let window = HannWindow::new(n);
        let c = window.coefficients();
        for i in 0..n / 2 {
            assert_abs_diff_eq!(c[i] + c[i + n / 2], 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_apply_in_place() {
        let window = HannWindow::new(4);
        let mut buffer = vec![2.0f32; 4];
        window.apply(&mut buffer);
        assert_abs_diff_eq!(buffer[0], 0.0);
        assert_abs_diff_eq!(buffer[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(buffer[2], 2.0, epsilon = 1e-6);
    }
}
