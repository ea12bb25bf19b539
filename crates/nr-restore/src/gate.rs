//! Hysteretic spectral gate
//!
//! One window is gated in place:
//! 1. Full complex spectrum of the raw window (kept for reconstruction)
//! 2. Power spectrum of a Hann-windowed copy (used only for the decision)
//! 3. Per-bin open/closed decision folded into a leaky integrator
//! 4. Isolated half-open bins between closed neighbours forced shut
//! 5. Integrator values applied as a mask to bin and mirror bin
//! 6. Inverse transform, synthesis Hann window

use nr_dsp::{HannWindow, PowerSpectrum, SpectralTransform};

use crate::error::EffectResult;
use crate::{FREQUENCY_COUNT, WINDOW_SIZE};

/// Log-power margin per unit of threshold
pub const THRESHOLD_SCALE: f32 = 8.0;

/// Instantaneous gate decision for one bin: 0.0 closed, 1.0 open.
///
/// A power of exactly zero always opens the gate.
#[inline]
pub fn gate_decision(power: f32, noise_floor: f32, threshold: f32) -> f32 {
    let plog = power.ln();
    if power != 0.0 && plog < noise_floor + threshold * THRESHOLD_SCALE {
        0.0
    } else {
        1.0
    }
}

/// Fold one frame of decisions into the per-bin smoothing state:
/// `s = 0.5 * decision + 0.5 * s`
pub fn update_smoothing(power: &[f32], noise_gate: &[f32], threshold: f32, smoothing: &mut [f32]) {
    for ((s, &p), &floor) in smoothing.iter_mut().zip(power).zip(noise_gate) {
        let decision = gate_decision(p, floor, threshold);
        *s = decision * 0.5 + *s * 0.5;
    }
}

/// Close bins that sit barely open between closed neighbours.
///
/// Scans interior bins in ascending order, in place; the first and last two
/// bins are never touched.
pub fn suppress_isolated_bins(smoothing: &mut [f32]) {
    let len = smoothing.len();
    if len < 5 {
        return;
    }

    for i in 2..len - 2 {
        if smoothing[i] >= 0.5
            && smoothing[i] <= 0.55
            && smoothing[i - 1] < 0.1
            && smoothing[i - 2] < 0.1
            && smoothing[i + 1] < 0.1
            && smoothing[i + 2] < 0.1
        {
            smoothing[i] = 0.0;
        }
    }
}

/// Scale a full complex spectrum by the smoothing mask.
///
/// DC and Nyquist use their own value; every interior bin `i` scales both `i`
/// and its mirror `N - i`.
pub fn apply_mask(smoothing: &[f32], real: &mut [f32], imag: &mut [f32]) {
    let size = real.len();
    let nyquist = smoothing.len() - 1;

    real[0] *= smoothing[0];
    imag[0] *= smoothing[0];
    real[nyquist] *= smoothing[nyquist];
    imag[nyquist] *= smoothing[nyquist];

    for (i, &s) in smoothing.iter().enumerate().take(nyquist).skip(1) {
        let mirror = size - i;
        real[i] *= s;
        imag[i] *= s;
        real[mirror] *= s;
        imag[mirror] *= s;
    }
}

/// Transform state and scratch buffers for gating `WINDOW_SIZE` windows
pub struct SpectralGate {
    threshold: f32,
    transform: SpectralTransform,
    power: PowerSpectrum,
    window: HannWindow,
    real_in: Vec<f32>,
    imag_in: Vec<f32>,
    real_out: Vec<f32>,
    imag_out: Vec<f32>,
    power_bins: Vec<f32>,
}

impl std::fmt::Debug for SpectralGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralGate")
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl SpectralGate {
    /// Plan transforms for one gate
    pub fn new(threshold: f32) -> EffectResult<Self> {
        Ok(Self {
            threshold,
            transform: SpectralTransform::new(WINDOW_SIZE)?,
            power: PowerSpectrum::new(WINDOW_SIZE)?,
            window: HannWindow::new(WINDOW_SIZE),
            real_in: vec![0.0; WINDOW_SIZE],
            imag_in: vec![0.0; WINDOW_SIZE],
            real_out: vec![0.0; WINDOW_SIZE],
            imag_out: vec![0.0; WINDOW_SIZE],
            power_bins: vec![0.0; FREQUENCY_COUNT],
        })
    }

    /// Gate threshold
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Gate one window in place, updating `smoothing`
    pub fn reduce(
        &mut self,
        samples: &mut [f32],
        noise_gate: &[f32],
        smoothing: &mut [f32],
    ) -> EffectResult<()> {
        debug_assert!(smoothing.iter().all(|s| (0.0..=1.0).contains(s)));

        self.real_in.copy_from_slice(samples);
        self.transform
            .forward(&self.real_in, None, &mut self.real_out, &mut self.imag_out)?;

        self.real_in.copy_from_slice(samples);
        self.window.apply(&mut self.real_in);
        self.power.compute(&self.real_in, &mut self.power_bins)?;

        update_smoothing(&self.power_bins, noise_gate, self.threshold, smoothing);
        suppress_isolated_bins(smoothing);
        apply_mask(smoothing, &mut self.real_out, &mut self.imag_out);

        self.transform.inverse(
            &self.real_out,
            &self.imag_out,
            &mut self.real_in,
            &mut self.imag_in,
        )?;
        self.window.apply(&mut self.real_in);
        samples.copy_from_slice(&self.real_in);

        Ok(())
    }
}
