//! Overlap-add spectral noise reduction
//!
//! Each channel buffers one `WINDOW_SIZE` analysis window. Once a window is
//! full it is gated, overlap-added with the previous gated window and
//! `HALF_WINDOW` samples are emitted; the second half of the raw window seeds
//! the next one (50% hop). Output therefore lags input by one window, which
//! `flush` drains.

use nr_core::SampleBuffer;

use crate::effect::{AudioEffect, EffectOutcome, EffectState, Lifecycle};
use crate::error::{EffectError, EffectResult};
use crate::gate::SpectralGate;
use crate::params::EffectParameters;
use crate::{HALF_WINDOW, WINDOW_SIZE};

/// Per-channel reduction state carried across `execute` calls
#[derive(Debug, Clone)]
struct ChannelReductionState {
    /// Window being filled
    window: Vec<f32>,
    /// Previously gated window, pending its second-half overlap
    last_window: Option<Vec<f32>>,
    /// Recycled buffer for the next window
    spare: Vec<f32>,
    /// Noise floor per bin
    noise_gate: Vec<f32>,
    /// Gate hysteresis per bin, in [0, 1]
    smoothing: Vec<f32>,
    /// Fill position within `window`
    cursor: usize,
}

impl ChannelReductionState {
    fn new(noise_gate: &[f32]) -> Self {
        Self {
            window: vec![0.0; WINDOW_SIZE],
            last_window: None,
            spare: Vec::new(),
            noise_gate: noise_gate.to_vec(),
            smoothing: vec![0.0; noise_gate.len()],
            cursor: 0,
        }
    }

    /// Gate the current window and overlap-add it into `out`.
    ///
    /// Writes `min(length, WINDOW_SIZE) - min(length, HALF_WINDOW)` samples for
    /// `channel` at interleaved positions and returns that count.
    fn process_window(
        &mut self,
        gate: &mut SpectralGate,
        out: &mut [f32],
        channel: usize,
        channels: usize,
        length: usize,
    ) -> EffectResult<usize> {
        let used = length.min(WINDOW_SIZE) - length.min(HALF_WINDOW);

        let mut next = std::mem::take(&mut self.spare);
        if next.len() != WINDOW_SIZE {
            next = vec![0.0; WINDOW_SIZE];
        }
        next[..HALF_WINDOW].copy_from_slice(&self.window[HALF_WINDOW..]);
        next[HALF_WINDOW..].fill(0.0);

        gate.reduce(&mut self.window, &self.noise_gate, &mut self.smoothing)?;

        match &self.last_window {
            Some(last) => {
                for j in 0..used {
                    out[channel + channels * j] = self.window[j] + last[HALF_WINDOW + j];
                }
            }
            None => {
                for j in 0..used {
                    out[channel + channels * j] = self.window[j];
                }
            }
        }

        let processed = std::mem::replace(&mut self.window, next);
        if let Some(previous) = self.last_window.replace(processed) {
            self.spare = previous;
        }

        Ok(used)
    }
}

/// Spectral noise reducer driven by a learned [`NoiseProfile`](crate::NoiseProfile).
///
/// Emits `HALF_WINDOW` frames for every call that completes a window and
/// nothing otherwise. Input beyond the point where a window fills is not
/// buffered, so hosts should feed chunks that divide `HALF_WINDOW`.
#[derive(Debug, Default)]
pub struct NoiseReduction {
    lifecycle: Lifecycle,
    channels: Vec<ChannelReductionState>,
    gate: Option<SpectralGate>,
    last_input: Option<SampleBuffer>,
    windows: u64,
}

impl NoiseReduction {
    /// Create an uninitialized reducer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of windows gated so far
    pub fn windows_processed(&self) -> u64 {
        self.windows
    }

    /// Fill cursor of one channel
    pub fn cursor(&self, channel: usize) -> Option<usize> {
        self.channels.get(channel).map(|c| c.cursor)
    }

    /// Gate hysteresis of one channel
    pub fn smoothing(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(|c| c.smoothing.as_slice())
    }

    fn process_chunk(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> EffectResult<()> {
        let channels = self.channels.len();
        let Some(gate) = self.gate.as_mut() else {
            return Err(EffectError::InvalidState {
                operation: "execute",
                state: self.lifecycle.state(),
            });
        };

        let channel_samples = input.len() / channels;
        let samples = input.samples();

        output.ensure_capacity(channels * HALF_WINDOW);
        let mut produced = 0;

        for (ch, state) in self.channels.iter_mut().enumerate() {
            let cursor = state.cursor;
            let ncopy = channel_samples.min(WINDOW_SIZE - cursor);

            for j in 0..ncopy {
                state.window[cursor + j] = samples[ch + channels * j];
            }

            if cursor + ncopy == WINDOW_SIZE {
                let used = state.process_window(gate, output.storage_mut(), ch, channels, WINDOW_SIZE)?;
                state.cursor = HALF_WINDOW;
                produced += used;
            } else {
                state.cursor += ncopy;
            }
        }

        if produced > 0 {
            self.windows += 1;
        }
        output.set_len(produced)?;
        Ok(())
    }
}

impl AudioEffect for NoiseReduction {
    fn name(&self) -> &'static str {
        "NoiseReduction"
    }

    fn initialize(&mut self, params: &EffectParameters) -> EffectResult<()> {
        let EffectParameters::Reduction(params) = params else {
            return Err(EffectError::InvalidConfig(
                "noise reduction requires reduction parameters".to_string(),
            ));
        };
        params.validate()?;
        self.lifecycle.initialize()?;

        let channels = params.format.channel_count();
        self.channels = (0..channels)
            .map(|_| ChannelReductionState::new(params.profile.bins()))
            .collect();
        self.gate = Some(SpectralGate::new(params.threshold)?);
        self.last_input = None;
        self.windows = 0;

        log::debug!(
            "Noise reduction initialized for {} channel(s), threshold {}",
            channels,
            params.threshold
        );
        Ok(())
    }

    fn execute(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> EffectResult<()> {
        self.lifecycle.execute()?;

        if input.channels() != self.channels.len() {
            return Err(EffectError::ChannelMismatch {
                expected: self.channels.len(),
                actual: input.channels(),
            });
        }

        self.last_input = Some(input.clone());
        self.process_chunk(input, output)
    }

    fn flush(&mut self, output: &mut SampleBuffer) -> EffectResult<()> {
        self.lifecycle.flush()?;
        output.clear();

        let channels = self.channels.len();
        let mut drained: Vec<f32> = Vec::new();

        // Re-feed the last chunk until the pending overlap is drained
        if let Some(last) = self.last_input.take() {
            let limit = last.len() * 2;
            let mut scratch = SampleBuffer::with_capacity(last.format().clone(), limit);

            while drained.len() < limit {
                self.process_chunk(&last, &mut scratch)?;
                if scratch.is_empty() {
                    break;
                }
                drained.extend_from_slice(scratch.samples());
            }
        }

        let Some(gate) = self.gate.as_mut() else {
            return Err(EffectError::InvalidState {
                operation: "flush",
                state: self.lifecycle.state(),
            });
        };

        // Final pass over whatever is buffered, zero-padded
        let mut tail = vec![0.0; channels * HALF_WINDOW];
        let mut tail_frames = 0;
        for (ch, state) in self.channels.iter_mut().enumerate() {
            let length = state.cursor;
            state.window[length..].fill(0.0);
            tail_frames = state.process_window(gate, &mut tail, ch, channels, length)?;
            state.cursor = 0;
        }

        let total = drained.len() + tail_frames * channels;
        output.ensure_capacity(total);
        let storage = output.storage_mut();
        storage[..drained.len()].copy_from_slice(&drained);
        storage[drained.len()..total].copy_from_slice(&tail[..tail_frames * channels]);
        output.set_len(total)?;

        log::debug!(
            "Noise reduction flushed {} sample(s) after {} window(s)",
            total,
            self.windows
        );
        Ok(())
    }

    fn terminate(&mut self) -> EffectResult<EffectOutcome> {
        self.lifecycle.terminate()?;
        self.gate = None;
        self.last_input = None;

        log::info!(
            "Noise reduction finished: {} window(s) over {} channel(s)",
            self.windows,
            self.channels.len()
        );
        Ok(EffectOutcome::None)
    }

    fn state(&self) -> EffectState {
        self.lifecycle.state()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nr_core::AudioFormat;

    use super::*;
    use crate::params::{NoiseProfile, NoiseReductionParameters};

    fn new_reducer(channels: u16, threshold: f32, profile: NoiseProfile) -> (NoiseReduction, Arc<AudioFormat>) {
        let format = AudioFormat::pcm16(44100, channels);
        let mut reducer = NoiseReduction::new();
        reducer
            .initialize(&EffectParameters::Reduction(NoiseReductionParameters::new(
                format, threshold, profile,
            )))
            .unwrap();
        (reducer, Arc::new(format))
    }

    fn sine(frames: usize) -> Vec<f32> {
        (0..frames).map(|i| (i as f32 * 0.031).sin() * 0.5).collect()
    }

    /// Feed mono chunks and return the valid output length of each call
    fn output_lengths(reducer: &mut NoiseReduction, format: &Arc<AudioFormat>, sizes: &[usize]) -> Vec<usize> {
        let source = sine(sizes.iter().sum());
        let mut offset = 0;
        let mut out = SampleBuffer::with_capacity(format.clone(), 0);
        sizes
            .iter()
            .map(|&n| {
                let input = SampleBuffer::from_samples(format.clone(), source[offset..offset + n].to_vec());
                offset += n;
                reducer.execute(&input, &mut out).unwrap();
                out.len()
            })
            .collect()
    }

    #[test]
    fn test_window_accounting_aligned_chunks() {
        let (mut reducer, format) = new_reducer(1, 0.1, NoiseProfile::flat(0.0));
        assert_eq!(
            output_lengths(&mut reducer, &format, &[1024, 1024, 1024, 1024]),
            vec![0, HALF_WINDOW, HALF_WINDOW, HALF_WINDOW]
        );
        assert_eq!(reducer.cursor(0), Some(HALF_WINDOW));
        assert_eq!(reducer.windows_processed(), 3);
    }

    #[test]
    fn test_window_accounting_whole_windows() {
        let (mut reducer, format) = new_reducer(1, 0.1, NoiseProfile::flat(0.0));
        assert_eq!(
            output_lengths(&mut reducer, &format, &[2048, 2048]),
            vec![HALF_WINDOW, HALF_WINDOW]
        );
    }

    #[test]
    fn test_window_accounting_unaligned_chunks() {
        let (mut reducer, format) = new_reducer(1, 0.1, NoiseProfile::flat(0.0));
        // 700, 1400, 2048 (648 copied), 1724, 2048 (324 copied)
        assert_eq!(
            output_lengths(&mut reducer, &format, &[700, 700, 700, 700, 700]),
            vec![0, 0, HALF_WINDOW, 0, HALF_WINDOW]
        );

        let (mut reducer, format) = new_reducer(1, 0.1, NoiseProfile::flat(0.0));
        assert_eq!(
            output_lengths(&mut reducer, &format, &[512, 100, 1436, 3, 1021]),
            vec![0, 0, HALF_WINDOW, 0, HALF_WINDOW]
        );
        assert_eq!(reducer.cursor(0), Some(HALF_WINDOW));
    }

    #[test]
    fn test_stereo_output_is_interleaved() {
        let (mut reducer, format) = new_reducer(2, 0.0, NoiseProfile::flat(-1000.0));
        let frames = WINDOW_SIZE;
        let mut interleaved = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            interleaved.push(0.25);
            interleaved.push(0.0);
        }
        let input = SampleBuffer::from_samples(format.clone(), interleaved);
        let mut out = SampleBuffer::with_capacity(format, 0);
        reducer.execute(&input, &mut out).unwrap();

        assert_eq!(out.len(), 2 * HALF_WINDOW);
        assert_eq!(out.frames(), HALF_WINDOW);
        // Right channel is silent, left is not
        assert!(out.samples().iter().skip(1).step_by(2).all(|&s| s == 0.0));
        assert!(out.samples().iter().step_by(2).any(|&s| s.abs() > 0.01));
    }

    #[test]
    fn test_open_gate_passes_signal_through() {
        let (mut reducer, format) = new_reducer(1, 0.0, NoiseProfile::flat(-1000.0));
        let input = sine(64 * HALF_WINDOW);

        let mut output = Vec::new();
        let mut out = SampleBuffer::with_capacity(format.clone(), 0);
        for chunk in input.chunks(HALF_WINDOW) {
            let buffer = SampleBuffer::from_samples(format.clone(), chunk.to_vec());
            reducer.execute(&buffer, &mut out).unwrap();
            output.extend_from_slice(out.samples());
        }

        // Output frame n lines up with input frame n
        let range = 40 * HALF_WINDOW..60 * HALF_WINDOW;
        let mut energy_in = 0.0f64;
        let mut energy_out = 0.0f64;
        for n in range {
            assert!(
                (output[n] - input[n]).abs() < 1e-3,
                "frame {n}: {} vs {}",
                output[n],
                input[n]
            );
            energy_in += (input[n] as f64).powi(2);
            energy_out += (output[n] as f64).powi(2);
        }
        assert!((energy_out / energy_in - 1.0).abs() < 1e-2);
        assert!(reducer.smoothing(0).unwrap().iter().all(|&s| s > 0.999));
    }

    #[test]
    fn test_silence_stays_silent() {
        let (mut reducer, format) = new_reducer(1, 0.1, NoiseProfile::flat(-5.0));
        let mut out = SampleBuffer::with_capacity(format.clone(), 0);
        for _ in 0..6 {
            let input = SampleBuffer::from_samples(format.clone(), vec![0.0; HALF_WINDOW]);
            reducer.execute(&input, &mut out).unwrap();
            assert!(out.samples().iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn test_flush_drains_repeated_last_chunk() {
        let (mut reducer, format) = new_reducer(1, 0.0, NoiseProfile::flat(-1000.0));
        output_lengths(&mut reducer, &format, &[1024; 5]);

        let mut out = SampleBuffer::with_capacity(format, 0);
        reducer.flush(&mut out).unwrap();

        // Two re-fed windows fill the 2x scratch; the cursor then sits at
        // HALF_WINDOW so the final pass emits nothing
        assert_eq!(out.len(), 2 * HALF_WINDOW);
        assert_eq!(reducer.state(), EffectState::Flushed);
    }

    #[test]
    fn test_flush_emits_partial_tail() {
        let (mut reducer, format) = new_reducer(2, 0.0, NoiseProfile::flat(-1000.0));
        let source = sine(12 * 512);
        let mut out = SampleBuffer::with_capacity(format.clone(), 0);
        let mut produced = 0;
        for part in source.chunks(512) {
            let chunk: Vec<f32> = part.iter().flat_map(|&s| [s, -s]).collect();
            let input = SampleBuffer::from_samples(format.clone(), chunk);
            reducer.execute(&input, &mut out).unwrap();
            produced += out.frames();
        }
        assert_eq!(produced, 5 * HALF_WINDOW);
        assert_eq!(reducer.cursor(0), Some(HALF_WINDOW));

        reducer.flush(&mut out).unwrap();
        // Re-fed chunk only reaches 1536, final pass emits 512 frames
        assert_eq!(out.frames(), 512);
        assert_eq!(out.len(), 1024);
        for frame in out.samples().chunks(2) {
            assert!((frame[0] + frame[1]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_flush_without_input_is_empty() {
        let (mut reducer, format) = new_reducer(1, 0.1, NoiseProfile::flat(0.0));
        let mut out = SampleBuffer::with_capacity(format, 16);
        reducer.flush(&mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(reducer.terminate().unwrap(), EffectOutcome::None);
    }

    #[test]
    fn test_execute_after_flush_rejected() {
        let (mut reducer, format) = new_reducer(1, 0.1, NoiseProfile::flat(0.0));
        let mut out = SampleBuffer::with_capacity(format.clone(), 0);
        reducer.flush(&mut out).unwrap();

        let input = SampleBuffer::from_samples(format, vec![0.0; 64]);
        assert!(matches!(
            reducer.execute(&input, &mut out),
            Err(EffectError::InvalidState {
                operation: "execute",
                state: EffectState::Flushed
            })
        ));
    }

    #[test]
    fn test_execute_before_initialize_rejected() {
        let mut reducer = NoiseReduction::new();
        let format = Arc::new(AudioFormat::pcm16(44100, 1));
        let input = SampleBuffer::from_samples(format.clone(), vec![0.0; 64]);
        let mut out = SampleBuffer::with_capacity(format, 0);
        assert!(reducer.execute(&input, &mut out).is_err());
        assert_eq!(reducer.state(), EffectState::Created);
    }

    #[test]
    fn test_profile_length_mismatch_fails_initialize() {
        let short: NoiseProfile = serde_json::from_str("[0.0, 1.0, 2.0]").unwrap();
        let mut reducer = NoiseReduction::new();
        let params = EffectParameters::Reduction(NoiseReductionParameters::new(
            AudioFormat::pcm16(44100, 1),
            0.1,
            short,
        ));
        assert!(matches!(
            reducer.initialize(&params),
            Err(EffectError::ProfileLength { got: 3, .. })
        ));
        assert_eq!(reducer.state(), EffectState::Created);
    }
}
