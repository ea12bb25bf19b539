//! Noise profile learning
//!
//! Accumulates the log-power spectrum of non-overlapping, unwindowed
//! `WINDOW_SIZE` blocks of a noise-only stretch. The profile is the per-bin
//! mean of `ln(power)` over every block in which that bin had positive power.

use nr_core::SampleBuffer;
use nr_dsp::PowerSpectrum;

use crate::effect::{AudioEffect, EffectOutcome, EffectState, Lifecycle};
use crate::error::{EffectError, EffectResult};
use crate::params::{EffectParameters, NoiseProfile};
use crate::{FREQUENCY_COUNT, WINDOW_SIZE};

/// Per-channel accumulation state
#[derive(Debug, Clone)]
struct ChannelProfileState {
    /// Partial analysis window
    window: Vec<f32>,
    /// Fill position within `window`
    cursor: usize,
    /// Sum of `ln(power)` per bin
    sum: Vec<f64>,
    /// Number of blocks contributing to `sum` per bin
    count: Vec<u32>,
}

impl ChannelProfileState {
    fn new() -> Self {
        Self {
            window: vec![0.0; WINDOW_SIZE],
            cursor: 0,
            sum: vec![0.0; FREQUENCY_COUNT],
            count: vec![0; FREQUENCY_COUNT],
        }
    }

    fn accumulate(&mut self, power: &mut PowerSpectrum, bins: &mut [f32]) -> EffectResult<()> {
        power.compute(&self.window, bins)?;

        for ((sum, count), &p) in self.sum.iter_mut().zip(self.count.iter_mut()).zip(bins.iter()) {
            if p > 0.0 {
                *sum += (p as f64).ln();
                *count += 1;
            }
        }
        Ok(())
    }

    fn profile(&self) -> NoiseProfile {
        let bins = self
            .sum
            .iter()
            .zip(&self.count)
            .map(|(&sum, &count)| {
                if count != 0 {
                    (sum / count as f64) as f32
                } else {
                    0.0
                }
            })
            .collect();
        NoiseProfile::from_bins(bins)
    }
}

/// Analysis-only effect that learns a [`NoiseProfile`].
///
/// `execute` never produces output. `terminate` returns the profile of the
/// last channel; [`NoiseProfiler::channel_profiles`] keeps every channel.
#[derive(Debug, Default)]
pub struct NoiseProfiler {
    lifecycle: Lifecycle,
    channels: Vec<ChannelProfileState>,
    power: Option<PowerSpectrum>,
    power_bins: Vec<f32>,
    windows: u64,
    channel_profiles: Vec<NoiseProfile>,
}

impl NoiseProfiler {
    /// Create an uninitialized profiler
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of analysis windows accumulated per channel
    pub fn windows_analyzed(&self) -> u64 {
        self.windows
    }

    /// Per-channel profiles, available after `terminate`
    pub fn channel_profiles(&self) -> &[NoiseProfile] {
        &self.channel_profiles
    }

    /// Per-bin contribution counts of one channel
    pub fn contribution_counts(&self, channel: usize) -> Option<&[u32]> {
        self.channels.get(channel).map(|c| c.count.as_slice())
    }

    /// Per-bin log-power sums of one channel
    pub fn log_power_sums(&self, channel: usize) -> Option<&[f64]> {
        self.channels.get(channel).map(|c| c.sum.as_slice())
    }

    /// Fill cursor of one channel
    pub fn cursor(&self, channel: usize) -> Option<usize> {
        self.channels.get(channel).map(|c| c.cursor)
    }

    fn accumulate_all(&mut self, filled: &[bool]) -> EffectResult<()> {
        let Some(power) = self.power.as_mut() else {
            return Err(EffectError::InvalidState {
                operation: "accumulate",
                state: self.lifecycle.state(),
            });
        };

        for (channel, &full) in self.channels.iter_mut().zip(filled) {
            if full {
                channel.accumulate(power, &mut self.power_bins)?;
                channel.cursor = 0;
            }
        }
        Ok(())
    }
}

impl AudioEffect for NoiseProfiler {
    fn name(&self) -> &'static str {
        "NoiseProfiler"
    }

    fn initialize(&mut self, params: &EffectParameters) -> EffectResult<()> {
        let EffectParameters::Profiling(params) = params else {
            return Err(EffectError::InvalidConfig(
                "noise profiler requires profiling parameters".to_string(),
            ));
        };
        params.validate()?;
        self.lifecycle.initialize()?;

        let channels = params.format.channel_count();
        self.channels = (0..channels).map(|_| ChannelProfileState::new()).collect();
        self.power = Some(PowerSpectrum::new(WINDOW_SIZE)?);
        self.power_bins = vec![0.0; FREQUENCY_COUNT];
        self.windows = 0;
        self.channel_profiles.clear();

        log::debug!("Noise profiler initialized for {} channel(s)", channels);
        Ok(())
    }

    fn execute(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> EffectResult<()> {
        self.lifecycle.execute()?;
        output.clear();

        let channels = self.channels.len();
        if input.channels() != channels {
            return Err(EffectError::ChannelMismatch {
                expected: channels,
                actual: input.channels(),
            });
        }

        let channel_samples = input.len() / channels;
        let samples = input.samples();
        let mut filled = vec![false; channels];

        for (ch, state) in self.channels.iter_mut().enumerate() {
            let cursor = state.cursor;
            let ncopy = channel_samples.min(WINDOW_SIZE - cursor);

            for j in 0..ncopy {
                state.window[cursor + j] = samples[ch + channels * j];
            }

            if cursor + ncopy == WINDOW_SIZE {
                filled[ch] = true;
            } else {
                state.cursor += ncopy;
            }
        }

        if filled.iter().any(|&f| f) {
            self.accumulate_all(&filled)?;
            self.windows += 1;
        }
        Ok(())
    }

    fn flush(&mut self, output: &mut SampleBuffer) -> EffectResult<()> {
        self.lifecycle.flush()?;
        output.clear();

        let mut pending = vec![false; self.channels.len()];
        for (state, pending) in self.channels.iter_mut().zip(pending.iter_mut()) {
            if state.cursor > 0 {
                let cursor = state.cursor;
                state.window[cursor..].fill(0.0);
                *pending = true;
            }
        }

        if pending.iter().any(|&p| p) {
            self.accumulate_all(&pending)?;
            self.windows += 1;
        }

        log::debug!("Noise profiler flushed after {} window(s)", self.windows);
        Ok(())
    }

    fn terminate(&mut self) -> EffectResult<EffectOutcome> {
        self.lifecycle.terminate()?;

        self.channel_profiles = self.channels.iter().map(ChannelProfileState::profile).collect();

        // Single combined profile: last channel wins
        let profile = self
            .channel_profiles
            .last()
            .cloned()
            .ok_or_else(|| EffectError::InvalidConfig("no channels to profile".to_string()))?;

        log::info!(
            "Noise profile learned from {} window(s) over {} channel(s)",
            self.windows,
            self.channels.len()
        );
        Ok(EffectOutcome::Profile(profile))
    }

    fn state(&self) -> EffectState {
        self.lifecycle.state()
    }
}
