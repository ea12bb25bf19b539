//! Two-pass denoise orchestration
//!
//! ```text
//! Idle → Profiling → (Aborted | ProfiledOk) → Reducing → (Aborted | Done)
//! ```
//!
//! The profiling pass runs over the source restricted to the profiling
//! interval and discards its output. The reduction pass runs over the full
//! stream (or the reduction interval) and writes to the sink.

use std::sync::Arc;
use std::thread::JoinHandle;

use nr_core::TimeInterval;
use nr_restore::{
    AudioEffect, EffectOutcome, EffectParameters, NoiseProfile, NoiseProfiler,
    NoiseProfilingParameters, NoiseReduction, NoiseReductionParameters,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::OfflineConfig;
use crate::error::{OfflineError, OfflineResult};
use crate::progress::{CancelToken, DenoiseStage, ProgressEvent, ProgressListener};
use crate::runner::{EffectRunner, RunOutcome};
use crate::sink::AudioSink;
use crate::source::AudioSource;

// ═══════════════════════════════════════════════════════════════════════════════
// SETTINGS & STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// User-facing denoise settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenoiseSettings {
    /// Gate threshold; 0.1 is a moderate default
    pub threshold: f32,
    /// Noise-only stretch to learn the profile from
    pub profile_interval: TimeInterval,
    /// Stretch to denoise; `None` is the whole stream
    pub reduction_interval: Option<TimeInterval>,
}

impl DenoiseSettings {
    pub fn new(profile_interval: TimeInterval) -> Self {
        Self {
            threshold: 0.1,
            profile_interval,
            reduction_interval: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Denoise only a snippet, e.g. for a preview
    pub fn with_reduction_interval(mut self, interval: TimeInterval) -> Self {
        self.reduction_interval = Some(interval);
        self
    }
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenoiseState {
    Idle,
    Profiling,
    ProfiledOk,
    Reducing,
    Aborted,
    Done,
    Failed,
}

impl Default for DenoiseState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct DenoiseReport {
    /// Combined noise profile
    pub profile: NoiseProfile,
    /// Frames fed to the profiler
    pub frames_profiled: u64,
    /// Frames fed to the reducer
    pub frames_reduced: u64,
    /// Frames written to the sink
    pub frames_written: u64,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum DenoiseOutcome {
    /// Cancelled; nothing further was run after the cancelled pass
    Aborted,
    Done(DenoiseReport),
}

/// Creates the effects for each pass
pub trait EffectFactory: Send {
    fn profiler(&self) -> Box<dyn AudioEffect>;
    fn reducer(&self) -> Box<dyn AudioEffect>;
}

/// [`NoiseProfiler`] followed by [`NoiseReduction`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SpectralEffects;

impl EffectFactory for SpectralEffects {
    fn profiler(&self) -> Box<dyn AudioEffect> {
        Box::new(NoiseProfiler::new())
    }

    fn reducer(&self) -> Box<dyn AudioEffect> {
        Box::new(NoiseReduction::new())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DENOISE JOB
// ═══════════════════════════════════════════════════════════════════════════════

/// Profile noise from one stretch of a source, then remove it from the stream
pub struct DenoiseJob<S, K> {
    settings: DenoiseSettings,
    config: OfflineConfig,
    source: S,
    sink: K,
    factory: Box<dyn EffectFactory>,
    listener: Option<Box<dyn ProgressListener>>,
    cancel: CancelToken,
    state: Arc<RwLock<DenoiseState>>,
}

impl<S, K> DenoiseJob<S, K>
where
    S: AudioSource,
    K: AudioSink,
{
    pub fn new(source: S, sink: K, settings: DenoiseSettings) -> Self {
        Self {
            settings,
            config: OfflineConfig::default(),
            source,
            sink,
            factory: Box::new(SpectralEffects),
            listener: None,
            cancel: CancelToken::new(),
            state: Arc::new(RwLock::new(DenoiseState::Idle)),
        }
    }

    pub fn with_config(mut self, config: OfflineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the effects run by each pass
    pub fn with_factory<F: EffectFactory + 'static>(mut self, factory: F) -> Self {
        self.factory = Box::new(factory);
        self
    }

    pub fn with_listener<L: ProgressListener + 'static>(mut self, listener: L) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Share an existing cancellation flag
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> DenoiseState {
        *self.state.read()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Run both passes on the calling thread
    pub fn run(&mut self) -> OfflineResult<DenoiseOutcome> {
        let result = self.run_passes();
        match &result {
            Ok(DenoiseOutcome::Aborted) => self.set_state(DenoiseState::Aborted),
            Ok(DenoiseOutcome::Done(_)) => {
                self.set_state(DenoiseState::Done);
                if let Some(listener) = self.listener.as_mut() {
                    listener.on_progress(ProgressEvent::Finished);
                }
            }
            Err(e) => {
                log::warn!("Denoise failed: {}", e);
                self.set_state(DenoiseState::Failed);
            }
        }
        result
    }

    fn set_state(&self, state: DenoiseState) {
        log::debug!("Denoise state -> {:?}", state);
        *self.state.write() = state;
    }

    fn validate(&self) -> OfflineResult<()> {
        self.config.validate()?;

        let profile = self.settings.profile_interval;
        if profile.end_ms <= profile.start_ms {
            return Err(OfflineError::InvalidConfig(format!(
                "empty profiling interval {}..{} ms",
                profile.start_ms, profile.end_ms
            )));
        }
        if profile.duration_ms() < self.config.min_profile_ms {
            return Err(OfflineError::ProfileTooShort {
                duration_ms: profile.duration_ms(),
                minimum_ms: self.config.min_profile_ms,
            });
        }
        if !self.settings.threshold.is_finite() || self.settings.threshold < 0.0 {
            return Err(OfflineError::InvalidConfig(format!(
                "threshold must be a non-negative number, got {}",
                self.settings.threshold
            )));
        }
        Ok(())
    }

    fn run_passes(&mut self) -> OfflineResult<DenoiseOutcome> {
        self.validate()?;

        let Self {
            settings,
            config,
            source,
            sink,
            factory,
            listener,
            cancel,
            state,
        } = self;

        let format = source.format();
        format.validate()?;

        // Weight progress by the frames each pass will read
        let stream_frames = source.stream_frames();
        let frames_in = |interval: &TimeInterval| {
            let (start, end) = interval.to_frame_range(&format, stream_frames);
            end - start
        };
        let profile_frames = frames_in(&settings.profile_interval);
        let reduce_frames = settings
            .reduction_interval
            .as_ref()
            .map_or(stream_frames, frames_in);
        let total = (profile_frames + reduce_frames).max(1) as f64;
        let profile_share = profile_frames as f64 / total;

        let runner = EffectRunner::new(config, cancel);
        sink.open()?;

        // Pass 1: learn the noise floor from the restricted source
        *state.write() = DenoiseState::Profiling;
        log::info!(
            "Profiling noise over {}..{} ms ({} frames)",
            settings.profile_interval.start_ms,
            settings.profile_interval.end_ms,
            profile_frames
        );

        let profiling = EffectParameters::Profiling(NoiseProfilingParameters::new(
            format,
            Some(settings.profile_interval),
        ));
        source.restrict_to_interval(settings.profile_interval)?;
        let mut profiler = factory.profiler();
        let result = runner.run(profiler.as_mut(), &profiling, &mut *source, None, |p| {
            if let Some(listener) = listener.as_mut() {
                listener.on_progress(ProgressEvent::Running {
                    stage: DenoiseStage::Profiling,
                    progress: p * profile_share,
                });
            }
        });
        source.clear_restriction();

        let (frames_profiled, profile) = match result? {
            RunOutcome::Cancelled => {
                log::info!("Denoise cancelled during profiling");
                return Ok(DenoiseOutcome::Aborted);
            }
            RunOutcome::Completed {
                frames_read,
                outcome: EffectOutcome::Profile(profile),
                ..
            } => (frames_read, profile),
            RunOutcome::Completed { .. } => return Err(OfflineError::MissingProfile),
        };
        *state.write() = DenoiseState::ProfiledOk;

        // Pass 2: gate the stream against the learned floor
        let mut reduction =
            NoiseReductionParameters::new(format, settings.threshold, profile.clone())
                .with_profile_interval(settings.profile_interval);
        if let Some(interval) = settings.reduction_interval {
            reduction = reduction.with_reduction_interval(interval);
            source.restrict_to_interval(interval)?;
        }

        *state.write() = DenoiseState::Reducing;
        log::info!(
            "Reducing noise over {} frames with threshold {}",
            reduce_frames,
            settings.threshold
        );

        let mut reducer = factory.reducer();
        let result = runner.run(
            reducer.as_mut(),
            &EffectParameters::Reduction(reduction),
            &mut *source,
            Some(&mut *sink),
            |p| {
                if let Some(listener) = listener.as_mut() {
                    listener.on_progress(ProgressEvent::Running {
                        stage: DenoiseStage::Reducing,
                        progress: profile_share + p * (1.0 - profile_share),
                    });
                }
            },
        );
        if settings.reduction_interval.is_some() {
            source.clear_restriction();
        }

        let (frames_reduced, frames_written) = match result? {
            RunOutcome::Cancelled => {
                log::info!("Denoise cancelled during reduction");
                return Ok(DenoiseOutcome::Aborted);
            }
            RunOutcome::Completed {
                frames_read,
                frames_written,
                ..
            } => (frames_read, frames_written),
        };

        sink.close()?;
        source.close()?;

        log::info!(
            "Denoise finished: {} frame(s) profiled, {} frame(s) written",
            frames_profiled,
            frames_written
        );

        Ok(DenoiseOutcome::Done(DenoiseReport {
            profile,
            frames_profiled,
            frames_reduced,
            frames_written,
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BACKGROUND EXECUTION
// ═══════════════════════════════════════════════════════════════════════════════

impl<S, K> DenoiseJob<S, K>
where
    S: AudioSource + 'static,
    K: AudioSink + 'static,
{
    /// Run both passes on a dedicated worker thread
    pub fn spawn(mut self) -> OfflineResult<DenoiseHandle> {
        let cancel = self.cancel.clone();
        let state = self.state.clone();

        let thread = std::thread::Builder::new()
            .name("nr-denoise".to_string())
            .spawn(move || self.run())?;

        Ok(DenoiseHandle {
            cancel,
            state,
            thread,
        })
    }
}

/// Handle to a denoise job running on a worker thread
#[derive(Debug)]
pub struct DenoiseHandle {
    cancel: CancelToken,
    state: Arc<RwLock<DenoiseState>>,
    thread: JoinHandle<OfflineResult<DenoiseOutcome>>,
}

impl DenoiseHandle {
    /// Request cancellation; observed before the next chunk
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> DenoiseState {
        *self.state.read()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker to finish
    pub fn join(self) -> OfflineResult<DenoiseOutcome> {
        self.thread.join().map_err(|_| OfflineError::WorkerPanicked)?
    }
}

#[cfg(test)]
mod tests {
    use nr_core::AudioFormat;

    use super::*;
    use crate::sink::MemorySink;
    use crate::source::RandomAccessAudioSource;

    fn noise_source(frames: usize) -> RandomAccessAudioSource {
        let mut state = 1u32;
        let samples = (0..frames)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
                ((state >> 16) & 0x7fff) as f32 / 32768.0 * 0.02 - 0.01
            })
            .collect();
        RandomAccessAudioSource::from_samples(AudioFormat::pcm16(8000, 1), samples).unwrap()
    }

    fn settings(start_ms: u64, end_ms: u64) -> DenoiseSettings {
        DenoiseSettings::new(TimeInterval { start_ms, end_ms })
    }

    #[test]
    fn test_short_profile_rejected() {
        let mut job = DenoiseJob::new(noise_source(16000), MemorySink::new(), settings(0, 50));
        let err = job.run().unwrap_err();
        assert!(matches!(
            err,
            OfflineError::ProfileTooShort {
                duration_ms: 50,
                minimum_ms: 100
            }
        ));
        assert_eq!(job.state(), DenoiseState::Failed);
        assert!(!job.sink().is_opened());
    }

    #[test]
    fn test_inverted_profile_rejected() {
        let mut job = DenoiseJob::new(noise_source(16000), MemorySink::new(), settings(500, 100))
            .with_config(OfflineConfig::default().with_min_profile_ms(0));
        assert!(matches!(job.run(), Err(OfflineError::InvalidConfig(_))));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut job = DenoiseJob::new(
            noise_source(16000),
            MemorySink::new(),
            settings(0, 500).with_threshold(-0.5),
        );
        assert!(matches!(job.run(), Err(OfflineError::InvalidConfig(_))));
    }

    #[test]
    fn test_done_clears_restriction_and_closes_sink() {
        let mut job = DenoiseJob::new(noise_source(16000), MemorySink::new(), settings(0, 500));
        let outcome = job.run().unwrap();

        let DenoiseOutcome::Done(report) = outcome else {
            panic!("job was not cancelled");
        };
        // 500 ms at 8 kHz
        assert_eq!(report.frames_profiled, 4000);
        assert_eq!(report.frames_reduced, 16000);
        assert_eq!(job.state(), DenoiseState::Done);
        assert!(job.source().restriction().is_none());
        assert!(job.sink().is_closed());
        assert_eq!(job.sink().samples().len() as u64, report.frames_written);
    }

    #[test]
    fn test_trial_reduction_interval() {
        let mut job = DenoiseJob::new(
            noise_source(16000),
            MemorySink::new(),
            settings(0, 500).with_reduction_interval(TimeInterval {
                start_ms: 1000,
                end_ms: 1512,
            }),
        )
        .with_config(OfflineConfig::default().with_chunk_frames(1024));

        let DenoiseOutcome::Done(report) = job.run().unwrap() else {
            panic!("job was not cancelled");
        };
        // 512 ms at 8 kHz is exactly two hops
        assert_eq!(report.frames_reduced, 4096);
        assert!(job.source().restriction().is_none());
    }

    #[test]
    fn test_huge_intervals_clamp_to_stream() {
        let mut job = DenoiseJob::new(
            noise_source(4000),
            MemorySink::new(),
            settings(0, u64::MAX / 2).with_reduction_interval(TimeInterval {
                start_ms: 0,
                end_ms: u64::MAX,
            }),
        );

        let DenoiseOutcome::Done(report) = job.run().unwrap() else {
            panic!("job was not cancelled");
        };
        assert_eq!(report.frames_profiled, 4000);
        assert_eq!(report.frames_reduced, 4000);
        assert!(job.source().restriction().is_none());
    }
}
