//! Chunked effect host loop

use std::sync::Arc;

use nr_core::SampleBuffer;
use nr_restore::{AudioEffect, EffectOutcome, EffectParameters};

use crate::config::OfflineConfig;
use crate::error::OfflineResult;
use crate::progress::CancelToken;
use crate::sink::AudioSink;
use crate::source::AudioSource;

/// Result of driving one effect over a source
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Effect ran through flush and terminate
    Completed {
        frames_read: u64,
        frames_written: u64,
        outcome: EffectOutcome,
    },
    /// Cancellation observed between chunks; flush and terminate skipped
    Cancelled,
}

/// Feeds a source through an effect in fixed-size chunks.
///
/// The cancellation flag is polled before every chunk, never inside one.
pub struct EffectRunner<'a> {
    config: &'a OfflineConfig,
    cancel: &'a CancelToken,
}

impl<'a> EffectRunner<'a> {
    pub fn new(config: &'a OfflineConfig, cancel: &'a CancelToken) -> Self {
        Self { config, cancel }
    }

    /// Run `effect` over the current view of `source`.
    ///
    /// Produced samples go to `sink` when given and are discarded otherwise.
    /// `on_progress` receives the fraction of the view read so far.
    pub fn run(
        &self,
        effect: &mut dyn AudioEffect,
        params: &EffectParameters,
        source: &mut dyn AudioSource,
        mut sink: Option<&mut dyn AudioSink>,
        mut on_progress: impl FnMut(f64),
    ) -> OfflineResult<RunOutcome> {
        effect.initialize(params)?;
        source.reset()?;

        let format = Arc::new(source.format());
        let channels = format.channel_count();
        let total_frames = source.total_frames();
        let chunk_samples = self.config.chunk_frames * channels;

        let mut input = SampleBuffer::with_capacity(format.clone(), chunk_samples);
        let mut output = SampleBuffer::with_capacity(format, chunk_samples);

        let mut frames_read = 0u64;
        let mut frames_written = 0u64;
        let mut chunks = 0usize;

        log::debug!("{} started over {} frame(s)", effect.name(), total_frames);

        loop {
            if self.cancel.is_cancelled() {
                log::info!(
                    "{} cancelled after {} of {} frame(s)",
                    effect.name(),
                    frames_read,
                    total_frames
                );
                return Ok(RunOutcome::Cancelled);
            }

            let read = source.read(input.storage_mut())?;
            if read == 0 {
                break;
            }
            input.set_len(read)?;

            effect.execute(&input, &mut output)?;
            if !output.is_empty() {
                if let Some(sink) = sink.as_mut() {
                    sink.write(output.samples())?;
                }
                frames_written += output.frames() as u64;
            }

            frames_read += input.frames() as u64;
            chunks += 1;
            if chunks % self.config.progress_interval == 0 {
                on_progress(fraction(frames_read, total_frames));
            }
        }

        effect.flush(&mut output)?;
        if !output.is_empty() {
            if let Some(sink) = sink.as_mut() {
                sink.write(output.samples())?;
            }
            frames_written += output.frames() as u64;
        }

        let outcome = effect.terminate()?;
        on_progress(1.0);

        log::debug!(
            "{} finished: {} frame(s) in, {} frame(s) out",
            effect.name(),
            frames_read,
            frames_written
        );

        Ok(RunOutcome::Completed {
            frames_read,
            frames_written,
            outcome,
        })
    }
}

fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        (done as f64 / total as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use nr_core::AudioFormat;
    use nr_restore::{
        EffectState, NoiseProfile, NoiseProfiler, NoiseProfilingParameters, NoiseReduction,
        NoiseReductionParameters, HALF_WINDOW,
    };

    use super::*;
    use crate::sink::MemorySink;
    use crate::source::RandomAccessAudioSource;

    fn source(frames: usize) -> RandomAccessAudioSource {
        let samples = (0..frames).map(|i| (i as f32 * 0.01).sin() * 0.3).collect();
        RandomAccessAudioSource::from_samples(AudioFormat::pcm16(44100, 1), samples).unwrap()
    }

    #[test]
    fn test_profiling_run_discards_output() {
        let config = OfflineConfig::default();
        let cancel = CancelToken::new();
        let mut source = source(5000);
        let mut profiler = NoiseProfiler::new();
        let params = EffectParameters::Profiling(NoiseProfilingParameters::new(source.format(), None));

        let mut reports = Vec::new();
        let outcome = EffectRunner::new(&config, &cancel)
            .run(&mut profiler, &params, &mut source, None, |p| reports.push(p))
            .unwrap();

        let RunOutcome::Completed {
            frames_read,
            frames_written,
            outcome,
        } = outcome
        else {
            panic!("run was not cancelled");
        };
        assert_eq!(frames_read, 5000);
        assert_eq!(frames_written, 0);
        assert!(matches!(outcome, EffectOutcome::Profile(_)));
        assert_eq!(profiler.state(), EffectState::Terminated);

        // 5000 / 512 rounds up to 10 chunks, plus the final report
        assert_eq!(reports.len(), 11);
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(reports.last(), Some(&1.0));
    }

    #[test]
    fn test_reduction_run_writes_sink() {
        let config = OfflineConfig::default().with_chunk_frames(HALF_WINDOW);
        let cancel = CancelToken::new();
        let mut source = source(8 * HALF_WINDOW);
        let mut sink = MemorySink::new();
        sink.open().unwrap();

        let params = EffectParameters::Reduction(NoiseReductionParameters::new(
            source.format(),
            0.0,
            NoiseProfile::flat(-1000.0),
        ));
        let mut reducer = NoiseReduction::new();
        let outcome = EffectRunner::new(&config, &cancel)
            .run(&mut reducer, &params, &mut source, Some(&mut sink), |_| {})
            .unwrap();

        // 7 windows while reading; flush re-feeds the last chunk twice
        let RunOutcome::Completed { frames_written, .. } = outcome else {
            panic!("run was not cancelled");
        };
        assert_eq!(frames_written, 9 * HALF_WINDOW as u64);
        assert_eq!(sink.samples().len(), 9 * HALF_WINDOW);
        assert_eq!(sink.writes(), 8);
    }

    #[test]
    fn test_cancelled_before_first_chunk() {
        let config = OfflineConfig::default();
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut source = source(4096);
        let mut profiler = NoiseProfiler::new();
        let params = EffectParameters::Profiling(NoiseProfilingParameters::new(source.format(), None));

        let outcome = EffectRunner::new(&config, &cancel)
            .run(&mut profiler, &params, &mut source, None, |_| {})
            .unwrap();

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(profiler.state(), EffectState::Initialized);
    }
}
