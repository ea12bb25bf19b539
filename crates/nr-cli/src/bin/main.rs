//! nrdenoise: remove steady background noise from a WAV recording
//!
//! Usage:
//!   nrdenoise input.wav output.wav --profile-end-ms 1500
//!   nrdenoise input.wav preview.wav --profile-end-ms 1500 --reduce-start-ms 60000 --reduce-end-ms 70000
//!
//! The profiling interval must hold noise only (room tone before speech).

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use nr_core::TimeInterval;
use nr_offline::{
    AudioSource, DenoiseJob, DenoiseOutcome, DenoiseSettings, OfflineConfig, ProgressEvent,
    RandomAccessAudioSource, WavFileSink, progress_channel,
};
use nr_restore::NoiseReductionParameters;

#[derive(Parser, Debug)]
#[command(name = "nrdenoise", version, about = "Spectral noise reduction for WAV recordings")]
struct Args {
    /// Input WAV file
    input: PathBuf,

    /// Output WAV file (16-bit PCM)
    output: PathBuf,

    /// Start of the noise-only stretch in milliseconds
    #[arg(long, default_value_t = 0)]
    profile_start_ms: u64,

    /// End of the noise-only stretch in milliseconds
    #[arg(long)]
    profile_end_ms: u64,

    /// Gate threshold; higher removes more
    #[arg(short, long, default_value_t = 0.1)]
    threshold: f32,

    /// Start of the stretch to denoise (default: whole file)
    #[arg(long, requires = "reduce_end_ms")]
    reduce_start_ms: Option<u64>,

    /// End of the stretch to denoise
    #[arg(long, requires = "reduce_start_ms")]
    reduce_end_ms: Option<u64>,

    /// Frames per processing chunk; must divide 1024
    #[arg(long, default_value_t = 512)]
    chunk_frames: usize,

    /// Write the learned profile and reduction parameters as JSON
    #[arg(long)]
    save_profile: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let profile_interval = TimeInterval::new(args.profile_start_ms, args.profile_end_ms)
        .context("Invalid profiling interval")?;
    let mut settings = DenoiseSettings::new(profile_interval).with_threshold(args.threshold);
    if let (Some(start), Some(end)) = (args.reduce_start_ms, args.reduce_end_ms) {
        let interval = TimeInterval::new(start, end).context("Invalid reduction interval")?;
        settings = settings.with_reduction_interval(interval);
    }

    let config = OfflineConfig::default().with_chunk_frames(args.chunk_frames);
    config.validate().context("Invalid chunk size")?;

    let source = RandomAccessAudioSource::open_wav(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let format = source.format();
    log::info!(
        "Loaded {} ({} Hz, {} ch, {} frames)",
        args.input.display(),
        format.sample_rate,
        format.channels,
        source.total_frames()
    );

    let sink = WavFileSink::new(&args.output, format);
    let (listener, events) = progress_channel();
    let job = DenoiseJob::new(source, sink, settings.clone())
        .with_config(config)
        .with_listener(listener);

    let cancel = job.cancel_token();
    ctrlc::set_handler(move || {
        log::warn!("Cancelling...");
        cancel.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;

    let handle = job.spawn().context("Failed to start denoise worker")?;

    // Channel closes when the worker drops the job
    let mut reported = 0;
    for event in events.iter() {
        match event {
            ProgressEvent::Running { stage, progress } => {
                let percent = (progress * 100.0) as u32;
                if percent >= reported + 10 {
                    reported = percent - percent % 10;
                    log::info!("{:?}: {}%", stage, reported);
                }
            }
            ProgressEvent::Finished => log::info!("Finished"),
        }
    }

    let report = match handle.join()? {
        DenoiseOutcome::Done(report) => report,
        DenoiseOutcome::Aborted => bail!("Denoise cancelled"),
    };

    log::info!(
        "Wrote {} frame(s) to {}",
        report.frames_written,
        args.output.display()
    );

    if let Some(path) = &args.save_profile {
        let mut params = NoiseReductionParameters::new(format, settings.threshold, report.profile)
            .with_profile_interval(settings.profile_interval);
        if let Some(interval) = settings.reduction_interval {
            params = params.with_reduction_interval(interval);
        }
        std::fs::write(path, params.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Saved noise profile to {}", path.display());
    }

    Ok(())
}
