//! Audio sinks receiving processed samples

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use nr_core::AudioFormat;

use crate::error::{OfflineError, OfflineResult};

/// Destination of processed interleaved samples
pub trait AudioSink: Send {
    /// Prepare for writing
    fn open(&mut self) -> OfflineResult<()>;

    /// Append interleaved samples
    fn write(&mut self, samples: &[f32]) -> OfflineResult<()>;

    /// Finish writing
    fn close(&mut self) -> OfflineResult<()>;
}

/// Sink collecting samples in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    samples: Vec<f32>,
    writes: usize,
    opened: bool,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of `write` calls received
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Take the collected samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl AudioSink for MemorySink {
    fn open(&mut self) -> OfflineResult<()> {
        self.opened = true;
        self.closed = false;
        Ok(())
    }

    fn write(&mut self, samples: &[f32]) -> OfflineResult<()> {
        if !self.opened || self.closed {
            return Err(OfflineError::SinkNotOpen);
        }
        self.samples.extend_from_slice(samples);
        self.writes += 1;
        Ok(())
    }

    fn close(&mut self) -> OfflineResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// Sink encoding 16-bit PCM WAV
pub struct WavFileSink {
    path: PathBuf,
    format: AudioFormat,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    frames_written: u64,
}

impl std::fmt::Debug for WavFileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavFileSink")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("open", &self.writer.is_some())
            .field("frames_written", &self.frames_written)
            .finish()
    }
}

impl WavFileSink {
    /// Create a sink writing `format`'s rate and channel count to `path`
    pub fn new<P: Into<PathBuf>>(path: P, format: AudioFormat) -> Self {
        Self {
            path: path.into(),
            format,
            writer: None,
            frames_written: 0,
        }
    }

    /// Output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl AudioSink for WavFileSink {
    fn open(&mut self) -> OfflineResult<()> {
        self.format.validate()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let spec = hound::WavSpec {
            channels: self.format.channels,
            sample_rate: self.format.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        self.writer = Some(hound::WavWriter::create(&self.path, spec)?);
        self.frames_written = 0;

        log::debug!("Opened {} for writing", self.path.display());
        Ok(())
    }

    fn write(&mut self, samples: &[f32]) -> OfflineResult<()> {
        let writer = self.writer.as_mut().ok_or(OfflineError::SinkNotOpen)?;

        for &sample in samples {
            let s = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
            writer.write_sample(s)?;
        }

        self.frames_written += (samples.len() / self.format.channel_count()) as u64;
        Ok(())
    }

    fn close(&mut self) -> OfflineResult<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            log::debug!(
                "Closed {} after {} frame(s)",
                self.path.display(),
                self.frames_written
            );
        }
        Ok(())
    }
}
