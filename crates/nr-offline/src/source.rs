//! Audio sources with an exclusive interval mode

use std::path::Path;

use nr_core::{AudioFormat, SampleEncoding, TimeInterval};

use crate::error::{OfflineError, OfflineResult};

/// Random-access stream of interleaved, normalized samples.
///
/// A source may be restricted to an exclusive interval, in which case it
/// behaves as if that interval were the whole stream. Only one restriction can
/// be active at a time.
pub trait AudioSource: Send {
    /// Stream format
    fn format(&self) -> AudioFormat;

    /// Frames in the current view
    fn total_frames(&self) -> u64;

    /// Frames of the full, unrestricted stream
    fn stream_frames(&self) -> u64;

    /// Read up to `buf.len()` samples (whole frames) from the current view.
    /// Returns the number of samples read; zero at the end of the view.
    fn read(&mut self, buf: &mut [f32]) -> OfflineResult<usize>;

    /// Rewind to the start of the current view
    fn reset(&mut self) -> OfflineResult<()>;

    /// Make `interval` the whole stream until `clear_restriction`
    fn restrict_to_interval(&mut self, interval: TimeInterval) -> OfflineResult<()>;

    /// Restore full-range access
    fn clear_restriction(&mut self);

    /// Release the source
    fn close(&mut self) -> OfflineResult<()> {
        Ok(())
    }
}

/// In-memory source over decoded interleaved samples
#[derive(Debug, Clone)]
pub struct RandomAccessAudioSource {
    format: AudioFormat,
    samples: Vec<f32>,
    /// Current view in frames, `[start, end)`
    view: (u64, u64),
    /// Read position in frames, relative to the view start
    position: u64,
    restriction: Option<TimeInterval>,
}

impl RandomAccessAudioSource {
    /// Wrap interleaved samples
    pub fn from_samples(format: AudioFormat, samples: Vec<f32>) -> OfflineResult<Self> {
        format.validate()?;

        let channels = format.channel_count();
        if samples.len() % channels != 0 {
            return Err(OfflineError::InvalidConfig(format!(
                "{} samples do not form whole {}-channel frames",
                samples.len(),
                channels
            )));
        }

        let frames = (samples.len() / channels) as u64;
        Ok(Self {
            format,
            samples,
            view: (0, frames),
            position: 0,
            restriction: None,
        })
    }

    /// Decode a WAV file into memory
    pub fn open_wav<P: AsRef<Path>>(path: P) -> OfflineResult<Self> {
        let reader = hound::WavReader::open(path.as_ref())?;
        let spec = reader.spec();

        let (format, samples) = match spec.sample_format {
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(OfflineError::UnsupportedFormat(format!(
                        "{}-bit integer PCM",
                        spec.bits_per_sample
                    )));
                }
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
                let samples = reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / max_val))
                    .collect::<Result<Vec<_>, _>>()?;
                let format = AudioFormat {
                    sample_rate: spec.sample_rate,
                    channels: spec.channels,
                    bytes_per_sample: spec.bits_per_sample.div_ceil(8),
                    encoding: SampleEncoding::PcmSigned,
                };
                (format, samples)
            }
            hound::SampleFormat::Float => {
                let samples = reader.into_samples::<f32>().collect::<Result<Vec<_>, _>>()?;
                (AudioFormat::float32(spec.sample_rate, spec.channels), samples)
            }
        };

        log::debug!(
            "Decoded {} ({} Hz, {} ch, {} samples)",
            path.as_ref().display(),
            format.sample_rate,
            format.channels,
            samples.len()
        );
        Self::from_samples(format, samples)
    }

    /// Active restriction, if any
    pub fn restriction(&self) -> Option<TimeInterval> {
        self.restriction
    }

    /// All samples of the full stream
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

impl AudioSource for RandomAccessAudioSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn total_frames(&self) -> u64 {
        self.view.1 - self.view.0
    }

    fn stream_frames(&self) -> u64 {
        (self.samples.len() / self.format.channel_count()) as u64
    }

    fn read(&mut self, buf: &mut [f32]) -> OfflineResult<usize> {
        let channels = self.format.channel_count();
        let remaining = self.total_frames() - self.position;
        let frames = ((buf.len() / channels) as u64).min(remaining) as usize;

        let start = (self.view.0 + self.position) as usize * channels;
        let count = frames * channels;
        buf[..count].copy_from_slice(&self.samples[start..start + count]);

        self.position += frames as u64;
        Ok(count)
    }

    fn reset(&mut self) -> OfflineResult<()> {
        self.position = 0;
        Ok(())
    }

    fn restrict_to_interval(&mut self, interval: TimeInterval) -> OfflineResult<()> {
        if let Some(active) = self.restriction {
            return Err(OfflineError::SourceRestricted {
                start_ms: active.start_ms,
                end_ms: active.end_ms,
            });
        }

        self.view = interval.to_frame_range(&self.format, self.stream_frames());
        self.position = 0;
        self.restriction = Some(interval);

        log::debug!(
            "Source restricted to {}..{} ms (frames {}..{})",
            interval.start_ms,
            interval.end_ms,
            self.view.0,
            self.view.1
        );
        Ok(())
    }

    fn clear_restriction(&mut self) {
        if self.restriction.take().is_some() {
            log::debug!("Source restriction cleared");
        }
        self.view = (0, self.stream_frames());
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1 kHz stereo ramp: frame n holds (n, -n)
    fn ramp(frames: usize) -> RandomAccessAudioSource {
        let samples = (0..frames).flat_map(|n| [n as f32, -(n as f32)]).collect();
        RandomAccessAudioSource::from_samples(AudioFormat::pcm16(1000, 2), samples).unwrap()
    }

    #[test]
    fn test_rejects_partial_frames() {
        let result = RandomAccessAudioSource::from_samples(AudioFormat::pcm16(1000, 2), vec![0.0; 5]);
        assert!(matches!(result, Err(OfflineError::InvalidConfig(_))));
    }

    #[test]
    fn test_reads_whole_frames() {
        let mut source = ramp(10);
        let mut buf = [0.0f32; 7];

        assert_eq!(source.read(&mut buf).unwrap(), 6);
        assert_eq!(&buf[..6], &[0.0, -0.0, 1.0, -1.0, 2.0, -2.0]);

        let mut rest = [0.0f32; 64];
        assert_eq!(source.read(&mut rest).unwrap(), 14);
        assert_eq!(source.read(&mut rest).unwrap(), 0);

        source.reset().unwrap();
        assert_eq!(source.read(&mut buf).unwrap(), 6);
    }

    #[test]
    fn test_restriction_is_the_whole_stream() {
        let mut source = ramp(100);
        source.restrict_to_interval(TimeInterval::new(20, 30).unwrap()).unwrap();
        assert_eq!(source.total_frames(), 10);
        assert_eq!(source.stream_frames(), 100);

        let mut buf = [0.0f32; 64];
        assert_eq!(source.read(&mut buf).unwrap(), 20);
        assert_eq!(buf[0], 20.0);
        assert_eq!(buf[18], 29.0);

        source.clear_restriction();
        assert_eq!(source.total_frames(), 100);
        assert_eq!(source.read(&mut buf).unwrap(), 64);
        assert_eq!(buf[0], 0.0);
    }

    #[test]
    fn test_restriction_clamps_to_stream() {
        let mut source = ramp(100);
        source.restrict_to_interval(TimeInterval::new(90, 500).unwrap()).unwrap();
        assert_eq!(source.total_frames(), 10);
    }

    #[test]
    fn test_restriction_not_reentrant() {
        let mut source = ramp(100);
        source.restrict_to_interval(TimeInterval::new(0, 10).unwrap()).unwrap();

        let err = source
            .restrict_to_interval(TimeInterval::new(20, 30).unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            OfflineError::SourceRestricted {
                start_ms: 0,
                end_ms: 10
            }
        ));

        source.clear_restriction();
        assert!(source.restrict_to_interval(TimeInterval::new(20, 30).unwrap()).is_ok());
    }

    #[test]
    fn test_open_wav_normalizes_pcm16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcm16.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0i16, 16384, -32768, 32767] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let source = RandomAccessAudioSource::open_wav(&path).unwrap();
        assert_eq!(source.format(), AudioFormat::pcm16(8000, 1));
        assert_eq!(source.samples()[..3], [0.0, 0.5, -1.0]);
        assert!((source.samples()[3] - 1.0).abs() < 1e-4);
    }
}
