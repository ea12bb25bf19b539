//! Audio stream format

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Sample encoding of the underlying PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleEncoding {
    /// Signed little-endian integer PCM
    PcmSigned,
    /// IEEE float PCM
    PcmFloat,
}

impl Default for SampleEncoding {
    fn default() -> Self {
        Self::PcmSigned
    }
}

/// Audio stream format.
///
/// Immutable once created; every [`SampleBuffer`](crate::SampleBuffer) of a
/// stream holds the same format behind an `Arc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Frames per second
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Bytes per sample of the source PCM encoding
    pub bytes_per_sample: u16,
    /// Source PCM encoding
    pub encoding: SampleEncoding,
}

impl AudioFormat {
    /// Create a 16-bit signed PCM format
    pub const fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bytes_per_sample: 2,
            encoding: SampleEncoding::PcmSigned,
        }
    }

    /// Create a 32-bit float format
    pub const fn float32(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bytes_per_sample: 4,
            encoding: SampleEncoding::PcmFloat,
        }
    }

    /// Check that the format can carry audio
    pub fn validate(&self) -> CoreResult<()> {
        if self.channels == 0 {
            return Err(CoreError::InvalidFormat("channel count is zero".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(CoreError::InvalidSampleRate(self.sample_rate));
        }
        if self.bytes_per_sample == 0 {
            return Err(CoreError::InvalidFormat("bytes per sample is zero".to_string()));
        }
        Ok(())
    }

    /// Channel count as `usize`
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels as usize
    }

    /// Bytes per interleaved frame
    #[inline]
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample as usize * self.channel_count()
    }

    /// Frame position of a time offset in milliseconds (rounded down).
    ///
    /// Saturates at `u64::MAX` for offsets beyond any real stream.
    pub fn millis_to_frames(&self, millis: u64) -> u64 {
        let frames = millis as u128 * self.sample_rate as u128 / 1000;
        u64::try_from(frames).unwrap_or(u64::MAX)
    }

    /// Time offset in milliseconds of a frame position (rounded down)
    pub fn frames_to_millis(&self, frames: u64) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        let millis = frames as u128 * 1000 / self.sample_rate as u128;
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}
