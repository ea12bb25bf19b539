//! Interleaved sample buffer

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::format::AudioFormat;

/// Interleaved, normalized float samples with a logical valid length.
///
/// The storage has a fixed capacity; `len` marks how many leading samples are
/// valid. Effects read the valid region of their input and set the valid length
/// of their output.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    format: Arc<AudioFormat>,
    samples: Vec<f32>,
    len: usize,
}

impl SampleBuffer {
    /// Create a zeroed buffer of `capacity` samples with no valid data
    pub fn with_capacity(format: Arc<AudioFormat>, capacity: usize) -> Self {
        Self {
            format,
            samples: vec![0.0; capacity],
            len: 0,
        }
    }

    /// Wrap existing samples; all of them are valid
    pub fn from_samples(format: Arc<AudioFormat>, samples: Vec<f32>) -> Self {
        let len = samples.len();
        Self {
            format,
            samples,
            len,
        }
    }

    /// Stream format
    #[inline]
    pub fn format(&self) -> &Arc<AudioFormat> {
        &self.format
    }

    /// Channel count of the stream
    #[inline]
    pub fn channels(&self) -> usize {
        self.format.channel_count()
    }

    /// Number of valid samples (all channels)
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no sample is valid
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Storage capacity in samples
    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Number of valid frames
    #[inline]
    pub fn frames(&self) -> usize {
        self.len / self.channels().max(1)
    }

    /// Set the valid length
    pub fn set_len(&mut self, len: usize) -> CoreResult<()> {
        if len > self.samples.len() {
            return Err(CoreError::BufferOverrun {
                len,
                capacity: self.samples.len(),
            });
        }
        self.len = len;
        Ok(())
    }

    /// Mark all samples invalid
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Grow the storage to at least `capacity` samples, keeping contents
    pub fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.samples.len() {
            self.samples.resize(capacity, 0.0);
        }
    }

    /// Valid samples
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples[..self.len]
    }

    /// Valid samples, mutable
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples[..self.len]
    }

    /// Whole storage regardless of the valid length
    #[inline]
    pub fn storage_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Copy `data` into the storage and mark it valid
    pub fn fill_from(&mut self, data: &[f32]) -> CoreResult<()> {
        if data.len() > self.samples.len() {
            return Err(CoreError::BufferOverrun {
                len: data.len(),
                capacity: self.samples.len(),
            });
        }
        self.samples[..data.len()].copy_from_slice(data);
        self.len = data.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo() -> Arc<AudioFormat> {
        Arc::new(AudioFormat::pcm16(44100, 2))
    }

    #[test]
    fn test_with_capacity_is_empty() {
        let buffer = SampleBuffer::with_capacity(stereo(), 64);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 64);
        assert_eq!(buffer.frames(), 0);
    }

    #[test]
    fn test_set_len_bounds() {
        let mut buffer = SampleBuffer::with_capacity(stereo(), 8);
        buffer.set_len(8).unwrap();
        assert_eq!(buffer.frames(), 4);
        assert_eq!(
            buffer.set_len(9),
            Err(CoreError::BufferOverrun { len: 9, capacity: 8 })
        );
    }

    #[test]
    fn test_fill_from_and_grow() {
        let mut buffer = SampleBuffer::with_capacity(stereo(), 2);
        assert!(buffer.fill_from(&[0.1, 0.2, 0.3, 0.4]).is_err());

        buffer.ensure_capacity(4);
        buffer.fill_from(&[0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(buffer.samples(), &[0.1, 0.2, 0.3, 0.4]);

        buffer.clear();
        assert!(buffer.samples().is_empty());
        assert_eq!(buffer.capacity(), 4);
    }
}
