//! Time intervals over a stream

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::format::AudioFormat;

/// Half-open millisecond interval `[start_ms, end_ms)` within a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimeInterval {
    /// Create an interval, rejecting empty or inverted ranges
    pub fn new(start_ms: u64, end_ms: u64) -> CoreResult<Self> {
        if end_ms <= start_ms {
            return Err(CoreError::InvalidInterval { start_ms, end_ms });
        }
        Ok(Self { start_ms, end_ms })
    }

    /// Length in milliseconds
    #[inline]
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Frame range covered by this interval, clamped to `total_frames`
    pub fn to_frame_range(&self, format: &AudioFormat, total_frames: u64) -> (u64, u64) {
        let start = format.millis_to_frames(self.start_ms).min(total_frames);
        let end = format.millis_to_frames(self.end_ms).min(total_frames);
        (start, end.max(start))
    }
}
