//! Configuration for the offline effect host

use nr_restore::HALF_WINDOW;
use serde::{Deserialize, Serialize};

use crate::error::{OfflineError, OfflineResult};

/// Offline processing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// Frames per chunk handed to `execute`; must divide `HALF_WINDOW`
    pub chunk_frames: usize,

    /// Report progress every N chunks
    pub progress_interval: usize,

    /// Shortest accepted profiling interval in milliseconds
    pub min_profile_ms: u64,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            chunk_frames: 512,
            progress_interval: 1,
            min_profile_ms: 100,
        }
    }
}

impl OfflineConfig {
    /// Set chunk size in frames
    pub fn with_chunk_frames(mut self, frames: usize) -> Self {
        self.chunk_frames = frames;
        self
    }

    /// Set progress reporting interval in chunks
    pub fn with_progress_interval(mut self, chunks: usize) -> Self {
        self.progress_interval = chunks;
        self
    }

    /// Set the minimum profiling span
    pub fn with_min_profile_ms(mut self, millis: u64) -> Self {
        self.min_profile_ms = millis;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> OfflineResult<()> {
        // The reducer drops input past a window fill, so chunks must tile the hop
        if self.chunk_frames == 0 || HALF_WINDOW % self.chunk_frames != 0 {
            return Err(OfflineError::InvalidConfig(format!(
                "chunk_frames must divide {}, got {}",
                HALF_WINDOW, self.chunk_frames
            )));
        }

        if self.progress_interval == 0 {
            return Err(OfflineError::InvalidConfig(
                "progress_interval must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> OfflineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
