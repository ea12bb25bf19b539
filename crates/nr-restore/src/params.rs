//! Effect parameters and the noise profile
//!
//! Parameters are flat serde structures so they can be persisted alongside a
//! recording and restored without any object graph.

use std::sync::Arc;

use nr_core::{AudioFormat, TimeInterval};
use serde::{Deserialize, Serialize};

use crate::error::{EffectError, EffectResult};
use crate::FREQUENCY_COUNT;

/// Per-bin average log-power noise floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoiseProfile {
    bins: Vec<f32>,
}

impl NoiseProfile {
    /// Wrap per-bin values, checking the bin count
    pub fn new(bins: Vec<f32>) -> EffectResult<Self> {
        if bins.len() != FREQUENCY_COUNT {
            return Err(EffectError::ProfileLength {
                expected: FREQUENCY_COUNT,
                got: bins.len(),
            });
        }
        Ok(Self { bins })
    }

    pub(crate) fn from_bins(bins: Vec<f32>) -> Self {
        debug_assert_eq!(bins.len(), FREQUENCY_COUNT);
        Self { bins }
    }

    /// Profile with every bin at the same level
    pub fn flat(level: f32) -> Self {
        Self {
            bins: vec![level; FREQUENCY_COUNT],
        }
    }

    /// Per-bin values
    #[inline]
    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    /// Number of bins
    #[inline]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True if the profile holds no bins
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Take the per-bin values
    pub fn into_vec(self) -> Vec<f32> {
        self.bins
    }
}

/// Parameters of the noise profiling pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfilingParameters {
    /// Target sample format
    #[serde(flatten)]
    pub format: AudioFormat,
    /// Stretch of the source holding noise only
    pub profile_interval: Option<TimeInterval>,
}

impl NoiseProfilingParameters {
    /// Create profiling parameters
    pub fn new(format: AudioFormat, profile_interval: Option<TimeInterval>) -> Self {
        Self {
            format,
            profile_interval,
        }
    }

    /// Check format and interval
    pub fn validate(&self) -> EffectResult<()> {
        self.format.validate()?;
        validate_interval(self.profile_interval.as_ref())
    }
}

/// Parameters of the noise reduction pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseReductionParameters {
    /// Target sample format
    #[serde(flatten)]
    pub format: AudioFormat,
    /// Scale of the 8x log-power margin above the noise floor
    pub threshold: f32,
    /// Learned noise floor
    pub profile: NoiseProfile,
    /// Stretch of the source used for profiling
    pub profile_interval: Option<TimeInterval>,
    /// Stretch of the source to denoise; `None` is the whole stream
    pub reduction_interval: Option<TimeInterval>,
}

impl NoiseReductionParameters {
    /// Create reduction parameters over the whole stream
    pub fn new(format: AudioFormat, threshold: f32, profile: NoiseProfile) -> Self {
        Self {
            format,
            threshold,
            profile,
            profile_interval: None,
            reduction_interval: None,
        }
    }

    /// Set the profiling interval
    pub fn with_profile_interval(mut self, interval: TimeInterval) -> Self {
        self.profile_interval = Some(interval);
        self
    }

    /// Restrict reduction to an interval
    pub fn with_reduction_interval(mut self, interval: TimeInterval) -> Self {
        self.reduction_interval = Some(interval);
        self
    }

    /// Check format, threshold, profile length and intervals
    pub fn validate(&self) -> EffectResult<()> {
        self.format.validate()?;

        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(EffectError::InvalidConfig(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }

        if self.profile.len() != FREQUENCY_COUNT {
            return Err(EffectError::ProfileLength {
                expected: FREQUENCY_COUNT,
                got: self.profile.len(),
            });
        }

        validate_interval(self.profile_interval.as_ref())?;
        validate_interval(self.reduction_interval.as_ref())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> EffectResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON and validate
    pub fn from_json(json: &str) -> EffectResult<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }
}

/// Parameters accepted by [`AudioEffect::initialize`](crate::AudioEffect::initialize)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect")]
pub enum EffectParameters {
    /// Noise profiler parameters
    Profiling(NoiseProfilingParameters),
    /// Noise reducer parameters
    Reduction(NoiseReductionParameters),
}

impl EffectParameters {
    /// Target sample format
    pub fn format(&self) -> &AudioFormat {
        match self {
            Self::Profiling(p) => &p.format,
            Self::Reduction(p) => &p.format,
        }
    }

    /// Shared copy of the target format
    pub fn shared_format(&self) -> Arc<AudioFormat> {
        Arc::new(*self.format())
    }
}

fn validate_interval(interval: Option<&TimeInterval>) -> EffectResult<()> {
    match interval {
        Some(iv) if iv.end_ms <= iv.start_ms => Err(EffectError::InvalidConfig(format!(
            "empty interval {}..{} ms",
            iv.start_ms, iv.end_ms
        ))),
        _ => Ok(()),
    }
}
