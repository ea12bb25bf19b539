//! Audio effect lifecycle contract

use nr_core::SampleBuffer;
use serde::{Deserialize, Serialize};

use crate::error::{EffectError, EffectResult};
use crate::params::{EffectParameters, NoiseProfile};

/// Lifecycle state of an effect instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectState {
    /// Constructed, no per-channel state yet
    Created,
    /// Per-channel state allocated
    Initialized,
    /// `execute` called at least once
    Running,
    /// Buffered data drained
    Flushed,
    /// Final results produced
    Terminated,
}

impl Default for EffectState {
    fn default() -> Self {
        Self::Created
    }
}

/// Result handed back by [`AudioEffect::terminate`]
#[derive(Debug, Clone, PartialEq)]
pub enum EffectOutcome {
    /// Effect produced audio only
    None,
    /// Effect produced a noise profile
    Profile(NoiseProfile),
}

/// Block-based audio effect driven by an effect host.
///
/// Call order is `initialize`, any number of `execute` calls with arbitrary
/// chunk lengths, at most one `flush`, then `terminate`. Each instance owns its
/// per-channel state exclusively; the channel count is fixed at `initialize`.
pub trait AudioEffect: Send {
    /// Effect name for logging
    fn name(&self) -> &'static str;

    /// Allocate per-channel state for the given parameters
    fn initialize(&mut self, params: &EffectParameters) -> EffectResult<()>;

    /// Consume one chunk of interleaved samples.
    ///
    /// The valid length of `output` is set to the number of samples produced by
    /// this call, which may be zero.
    fn execute(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> EffectResult<()>;

    /// Emit any data still buffered after the final `execute`
    fn flush(&mut self, output: &mut SampleBuffer) -> EffectResult<()>;

    /// Release state and hand back results
    fn terminate(&mut self) -> EffectResult<EffectOutcome>;

    /// Current lifecycle state
    fn state(&self) -> EffectState;
}

/// Lifecycle guard shared by effect implementations
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Lifecycle {
    state: EffectState,
}

impl Lifecycle {
    pub(crate) fn state(&self) -> EffectState {
        self.state
    }

    pub(crate) fn initialize(&mut self) -> EffectResult<()> {
        self.advance("initialize", &[EffectState::Created], EffectState::Initialized)
    }

    pub(crate) fn execute(&mut self) -> EffectResult<()> {
        self.advance(
            "execute",
            &[EffectState::Initialized, EffectState::Running],
            EffectState::Running,
        )
    }

    pub(crate) fn flush(&mut self) -> EffectResult<()> {
        self.advance(
            "flush",
            &[EffectState::Initialized, EffectState::Running],
            EffectState::Flushed,
        )
    }

    pub(crate) fn terminate(&mut self) -> EffectResult<()> {
        self.advance(
            "terminate",
            &[
                EffectState::Initialized,
                EffectState::Running,
                EffectState::Flushed,
            ],
            EffectState::Terminated,
        )
    }

    fn advance(
        &mut self,
        operation: &'static str,
        allowed: &[EffectState],
        next: EffectState,
    ) -> EffectResult<()> {
        if !allowed.contains(&self.state) {
            return Err(EffectError::InvalidState {
                operation,
                state: self.state,
            });
        }
        self.state = next;
        Ok(())
    }
}
