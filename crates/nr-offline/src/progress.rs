//! Progress reporting and cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Pass of the two-pass denoise run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenoiseStage {
    Profiling,
    Reducing,
}

/// Progress notification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProgressEvent {
    /// Overall progress in [0, 1]
    Running { stage: DenoiseStage, progress: f64 },
    /// Run completed without cancellation
    Finished,
}

/// Receiver of progress events
pub trait ProgressListener: Send {
    fn on_progress(&mut self, event: ProgressEvent);
}

impl<F> ProgressListener for F
where
    F: FnMut(ProgressEvent) + Send,
{
    fn on_progress(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Listener forwarding events over a channel to another thread
#[derive(Debug, Clone)]
pub struct ChannelProgressListener {
    sender: Sender<ProgressEvent>,
}

impl ChannelProgressListener {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressListener for ChannelProgressListener {
    fn on_progress(&mut self, event: ProgressEvent) {
        // Receiver gone means nobody is watching
        let _ = self.sender.send(event);
    }
}

/// Unbounded progress channel
pub fn progress_channel() -> (ChannelProgressListener, Receiver<ProgressEvent>) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (ChannelProgressListener::new(sender), receiver)
}

/// Shared cancellation flag, polled between chunks
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
