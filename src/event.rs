//! Poll progress events.

use tokio::sync::broadcast;

/// Events emitted while a verification poll runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// The poll task has started.
    Started {
        /// User address being watched.
        user_address: String,
    },

    /// A cycle failed on I/O and will be retried on the next tick.
    CycleFailed {
        /// Error message.
        message: String,
    },

    /// A cycle completed without finding a verification.
    CycleCompleted {
        /// Non-matching cycles so far.
        attempts: u32,
    },

    /// A verification was found.
    Matched {
        /// Hash of the resolving transaction, when known.
        transaction_hash: Option<String>,
    },

    /// The attempt budget ran out.
    TimedOut {
        /// Non-matching cycles performed.
        attempts: u32,
    },

    /// The poll was cancelled by the caller.
    Cancelled,
}

/// Channel for receiving poll events.
pub type PollEventsChannel = broadcast::Receiver<PollEvent>;

/// Sender for poll events.
pub type PollEventsSender = broadcast::Sender<PollEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (PollEventsSender, PollEventsChannel) {
    broadcast::channel(256)
}
