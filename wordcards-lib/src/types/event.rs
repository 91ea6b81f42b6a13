use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::Word;

/// Progress notifications emitted while a deck is built.
///
/// Events are purely informational; dropping the receiver has no effect on
/// the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A word finished with the given number of records
    WordCompleted {
        /// The word
        word: Word,
        /// Records produced for this word
        records: usize,
    },
    /// A word could not be retrieved and contributes nothing
    WordSkipped {
        /// The word
        word: Word,
        /// Human-readable cause
        reason: String,
    },
    /// The source started throttling; all retrievals are paused
    BackoffStarted,
    /// The source was probed during a backoff
    BackoffProbed {
        /// Whether the source is still throttling
        still_throttled: bool,
    },
    /// Retrievals resume
    BackoffEnded,
    /// The record limit was reached; remaining words are cancelled
    RecordLimitReached {
        /// Records collected so far
        records: usize,
    },
}

/// Optional sending half of an event channel
#[derive(Debug, Clone, Default)]
pub struct EventSink(Option<UnboundedSender<Event>>);

impl EventSink {
    /// Create a connected sink and the receiver for its events
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<Event>) {
        let (tx, rx) = unbounded_channel();
        (Self(Some(tx)), rx)
    }

    /// A sink that discards everything
    #[must_use]
    pub const fn disabled() -> Self {
        Self(None)
    }

    pub(crate) fn emit(&self, event: Event) {
        if let Some(tx) = &self.0 {
            // Nobody listening anymore
            let _ = tx.send(event);
        }
    }
}
