use log::{info, warn};
use tokio::sync::watch;

use super::BackoffConfig;
use crate::retriever::Retriever;
use crate::{ErrorKind, Event, EventSink, Result, RetrievalOutcome, Word};

/// Shared rate limiting state of a retrieval source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffState {
    /// Retrievals may proceed
    #[default]
    Normal,
    /// One retrieval is probing the source; no one else is waiting yet
    Leading,
    /// One retrieval is probing the source while others wait for it
    Following {
        /// Number of throttled retrievals that joined the current backoff
        waiting: usize,
    },
}

impl BackoffState {
    /// Whether retrievals have to wait
    #[must_use]
    pub const fn is_backoff_active(self) -> bool {
        !matches!(self, Self::Normal)
    }

    /// Whether some retrieval is currently handling the backoff.
    /// There is a handler exactly while a backoff is active.
    #[must_use]
    pub const fn handler_in_progress(self) -> bool {
        self.is_backoff_active()
    }
}

/// What a throttled retrieval has to do
#[derive(Debug)]
pub enum Role<'a> {
    /// Probe the source until it recovers, then release everyone
    Leader(LeaderGuard<'a>),
    /// Wait for the leader to end the backoff
    Follower {
        /// Number of backoffs that had ended when this one was joined.
        /// The follower is released once [`BackoffCoordinator::completed_cycles`]
        /// exceeds it.
        cycle: usize,
    },
}

/// State and number of completed backoffs, changed together
#[derive(Debug, Clone, Copy, Default)]
struct Gate {
    state: BackoffState,
    cycles: usize,
}

/// Proof of being the single leader of a backoff.
///
/// Dropping the guard ends the backoff and releases all followers, whether
/// the leader finished, failed, or was cancelled.
#[derive(Debug)]
#[must_use = "dropping the guard immediately ends the backoff"]
pub struct LeaderGuard<'a> {
    coordinator: &'a BackoffCoordinator,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.release();
    }
}

/// Makes sure that a rate limited source is handled by exactly one
/// retrieval at a time.
///
/// The first retrieval that gets throttled becomes the leader and probes the
/// source every [`BackoffConfig::interval`] until it stops throttling. Every
/// other throttled retrieval becomes a follower and waits for the leader.
/// New retrievals wait as well before they start. Afterwards, every throttled
/// retrieval is retried exactly once.
#[derive(Debug)]
pub struct BackoffCoordinator {
    gate: watch::Sender<Gate>,
    config: BackoffConfig,
    events: EventSink,
}

impl Default for BackoffCoordinator {
    fn default() -> Self {
        Self::new(BackoffConfig::default(), EventSink::disabled())
    }
}

impl BackoffCoordinator {
    /// Create a coordinator in the [`BackoffState::Normal`] state
    #[must_use]
    pub fn new(config: BackoffConfig, events: EventSink) -> Self {
        let (gate, _) = watch::channel(Gate::default());
        Self {
            gate,
            config,
            events,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> BackoffState {
        self.gate.borrow().state
    }

    /// Number of backoffs that have ended so far
    #[must_use]
    pub fn completed_cycles(&self) -> usize {
        self.gate.borrow().cycles
    }

    /// Wait until no backoff is active. Returns immediately in the
    /// [`BackoffState::Normal`] state.
    pub async fn ready(&self) {
        let mut gate = self.gate.subscribe();
        // `wait_for` only fails once the sender is gone, which lives in `self`
        let _ = gate.wait_for(|g| !g.state.is_backoff_active()).await;
    }

    /// Wait until the backoff joined at `cycle` has ended.
    ///
    /// Unlike [`Self::ready`], this returns even if a new backoff started
    /// right after the joined one ended.
    pub async fn follow(&self, cycle: usize) {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|g| g.cycles > cycle).await;
    }

    /// Report a throttled retrieval and learn what to do about it.
    ///
    /// The state change happens in one step, so there is never more than one
    /// leader.
    pub fn on_throttled(&self) -> Role<'_> {
        let mut elected = false;
        let mut cycle = 0;
        self.gate.send_modify(|gate| {
            cycle = gate.cycles;
            gate.state = match gate.state {
                BackoffState::Normal => {
                    elected = true;
                    BackoffState::Leading
                }
                BackoffState::Leading => BackoffState::Following { waiting: 1 },
                BackoffState::Following { waiting } => BackoffState::Following {
                    waiting: waiting + 1,
                },
            };
        });

        if elected {
            self.events.emit(Event::BackoffStarted);
            Role::Leader(LeaderGuard { coordinator: self })
        } else {
            Role::Follower { cycle }
        }
    }

    /// Probe `retriever` every interval until it stops throttling.
    ///
    /// Followers are released when `guard` is dropped at the end of this
    /// function, including when the probe fails.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ProbeFailed`] if a probe could not be made.
    pub async fn lead(&self, guard: LeaderGuard<'_>, retriever: &dyn Retriever) -> Result<()> {
        let _guard = guard;
        warn!(
            "Rate limited by {}. Pausing all requests, checking again in {:?}",
            retriever.name(),
            self.config.interval
        );

        loop {
            tokio::time::sleep(self.config.interval).await;

            let still_throttled = match retriever.probe_still_throttled().await {
                Ok(still_throttled) => still_throttled,
                Err(e) => {
                    warn!("Rate limit probe failed, resuming requests anyway: {e}");
                    return Err(ErrorKind::ProbeFailed(Box::new(e)));
                }
            };
            self.events.emit(Event::BackoffProbed { still_throttled });

            if !still_throttled {
                return Ok(());
            }
            warn!(
                "Still rate limited, checking again in {:?}",
                self.config.interval
            );
        }
    }

    /// Retrieve `word`, taking part in the shared backoff if the source
    /// throttles.
    ///
    /// A throttled retrieval is retried exactly once after the backoff. If the
    /// retry is throttled again, the word fails with
    /// [`ErrorKind::StillThrottled`].
    pub async fn retrieve(&self, retriever: &dyn Retriever, word: &Word) -> RetrievalOutcome {
        self.ready().await;

        match retriever.retrieve(word).await {
            RetrievalOutcome::Throttled => {}
            outcome => return outcome,
        }

        match self.on_throttled() {
            Role::Leader(guard) => {
                if let Err(e) = self.lead(guard, retriever).await {
                    return RetrievalOutcome::Failure(e);
                }
            }
            Role::Follower { cycle } => self.follow(cycle).await,
        }

        match retriever.retrieve(word).await {
            RetrievalOutcome::Throttled => RetrievalOutcome::Failure(ErrorKind::StillThrottled),
            outcome => outcome,
        }
    }

    fn release(&self) {
        self.gate.send_modify(|gate| {
            gate.state = BackoffState::Normal;
            gate.cycles += 1;
        });
        self.events.emit(Event::BackoffEnded);
        info!("Rate limit backoff ended, resuming requests");
    }
}
