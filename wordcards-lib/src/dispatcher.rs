//! Bounded concurrent dispatch of one retrieval task per word.

use std::fmt::{self, Display};
use std::sync::Arc;

use log::{debug, error, warn};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::ratelimit::BackoffCoordinator;
use crate::retriever::Retriever;
use crate::{ErrorKind, Event, EventSink, Result, RetrievalOutcome, TranslationRecord, Word, WordList};

/// Upper bound for the number of concurrent retrievals.
/// Retrieval sources are free services that throttle aggressively.
pub const MAX_CONCURRENCY: usize = 5;

/// Number of retrievals allowed to run at the same time, between 1 and
/// [`MAX_CONCURRENCY`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConcurrencyLimit(usize);

impl ConcurrencyLimit {
    /// Validate a concurrency limit
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConcurrency`] if `limit` is 0 or larger
    /// than [`MAX_CONCURRENCY`].
    pub const fn new(limit: usize) -> Result<Self> {
        if limit == 0 || limit > MAX_CONCURRENCY {
            return Err(ErrorKind::InvalidConcurrency(limit));
        }
        Ok(Self(limit))
    }

    /// The limit as number
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<usize> for ConcurrencyLimit {
    type Error = ErrorKind;

    fn try_from(limit: usize) -> Result<Self> {
        Self::new(limit)
    }
}

impl Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the retrieval of a single word ended
#[derive(Debug)]
pub enum WordStatus {
    /// The source answered; the list may be empty
    Retrieved(Vec<TranslationRecord>),
    /// The word was given up on
    Skipped(ErrorKind),
}

/// Result of one retrieval task
#[derive(Debug)]
pub struct WordOutcome {
    /// The word the task was started for
    pub word: Word,
    /// What came of it
    pub status: WordStatus,
}

/// Starts one task per word, of which at most [`ConcurrencyLimit`] retrieve
/// at the same time.
///
/// Tasks take their slot in the order they were spawned. Every retrieval
/// goes through the [`BackoffCoordinator`], so a rate limited source is
/// handled once for all tasks.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    retriever: Arc<dyn Retriever>,
    coordinator: Arc<BackoffCoordinator>,
    slots: Arc<Semaphore>,
    events: EventSink,
}

impl Dispatcher {
    /// Create a dispatcher for the given source
    #[must_use]
    pub fn new(
        retriever: Arc<dyn Retriever>,
        coordinator: Arc<BackoffCoordinator>,
        limit: ConcurrencyLimit,
        events: EventSink,
    ) -> Self {
        Self {
            retriever,
            coordinator,
            slots: Arc::new(Semaphore::new(limit.get())),
            events,
        }
    }

    /// Spawn one retrieval task per word onto the current runtime
    #[must_use]
    pub fn spawn(&self, words: WordList) -> Tasks {
        let mut set = JoinSet::new();
        for word in words {
            let dispatcher = self.clone();
            set.spawn(async move { dispatcher.process(word).await });
        }
        let spawned = set.len();
        debug!("Spawned {spawned} retrieval tasks");
        Tasks { set, spawned }
    }

    async fn process(self, word: Word) -> WordOutcome {
        let status = match self.slots.acquire().await {
            // The permit is returned when it is dropped, also on cancellation
            Ok(_permit) => self.retrieve(&word).await,
            Err(e) => WordStatus::Skipped(ErrorKind::AdmissionClosed(e)),
        };
        WordOutcome { word, status }
    }

    async fn retrieve(&self, word: &Word) -> WordStatus {
        match self.coordinator.retrieve(self.retriever.as_ref(), word).await {
            RetrievalOutcome::Success(records) => {
                debug!("Retrieved {} records for '{word}'", records.len());
                self.events.emit(Event::WordCompleted {
                    word: word.clone(),
                    records: records.len(),
                });
                WordStatus::Retrieved(records)
            }
            RetrievalOutcome::Failure(e) => {
                error!("Error processing '{word}': {e}");
                self.events.emit(Event::WordSkipped {
                    word: word.clone(),
                    reason: e.to_string(),
                });
                WordStatus::Skipped(e)
            }
            // The coordinator resolves throttling before returning
            RetrievalOutcome::Throttled => {
                warn!("Giving up on '{word}', source is still rate limited");
                self.events.emit(Event::WordSkipped {
                    word: word.clone(),
                    reason: ErrorKind::StillThrottled.to_string(),
                });
                WordStatus::Skipped(ErrorKind::StillThrottled)
            }
        }
    }
}

/// Handle to the running retrieval tasks
#[derive(Debug)]
pub struct Tasks {
    set: JoinSet<WordOutcome>,
    spawned: usize,
}

impl Tasks {
    /// Number of tasks that were spawned
    #[must_use]
    pub const fn spawned(&self) -> usize {
        self.spawned
    }

    /// Number of tasks that have not been collected yet
    #[must_use]
    pub fn pending(&self) -> usize {
        self.set.len()
    }

    /// Wait for the next task to finish, in completion order.
    /// Returns `None` once all tasks have been collected.
    pub async fn next(&mut self) -> Option<std::result::Result<WordOutcome, JoinError>> {
        self.set.join_next().await
    }

    /// Cancel all remaining tasks and wait until they are gone.
    ///
    /// Cancellation is expected here and not reported as an error. Returns
    /// the number of tasks that were cancelled.
    pub async fn shutdown(&mut self) -> usize {
        self.set.abort_all();

        let mut cancelled = 0;
        while let Some(joined) = self.set.join_next().await {
            match joined {
                Err(e) if e.is_cancelled() => cancelled += 1,
                Err(e) => warn!("Retrieval task failed during shutdown: {e}"),
                Ok(outcome) => debug!("Discarding result for '{}' after shutdown", outcome.word),
            }
        }
        if cancelled > 0 {
            debug!("Cancelled {cancelled} unfinished retrieval tasks");
        }
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_utils::{MockRetriever, Step};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn dispatcher(retriever: &Arc<MockRetriever>, limit: usize) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(retriever) as Arc<dyn Retriever>,
            Arc::new(BackoffCoordinator::default()),
            ConcurrencyLimit::new(limit).unwrap(),
            EventSink::disabled(),
        )
    }

    async fn drain(mut tasks: Tasks) -> Vec<WordOutcome> {
        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.next().await {
            outcomes.push(joined.unwrap());
        }
        outcomes
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(5, true)]
    #[case(6, false)]
    fn test_concurrency_limit(#[case] limit: usize, #[case] valid: bool) {
        assert_eq!(ConcurrencyLimit::try_from(limit).is_ok(), valid);
    }

    #[tokio::test]
    async fn test_one_task_per_word() {
        let retriever = Arc::new(MockRetriever::new());
        let words: WordList = ["uno", "dos", "tres", "dos", "uno"].into_iter().collect();

        let tasks = dispatcher(&retriever, 2).spawn(words);
        assert_eq!(tasks.spawned(), 3);

        let outcomes = drain(tasks).await;
        assert_eq!(outcomes.len(), 3);
        for word in ["uno", "dos", "tres"] {
            assert_eq!(retriever.calls(word), 1);
        }
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(5)]
    #[tokio::test(start_paused = true)]
    async fn test_at_most_limit_in_flight(#[case] limit: usize) {
        let retriever = Arc::new(MockRetriever::new().latency(Duration::from_millis(100)));
        let words: WordList = (0..12).map(|i| format!("word{i}")).collect();

        let outcomes = drain(dispatcher(&retriever, limit).spawn(words)).await;

        assert_eq!(outcomes.len(), 12);
        assert_eq!(retriever.max_in_flight(), limit);
    }

    #[tokio::test]
    async fn test_failure_is_skipped() {
        let retriever = Arc::new(MockRetriever::new().script("malo", &[Step::Failure]));
        let words: WordList = ["bueno", "malo"].into_iter().collect();

        let mut outcomes = drain(dispatcher(&retriever, 2).spawn(words)).await;
        outcomes.sort_by(|a, b| a.word.cmp(&b.word));

        assert!(matches!(&outcomes[0].status, WordStatus::Retrieved(records) if records.len() == 1));
        assert_eq!(outcomes[1].word, Word::new("malo"));
        assert!(matches!(outcomes[1].status, WordStatus::Skipped(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_are_taken_in_spawn_order() {
        let retriever = Arc::new(MockRetriever::new().latency(Duration::from_millis(100)));
        let words: WordList = ["a", "b", "c", "d"].into_iter().collect();

        let outcomes = drain(dispatcher(&retriever, 1).spawn(words)).await;
        let order: Vec<&str> = outcomes.iter().map(|o| o.word.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_tasks() {
        let retriever = Arc::new(MockRetriever::new().latency(Duration::from_secs(10)));
        let words: WordList = ["a", "b", "c"].into_iter().collect();

        let mut tasks = dispatcher(&retriever, 1).spawn(words);
        let first = tasks.next().await.unwrap().unwrap();
        assert_eq!(first.word, Word::new("a"));

        assert_eq!(tasks.shutdown().await, 2);
        assert_eq!(tasks.pending(), 0);
        assert!(tasks.next().await.is_none());
        // "c" never got a slot
        assert_eq!(retriever.calls("c"), 0);
    }
}
