//! Collects the records of finished retrieval tasks and tears everything down
//! afterwards.

use std::num::NonZeroUsize;

use log::{debug, info};

use crate::dispatcher::{Tasks, WordStatus};
use crate::retriever::Retriever;
use crate::{Event, EventSink, Result, TranslationRecord};

/// Counters of a single collection run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Number of tasks that were spawned, one per word
    pub words_total: usize,
    /// Tasks whose outcome was collected
    pub completed: usize,
    /// Collected tasks that gave up on their word
    pub skipped: usize,
    /// Collected tasks for which the source had nothing
    pub empty: usize,
    /// Tasks that were cancelled before they could finish
    pub cancelled: usize,
    /// Total number of records collected
    pub records: usize,
    /// Whether collection stopped early because of the record limit
    pub cap_reached: bool,
}

impl CollectStats {
    /// Collected tasks that produced at least one record
    #[must_use]
    pub const fn translated(&self) -> usize {
        self.completed - self.skipped - self.empty
    }
}

/// Records and counters of a collection run
#[derive(Debug, Default)]
pub struct Collected {
    /// All records, in completion order
    pub records: Vec<TranslationRecord>,
    /// What happened along the way
    pub stats: CollectStats,
}

/// Drains retrieval tasks in completion order.
///
/// Collection stops early once the optional record limit is reached. The
/// record list may exceed the limit by the records of the task that crossed
/// it.
#[derive(Debug, Clone, Default)]
pub struct Collector {
    cap: Option<NonZeroUsize>,
    events: EventSink,
}

impl Collector {
    /// Create a collector with an optional limit on the total number of records
    #[must_use]
    pub const fn new(cap: Option<NonZeroUsize>, events: EventSink) -> Self {
        Self { cap, events }
    }

    /// Collect the records of all `tasks`.
    ///
    /// Before returning, remaining tasks are cancelled and awaited and the
    /// retriever is closed. This happens on every path, including errors.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::TaskFailed`](crate::ErrorKind::TaskFailed) if a
    /// retrieval task panicked.
    pub async fn collect(&self, mut tasks: Tasks, retriever: &dyn Retriever) -> Result<Collected> {
        let mut collected = Collected {
            records: Vec::new(),
            stats: CollectStats {
                words_total: tasks.spawned(),
                ..CollectStats::default()
            },
        };

        let drained = self.drain(&mut tasks, &mut collected).await;

        collected.stats.cancelled = tasks.shutdown().await;
        retriever.close().await;
        debug!("Closed {} retriever", retriever.name());

        drained.map(|()| collected)
    }

    async fn drain(&self, tasks: &mut Tasks, collected: &mut Collected) -> Result<()> {
        let stats = &mut collected.stats;

        while let Some(joined) = tasks.next().await {
            let outcome = joined?;
            stats.completed += 1;

            let records = match outcome.status {
                WordStatus::Skipped(_) => {
                    stats.skipped += 1;
                    continue;
                }
                WordStatus::Retrieved(records) if records.is_empty() => {
                    debug!("No records for '{}'", outcome.word);
                    stats.empty += 1;
                    continue;
                }
                WordStatus::Retrieved(records) => records,
            };

            stats.records += records.len();
            collected.records.extend(records);

            if let Some(cap) = self.cap
                && stats.records >= cap.get()
            {
                info!(
                    "Record limit of {cap} reached with {} records, cancelling {} remaining words",
                    stats.records,
                    tasks.pending()
                );
                self.events.emit(Event::RecordLimitReached {
                    records: stats.records,
                });
                stats.cap_reached = true;
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::dispatcher::{ConcurrencyLimit, Dispatcher};
    use crate::ratelimit::{BackoffCoordinator, BackoffConfig};
    use crate::test_utils::{MockRetriever, Step};
    use crate::{ErrorKind, WordList};
    use pretty_assertions::assert_eq;

    async fn run(
        retriever: &Arc<MockRetriever>,
        words: &[&str],
        limit: usize,
        cap: usize,
    ) -> Result<Collected> {
        let dispatcher = Dispatcher::new(
            Arc::clone(retriever) as Arc<dyn Retriever>,
            Arc::new(BackoffCoordinator::new(
                BackoffConfig::default(),
                EventSink::disabled(),
            )),
            ConcurrencyLimit::new(limit)?,
            EventSink::disabled(),
        );
        let tasks = dispatcher.spawn(words.iter().collect::<WordList>());
        Collector::new(NonZeroUsize::new(cap), EventSink::disabled())
            .collect(tasks, retriever.as_ref())
            .await
    }

    #[tokio::test]
    async fn test_collects_every_word() {
        let retriever = Arc::new(MockRetriever::new());

        let collected = run(&retriever, &["uno", "dos", "tres"], 1, 0).await.unwrap();

        assert_eq!(collected.records.len(), 3);
        assert_eq!(retriever.requests_made(), 3);
        assert_eq!(
            collected.stats,
            CollectStats {
                words_total: 3,
                completed: 3,
                records: 3,
                ..CollectStats::default()
            }
        );
        assert_eq!(retriever.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_limit_cancels_remaining_words() {
        let retriever = Arc::new(MockRetriever::new().latency(Duration::from_millis(100)));
        let words: Vec<String> = (0..10).map(|i| format!("word{i}")).collect();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();

        let collected = run(&retriever, &words, 2, 3).await.unwrap();
        let stats = collected.stats;

        assert_eq!(collected.records.len(), 3);
        assert!(stats.cap_reached);
        assert_eq!(stats.completed, 3);
        // At most one more task may have finished before it was collected
        assert!(stats.cancelled <= 7);
        assert!(stats.cancelled >= 6);
        assert!(retriever.total_calls() < 10);
        assert_eq!(retriever.closed(), 1);
    }

    #[tokio::test]
    async fn test_record_limit_may_be_overshot_by_last_word() {
        let retriever = Arc::new(
            MockRetriever::new()
                .script("a", &[Step::Records(2)])
                .script("b", &[Step::Records(2)]),
        );

        let collected = run(&retriever, &["a", "b", "c"], 1, 3).await.unwrap();

        assert_eq!(collected.records.len(), 4);
        assert!(collected.stats.cap_reached);
        assert_eq!(collected.stats.completed, 2);
    }

    #[tokio::test]
    async fn test_record_limit_not_reached() {
        let retriever = Arc::new(MockRetriever::new());

        let collected = run(&retriever, &["a", "b"], 2, 10).await.unwrap();

        assert_eq!(collected.records.len(), 2);
        assert!(!collected.stats.cap_reached);
        assert_eq!(collected.stats.cancelled, 0);
    }

    #[tokio::test]
    async fn test_failed_word_does_not_stop_the_others() {
        let retriever = Arc::new(
            MockRetriever::new()
                .script("malo", &[Step::Failure])
                .script("nada", &[Step::Records(0)]),
        );

        let collected = run(&retriever, &["bueno", "malo", "nada", "mejor"], 2, 0)
            .await
            .unwrap();

        assert_eq!(collected.records.len(), 2);
        assert_eq!(collected.stats.skipped, 1);
        assert_eq!(collected.stats.empty, 1);
        assert_eq!(collected.stats.translated(), 2);
        assert_eq!(retriever.closed(), 1);
    }

    #[tokio::test]
    async fn test_panicking_task_still_tears_down() {
        let retriever = Arc::new(
            MockRetriever::new()
                .script("boom", &[Step::Panic])
                .latency(Duration::from_millis(1)),
        );

        let result = run(&retriever, &["boom", "a", "b", "c"], 1, 0).await;

        assert!(matches!(result, Err(ErrorKind::TaskFailed(_))));
        assert_eq!(retriever.closed(), 1);
    }

    #[tokio::test]
    async fn test_no_tasks() {
        let retriever = Arc::new(MockRetriever::new());

        let collected = run(&retriever, &[], 1, 0).await.unwrap();

        assert!(collected.records.is_empty());
        assert_eq!(collected.stats, CollectStats::default());
        assert_eq!(retriever.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_limit_event() {
        let retriever = Arc::new(MockRetriever::new());
        let (events, mut rx) = EventSink::channel();
        let dispatcher = Dispatcher::new(
            Arc::clone(&retriever) as Arc<dyn Retriever>,
            Arc::new(BackoffCoordinator::default()),
            ConcurrencyLimit::default(),
            EventSink::disabled(),
        );
        let tasks = dispatcher.spawn(["a", "b", "c"].into_iter().collect());

        Collector::new(NonZeroUsize::new(1), events)
            .collect(tasks, retriever.as_ref())
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(Event::RecordLimitReached { records: 1 }));
    }
}
