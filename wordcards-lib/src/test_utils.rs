use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::retriever::Retriever;
use crate::{
    Definition, ErrorKind, Result, RetrievalOutcome, SentencePair, TranslationRecord, Word,
};

/// What a scripted retrieval answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Success with this many records
    Records(usize),
    Throttled,
    Failure,
    /// The retrieval task panics
    Panic,
}

/// What a scripted probe answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    /// The source keeps throttling
    Throttled,
    /// Throttling stops
    Clear,
    /// The probe request fails
    Fail,
}

/// Increments a gauge for as long as it lives and tracks the maximum
struct Gauge<'a> {
    current: &'a AtomicUsize,
}

impl<'a> Gauge<'a> {
    fn enter(current: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self { current }
    }
}

impl Drop for Gauge<'_> {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A retriever with scripted answers and counters for everything it is asked
/// to do.
///
/// Words without a script answer with one record. Once the source starts
/// throttling (see [`MockRetriever::throttle_on_completion`]), every
/// retrieval is throttled until a probe clears it.
#[derive(Debug, Default)]
pub(crate) struct MockRetriever {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    probes: Mutex<VecDeque<Probe>>,
    latency: Duration,
    latencies: HashMap<String, Duration>,
    throttle_on_completion: Option<usize>,
    throttled: AtomicBool,
    fail_open: bool,

    completions: AtomicUsize,
    calls: Mutex<HashMap<String, usize>>,
    requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    probing: AtomicUsize,
    max_probing: AtomicUsize,
    probe_calls: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl MockRetriever {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every retrieval takes this long
    pub(crate) fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Retrievals of `word` take this long
    pub(crate) fn word_latency(mut self, word: &str, latency: Duration) -> Self {
        self.latencies.insert(word.to_string(), latency);
        self
    }

    /// Answers for consecutive retrievals of `word`
    pub(crate) fn script(self, word: &str, steps: &[Step]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(word.to_string(), steps.iter().copied().collect());
        self
    }

    /// Answers for consecutive probes. Once used up, probes report whether
    /// the source is currently throttling.
    pub(crate) fn probes(self, probes: &[Probe]) -> Self {
        self.probes.lock().unwrap().extend(probes.iter().copied());
        self
    }

    /// The source starts throttling when the `n`th retrieval (1-based)
    /// completes, and that retrieval is the first to be throttled
    pub(crate) fn throttle_on_completion(mut self, n: usize) -> Self {
        self.throttle_on_completion = Some(n);
        self
    }

    /// Opening the source fails
    pub(crate) fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub(crate) fn calls(&self, word: &str) -> usize {
        self.calls.lock().unwrap().get(word).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn max_probing(&self) -> usize {
        self.max_probing.load(Ordering::SeqCst)
    }

    pub(crate) fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn next_step(&self, word: &str) -> Step {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(word)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Records(1))
    }
}

/// `n` records for `word`, each with a single definition
pub(crate) fn records(word: &str, n: usize) -> Vec<TranslationRecord> {
    (0..n)
        .map(|i| {
            TranslationRecord::new(
                word,
                "noun",
                vec![Definition::new(
                    format!("{word} #{i}"),
                    vec![SentencePair::new(format!("{word}."), format!("{word}!"))],
                )],
            )
            .unwrap()
        })
        .collect()
}

#[async_trait]
impl Retriever for MockRetriever {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn open(&self) -> Result<()> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(ErrorKind::MissingApiKey("mock"));
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    async fn retrieve(&self, word: &Word) -> RetrievalOutcome {
        let word = word.as_str();
        *self.calls.lock().unwrap().entry(word.to_string()).or_default() += 1;
        self.requests.fetch_add(1, Ordering::SeqCst);

        let _gauge = Gauge::enter(&self.in_flight, &self.max_in_flight);
        let latency = self.latencies.get(word).copied().unwrap_or(self.latency);
        tokio::time::sleep(latency).await;

        let completed = self.completions.fetch_add(1, Ordering::SeqCst) + 1;
        if self.throttle_on_completion == Some(completed) {
            self.throttled.store(true, Ordering::SeqCst);
        }
        if self.throttled.load(Ordering::SeqCst) {
            return RetrievalOutcome::Throttled;
        }

        match self.next_step(word) {
            Step::Records(n) => RetrievalOutcome::Success(records(word, n)),
            Step::Throttled => RetrievalOutcome::Throttled,
            Step::Failure => RetrievalOutcome::Failure(ErrorKind::EmptyCompletion),
            Step::Panic => panic!("scripted panic for '{word}'"),
        }
    }

    async fn probe_still_throttled(&self) -> Result<bool> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let _gauge = Gauge::enter(&self.probing, &self.max_probing);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let probe = self.probes.lock().unwrap().pop_front();
        match probe {
            Some(Probe::Throttled) => Ok(true),
            Some(Probe::Clear) => {
                self.throttled.store(false, Ordering::SeqCst);
                Ok(false)
            }
            Some(Probe::Fail) => Err(ErrorKind::RejectedStatus(
                http::StatusCode::INTERNAL_SERVER_ERROR,
            )),
            None => Ok(self.throttled.load(Ordering::SeqCst)),
        }
    }

    fn requests_made(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}
