use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use log::{info, warn};
use rand::seq::SliceRandom;
use rand::thread_rng;
use typed_builder::TypedBuilder;

use crate::collector::{CollectStats, Collector};
use crate::dispatcher::{ConcurrencyLimit, Dispatcher};
use crate::ratelimit::{BackoffConfig, BackoffCoordinator};
use crate::retriever::Retriever;
use crate::{EventSink, Flashcard, Result, TranslationRecord, WordList};

/// The result of building a deck
#[derive(Debug, Default)]
pub struct Deck {
    /// Unique flashcards in random order
    pub cards: Vec<Flashcard>,
    /// Number of network requests made while building the deck, including
    /// probes during rate limiting
    pub requests_made: usize,
    /// Counters of the retrieval run
    pub stats: CollectStats,
}

impl Deck {
    /// Whether the deck has no cards
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Builds a flashcard deck by retrieving translations for every word
/// concurrently.
///
/// ```no_run
/// use wordcards_lib::{
///     ConcurrencyLimit, DeckBuilder, Language, Result, RetrieverConfig, WordList,
///     create_retriever,
/// };
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let config = RetrieverConfig::builder()
///         .from(Language::Spanish)
///         .to(Language::English)
///         .build();
///     let deck = DeckBuilder::builder()
///         .retriever(create_retriever(&config)?)
///         .concurrency(ConcurrencyLimit::new(3)?)
///         .build()
///         .build(["hola", "perro"].into_iter().collect::<WordList>())
///         .await?;
///     println!("{} cards", deck.cards.len());
///     Ok(())
/// }
/// ```
#[derive(TypedBuilder, Debug)]
#[builder(builder_method(doc = "
Create a builder for building `DeckBuilder`.

Only the retriever is required, everything else has a default.
"))]
pub struct DeckBuilder {
    /// Where translations come from
    retriever: Arc<dyn Retriever>,

    /// Maximum number of words retrieved at the same time
    #[builder(default)]
    concurrency: ConcurrencyLimit,

    /// Stop once this many records have been collected
    #[builder(default)]
    record_limit: Option<NonZeroUsize>,

    /// Handling of a rate limited source
    #[builder(default)]
    backoff: BackoffConfig,

    /// Receives progress events
    #[builder(default)]
    events: EventSink,
}

impl DeckBuilder {
    /// Retrieve translations for all `words` and turn them into a deck.
    ///
    /// Words that fail are skipped and counted in [`Deck::stats`]. The
    /// retriever is closed when this returns, also on error.
    ///
    /// # Errors
    ///
    /// Fails if the retriever cannot be opened or a retrieval task panicked.
    pub async fn build(&self, words: WordList) -> Result<Deck> {
        if words.is_empty() {
            warn!("No words to translate");
            self.retriever.close().await;
            return Ok(Deck::default());
        }

        if let Err(e) = self.retriever.open().await {
            self.retriever.close().await;
            return Err(e);
        }

        let coordinator = Arc::new(BackoffCoordinator::new(self.backoff, self.events.clone()));
        let tasks = Dispatcher::new(
            Arc::clone(&self.retriever),
            coordinator,
            self.concurrency,
            self.events.clone(),
        )
        .spawn(words);

        let collected = Collector::new(self.record_limit, self.events.clone())
            .collect(tasks, self.retriever.as_ref())
            .await?;

        let cards = shuffled_cards(collected.records);
        let requests_made = self.retriever.requests_made();
        info!("Processing complete. Total web requests made: {requests_made}");

        Ok(Deck {
            cards,
            requests_made,
            stats: collected.stats,
        })
    }
}

/// One card per record, without duplicates, in random order
fn shuffled_cards(records: Vec<TranslationRecord>) -> Vec<Flashcard> {
    let mut seen = HashSet::new();
    let mut cards: Vec<Flashcard> = records
        .into_iter()
        .map(Flashcard::from)
        .filter(|card| seen.insert(card.clone()))
        .collect();
    cards.shuffle(&mut thread_rng());
    cards
}
