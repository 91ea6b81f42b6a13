use anyhow::{Context, Result};
use log::warn;
use wordcards_lib::{Deck, DeckBuilder, EventSink, WordList, create_retriever};

use crate::options::Config;
use crate::progress::Progress;

/// Look up all words and build the deck
pub(crate) async fn build(words: WordList, cfg: &Config) -> Result<Deck> {
    let concurrency = cfg.concurrency_limit()?;
    let retriever =
        create_retriever(&cfg.retriever_config()).context("Cannot set up the retriever")?;

    // Showing the progress bar and detailed logging is too much information
    let progress = Progress::new(words.len(), cfg.no_progress || cfg.verbose.is_detailed());
    let (events, rx) = EventSink::channel();
    let progress_task = tokio::spawn(progress.follow(rx));

    let builder = DeckBuilder::builder()
        .retriever(retriever)
        .concurrency(concurrency)
        .record_limit(cfg.record_limit())
        .backoff(cfg.backoff())
        .events(events)
        .build();
    let deck = builder.build(words).await;

    // Closes the event channel, which ends the progress task
    drop(builder);
    progress_task.await?;

    let deck = deck.context("Cannot build deck")?;
    if deck.stats.skipped > 0 {
        warn!(
            "{} of {} words could not be translated",
            deck.stats.skipped, deck.stats.words_total
        );
    }
    if deck.is_empty() {
        warn!("No flashcards were created");
    }
    Ok(deck)
}
