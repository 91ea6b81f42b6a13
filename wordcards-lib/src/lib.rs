//! `wordcards` is a library for building vocabulary flashcard decks.
//!
//! Translations for every word are retrieved concurrently from a remote
//! source. When the source starts rate limiting, all retrievals pause until
//! it recovers:
//!
//! ```no_run
//! use wordcards_lib::{DeckBuilder, Language, Result, RetrieverConfig, WordList, create_retriever};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let config = RetrieverConfig::builder()
//!       .from(Language::Spanish)
//!       .to(Language::English)
//!       .build();
//!   let words: WordList = ["perro", "gato"].into_iter().collect();
//!   let deck = DeckBuilder::builder()
//!       .retriever(create_retriever(&config)?)
//!       .build()
//!       .build(words)
//!       .await?;
//!   for card in deck.cards {
//!       println!("{}: {}", card.word, card.definition);
//!   }
//!   Ok(())
//! }
//! ```
//!
//! Word lists can be read from CSV or plain text files with [`WordSource`].

mod collector;
mod deck;
mod dispatcher;
mod input;
mod types;

pub mod ratelimit;
pub mod retriever;
#[cfg(test)]
mod test_utils;

pub use collector::{CollectStats, Collected, Collector};
pub use deck::{Deck, DeckBuilder};
pub use dispatcher::{ConcurrencyLimit, Dispatcher, MAX_CONCURRENCY, Tasks, WordOutcome, WordStatus};
pub use input::WordSource;
pub use retriever::{Retriever, RetrieverConfig, RetrieverType, create_retriever};
pub use types::*;
