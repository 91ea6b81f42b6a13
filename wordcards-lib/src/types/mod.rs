#![allow(unreachable_pub)]

mod error;
mod event;
mod flashcard;
mod language;
mod outcome;
mod translation;
mod word;

pub use error::ErrorKind;
pub use event::{Event, EventSink};
pub use flashcard::Flashcard;
pub use language::Language;
pub use outcome::RetrievalOutcome;
pub use translation::{Definition, SentencePair, TranslationRecord};
pub use word::{Word, WordList};

/// The wordcards `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
