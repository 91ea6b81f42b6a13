use crate::{ErrorKind, TranslationRecord};

/// Result of a single retrieval attempt for one word.
///
/// Rate limiting is not an error: sources report it as
/// [`RetrievalOutcome::Throttled`] so it can be handled once for all words
/// in flight.
#[derive(Debug)]
pub enum RetrievalOutcome {
    /// The source answered. The list is empty if the word is unknown.
    Success(Vec<TranslationRecord>),
    /// The source is refusing requests right now
    Throttled,
    /// The word could not be retrieved
    Failure(ErrorKind),
}

impl RetrievalOutcome {
    /// Whether the source reported rate limiting
    #[must_use]
    pub const fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled)
    }
}

impl From<ErrorKind> for RetrievalOutcome {
    fn from(e: ErrorKind) -> Self {
        Self::Failure(e)
    }
}
