//! Retrieval sources: where translations come from.
//!
//! Every source implements [`Retriever`]. Sources never fail on rate
//! limiting; they report [`RetrievalOutcome::Throttled`] and leave the
//! waiting to the [`BackoffCoordinator`](crate::ratelimit::BackoffCoordinator).

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{Result, RetrievalOutcome, Word};

mod config;
mod openai;
mod session;
mod wiktionary;

pub use config::{
    DEFAULT_OPENAI_MODEL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, RetrieverConfig,
    RetrieverType,
};
pub use openai::OpenAiRetriever;
pub use wiktionary::WiktionaryRetriever;

/// A remote source of translations for single words.
///
/// Implementations are shared between all concurrently running retrievals
/// and must therefore be usable through `&self`.
#[async_trait]
pub trait Retriever: Send + Sync + Debug {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Acquire the connection resources. Calling this on an open source is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be created.
    async fn open(&self) -> Result<()>;

    /// Release the connection resources. Calling this on a closed source is a
    /// no-op.
    async fn close(&self);

    /// Look up a single word
    async fn retrieve(&self, word: &Word) -> RetrievalOutcome;

    /// Ask the source whether it is still refusing requests. This must not
    /// have any effect on the source besides one request.
    ///
    /// # Errors
    ///
    /// Returns an error if the source could not be reached at all.
    async fn probe_still_throttled(&self) -> Result<bool>;

    /// Number of network requests made so far
    fn requests_made(&self) -> usize;
}

/// Create the retrieval source described by `config`
///
/// # Errors
///
/// Fails if the source does not support the language pair, if a required API
/// key is missing, or if the base URL is unusable.
pub fn create_retriever(config: &RetrieverConfig) -> Result<Arc<dyn Retriever>> {
    let retriever: Arc<dyn Retriever> = match config.kind {
        RetrieverType::Wiktionary => Arc::new(WiktionaryRetriever::new(config)?),
        RetrieverType::OpenAi => Arc::new(OpenAiRetriever::new(config)?),
    };
    log::debug!(
        "Using {} retriever ({} → {}, concise: {})",
        retriever.name(),
        config.from,
        config.to,
        config.concise
    );
    Ok(retriever)
}
