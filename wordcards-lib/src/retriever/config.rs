use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, VariantNames};
use typed_builder::TypedBuilder;
use url::Url;

use crate::Language;

/// Default timeout in seconds for a single request
pub const DEFAULT_TIMEOUT_SECS: usize = 20;
/// Default user agent, `wordcards/<version>`
pub const DEFAULT_USER_AGENT: &str = concat!("wordcards/", env!("CARGO_PKG_VERSION"));
/// Chat model used by the `OpenAI` retriever unless configured otherwise
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// The available retrieval sources
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    EnumIter,
    EnumString,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum RetrieverType {
    /// Definitions and examples from the English Wiktionary
    #[default]
    Wiktionary,
    /// Translations generated by an `OpenAI` chat model
    OpenAi,
}

/// Everything needed to construct a [`Retriever`](super::Retriever)
#[derive(TypedBuilder, Debug, Clone)]
pub struct RetrieverConfig {
    /// Which source to use
    #[builder(default)]
    pub kind: RetrieverType,

    /// Language of the input words
    pub from: Language,

    /// Language to translate to
    pub to: Language,

    /// Return fewer, more tightly filtered results
    #[builder(default)]
    pub concise: bool,

    /// API key for sources that need one
    #[builder(default)]
    pub api_key: Option<SecretString>,

    /// Replaces the default endpoint of the source
    #[builder(default)]
    pub base_url: Option<Url>,

    /// Model name for LLM-backed sources
    #[builder(default_code = "String::from(DEFAULT_OPENAI_MODEL)")]
    pub model: String,

    /// Timeout per request
    #[builder(default = Duration::from_secs(DEFAULT_TIMEOUT_SECS as u64))]
    pub timeout: Duration,

    /// User agent sent with every request
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    pub user_agent: String,
}
