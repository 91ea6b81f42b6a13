use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use html5gum::{
    Span, Tokenizer,
    emitters::callback::{Callback, CallbackEmitter, CallbackEvent},
};
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use url::Url;

use super::session::{Fetched, HttpSession};
use super::{Retriever, RetrieverConfig};
use crate::{
    Definition, ErrorKind, Language, Result, RetrievalOutcome, SentencePair, TranslationRecord,
    Word,
};

const DEFAULT_BASE_URL: &str = "https://en.wiktionary.org";
const DEFINITION_PATH: [&str; 4] = ["api", "rest_v1", "page", "definition"];

/// In concise mode, at most this many meanings are kept per word
const CONCISE_MAX_DEFINITIONS: usize = 2;

/// Response of the definition endpoint: usages grouped by language code
type DefinitionResponse = HashMap<String, Vec<Usage>>;

/// The word used as one part of speech
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Usage {
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<UsageDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageDefinition {
    definition: String,
    #[serde(default)]
    parsed_examples: Vec<ParsedExample>,
}

#[derive(Debug, Deserialize)]
struct ParsedExample {
    example: String,
    translation: Option<String>,
}

/// Definitions and usage examples from the English Wiktionary REST API.
///
/// English Wiktionary explains words of every language in English, so the
/// target language must be English.
#[derive(Debug)]
pub struct WiktionaryRetriever {
    base_url: Url,
    language: Language,
    concise: bool,
    session: HttpSession,
}

impl WiktionaryRetriever {
    /// Create a retriever for words in `config.from`
    ///
    /// # Errors
    ///
    /// Fails if the target language is not English, if the base URL is not
    /// usable, or if the user agent is not a valid header value.
    pub fn new(config: &RetrieverConfig) -> Result<Self> {
        if config.to != Language::English || config.from == Language::English {
            return Err(ErrorKind::UnsupportedLanguagePair {
                retriever: "wiktionary",
                from: config.from,
                to: config.to,
            });
        }

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| ErrorKind::InvalidUrl(DEFAULT_BASE_URL.to_string(), e))?,
        };
        if base_url.cannot_be_a_base() {
            return Err(ErrorKind::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            base_url,
            language: config.from,
            concise: config.concise,
            session: HttpSession::new(&config.user_agent, config.timeout, HeaderMap::new())?,
        })
    }

    fn definition_url(&self, word: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ErrorKind::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(DEFINITION_PATH)
            .push(word);
        Ok(url)
    }

    fn records(&self, word: &Word, usages: Vec<Usage>) -> Vec<TranslationRecord> {
        let limit = if self.concise { 1 } else { usize::MAX };
        usages
            .into_iter()
            .filter_map(|usage| self.record(word, usage))
            .take(limit)
            .collect()
    }

    fn record(&self, word: &Word, usage: Usage) -> Option<TranslationRecord> {
        let mut seen = HashSet::new();
        let mut definitions = Vec::new();

        for definition in usage.definitions {
            let text = strip_markup(&definition.definition);
            if text.is_empty() || !seen.insert(text.clone()) {
                continue;
            }

            let examples: Vec<SentencePair> = definition
                .parsed_examples
                .into_iter()
                .filter_map(|example| {
                    let translation = strip_markup(&example.translation?);
                    let example = strip_markup(&example.example);
                    (!example.is_empty() && !translation.is_empty())
                        .then(|| SentencePair::new(example, translation))
                })
                .collect();

            if !self.concise {
                definitions.push(Definition::new(text, examples));
                continue;
            }

            // Concise cards only show meanings that come with an example
            if let Some(example) = examples.into_iter().next() {
                definitions.push(Definition::new(text, vec![example]));
                if definitions.len() == CONCISE_MAX_DEFINITIONS {
                    break;
                }
            }
        }

        TranslationRecord::new(
            word.as_str(),
            usage.part_of_speech.to_lowercase(),
            definitions,
        )
    }

    fn parse(&self, word: &Word, body: &str) -> RetrievalOutcome {
        match serde_json::from_str::<DefinitionResponse>(body) {
            Ok(mut response) => {
                let usages = response.remove(self.language.code()).unwrap_or_default();
                RetrievalOutcome::Success(self.records(word, usages))
            }
            Err(e) => ErrorKind::InvalidResponse(e).into(),
        }
    }
}

#[async_trait]
impl Retriever for WiktionaryRetriever {
    fn name(&self) -> &'static str {
        "wiktionary"
    }

    async fn open(&self) -> Result<()> {
        self.session.open().await.map(|_| ())
    }

    async fn close(&self) {
        self.session.close().await;
    }

    async fn retrieve(&self, word: &Word) -> RetrievalOutcome {
        let url = match self.definition_url(&word.normalized()) {
            Ok(url) => url,
            Err(e) => return e.into(),
        };

        match self.session.get_cached(&url).await {
            Ok(Fetched::Body(body)) => self.parse(word, &body),
            Ok(Fetched::Throttled) => RetrievalOutcome::Throttled,
            // Unknown words are not an error, there is just nothing to show
            Ok(Fetched::Status(StatusCode::NOT_FOUND)) => RetrievalOutcome::Success(vec![]),
            Ok(Fetched::Status(status)) => ErrorKind::RejectedStatus(status).into(),
            Err(e) => e.into(),
        }
    }

    async fn probe_still_throttled(&self) -> Result<bool> {
        self.session.probe(&self.base_url).await
    }

    fn requests_made(&self) -> usize {
        self.session.requests_made()
    }
}

/// Collects the text of an HTML fragment. Character references are decoded
/// by the tokenizer.
#[derive(Debug, Default)]
struct TextCollector {
    text: String,
}

impl Callback<(), usize> for &mut TextCollector {
    fn handle_event(&mut self, event: CallbackEvent<'_>, _span: Span<usize>) -> Option<()> {
        if let CallbackEvent::String { value } = event {
            self.text.push_str(&String::from_utf8_lossy(value));
        }
        None
    }
}

/// Plain text of an HTML fragment: tags dropped, whitespace collapsed
fn strip_markup(fragment: &str) -> String {
    let mut collector = TextCollector::default();
    Tokenizer::new_with_emitter(fragment, CallbackEmitter::new(&mut collector)).for_each(drop);
    collector.text.split_whitespace().collect::<Vec<_>>().join(" ")
}
