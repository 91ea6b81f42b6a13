use async_trait::async_trait;
use http::header::{self, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use url::Url;

use super::session::{Fetched, HttpSession};
use super::{Retriever, RetrieverConfig};
use crate::{
    Definition, ErrorKind, Language, Result, RetrievalOutcome, SentencePair, TranslationRecord,
    Word,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const COMPLETIONS_PATH: [&str; 3] = ["v1", "chat", "completions"];
const MODELS_PATH: [&str; 2] = ["v1", "models"];

/// Instructions for the model. `{from}` and `{to}` are replaced with the
/// language names.
const SYSTEM_PROMPT: &str = r#"You are a bilingual dictionary translating {from} words to {to}.
The user sends a single {from} word. Answer with a JSON object of this shape:

{"translations": [{"word_to_translate": "<the word>", "part_of_speech": "<noun, verb, ...>",
  "definitions": [{"text": "<{to} translation>",
    "sentence_pairs": [{"source_sentence": "<{from} example>", "target_sentence": "<{to} translation of the example>"}]}]}]}

Rules:
- One entry in "translations" per part of speech the word can have
- Every definition has at least one sentence pair
- Use short, everyday example sentences
- If the word does not exist in {from}, answer {"translations": []}"#;

/// Appended to the prompt in concise mode
const CONCISE_RULES: &str = r"
- Only include the most common meanings, at most two definitions per part of speech
- Exactly one sentence pair per definition";

// Chat completion API types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// Shape of the JSON the model is asked to produce

#[derive(Debug, Deserialize)]
struct TranslationsPayload {
    #[serde(default)]
    translations: Vec<TranslationPayload>,
}

#[derive(Debug, Deserialize)]
struct TranslationPayload {
    word_to_translate: String,
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<DefinitionPayload>,
}

#[derive(Debug, Deserialize)]
struct DefinitionPayload {
    text: String,
    #[serde(default)]
    sentence_pairs: Vec<SentencePairPayload>,
}

#[derive(Debug, Deserialize)]
struct SentencePairPayload {
    source_sentence: String,
    target_sentence: String,
}

impl TranslationPayload {
    /// Convert into a record, dropping it if the model gave no usable definition
    fn into_record(self) -> Option<TranslationRecord> {
        let definitions = self
            .definitions
            .into_iter()
            .filter(|d| !d.text.trim().is_empty())
            .map(|d| {
                let pairs = d
                    .sentence_pairs
                    .into_iter()
                    .map(|p| SentencePair::new(p.source_sentence, p.target_sentence))
                    .collect();
                Definition::new(d.text, pairs)
            })
            .collect();
        TranslationRecord::new(self.word_to_translate, self.part_of_speech, definitions)
    }
}

/// Translations generated by an `OpenAI` chat model
#[derive(Debug)]
pub struct OpenAiRetriever {
    completions_url: Url,
    models_url: Url,
    model: String,
    prompt: String,
    session: HttpSession,
}

impl OpenAiRetriever {
    /// Create a retriever translating from `config.from` to `config.to`
    ///
    /// # Errors
    ///
    /// Fails if no API key is configured, both languages are the same, or the
    /// base URL is not usable.
    pub fn new(config: &RetrieverConfig) -> Result<Self> {
        if config.from == config.to {
            return Err(ErrorKind::UnsupportedLanguagePair {
                retriever: "openai",
                from: config.from,
                to: config.to,
            });
        }

        let api_key = config
            .api_key
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .filter(|key| !key.is_empty())
            .ok_or(ErrorKind::MissingApiKey("openai"))?;
        let mut authorization = HeaderValue::from_str(&format!("Bearer {api_key}"))?;
        authorization.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, authorization);

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| ErrorKind::InvalidUrl(DEFAULT_BASE_URL.to_string(), e))?,
        };

        Ok(Self {
            completions_url: join_path(&base_url, &COMPLETIONS_PATH)?,
            models_url: join_path(&base_url, &MODELS_PATH)?,
            model: config.model.clone(),
            prompt: system_prompt(config.from, config.to, config.concise),
            session: HttpSession::new(&config.user_agent, config.timeout, headers)?,
        })
    }

    fn parse(body: &str) -> Result<Vec<TranslationRecord>> {
        let response: ChatResponse = serde_json::from_str(body)?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ErrorKind::EmptyCompletion)?;
        let payload: TranslationsPayload = serde_json::from_str(&content)?;

        Ok(payload
            .translations
            .into_iter()
            .filter_map(TranslationPayload::into_record)
            .collect())
    }
}

#[async_trait]
impl Retriever for OpenAiRetriever {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn open(&self) -> Result<()> {
        self.session.open().await.map(|_| ())
    }

    async fn close(&self) {
        self.session.close().await;
    }

    async fn retrieve(&self, word: &Word) -> RetrievalOutcome {
        let normalized = word.normalized();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &normalized,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.2,
        };

        let fetched = self
            .session
            .send(|client| client.post(self.completions_url.clone()).json(&request))
            .await;

        match fetched {
            Ok(Fetched::Body(body)) => match Self::parse(&body) {
                Ok(records) => RetrievalOutcome::Success(records),
                Err(e) => e.into(),
            },
            Ok(Fetched::Throttled) => RetrievalOutcome::Throttled,
            Ok(Fetched::Status(status)) => ErrorKind::RejectedStatus(status).into(),
            Err(e) => e.into(),
        }
    }

    async fn probe_still_throttled(&self) -> Result<bool> {
        self.session.probe(&self.models_url).await
    }

    fn requests_made(&self) -> usize {
        self.session.requests_made()
    }
}

fn system_prompt(from: Language, to: Language, concise: bool) -> String {
    let mut prompt = SYSTEM_PROMPT
        .replace("{from}", &from.to_string())
        .replace("{to}", &to.to_string());
    if concise {
        prompt.push_str(CONCISE_RULES);
    }
    prompt
}

fn join_path(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ErrorKind::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
