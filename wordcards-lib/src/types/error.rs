use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

use crate::Language;

/// Possible errors when building a deck with `wordcards_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Any form of I/O error occurred while reading from a given path.
    #[error("Failed to read from path: `{}`, reason: {}", match .0 {
        Some(p) => p.to_str().unwrap_or("<MALFORMED PATH>"),
        None => "<MALFORMED PATH>",
    }, .1)]
    IoError(Option<PathBuf>, std::io::Error),

    /// A word list in CSV format could not be read
    #[error("Cannot read CSV file `{}`: {}", .0.display(), .1)]
    Csv(PathBuf, csv::Error),

    /// A CSV row does not have the column words are read from
    #[error("Row {line} of `{}` has no column {column}", path.display())]
    MissingColumn {
        /// The CSV file
        path: PathBuf,
        /// 1-based line number of the offending row
        line: u64,
        /// 0-based column index that was requested
        column: usize,
    },

    /// The HTTP client could not be created
    #[error("Failed to create the HTTP client: {0}")]
    BuildRequestClient(#[source] reqwest::Error),

    /// Network error while talking to a retrieval source
    #[error("Network error while trying to connect to an endpoint via reqwest: {0}")]
    NetworkRequest(#[source] reqwest::Error),

    /// The response body could not be read
    #[error("Error reading response body: {0}")]
    ReadResponseBody(#[source] reqwest::Error),

    /// The source answered with a status other than success or rate limiting
    #[error("Unexpected response status: {0}")]
    RejectedStatus(StatusCode),

    /// The response body is not in the expected JSON shape
    #[error("Cannot decode response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// A chat completion came back without any message content
    #[error("The completion response did not contain a message")]
    EmptyCompletion,

    /// The given string can not be parsed into a valid URL
    #[error("Cannot parse `{0}` as URL: {1}")]
    InvalidUrl(String, url::ParseError),

    /// The base URL of a retrieval source cannot be extended with a path
    #[error("Cannot use `{0}` as base URL")]
    InvalidBaseUrl(String),

    /// An authorization header could not be built from the API key
    #[error("API key cannot be used as header value")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The retriever cannot translate between the given languages
    #[error("The {retriever} retriever does not support translating from {from} to {to}")]
    UnsupportedLanguagePair {
        /// Name of the retriever
        retriever: &'static str,
        /// Source language
        from: Language,
        /// Target language
        to: Language,
    },

    /// A retriever needs an API key but none was given
    #[error("The {0} retriever needs an API key. Use `--openai-api-key` or the `OPENAI_API_KEY` env var.")]
    MissingApiKey(&'static str),

    /// The requested concurrency is outside of the supported range
    #[error("Concurrency must be between 1 and {max}, got {0}", max = crate::MAX_CONCURRENCY)]
    InvalidConcurrency(usize),

    /// The word was still throttled when retried after a backoff
    #[error("Still rate limited after waiting for the rate limit to clear")]
    StillThrottled,

    /// The probe used to check whether the rate limit is still active failed
    #[error("Rate limit probe failed: {0}")]
    ProbeFailed(#[source] Box<ErrorKind>),

    /// No more retrievals can be admitted
    #[error("Retrieval slots are no longer available")]
    AdmissionClosed(#[from] tokio::sync::AcquireError),

    /// A retrieval task panicked
    #[error("Retrieval task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl From<(PathBuf, std::io::Error)> for ErrorKind {
    fn from(value: (PathBuf, std::io::Error)) -> Self {
        Self::IoError(Some(value.0), value.1)
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(None, e)
    }
}

impl From<(String, url::ParseError)> for ErrorKind {
    fn from(value: (String, url::ParseError)) -> Self {
        Self::InvalidUrl(value.0, value.1)
    }
}
