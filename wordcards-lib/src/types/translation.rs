use serde::{Deserialize, Serialize};

/// An example sentence together with its translation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SentencePair {
    /// Sentence in the source language
    pub source: String,
    /// The same sentence in the target language
    pub target: String,
}

impl SentencePair {
    /// Create a new sentence pair
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// One meaning of a word
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Definition {
    /// Translation or short explanation of this meaning
    pub text: String,
    /// Example sentences for this meaning, most relevant first
    #[serde(default)]
    pub sentence_pairs: Vec<SentencePair>,
}

impl Definition {
    /// Create a definition with the given examples
    #[must_use]
    pub fn new(text: impl Into<String>, sentence_pairs: Vec<SentencePair>) -> Self {
        Self {
            text: text.into(),
            sentence_pairs,
        }
    }
}

/// Everything a retrieval source knows about a word used as one part of
/// speech.
///
/// Sources only hand out complete records: a record always has at least one
/// definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranslationRecord {
    /// The word that was translated
    pub word: String,
    /// Part of speech, e.g. `noun`
    pub part_of_speech: String,
    /// Meanings of the word, most common first
    pub definitions: Vec<Definition>,
}

impl TranslationRecord {
    /// Create a record, returning `None` if there are no definitions
    #[must_use]
    pub fn new(
        word: impl Into<String>,
        part_of_speech: impl Into<String>,
        definitions: Vec<Definition>,
    ) -> Option<Self> {
        if definitions.is_empty() {
            return None;
        }
        Some(Self {
            word: word.into(),
            part_of_speech: part_of_speech.into(),
            definitions,
        })
    }
}
