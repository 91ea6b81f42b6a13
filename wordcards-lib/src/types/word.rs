use std::collections::HashSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Characters dropped from a word before it is looked up
const PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '-'];

/// A word (or short phrase) to translate, exactly as it was given.
///
/// Lookups use [`Word::normalized`], so `"¡Hola!"` and `"hola"` may refer to
/// the same entry at the retrieval source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Word(String);

impl Word {
    /// Create a new word
    #[must_use]
    pub fn new(word: impl Into<String>) -> Self {
        Self(word.into())
    }

    /// The word as it was given
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lookup form of the word: punctuation stripped, whitespace collapsed,
    /// lowercase
    #[must_use]
    pub fn normalized(&self) -> String {
        let stripped: String = self.0.chars().filter(|c| !PUNCTUATION.contains(c)).collect();
        stripped
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

impl Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Word {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Word {
    fn from(word: &str) -> Self {
        Self::new(word)
    }
}

impl From<String> for Word {
    fn from(word: String) -> Self {
        Self(word)
    }
}

/// An ordered list of unique, non-empty words.
///
/// Entries are trimmed on insertion. Blank entries and repeated entries are
/// dropped, the first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: Vec<Word>,
    seen: HashSet<Word>,
}

impl WordList {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a word unless it is blank or already present.
    /// Returns whether the word was added.
    pub fn push(&mut self, word: impl AsRef<str>) -> bool {
        let trimmed = word.as_ref().trim();
        if trimmed.is_empty() {
            return false;
        }
        let word = Word::new(trimmed);
        if self.seen.contains(&word) {
            return false;
        }
        self.seen.insert(word.clone());
        self.words.push(word);
        true
    }

    /// Number of unique words
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether there is nothing to translate
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Iterate over the words in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Word> {
        self.words.iter()
    }
}

impl PartialEq for WordList {
    fn eq(&self, other: &Self) -> bool {
        self.words == other.words
    }
}

impl Eq for WordList {}

impl<S: AsRef<str>> Extend<S> for WordList {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for word in iter {
            self.push(word);
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for WordList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl IntoIterator for WordList {
    type Item = Word;
    type IntoIter = std::vec::IntoIter<Word>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.into_iter()
    }
}

impl<'a> IntoIterator for &'a WordList {
    type Item = &'a Word;
    type IntoIter = std::slice::Iter<'a, Word>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.iter()
    }
}
