use serde::Serialize;

use crate::TranslationRecord;

/// Marker put in front of every sentence when a card shows several of them
fn sentence_marker(index: usize) -> String {
    format!("<span style='color: darkgray'>[{index}]</span> ")
}

/// One card of a deck, with all fields rendered as (HTML) text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Flashcard {
    /// The word on the front of the card
    pub word: String,
    /// Part of speech of the word
    pub part_of_speech: String,
    /// All meanings, comma separated
    pub definition: String,
    /// One example sentence per meaning, in the source language
    pub source_sentences: String,
    /// Translations of `source_sentences`
    pub target_sentences: String,
}

impl From<&TranslationRecord> for Flashcard {
    fn from(record: &TranslationRecord) -> Self {
        let definition = record
            .definitions
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        // Only the first (most relevant) example of each meaning makes it
        // onto the card
        let examples: Vec<_> = record
            .definitions
            .iter()
            .filter_map(|d| d.sentence_pairs.first())
            .collect();
        let sources: Vec<&str> = examples.iter().map(|p| p.source.as_str()).collect();
        let targets: Vec<&str> = examples.iter().map(|p| p.target.as_str()).collect();

        Self {
            word: record.word.clone(),
            part_of_speech: record.part_of_speech.clone(),
            definition,
            source_sentences: combine_sentences(&sources),
            target_sentences: combine_sentences(&targets),
        }
    }
}

impl From<TranslationRecord> for Flashcard {
    fn from(record: TranslationRecord) -> Self {
        Self::from(&record)
    }
}

fn combine_sentences(sentences: &[&str]) -> String {
    match sentences {
        [] => String::new(),
        [single] => (*single).to_string(),
        many => many
            .iter()
            .enumerate()
            .map(|(i, sentence)| format!("{}{sentence}", sentence_marker(i + 1)))
            .collect::<Vec<_>>()
            .join("<br>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Definition, SentencePair};
    use pretty_assertions::assert_eq;

    fn record(definitions: Vec<Definition>) -> TranslationRecord {
        TranslationRecord::new("prueba", "noun", definitions).unwrap()
    }

    #[test]
    fn test_single_definition() {
        let card = Flashcard::from(record(vec![Definition::new(
            "test",
            vec![
                SentencePair::new("Es una prueba.", "It's a test."),
                SentencePair::new("Otra prueba.", "Another test."),
            ],
        )]));

        assert_eq!(
            card,
            Flashcard {
                word: "prueba".into(),
                part_of_speech: "noun".into(),
                definition: "test".into(),
                source_sentences: "Es una prueba.".into(),
                target_sentences: "It's a test.".into(),
            }
        );
    }

    #[test]
    fn test_several_definitions_are_numbered() {
        let card = Flashcard::from(record(vec![
            Definition::new("test", vec![SentencePair::new("Una prueba.", "A test.")]),
            Definition::new("proof", vec![SentencePair::new("La prueba.", "The proof.")]),
        ]));

        assert_eq!(card.definition, "test, proof");
        assert_eq!(
            card.source_sentences,
            "<span style='color: darkgray'>[1]</span> Una prueba.<br>\
             <span style='color: darkgray'>[2]</span> La prueba."
        );
        assert_eq!(
            card.target_sentences,
            "<span style='color: darkgray'>[1]</span> A test.<br>\
             <span style='color: darkgray'>[2]</span> The proof."
        );
    }

    #[test]
    fn test_definitions_without_examples() {
        let card = Flashcard::from(record(vec![
            Definition::new("test", vec![]),
            Definition::new("proof", vec![SentencePair::new("La prueba.", "The proof.")]),
        ]));

        assert_eq!(card.definition, "test, proof");
        assert_eq!(card.source_sentences, "La prueba.");
        assert_eq!(card.target_sentences, "The proof.");
    }
}
