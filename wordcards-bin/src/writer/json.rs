use std::io::Write;

use anyhow::{Context, Result};
use wordcards_lib::Flashcard;

use super::DeckWriter;

/// A pretty-printed JSON array of cards
pub(crate) struct Json;

impl DeckWriter for Json {
    fn write(&self, cards: &[Flashcard], out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, cards).context("Cannot serialize deck")?;
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::tests::card;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    #[test]
    fn test_json() {
        let mut out = Vec::new();
        Json.write(&[card()], &mut out).unwrap();

        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value,
            json!([{
                "word": "prueba",
                "part_of_speech": "noun",
                "definition": "test, quiz, proof",
                "source_sentences": "Mañana tengo una prueba.",
                "target_sentences": "I have a test tomorrow."
            }])
        );
    }
}
