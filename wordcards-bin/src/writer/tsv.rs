use std::io::Write;

use anyhow::{Context, Result};
use wordcards_lib::Flashcard;

use super::DeckWriter;

const COLUMNS: [&str; 5] = ["Word", "Part of speech", "Definition", "Example", "Translation"];

/// Tab separated cards, preceded by the file headers of Anki's text import
pub(crate) struct Tsv {
    deck_name: String,
}

impl Tsv {
    pub(crate) fn new(deck_name: &str) -> Self {
        Self {
            deck_name: deck_name.to_string(),
        }
    }
}

impl DeckWriter for Tsv {
    fn write(&self, cards: &[Flashcard], out: &mut dyn Write) -> Result<()> {
        writeln!(out, "#separator:tab")?;
        writeln!(out, "#html:true")?;
        writeln!(out, "#deck:{}", self.deck_name)?;
        writeln!(out, "#columns:{}", COLUMNS.join("\t"))?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(out);
        for card in cards {
            writer
                .write_record([
                    &card.word,
                    &card.part_of_speech,
                    &card.definition,
                    &card.source_sentences,
                    &card.target_sentences,
                ])
                .with_context(|| format!("Cannot write card for `{}`", card.word))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::tests::card;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tsv() {
        let mut out = Vec::new();
        Tsv::new("Spanish::Nouns").write(&[card()], &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "#separator:tab
#html:true
#deck:Spanish::Nouns
#columns:Word\tPart of speech\tDefinition\tExample\tTranslation
prueba\tnoun\ttest, quiz, proof\tMañana tengo una prueba.\tI have a test tomorrow.
"
        );
    }

    #[test]
    fn test_tsv_quotes_tabs() {
        let mut card = card();
        card.definition = "with\ttab".into();
        let mut out = Vec::new();
        Tsv::new("Deck").write(&[card], &mut out).unwrap();

        assert!(String::from_utf8(out).unwrap().contains("\"with\ttab\""));
    }
}
