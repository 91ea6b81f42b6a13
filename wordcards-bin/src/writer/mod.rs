mod json;
mod tsv;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use wordcards_lib::Flashcard;

use crate::options::DeckFormat;

pub(crate) use json::Json;
pub(crate) use tsv::Tsv;

const STDOUT: &str = "-";

pub(crate) trait DeckWriter {
    /// Write all `cards` to `out`
    fn write(&self, cards: &[Flashcard], out: &mut dyn Write) -> Result<()>;
}

/// Create a deck writer for the given format
pub(crate) fn get_writer(format: DeckFormat, deck_name: &str) -> Box<dyn DeckWriter> {
    match format {
        DeckFormat::Tsv => Box::new(Tsv::new(deck_name)),
        DeckFormat::Json => Box::new(Json),
    }
}

/// Write the deck to `output`, or to stdout if `output` is `-`
pub(crate) fn write_deck(writer: &dyn DeckWriter, cards: &[Flashcard], output: &Path) -> Result<()> {
    if output == Path::new(STDOUT) {
        let mut out = io::stdout().lock();
        writer.write(cards, &mut out)?;
        return out.flush().context("Cannot write deck to stdout");
    }

    let file = File::create(output)
        .with_context(|| format!("Cannot create output file `{}`", output.display()))?;
    let mut out = BufWriter::new(file);
    writer.write(cards, &mut out)?;
    out.flush()
        .with_context(|| format!("Cannot write deck to `{}`", output.display()))
}
