use std::fmt::{self, Display};
use std::sync::LazyLock;
use std::time::Duration;

use console::Style;
use wordcards_lib::Deck;

use crate::formatters::color::{BOLD_GREEN, BOLD_PINK, BOLD_YELLOW, DIM, NORMAL, YELLOW, color};

/// One-line summary of a finished run
pub(crate) struct CompactStats<'a> {
    deck: &'a Deck,
    duration: Duration,
}

impl<'a> CompactStats<'a> {
    pub(crate) const fn new(deck: &'a Deck, duration: Duration) -> Self {
        Self { deck, duration }
    }
}

impl Display for CompactStats<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.deck.stats;

        color!(f, NORMAL, "📝 {} Words", stats.words_total)?;

        // show duration (in a human readable format), e.g. 2m 30s
        let duration = Duration::from_secs(self.duration.as_secs());
        color!(f, DIM, " (in {})", humantime::format_duration(duration))?;

        color!(f, BOLD_GREEN, " ✅ {} Translated", stats.translated())?;

        write_if_any(stats.skipped, "🚫", "Skipped", &BOLD_PINK, f)?;
        write_if_any(stats.empty, "❓", "Not found", &YELLOW, f)?;
        write_if_any(stats.cancelled, "⏹", "Cancelled", &BOLD_YELLOW, f)?;

        let cards = if self.deck.cards.len() == 1 { "Card" } else { "Cards" };
        color!(f, NORMAL, " 🃏 {} {cards}", self.deck.cards.len())?;
        color!(f, DIM, " 🌐 {} Requests", self.deck.requests_made)?;

        Ok(())
    }
}

fn write_if_any(
    value: usize,
    symbol: &str,
    text: &str,
    style: &LazyLock<Style>,
    f: &mut fmt::Formatter<'_>,
) -> Result<(), fmt::Error> {
    if value > 0 {
        color!(f, style, " {} {} {}", symbol, value, text)?;
    }
    Ok(())
}
