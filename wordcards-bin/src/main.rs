//! `wordcards` builds vocabulary flashcard decks from word lists.
//!
//! Every word is looked up concurrently in a translation source and turned
//! into flashcards with a definition and example sentences. The deck is
//! written as a tab-separated file that Anki can import, or as JSON.
//!
//! The wordcards binary is a wrapper around wordcards-lib, which provides
//! convenience functions for calling wordcards from the command-line.
//!
//! Translate a few words from Spanish to English:
//! ```sh
//! wordcards perro gato casa
//! ```
//!
//! Read words from the first column of a CSV file:
//! ```sh
//! wordcards --csv vocabulary.csv --skip-first-row
//! ```
//!
//! Read one word per line from stdin and write JSON to stdout:
//! ```sh
//! cat words.txt | wordcards --words-from - --format json --output -
//! ```
//!
//! Use an OpenAI-compatible model with three concurrent lookups:
//! ```sh
//! OPENAI_API_KEY=... wordcards --retriever openai -j 3 --csv words.csv
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Error, Result, bail};
use clap::{Parser, crate_version};
use log::{error, info};

use wordcards_lib::WordSource;

mod commands;
mod formatters;
mod options;
mod progress;
mod verbosity;
mod writer;

use crate::formatters::log::init_logging;
use crate::formatters::stats::CompactStats;
use crate::options::{Config, WORDCARDS_CONFIG_FILE, WordcardsOptions};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator.
    UnexpectedFailure = 1,
    ConfigFile = 3,
}

/// Output path that stands for stdout
const STDOUT: &str = "-";

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    // See: https://doc.rust-lang.org/stable/std/process/fn.exit.html
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Merge all provided config options into one.
/// This includes a potential config file, command-line- and environment variables
fn load_config() -> Result<WordcardsOptions> {
    let mut opts = WordcardsOptions::parse();

    init_logging(&opts.config.verbose, &opts.config.mode);

    // Load a potentially existing config file and merge it into the config from
    // the CLI
    if let Some(config_file) = &opts.config_file {
        match Config::load_from_file(config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    } else {
        // Without an explicit config file, fall back to the default one in the
        // current directory. An invalid default file is an error as well.
        let default_config = PathBuf::from(WORDCARDS_CONFIG_FILE);
        if default_config.is_file() {
            match Config::load_from_file(&default_config) {
                Ok(c) => opts.config.merge(c),
                Err(e) => {
                    bail!(
                        "Cannot load default configuration file `{}`: {e:?}",
                        default_config.display()
                    );
                }
            }
        }
    }

    Ok(opts)
}

/// Set up runtime and call wordcards entrypoint
fn run_main() -> Result<i32> {
    use std::process::exit;

    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!(
                "Error while loading config: {e}\n\
                See: https://github.com/wordcards/wordcards/blob/wordcards-v{}/wordcards.example.toml",
                crate_version!()
            );
            exit(ExitCode::ConfigFile as i32);
        }
    };

    if opts.config.mode.is_plain() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let runtime = match opts.config.threads {
        Some(threads) => {
            // We define our own runtime instead of the `tokio::main` attribute
            // since we want to make the number of threads configurable
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(threads.get())
                .enable_all()
                .build()?
        }
        // Lookups are network bound, a single thread is plenty
        None => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?,
    };

    match runtime.block_on(run(&opts)) {
        Err(e) if Some(ErrorKind::BrokenPipe) == underlying_io_error_kind(&e) => {
            exit(ExitCode::Success as i32);
        }
        res => res,
    }
}

/// Check if the given error can be traced back to an `io::ErrorKind`
/// This is helpful for troubleshooting the root cause of an error.
/// Code is taken from the anyhow documentation.
fn underlying_io_error_kind(error: &Error) -> Option<io::ErrorKind> {
    for cause in error.chain() {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
    }
    None
}

/// Run wordcards on the given word sources
async fn run(opts: &WordcardsOptions) -> Result<i32> {
    let sources = opts.word_sources();
    let words = WordSource::collect_all(&sources)
        .await
        .context("Cannot read words")?;

    if opts.config.dump {
        let exit_code = commands::dump(&words, opts.config.verbose.is_detailed());
        return Ok(exit_code as i32);
    }

    let start = Instant::now();
    let deck = commands::build(words, &opts.config).await?;

    let writer = writer::get_writer(opts.config.format, &opts.config.deck_name);
    writer::write_deck(writer.as_ref(), &deck.cards, &opts.config.output)?;

    let summary = CompactStats::new(&deck, start.elapsed());
    if opts.config.output == Path::new(STDOUT) {
        // Keep stdout clean for the deck itself
        eprintln!("{summary}");
    } else {
        info!(
            "Wrote {} cards to {}",
            deck.cards.len(),
            opts.config.output.display()
        );
        println!("{summary}");
    }

    Ok(ExitCode::Success as i32)
}
