use crate::verbosity::Verbosity;
use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Parser, builder::TypedValueParser};
use const_format::{concatcp, formatcp};
use secrecy::SecretString;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;
use std::{fs, path::PathBuf, time::Duration};
use strum::{Display, EnumIter, EnumString, VariantNames};
use url::Url;
use wordcards_lib::ratelimit::BackoffConfig;
use wordcards_lib::retriever::{DEFAULT_OPENAI_MODEL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use wordcards_lib::{
    ConcurrencyLimit, Language, MAX_CONCURRENCY, RetrieverConfig, RetrieverType, WordSource,
};

pub(crate) const WORDCARDS_CONFIG_FILE: &str = "wordcards.toml";

const DEFAULT_LANGUAGE_FROM: Language = Language::Spanish;
const DEFAULT_LANGUAGE_TO: Language = Language::English;
const DEFAULT_CONCURRENCY: usize = 1;
const DEFAULT_BACKOFF_INTERVAL: &str = "30s";
const DEFAULT_OUTPUT: &str = "deck.tsv";
const DEFAULT_DECK_NAME: &str = "Vocabulary";

// this exists because clap requires `&str` type values for defaults
// whereas serde expects owned `String` types
const CONCURRENCY_STR: &str = concatcp!(DEFAULT_CONCURRENCY);
const TIMEOUT_STR: &str = concatcp!(DEFAULT_TIMEOUT_SECS);
const HELP_MSG_CONCURRENCY: &str = formatcp!(
    "Number of words looked up at the same time, at most {}",
    MAX_CONCURRENCY,
);
// We use a custom help message here because we want to show the default
// value of the config file, but also be able to check if the user has
// provided a custom value. If they didn't, we won't throw an error if
// the file doesn't exist.
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    WORDCARDS_CONFIG_FILE,
);

/// File format of the generated deck
#[derive(
    Debug, Deserialize, Default, Clone, Copy, Display, EnumIter, EnumString, VariantNames, PartialEq, Eq,
)]
#[non_exhaustive]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DeckFormat {
    /// Tab separated, with headers understood by Anki's text import
    #[default]
    Tsv,
    /// A JSON array of cards
    Json,
}

/// The different formatter modes
///
/// This decides over whether to use color for the terminal output.
#[derive(
    Debug, Deserialize, Default, Clone, Copy, Display, EnumIter, EnumString, VariantNames, PartialEq, Eq,
)]
#[non_exhaustive]
pub(crate) enum OutputMode {
    /// Plain text output.
    ///
    /// Useful for terminals that do not support color or when piping the
    /// output to another program.
    #[serde(rename = "plain")]
    #[strum(serialize = "plain", ascii_case_insensitive)]
    Plain,

    /// Colorful output.
    ///
    /// This is the default output mode.
    #[serde(rename = "color")]
    #[strum(serialize = "color", ascii_case_insensitive)]
    #[default]
    Color,
}

impl OutputMode {
    /// Returns `true` if the output mode is `Plain`
    pub(crate) const fn is_plain(self) -> bool {
        matches!(self, OutputMode::Plain)
    }
}

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    language_from: Language = DEFAULT_LANGUAGE_FROM;
    language_to: Language = DEFAULT_LANGUAGE_TO;
    concurrency: usize = DEFAULT_CONCURRENCY;
    backoff_interval: Duration = BackoffConfig::default().interval;
    timeout: usize = DEFAULT_TIMEOUT_SECS;
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    model: String = DEFAULT_OPENAI_MODEL.to_string();
    output: PathBuf = PathBuf::from(DEFAULT_OUTPUT);
    deck_name: String = DEFAULT_DECK_NAME.to_string();
    verbosity: Verbosity = Verbosity::default();
}

// Macro for merging configuration values
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// Parse a language from its English name or ISO 639-1 code
fn parse_language(value: &str) -> Result<Language> {
    value
        .parse()
        .with_context(|| format!("Unknown language `{value}`, use a name like `spanish` or a code like `es`"))
}

/// wordcards builds vocabulary flashcard decks. Translations and example
/// sentences for every word are retrieved from Wiktionary or `OpenAI` and
/// written to a file that can be imported into Anki.
///
/// wordcards is powered by wordcards-lib.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct WordcardsOptions {
    /// Words to translate
    #[arg(
        name = "words",
        required_unless_present_any = ["csv", "words_from"],
        long_help = "Words to translate. Words can also be read from a CSV file with `--csv`
or from a text file with `--words-from`. All sources are combined and duplicates
are dropped."
    )]
    raw_words: Vec<String>,

    /// Configuration file to use
    #[arg(short, long = "config")]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

impl WordcardsOptions {
    /// All configured sources of words, in the order they are read
    pub(crate) fn word_sources(&self) -> Vec<WordSource> {
        let mut sources = Vec::new();
        if !self.raw_words.is_empty() {
            sources.push(WordSource::Args(self.raw_words.clone()));
        }
        if let Some(path) = &self.config.csv {
            sources.push(WordSource::Csv {
                path: path.clone(),
                skip_first_row: self.config.skip_first_row,
                column: self.config.column,
            });
        }
        if let Some(path) = &self.config.words_from {
            sources.push(WordSource::Lines(path.clone()));
        }
        sources
    }
}

/// The main configuration for wordcards
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Read words from a column of the given CSV file
    #[arg(long, value_name = "PATH")]
    #[serde(default)]
    pub(crate) csv: Option<PathBuf>,

    /// Treat the first row of the CSV file as header
    #[arg(long)]
    #[serde(default)]
    pub(crate) skip_first_row: bool,

    /// Column of the CSV file holding the words, starting at 0
    #[arg(long, default_value = "0")]
    #[serde(default)]
    pub(crate) column: usize,

    /// Read words from the given file or stdin (if path is '-').
    #[arg(
        long,
        value_name = "PATH",
        long_help = "Read words from the given file or stdin (if path is '-').

Each line holds one word or phrase. Lines starting with '#' are treated as
comments and ignored, as are empty lines.

Examples:

    wordcards --words-from words.txt
    cat words.txt | wordcards --words-from -"
    )]
    #[serde(default)]
    pub(crate) words_from: Option<PathBuf>,

    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,

    /// Do not show progress bar.
    /// This is recommended for non-interactive shells (e.g. for continuous integration)
    #[arg(short, long, verbatim_doc_comment)]
    #[serde(default)]
    pub(crate) no_progress: bool,

    /// Language of the words
    #[arg(long, default_value = "es", value_parser = parse_language)]
    #[serde(default = "language_from")]
    pub(crate) language_from: Language,

    /// Language to translate to
    #[arg(long, default_value = "en", value_parser = parse_language)]
    #[serde(default = "language_to")]
    pub(crate) language_to: Language,

    /// Where translations come from
    #[arg(long, default_value = "wiktionary", value_parser = PossibleValuesParser::new(RetrieverType::VARIANTS).map(|s| s.parse::<RetrieverType>().unwrap()))]
    #[serde(default)]
    pub(crate) retriever: RetrieverType,

    /// Keep fewer definitions and examples per word
    #[arg(long)]
    #[serde(default)]
    pub(crate) concise: bool,

    #[arg(help = HELP_MSG_CONCURRENCY)]
    #[arg(short = 'j', long, default_value = &CONCURRENCY_STR)]
    #[serde(default = "concurrency")]
    pub(crate) concurrency: usize,

    /// Stop after this many translations were collected; 0 means no limit
    #[arg(long, default_value = "0")]
    #[serde(default)]
    pub(crate) record_limit: usize,

    /// Time to wait before checking again whether a rate limit is over
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = DEFAULT_BACKOFF_INTERVAL
    )]
    #[serde(default = "backoff_interval")]
    #[serde(with = "humantime_serde")]
    pub(crate) backoff_interval: Duration,

    /// Request timeout in seconds
    #[arg(short, long, default_value = &TIMEOUT_STR)]
    #[serde(default = "timeout")]
    pub(crate) timeout: usize,

    /// User agent
    #[arg(short, long, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub(crate) user_agent: String,

    /// Use a different endpoint for the retriever, e.g. a mirror or proxy
    #[arg(long)]
    #[serde(default)]
    pub(crate) base_url: Option<Url>,

    /// API key for the `openai` retriever
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    #[serde(default)]
    pub(crate) openai_api_key: Option<SecretString>,

    /// Chat model for the `openai` retriever
    #[arg(long, default_value = DEFAULT_OPENAI_MODEL)]
    #[serde(default = "model")]
    pub(crate) model: String,

    /// Output file of the deck, or '-' for stdout
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    #[serde(default = "output")]
    pub(crate) output: PathBuf,

    /// Output format of the deck
    #[arg(short, long, default_value = "tsv", value_parser = PossibleValuesParser::new(DeckFormat::VARIANTS).map(|s| s.parse::<DeckFormat>().unwrap()))]
    #[serde(default)]
    pub(crate) format: DeckFormat,

    /// Name of the deck Anki imports the cards into
    #[arg(long, default_value = DEFAULT_DECK_NAME)]
    #[serde(default = "deck_name")]
    pub(crate) deck_name: String,

    /// Don't look anything up.
    /// Instead, dump the words that would be translated
    #[arg(long)]
    #[serde(default)]
    pub(crate) dump: bool,

    /// Number of threads to utilize.
    /// Runs on a single thread by default, which is plenty for a handful of requests
    #[arg(short = 'T', long)]
    #[serde(default)]
    pub(crate) threads: Option<NonZeroUsize>,

    /// Set the output display mode. Determines how results are presented in the terminal
    #[arg(long, default_value = "color", value_parser = PossibleValuesParser::new(OutputMode::VARIANTS).map(|s| s.parse::<OutputMode>().unwrap()))]
    #[serde(default)]
    pub(crate) mode: OutputMode,
}

impl Config {
    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        // Read configuration file
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        // If the config file has an API key, but the CLI doesn't, use the key
        // from the config file.
        // This is outside of fold_in! because SecretBox doesn't implement Eq.
        if self.openai_api_key.is_none() && toml.openai_api_key.is_some() {
            self.openai_api_key = toml.openai_api_key;
        }

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..openai_api_key,

                // Keys with defaults to assign
                backoff_interval: backoff_interval(),
                base_url: None,
                column: 0,
                concise: false,
                concurrency: DEFAULT_CONCURRENCY,
                csv: None,
                deck_name: DEFAULT_DECK_NAME,
                dump: false,
                format: DeckFormat::default(),
                language_from: DEFAULT_LANGUAGE_FROM,
                language_to: DEFAULT_LANGUAGE_TO,
                mode: OutputMode::Color,
                model: DEFAULT_OPENAI_MODEL,
                no_progress: false,
                output: PathBuf::from(DEFAULT_OUTPUT),
                record_limit: 0,
                retriever: RetrieverType::default(),
                skip_first_row: false,
                threads: None,
                timeout: DEFAULT_TIMEOUT_SECS,
                user_agent: DEFAULT_USER_AGENT,
                verbose: Verbosity::default(),
                words_from: None,
            }
        }
    }

    /// Validated concurrency limit
    pub(crate) fn concurrency_limit(&self) -> Result<ConcurrencyLimit> {
        ConcurrencyLimit::new(self.concurrency).context("Invalid `--concurrency`")
    }

    /// The record limit, `None` if unlimited
    pub(crate) const fn record_limit(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.record_limit)
    }

    /// Settings for the shared rate limit backoff
    pub(crate) fn backoff(&self) -> BackoffConfig {
        BackoffConfig::from_options(Some(self.backoff_interval))
    }

    /// Settings of the retrieval source
    pub(crate) fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig::builder()
            .kind(self.retriever)
            .from(self.language_from)
            .to(self.language_to)
            .concise(self.concise)
            .api_key(self.openai_api_key.clone())
            .base_url(self.base_url.clone())
            .model(self.model.clone())
            .timeout(Duration::from_secs(self.timeout as u64))
            .user_agent(self.user_agent.clone())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn parse(args: &[&str]) -> WordcardsOptions {
        WordcardsOptions::parse_from(std::iter::once("wordcards").chain(args.iter().copied()))
    }

    #[test]
    fn verify_app() {
        use clap::CommandFactory;
        WordcardsOptions::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let opts = parse(&["hola"]);
        let config = &opts.config;
        assert_eq!(config.language_from, Language::Spanish);
        assert_eq!(config.language_to, Language::English);
        assert_eq!(config.retriever, RetrieverType::Wiktionary);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.record_limit(), None);
        assert_eq!(config.backoff_interval, Duration::from_secs(30));
        assert_eq!(config.output, PathBuf::from("deck.tsv"));
        assert_eq!(config.format, DeckFormat::Tsv);
    }

    #[test]
    fn test_languages_accept_names_and_codes() {
        let opts = parse(&["--language-from", "German", "--language-to", "es", "Hund"]);
        assert_eq!(opts.config.language_from, Language::German);
        assert_eq!(opts.config.language_to, Language::Spanish);
    }

    #[test]
    fn test_word_sources_in_order() {
        let opts = parse(&[
            "--csv",
            "words.csv",
            "--column",
            "2",
            "--words-from",
            "-",
            "hola",
        ]);
        assert_eq!(
            opts.word_sources(),
            vec![
                WordSource::Args(vec!["hola".into()]),
                WordSource::Csv {
                    path: "words.csv".into(),
                    skip_first_row: false,
                    column: 2,
                },
                WordSource::Lines("-".into()),
            ]
        );
    }

    #[test]
    fn test_words_are_required() {
        assert!(WordcardsOptions::try_parse_from(["wordcards"]).is_err());
        assert!(WordcardsOptions::try_parse_from(["wordcards", "--words-from", "-"]).is_ok());
    }

    #[test]
    fn test_concurrency_is_validated() {
        assert_eq!(parse(&["-j", "5", "a"]).config.concurrency_limit().unwrap().get(), 5);
        assert!(parse(&["-j", "6", "a"]).config.concurrency_limit().is_err());
        assert!(parse(&["-j", "0", "a"]).config.concurrency_limit().is_err());
    }

    #[test]
    fn test_merge_keeps_cli_values() {
        let toml: Config = toml::from_str(
            r#"
            concurrency = 3
            language_from = "fr"
            deck_name = "Französisch"
            backoff_interval = "1m"
            "#,
        )
        .unwrap();

        let mut cli = parse(&["--concurrency", "2", "mot"]).config;
        cli.merge(toml);

        // Set on the command line
        assert_eq!(cli.concurrency, 2);
        // Taken from the file
        assert_eq!(cli.language_from, Language::French);
        assert_eq!(cli.deck_name, "Französisch");
        assert_eq!(cli.backoff_interval, Duration::from_secs(60));
        // Defaults everywhere
        assert_eq!(cli.language_to, Language::English);
    }

    #[test]
    fn test_merge_api_key() {
        let toml: Config = toml::from_str(r#"openai_api_key = "sk-from-file""#).unwrap();
        let mut cli = parse(&["mot"]).config;
        cli.openai_api_key = None;
        cli.merge(toml);
        assert_eq!(
            cli.openai_api_key.unwrap().expose_secret(),
            "sk-from-file"
        );
    }

    #[test]
    fn test_example_config_is_valid() {
        let config =
            Config::load_from_file(&test_utils::root_path!().join("wordcards.example.toml"))
                .unwrap();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.backoff_interval, Duration::from_secs(30));
        assert_eq!(config.retriever, RetrieverType::Wiktionary);
        assert_eq!(config.format, DeckFormat::Tsv);
        assert!(!config.verbose.is_detailed());
    }

    #[test]
    fn test_threads_must_not_be_zero() {
        let args = ["wordcards", "--threads", "0", "hola"];
        assert!(WordcardsOptions::try_parse_from(args).is_err());
        assert!(toml::from_str::<Config>("threads = 0").is_err());

        let opts = parse(&["--threads", "2", "hola"]);
        assert_eq!(opts.config.threads, NonZeroUsize::new(2));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("max_concurrency = 3").is_err());
    }

    #[test]
    fn test_retriever_config() {
        let config = parse(&[
            "--retriever",
            "openai",
            "--concise",
            "--timeout",
            "5",
            "--base-url",
            "http://localhost:1234/",
            "palabra",
        ])
        .config
        .retriever_config();
        assert_eq!(config.kind, RetrieverType::OpenAi);
        assert!(config.concise);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.base_url.unwrap().as_str(), "http://localhost:1234/");
    }
}
