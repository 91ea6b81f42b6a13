use std::fmt::Display;
use std::path::{Path, PathBuf};

use log::debug;
use tokio::io::{AsyncReadExt, stdin};

use crate::{ErrorKind, Result, WordList};

const STDIN: &str = "-";

/// Line prefix of comments in word list files
const COMMENT: char = '#';

/// Where the words to translate come from
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WordSource {
    /// Words given directly, e.g. on the command line
    Args(Vec<String>),
    /// One column of a CSV file
    Csv {
        /// The CSV file
        path: PathBuf,
        /// Treat the first row as header and ignore it
        skip_first_row: bool,
        /// 0-based index of the column holding the words
        column: usize,
    },
    /// A text file with one word per line, or stdin for `-`.
    /// Blank lines and lines starting with `#` are ignored.
    Lines(PathBuf),
}

impl Display for WordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Args(words) => write!(f, "{} arguments", words.len()),
            Self::Csv { path, column, .. } => write!(f, "column {column} of {}", path.display()),
            Self::Lines(path) if path == Path::new(STDIN) => f.write_str("stdin"),
            Self::Lines(path) => write!(f, "{}", path.display()),
        }
    }
}

impl WordSource {
    /// Read all words of this source
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read, or a CSV row lacks the
    /// requested column.
    pub async fn words(&self) -> Result<WordList> {
        let words = match self {
            Self::Args(words) => words.iter().collect(),
            Self::Csv {
                path,
                skip_first_row,
                column,
            } => csv_words(path, *skip_first_row, *column)?,
            Self::Lines(path) if path == Path::new(STDIN) => {
                let mut content = String::new();
                stdin().read_to_string(&mut content).await?;
                line_words(&content)
            }
            Self::Lines(path) => {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| (path.clone(), e))?;
                line_words(&content)
            }
        };
        debug!("Read {} words from {self}", words.len());
        Ok(words)
    }

    /// Read the words of all `sources` in order into a single list
    ///
    /// # Errors
    ///
    /// Fails on the first source that cannot be read.
    pub async fn collect_all(sources: &[WordSource]) -> Result<WordList> {
        let mut words = WordList::new();
        for source in sources {
            words.extend(source.words().await?);
        }
        Ok(words)
    }
}

fn csv_words(path: &Path, skip_first_row: bool, column: usize) -> Result<WordList> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(skip_first_row)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ErrorKind::Csv(path.to_path_buf(), e))?;

    let mut words = WordList::new();
    for record in reader.records() {
        let record = record.map_err(|e| ErrorKind::Csv(path.to_path_buf(), e))?;
        let Some(word) = record.get(column) else {
            return Err(ErrorKind::MissingColumn {
                path: path.to_path_buf(),
                line: record.position().map_or(0, csv::Position::line),
                column,
            });
        };
        words.push(word);
    }
    Ok(words)
}

fn line_words(content: &str) -> WordList {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with(COMMENT))
        .collect()
}
