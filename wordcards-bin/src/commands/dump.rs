use std::io::{self, Write};

use pad::PadStr;
use wordcards_lib::WordList;

use crate::ExitCode;

/// Dump all words to stdout without looking them up.
/// With `detailed`, the form used for the lookup is shown next to each word.
pub(crate) fn dump(words: &WordList, detailed: bool) -> ExitCode {
    let width = words.iter().map(|w| w.as_str().chars().count()).max().unwrap_or(0);

    for word in words.iter() {
        let out = if detailed {
            format!("{} {}", word.as_str().pad_to_width(width), word.normalized())
        } else {
            word.to_string()
        };

        // Avoid panic on broken pipe.
        // See https://github.com/rust-lang/rust/issues/46016
        // This can occur when piping the output of wordcards
        // to another program like `head`.
        if let Err(e) = writeln!(io::stdout(), "{out}") {
            if e.kind() != io::ErrorKind::BrokenPipe {
                eprintln!("{e}");
                return ExitCode::UnexpectedFailure;
            }
            break;
        }
    }

    ExitCode::Success
}
