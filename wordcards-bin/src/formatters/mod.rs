pub(crate) mod color;
pub(crate) mod log;
pub(crate) mod stats;

use supports_color::Stream;

/// Detects whether a terminal supports color, and gives details about that
/// support. It takes into account the `NO_COLOR` environment variable.
pub(crate) fn supports_color() -> bool {
    supports_color::on(Stream::Stdout).is_some()
}
