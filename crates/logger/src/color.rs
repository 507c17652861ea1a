//! Human-oriented colored output

use crate::event::{LogEvent, FUNC_KEY, SRC_KEY};
use crate::formatter::{level_color, Formatter};

use std::io::Write;

use termcolor::{Buffer, Color, ColorSpec, WriteColor};

/// Colored, tab-separated output meant for terminals.
///
/// ```text
/// Jan  2 03:04:05.000 [info] user created	id: 7	func: handlers::create	src: src/handlers.rs:42
/// ```
///
/// User fields come first in key order; `func` and `src` always come last.
#[derive(Debug, Clone)]
pub struct ColorFormatter {
    colors: bool,
}

impl ColorFormatter {
    /// ANSI-colored output.
    pub fn new() -> Self {
        Self { colors: true }
    }

    /// Same layout without escape sequences.
    pub fn plain() -> Self {
        Self { colors: false }
    }
}

impl Default for ColorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for ColorFormatter {
    fn format(&self, event: &LogEvent) -> Vec<u8> {
        let mut buffer = if self.colors {
            Buffer::ansi()
        } else {
            Buffer::no_color()
        };

        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
        let _ = write!(buffer, "{}", event.timestamp().format("%b %e %H:%M:%S%.3f"));
        let _ = buffer.reset();

        let _ = write!(buffer, " [");
        let _ = buffer.set_color(&level_color(event.level()));
        let _ = write!(buffer, "{}", event.level());
        let _ = buffer.reset();
        let _ = write!(buffer, "] {}", event.message());

        for (key, value) in event.user_fields() {
            let _ = write!(buffer, "\t");
            let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_intense(true));
            let _ = write!(buffer, "{key}");
            let _ = buffer.reset();
            let _ = write!(buffer, ": {value}");
        }

        for key in [FUNC_KEY, SRC_KEY] {
            if let Some(value) = event.field(key) {
                let _ = write!(buffer, "\t");
                let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
                let _ = write!(buffer, "{key}");
                let _ = buffer.reset();
                let _ = write!(buffer, ": {value}");
            }
        }

        let _ = writeln!(buffer);
        buffer.into_inner()
    }
}
