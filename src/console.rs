//! Status lines for direct mode
//!
//! Stdout carries relay payload, so everything here goes to stderr.

use std::fmt::Display;
use std::io::{self, Write};

use crossterm::style::{self, Stylize};
use ratatui::style::Color;

use crate::relay::{RelayOutcome, Termination};
use crate::theme::Theme;

/// Styled status printer
#[derive(Debug, Clone)]
pub struct Console {
    theme: Theme,
}

impl Console {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    /// `→ message`
    pub fn info(&self, message: impl Display) {
        self.line("→", self.theme.info, message);
    }

    /// `✓ message`
    pub fn success(&self, message: impl Display) {
        self.line("✓", self.theme.success, message);
    }

    /// `✗ Error: message`
    pub fn error(&self, message: impl Display) {
        self.line("✗", self.theme.error, format!("Error: {}", message));
    }

    /// Report how a relay ended
    pub fn outcome(&self, outcome: &RelayOutcome) {
        match &outcome.termination {
            Termination::Eof(direction) => {
                self.info(format!("Connection closed ({} stream ended)", direction))
            }
            Termination::Failed(e) => self.error(e),
            Termination::Interrupted => self.info("Interrupted, connection closed"),
        }
    }

    fn line(&self, marker: &str, color: Color, message: impl Display) {
        let marker = marker.with(term_color(color)).bold();
        // A closed stderr is not worth failing over
        let _ = writeln!(io::stderr(), "{} {}", marker, message);
    }
}

/// Map a theme color onto crossterm's palette
fn term_color(color: Color) -> style::Color {
    match color {
        Color::Rgb(r, g, b) => style::Color::Rgb { r, g, b },
        Color::Black => style::Color::Black,
        Color::Red => style::Color::DarkRed,
        Color::Green => style::Color::DarkGreen,
        Color::Yellow => style::Color::DarkYellow,
        Color::Blue => style::Color::DarkBlue,
        Color::Magenta => style::Color::DarkMagenta,
        Color::Cyan => style::Color::DarkCyan,
        Color::Gray => style::Color::Grey,
        Color::DarkGray => style::Color::DarkGrey,
        Color::LightRed => style::Color::Red,
        Color::LightGreen => style::Color::Green,
        Color::LightYellow => style::Color::Yellow,
        Color::LightBlue => style::Color::Blue,
        Color::LightMagenta => style::Color::Magenta,
        Color::LightCyan => style::Color::Cyan,
        Color::White => style::Color::White,
        Color::Indexed(i) => style::Color::AnsiValue(i),
        Color::Reset => style::Color::Reset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_color() {
        assert_eq!(
            term_color(Color::Rgb(0, 0xbf, 0xff)),
            style::Color::Rgb { r: 0, g: 0xbf, b: 0xff }
        );
        assert_eq!(term_color(Color::Reset), style::Color::Reset);
        assert_eq!(term_color(Color::Indexed(42)), style::Color::AnsiValue(42));
    }
}
