//! Rendering styles, handed to the view and console at startup

use ratatui::style::{Color, Modifier, Style};

/// Colors used by the interactive view and the direct-mode console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub title: Color,
    pub title_background: Color,
    pub subtitle: Color,
    pub info: Color,
    pub error: Color,
    pub success: Color,
    pub prompt: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Color::Rgb(0x00, 0xff, 0x00),
            title_background: Color::Rgb(0x1a, 0x1a, 0x1a),
            subtitle: Color::Rgb(0x88, 0x88, 0x88),
            info: Color::Rgb(0x00, 0xbf, 0xff),
            error: Color::Rgb(0xff, 0x00, 0x00),
            success: Color::Rgb(0x00, 0xff, 0x00),
            prompt: Color::Rgb(0xff, 0xff, 0x00),
        }
    }
}

impl Theme {
    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.title)
            .bg(self.title_background)
            .add_modifier(Modifier::BOLD)
    }

    pub fn subtitle_style(&self) -> Style {
        Style::default().fg(self.subtitle)
    }

    pub fn info_style(&self) -> Style {
        Style::default().fg(self.info)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success).add_modifier(Modifier::BOLD)
    }

    pub fn prompt_style(&self) -> Style {
        Style::default().fg(self.prompt)
    }
}
