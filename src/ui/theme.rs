//! Theme and styling configuration.
//!
//! The theme is process-wide and built on first use.

use once_cell::sync::OnceCell;
use ratatui::style::{Color, Modifier, Style};

static THEME: OnceCell<Theme> = OnceCell::new();

/// Color palette for the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub fg: Color,
    pub accent: Color,
    pub dim: Color,
    pub muted: Color,
    pub border: Color,
    pub border_focused: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    /// Color of marked (multi-selected) tickets.
    pub marked: Color,
    /// Color of locked tickets.
    pub locked: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Theme {
    /// The default palette for dark terminals.
    pub fn dark() -> Self {
        Self {
            fg: Color::White,
            accent: Color::Cyan,
            dim: Color::DarkGray,
            muted: Color::Gray,
            border: Color::DarkGray,
            border_focused: Color::Yellow,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            marked: Color::LightBlue,
            locked: Color::LightMagenta,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }

    /// Style for a section header in the detail pane.
    pub fn header(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    /// Border style depending on focus.
    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.border_focused)
        } else {
            Style::default().fg(self.border)
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// The active theme.
pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::dark)
}
