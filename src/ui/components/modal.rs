//! Modal dialogs.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::error::AppError;

/// Center a `width` x `height` rectangle inside `area`.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// Dialog for errors that need acknowledgment.
#[derive(Debug, Default)]
pub struct ErrorDialog {
    title: String,
    message: String,
    hint: Option<String>,
    visible: bool,
}

impl ErrorDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show an application error with its suggested action.
    pub fn show(&mut self, error: &AppError) {
        let title = match error {
            AppError::Config(_) => "Configuration Error",
            AppError::Api(_) => "Connection Error",
            _ => "Error",
        };
        self.title = title.to_string();
        self.message = error.user_message();
        self.hint = error.suggested_action().map(str::to_string);
        self.visible = true;
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if !self.visible {
            return;
        }

        let dialog = centered_rect(60, 9, area);
        frame.render_widget(Clear, dialog);

        let mut lines = vec![Line::raw(""), Line::raw(self.message.clone())];
        if let Some(hint) = &self.hint {
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                hint.clone(),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::raw(""));
        lines.push(Line::from(vec![
            Span::styled("[Enter]", Style::default().fg(Color::Cyan)),
            Span::styled(" dismiss", Style::default().fg(Color::DarkGray)),
        ]));

        let block = Block::default()
            .title(Span::styled(
                format!(" {} ", self.title),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));

        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, dialog);
    }
}
