//! Connection form: JIRA URL, user, API token and the save-token checkbox.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::config::{Config, Credentials};
use crate::ui::components::TextInput;
use crate::ui::theme::theme;

/// A focusable field of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionField {
    Url,
    User,
    Token,
    SaveToken,
}

/// Actions the form asks the app to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Connect and get the latest tickets.
    Submit,
}

/// The connection form.
#[derive(Debug)]
pub struct ConnectionForm {
    url: TextInput,
    user: TextInput,
    token: TextInput,
    save_token: bool,
}

impl ConnectionForm {
    /// Prefill the form from a loaded configuration.
    ///
    /// "Save API Token" starts checked only if a token was loaded.
    pub fn from_config(config: &Config) -> Self {
        let mut token = TextInput::masked();
        if let Some(saved) = &config.api_token {
            token.set_value(saved.clone());
        }
        Self {
            url: TextInput::with_value(config.jira_url.clone())
                .with_placeholder("https://company.atlassian.net"),
            user: TextInput::with_value(config.user.clone()).with_placeholder("you@company.com"),
            token,
            save_token: config.has_token(),
        }
    }

    /// Whether every field needed to connect has a value.
    pub fn is_complete(&self) -> bool {
        !self.url.value().trim().is_empty()
            && !self.user.value().trim().is_empty()
            && !self.token.is_empty()
    }

    /// Current credentials (not validated).
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.url.value(), self.user.value(), self.token.value())
    }

    /// The configuration to persist on exit.
    pub fn to_config(&self) -> Config {
        Config::from_form(
            self.url.value(),
            self.user.value(),
            self.token.value(),
            self.save_token,
        )
    }

    fn input_mut(&mut self, field: ConnectionField) -> Option<&mut TextInput> {
        match field {
            ConnectionField::Url => Some(&mut self.url),
            ConnectionField::User => Some(&mut self.user),
            ConnectionField::Token => Some(&mut self.token),
            ConnectionField::SaveToken => None,
        }
    }

    /// Handle a key press in `field`.
    pub fn handle_input(&mut self, field: ConnectionField, key: KeyEvent) -> Option<ConnectionAction> {
        if key.code == KeyCode::Enter {
            return Some(ConnectionAction::Submit);
        }
        match self.input_mut(field) {
            Some(input) => {
                input.handle_input(key);
            }
            None => {
                if matches!(key.code, KeyCode::Char(' ') | KeyCode::Char('x')) {
                    self.save_token = !self.save_token;
                }
            }
        }
        None
    }

    /// Insert pasted text into `field`.
    pub fn paste(&mut self, field: ConnectionField, text: &str) {
        if let Some(input) = self.input_mut(field) {
            input.insert_str(text.trim());
        }
    }

    /// Render the form on one row. `focus` is the focused field, if any.
    pub fn render(&self, frame: &mut Frame, area: Rect, focus: Option<ConnectionField>) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(35),
                Constraint::Percentage(25),
                Constraint::Percentage(22),
                Constraint::Min(20),
            ])
            .split(area);

        self.url
            .render_with_label(frame, chunks[0], "Jira URL", focus == Some(ConnectionField::Url));
        self.user
            .render_with_label(frame, chunks[1], "User", focus == Some(ConnectionField::User));
        self.token.render_with_label(
            frame,
            chunks[2],
            "API Token",
            focus == Some(ConnectionField::Token),
        );

        let t = theme();
        let focused = focus == Some(ConnectionField::SaveToken);
        let checkbox = if self.save_token { "[x]" } else { "[ ]" };
        let label_style = if focused {
            Style::default()
                .fg(t.border_focused)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(t.fg)
        };
        let line = Line::from(vec![
            Span::styled(checkbox, Style::default().fg(t.accent)),
            Span::styled(" Save API Token", label_style),
        ]);
        let paragraph = Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(t.border_style(focused)),
        );
        frame.render_widget(paragraph, chunks[3]);
    }
}
