//! Help panel view displaying keyboard shortcuts.
//!
//! A scrollable overlay listing the bindings of every context. Opened with
//! '?' and closed with '?', 'q', or Escape.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

use crate::events::{bindings, KeyContext};
use crate::ui::components::centered_rect;
use crate::ui::theme::theme;

/// Sections shown in the help panel, in order.
const SECTIONS: &[(KeyContext, &str)] = &[
    (KeyContext::TicketList, "Ticket list"),
    (KeyContext::Search, "Search field"),
    (KeyContext::Connection, "Connection fields"),
];

/// Actions that can be returned from the help view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelpAction {
    /// Close the help panel.
    Close,
}

/// The help panel view.
#[derive(Debug, Default)]
pub struct HelpView {
    scroll: usize,
    /// Visible height, updated on render.
    visible_height: usize,
}

impl HelpView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset_scroll(&mut self) {
        self.scroll = 0;
    }

    fn total_lines() -> usize {
        // Header and blank line per section, one line per binding, a blank
        // line after each section, then the footer.
        SECTIONS
            .iter()
            .map(|(context, _)| bindings(*context).len() + 3)
            .sum::<usize>()
            + 1
    }

    fn max_scroll(&self) -> usize {
        Self::total_lines().saturating_sub(self.visible_height)
    }

    /// Handle keyboard input for the help view.
    pub fn handle_input(&mut self, key_event: KeyEvent) -> Option<HelpAction> {
        match (key_event.code, key_event.modifiers) {
            (KeyCode::Char('?'), _) | (KeyCode::Char('q'), KeyModifiers::NONE) | (KeyCode::Esc, _) => {
                Some(HelpAction::Close)
            }
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => {
                self.scroll = (self.scroll + 1).min(self.max_scroll());
                None
            }
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => {
                self.scroll = self.scroll.saturating_sub(1);
                None
            }
            // Consume all other input while help is open
            _ => None,
        }
    }

    /// Render the help panel as a centered overlay.
    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let panel = centered_rect(70, area.height.saturating_sub(4).max(10), area);
        frame.render_widget(Clear, panel);

        let block = Block::default()
            .title(" Help - Keyboard Shortcuts ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.accent));
        let inner = block.inner(panel);
        frame.render_widget(block, panel);

        self.visible_height = inner.height as usize;
        self.scroll = self.scroll.min(self.max_scroll());

        let paragraph = Paragraph::new(build_content_lines()).scroll((self.scroll as u16, 0));
        frame.render_widget(paragraph, inner);

        if Self::total_lines() > self.visible_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut state = ScrollbarState::new(self.max_scroll()).position(self.scroll);
            frame.render_stateful_widget(scrollbar, inner, &mut state);
        }
    }
}

fn build_content_lines() -> Vec<Line<'static>> {
    let t = theme();
    let mut lines = Vec::with_capacity(HelpView::total_lines());

    for (context, title) in SECTIONS {
        lines.push(Line::from(Span::styled(
            format!("── {} ──", title),
            Style::default().fg(t.warning).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::raw(""));
        for binding in bindings(*context) {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{:>16}", binding.keys),
                    Style::default().fg(t.success).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::raw(binding.description),
            ]));
        }
        lines.push(Line::raw(""));
    }

    lines.push(Line::styled(
        "Marked tickets are the selection; with none marked, the highlighted one is.",
        Style::default().fg(t.dim),
    ));
    lines
}
