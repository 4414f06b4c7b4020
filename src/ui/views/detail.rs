//! Ticket detail pane.
//!
//! Shows either a ticket (looked up in the store on every render) or a
//! message such as the result of the last search.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::store::{Ticket, TicketKey};
use crate::ui::theme::theme;

/// What the pane currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetailContent {
    #[default]
    Empty,
    /// Outcome of a key search.
    SearchSummary { found: usize, skipped: usize },
    /// A ticket from the store.
    Ticket(TicketKey),
}

/// The ticket detail pane.
#[derive(Debug, Default)]
pub struct DetailView {
    content: DetailContent,
    /// Details are being fetched for the shown ticket.
    loading: bool,
    scroll: u16,
}

impl DetailView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &DetailContent {
        &self.content
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Show `key`, optionally waiting for its details.
    pub fn show_ticket(&mut self, key: TicketKey, loading: bool) {
        self.content = DetailContent::Ticket(key);
        self.loading = loading;
        self.scroll = 0;
    }

    /// Show the outcome of a search.
    pub fn show_search_summary(&mut self, found: usize, skipped: usize) {
        self.content = DetailContent::SearchSummary { found, skipped };
        self.loading = false;
        self.scroll = 0;
    }

    /// Details for `key` arrived (or failed).
    pub fn details_finished(&mut self, key: &TicketKey) {
        if self.shows(key) {
            self.loading = false;
        }
    }

    /// Whether the pane shows `key`.
    pub fn shows(&self, key: &TicketKey) -> bool {
        matches!(&self.content, DetailContent::Ticket(k) if k == key)
    }

    /// Scroll with PageUp/PageDown; returns true if the key was used.
    pub fn handle_scroll(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(5);
                true
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(5);
                true
            }
            _ => false,
        }
    }

    /// Build the text of the pane. `ticket` is the store entry for the
    /// shown key, if it is still present.
    pub fn lines(&self, ticket: Option<&Ticket>) -> Vec<Line<'static>> {
        let t = theme();
        match (&self.content, ticket) {
            (DetailContent::SearchSummary { found, skipped }, _) => {
                let mut lines = vec![Line::raw(format!("Found {} ticket(s).", found))];
                if *skipped > 0 {
                    lines.push(Line::raw(""));
                    lines.push(Line::styled(
                        format!(
                            "Skipped {} key(s) that do not exist or are not accessible.",
                            skipped
                        ),
                        Style::default().fg(t.warning),
                    ));
                }
                lines
            }
            (DetailContent::Ticket(_), Some(ticket)) => {
                let pending = |text: String| {
                    if self.loading {
                        "Loading...".to_string()
                    } else {
                        text
                    }
                };
                let description = if ticket.has_details() {
                    ticket.description_text().to_string()
                } else {
                    pending(ticket.description_text().to_string())
                };
                let conversation = if ticket.has_details() {
                    ticket.conversation_text()
                } else {
                    pending(ticket.conversation_text())
                };

                let mut lines = Vec::new();
                section(&mut lines, "Ticket", &ticket.label());
                section(&mut lines, "Title", &ticket.title);
                section(&mut lines, "Description", &description);
                section(&mut lines, "Full Comment Conversation", &conversation);
                lines
            }
            _ => vec![Line::styled(
                "Select a ticket and press Enter to see its details.",
                Style::default().fg(t.dim),
            )],
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, ticket: Option<&Ticket>, focused: bool) {
        let block = Block::default()
            .title(" Details ")
            .borders(Borders::ALL)
            .border_style(theme().border_style(focused));

        let paragraph = Paragraph::new(self.lines(ticket))
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0));
        frame.render_widget(paragraph, area);
    }
}

/// Append a bold header followed by its body.
fn section(lines: &mut Vec<Line<'static>>, header: &str, body: &str) {
    if !lines.is_empty() {
        lines.push(Line::raw(""));
    }
    lines.push(Line::styled(format!("{}:", header), theme().header()));
    lines.extend(body.lines().map(|l| Line::raw(l.to_string())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CommentRecord;

    fn key(s: &str) -> TicketKey {
        TicketKey::parse(s).unwrap()
    }

    fn text(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_empty_pane_hint() {
        let view = DetailView::new();
        assert!(text(&view.lines(None)).contains("press Enter"));
    }

    #[test]
    fn test_search_summary() {
        let mut view = DetailView::new();
        view.show_search_summary(3, 0);
        assert_eq!(text(&view.lines(None)), "Found 3 ticket(s).");

        view.show_search_summary(1, 2);
        let shown = text(&view.lines(None));
        assert!(shown.starts_with("Found 1 ticket(s)."));
        assert!(shown.contains("Skipped 2 key(s)"));
    }

    #[test]
    fn test_ticket_sections() {
        let mut ticket = Ticket::new(key("AAA-1"), "Broken build", "");
        ticket.conversation = Some(vec![CommentRecord {
            author: "Ann".to_string(),
            created: "2024-03-01T10:00:00.000+0000".to_string(),
            body: "On it".to_string(),
        }]);

        let mut view = DetailView::new();
        view.show_ticket(key("AAA-1"), false);
        let shown = text(&view.lines(Some(&ticket)));

        assert!(shown.contains("Ticket:\nAAA-1"));
        assert!(shown.contains("Title:\nBroken build"));
        assert!(shown.contains("Description:\nNo Description"));
        assert!(shown.contains("Full Comment Conversation:\n2024-03-01 - Ann commented:\nOn it"));
    }

    #[test]
    fn test_loading_placeholder_until_details() {
        let ticket = Ticket::new(key("AAA-1"), "Title", "From the list");
        let mut view = DetailView::new();
        view.show_ticket(key("AAA-1"), true);
        assert!(view.is_loading());
        assert!(text(&view.lines(Some(&ticket))).contains("Description:\nLoading..."));

        view.details_finished(&key("AAA-1"));
        assert!(!view.is_loading());
        let shown = text(&view.lines(Some(&ticket)));
        assert!(shown.contains("Description:\nFrom the list"));
        assert!(shown.contains("Full Comment Conversation:\nNo Comments"));
    }

    #[test]
    fn test_details_for_other_ticket_ignored() {
        let mut view = DetailView::new();
        view.show_ticket(key("AAA-1"), true);
        view.details_finished(&key("AAA-2"));
        assert!(view.is_loading());
    }

    #[test]
    fn test_evicted_ticket_falls_back_to_hint() {
        let mut view = DetailView::new();
        view.show_ticket(key("AAA-1"), false);
        assert!(text(&view.lines(None)).contains("press Enter"));
    }
}
