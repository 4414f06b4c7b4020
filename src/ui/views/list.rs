//! Ticket list view.
//!
//! Shows the store's tickets in display order. The view owns only the
//! highlight and the set of marked tickets; the tickets themselves are
//! passed in on every call so the view never holds stale copies.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::store::{Ticket, TicketKey};
use crate::ui::theme::theme;

/// Actions the list asks the app to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListAction {
    /// Show the details of the highlighted ticket.
    ShowDetails(TicketKey),
    /// Get the next page of latest tickets.
    FetchNext,
    /// Move focus to the search field.
    FocusSearch,
    /// Open the selection in the browser.
    Open,
    /// Toggle the lock of the selection.
    ToggleLock,
    /// Export the selection.
    Export,
    /// Show the help overlay.
    Help,
    /// Quit the application.
    Quit,
}

/// Highlight and marks over the ticket list.
#[derive(Debug, Default)]
pub struct ListView {
    /// Highlighted row.
    selected: usize,
    /// Key of the highlighted row, used to follow it across re-sorts.
    selected_key: Option<TicketKey>,
    /// Marked keys, in the order they were marked.
    marked: Vec<TicketKey>,
}

impl ListView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the highlighted ticket.
    pub fn highlighted<'a>(&self, entries: &'a [Ticket]) -> Option<&'a TicketKey> {
        entries.get(self.selected).map(|t| &t.key)
    }

    pub fn is_marked(&self, key: &TicketKey) -> bool {
        self.marked.contains(key)
    }

    /// The tickets an action applies to.
    ///
    /// Marked tickets in mark order, or the highlighted ticket if none is
    /// marked.
    pub fn selection(&self, entries: &[Ticket]) -> Vec<TicketKey> {
        let marked: Vec<TicketKey> = self
            .marked
            .iter()
            .filter(|k| entries.iter().any(|t| &t.key == *k))
            .cloned()
            .collect();
        if !marked.is_empty() {
            return marked;
        }
        self.highlighted(entries).cloned().into_iter().collect()
    }

    /// Reconcile with the ticket list after it changed.
    ///
    /// Drops marks of evicted tickets and keeps the highlight on the same
    /// ticket when it is still present.
    pub fn sync(&mut self, entries: &[Ticket]) {
        self.marked
            .retain(|k| entries.iter().any(|t| &t.key == k));

        let followed = self
            .selected_key
            .as_ref()
            .and_then(|key| entries.iter().position(|t| &t.key == key));
        self.selected = match followed {
            Some(index) => index,
            None => self.selected.min(entries.len().saturating_sub(1)),
        };
        self.selected_key = self.highlighted(entries).cloned();
    }

    fn select(&mut self, index: usize, entries: &[Ticket]) {
        self.selected = index;
        self.selected_key = self.highlighted(entries).cloned();
    }

    fn toggle_mark(&mut self, entries: &[Ticket]) {
        let Some(key) = self.highlighted(entries).cloned() else {
            return;
        };
        match self.marked.iter().position(|k| k == &key) {
            Some(pos) => {
                self.marked.remove(pos);
            }
            None => self.marked.push(key),
        }
    }

    /// Handle a key press while the list has focus.
    pub fn handle_input(&mut self, key: KeyEvent, entries: &[Ticket]) -> Option<ListAction> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return None;
        }
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < entries.len() {
                    self.select(self.selected + 1, entries);
                }
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.select(self.selected.saturating_sub(1), entries);
                None
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.select(0, entries);
                None
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.select(entries.len().saturating_sub(1), entries);
                None
            }
            KeyCode::Char(' ') => {
                self.toggle_mark(entries);
                None
            }
            KeyCode::Enter => self.highlighted(entries).cloned().map(ListAction::ShowDetails),
            KeyCode::Char('n') => Some(ListAction::FetchNext),
            KeyCode::Char('/') => Some(ListAction::FocusSearch),
            KeyCode::Char('o') => Some(ListAction::Open),
            KeyCode::Char('l') => Some(ListAction::ToggleLock),
            KeyCode::Char('e') => Some(ListAction::Export),
            KeyCode::Char('?') => Some(ListAction::Help),
            KeyCode::Char('q') => Some(ListAction::Quit),
            _ => None,
        }
    }

    /// Render the list.
    pub fn render(&self, frame: &mut Frame, area: Rect, entries: &[Ticket], focused: bool) {
        let t = theme();
        let locked = entries.iter().filter(|e| e.is_locked()).count();
        let title = if locked > 0 {
            format!(" Tickets ({}, {} locked) ", entries.len(), locked)
        } else {
            format!(" Tickets ({}) ", entries.len())
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(t.border_style(focused));

        if entries.is_empty() {
            let hint = Paragraph::new(Line::styled(
                "No tickets. Press n to get the latest 10.",
                Style::default().fg(t.dim),
            ))
            .block(block);
            frame.render_widget(hint, area);
            return;
        }

        let items: Vec<ListItem> = entries.iter().map(|e| self.row(e)).collect();
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(t.selection_bg)
                .fg(t.selection_fg)
                .add_modifier(Modifier::BOLD),
        );

        let mut state = ListState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn row(&self, ticket: &Ticket) -> ListItem<'static> {
        let t = theme();
        let marked = self.is_marked(&ticket.key);
        let mark = if marked { "● " } else { "  " };
        let key_style = if ticket.is_locked() {
            Style::default().fg(t.locked).add_modifier(Modifier::BOLD)
        } else if marked {
            Style::default().fg(t.marked)
        } else {
            Style::default().fg(t.fg)
        };

        ListItem::new(Line::from(vec![
            Span::styled(mark, Style::default().fg(t.marked)),
            Span::styled(format!("{:<12}", ticket.label()), key_style),
            Span::styled(ticket.title.clone(), Style::default().fg(t.muted)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> TicketKey {
        TicketKey::parse(s).unwrap()
    }

    fn tickets(keys: &[&str]) -> Vec<Ticket> {
        keys.iter()
            .map(|k| Ticket::new(key(k), format!("Title {}", k), ""))
            .collect()
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_navigation_is_bounded() {
        let entries = tickets(&["AAA-3", "AAA-2", "AAA-1"]);
        let mut view = ListView::new();
        view.sync(&entries);

        view.handle_input(press(KeyCode::Char('k')), &entries);
        assert_eq!(view.selected, 0);

        for _ in 0..5 {
            view.handle_input(press(KeyCode::Char('j')), &entries);
        }
        assert_eq!(view.selected, 2);
        assert_eq!(view.highlighted(&entries), Some(&key("AAA-1")));
    }

    #[test]
    fn test_selection_defaults_to_highlight() {
        let entries = tickets(&["AAA-3", "AAA-2"]);
        let mut view = ListView::new();
        view.sync(&entries);
        view.handle_input(press(KeyCode::Down), &entries);
        assert_eq!(view.selection(&entries), vec![key("AAA-2")]);
    }

    #[test]
    fn test_selection_uses_marks_in_mark_order() {
        let entries = tickets(&["AAA-3", "AAA-2", "AAA-1"]);
        let mut view = ListView::new();
        view.sync(&entries);

        view.handle_input(press(KeyCode::End), &entries);
        view.handle_input(press(KeyCode::Char(' ')), &entries);
        view.handle_input(press(KeyCode::Home), &entries);
        view.handle_input(press(KeyCode::Char(' ')), &entries);

        assert_eq!(view.selection(&entries), vec![key("AAA-1"), key("AAA-3")]);

        // Unmark
        view.handle_input(press(KeyCode::Char(' ')), &entries);
        assert_eq!(view.selection(&entries), vec![key("AAA-1")]);
    }

    #[test]
    fn test_empty_list_has_no_selection() {
        let mut view = ListView::new();
        view.sync(&[]);
        assert!(view.selection(&[]).is_empty());
        assert_eq!(view.handle_input(press(KeyCode::Enter), &[]), None);
    }

    #[test]
    fn test_sync_follows_highlighted_ticket() {
        let entries = tickets(&["AAA-3", "AAA-2", "AAA-1"]);
        let mut view = ListView::new();
        view.sync(&entries);
        view.handle_input(press(KeyCode::Down), &entries);

        let reordered = tickets(&["AAA-9", "AAA-8", "AAA-2"]);
        view.sync(&reordered);
        assert_eq!(view.highlighted(&reordered), Some(&key("AAA-2")));
    }

    #[test]
    fn test_sync_drops_evicted_marks_and_clamps() {
        let entries = tickets(&["AAA-3", "AAA-2", "AAA-1"]);
        let mut view = ListView::new();
        view.sync(&entries);
        view.handle_input(press(KeyCode::End), &entries);
        view.handle_input(press(KeyCode::Char(' ')), &entries);

        let shorter = tickets(&["BBB-1"]);
        view.sync(&shorter);
        assert!(view.marked.is_empty());
        assert_eq!(view.selected, 0);
    }

    #[test]
    fn test_action_keys() {
        let entries = tickets(&["AAA-1"]);
        let mut view = ListView::new();
        view.sync(&entries);

        let cases = [
            (KeyCode::Enter, ListAction::ShowDetails(key("AAA-1"))),
            (KeyCode::Char('n'), ListAction::FetchNext),
            (KeyCode::Char('/'), ListAction::FocusSearch),
            (KeyCode::Char('o'), ListAction::Open),
            (KeyCode::Char('l'), ListAction::ToggleLock),
            (KeyCode::Char('e'), ListAction::Export),
            (KeyCode::Char('?'), ListAction::Help),
            (KeyCode::Char('q'), ListAction::Quit),
        ];
        for (code, action) in cases {
            assert_eq!(view.handle_input(press(code), &entries), Some(action));
        }
    }
}
