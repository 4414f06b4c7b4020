//! Ticket records held by the store.

use std::fmt;

use super::keys::TicketKey;

/// A single comment in a ticket's conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    /// Display name of the comment author.
    pub author: String,
    /// Creation timestamp as reported by the server (ISO 8601).
    pub created: String,
    /// Plain-text comment body with mentions resolved.
    pub body: String,
}

impl CommentRecord {
    /// The date part of the creation timestamp (`yyyy-mm-dd`).
    pub fn date(&self) -> &str {
        self.created.split('T').next().unwrap_or(&self.created)
    }
}

impl fmt::Display for CommentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} commented:\n{}\n", self.date(), self.author, self.body)
    }
}

/// Lazily loaded ticket content shown in the detail pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketDetails {
    /// Description with mentions resolved.
    pub description: String,
    /// Comments sorted oldest first.
    pub conversation: Vec<CommentRecord>,
}

/// A ticket as displayed in the list.
///
/// `locked` and `fetch_order` are local state owned by the store; tickets
/// coming from the client always start unlocked with a zero rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// The ticket key.
    pub key: TicketKey,
    /// The ticket summary.
    pub title: String,
    /// The ticket description, possibly empty.
    pub description: String,
    /// Comment conversation, `None` until the details have been loaded.
    pub conversation: Option<Vec<CommentRecord>>,
    pub(crate) locked: bool,
    pub(crate) fetch_order: u64,
}

impl Ticket {
    /// Create an unlocked ticket without a loaded conversation.
    pub fn new(key: TicketKey, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
            description: description.into(),
            conversation: None,
            locked: false,
            fetch_order: 0,
        }
    }

    /// Whether the ticket is pinned.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Rank of the population this ticket was last retrieved in.
    pub fn fetch_order(&self) -> u64 {
        self.fetch_order
    }

    /// Whether the description and conversation have been loaded.
    pub fn has_details(&self) -> bool {
        self.conversation.is_some()
    }

    /// The list label: the key, with a trailing `*` when locked.
    pub fn label(&self) -> String {
        if self.locked {
            format!("{}*", self.key)
        } else {
            self.key.to_string()
        }
    }

    /// Conversation rendered as text, or `"No Comments"`.
    pub fn conversation_text(&self) -> String {
        match &self.conversation {
            Some(comments) if !comments.is_empty() => comments
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            _ => "No Comments".to_string(),
        }
    }

    /// Description text, or `"No Description"` when empty.
    pub fn description_text(&self) -> &str {
        if self.description.trim().is_empty() {
            "No Description"
        } else {
            &self.description
        }
    }

    /// Replace server-supplied content while keeping local state.
    ///
    /// Loaded details are only replaced by other loaded details.
    pub(crate) fn refresh_from(&mut self, fetched: Ticket) {
        self.title = fetched.title;
        if fetched.conversation.is_some() {
            self.description = fetched.description;
            self.conversation = fetched.conversation;
        } else if self.conversation.is_none() {
            self.description = fetched.description;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> TicketKey {
        TicketKey::parse(s).unwrap()
    }

    #[test]
    fn test_ticket_new_is_unlocked() {
        let ticket = Ticket::new(key("AAA-1"), "Title", "");
        assert!(!ticket.is_locked());
        assert_eq!(ticket.fetch_order(), 0);
        assert!(!ticket.has_details());
    }

    #[test]
    fn test_refresh_without_details_takes_description() {
        let mut ticket = Ticket::new(key("AAA-1"), "Old", "old");
        ticket.refresh_from(Ticket::new(key("AAA-1"), "New", "new"));
        assert_eq!(ticket.description, "new");
    }

    #[test]
    fn test_label_marks_locked() {
        let mut ticket = Ticket::new(key("AAA-1"), "Title", "");
        assert_eq!(ticket.label(), "AAA-1");
        ticket.locked = true;
        assert_eq!(ticket.label(), "AAA-1*");
    }

    #[test]
    fn test_description_text_placeholder() {
        let ticket = Ticket::new(key("AAA-1"), "Title", "  ");
        assert_eq!(ticket.description_text(), "No Description");
    }

    #[test]
    fn test_conversation_text() {
        let mut ticket = Ticket::new(key("AAA-1"), "Title", "");
        assert_eq!(ticket.conversation_text(), "No Comments");

        ticket.conversation = Some(vec![
            CommentRecord {
                author: "Ann".to_string(),
                created: "2024-03-01T10:00:00.000+0000".to_string(),
                body: "First".to_string(),
            },
            CommentRecord {
                author: "Bob".to_string(),
                created: "2024-03-02T09:00:00.000+0000".to_string(),
                body: "Second".to_string(),
            },
        ]);
        assert_eq!(
            ticket.conversation_text(),
            "2024-03-01 - Ann commented:\nFirst\n\n2024-03-02 - Bob commented:\nSecond\n"
        );
    }

    #[test]
    fn test_refresh_keeps_local_state() {
        let mut ticket = Ticket::new(key("AAA-1"), "Old", "old");
        ticket.locked = true;
        ticket.fetch_order = 7;
        ticket.conversation = Some(vec![]);

        ticket.refresh_from(Ticket::new(key("AAA-1"), "New", "new"));

        assert_eq!(ticket.title, "New");
        assert_eq!(ticket.description, "old");
        assert!(ticket.is_locked());
        assert_eq!(ticket.fetch_order(), 7);
        assert!(ticket.has_details());
    }
}
