//! JIRA API response types.
//!
//! These types model the parts of the JIRA REST API v3 responses the ticket
//! list needs, plus conversion into store tickets.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::{CommentRecord, LatestPage, Ticket, TicketKey};

/// Search result from a JQL query.
///
/// Returned by `GET /rest/api/3/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// The index of the first result.
    pub start_at: u32,
    /// Maximum results requested.
    pub max_results: u32,
    /// Total number of matching issues.
    pub total: u32,
    /// The list of issues.
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl SearchResult {
    /// Convert the issues into tickets, dropping keys that do not parse.
    pub fn into_tickets(self) -> Vec<Ticket> {
        self.issues.into_iter().filter_map(Issue::into_ticket).collect()
    }

    /// Convert into a page of latest tickets.
    ///
    /// The page remembers how many issues the server sent, including the
    /// ones dropped for an unrecognized key, so paging stays aligned.
    pub fn into_latest_page(self) -> LatestPage {
        let returned = self.issues.len() as u32;
        LatestPage {
            tickets: self.into_tickets(),
            returned,
        }
    }
}

/// A JIRA issue.
///
/// Returned by `GET /rest/api/3/issue/{issueKey}` or as part of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// The issue ID.
    pub id: String,
    /// The issue key (e.g., "PROJ-123").
    pub key: String,
    /// The issue fields.
    pub fields: IssueFields,
}

impl Issue {
    /// Get the description as plain text, or empty string if not set.
    ///
    /// Handles both Atlassian Document Format and legacy plain strings.
    pub fn description_text(&self) -> String {
        self.fields
            .description
            .as_ref()
            .map(rich_text_to_plain)
            .unwrap_or_default()
    }

    /// Convert into a store ticket.
    ///
    /// Returns `None` (and logs) if the key is not a valid ticket key.
    pub fn into_ticket(self) -> Option<Ticket> {
        let Some(key) = TicketKey::parse(&self.key) else {
            warn!(key = %self.key, "Skipping issue with unrecognized key");
            return None;
        };
        let description = self.description_text();
        Some(Ticket::new(key, self.fields.summary, description))
    }
}

/// Issue fields requested by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueFields {
    /// The issue summary/title.
    #[serde(default)]
    pub summary: String,
    /// The issue description (Atlassian Document Format or plain string).
    #[serde(default)]
    pub description: Option<serde_json::Value>,
    /// When the issue was created.
    #[serde(default)]
    pub created: Option<String>,
    /// When the issue was last updated.
    #[serde(default)]
    pub updated: Option<String>,
}

/// A JIRA user.
///
/// Returned by `GET /rest/api/3/user` and embedded in comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user's account ID.
    #[serde(default)]
    pub account_id: String,
    /// The user's display name.
    #[serde(default)]
    pub display_name: String,
    /// Legacy user name (server/data center instances).
    #[serde(default)]
    pub name: Option<String>,
}

impl User {
    /// Best available name for display.
    pub fn label(&self) -> &str {
        if !self.display_name.is_empty() {
            &self.display_name
        } else if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            name
        } else {
            "Unknown User"
        }
    }
}

/// A comment on a JIRA issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// The comment ID.
    pub id: String,
    /// The comment body (Atlassian Document Format or plain string).
    #[serde(default)]
    pub body: serde_json::Value,
    /// The user who authored the comment.
    #[serde(default)]
    pub author: Option<User>,
    /// When the comment was created.
    #[serde(default)]
    pub created: String,
}

impl Comment {
    /// Convert into a conversation record (mentions still unresolved).
    pub fn into_record(self) -> CommentRecord {
        let author = self
            .author
            .as_ref()
            .map(|a| a.label().to_string())
            .unwrap_or_else(|| "Unknown User".to_string());
        CommentRecord {
            author,
            body: rich_text_to_plain(&self.body).trim().to_string(),
            created: self.created,
        }
    }
}

/// Comments response from the JIRA API.
///
/// Returned by `GET /rest/api/3/issue/{issueKey}/comment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsResponse {
    /// The index of the first result.
    pub start_at: u32,
    /// Maximum results requested.
    pub max_results: u32,
    /// Total number of comments.
    pub total: u32,
    /// The list of comments.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl CommentsResponse {
    /// Check if there are more pages of results.
    pub fn has_more(&self) -> bool {
        self.start_at + (self.comments.len() as u32) < self.total
    }

    /// Get the starting index for the next page.
    pub fn next_start(&self) -> u32 {
        self.start_at + self.comments.len() as u32
    }
}

/// Convert a rich text field to plain text.
fn rich_text_to_plain(value: &serde_json::Value) -> String {
    if let Some(s) = value.as_str() {
        return s.to_string();
    }
    match serde_json::from_value::<AtlassianDoc>(value.clone()) {
        Ok(doc) => doc.to_plain_text(),
        Err(_) => String::new(),
    }
}

/// Atlassian Document Format (ADF) content.
///
/// JIRA uses ADF for rich text fields like descriptions and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlassianDoc {
    /// The document type (always "doc" for root documents).
    #[serde(rename = "type")]
    pub doc_type: String,
    /// The document version (typically 1).
    #[serde(default)]
    pub version: Option<u32>,
    /// The content nodes within the document.
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
}

impl AtlassianDoc {
    /// Convert ADF content to plain text for display.
    ///
    /// Mentions without a display text are emitted as
    /// `[~accountid:<id>]` so they can be resolved later.
    pub fn to_plain_text(&self) -> String {
        let mut result = String::new();
        for node in &self.content {
            Self::extract_text(node, &mut result);
        }
        result.trim().to_string()
    }

    fn extract_children(obj: &serde_json::Map<String, serde_json::Value>, result: &mut String) {
        if let Some(serde_json::Value::Array(items)) = obj.get("content") {
            for item in items {
                Self::extract_text(item, result);
            }
        }
    }

    fn extract_text(node: &serde_json::Value, result: &mut String) {
        match node {
            serde_json::Value::Object(obj) => match obj.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(text) = obj.get("text").and_then(|t| t.as_str()) {
                        result.push_str(text);
                    }
                }
                Some("paragraph") | Some("heading") | Some("codeBlock") => {
                    Self::extract_children(obj, result);
                    if !result.ends_with('\n') && !result.is_empty() {
                        result.push('\n');
                    }
                }
                Some("hardBreak") => result.push('\n'),
                Some("listItem") => {
                    result.push_str("• ");
                    Self::extract_children(obj, result);
                }
                Some("blockquote") => {
                    result.push_str("> ");
                    Self::extract_children(obj, result);
                }
                Some("mention") => {
                    let attrs = obj.get("attrs");
                    let text = attrs
                        .and_then(|a| a.get("text"))
                        .and_then(|t| t.as_str())
                        .filter(|t| !t.trim_start_matches('@').is_empty());
                    let id = attrs.and_then(|a| a.get("id")).and_then(|t| t.as_str());
                    match (text, id) {
                        (Some(text), _) => {
                            result.push('@');
                            result.push_str(text.trim_start_matches('@'));
                        }
                        (None, Some(id)) => {
                            result.push_str(&format!("[~accountid:{}]", id));
                        }
                        (None, None) => {}
                    }
                }
                Some("emoji") => {
                    if let Some(shortname) = obj
                        .get("attrs")
                        .and_then(|a| a.get("shortName"))
                        .and_then(|s| s.as_str())
                    {
                        result.push_str(shortname);
                    }
                }
                Some("inlineCard") | Some("mediaGroup") | Some("mediaSingle") => {}
                _ => Self::extract_children(obj, result),
            },
            serde_json::Value::Array(items) => {
                for item in items {
                    Self::extract_text(item, result);
                }
            }
            _ => {}
        }
    }
}

impl Default for AtlassianDoc {
    fn default() -> Self {
        Self {
            doc_type: "doc".to_string(),
            version: Some(1),
            content: vec![],
        }
    }
}
