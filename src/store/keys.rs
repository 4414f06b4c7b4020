//! Ticket keys and key extraction from free-form text.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Pattern for a ticket key: project prefix, dash, numeric id.
static TICKET_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z]+-[0-9]+").expect("ticket key pattern is valid"));

/// A validated ticket key such as `AAA-1234`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TicketKey(String);

impl TicketKey {
    /// Parse a key, accepting only a full match of the key pattern.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        TICKET_KEY_RE
            .find(raw)
            .filter(|m| m.start() == 0 && m.end() == raw.len())
            .map(|m| Self(m.as_str().to_string()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TicketKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("'{}' is not a valid ticket key", value))
    }
}

impl From<TicketKey> for String {
    fn from(key: TicketKey) -> Self {
        key.0
    }
}

impl AsRef<str> for TicketKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extract every ticket key from free-form text.
///
/// Keys are returned in order of first appearance with duplicates removed.
/// Anything that does not match the key pattern (whitespace, punctuation,
/// trailing letters) is ignored, so `"AAA-1234AAA-1248"` yields two keys.
pub fn extract_keys(text: &str) -> Vec<TicketKey> {
    let mut keys: Vec<TicketKey> = Vec::new();
    for m in TICKET_KEY_RE.find_iter(text) {
        let key = TicketKey(m.as_str().to_string());
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}
