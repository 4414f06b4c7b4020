//! Key binding definitions.
//!
//! The tables here feed both the status bar hints and the help overlay; the
//! actual dispatch lives in `App::update`.

/// The part of the UI that currently receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyContext {
    /// One of the connection fields (URL, user, token, save checkbox).
    Connection,
    /// The ticket list.
    TicketList,
    /// The search field.
    Search,
    /// The help overlay.
    Help,
}

/// A key and what it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub keys: &'static str,
    pub description: &'static str,
}

const fn bind(keys: &'static str, description: &'static str) -> KeyBinding {
    KeyBinding { keys, description }
}

const CONNECTION: &[KeyBinding] = &[
    bind("Tab / Shift+Tab", "Next / previous field"),
    bind("Space", "Toggle \"Save API Token\""),
    bind("Enter", "Connect and get the latest 10 tickets"),
    bind("Esc", "Back to the ticket list"),
    bind("Ctrl+C", "Quit"),
];

const TICKET_LIST: &[KeyBinding] = &[
    bind("j / k, ↓ / ↑", "Move the highlight"),
    bind("Space", "Mark or unmark the highlighted ticket"),
    bind("Enter", "Show ticket details"),
    bind("n", "Get next 10 tickets"),
    bind("/", "Search by ticket keys"),
    bind("o", "Open selected tickets in the browser"),
    bind("l", "Lock or unlock selected tickets"),
    bind("e", "Export selected tickets to a file"),
    bind("Tab", "Next field"),
    bind("?", "Show this help"),
    bind("q / Ctrl+C", "Quit"),
];

const SEARCH: &[KeyBinding] = &[
    bind("Enter", "Search for every ticket key in the text"),
    bind("Ctrl+U", "Clear the search text"),
    bind("Esc", "Back to the ticket list"),
    bind("Ctrl+C", "Quit"),
];

const HELP: &[KeyBinding] = &[bind("Esc / q / ?", "Close help")];

/// Bindings active in `context`.
pub fn bindings(context: KeyContext) -> &'static [KeyBinding] {
    match context {
        KeyContext::Connection => CONNECTION,
        KeyContext::TicketList => TICKET_LIST,
        KeyContext::Search => SEARCH,
        KeyContext::Help => HELP,
    }
}

/// One-line hint text for the status bar, keys in brackets.
pub fn get_context_hints(context: KeyContext) -> &'static str {
    match context {
        KeyContext::Connection => "[Tab] next field  [Space] save token  [Enter] connect  [Esc] list",
        KeyContext::TicketList => {
            "[n] next 10  [/] search  [Space] mark  [l] lock  [o] open  [e] export  [?] help  [q] quit"
        }
        KeyContext::Search => "[Enter] search  [Ctrl+U] clear  [Esc] list",
        KeyContext::Help => "[Esc] close",
    }
}
