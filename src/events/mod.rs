//! Event handling for the application.
//!
//! Terminal input is polled by `EventHandler` and turned into `Event`s that
//! drive `App::update`.

mod handler;
mod keys;

use crossterm::event::KeyEvent;

pub use handler::EventHandler;
pub use keys::{bindings, get_context_hints, KeyContext};

/// Events consumed by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key press.
    Key(KeyEvent),
    /// Text pasted into the terminal (bracketed paste).
    Paste(String),
    /// The terminal was resized.
    Resize(u16, u16),
    /// No input within the tick rate.
    Tick,
}
