//! Application views.

mod connection;
mod detail;
mod help;
mod list;

pub use connection::{ConnectionAction, ConnectionField, ConnectionForm};
pub use detail::{DetailContent, DetailView};
pub use help::{HelpAction, HelpView};
pub use list::{ListAction, ListView};
