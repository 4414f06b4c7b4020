//! User interface components and views.
//!
//! All rendering lives here. Views own only presentation state (highlight,
//! marks, scroll); tickets are read from the store on every frame.

mod components;
pub mod theme;
mod views;

pub use components::{
    render_context_help, ErrorDialog, LoadingIndicator, Notification, NotificationManager,
    TextInput,
};
pub use theme::theme;
pub use views::{
    ConnectionAction, ConnectionField, ConnectionForm, DetailContent, DetailView, HelpAction,
    HelpView, ListAction, ListView,
};
