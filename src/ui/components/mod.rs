//! Reusable UI components.

mod help_bar;
mod input;
mod loading;
mod modal;
mod notification;

pub use help_bar::render_context_help;
pub use input::TextInput;
pub use loading::LoadingIndicator;
pub use modal::{centered_rect, ErrorDialog};
pub use notification::{Notification, NotificationManager};
