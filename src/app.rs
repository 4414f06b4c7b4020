//! Main application state and event loop.
//!
//! This module implements The Elm Architecture (TEA) pattern: every input
//! goes through `App::update`, which mutates state and may return a
//! `Command` for network work. The main loop runs the command on a
//! background task and feeds the resulting `ApiMessage` back through
//! `App::handle_message`.

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tracing::{debug, info, trace, warn};

use crate::api::JiraClient;
use crate::config::{Config, Credentials};
use crate::effects::{FileWriter, UrlOpener};
use crate::error::AppError;
use crate::events::{Event, KeyContext};
use crate::store::{
    extract_keys, LatestRequest, MergeSummary, SearchRequest, StoreError, Ticket, TicketKey,
    TicketStore,
};
use crate::tasks::ApiMessage;
use crate::ui::{
    render_context_help, theme, ConnectionAction, ConnectionField, ConnectionForm,
    DetailContent, DetailView, ErrorDialog, HelpAction, HelpView, ListAction, ListView,
    LoadingIndicator, Notification, NotificationManager, TextInput,
};

/// Network work requested by `App::update`.
#[derive(Debug)]
pub enum Command {
    /// Fetch the page described by `request`.
    FetchLatest {
        client: JiraClient,
        request: LatestRequest,
    },
    /// Fetch the tickets named by `request`.
    Search {
        client: JiraClient,
        request: SearchRequest,
    },
    /// Load the description and conversation of `key`.
    FetchDetails { client: JiraClient, key: TicketKey },
}

/// The part of the screen receiving key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Connection(ConnectionField),
    List,
    Search,
}

impl Focus {
    /// Next focus in Tab order.
    pub fn next(self) -> Self {
        match self {
            Focus::Connection(ConnectionField::Url) => Focus::Connection(ConnectionField::User),
            Focus::Connection(ConnectionField::User) => Focus::Connection(ConnectionField::Token),
            Focus::Connection(ConnectionField::Token) => {
                Focus::Connection(ConnectionField::SaveToken)
            }
            Focus::Connection(ConnectionField::SaveToken) => Focus::List,
            Focus::List => Focus::Search,
            Focus::Search => Focus::Connection(ConnectionField::Url),
        }
    }

    /// Previous focus in Tab order.
    pub fn prev(self) -> Self {
        match self {
            Focus::Connection(ConnectionField::Url) => Focus::Search,
            Focus::Connection(ConnectionField::User) => Focus::Connection(ConnectionField::Url),
            Focus::Connection(ConnectionField::Token) => Focus::Connection(ConnectionField::User),
            Focus::Connection(ConnectionField::SaveToken) => {
                Focus::Connection(ConnectionField::Token)
            }
            Focus::List => Focus::Connection(ConnectionField::SaveToken),
            Focus::Search => Focus::List,
        }
    }

    fn key_context(self) -> KeyContext {
        match self {
            Focus::Connection(_) => KeyContext::Connection,
            Focus::List => KeyContext::TicketList,
            Focus::Search => KeyContext::Search,
        }
    }
}

/// The main application struct that holds all state.
///
/// This implements the Model part of The Elm Architecture (TEA).
pub struct App {
    /// The session's tickets.
    store: TicketStore,
    /// Connection fields.
    form: ConnectionForm,
    /// Search text.
    search: TextInput,
    list: ListView,
    detail: DetailView,
    help: HelpView,
    show_help: bool,
    focus: Focus,
    /// Notification manager for toast messages.
    notifications: NotificationManager,
    /// Error dialog for critical errors.
    error_dialog: ErrorDialog,
    /// Shown while a fetch or search is in flight.
    loading: LoadingIndicator,
    /// Client built for the last credentials used.
    client: Option<(Credentials, JiraClient)>,
    opener: Box<dyn UrlOpener>,
    writer: Box<dyn FileWriter>,
    should_quit: bool,
}

impl App {
    /// Create the application with the loaded configuration and the
    /// capabilities used to open URLs and write export files.
    pub fn new(config: &Config, opener: Box<dyn UrlOpener>, writer: Box<dyn FileWriter>) -> Self {
        let form = ConnectionForm::from_config(config);
        let focus = if form.is_complete() {
            Focus::List
        } else {
            Focus::Connection(ConnectionField::Url)
        };
        debug!(?focus, "Creating application");

        Self {
            store: TicketStore::new(config.jira_url.trim()),
            form,
            search: TextInput::new().with_placeholder("Paste text containing keys like ABC-123"),
            list: ListView::new(),
            detail: DetailView::new(),
            help: HelpView::new(),
            show_help: false,
            focus,
            notifications: NotificationManager::new(),
            error_dialog: ErrorDialog::new(),
            loading: LoadingIndicator::new(),
            client: None,
            opener,
            writer,
            should_quit: false,
        }
    }

    pub fn store(&self) -> &TicketStore {
        &self.store
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn detail(&self) -> &DetailView {
        &self.detail
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    pub fn loading(&self) -> &LoadingIndicator {
        &self.loading
    }

    pub fn is_help_visible(&self) -> bool {
        self.show_help
    }

    pub fn is_error_dialog_visible(&self) -> bool {
        self.error_dialog.is_visible()
    }

    /// Returns whether the application should quit.
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// The configuration to write on exit.
    pub fn config(&self) -> Config {
        self.form.to_config()
    }

    /// Handle an application error.
    ///
    /// Critical errors are shown in a modal dialog, everything else as a
    /// toast notification.
    pub fn handle_error(&mut self, error: &AppError) {
        if error.is_critical() {
            warn!(error = %error, "Critical error occurred");
            self.error_dialog.show(error);
        } else {
            debug!(error = %error, "Recoverable error occurred");
            self.notifications
                .push(Notification::error(error.user_message()));
        }
    }

    /// Update the application state based on an event.
    ///
    /// This implements the Update part of The Elm Architecture (TEA).
    pub fn update(&mut self, event: Event) -> Option<Command> {
        match event {
            Event::Key(key) => {
                trace!(key = ?key.code, modifiers = ?key.modifiers, "Key event");
                self.handle_key(key)
            }
            Event::Paste(text) => {
                self.handle_paste(&text);
                None
            }
            Event::Resize(width, height) => {
                trace!(width, height, "Terminal resize event");
                None
            }
            Event::Tick => {
                self.loading.tick();
                self.notifications.tick();
                None
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        // The error dialog blocks all other input
        if self.error_dialog.is_visible() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.error_dialog.dismiss();
            }
            return None;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            info!("Quit requested");
            self.should_quit = true;
            return None;
        }

        if self.show_help {
            if let Some(HelpAction::Close) = self.help.handle_input(key) {
                self.show_help = false;
            }
            return None;
        }

        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return None;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                return None;
            }
            _ => {}
        }

        match self.focus {
            Focus::Connection(field) => {
                if key.code == KeyCode::Esc {
                    self.focus = Focus::List;
                    return None;
                }
                match self.form.handle_input(field, key) {
                    Some(ConnectionAction::Submit) => self.fetch_next(),
                    None => None,
                }
            }
            Focus::Search => match key.code {
                KeyCode::Esc => {
                    self.focus = Focus::List;
                    None
                }
                KeyCode::Enter => self.run_search(),
                _ => {
                    self.search.handle_input(key);
                    None
                }
            },
            Focus::List => {
                if self.detail.handle_scroll(key) {
                    return None;
                }
                let action = self.list.handle_input(key, self.store.entries())?;
                self.handle_list_action(action)
            }
        }
    }

    fn handle_list_action(&mut self, action: ListAction) -> Option<Command> {
        match action {
            ListAction::ShowDetails(key) => self.show_details(key),
            ListAction::FetchNext => self.fetch_next(),
            ListAction::FocusSearch => {
                self.focus = Focus::Search;
                None
            }
            ListAction::Open => {
                self.open_selected();
                None
            }
            ListAction::ToggleLock => {
                self.toggle_lock_selected();
                None
            }
            ListAction::Export => {
                self.export_selected();
                None
            }
            ListAction::Help => {
                self.help.reset_scroll();
                self.show_help = true;
                None
            }
            ListAction::Quit => {
                info!("Quit requested");
                self.should_quit = true;
                None
            }
        }
    }

    fn handle_paste(&mut self, text: &str) {
        if self.error_dialog.is_visible() || self.show_help {
            return;
        }
        match self.focus {
            Focus::Connection(field) => self.form.paste(field, text),
            Focus::Search => self.search.insert_str(text),
            Focus::List => {
                self.focus = Focus::Search;
                self.search.insert_str(text);
            }
        }
    }

    /// The client for the current connection fields.
    ///
    /// Validates the fields and reuses the previous client while they are
    /// unchanged. A new instance URL empties the ticket list, and a new user
    /// restarts paging from the first ticket. Neither may change while a
    /// request is in flight.
    fn client(&mut self) -> Result<JiraClient, AppError> {
        let credentials = self.form.credentials();
        credentials.validate()?;

        let user_changed = match &self.client {
            Some((cached, client)) if cached == &credentials => return Ok(client.clone()),
            Some((cached, _)) => cached.user != credentials.user,
            None => false,
        };
        if self.store.is_busy() {
            return Err(StoreError::Busy.into());
        }

        debug!(url = %credentials.url, "Creating JIRA client");
        let client =
            JiraClient::with_credentials(&credentials.url, &credentials.user, &credentials.token)?;

        let had_tickets = !self.store.is_empty();
        if self.store.switch_instance(client.base_url()) {
            info!(url = %client.base_url(), "Connected to a different JIRA instance");
            self.list.sync(self.store.entries());
            self.detail = DetailView::new();
            if had_tickets {
                self.notifications
                    .info(format!("Switched to {}, ticket list cleared", client.base_url()));
            }
        } else if user_changed {
            info!(user = %credentials.user, "User changed, paging restarts");
            self.store.restart_paging();
        }

        self.client = Some((credentials, client.clone()));
        Ok(client)
    }

    fn fetch_next(&mut self) -> Option<Command> {
        let client = match self.client() {
            Ok(client) => client,
            Err(e) => {
                self.handle_error(&e);
                return None;
            }
        };
        let request = match self.store.begin_fetch_latest() {
            Ok(request) => request,
            Err(e) => {
                self.handle_error(&e.into());
                return None;
            }
        };

        info!(offset = request.offset, "Fetching latest tickets");
        self.loading.start(format!(
            "Loading tickets {}-{}...",
            request.offset + 1,
            request.offset + request.page_size
        ));
        Some(Command::FetchLatest { client, request })
    }

    fn run_search(&mut self) -> Option<Command> {
        let text = self.search.value().to_string();
        if extract_keys(&text).is_empty() {
            self.handle_error(&StoreError::NoKeysFound.into());
            return None;
        }
        let client = match self.client() {
            Ok(client) => client,
            Err(e) => {
                self.handle_error(&e);
                return None;
            }
        };
        let request = match self.store.begin_search(&text) {
            Ok(request) => request,
            Err(e) => {
                self.handle_error(&e.into());
                return None;
            }
        };

        info!(keys = request.keys.len(), "Searching tickets");
        self.loading
            .start(format!("Searching {} ticket(s)...", request.keys.len()));
        self.focus = Focus::List;
        Some(Command::Search { client, request })
    }

    fn show_details(&mut self, key: TicketKey) -> Option<Command> {
        if self.store.get(&key).is_some_and(Ticket::has_details) {
            self.detail.show_ticket(key, false);
            return None;
        }
        match self.client() {
            Ok(_) if self.store.get(&key).is_none() => None,
            Ok(client) => {
                debug!(%key, "Loading ticket details");
                self.detail.show_ticket(key.clone(), true);
                Some(Command::FetchDetails { client, key })
            }
            Err(e) => {
                self.detail.show_ticket(key, false);
                self.handle_error(&e);
                None
            }
        }
    }

    fn selection(&mut self) -> Option<Vec<TicketKey>> {
        let keys = self.list.selection(self.store.entries());
        if keys.is_empty() {
            self.notifications.warning("No ticket selected");
            return None;
        }
        Some(keys)
    }

    fn open_selected(&mut self) {
        let Some(keys) = self.selection() else {
            return;
        };
        let urls = self.store.select_open(&keys);
        let mut opened = 0;
        for url in &urls {
            match self.opener.open_url(url) {
                Ok(()) => opened += 1,
                Err(e) => {
                    warn!(url, error = %e, "Failed to open browser");
                    self.notifications
                        .error(format!("Could not open {}: {}", url, e));
                }
            }
        }
        if opened > 0 {
            info!(count = opened, "Opened tickets in browser");
            self.notifications
                .success(format!("Opened {} ticket(s) in the browser", opened));
        }
    }

    fn toggle_lock_selected(&mut self) {
        let Some(keys) = self.selection() else {
            return;
        };
        let summary = self.store.toggle_lock(&keys);
        self.list.sync(self.store.entries());
        info!(
            locked = summary.locked,
            unlocked = summary.unlocked,
            "Toggled locks"
        );

        let message = match (summary.locked, summary.unlocked) {
            (0, 0) => return,
            (locked, 0) => format!("Locked {} ticket(s)", locked),
            (0, unlocked) => format!("Unlocked {} ticket(s)", unlocked),
            (locked, unlocked) => format!(
                "Locked {} and unlocked {} ticket(s)",
                locked, unlocked
            ),
        };
        self.notifications.info(message);
    }

    fn export_selected(&mut self) {
        let Some(keys) = self.selection() else {
            return;
        };
        let record = self.store.select_export(&keys);
        if record.is_empty() {
            self.notifications.warning("No ticket selected");
            return;
        }

        match self.writer.write_file(record.filename(), &record.contents()) {
            Ok(path) => {
                let locked = record.lines().iter().filter(|l| l.locked).count();
                info!(path = %path.display(), count = record.len(), locked, "Exported tickets");
                // Longer than usual so the path can be read
                self.notifications.push(
                    Notification::success(format!(
                        "Exported {} ticket(s) to {}",
                        record.len(),
                        path.display()
                    ))
                    .with_duration(Duration::from_secs(8)),
                );
            }
            Err(e) => {
                warn!(error = %e, "Export failed");
                self.handle_error(&AppError::Io(e));
            }
        }
    }

    /// Apply the result of a background task.
    pub fn handle_message(&mut self, message: ApiMessage) {
        match message {
            ApiMessage::LatestFetched { request, result } => {
                self.loading.stop();
                match result {
                    Ok(page) => match self.store.complete_latest(&request, page) {
                        Ok(summary) => self.latest_merged(&summary),
                        Err(e) => debug!(error = %e, "Dropping latest page"),
                    },
                    Err(e) => {
                        if self.store.cancel(request.id()) {
                            self.handle_error(&e.into());
                        } else {
                            debug!(error = %e, "Dropping failed latest fetch");
                        }
                    }
                }
            }
            ApiMessage::SearchFetched { request, result } => {
                self.loading.stop();
                match result {
                    Ok(outcome) => match self.store.complete_search(&request, outcome) {
                        Ok(summary) => self.search_merged(&summary),
                        Err(e) => debug!(error = %e, "Dropping search result"),
                    },
                    Err(e) => {
                        if self.store.cancel(request.id()) {
                            self.handle_error(&e.into());
                        } else {
                            debug!(error = %e, "Dropping failed search");
                        }
                    }
                }
            }
            ApiMessage::DetailsFetched { key, result } => {
                self.detail.details_finished(&key);
                match result {
                    Ok(details) => {
                        if !self.store.attach_details(&key, details) {
                            debug!(%key, "Details arrived for an evicted ticket");
                        }
                    }
                    Err(e) => self.handle_error(&e.into()),
                }
            }
        }
    }

    fn latest_merged(&mut self, summary: &MergeSummary) {
        self.list.sync(self.store.entries());
        if summary.fetched == 0 && summary.skipped == 0 {
            self.notifications.info("No more tickets available.");
        } else {
            self.notifications
                .success(format!("Loaded {} ticket(s)", summary.fetched));
        }
        if summary.skipped > 0 {
            warn!(skipped = summary.skipped, "Latest page held unrecognized keys");
            self.notifications.warning(format!(
                "Skipped {} ticket(s) with unrecognized keys",
                summary.skipped
            ));
        }
    }

    fn search_merged(&mut self, summary: &MergeSummary) {
        self.list.sync(self.store.entries());
        self.detail
            .show_search_summary(summary.fetched, summary.missing.len());
        if !summary.missing.is_empty() {
            let missing: Vec<&str> = summary.missing.iter().map(TicketKey::as_str).collect();
            self.notifications
                .warning(format!("Not found: {}", missing.join(", ")));
        }
    }

    /// Render the application UI.
    ///
    /// This implements the View part of The Elm Architecture (TEA).
    pub fn view(&mut self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Connection fields
                Constraint::Min(5),    // Tickets and details
                Constraint::Length(3), // Search
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        let connection_focus = match self.focus {
            Focus::Connection(field) => Some(field),
            _ => None,
        };
        self.form.render(frame, chunks[0], connection_focus);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1]);
        self.list.render(
            frame,
            body[0],
            self.store.entries(),
            self.focus == Focus::List,
        );
        let shown = match self.detail.content() {
            DetailContent::Ticket(key) => self.store.get(key),
            _ => None,
        };
        self.detail.render(frame, body[1], shown, false);

        self.search.render_with_label(
            frame,
            chunks[2],
            "Search ticket numbers",
            self.focus == Focus::Search,
        );

        self.render_status_bar(frame, chunks[3]);

        // Overlays, dialogs on top
        self.notifications.render(frame, area);
        if self.show_help {
            self.help.render(frame, area);
        }
        self.error_dialog.render(frame, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(40), Constraint::Min(0)])
            .split(area);

        let status = if self.loading.is_active() {
            Span::styled(self.loading.text(), Style::default().fg(t.accent))
        } else {
            let scope = match self.store.last_query() {
                Some(keys) => format!("search of {} key(s)", keys.len()),
                None => format!("{} fetched", self.store.cursor()),
            };
            Span::styled(
                format!(
                    " {} tickets, {} locked, {}",
                    self.store.len(),
                    self.store.locked_keys().len(),
                    scope
                ),
                Style::default().fg(t.muted),
            )
        };
        frame.render_widget(Paragraph::new(Line::from(status)), chunks[0]);

        let context = if self.show_help {
            KeyContext::Help
        } else {
            self.focus.key_context()
        };
        render_context_help(frame, chunks[1], context);
    }
}
