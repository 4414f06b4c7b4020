//! Async task management for non-blocking API operations.
//!
//! Network work runs in background tasks so the UI stays responsive:
//! 1. `App::update` returns a `Command` describing the request
//! 2. The main loop hands it to `TaskSpawner`, which spawns a tokio task
//! 3. The task sends an `ApiMessage` through the channel when it finishes
//! 4. The main loop polls the channel with `try_recv()` and feeds the
//!    message back to the app

use tokio::sync::mpsc;

use crate::api::{ApiError, JiraClient};
use crate::store::{
    LatestPage, LatestRequest, SearchOutcome, SearchRequest, TicketDetails, TicketKey,
};

/// Messages sent from background tasks to the main event loop.
#[derive(Debug)]
pub enum ApiMessage {
    /// A page of latest tickets.
    LatestFetched {
        request: LatestRequest,
        result: Result<LatestPage, ApiError>,
    },

    /// The result of a key search.
    SearchFetched {
        request: SearchRequest,
        result: Result<SearchOutcome, ApiError>,
    },

    /// Description and conversation of a single ticket.
    DetailsFetched {
        key: TicketKey,
        result: Result<TicketDetails, ApiError>,
    },
}

/// Spawns API requests as background tasks.
#[derive(Clone)]
pub struct TaskSpawner {
    tx: mpsc::UnboundedSender<ApiMessage>,
}

impl TaskSpawner {
    /// Create a spawner sending results to `tx`.
    pub fn new(tx: mpsc::UnboundedSender<ApiMessage>) -> Self {
        Self { tx }
    }

    /// Fetch the page described by `request`.
    pub fn spawn_fetch_latest(&self, client: &JiraClient, request: LatestRequest) {
        let tx = self.tx.clone();
        let client = client.clone();
        tokio::spawn(async move {
            let result = client
                .fetch_latest_page(request.offset, request.page_size)
                .await;
            let _ = tx.send(ApiMessage::LatestFetched { request, result });
        });
    }

    /// Fetch the tickets named by `request`.
    pub fn spawn_search(&self, client: &JiraClient, request: SearchRequest) {
        let tx = self.tx.clone();
        let client = client.clone();
        tokio::spawn(async move {
            let result = client.fetch_tickets_by_keys(&request.keys).await;
            let _ = tx.send(ApiMessage::SearchFetched { request, result });
        });
    }

    /// Load the details of `key`.
    pub fn spawn_fetch_details(&self, client: &JiraClient, key: TicketKey) {
        let tx = self.tx.clone();
        let client = client.clone();
        tokio::spawn(async move {
            let result = client.fetch_ticket_details(&key).await;
            let _ = tx.send(ApiMessage::DetailsFetched { key, result });
        });
    }
}

/// Create a new task channel.
///
/// Returns a `TaskSpawner` for spawning tasks and a receiver for results.
pub fn create_task_channel() -> (TaskSpawner, mpsc::UnboundedReceiver<ApiMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TaskSpawner::new(tx), rx)
}
