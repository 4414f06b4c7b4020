//! JIRA API client implementation.
//!
//! This module provides the client for the JIRA REST API v3 endpoints the
//! ticket list uses. It handles authentication, error handling, retries and
//! resolving account mentions to display names.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client, Response, StatusCode};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use super::auth::Auth;
use super::error::{ApiError, Result};
use super::types::{Comment, CommentsResponse, Issue, SearchResult, User};
use crate::store::{
    CommentRecord, LatestPage, SearchOutcome, Ticket, TicketDetails, TicketKey,
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Issue requests a key search keeps in flight at once.
const MAX_CONCURRENT_FETCHES: usize = 5;

/// Page size used when walking through comments.
const COMMENTS_PAGE_SIZE: u32 = 50;

/// Fields requested for list entries.
const LIST_FIELDS: &str = "summary,description,created";

/// Tickets the current user reported, is assigned to, or watches.
pub const LATEST_JQL: &str = "reporter = currentUser() OR assignee = currentUser() \
     OR watcher = currentUser() ORDER BY created DESC";

/// Name shown for mentions that cannot be resolved.
const UNKNOWN_USER: &str = "Unknown User";

static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[~accountid:([^\]]+)\]").expect("valid mention regex"));

/// The JIRA API client.
///
/// Cheap to clone; clones share the HTTP connection pool and the user name
/// cache.
#[derive(Debug, Clone)]
pub struct JiraClient {
    /// The HTTP client.
    client: Client,
    /// The base URL for the JIRA instance.
    base_url: String,
    /// Authentication credentials.
    auth: Auth,
    /// Display names by account ID.
    users: Arc<Mutex<HashMap<String, String>>>,
}

impl JiraClient {
    /// Create a new JIRA client with explicit credentials.
    ///
    /// Does NOT validate the connection.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The JIRA instance URL
    /// * `user` - The account user, usually an email address
    /// * `token` - The API token
    pub fn with_credentials(base_url: &str, user: &str, token: &str) -> Result<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        let auth = Auth::new(user, token);
        let client = Self::build_http_client()?;
        let base_url = normalize_base_url(base_url);

        Ok(Self {
            client,
            base_url,
            auth,
            users: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Build the HTTP client with appropriate settings.
    fn build_http_client() -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(ApiError::Network)
    }

    /// Search for issues using JQL.
    ///
    /// # Arguments
    ///
    /// * `jql` - The JQL query string
    /// * `start_at` - The index of the first issue to return (0-based)
    /// * `max_results` - Maximum number of issues to return (max 100)
    #[instrument(skip(self), fields(jql = %jql))]
    pub async fn search_issues(
        &self,
        jql: &str,
        start_at: u32,
        max_results: u32,
    ) -> Result<SearchResult> {
        debug!("Searching issues: startAt={}, maxResults={}", start_at, max_results);

        let url = self.search_url(jql, start_at, max_results);

        let result: SearchResult = self.get(&url).await?;
        debug!("Found {} issues (total: {})", result.issues.len(), result.total);
        Ok(result)
    }

    /// URL of an offset-paged JQL search.
    ///
    /// Uses the classic `/search` endpoint, which pages by `startAt`.
    fn search_url(&self, jql: &str, start_at: u32, max_results: u32) -> String {
        format!(
            "{}/rest/api/3/search?jql={}&startAt={}&maxResults={}&fields={}",
            self.base_url,
            urlencoding::encode(jql),
            start_at,
            max_results.min(100), // JIRA limits to 100
            LIST_FIELDS,
        )
    }

    /// Fetch one page of the user's latest tickets, newest first.
    pub async fn fetch_latest_page(&self, offset: u32, page_size: u32) -> Result<LatestPage> {
        let result = self.search_issues(LATEST_JQL, offset, page_size).await?;
        Ok(result.into_latest_page())
    }

    /// Fetch tickets by key.
    ///
    /// Keys that do not exist or are not visible end up in
    /// `SearchOutcome::missing`. Any other failure aborts the whole search.
    #[instrument(skip(self, keys), fields(count = keys.len()))]
    pub async fn fetch_tickets_by_keys(&self, keys: &[TicketKey]) -> Result<SearchOutcome> {
        let results = fetch_bounded(keys, MAX_CONCURRENT_FETCHES, |key| {
            let client = self.clone();
            async move { client.fetch_ticket(&key).await }
        })
        .await?;
        collect_found(results)
    }

    /// Fetch a single ticket for the list.
    ///
    /// The ticket carries the requested key even if the server resolved it
    /// to a moved issue.
    async fn fetch_ticket(&self, key: &TicketKey) -> Result<Ticket> {
        let issue = self.get_issue(key.as_str()).await?;
        if issue.key != key.as_str() {
            debug!(requested = %key, resolved = %issue.key, "Issue key was redirected");
        }
        let description = issue.description_text();
        Ok(Ticket::new(key.clone(), issue.fields.summary, description))
    }

    /// Get a single issue by key.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn get_issue(&self, key: &str) -> Result<Issue> {
        debug!("Fetching issue");

        let url = format!(
            "{}/rest/api/3/issue/{}?fields={}",
            self.base_url,
            urlencoding::encode(key),
            LIST_FIELDS
        );
        let issue: Issue = self.get(&url).await.map_err(|e| {
            if matches!(e, ApiError::NotFound(_)) {
                ApiError::NotFound(format!("Issue '{}' not found", key))
            } else {
                e
            }
        })?;

        debug!("Fetched issue: {}", issue.key);
        Ok(issue)
    }

    /// Get all comments of an issue, oldest first.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn get_comments(&self, key: &str) -> Result<Vec<Comment>> {
        let mut comments = Vec::new();
        let mut start_at = 0;

        loop {
            let url = format!(
                "{}/rest/api/3/issue/{}/comment?startAt={}&maxResults={}&orderBy=created",
                self.base_url,
                urlencoding::encode(key),
                start_at,
                COMMENTS_PAGE_SIZE
            );
            let page: CommentsResponse = self.get(&url).await?;
            let has_more = page.has_more() && !page.comments.is_empty();
            start_at = page.next_start();
            comments.extend(page.comments);
            if !has_more {
                break;
            }
        }

        comments.sort_by(|a, b| a.created.cmp(&b.created));
        debug!("Fetched {} comments", comments.len());
        Ok(comments)
    }

    /// Load the description and conversation shown in the detail pane.
    ///
    /// Account mentions are replaced with `@<display name>`.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn fetch_ticket_details(&self, key: &TicketKey) -> Result<TicketDetails> {
        let issue = self.get_issue(key.as_str()).await?;
        let comments = self.get_comments(key.as_str()).await?;

        let description = self.resolve_mentions(&issue.description_text()).await;
        let mut conversation: Vec<CommentRecord> = Vec::with_capacity(comments.len());
        for comment in comments {
            let mut record = comment.into_record();
            record.body = self.resolve_mentions(&record.body).await;
            conversation.push(record);
        }

        Ok(TicketDetails {
            description,
            conversation,
        })
    }

    /// Look up a user's display name, using the shared cache.
    #[instrument(skip(self))]
    pub async fn get_user_display_name(&self, account_id: &str) -> Result<String> {
        if let Some(name) = self.cached_user(account_id) {
            return Ok(name);
        }

        let url = format!(
            "{}/rest/api/3/user?accountId={}",
            self.base_url,
            urlencoding::encode(account_id)
        );
        let user: User = self.get(&url).await?;
        let name = user.label().to_string();

        if let Ok(mut users) = self.users.lock() {
            users.insert(account_id.to_string(), name.clone());
        }
        Ok(name)
    }

    fn cached_user(&self, account_id: &str) -> Option<String> {
        self.users
            .lock()
            .ok()
            .and_then(|users| users.get(account_id).cloned())
    }

    /// Replace every `[~accountid:<id>]` marker with `@<display name>`.
    ///
    /// Lookups that fail render as `@Unknown User`.
    pub async fn resolve_mentions(&self, text: &str) -> String {
        let mut names = HashMap::new();
        for id in mention_ids(text) {
            let name = match self.get_user_display_name(&id).await {
                Ok(name) => name,
                Err(e) => {
                    warn!(account_id = %id, "Failed to resolve mention: {}", e);
                    UNKNOWN_USER.to_string()
                }
            };
            names.insert(id, name);
        }
        substitute_mentions(text, &names)
    }

    /// Perform a GET request with authentication and error handling.
    ///
    /// Includes retry logic for transient failures (rate limiting, server errors).
    #[instrument(skip(self), fields(url = %url))]
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempts = 0;
        let mut last_error: Option<ApiError> = None;

        while attempts < MAX_RETRIES {
            attempts += 1;
            debug!("Request attempt {}/{}", attempts, MAX_RETRIES);

            match self.execute_get::<T>(url).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if Self::is_retryable(&e) && attempts < MAX_RETRIES {
                        let delay = Self::calculate_retry_delay(attempts);
                        warn!(
                            "Request failed (attempt {}), retrying in {}ms: {}",
                            attempts, delay, e
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or(ApiError::ServerError("Max retries exceeded".to_string())))
    }

    /// Execute a single GET request.
    async fn execute_get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, self.auth.header_value())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle the HTTP response, checking for errors and parsing JSON.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T> {
        let status = response.status();
        let url = response.url().to_string();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
        } else {
            let error_body = response.text().await.unwrap_or_default();
            debug!("Error response body: {}", error_body);

            Err(Self::error_from_response(status, &url, &error_body))
        }
    }

    /// Create an appropriate error from an HTTP response.
    fn error_from_response(status: StatusCode, url: &str, body: &str) -> ApiError {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
            // JIRA often returns JSON with errorMessages
            let messages: Vec<&str> = json
                .get("errorMessages")
                .and_then(|m| m.as_array())
                .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            if !messages.is_empty() {
                return ApiError::from_status(status, &messages.join(", "));
            }

            let errors: Vec<String> = json
                .get("errors")
                .and_then(|e| e.as_object())
                .map(|obj| obj.iter().map(|(k, v)| format!("{}: {}", k, v)).collect())
                .unwrap_or_default();
            if !errors.is_empty() {
                return ApiError::from_status(status, &errors.join(", "));
            }
        }

        ApiError::from_status(status, url)
    }

    /// Check if an error is retryable.
    fn is_retryable(error: &ApiError) -> bool {
        matches!(
            error,
            ApiError::RateLimited | ApiError::ServerError(_) | ApiError::Network(_)
        )
    }

    /// Calculate retry delay with exponential backoff.
    fn calculate_retry_delay(attempt: u32) -> u64 {
        RETRY_DELAY_MS * 2u64.pow(attempt - 1)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Split per-key fetch results into found tickets and missing keys.
///
/// Per-ticket failures mark the key as missing; the first other failure is
/// returned as the error of the whole search.
/// Run `fetch` for every key with at most `limit` calls in flight.
///
/// Results come back in key order regardless of completion order.
async fn fetch_bounded<T, F, Fut>(
    keys: &[TicketKey],
    limit: usize,
    fetch: F,
) -> Result<Vec<(TicketKey, T)>>
where
    F: Fn(TicketKey) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let mut set = JoinSet::new();
    for (index, key) in keys.iter().cloned().enumerate() {
        let permits = Arc::clone(&permits);
        let call = fetch(key.clone());
        set.spawn(async move {
            let _permit = permits.acquire_owned().await;
            (index, key, call.await)
        });
    }

    let mut results = Vec::with_capacity(keys.len());
    while let Some(joined) = set.join_next().await {
        let item = joined.map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        results.push(item);
    }
    results.sort_by_key(|(index, _, _)| *index);

    Ok(results
        .into_iter()
        .map(|(_, key, result)| (key, result))
        .collect())
}

pub fn collect_found(results: Vec<(TicketKey, Result<Ticket>)>) -> Result<SearchOutcome> {
    let mut outcome = SearchOutcome::default();
    for (key, result) in results {
        match result {
            Ok(ticket) => outcome.found.push(ticket),
            Err(e) if e.is_per_ticket() => {
                debug!(key = %key, "Ticket not accessible: {}", e);
                outcome.missing.push(key);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(outcome)
}

/// Distinct account IDs mentioned in `text`, in order of appearance.
fn mention_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for caps in MENTION_RE.captures_iter(text) {
        let id = caps[1].to_string();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

fn substitute_mentions(text: &str, names: &HashMap<String, String>) -> String {
    MENTION_RE
        .replace_all(text, |caps: &regex::Captures| {
            let name = names.get(&caps[1]).map(String::as_str).unwrap_or(UNKNOWN_USER);
            format!("@{}", name)
        })
        .into_owned()
}

/// Normalize the base URL by removing trailing slashes and ensuring HTTPS.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');

    // Warn if not HTTPS (but don't enforce for localhost/testing)
    if !url.starts_with("https://") && !url.contains("localhost") {
        warn!("URL does not use HTTPS: {}. This is insecure for production use.", url);
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> TicketKey {
        TicketKey::parse(s).unwrap()
    }

    #[test]
    fn test_normalize_base_url_removes_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://company.atlassian.net/"),
            "https://company.atlassian.net"
        );
    }

    #[test]
    fn test_normalize_base_url_handles_multiple_slashes() {
        assert_eq!(
            normalize_base_url("https://company.atlassian.net///"),
            "https://company.atlassian.net"
        );
    }

    #[test]
    fn test_normalize_base_url_preserves_path() {
        assert_eq!(
            normalize_base_url("https://company.atlassian.net/jira/"),
            "https://company.atlassian.net/jira"
        );
    }

    #[test]
    fn test_with_credentials_rejects_bare_host() {
        let err = JiraClient::with_credentials("company.atlassian.net", "u", "t").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn test_with_credentials_normalizes_url() {
        let client =
            JiraClient::with_credentials("https://company.atlassian.net/", "u", "t").unwrap();
        assert_eq!(client.base_url(), "https://company.atlassian.net");
    }

    #[test]
    fn test_is_retryable_rate_limited() {
        assert!(JiraClient::is_retryable(&ApiError::RateLimited));
    }

    #[test]
    fn test_is_retryable_server_error() {
        assert!(JiraClient::is_retryable(&ApiError::ServerError(
            "test".to_string()
        )));
    }

    #[test]
    fn test_is_not_retryable_unauthorized() {
        assert!(!JiraClient::is_retryable(&ApiError::Unauthorized));
    }

    #[test]
    fn test_is_not_retryable_not_found() {
        assert!(!JiraClient::is_retryable(&ApiError::NotFound(
            "test".to_string()
        )));
    }

    #[test]
    fn test_retry_delay_exponential() {
        assert_eq!(JiraClient::calculate_retry_delay(1), 1000);
        assert_eq!(JiraClient::calculate_retry_delay(2), 2000);
        assert_eq!(JiraClient::calculate_retry_delay(3), 4000);
    }

    #[test]
    fn test_error_from_response_uses_error_messages() {
        let body = r#"{"errorMessages": ["Issue does not exist or you do not have permission to see it."]}"#;
        let err = JiraClient::error_from_response(StatusCode::NOT_FOUND, "http://x", body);
        match err {
            ApiError::NotFound(msg) => assert!(msg.starts_with("Issue does not exist")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_error_from_response_falls_back_to_url() {
        let err = JiraClient::error_from_response(StatusCode::NOT_FOUND, "http://x/issue", "");
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "http://x/issue"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_collect_found_skips_missing_keys() {
        let results = vec![
            (key("AAA-1"), Ok(Ticket::new(key("AAA-1"), "One", ""))),
            (key("AAA-2"), Err(ApiError::NotFound("AAA-2".to_string()))),
            (key("AAA-3"), Err(ApiError::Forbidden)),
            (key("AAA-4"), Ok(Ticket::new(key("AAA-4"), "Four", ""))),
        ];
        let outcome = collect_found(results).unwrap();
        let found: Vec<&str> = outcome.found.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(found, vec!["AAA-1", "AAA-4"]);
        assert_eq!(outcome.missing, vec![key("AAA-2"), key("AAA-3")]);
    }

    #[test]
    fn test_collect_found_aborts_on_fatal_error() {
        let results = vec![
            (key("AAA-1"), Ok(Ticket::new(key("AAA-1"), "One", ""))),
            (key("AAA-2"), Err(ApiError::Unauthorized)),
        ];
        assert!(matches!(
            collect_found(results),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn test_mention_ids_are_distinct() {
        let text = "[~accountid:a1] and [~accountid:b2] and again [~accountid:a1]";
        assert_eq!(mention_ids(text), vec!["a1", "b2"]);
        assert!(mention_ids("no mentions here").is_empty());
    }

    #[test]
    fn test_substitute_mentions() {
        let mut names = HashMap::new();
        names.insert("a1".to_string(), "Ann".to_string());
        let text = "Ping [~accountid:a1], cc [~accountid:zz]";
        assert_eq!(
            substitute_mentions(text, &names),
            "Ping @Ann, cc @Unknown User"
        );
    }

    #[tokio::test]
    async fn test_resolve_mentions_uses_cache() {
        let client =
            JiraClient::with_credentials("https://company.atlassian.net", "u", "t").unwrap();
        client
            .users
            .lock()
            .unwrap()
            .insert("a1".to_string(), "Ann".to_string());

        let resolved = client.resolve_mentions("Hi [~accountid:a1]").await;
        assert_eq!(resolved, "Hi @Ann");
    }

    #[test]
    fn test_search_url_pages_by_offset() {
        let client =
            JiraClient::with_credentials("https://company.atlassian.net/", "u", "t").unwrap();
        let url = client.search_url(LATEST_JQL, 20, 10);
        assert!(url.starts_with("https://company.atlassian.net/rest/api/3/search?jql="));
        assert!(url.contains("startAt=20&maxResults=10"));
        assert!(url.contains("currentUser%28%29"));
        assert!(url.ends_with("fields=summary,description,created"));
    }

    #[tokio::test]
    async fn test_fetch_bounded_limits_calls_and_keeps_key_order() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let keys: Vec<TicketKey> = (1..=12).map(|n| key(&format!("AAA-{}", n))).collect();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = fetch_bounded(&keys, 3, |k| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                // Later keys finish first
                let n: u64 = k.as_str()[4..].parse().unwrap();
                tokio::time::sleep(Duration::from_millis(26 - 2 * n)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                k.to_string()
            }
        })
        .await
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(results.len(), 12);
        for (k, (got_key, value)) in keys.iter().zip(&results) {
            assert_eq!(got_key, k);
            assert_eq!(value, k.as_str());
        }
    }

    #[tokio::test]
    async fn test_fetch_tickets_by_keys_empty() {
        let client =
            JiraClient::with_credentials("https://company.atlassian.net", "u", "t").unwrap();
        let outcome = client.fetch_tickets_by_keys(&[]).await.unwrap();
        assert_eq!(outcome, SearchOutcome::default());
    }
}
