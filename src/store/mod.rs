//! In-memory ticket store.
//!
//! The store owns the ticket list shown in the UI and reconciles each new
//! population (a "latest" page or a key search) with the tickets the user has
//! locked. It never performs I/O: a population starts with `begin_*`, which
//! hands out a request token, and finishes with `complete_*` once the full
//! result is available. Until then the store is busy and rejects a second
//! population; a failed or abandoned request is released with `cancel` and
//! leaves the ticket list untouched.
//!
//! Display order is always:
//! 1. locked tickets, in the order they were locked
//! 2. everything else, most recently fetched first

mod export;
mod keys;
mod ticket;

use std::collections::HashSet;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, trace};

pub use export::{ExportLine, ExportRecord};
pub use keys::{extract_keys, TicketKey};
pub use ticket::{CommentRecord, Ticket, TicketDetails};

/// Number of tickets requested per "latest" page.
pub const PAGE_SIZE: u32 = 10;

/// Errors raised by store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The search text contained no ticket key.
    #[error("No ticket numbers found in the search text")]
    NoKeysFound,

    /// Another fetch or search is still in flight.
    #[error("Already loading tickets, please wait")]
    Busy,

    /// A completion arrived for a request that is no longer pending.
    #[error("Result of a cancelled or superseded request was ignored")]
    StaleCompletion,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Identifies one in-flight population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

/// A pending "get next page" population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRequest {
    id: RequestId,
    /// Offset of the first ticket to request.
    pub offset: u32,
    /// Number of tickets to request.
    pub page_size: u32,
}

impl LatestRequest {
    /// The request token.
    pub fn id(&self) -> RequestId {
        self.id
    }
}

/// A pending key search population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    id: RequestId,
    /// Extracted keys, in order of first appearance.
    pub keys: Vec<TicketKey>,
}

impl SearchRequest {
    /// The request token.
    pub fn id(&self) -> RequestId {
        self.id
    }
}

/// One page of latest tickets as the server sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestPage {
    /// Tickets with a recognized key, newest first.
    pub tickets: Vec<Ticket>,
    /// Number of issues in the server page, recognized or not.
    pub returned: u32,
}

impl From<Vec<Ticket>> for LatestPage {
    fn from(tickets: Vec<Ticket>) -> Self {
        let returned = tickets.len() as u32;
        Self { tickets, returned }
    }
}

/// What a search returned from the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Tickets the server resolved.
    pub found: Vec<Ticket>,
    /// Keys that do not exist or are not accessible.
    pub missing: Vec<TicketKey>,
}

/// Effect of a population on the ticket list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Number of tickets in the server result.
    pub fetched: usize,
    /// Tickets that were not in the list before.
    pub added: usize,
    /// Tickets already in the list whose content was refreshed.
    pub updated: usize,
    /// Unlocked tickets dropped because they were not in the result.
    pub evicted: usize,
    /// Server issues left out of the list, unrecognized or repeated keys.
    pub skipped: usize,
    /// Searched keys the server could not resolve.
    pub missing: Vec<TicketKey>,
}

/// Effect of a lock toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockSummary {
    /// Keys that became locked.
    pub locked: usize,
    /// Keys that became unlocked.
    pub unlocked: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PopulationKind {
    Latest,
    Search,
}

/// The session's ticket list.
#[derive(Debug)]
pub struct TicketStore {
    /// Tickets in display order, keys unique.
    entries: Vec<Ticket>,
    /// Locked keys in lock-insertion order.
    locked_keys: Vec<TicketKey>,
    /// Number of "latest" tickets fetched so far.
    cursor: u32,
    /// Keys of the last search, `None` after a "latest" population.
    last_query: Option<Vec<TicketKey>>,
    /// JIRA base URL used to build browse links.
    base_url: String,
    /// Highest fetch rank handed out so far.
    rank: u64,
    /// Population currently in flight.
    pending: Option<(RequestId, PopulationKind)>,
    next_request: u64,
}

impl TicketStore {
    /// Create an empty store.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            locked_keys: Vec::new(),
            cursor: 0,
            last_query: None,
            base_url: normalize_base_url(&base_url.into()),
            rank: 0,
            pending: None,
            next_request: 0,
        }
    }

    /// Point the list at the JIRA instance at `base_url`.
    ///
    /// Tickets, locks and paging belong to one instance, so a different
    /// instance empties the list and drops the pending request. Returns
    /// `true` if the instance changed.
    pub fn switch_instance(&mut self, base_url: &str) -> bool {
        let base_url = normalize_base_url(base_url);
        if base_url == self.base_url {
            return false;
        }
        debug!(from = %self.base_url, to = %base_url, "Switching JIRA instance");
        let (rank, next_request) = (self.rank, self.next_request);
        *self = Self::new(base_url);
        self.rank = rank;
        self.next_request = next_request;
        true
    }

    /// Page the latest tickets from the first one again.
    ///
    /// The list and its locks stay; only the paging position is reset.
    pub fn restart_paging(&mut self) {
        self.cursor = 0;
        self.last_query = None;
    }

    /// The JIRA base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Tickets in display order.
    pub fn entries(&self) -> &[Ticket] {
        &self.entries
    }

    /// Number of tickets in the list.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a ticket by key.
    pub fn get(&self, key: &TicketKey) -> Option<&Ticket> {
        self.entries.iter().find(|t| &t.key == key)
    }

    /// Whether a key is locked.
    pub fn is_locked(&self, key: &TicketKey) -> bool {
        self.locked_keys.contains(key)
    }

    /// Locked keys in lock order.
    pub fn locked_keys(&self) -> &[TicketKey] {
        &self.locked_keys
    }

    /// Number of "latest" tickets fetched so far.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Keys of the last search, if the last population was a search.
    pub fn last_query(&self) -> Option<&[TicketKey]> {
        self.last_query.as_deref()
    }

    /// Whether a fetch or search is in flight.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Start fetching the next page of latest tickets.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Busy` if another population is pending.
    pub fn begin_fetch_latest(&mut self) -> Result<LatestRequest> {
        let id = self.begin(PopulationKind::Latest)?;
        debug!(offset = self.cursor, "Starting latest fetch");
        Ok(LatestRequest {
            id,
            offset: self.cursor,
            page_size: PAGE_SIZE,
        })
    }

    /// Start a search for the ticket keys contained in `raw_text`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoKeysFound` if the text holds no key, or
    /// `StoreError::Busy` if another population is pending.
    pub fn begin_search(&mut self, raw_text: &str) -> Result<SearchRequest> {
        let keys = extract_keys(raw_text);
        if keys.is_empty() {
            return Err(StoreError::NoKeysFound);
        }
        let id = self.begin(PopulationKind::Search)?;
        debug!(keys = keys.len(), "Starting key search");
        Ok(SearchRequest { id, keys })
    }

    fn begin(&mut self, kind: PopulationKind) -> Result<RequestId> {
        if self.pending.is_some() {
            return Err(StoreError::Busy);
        }
        self.next_request += 1;
        let id = RequestId(self.next_request);
        self.pending = Some((id, kind));
        Ok(id)
    }

    /// Release a pending request without touching the list.
    ///
    /// Returns `false` if the request was not pending.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        match self.pending {
            Some((pending, _)) if pending == id => {
                debug!(?id, "Pending request released");
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    fn finish(&mut self, id: RequestId, kind: PopulationKind) -> Result<()> {
        match self.pending {
            Some((pending, pending_kind)) if pending == id && pending_kind == kind => {
                self.pending = None;
                Ok(())
            }
            _ => Err(StoreError::StaleCompletion),
        }
    }

    /// Merge a fetched page of latest tickets.
    ///
    /// Advances the cursor by the number of issues the server returned, so
    /// issues left out of `page.tickets` still count towards the offset.
    /// Unlocked tickets not in the page are evicted; an empty page is a
    /// valid result.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StaleCompletion` if `request` is not pending.
    pub fn complete_latest(
        &mut self,
        request: &LatestRequest,
        page: LatestPage,
    ) -> Result<MergeSummary> {
        self.finish(request.id, PopulationKind::Latest)?;

        let returned = page.returned.max(page.tickets.len() as u32);
        let tickets = dedup_by_key(page.tickets);
        let skipped = returned as usize - tickets.len();
        self.cursor += returned;
        self.last_query = None;

        let mut summary = self.repopulate(tickets, Vec::new());
        summary.skipped = skipped;
        debug!(
            cursor = self.cursor,
            added = summary.added,
            evicted = summary.evicted,
            skipped,
            "Merged latest page"
        );
        Ok(summary)
    }

    /// Merge the result of a key search.
    ///
    /// Only tickets whose key was requested are kept, ordered as the keys
    /// were extracted. Unlocked tickets outside the key set are evicted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StaleCompletion` if `request` is not pending.
    pub fn complete_search(
        &mut self,
        request: &SearchRequest,
        outcome: SearchOutcome,
    ) -> Result<MergeSummary> {
        self.finish(request.id, PopulationKind::Search)?;

        let mut found = dedup_by_key(outcome.found);
        found.retain(|t| request.keys.contains(&t.key));
        found.sort_by_key(|t| request.keys.iter().position(|k| k == &t.key));

        self.last_query = Some(request.keys.clone());

        let summary = self.repopulate(found, outcome.missing);
        debug!(
            added = summary.added,
            evicted = summary.evicted,
            missing = summary.missing.len(),
            "Merged search results"
        );
        Ok(summary)
    }

    /// Replace the unlocked part of the list with `fetched`.
    fn repopulate(&mut self, fetched: Vec<Ticket>, missing: Vec<TicketKey>) -> MergeSummary {
        let fetched_keys: HashSet<&TicketKey> = fetched.iter().map(|t| &t.key).collect();
        let before = self.entries.len();
        self.entries
            .retain(|t| t.locked || fetched_keys.contains(&t.key));
        let evicted = before - self.entries.len();

        // The first ticket of the result gets the highest rank, and every
        // rank is above all ranks handed out before.
        let count = fetched.len() as u64;
        let top = self.rank + count;
        let mut summary = MergeSummary {
            fetched: fetched.len(),
            evicted,
            missing,
            ..MergeSummary::default()
        };

        for (i, incoming) in fetched.into_iter().enumerate() {
            let rank = top - i as u64;
            match self.entries.iter_mut().find(|t| t.key == incoming.key) {
                Some(existing) => {
                    existing.refresh_from(incoming);
                    existing.fetch_order = rank;
                    summary.updated += 1;
                }
                None => {
                    let mut ticket = incoming;
                    ticket.locked = false;
                    ticket.fetch_order = rank;
                    self.entries.push(ticket);
                    summary.added += 1;
                }
            }
        }
        self.rank = top;

        self.sort_entries();
        summary
    }

    /// Toggle the lock of each distinct key.
    ///
    /// Locked keys are unlocked; unlocked keys are locked if they are in the
    /// list. Keys not in the list are ignored.
    pub fn toggle_lock(&mut self, keys: &[TicketKey]) -> LockSummary {
        let mut summary = LockSummary::default();
        let mut seen: HashSet<&TicketKey> = HashSet::new();

        for key in keys {
            if !seen.insert(key) {
                continue;
            }
            if let Some(pos) = self.locked_keys.iter().position(|k| k == key) {
                self.locked_keys.remove(pos);
                if let Some(ticket) = self.entries.iter_mut().find(|t| &t.key == key) {
                    ticket.locked = false;
                }
                summary.unlocked += 1;
            } else if let Some(ticket) = self.entries.iter_mut().find(|t| &t.key == key) {
                ticket.locked = true;
                self.locked_keys.push(key.clone());
                summary.locked += 1;
            } else {
                trace!(%key, "Ignoring lock toggle for unknown ticket");
            }
        }

        self.sort_entries();
        summary
    }

    /// Snapshot the selected tickets for export.
    pub fn select_export(&self, keys: &[TicketKey]) -> ExportRecord {
        self.select_export_at(keys, Local::now())
    }

    /// Snapshot the selected tickets for export at a given time.
    ///
    /// Lines follow display order regardless of selection order. Keys not in
    /// the list are skipped.
    pub fn select_export_at(&self, keys: &[TicketKey], at: DateTime<Local>) -> ExportRecord {
        let lines = self
            .entries
            .iter()
            .filter(|t| keys.contains(&t.key))
            .map(|t| ExportLine {
                key: t.key.clone(),
                locked: t.locked,
            })
            .collect();
        ExportRecord::new(lines, at)
    }

    /// Browse URLs for the selected keys, in selection order.
    pub fn select_open(&self, keys: &[TicketKey]) -> Vec<String> {
        let mut seen: HashSet<&TicketKey> = HashSet::new();
        keys.iter()
            .filter(|k| seen.insert(*k))
            .map(|k| browse_url(&self.base_url, k))
            .collect()
    }

    /// Attach loaded details to a ticket.
    ///
    /// Returns `false` if the ticket is no longer in the list.
    pub fn attach_details(&mut self, key: &TicketKey, details: TicketDetails) -> bool {
        match self.entries.iter_mut().find(|t| &t.key == key) {
            Some(ticket) => {
                ticket.description = details.description;
                ticket.conversation = Some(details.conversation);
                true
            }
            None => false,
        }
    }

    fn sort_entries(&mut self) {
        let locked = &self.locked_keys;
        self.entries.sort_by(|a, b| match (a.locked, b.locked) {
            (true, true) => {
                let pa = locked.iter().position(|k| k == &a.key);
                let pb = locked.iter().position(|k| k == &b.key);
                pa.cmp(&pb)
            }
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => b.fetch_order.cmp(&a.fetch_order),
        });
    }
}

/// The browse URL of a ticket.
pub fn browse_url(base_url: &str, key: &TicketKey) -> String {
    format!("{}/browse/{}", base_url.trim_end_matches('/'), key)
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn dedup_by_key(tickets: Vec<Ticket>) -> Vec<Ticket> {
    let mut seen: HashSet<TicketKey> = HashSet::new();
    tickets
        .into_iter()
        .filter(|t| seen.insert(t.key.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BASE: &str = "https://company.atlassian.net";

    fn key(s: &str) -> TicketKey {
        TicketKey::parse(s).unwrap()
    }

    fn keys(list: &[&str]) -> Vec<TicketKey> {
        list.iter().map(|s| key(s)).collect()
    }

    fn ticket(s: &str) -> Ticket {
        Ticket::new(key(s), format!("Title of {}", s), "")
    }

    fn page(start: u32, count: u32) -> Vec<Ticket> {
        (start..start + count)
            .map(|n| ticket(&format!("AAA-{}", 2000 - n)))
            .collect()
    }

    fn order(store: &TicketStore) -> Vec<String> {
        store.entries().iter().map(|t| t.key.to_string()).collect()
    }

    fn fetch(store: &mut TicketStore, tickets: Vec<Ticket>) -> MergeSummary {
        let request = store.begin_fetch_latest().unwrap();
        store.complete_latest(&request, tickets.into()).unwrap()
    }

    fn search(store: &mut TicketStore, text: &str, found: &[&str], missing: &[&str]) -> MergeSummary {
        let request = store.begin_search(text).unwrap();
        let outcome = SearchOutcome {
            found: found.iter().map(|s| ticket(s)).collect(),
            missing: keys(missing),
        };
        store.complete_search(&request, outcome).unwrap()
    }

    fn assert_invariants(store: &TicketStore) {
        let unique: HashSet<&TicketKey> = store.entries().iter().map(|t| &t.key).collect();
        assert_eq!(unique.len(), store.len(), "duplicate keys");

        for k in store.locked_keys() {
            let t = store.get(k).expect("locked key must be materialized");
            assert!(t.is_locked());
        }

        let first_unlocked = store
            .entries()
            .iter()
            .position(|t| !t.is_locked())
            .unwrap_or(store.len());
        assert!(store.entries()[first_unlocked..].iter().all(|t| !t.is_locked()));
        let locked_order: Vec<&TicketKey> =
            store.entries()[..first_unlocked].iter().map(|t| &t.key).collect();
        let expected: Vec<&TicketKey> = store.locked_keys().iter().collect();
        assert_eq!(locked_order, expected);

        let ranks: Vec<u64> = store.entries()[first_unlocked..]
            .iter()
            .map(|t| t.fetch_order())
            .collect();
        assert!(ranks.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = TicketStore::new(BASE);
        assert!(store.is_empty());
        assert_eq!(store.cursor(), 0);
        assert!(store.last_query().is_none());
        assert!(!store.is_busy());
    }

    #[test]
    fn test_fetch_latest_advances_cursor_and_keeps_server_order() {
        let mut store = TicketStore::new(BASE);
        let summary = fetch(&mut store, page(0, 10));

        assert_eq!(store.cursor(), 10);
        assert_eq!(summary.added, 10);
        assert_eq!(order(&store)[0], "AAA-2000");
        assert_eq!(order(&store)[9], "AAA-1991");
        assert_invariants(&store);
    }

    #[test]
    fn test_fetch_latest_short_page() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, page(0, 10));
        fetch(&mut store, page(10, 3));
        assert_eq!(store.cursor(), 13);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_locked_ticket_survives_next_page() {
        let mut store = TicketStore::new(BASE);
        let mut first = page(0, 9);
        first.insert(4, ticket("AAA-1111"));
        fetch(&mut store, first);
        assert_eq!(store.cursor(), 10);

        store.toggle_lock(&keys(&["AAA-1111"]));

        let summary = fetch(&mut store, page(10, 10));
        assert_eq!(store.cursor(), 20);
        assert_eq!(summary.evicted, 9);
        assert_eq!(store.len(), 11);

        let pinned = store.get(&key("AAA-1111")).unwrap();
        assert!(pinned.is_locked());
        assert_eq!(order(&store)[0], "AAA-1111");
        for old in page(0, 9) {
            assert!(store.get(&old.key).is_none());
        }
        assert_invariants(&store);
    }

    #[test]
    fn test_empty_page_is_success() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, page(0, 10));
        store.toggle_lock(&keys(&["AAA-2000"]));

        let summary = fetch(&mut store, Vec::new());
        assert_eq!(summary.fetched, 0);
        assert_eq!(store.cursor(), 10);
        assert_eq!(order(&store), vec!["AAA-2000"]);
        assert!(!store.is_busy());
    }

    #[test]
    fn test_fetch_clears_last_query() {
        let mut store = TicketStore::new(BASE);
        search(&mut store, "AAA-1", &["AAA-1"], &[]);
        assert!(store.last_query().is_some());
        fetch(&mut store, page(0, 2));
        assert!(store.last_query().is_none());
    }

    #[test]
    fn test_fetch_deduplicates_page() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1"), ticket("AAA-2"), ticket("AAA-1")]);
        assert_eq!(order(&store), vec!["AAA-1", "AAA-2"]);
        assert_eq!(store.cursor(), 2);
    }

    #[test]
    fn test_refetched_locked_ticket_keeps_position() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1"), ticket("AAA-2"), ticket("AAA-3")]);
        store.toggle_lock(&keys(&["AAA-3", "AAA-1"]));

        let mut refreshed = ticket("AAA-1");
        refreshed.title = "Renamed".to_string();
        fetch(&mut store, vec![ticket("AAA-9"), refreshed]);

        assert_eq!(order(&store), vec!["AAA-3", "AAA-1", "AAA-9"]);
        assert_eq!(store.get(&key("AAA-1")).unwrap().title, "Renamed");
        assert_invariants(&store);
    }

    #[test]
    fn test_search_extracts_keys_and_replaces_unlocked() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, page(0, 5));

        let summary = search(
            &mut store,
            "AAA-1234#$,   AAA-1248(*    AAA-1375wrw",
            &["AAA-1375", "AAA-1234", "AAA-1248"],
            &[],
        );

        assert_eq!(order(&store), vec!["AAA-1234", "AAA-1248", "AAA-1375"]);
        assert_eq!(summary.evicted, 5);
        assert_eq!(
            store.last_query().unwrap(),
            keys(&["AAA-1234", "AAA-1248", "AAA-1375"]).as_slice()
        );
        assert_invariants(&store);
    }

    #[test]
    fn test_search_concatenated_keys() {
        let mut store = TicketStore::new(BASE);
        let request = store.begin_search("AAA-1234AAA-1248AAA-1375").unwrap();
        assert_eq!(request.keys, keys(&["AAA-1234", "AAA-1248", "AAA-1375"]));
    }

    #[test]
    fn test_search_without_keys_is_rejected() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, page(0, 3));

        let err = store.begin_search("no tickets here!").unwrap_err();
        assert_eq!(err, StoreError::NoKeysFound);
        assert!(!store.is_busy());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_search_keeps_locked_outside_key_set() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1"), ticket("AAA-2")]);
        store.toggle_lock(&keys(&["AAA-2"]));

        search(&mut store, "BBB-1 BBB-2", &["BBB-1", "BBB-2"], &[]);

        assert_eq!(order(&store), vec!["AAA-2", "BBB-1", "BBB-2"]);
        assert!(store.get(&key("AAA-1")).is_none());
        assert_invariants(&store);
    }

    #[test]
    fn test_search_missing_keys_are_omitted() {
        let mut store = TicketStore::new(BASE);
        let summary = search(&mut store, "AAA-1 AAA-2 AAA-3", &["AAA-1", "AAA-3"], &["AAA-2"]);

        assert_eq!(order(&store), vec!["AAA-1", "AAA-3"]);
        assert_eq!(summary.missing, keys(&["AAA-2"]));
    }

    #[test]
    fn test_search_ignores_unrequested_tickets() {
        let mut store = TicketStore::new(BASE);
        search(&mut store, "AAA-1", &["AAA-1", "ZZZ-9"], &[]);
        assert_eq!(order(&store), vec!["AAA-1"]);
    }

    #[test]
    fn test_search_non_locked_set_equals_resolved_keys() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, page(0, 10));
        store.toggle_lock(&keys(&["AAA-2000", "AAA-1995"]));

        search(&mut store, "AAA-1995 CCC-1 CCC-2 CCC-3", &["AAA-1995", "CCC-1", "CCC-3"], &["CCC-2"]);

        let unlocked: Vec<String> = store
            .entries()
            .iter()
            .filter(|t| !t.is_locked())
            .map(|t| t.key.to_string())
            .collect();
        assert_eq!(unlocked, vec!["CCC-1", "CCC-3"]);
        assert!(store.is_locked(&key("AAA-2000")));
        assert!(store.is_locked(&key("AAA-1995")));
        assert_invariants(&store);
    }

    #[test]
    fn test_search_does_not_move_cursor() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, page(0, 10));
        search(&mut store, "AAA-1", &["AAA-1"], &[]);
        assert_eq!(store.cursor(), 10);
    }

    #[test]
    fn test_busy_rejects_second_population() {
        let mut store = TicketStore::new(BASE);
        let request = store.begin_fetch_latest().unwrap();

        assert_eq!(store.begin_fetch_latest().unwrap_err(), StoreError::Busy);
        assert_eq!(store.begin_search("AAA-1").unwrap_err(), StoreError::Busy);

        store.complete_latest(&request, page(0, 1).into()).unwrap();
        assert!(store.begin_search("AAA-1").is_ok());
    }

    #[test]
    fn test_cursor_counts_every_server_issue() {
        let mut store = TicketStore::new(BASE);

        // Ten issues, one of them under a key the list does not recognize
        let request = store.begin_fetch_latest().unwrap();
        let mixed = LatestPage {
            tickets: page(0, 9),
            returned: 10,
        };
        let summary = store.complete_latest(&request, mixed).unwrap();
        assert_eq!(store.cursor(), 10);
        assert_eq!(summary.fetched, 9);
        assert_eq!(summary.skipped, 1);

        store.toggle_lock(&keys(&["AAA-2000"]));

        let request = store.begin_fetch_latest().unwrap();
        assert_eq!(request.offset, 10);
        let unrecognized = LatestPage {
            tickets: Vec::new(),
            returned: 10,
        };
        let summary = store.complete_latest(&request, unrecognized).unwrap();
        assert_eq!(store.cursor(), 20);
        assert_eq!(summary.fetched, 0);
        assert_eq!(summary.skipped, 10);
        assert_eq!(order(&store), vec!["AAA-2000"]);

        let request = store.begin_fetch_latest().unwrap();
        assert_eq!(request.offset, 20);
    }

    #[test]
    fn test_cancel_leaves_store_untouched() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, page(0, 4));
        store.toggle_lock(&keys(&["AAA-1999"]));
        let before = order(&store);

        let request = store.begin_fetch_latest().unwrap();
        assert!(store.cancel(request.id()));

        assert!(!store.is_busy());
        assert_eq!(order(&store), before);
        assert_eq!(store.cursor(), 4);
        assert!(store.is_locked(&key("AAA-1999")));
    }

    #[test]
    fn test_stale_completion_is_rejected() {
        let mut store = TicketStore::new(BASE);
        let request = store.begin_fetch_latest().unwrap();
        store.cancel(request.id());

        let err = store.complete_latest(&request, page(0, 10).into()).unwrap_err();
        assert_eq!(err, StoreError::StaleCompletion);
        assert!(store.is_empty());
        assert_eq!(store.cursor(), 0);

        assert!(!store.cancel(request.id()));
    }

    #[test]
    fn test_completion_kind_must_match() {
        let mut store = TicketStore::new(BASE);
        let latest = store.begin_fetch_latest().unwrap();
        let forged = SearchRequest {
            id: latest.id(),
            keys: keys(&["AAA-1"]),
        };
        let err = store
            .complete_search(&forged, SearchOutcome::default())
            .unwrap_err();
        assert_eq!(err, StoreError::StaleCompletion);
        assert!(store.is_busy());
    }

    #[test]
    fn test_toggle_lock_locks_and_unlocks() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1"), ticket("AAA-2"), ticket("AAA-3")]);

        let summary = store.toggle_lock(&keys(&["AAA-3"]));
        assert_eq!(summary.locked, 1);
        assert_eq!(order(&store), vec!["AAA-3", "AAA-1", "AAA-2"]);

        let summary = store.toggle_lock(&keys(&["AAA-3"]));
        assert_eq!(summary.unlocked, 1);
        assert_eq!(order(&store), vec!["AAA-1", "AAA-2", "AAA-3"]);
    }

    #[test]
    fn test_toggle_lock_order_is_insertion_order() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1"), ticket("AAA-2"), ticket("AAA-3")]);

        store.toggle_lock(&keys(&["AAA-2"]));
        store.toggle_lock(&keys(&["AAA-3"]));
        store.toggle_lock(&keys(&["AAA-1"]));

        assert_eq!(order(&store), vec!["AAA-2", "AAA-3", "AAA-1"]);
        assert_invariants(&store);
    }

    #[test]
    fn test_toggle_lock_duplicate_keys_count_once() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1")]);

        let summary = store.toggle_lock(&keys(&["AAA-1", "AAA-1"]));
        assert_eq!(summary.locked, 1);
        assert!(store.is_locked(&key("AAA-1")));
    }

    #[test]
    fn test_toggle_lock_ignores_unknown_keys() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1")]);

        let summary = store.toggle_lock(&keys(&["ZZZ-1"]));
        assert_eq!(summary, LockSummary::default());
        assert!(store.locked_keys().is_empty());
    }

    #[test]
    fn test_unlocked_ticket_stays_until_repopulation() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1"), ticket("AAA-2")]);
        store.toggle_lock(&keys(&["AAA-1"]));
        fetch(&mut store, vec![ticket("AAA-5")]);
        assert!(store.get(&key("AAA-1")).is_some());

        store.toggle_lock(&keys(&["AAA-1"]));
        assert!(store.get(&key("AAA-1")).is_some());
        assert_eq!(order(&store), vec!["AAA-5", "AAA-1"]);

        fetch(&mut store, vec![ticket("AAA-6")]);
        assert!(store.get(&key("AAA-1")).is_none());
    }

    #[test]
    fn test_lock_parity_over_toggle_sequences() {
        let mut store = TicketStore::new(BASE);
        let all: Vec<Ticket> = (1..=6).map(|n| ticket(&format!("AAA-{}", n))).collect();
        fetch(&mut store, all.clone());

        let mut counts = [0usize; 6];
        let mut seed: u64 = 0x2545_f491;
        for _ in 0..200 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let a = ((seed >> 33) % 6) as usize;
            let b = ((seed >> 40) % 6) as usize;
            let mut batch = vec![all[a].key.clone()];
            counts[a] += 1;
            if b != a {
                batch.push(all[b].key.clone());
                counts[b] += 1;
            }
            store.toggle_lock(&batch);
            assert_invariants(&store);
        }

        for (i, t) in all.iter().enumerate() {
            assert_eq!(store.is_locked(&t.key), counts[i] % 2 == 1, "{}", t.key);
        }
    }

    #[test]
    fn test_select_export_is_side_effect_free() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1"), ticket("AAA-2"), ticket("AAA-3")]);
        store.toggle_lock(&keys(&["AAA-3"]));
        let before = order(&store);

        let selection = keys(&["AAA-1", "AAA-3"]);
        let first = store.select_export_at(&selection, Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        let second = store.select_export_at(&selection, Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 6).unwrap());

        assert_eq!(first.contents(), second.contents());
        assert_ne!(first.filename(), second.filename());
        assert_eq!(order(&store), before);
        assert_eq!(store.locked_keys(), keys(&["AAA-3"]).as_slice());
    }

    #[test]
    fn test_select_export_follows_display_order() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1"), ticket("AAA-2"), ticket("AAA-3")]);
        store.toggle_lock(&keys(&["AAA-3"]));

        let record = store.select_export(&keys(&["AAA-1", "AAA-3", "ZZZ-1"]));
        assert_eq!(record.contents(), "*AAA-3\nAAA-1\n");
        assert_eq!(record.len(), 2);
        assert!(record.filename().ends_with("_2.txt"));
    }

    #[test]
    fn test_select_open_builds_urls_in_selection_order() {
        let mut store = TicketStore::new("https://company.atlassian.net/");
        fetch(&mut store, vec![ticket("AAA-1"), ticket("AAA-2")]);

        let urls = store.select_open(&keys(&["AAA-2", "AAA-1", "AAA-2"]));
        assert_eq!(
            urls,
            vec![
                "https://company.atlassian.net/browse/AAA-2",
                "https://company.atlassian.net/browse/AAA-1",
            ]
        );
    }

    #[test]
    fn test_switch_instance_normalizes_url() {
        let mut store = TicketStore::new("https://jira.example.com");
        assert!(!store.switch_instance("https://jira.example.com//"));
        assert_eq!(store.base_url(), "https://jira.example.com");
    }

    #[test]
    fn test_switch_instance_clears_list_and_paging() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, page(0, 3));
        store.toggle_lock(&keys(&["AAA-1999"]));
        let stale = store.begin_fetch_latest().unwrap();

        assert!(store.switch_instance("https://other.atlassian.net"));
        assert!(store.is_empty());
        assert!(store.locked_keys().is_empty());
        assert_eq!(store.cursor(), 0);
        assert!(!store.is_busy());
        assert_eq!(
            store.select_open(&keys(&["AAA-1999"])),
            vec!["https://other.atlassian.net/browse/AAA-1999".to_string()]
        );

        // A result for the old instance no longer applies
        let err = store.complete_latest(&stale, page(0, 3).into()).unwrap_err();
        assert_eq!(err, StoreError::StaleCompletion);
        let fresh = store.begin_fetch_latest().unwrap();
        assert_ne!(fresh.id(), stale.id());
        assert_eq!(fresh.offset, 0);
    }

    #[test]
    fn test_restart_paging_keeps_locks() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, page(0, 3));
        store.toggle_lock(&keys(&["AAA-1999"]));

        store.restart_paging();
        assert_eq!(store.cursor(), 0);
        assert_eq!(store.len(), 3);
        assert!(store.is_locked(&key("AAA-1999")));
    }

    #[test]
    fn test_attach_details() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1")]);

        let details = TicketDetails {
            description: "Resolved @Ann".to_string(),
            conversation: vec![],
        };
        assert!(store.attach_details(&key("AAA-1"), details.clone()));
        let t = store.get(&key("AAA-1")).unwrap();
        assert_eq!(t.description, "Resolved @Ann");
        assert!(t.has_details());

        assert!(!store.attach_details(&key("AAA-9"), details));
    }

    #[test]
    fn test_details_survive_refetch() {
        let mut store = TicketStore::new(BASE);
        fetch(&mut store, vec![ticket("AAA-1")]);
        store.attach_details(
            &key("AAA-1"),
            TicketDetails {
                description: "desc".to_string(),
                conversation: vec![],
            },
        );
        fetch(&mut store, vec![ticket("AAA-1")]);
        assert!(store.get(&key("AAA-1")).unwrap().has_details());
    }
}
