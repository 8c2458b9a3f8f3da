//! Reconciliation session for one visible page.
//!
//! A [`PageSession`] holds the baseline (last values fetched from the store)
//! and the working set (the editable copy) for the current page. It is the
//! only place edits live; there is no global state.
//!
//! # Lifecycle
//!
//! ```text
//!   load ──► Clean ──edit──► Edited ──begin_save──► Saving ──complete_save──► Clean
//!              ▲               │                      │
//!              └────reset──────┘                      └──fail_save──► SaveFailed
//! ```
//!
//! A page that arrives while a save is outstanding is not applied: the
//! working set holds the records being saved. Its request is remembered and
//! returned by [`PageSession::complete_save`] as the one to re-fetch.
//!
//! Dirtiness is lexical: a field is dirty when its string form differs from
//! the baseline's string form (`null` is `""`). So `0` and `"0"` are the same
//! and `0` and `null` are not.
//!
//! Saves are not version checked. Whatever is stored for a touched id is
//! overwritten, so two sessions editing the same record resolve as
//! last-writer-wins with no conflict reported.

use crate::{
    error::Result,
    query::{Page, PageRequest},
    store::BulkUpdateResult,
    Book, BookFields, Error, Field, RecordId, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Last-persisted values of the records on the current page, by id.
///
/// Replaced wholesale on every load; never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    records: HashMap<RecordId, BookFields>,
}

impl Baseline {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Book>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|book| (book.id.clone(), book.fields.clone()))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&BookFields> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn promote(&mut self, book: &Book) {
        if let Some(fields) = self.records.get_mut(&book.id) {
            *fields = book.fields.clone();
        }
    }
}

/// Whether a working record differs from its baseline. A record with no
/// baseline entry is dirty.
pub fn is_dirty(record: &Book, baseline: &Baseline) -> bool {
    baseline
        .get(&record.id)
        .map_or(true, |original| record.fields.differs_from(original))
}

/// The dirty records of a working set, in working-set order.
pub fn changeset(working: &[Book], baseline: &Baseline) -> Vec<Book> {
    working
        .iter()
        .filter(|record| is_dirty(record, baseline))
        .cloned()
        .collect()
}

/// A working set with every record restored to its baseline value.
///
/// Records with no baseline entry are kept as they are.
pub fn reset_to_baseline(working: &[Book], baseline: &Baseline) -> Vec<Book> {
    working
        .iter()
        .map(|record| match baseline.get(&record.id) {
            Some(original) => Book::new(record.id.clone(), original.clone()),
            None => record.clone(),
        })
        .collect()
}

/// Where a session is in its edit/save cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Clean,
    Edited,
    Saving,
    SaveFailed,
}

/// Sequence number of a fetch. Only the most recently issued ticket may
/// replace the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// What [`PageSession::accept_fetch`] did with a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page replaced baseline and working set.
    Applied,
    /// A newer fetch was issued; the page was dropped.
    Stale,
    /// A save is outstanding; the page was dropped and its request kept.
    Deferred,
}

/// What [`PageSession::begin_save`] decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStart {
    /// Nothing differs from the baseline; no store write is needed.
    NoChanges,
    /// Send exactly these records as one bulk update.
    Submit(Vec<Book>),
}

/// Baseline, working set and save state for the visible page.
#[derive(Debug, Clone, Default)]
pub struct PageSession {
    request: PageRequest,
    baseline: Baseline,
    working: Vec<Book>,
    total: u64,
    state: SessionState,
    last_error: Option<String>,
    last_save: Option<BulkUpdateResult>,
    /// Records handed out by the outstanding save
    submitted: Vec<Book>,
    /// Request of a page dropped because it arrived mid-save
    superseded: Option<PageRequest>,
    /// Highest ticket issued so far
    issued: u64,
    in_flight: Option<FetchTicket>,
}

impl PageSession {
    /// An empty session that will show `request` once loaded.
    pub fn new(request: PageRequest) -> Self {
        Self {
            request,
            ..Default::default()
        }
    }

    /// A session populated from a fetched page.
    pub fn from_page(request: PageRequest, page: Page) -> Self {
        let mut session = Self::new(request.clone());
        session.load(request, page);
        session
    }

    /// Replace baseline and working set with a freshly fetched page.
    ///
    /// Any local edits are discarded. While a save is outstanding nothing is
    /// replaced; only `request` is remembered. Returns whether the page was
    /// applied.
    pub fn load(&mut self, request: PageRequest, page: Page) -> bool {
        if self.state == SessionState::Saving {
            self.superseded = Some(request);
            return false;
        }
        self.baseline = Baseline::from_records(&page.records);
        self.working = page.records;
        self.total = page.total;
        self.request = request;
        self.superseded = None;
        self.state = SessionState::Clean;
        self.last_error = None;
        true
    }

    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    pub fn working(&self) -> &[Book] {
        &self.working
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Message of the last failed save or fetch, until the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Result of the last successful bulk update.
    pub fn last_save(&self) -> Option<BulkUpdateResult> {
        self.last_save
    }

    /// Request of a page that arrived during a save and was not applied.
    pub fn superseded(&self) -> Option<&PageRequest> {
        self.superseded.as_ref()
    }

    pub fn record(&self, id: &str) -> Option<&Book> {
        self.working.iter().find(|record| record.id == id)
    }

    /// Set one field of one working record. Returns whether the record is
    /// dirty afterwards.
    pub fn edit(&mut self, id: &str, field: Field, value: impl Into<Value>) -> Result<bool> {
        if self.state == SessionState::Saving {
            return Err(Error::SaveInProgress);
        }
        let record = self
            .working
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        record.fields.set(field, value.into())?;
        let dirty = is_dirty(record, &self.baseline);
        self.state = SessionState::Edited;
        Ok(dirty)
    }

    pub fn is_dirty(&self, id: &str) -> bool {
        self.record(id)
            .is_some_and(|record| is_dirty(record, &self.baseline))
    }

    /// Fields of a record that differ from its baseline.
    pub fn dirty_fields(&self, id: &str) -> Vec<Field> {
        match (self.record(id), self.baseline.get(id)) {
            (Some(record), Some(original)) => record.fields.diff(original),
            (Some(_), None) => Field::ALL.to_vec(),
            (None, _) => Vec::new(),
        }
    }

    pub fn changeset(&self) -> Vec<Book> {
        changeset(&self.working, &self.baseline)
    }

    pub fn has_changes(&self) -> bool {
        self.working
            .iter()
            .any(|record| is_dirty(record, &self.baseline))
    }

    /// Discard every local edit without contacting the store.
    pub fn reset(&mut self) -> Result<()> {
        if self.state == SessionState::Saving {
            return Err(Error::SaveInProgress);
        }
        self.working = reset_to_baseline(&self.working, &self.baseline);
        self.state = SessionState::Clean;
        self.last_error = None;
        Ok(())
    }

    /// Start a save. Also used to retry after a failure.
    pub fn begin_save(&mut self) -> Result<SaveStart> {
        if self.state == SessionState::Saving {
            return Err(Error::SaveInProgress);
        }
        let changes = self.changeset();
        if changes.is_empty() {
            self.state = SessionState::Clean;
            self.last_error = None;
            return Ok(SaveStart::NoChanges);
        }
        self.state = SessionState::Saving;
        self.submitted = changes.clone();
        Ok(SaveStart::Submit(changes))
    }

    /// The bulk update went through.
    ///
    /// Submitted values become the baseline, so the saved records are clean
    /// straight away. Returns the request to re-fetch: the store is the
    /// authority on what was actually written. That is the request of a page
    /// dropped during the save, if any, else the one currently shown.
    pub fn complete_save(&mut self, result: BulkUpdateResult) -> PageRequest {
        for book in std::mem::take(&mut self.submitted) {
            self.baseline.promote(&book);
        }
        self.state = SessionState::Clean;
        self.last_error = None;
        self.last_save = Some(result);
        self.superseded
            .take()
            .unwrap_or_else(|| self.request.clone())
    }

    /// The bulk update failed. Edits stay in the working set for a retry,
    /// and a page dropped during the save stays unapplied.
    pub fn fail_save(&mut self, message: impl Into<String>) {
        self.submitted.clear();
        self.state = SessionState::SaveFailed;
        self.last_error = Some(message.into());
    }

    /// Issue a ticket for a new fetch, superseding any outstanding one.
    pub fn issue_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        let ticket = FetchTicket(self.issued);
        self.in_flight = Some(ticket);
        ticket
    }

    /// Whether `ticket` is the most recently issued one.
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 == self.issued
    }

    /// Whether the latest fetch has not finished yet.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Apply a fetched page if its ticket is still current.
    pub fn accept_fetch(
        &mut self,
        ticket: FetchTicket,
        request: PageRequest,
        page: Page,
    ) -> FetchOutcome {
        if !self.is_current(ticket) {
            return FetchOutcome::Stale;
        }
        self.in_flight = None;
        if self.load(request, page) {
            FetchOutcome::Applied
        } else {
            FetchOutcome::Deferred
        }
    }

    /// Record a failed fetch. The working set keeps its prior state.
    pub fn fetch_failed(&mut self, ticket: FetchTicket, message: impl Into<String>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        self.last_error = Some(message.into());
        true
    }
}
