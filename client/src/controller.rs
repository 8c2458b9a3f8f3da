//! Page controller: one visible page, its edits, and the fetches and saves
//! that keep it in step with the store.
//!
//! Search, sort and limit changes go back to page 1 and are debounced into a
//! single fetch; page changes and refreshes fetch immediately. Every fetch
//! takes a ticket from the session, so a slow response that arrives after a
//! newer one is dropped instead of overwriting it.

use crate::error::{ClientError, Result};
use crate::source::BookSource;
use booktable_engine::{
    Book, BulkUpdateResult, FetchOutcome, Field, ImportBatch, ImportSummary, PageRequest,
    PageSession, SaveStart, SessionState, Sort, Value,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default quiescence window before a parameter change is fetched.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Controller tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// How long parameter changes must settle before fetching
    pub debounce: Duration,
    /// Page size of the first request
    pub default_limit: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            default_limit: booktable_engine::query::DEFAULT_LIMIT,
        }
    }
}

struct Shared<S> {
    source: S,
    session: Mutex<PageSession>,
    /// Parameters the next fetch will use
    desired: Mutex<PageRequest>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: BookSource> Shared<S> {
    fn session(&self) -> MutexGuard<'_, PageSession> {
        lock(&self.session)
    }

    fn desired(&self) -> PageRequest {
        lock(&self.desired).clone()
    }

    fn set_desired(&self, request: PageRequest) {
        *lock(&self.desired) = request;
    }

    /// Fetch `request` and apply it if no newer fetch was issued meanwhile.
    async fn fetch(&self, request: PageRequest) -> Result<()> {
        let ticket = self.session().issue_fetch();
        tracing::debug!(
            ticket = ticket.sequence(),
            page = request.page(),
            limit = request.limit(),
            search = request.filter().text(),
            "Fetching page"
        );

        match self.source.list_page(&request).await {
            Ok(page) => {
                let total = page.total;
                match self.session().accept_fetch(ticket, request, page) {
                    FetchOutcome::Applied => {
                        tracing::debug!(ticket = ticket.sequence(), total, "Page loaded")
                    }
                    FetchOutcome::Stale => {
                        tracing::debug!(ticket = ticket.sequence(), "Discarded stale page")
                    }
                    FetchOutcome::Deferred => {
                        tracing::debug!(ticket = ticket.sequence(), "Page held back during save")
                    }
                }
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                if self.session().fetch_failed(ticket, message.as_str()) {
                    tracing::warn!("Fetch failed: {}", message);
                    Err(ClientError::Fetch(message))
                } else {
                    tracing::debug!(ticket = ticket.sequence(), "Discarded stale fetch error");
                    Ok(())
                }
            }
        }
    }
}

/// Drives a [`PageSession`] against a [`BookSource`].
pub struct PageController<S: BookSource> {
    shared: Arc<Shared<S>>,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<S: BookSource> PageController<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, ControllerConfig::default())
    }

    pub fn with_config(source: S, config: ControllerConfig) -> Self {
        let request = PageRequest::first()
            .with_limit(config.default_limit)
            .unwrap_or_else(|_| PageRequest::first());
        Self {
            shared: Arc::new(Shared {
                source,
                session: Mutex::new(PageSession::new(request.clone())),
                desired: Mutex::new(request),
            }),
            debounce: config.debounce,
            pending: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.shared.source
    }

    /// Read the session under its lock.
    pub fn with_session<R>(&self, f: impl FnOnce(&PageSession) -> R) -> R {
        f(&self.shared.session())
    }

    /// Records currently shown, edits included.
    pub fn working(&self) -> Vec<Book> {
        self.with_session(|session| session.working().to_vec())
    }

    pub fn total(&self) -> u64 {
        self.with_session(|session| session.total())
    }

    pub fn state(&self) -> SessionState {
        self.with_session(|session| session.state())
    }

    pub fn last_error(&self) -> Option<String> {
        self.with_session(|session| session.last_error().map(str::to_string))
    }

    pub fn is_loading(&self) -> bool {
        self.with_session(|session| session.is_loading())
    }

    /// Request behind the page currently shown.
    pub fn current_request(&self) -> PageRequest {
        self.with_session(|session| session.request().clone())
    }

    /// Request the next fetch will use. Differs from
    /// [`current_request`](Self::current_request) while a change is pending.
    pub fn pending_request(&self) -> PageRequest {
        self.shared.desired()
    }

    // ------------------------------------------------------------------
    // Query parameters
    // ------------------------------------------------------------------

    /// Change the search text. Debounced; resets to page 1.
    pub fn set_search(&self, text: impl Into<String>) {
        let request = first_page(self.shared.desired().with_search(text));
        self.schedule(request);
    }

    /// Change or clear the sort. Debounced; resets to page 1.
    pub fn set_sort(&self, sort: Option<Sort>) {
        let request = first_page(self.shared.desired().with_sort(sort));
        self.schedule(request);
    }

    /// Sort by `field`, flipping the direction when it is already the key.
    pub fn toggle_sort(&self, field: Field) {
        let sort = match self.shared.desired().sort() {
            Some(current) if current.field == field => Sort {
                field,
                dir: current.dir.flipped(),
            },
            _ => Sort::asc(field),
        };
        self.set_sort(Some(sort));
    }

    /// Change the page size. Debounced; resets to page 1.
    pub fn set_limit(&self, limit: u64) -> Result<()> {
        let request = first_page(self.shared.desired().with_limit(limit)?);
        self.schedule(request);
        Ok(())
    }

    /// Go to `page` right away, dropping any pending debounced change's
    /// delay but keeping its parameters.
    pub async fn set_page(&self, page: u64) -> Result<()> {
        let request = self.shared.desired().with_page(page)?;
        self.cancel_pending();
        self.shared.set_desired(request.clone());
        self.shared.fetch(request).await
    }

    /// Fetch the pending parameters now.
    pub async fn refresh(&self) -> Result<()> {
        self.cancel_pending();
        self.shared.fetch(self.shared.desired()).await
    }

    /// Wait for a scheduled debounced fetch, if any, to finish.
    pub async fn flush(&self) {
        let handle = lock(&self.pending).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::error!("Debounced fetch panicked: {}", e);
                }
            }
        }
    }

    fn schedule(&self, request: PageRequest) {
        self.shared.set_desired(request.clone());

        let shared = Arc::clone(&self.shared);
        let delay = self.debounce;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // the error is already recorded on the session
            let _ = shared.fetch(request).await;
        });

        if let Some(previous) = lock(&self.pending).replace(task) {
            previous.abort();
        }
    }

    /// Abort a scheduled fetch. Returns whether one was still pending.
    fn cancel_pending(&self) -> bool {
        match lock(&self.pending).take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    /// Edit one field of one shown record. Returns whether it is dirty.
    pub fn edit(&self, id: &str, field: Field, value: impl Into<Value>) -> Result<bool> {
        Ok(self.shared.session().edit(id, field, value)?)
    }

    /// Discard all local edits.
    pub fn reset(&self) -> Result<()> {
        Ok(self.shared.session().reset()?)
    }

    pub fn is_dirty(&self, id: &str) -> bool {
        self.with_session(|session| session.is_dirty(id))
    }

    pub fn has_changes(&self) -> bool {
        self.with_session(|session| session.has_changes())
    }

    /// Records that would be sent by [`save`](Self::save).
    pub fn changeset(&self) -> Vec<Book> {
        self.with_session(|session| session.changeset())
    }

    // ------------------------------------------------------------------
    // Store writes
    // ------------------------------------------------------------------

    /// Send the changeset, then re-fetch the page from the store.
    ///
    /// With nothing to send the source is not called. On failure the edits
    /// stay in place and the session is left in `SaveFailed`; a page fetched
    /// during the save is not shown until the next refresh.
    ///
    /// Once the store accepted the changes the result is returned even if the
    /// re-fetch fails. That failure is recorded in
    /// [`last_error`](Self::last_error).
    pub async fn save(&self) -> Result<BulkUpdateResult> {
        let start = self
            .shared
            .session()
            .begin_save()
            .map_err(|e| ClientError::Save(e.to_string()))?;
        let changes = match start {
            SaveStart::NoChanges => {
                tracing::debug!("Nothing to save");
                return Ok(BulkUpdateResult::default());
            }
            SaveStart::Submit(changes) => changes,
        };

        tracing::debug!("Saving {} changed record(s)", changes.len());
        match self.shared.source.save_changes(&changes).await {
            Ok(result) => {
                let refetch = self.shared.session().complete_save(result);
                tracing::info!(
                    matched = result.matched_count,
                    modified = result.modified_count,
                    "Saved changes"
                );
                // a debounced change since the save started takes priority
                let request = if self.cancel_pending() {
                    self.shared.desired()
                } else {
                    refetch
                };
                self.shared.set_desired(request.clone());
                if self.shared.fetch(request).await.is_err() {
                    tracing::warn!("Saved changes but could not re-fetch the page");
                }
                Ok(result)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Save failed: {}", message);
                self.shared.session().fail_save(message.as_str());
                match e {
                    ClientError::PartialSave { .. } => Err(e),
                    _ => Err(ClientError::Save(message)),
                }
            }
        }
    }

    /// Upload a CSV that replaces the whole store, then show its first page.
    ///
    /// The upload is validated locally first; a rejected file never reaches
    /// the source.
    pub async fn import_csv(&self, bytes: Vec<u8>) -> Result<ImportSummary> {
        let batch = ImportBatch::prepare(&bytes)?;
        tracing::debug!("Uploading {} row(s)", batch.len());

        let summary = self
            .shared
            .source
            .import_csv(bytes)
            .await
            .map_err(|e| ClientError::Import(e.to_string()))?;
        tracing::info!(inserted = summary.inserted_count, "Import replaced the store");

        self.cancel_pending();
        let request = first_page(self.shared.desired());
        self.shared.set_desired(request.clone());
        self.shared.fetch(request).await?;
        Ok(summary)
    }

    /// The shown records, edits included, as CSV.
    pub fn export_csv(&self) -> Result<String> {
        Ok(self.with_session(|session| booktable_engine::to_csv(session.working()))?)
    }
}

impl<S: BookSource> Drop for PageController<S> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

fn first_page(request: PageRequest) -> PageRequest {
    let fallback = request.clone();
    request.with_page(1).unwrap_or(fallback)
}
