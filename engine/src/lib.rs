//! # Booktable Engine
//!
//! The edit-reconciliation engine behind a paged, searchable, editable book
//! table.
//!
//! This crate holds the logic only. It parses and normalizes CSV uploads,
//! answers paged queries deterministically, and tracks local edits against
//! a baseline snapshot so that a save sends exactly the records that changed.
//!
//! ## Design Principles
//!
//! - **No IO**: networking and persistence live in the server and client crates
//! - **Deterministic**: the same query over the same records returns the same page
//! - **Explicit state**: edits live in a [`PageSession`], never in globals
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Book`] has a store-assigned id and five [`Field`]s: title, author,
//! genre, publishedYear and isbn.
//!
//! ### Import
//!
//! [`ImportBatch::prepare`] validates a whole upload before anything is
//! written; [`ImportBatch::commit`] then replaces the entire store.
//!
//! ### Queries
//!
//! A [`PageRequest`] carries page, limit, optional [`Sort`] and search text.
//! Ties and unsorted queries fall back to insertion order.
//!
//! ### Reconciliation
//!
//! A [`PageSession`] keeps the fetched baseline next to the working set.
//! Dirtiness is decided by comparing string forms of each field, and
//! [`PageSession::begin_save`] yields the minimal changeset.
//!
//! ## Quick Start
//!
//! ```rust
//! use booktable_engine::{
//!     Field, ImportBatch, MemoryStore, PageRequest, PageSession, SaveStart,
//! };
//!
//! // 1. Import a CSV upload (replaces the whole store)
//! let mut store = MemoryStore::new();
//! let batch = ImportBatch::prepare(b"Title,Author,PublishedYear\nDune,Herbert,1965\n").unwrap();
//! assert_eq!(batch.commit(&mut store).inserted_count, 1);
//!
//! // 2. Fetch a page into a session
//! let request = PageRequest::new(1, 10).unwrap();
//! let mut session = PageSession::from_page(request.clone(), store.query(&request));
//! let id = session.working()[0].id.clone();
//!
//! // 3. Edit locally and save only what changed
//! session.edit(&id, Field::Title, "Dune Messiah").unwrap();
//! let SaveStart::Submit(changes) = session.begin_save().unwrap() else { unreachable!() };
//! let result = store.bulk_update_by_id(&changes);
//! assert_eq!(result.modified_count, 1);
//!
//! // 4. Reconcile with the store
//! let refetch = session.complete_save(result);
//! session.load(refetch.clone(), store.query(&refetch));
//! assert!(!session.is_dirty(&id));
//! ```

pub mod error;
pub mod export;
pub mod import;
pub mod query;
pub mod record;
pub mod session;
pub mod store;

// Re-export main types at crate root
pub use error::{Error, ErrorKind};
pub use export::to_csv;
pub use import::{ImportBatch, ImportSummary, RawRow};
pub use query::{Page, PageParams, PageRequest, SearchFilter, Sort, SortDir};
pub use record::{Book, BookFields, Field, Value};
pub use session::{
    changeset, is_dirty, reset_to_baseline, Baseline, FetchOutcome, FetchTicket, PageSession,
    SaveStart, SessionState,
};
pub use store::{BulkUpdateResult, MemoryStore};

/// Opaque, store-assigned record identifier.
pub type RecordId = String;
