//! In-memory record store.
//!
//! `MemoryStore` is the reference implementation of the record-store
//! contract: replace-all, count, find, bulk update by id and delete-all.
//! Records are kept in insertion order, which is the natural order queries
//! fall back to.

use crate::{
    query::{self, Page, PageRequest, SearchFilter, Sort},
    Book, BookFields, RecordId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of a bulk update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResult {
    /// Updates whose id was found
    pub matched_count: u64,
    /// Updates that actually changed a stored value
    pub modified_count: u64,
}

/// Records kept in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<Book>,
    index: HashMap<RecordId, usize>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding existing records. Later duplicates of an id
    /// are dropped.
    pub fn from_records(records: impl IntoIterator<Item = Book>) -> Self {
        let mut store = Self::new();
        for record in records {
            if !store.index.contains_key(&record.id) {
                store.index.insert(record.id.clone(), store.records.len());
                store.records.push(record);
            }
        }
        store
    }

    /// Replace every record with freshly-identified ones.
    ///
    /// Returns the inserted records in input order.
    pub fn replace_all(&mut self, rows: Vec<BookFields>) -> Vec<Book> {
        self.records = rows.into_iter().map(Book::with_new_id).collect();
        self.reindex();
        self.records.clone()
    }

    /// Count records matching `filter`.
    pub fn count(&self, filter: &SearchFilter) -> u64 {
        query::count(&self.records, filter)
    }

    /// Matching records, ordered and sliced.
    pub fn find(
        &self,
        filter: &SearchFilter,
        sort: Option<Sort>,
        skip: u64,
        limit: u64,
    ) -> Vec<Book> {
        query::select(&self.records, filter, sort, skip, limit)
    }

    /// Serve one page: the matching slice plus the total count.
    pub fn query(&self, request: &PageRequest) -> Page {
        query::run(&self.records, request)
    }

    /// Overwrite each listed record's fields by id.
    ///
    /// Each update is independent. Unknown ids are skipped and do not count
    /// as matched; an update that leaves the values unchanged is matched
    /// but not modified. A repeated id is matched once per update.
    pub fn bulk_update_by_id(&mut self, updates: &[Book]) -> BulkUpdateResult {
        let mut result = BulkUpdateResult::default();
        for update in updates {
            let Some(&position) = self.index.get(&update.id) else {
                continue;
            };
            result.matched_count += 1;
            let stored = &mut self.records[position];
            if stored.fields != update.fields {
                stored.fields = update.fields.clone();
                result.modified_count += 1;
            }
        }
        result
    }

    /// Remove every record. Returns how many were removed.
    pub fn delete_all(&mut self) -> u64 {
        let removed = self.records.len() as u64;
        self.records.clear();
        self.index.clear();
        removed
    }

    /// Get a record by id.
    pub fn get(&self, id: &str) -> Option<&Book> {
        self.index.get(id).map(|&position| &self.records[position])
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[Book] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.id.clone(), position))
            .collect();
    }
}
