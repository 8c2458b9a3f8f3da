//! Edge case tests for booktable-engine
//!
//! These tests drive the store, the query engine and the session together.

use booktable_engine::{
    Book, BookFields, Error, Field, ImportBatch, MemoryStore, PageRequest, PageSession,
    SaveStart, SessionState, Sort,
};

fn book(id: &str, title: &str, year: Option<i64>) -> Book {
    Book::new(
        id,
        BookFields {
            title: title.into(),
            published_year: year,
            ..Default::default()
        },
    )
}

fn two_book_store() -> MemoryStore {
    MemoryStore::from_records(vec![book("1", "A", Some(1990)), book("2", "B", Some(2000))])
}

fn ids(records: &[Book]) -> Vec<&str> {
    records.iter().map(|b| b.id.as_str()).collect()
}

// ============================================================================
// Query Scenarios
// ============================================================================

#[test]
fn sort_by_year_desc_scenario() {
    let store = two_book_store();
    let request = PageRequest::new(1, 10)
        .unwrap()
        .with_sort(Some(Sort::desc(Field::PublishedYear)))
        .with_search("");
    let page = store.query(&request);

    assert_eq!(ids(&page.records), vec!["2", "1"]);
    assert_eq!(page.total, 2);
}

#[test]
fn search_without_matches_is_empty_not_error() {
    let store = two_book_store();
    let page = store.query(&PageRequest::new(1, 10).unwrap().with_search("xyz"));
    assert!(page.records.is_empty());
    assert_eq!(page.total, 0);
}

#[test]
fn total_is_invariant_under_page_and_limit() {
    let store = MemoryStore::from_records(
        (0..23).map(|i| book(&i.to_string(), &format!("title {}", i % 3), None)),
    );
    let mut totals = Vec::new();
    for limit in [1, 5, 10, 50] {
        for page in [1, 2, 7] {
            let request = PageRequest::new(page, limit).unwrap().with_search("title 1");
            totals.push(store.query(&request).total);
        }
    }
    assert!(totals.iter().all(|t| *t == totals[0]));
    assert_eq!(totals[0], 8);
}

#[test]
fn repeated_queries_return_identical_pages() {
    let store = MemoryStore::from_records(
        (0..10).map(|i| book(&i.to_string(), if i % 2 == 0 { "same" } else { "other" }, None)),
    );
    let request = PageRequest::new(1, 3)
        .unwrap()
        .with_sort(Some(Sort::asc(Field::Title)));
    let first = store.query(&request);
    let second = store.query(&request);
    assert_eq!(first, second);
    assert_eq!(ids(&first.records), vec!["1", "3", "5"]);
}

#[test]
fn unicode_search_is_case_insensitive() {
    let store = MemoryStore::from_records(vec![book("1", "ÉCOLE des femmes", None)]);
    let page = store.query(&PageRequest::new(1, 10).unwrap().with_search("école"));
    assert_eq!(page.total, 1);
}

// ============================================================================
// Import Scenarios
// ============================================================================

#[test]
fn import_replaces_two_records_with_one() {
    let mut store = two_book_store();
    let batch = ImportBatch::prepare(b"Title,PublishedYear\nX,2005\n").unwrap();
    let summary = batch.commit(&mut store);

    assert_eq!(summary.inserted_count, 1);
    assert_eq!(store.len(), 1);
    assert_eq!(
        store.records()[0].fields,
        BookFields {
            title: "X".into(),
            author: "".into(),
            genre: "".into(),
            published_year: Some(2005),
            isbn: "".into(),
        }
    );
}

#[test]
fn header_only_upload_is_rejected() {
    let mut store = two_book_store();
    let result = ImportBatch::prepare(b"Title,Author\n").map(|batch| batch.commit(&mut store));
    assert_eq!(result, Err(Error::EmptyImport));
    assert_eq!(store.len(), 2);
}

#[test]
fn non_numeric_year_imports_as_null() {
    let batch = ImportBatch::prepare(b"title,publishedYear\nA,unknown\n").unwrap();
    assert_eq!(batch.rows()[0].published_year, None);
}

// ============================================================================
// Reconciliation Scenarios
// ============================================================================

#[test]
fn edit_then_save_sends_one_entry_and_refreshes_baseline() {
    let mut store = two_book_store();
    let request = PageRequest::new(1, 10).unwrap();
    let mut session = PageSession::from_page(request.clone(), store.query(&request));

    session.edit("1", Field::Title, "A revised").unwrap();
    let SaveStart::Submit(changes) = session.begin_save().unwrap() else {
        panic!("expected a changeset");
    };
    assert_eq!(ids(&changes), vec!["1"]);

    let result = store.bulk_update_by_id(&changes);
    assert_eq!(result.modified_count, 1);

    let refetch = session.complete_save(result);
    session.load(refetch.clone(), store.query(&refetch));

    assert_eq!(session.baseline().get("1").unwrap().title, "A revised");
    assert!(!session.is_dirty("1"));
    assert_eq!(session.state(), SessionState::Clean);
}

#[test]
fn empty_changeset_writes_nothing() {
    let store = two_book_store();
    let request = PageRequest::new(1, 10).unwrap();
    let mut session = PageSession::from_page(request.clone(), store.query(&request));
    assert_eq!(session.begin_save().unwrap(), SaveStart::NoChanges);
}

#[test]
fn save_of_vanished_record_is_unmatched() {
    let store = two_book_store();
    let request = PageRequest::new(1, 10).unwrap();
    let mut session = PageSession::from_page(request.clone(), store.query(&request));

    session.edit("1", Field::Title, "A+").unwrap();
    session.edit("2", Field::Title, "B+").unwrap();
    let SaveStart::Submit(changes) = session.begin_save().unwrap() else {
        panic!("expected a changeset");
    };

    // record 2 disappears from the store before the save lands
    let mut survivors = MemoryStore::from_records(
        store.records().iter().filter(|b| b.id == "1").cloned(),
    );
    let result = survivors.bulk_update_by_id(&changes);
    assert_eq!(result.matched_count, 1);
    assert_eq!(result.modified_count, 1);

    // the caller re-fetches instead of trusting the submitted values
    let refetch = session.complete_save(result);
    session.load(refetch.clone(), survivors.query(&refetch));
    assert_eq!(ids(session.working()), vec!["1"]);
    assert_eq!(session.total(), 1);
}

#[test]
fn concurrent_sessions_are_last_writer_wins() {
    let mut store = two_book_store();
    let request = PageRequest::new(1, 10).unwrap();
    let mut alice = PageSession::from_page(request.clone(), store.query(&request));
    let mut bob = PageSession::from_page(request.clone(), store.query(&request));

    alice.edit("1", Field::Title, "alice").unwrap();
    bob.edit("1", Field::Title, "bob").unwrap();

    for session in [&mut alice, &mut bob] {
        let SaveStart::Submit(changes) = session.begin_save().unwrap() else {
            panic!("expected a changeset");
        };
        let result = store.bulk_update_by_id(&changes);
        session.complete_save(result);
    }

    // no conflict is detected; the later save simply overwrote the first
    assert_eq!(store.get("1").unwrap().fields.title, "bob");
}

#[test]
fn navigating_discards_unsaved_edits() {
    let store = MemoryStore::from_records((0..4).map(|i| book(&i.to_string(), "t", None)));
    let first = PageRequest::new(1, 2).unwrap();
    let mut session = PageSession::from_page(first.clone(), store.query(&first));
    session.edit("0", Field::Title, "unsaved").unwrap();

    let second = first.with_page(2).unwrap();
    session.load(second.clone(), store.query(&second));

    assert_eq!(ids(session.working()), vec!["2", "3"]);
    assert!(!session.has_changes());
}
