//! Query engine: filtering, ordering and pagination of books.
//!
//! Ordering is total and deterministic. Ties (and unsorted requests) fall
//! back to store insertion order, which means a page can be re-fetched with
//! no intervening writes and come back identical. The reconciliation session
//! relies on that to rebuild the same baseline.

use crate::{error::Result, Book, BookFields, Error, Field};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default page size when a request does not name one.
pub const DEFAULT_LIMIT: u64 = 50;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    /// `"desc"` selects descending; anything else is ascending.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw {
            Some("desc") => SortDir::Desc,
            _ => SortDir::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

/// Sort key plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: Field,
    pub dir: SortDir,
}

impl Sort {
    pub fn asc(field: Field) -> Self {
        Self {
            field,
            dir: SortDir::Asc,
        }
    }

    pub fn desc(field: Field) -> Self {
        Self {
            field,
            dir: SortDir::Desc,
        }
    }

    /// Compare two records under this sort. Equal keys compare equal, so a
    /// stable sort keeps insertion order for ties.
    pub fn compare(&self, a: &BookFields, b: &BookFields) -> Ordering {
        let ordering = compare_field(self.field, a, b);
        match self.dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    }
}

/// Ascending order of one field: bytewise for text, nulls first for the year.
pub fn compare_field(field: Field, a: &BookFields, b: &BookFields) -> Ordering {
    match (a.text(field), b.text(field)) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => a.published_year.cmp(&b.published_year),
    }
}

/// Case-insensitive substring search over the searchable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    text: String,
    needle: String,
}

impl SearchFilter {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let needle = text.to_lowercase();
        Self { text, needle }
    }

    /// A filter matching everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// The search text as given.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn matches(&self, fields: &BookFields) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        Field::SEARCHABLE.iter().any(|field| {
            fields
                .text(*field)
                .is_some_and(|value| value.to_lowercase().contains(&self.needle))
        })
    }
}

/// A validated page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
    sort: Option<Sort>,
    filter: SearchFilter,
}

impl PageRequest {
    /// Create a request for `page` (1-based) of `limit` records.
    pub fn new(page: u64, limit: u64) -> Result<Self> {
        if page < 1 {
            return Err(Error::InvalidPage(page));
        }
        if limit < 1 {
            return Err(Error::InvalidLimit(limit));
        }
        Ok(Self {
            page,
            limit,
            sort: None,
            filter: SearchFilter::all(),
        })
    }

    /// First page with the default limit, unsorted and unfiltered.
    pub fn first() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            sort: None,
            filter: SearchFilter::all(),
        }
    }

    pub fn with_sort(mut self, sort: Option<Sort>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.filter = SearchFilter::new(text);
        self
    }

    pub fn with_page(mut self, page: u64) -> Result<Self> {
        if page < 1 {
            return Err(Error::InvalidPage(page));
        }
        self.page = page;
        Ok(self)
    }

    pub fn with_limit(mut self, limit: u64) -> Result<Self> {
        if limit < 1 {
            return Err(Error::InvalidLimit(limit));
        }
        self.limit = limit;
        Ok(self)
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn sort(&self) -> Option<Sort> {
        self.sort
    }

    pub fn filter(&self) -> &SearchFilter {
        &self.filter
    }

    /// Number of matching records before this page.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Records on this page, in query order
    pub records: Vec<Book>,
    /// Matching records across all pages
    pub total: u64,
}

impl Page {
    /// Number of pages needed for `total` at `limit` (at least one).
    pub fn page_count(&self, limit: u64) -> u64 {
        self.total.div_ceil(limit.max(1)).max(1)
    }
}

/// Raw query-string parameters, lenient like a browser client expects.
///
/// Unparsable or out-of-range numbers fall back to defaults or are clamped;
/// only an unknown sort key is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

impl PageParams {
    /// Build a request, capping the limit at `max_limit`.
    pub fn into_request(self, max_limit: u64) -> Result<PageRequest> {
        let page = clamp_param(self.page.as_deref(), 1, u64::MAX);
        let limit = clamp_param(self.limit.as_deref(), DEFAULT_LIMIT, max_limit.max(1));

        let sort = match self.sort_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => Some(Sort {
                field: key.parse()?,
                dir: SortDir::parse_lenient(self.sort_dir.as_deref()),
            }),
            None => None,
        };

        Ok(PageRequest::new(page, limit)?
            .with_sort(sort)
            .with_search(self.q.unwrap_or_default()))
    }
}

impl From<&PageRequest> for PageParams {
    fn from(request: &PageRequest) -> Self {
        Self {
            page: Some(request.page.to_string()),
            limit: Some(request.limit.to_string()),
            sort_key: request.sort.map(|s| s.field.name().to_string()),
            sort_dir: request.sort.map(|s| s.dir.as_str().to_string()),
            q: (!request.filter.is_empty()).then(|| request.filter.text().to_string()),
        }
    }
}

fn clamp_param(raw: Option<&str>, default: u64, max: u64) -> u64 {
    match raw.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(n)) => (n.max(1) as u64).min(max),
        _ => default.min(max),
    }
}

/// Count records matching `filter`.
pub fn count<'a>(records: impl IntoIterator<Item = &'a Book>, filter: &SearchFilter) -> u64 {
    records
        .into_iter()
        .filter(|book| filter.matches(&book.fields))
        .count() as u64
}

/// Filter, order and slice records held in insertion order.
pub fn select<'a>(
    records: impl IntoIterator<Item = &'a Book>,
    filter: &SearchFilter,
    sort: Option<Sort>,
    skip: u64,
    limit: u64,
) -> Vec<Book> {
    let mut matching: Vec<&Book> = records
        .into_iter()
        .filter(|book| filter.matches(&book.fields))
        .collect();

    if let Some(sort) = sort {
        // sort_by is stable: equal keys keep insertion order
        matching.sort_by(|a, b| sort.compare(&a.fields, &b.fields));
    }

    matching
        .into_iter()
        .skip(usize::try_from(skip).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

/// Run a request against records held in insertion order.
pub fn run(records: &[Book], request: &PageRequest) -> Page {
    Page {
        records: select(
            records,
            &request.filter,
            request.sort,
            request.skip(),
            request.limit,
        ),
        total: count(records, &request.filter),
    }
}
