//! Import normalizer: CSV bytes to canonical book fields.
//!
//! Importing is two-phase. [`ImportBatch::prepare`] parses and normalizes the
//! whole upload; only a batch that was built completely can be committed, and
//! committing replaces the entire store. A rejected upload never reaches the
//! store.
//!
//! Header matching is forgiving. For each field the exact spellings
//! (`Title`/`title`, `PublishedYear`/`publishedYear`, `ISBN`/`isbn`, ...) are
//! tried first, then any header equal to the field name once case, spaces,
//! `_` and `-` are ignored. The first non-empty value wins.
//!
//! The year is parsed leniently and never fails: integers and integral
//! floats (`"2005.0"`) are accepted, anything else becomes `None`.

use crate::{error::Result, BookFields, Error, Field, MemoryStore};
use serde::{Deserialize, Serialize};

/// One parsed CSV row: header/value pairs in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(cells: Vec<(String, String)>) -> Self {
        Self { cells }
    }

    /// Value under an exact header.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == header)
            .map(|(_, value)| value.as_str())
    }

    /// First non-empty value among the accepted variants for `field`.
    pub fn lookup(&self, field: Field) -> Option<&str> {
        exact_variants(field)
            .iter()
            .find_map(|header| self.get(header).filter(|value| !value.is_empty()))
            .or_else(|| {
                let wanted = fold_header(field.name());
                self.cells
                    .iter()
                    .find(|(name, value)| !value.is_empty() && fold_header(name) == wanted)
                    .map(|(_, value)| value.as_str())
            })
    }

    /// Canonical fields for this row.
    pub fn normalize(&self) -> BookFields {
        let text = |field| self.lookup(field).unwrap_or_default().to_string();
        BookFields {
            title: text(Field::Title),
            author: text(Field::Author),
            genre: text(Field::Genre),
            published_year: self.lookup(Field::PublishedYear).and_then(parse_year),
            isbn: text(Field::Isbn),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn exact_variants(field: Field) -> &'static [&'static str] {
    match field {
        Field::Title => &["Title", "title"],
        Field::Author => &["Author", "author"],
        Field::Genre => &["Genre", "genre"],
        Field::PublishedYear => &["PublishedYear", "publishedYear"],
        Field::Isbn => &["ISBN", "isbn"],
    }
}

fn fold_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lenient year parsing. Returns `None` for anything that is not an integer.
pub fn parse_year(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(year) = trimmed.parse::<i64>() {
        return Some(year);
    }
    let float = trimmed.parse::<f64>().ok()?;
    let integral = float.is_finite()
        && float.fract() == 0.0
        && float >= i64::MIN as f64
        && float <= i64::MAX as f64;
    integral.then_some(float as i64)
}

/// Parse CSV bytes into raw rows. The first line is the header row.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let text = std::str::from_utf8(bytes).map_err(|_| Error::InvalidEncoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(Error::MissingHeader);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(malformed)?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(Error::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .collect::<RawRow>(),
        );
    }
    Ok(rows)
}

fn malformed(err: csv::Error) -> Error {
    Error::MalformedCsv {
        line: err.position().map(|p| p.line()).unwrap_or(0),
        message: err.to_string(),
    }
}

/// Summary returned after an import has replaced the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub inserted_count: u64,
}

/// A fully-normalized upload, ready to replace the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBatch {
    rows: Vec<BookFields>,
}

impl ImportBatch {
    /// Parse and normalize CSV bytes. Nothing is written.
    pub fn prepare(bytes: &[u8]) -> Result<Self> {
        Self::from_rows(&parse_csv(bytes)?)
    }

    /// Normalize already-parsed rows. An upload with no rows is rejected,
    /// since committing it would only empty the store.
    pub fn from_rows(rows: &[RawRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::EmptyImport);
        }
        Ok(Self {
            rows: rows.iter().map(RawRow::normalize).collect(),
        })
    }

    pub fn rows(&self) -> &[BookFields] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<BookFields> {
        self.rows
    }

    /// Replace the whole store with this batch. Irreversible.
    pub fn commit(self, store: &mut MemoryStore) -> ImportSummary {
        let inserted = store.replace_all(self.rows);
        ImportSummary {
            inserted_count: inserted.len() as u64,
        }
    }
}
