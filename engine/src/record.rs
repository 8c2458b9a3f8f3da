//! Record types for the book table.
//!
//! The schema is fixed: every record carries the five [`Field`]s in schema
//! order plus an opaque, store-assigned id.

use crate::{error::Result, Error, RecordId};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// A mutable column of the book schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Author,
    Genre,
    PublishedYear,
    Isbn,
}

impl Field {
    /// All fields in schema order.
    pub const ALL: [Field; 5] = [
        Field::Title,
        Field::Author,
        Field::Genre,
        Field::PublishedYear,
        Field::Isbn,
    ];

    /// Fields consulted by free-text search.
    pub const SEARCHABLE: [Field; 4] = [Field::Title, Field::Author, Field::Genre, Field::Isbn];

    /// Canonical (wire) name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Author => "author",
            Field::Genre => "genre",
            Field::PublishedYear => "publishedYear",
            Field::Isbn => "isbn",
        }
    }

    /// Whether the field holds free text (as opposed to the year).
    pub fn is_text(&self) -> bool {
        !matches!(self, Field::PublishedYear)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

/// A loosely-typed cell value as supplied by an editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
}

impl Value {
    /// String form used for dirtiness checks: null is the empty string.
    pub fn lexical(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Int(n) => Cow::Owned(n.to_string()),
            Value::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<Option<i64>> for Value {
    fn from(n: Option<i64>) -> Self {
        n.map_or(Value::Null, Value::Int)
    }
}

/// The mutable part of a book: everything except the id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: Option<i64>,
    pub isbn: String,
}

impl BookFields {
    /// Borrow a text field. Returns `None` for the year.
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Title => Some(&self.title),
            Field::Author => Some(&self.author),
            Field::Genre => Some(&self.genre),
            Field::Isbn => Some(&self.isbn),
            Field::PublishedYear => None,
        }
    }

    /// Current value of a field.
    pub fn get(&self, field: Field) -> Value {
        match self.text(field) {
            Some(s) => Value::Text(s.to_string()),
            None => Value::from(self.published_year),
        }
    }

    /// String form of a field, as compared for dirtiness.
    pub fn lexical(&self, field: Field) -> Cow<'_, str> {
        match self.text(field) {
            Some(s) => Cow::Borrowed(s),
            None => match self.published_year {
                Some(year) => Cow::Owned(year.to_string()),
                None => Cow::Borrowed(""),
            },
        }
    }

    /// Set a field from an editor value.
    ///
    /// Text fields take the lexical form of any value. The year accepts
    /// null, integers and integer text (surrounding whitespace ignored);
    /// empty text clears it.
    pub fn set(&mut self, field: Field, value: Value) -> Result<()> {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Author => &mut self.author,
            Field::Genre => &mut self.genre,
            Field::Isbn => &mut self.isbn,
            Field::PublishedYear => {
                self.published_year =
                    parse_year_value(&value).ok_or_else(|| Error::InvalidFieldValue {
                        field: field.name().to_string(),
                        value: value.lexical().into_owned(),
                    })?;
                return Ok(());
            }
        };
        *slot = match value {
            Value::Text(s) => s,
            other => other.lexical().into_owned(),
        };
        Ok(())
    }

    /// Fields whose lexical forms differ between `self` and `other`.
    pub fn diff(&self, other: &BookFields) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| self.lexical(*field) != other.lexical(*field))
            .collect()
    }

    /// Whether any field differs lexically from `other`.
    pub fn differs_from(&self, other: &BookFields) -> bool {
        Field::ALL
            .iter()
            .any(|field| self.lexical(*field) != other.lexical(*field))
    }
}

/// `Some(year)` on success, `None` when the value is not a year.
fn parse_year_value(value: &Value) -> Option<Option<i64>> {
    match value {
        Value::Null => Some(None),
        Value::Int(n) => Some(Some(*n)),
        Value::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(None)
            } else {
                trimmed.parse::<i64>().ok().map(Some)
            }
        }
    }
}

/// A book record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Store-assigned identifier; never changes
    pub id: RecordId,
    /// Mutable columns
    #[serde(flatten)]
    pub fields: BookFields,
}

impl Book {
    /// Create a record with an existing id.
    pub fn new(id: impl Into<RecordId>, fields: BookFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Create a record with a freshly generated id.
    pub fn with_new_id(fields: BookFields) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> BookFields {
        BookFields {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            genre: "SF".into(),
            published_year: Some(1965),
            isbn: "978-0441013593".into(),
        }
    }

    #[test]
    fn field_names_roundtrip_through_from_str() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>().unwrap(), field);
        }
        assert!(matches!(
            "PublishedYear".parse::<Field>(),
            Err(Error::UnknownField(_))
        ));
    }

    #[test]
    fn lexical_forms() {
        let mut fields = sample();
        assert_eq!(fields.lexical(Field::PublishedYear), "1965");
        fields.published_year = None;
        assert_eq!(fields.lexical(Field::PublishedYear), "");
        assert_eq!(fields.lexical(Field::Title), "Dune");
    }

    #[test]
    fn set_text_field_coerces_values() {
        let mut fields = sample();
        fields.set(Field::Genre, Value::Int(42)).unwrap();
        assert_eq!(fields.genre, "42");
        fields.set(Field::Genre, Value::Null).unwrap();
        assert_eq!(fields.genre, "");
        fields.set(Field::Title, "  Dune Messiah ".into()).unwrap();
        assert_eq!(fields.title, "  Dune Messiah ");
    }

    #[test]
    fn set_year_parses_text() {
        let mut fields = sample();
        fields.set(Field::PublishedYear, " 1969 ".into()).unwrap();
        assert_eq!(fields.published_year, Some(1969));
        fields.set(Field::PublishedYear, "".into()).unwrap();
        assert_eq!(fields.published_year, None);
        fields.set(Field::PublishedYear, Value::Int(0)).unwrap();
        assert_eq!(fields.published_year, Some(0));
    }

    #[test]
    fn set_year_rejects_non_numeric_text() {
        let mut fields = sample();
        let result = fields.set(Field::PublishedYear, "soon".into());
        assert!(matches!(result, Err(Error::InvalidFieldValue { .. })));
        assert_eq!(fields.published_year, Some(1965));
    }

    #[test]
    fn diff_is_lexical() {
        let base = sample();
        let mut edited = base.clone();
        edited.set(Field::PublishedYear, "1965".into()).unwrap();
        assert!(!edited.differs_from(&base));

        edited.published_year = Some(0);
        let mut unset = base.clone();
        unset.published_year = None;
        assert_eq!(edited.diff(&unset), vec![Field::PublishedYear]);
    }

    #[test]
    fn wire_format_is_camel_case_and_flat() {
        let book = Book::new("b-1", sample());
        let value = serde_json::to_value(&book).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "b-1",
                "title": "Dune",
                "author": "Frank Herbert",
                "genre": "SF",
                "publishedYear": 1965,
                "isbn": "978-0441013593"
            })
        );
    }

    #[test]
    fn missing_fields_default_when_deserializing() {
        let book: Book = serde_json::from_value(json!({"id": "b-2", "title": "X"})).unwrap();
        assert_eq!(book.fields.title, "X");
        assert_eq!(book.fields.author, "");
        assert_eq!(book.fields.published_year, None);
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = Book::with_new_id(BookFields::default());
        let b = Book::with_new_id(BookFields::default());
        assert_ne!(a.id, b.id);
    }
}
