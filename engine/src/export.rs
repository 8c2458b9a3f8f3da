//! CSV export of a record sequence.
//!
//! Columns follow schema order and never include the id. Null years are
//! written as empty cells.

use crate::{error::Result, Book, Error, Field};

/// Serialize records to CSV text with a header row.
pub fn to_csv(records: &[Book]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(Field::ALL.iter().map(|field| field.name()))
        .map_err(|e| Error::Export(e.to_string()))?;
    for record in records {
        let cells: Vec<_> = Field::ALL
            .iter()
            .map(|field| record.fields.lexical(*field))
            .collect();
        writer
            .write_record(cells.iter().map(|cell| cell.as_bytes()))
            .map_err(|e| Error::Export(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Export(e.to_string()))
}
