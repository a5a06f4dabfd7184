//! Delimited-text payloads for bulk loading.

use crate::error::{LoadError, LoadResult};
use crate::schema::SheetGrid;
use crate::types::SheetResult;

/// A fully-formed delimited-text payload: a header row followed by one record per data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedPayload {
    /// Encoded UTF-8 bytes.
    pub bytes: Vec<u8>,
    /// Number of records, header excluded.
    pub records: usize,
    /// Field delimiter.
    pub delimiter: u8,
}

impl DelimitedPayload {
    /// Payload as text.
    pub fn as_str(&self) -> &str {
        // Built only from `String` fields by the csv writer.
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }
}

/// Serialize a normalized sheet: identifiers as the header row, then one record per row in
/// identifier order. Empty cells become empty fields.
pub fn to_delimited_payload(result: &SheetResult, delimiter: u8) -> LoadResult<DelimitedPayload> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    wtr.write_record(&result.identifiers)?;
    for row in &result.rows {
        wtr.write_record(result.identifiers.iter().map(|id| {
            row.get(id).map(|cell| cell.to_field()).unwrap_or_default()
        }))?;
    }

    Ok(DelimitedPayload {
        bytes: finish(wtr)?,
        records: result.row_count(),
        delimiter,
    })
}

/// Export a sheet verbatim as comma-delimited text: raw header labels, raw cell values, no
/// normalization and no type inference. Unclassifiable cells become empty fields.
pub fn export_sheet<S: SheetGrid + ?Sized>(sheet: &S) -> LoadResult<DelimitedPayload> {
    let width = sheet.max_column();
    let height = sheet.max_row();
    let mut wtr = csv::WriterBuilder::new().from_writer(Vec::new());

    for row in 0..height {
        let fields: Vec<String> = (0..width)
            .map(|col| {
                sheet
                    .cell(row, col)
                    .map(|cell| cell.to_field())
                    .unwrap_or_default()
            })
            .collect();
        wtr.write_record(&fields)?;
    }

    Ok(DelimitedPayload {
        bytes: finish(wtr)?,
        records: height.saturating_sub(1),
        delimiter: b',',
    })
}

/// Key for the first-sheet export of `source_key`: `processed/<stem>_sheet1.csv`.
pub fn processed_export_key(source_key: &str) -> String {
    let file_name = source_key.rsplit('/').next().unwrap_or(source_key);
    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };
    format!("processed/{stem}_sheet1.csv")
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> LoadResult<Vec<u8>> {
    wtr.into_inner()
        .map_err(|e| LoadError::Io(std::io::Error::new(e.error().kind(), e.to_string())))
}
