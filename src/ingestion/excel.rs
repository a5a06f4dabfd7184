#![cfg(feature = "excel")]

//! Workbook reading for `.xlsx`, `.xlsm`, `.xlsb`, `.xls` and `.ods` files.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{LoadError, LoadResult};
use crate::schema::{SheetGrid, WorkbookSource};
use crate::types::RawCell;

/// A workbook opened through `calamine`.
pub struct ExcelWorkbook<RS: Read + Seek> {
    workbook: Sheets<RS>,
}

/// Open a workbook file, detecting the format from its extension.
pub fn open_excel_workbook(path: impl AsRef<Path>) -> LoadResult<ExcelWorkbook<BufReader<File>>> {
    Ok(ExcelWorkbook {
        workbook: open_workbook_auto(path)?,
    })
}

/// Open a workbook held in memory (e.g. an object fetched from storage), detecting the format
/// from its content.
pub fn open_excel_workbook_from_bytes(bytes: Vec<u8>) -> LoadResult<ExcelWorkbook<Cursor<Vec<u8>>>> {
    Ok(ExcelWorkbook {
        workbook: open_workbook_auto_from_rs(Cursor::new(bytes))?,
    })
}

impl<RS: Read + Seek> WorkbookSource for ExcelWorkbook<RS> {
    type Sheet = ExcelSheet;

    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    fn open_sheet(&mut self, name: &str) -> LoadResult<ExcelSheet> {
        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|e| LoadError::InputUnreadable {
                sheet: name.to_string(),
                message: e.to_string(),
            })?;
        Ok(ExcelSheet::from_range(name, range))
    }
}

/// One worksheet read into memory.
///
/// Positions are absolute: row 0 is the sheet's first row even when the used range starts
/// further down, so the header is always the first sheet row.
#[derive(Debug, Clone)]
pub struct ExcelSheet {
    name: String,
    range: Range<Data>,
    height: usize,
    width: usize,
}

impl ExcelSheet {
    /// Wrap an already-read cell range.
    pub fn from_range(name: impl Into<String>, range: Range<Data>) -> Self {
        let (height, width) = match range.end() {
            Some((row, col)) => (row as usize + 1, col as usize + 1),
            None => (0, 0),
        };
        Self {
            name: name.into(),
            range,
            height,
            width,
        }
    }
}

impl SheetGrid for ExcelSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_row(&self) -> usize {
        self.height
    }

    fn max_column(&self) -> usize {
        self.width
    }

    fn cell(&self, row: usize, column: usize) -> Result<RawCell, String> {
        let (Ok(row), Ok(column)) = (u32::try_from(row), u32::try_from(column)) else {
            return Ok(RawCell::Empty);
        };
        match self.range.get_value((row, column)) {
            Some(data) => classify_cell(data),
            None => Ok(RawCell::Empty),
        }
    }
}

/// Classify a native workbook value into a [`RawCell`].
///
/// - Whole-number floats become integers (workbooks store most numbers as floats).
/// - Booleans become `1` / `0`.
/// - Date-formatted numbers and ISO date strings become timestamps; durations become text.
/// - Error values (`#DIV/0!`, `#N/A`, ...) and non-finite numbers are rejected.
pub fn classify_cell(c: &Data) -> Result<RawCell, String> {
    match c {
        Data::Empty => Ok(RawCell::Empty),
        Data::String(s) if s.is_empty() => Ok(RawCell::Empty),
        Data::String(s) => Ok(RawCell::Text(s.clone())),
        Data::Int(i) => Ok(RawCell::Integer(*i)),
        Data::Float(f) => classify_float(*f),
        Data::Bool(b) => Ok(RawCell::Integer(i64::from(*b))),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                dt.as_duration()
                    .map(|d| RawCell::Text(format_duration(d)))
                    .ok_or_else(|| format!("unrepresentable duration {}", dt.as_f64()))
            } else {
                dt.as_datetime()
                    .map(RawCell::Timestamp)
                    .ok_or_else(|| format!("unrepresentable date serial {}", dt.as_f64()))
            }
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(RawCell::Timestamp)
            .ok_or_else(|| format!("unrecognized ISO date '{s}'")),
        Data::DurationIso(s) => Ok(RawCell::Text(s.clone())),
        Data::Error(e) => Err(format!("cell error {e:?}")),
    }
}

fn classify_float(f: f64) -> Result<RawCell, String> {
    if !f.is_finite() {
        return Err(format!("non-finite number {f}"));
    }
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(RawCell::Integer(f as i64))
    } else {
        Ok(RawCell::Decimal(f))
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    if s.contains('T') {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()
    } else {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}

fn format_duration(d: chrono::Duration) -> String {
    let total = d.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    format!(
        "{sign}{}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::{classify_cell, ExcelSheet};
    use crate::schema::{normalize_sheet, SheetGrid};
    use crate::types::{InferredType, RawCell};
    use calamine::{CellErrorType, Data, Range};
    use chrono::NaiveDate;

    #[test]
    fn whole_floats_become_integers() {
        assert_eq!(classify_cell(&Data::Float(3.0)), Ok(RawCell::Integer(3)));
        assert_eq!(classify_cell(&Data::Float(3.25)), Ok(RawCell::Decimal(3.25)));
        assert_eq!(classify_cell(&Data::Int(-4)), Ok(RawCell::Integer(-4)));
        assert!(classify_cell(&Data::Float(f64::NAN)).is_err());
    }

    #[test]
    fn strings_booleans_and_errors() {
        assert_eq!(classify_cell(&Data::String(String::new())), Ok(RawCell::Empty));
        assert_eq!(
            classify_cell(&Data::String("abc".to_string())),
            Ok(RawCell::Text("abc".to_string()))
        );
        assert_eq!(classify_cell(&Data::Bool(true)), Ok(RawCell::Integer(1)));
        assert!(classify_cell(&Data::Error(CellErrorType::Div0)).is_err());
    }

    #[test]
    fn iso_dates_become_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            classify_cell(&Data::DateTimeIso("2023-01-05".to_string())),
            Ok(RawCell::Timestamp(expected))
        );
        assert_eq!(
            classify_cell(&Data::DateTimeIso("2023-01-05T00:00:00".to_string())),
            Ok(RawCell::Timestamp(expected))
        );
        assert!(classify_cell(&Data::DateTimeIso("yesterday".to_string())).is_err());
        assert_eq!(
            classify_cell(&Data::DurationIso("PT1H".to_string())),
            Ok(RawCell::Text("PT1H".to_string()))
        );
    }

    fn range_with(cells: &[((u32, u32), Data)], end: (u32, u32)) -> Range<Data> {
        let mut range = Range::new((0, 0), end);
        for (pos, value) in cells {
            range.set_value(*pos, value.clone());
        }
        range
    }

    #[test]
    fn sheet_extent_covers_the_used_range() {
        let range = range_with(
            &[
                ((0, 0), Data::String("a".to_string())),
                ((2, 3), Data::Float(1.0)),
            ],
            (2, 3),
        );
        let sheet = ExcelSheet::from_range("Data", range);
        assert_eq!(sheet.max_row(), 3);
        assert_eq!(sheet.max_column(), 4);
        assert_eq!(sheet.cell(1, 1), Ok(RawCell::Empty));
        assert_eq!(sheet.cell(10, 10), Ok(RawCell::Empty));
        assert_eq!(sheet.cell(2, 3), Ok(RawCell::Integer(1)));
    }

    #[test]
    fn error_cell_does_not_stop_normalization() {
        let range = range_with(
            &[
                ((0, 0), Data::String("Qty".to_string())),
                ((0, 1), Data::String("Ratio".to_string())),
                ((1, 0), Data::Float(2.0)),
                ((1, 1), Data::Error(CellErrorType::Div0)),
                ((2, 0), Data::Float(5.0)),
                ((2, 1), Data::Float(0.5)),
            ],
            (2, 1),
        );
        let sheet = ExcelSheet::from_range("Calc", range);
        let (result, report) = normalize_sheet(&sheet).unwrap();
        assert_eq!(report.anomaly_count(), 1);
        assert_eq!((report.anomalies[0].row, report.anomalies[0].column), (2, 2));
        assert_eq!(result.rows[0].get("ratio"), Some(&RawCell::Empty));
        assert_eq!(result.rows[1].get("ratio"), Some(&RawCell::Decimal(0.5)));
        assert_eq!(result.column_type("qty"), Some(InferredType::BigInt));
        assert_eq!(result.column_type("ratio"), Some(InferredType::Decimal));
    }
}
