//! Sheet normalization: headers, rows and column types for one sheet.

use indexmap::IndexMap;

use crate::error::{LoadError, LoadResult};
use crate::types::{NormalizationReport, NormalizedRow, RawCell, SheetResult};

use super::identifier::IdentifierDeduper;
use super::inference::TypeSignals;

/// Default minimum number of data rows a sheet needs before it is loaded.
pub const DEFAULT_MIN_DATA_ROWS: usize = 1;

/// A rectangular view over one sheet.
///
/// Row 0 is the header row. Positions are 0-based; positions outside the declared extent read
/// as [`RawCell::Empty`]. The reader, not the normalizer, decides whether a native cell is a date.
pub trait SheetGrid {
    /// Sheet (tab) name.
    fn name(&self) -> &str;

    /// Number of rows, header included.
    fn max_row(&self) -> usize;

    /// Number of columns.
    fn max_column(&self) -> usize;

    /// Classify the cell at (`row`, `column`).
    ///
    /// Returns `Err(message)` when the native value fits no [`RawCell`] variant.
    fn cell(&self, row: usize, column: usize) -> Result<RawCell, String>;
}

/// A source of sheets, in workbook order.
pub trait WorkbookSource {
    type Sheet: SheetGrid;

    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Read one sheet. Failure affects only that sheet.
    fn open_sheet(&mut self, name: &str) -> LoadResult<Self::Sheet>;
}

/// In-memory sheet made of already-classified cells.
///
/// Rows may have different lengths; the column extent is the longest row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<RawCell>>,
    width: usize,
}

impl Sheet {
    /// Create a sheet from rows of cells (the first row is the header).
    pub fn new(name: impl Into<String>, rows: Vec<Vec<RawCell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            name: name.into(),
            rows,
            width,
        }
    }

    /// Rows as stored.
    pub fn rows(&self) -> &[Vec<RawCell>] {
        &self.rows
    }
}

impl SheetGrid for Sheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_row(&self) -> usize {
        self.rows.len()
    }

    fn max_column(&self) -> usize {
        self.width
    }

    fn cell(&self, row: usize, column: usize) -> Result<RawCell, String> {
        Ok(self
            .rows
            .get(row)
            .and_then(|r| r.get(column))
            .cloned()
            .unwrap_or_default())
    }
}

/// In-memory workbook made of [`Sheet`]s.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InMemoryWorkbook {
    sheets: Vec<Sheet>,
}

impl InMemoryWorkbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }
}

impl WorkbookSource for InMemoryWorkbook {
    type Sheet = Sheet;

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn open_sheet(&mut self, name: &str) -> LoadResult<Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| LoadError::InputUnreadable {
                sheet: name.to_string(),
                message: "no such sheet in workbook".to_string(),
            })
    }
}

/// Number of data rows (rows below the header).
pub fn data_row_count<S: SheetGrid + ?Sized>(sheet: &S) -> usize {
    sheet.max_row().saturating_sub(1)
}

/// Returns `true` if the sheet has at least one data row.
///
/// Callers check this before [`normalize_sheet`]; header-only and empty sheets are skipped.
pub fn has_data<S: SheetGrid + ?Sized>(sheet: &S) -> bool {
    has_data_rows(sheet, DEFAULT_MIN_DATA_ROWS)
}

/// Returns `true` if the sheet has at least `min_data_rows` data rows.
pub fn has_data_rows<S: SheetGrid + ?Sized>(sheet: &S, min_data_rows: usize) -> bool {
    data_row_count(sheet) >= min_data_rows
}

/// Normalize a sheet into identifiers, rows and column types.
///
/// Behavior:
/// - Row 0 supplies header labels; empty header cells become `col_<position>`, and repeated
///   identifiers get `_<k>` suffixes (fresh state for every call).
/// - Every later row becomes a [`NormalizedRow`] covering all columns; cells past the end of a
///   short row are empty.
/// - Cells the sheet cannot classify are recorded in the returned [`NormalizationReport`] and
///   treated as empty.
///
/// A sheet without a header row or without columns returns [`LoadError::InputUnreadable`].
pub fn normalize_sheet<S: SheetGrid + ?Sized>(sheet: &S) -> LoadResult<(SheetResult, NormalizationReport)> {
    let height = sheet.max_row();
    let width = sheet.max_column();
    if height == 0 || width == 0 {
        return Err(LoadError::InputUnreadable {
            sheet: sheet.name().to_string(),
            message: format!("sheet has no header row (rows={height}, columns={width})"),
        });
    }

    let mut report = NormalizationReport::default();

    let mut deduper = IdentifierDeduper::new();
    let mut identifiers: Vec<String> = Vec::with_capacity(width);
    for col in 0..width {
        let label = read_cell(sheet, 0, col, &mut report).header_label();
        identifiers.push(deduper.assign(label.as_deref(), col + 1));
    }

    let mut signals = vec![TypeSignals::default(); width];
    let mut rows: Vec<NormalizedRow> = Vec::with_capacity(height - 1);
    for row_idx in 1..height {
        let mut row = NormalizedRow::with_capacity(width);
        for (col, identifier) in identifiers.iter().enumerate() {
            let value = read_cell(sheet, row_idx, col, &mut report);
            signals[col].observe(&value);
            row.insert(identifier.clone(), value);
        }
        rows.push(row);
    }

    let column_types: IndexMap<_, _> = identifiers
        .iter()
        .zip(signals.iter())
        .map(|(id, s)| (id.clone(), s.resolve()))
        .collect();

    Ok((
        SheetResult {
            identifiers,
            rows,
            column_types,
        },
        report,
    ))
}

fn read_cell<S: SheetGrid + ?Sized>(
    sheet: &S,
    row: usize,
    col: usize,
    report: &mut NormalizationReport,
) -> RawCell {
    match sheet.cell(row, col) {
        Ok(value) => value,
        Err(message) => {
            // Report 1-based positions (Excel-like).
            report.record(row + 1, col + 1, message);
            RawCell::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{has_data, has_data_rows, normalize_sheet, InMemoryWorkbook, Sheet, SheetGrid, WorkbookSource};
    use crate::error::LoadError;
    use crate::types::{InferredType, RawCell};

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    /// Grid whose cell at a fixed position cannot be classified.
    struct BrokenCell {
        inner: Sheet,
        broken: (usize, usize),
    }

    impl SheetGrid for BrokenCell {
        fn name(&self) -> &str {
            self.inner.name()
        }
        fn max_row(&self) -> usize {
            self.inner.max_row()
        }
        fn max_column(&self) -> usize {
            self.inner.max_column()
        }
        fn cell(&self, row: usize, column: usize) -> Result<RawCell, String> {
            if (row, column) == self.broken {
                Err("unsupported cell value".to_string())
            } else {
                self.inner.cell(row, column)
            }
        }
    }

    #[test]
    fn duplicate_and_empty_headers() {
        let sheet = Sheet::new(
            "Orders",
            vec![
                vec![text("Order ID"), text("Order ID"), RawCell::Empty],
                vec![RawCell::Integer(1), RawCell::Integer(2), text("x")],
            ],
        );
        let (result, report) = normalize_sheet(&sheet).unwrap();
        assert_eq!(result.identifiers, vec!["order_id", "order_id_1", "col_3"]);
        assert!(report.is_clean());
    }

    #[test]
    fn rows_are_keyed_by_identifier_and_types_inferred() {
        let sheet = Sheet::new(
            "People",
            vec![
                vec![text("Id"), text("Name"), text("Score"), text("Joined")],
                vec![RawCell::Integer(1), text("Ada"), RawCell::Decimal(98.5), text("2023-01-05")],
                vec![RawCell::Integer(2), text("Grace"), RawCell::Integer(87), RawCell::Empty],
            ],
        );
        let (result, _) = normalize_sheet(&sheet).unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.rows[1].get("name"), Some(&text("Grace")));
        assert_eq!(result.rows[1].get("joined"), Some(&RawCell::Empty));
        assert_eq!(result.column_type("id"), Some(InferredType::BigInt));
        assert_eq!(result.column_type("name"), Some(InferredType::Varchar(100)));
        assert_eq!(result.column_type("score"), Some(InferredType::Decimal));
        assert_eq!(result.column_type("joined"), Some(InferredType::Timestamp));
    }

    #[test]
    fn short_rows_are_padded_with_empty() {
        let sheet = Sheet::new(
            "Short",
            vec![
                vec![text("a"), text("b"), text("c")],
                vec![RawCell::Integer(1)],
                vec![],
            ],
        );
        let (result, _) = normalize_sheet(&sheet).unwrap();
        assert_eq!(result.row_count(), 2);
        for row in &result.rows {
            assert_eq!(row.len(), 3);
        }
        assert_eq!(result.rows[0].get("b"), Some(&RawCell::Empty));
        assert_eq!(result.rows[0].get("c"), Some(&RawCell::Empty));
        assert!(result.rows[1].values().all(RawCell::is_empty));
    }

    #[test]
    fn data_wider_than_header_gets_fallback_identifiers() {
        let sheet = Sheet::new(
            "Wide",
            vec![vec![text("a")], vec![RawCell::Integer(1), RawCell::Integer(2)]],
        );
        let (result, _) = normalize_sheet(&sheet).unwrap();
        assert_eq!(result.identifiers, vec!["a", "col_2"]);
        assert_eq!(result.rows[0].get("col_2"), Some(&RawCell::Integer(2)));
    }

    #[test]
    fn row_keys_match_identifiers() {
        let sheet = Sheet::new(
            "Keys",
            vec![
                vec![text("x"), text("X"), text("1x")],
                vec![text("a"), text("b")],
            ],
        );
        let (result, _) = normalize_sheet(&sheet).unwrap();
        for row in &result.rows {
            let keys: Vec<&str> = row.iter().map(|(k, _)| k).collect();
            assert_eq!(keys, result.identifiers.iter().map(String::as_str).collect::<Vec<_>>());
        }
        let typed: Vec<&String> = result.column_types.keys().collect();
        assert_eq!(typed, result.identifiers.iter().collect::<Vec<_>>());
    }

    #[test]
    fn malformed_cell_is_reported_and_rest_continues() {
        let sheet = BrokenCell {
            inner: Sheet::new(
                "Broken",
                vec![
                    vec![text("a"), text("b")],
                    vec![RawCell::Integer(1), RawCell::Integer(2)],
                    vec![RawCell::Integer(3), RawCell::Integer(4)],
                ],
            ),
            broken: (1, 0),
        };
        let (result, report) = normalize_sheet(&sheet).unwrap();
        assert_eq!(report.anomaly_count(), 1);
        assert_eq!(report.anomalies[0].row, 2);
        assert_eq!(report.anomalies[0].column, 1);
        assert_eq!(result.rows[0].get("a"), Some(&RawCell::Empty));
        assert_eq!(result.rows[0].get("b"), Some(&RawCell::Integer(2)));
        assert_eq!(result.rows[1].get("a"), Some(&RawCell::Integer(3)));
        assert_eq!(result.column_type("a"), Some(InferredType::BigInt));
    }

    #[test]
    fn malformed_header_cell_falls_back_to_position() {
        let sheet = BrokenCell {
            inner: Sheet::new("H", vec![vec![text("a"), text("b")], vec![text("1"), text("2")]]),
            broken: (0, 1),
        };
        let (result, report) = normalize_sheet(&sheet).unwrap();
        assert_eq!(result.identifiers, vec!["a", "col_2"]);
        assert_eq!(report.anomaly_count(), 1);
    }

    #[test]
    fn numeric_header_labels_are_rendered() {
        let sheet = Sheet::new(
            "Years",
            vec![vec![RawCell::Integer(2023), RawCell::Decimal(1.5)], vec![]],
        );
        let (result, _) = normalize_sheet(&sheet).unwrap();
        assert_eq!(result.identifiers, vec!["col_2023", "col_1_5"]);
    }

    #[test]
    fn normalization_is_repeatable() {
        let sheet = Sheet::new(
            "Again",
            vec![
                vec![text("A"), text("A"), RawCell::Empty],
                vec![RawCell::Decimal(0.1), text("2020-10-10"), text("zz")],
            ],
        );
        let first = normalize_sheet(&sheet).unwrap();
        let second = normalize_sheet(&sheet).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first.0).unwrap(),
            serde_json::to_vec(&second.0).unwrap()
        );
    }

    #[test]
    fn header_only_sheet_has_no_data() {
        let sheet = Sheet::new("Header", vec![vec![text("a")]]);
        assert!(!has_data(&sheet));
        assert!(!has_data(&Sheet::new("Empty", vec![])));
        assert!(has_data(&Sheet::new("One", vec![vec![text("a")], vec![]])));
    }

    #[test]
    fn minimum_data_rows_is_configurable() {
        let sheet = Sheet::new("Two", vec![vec![text("a")], vec![], vec![]]);
        assert!(has_data_rows(&sheet, 2));
        assert!(!has_data_rows(&sheet, 3));
    }

    #[test]
    fn sheet_without_header_is_unreadable() {
        let err = normalize_sheet(&Sheet::new("Nothing", vec![])).unwrap_err();
        assert!(matches!(err, LoadError::InputUnreadable { ref sheet, .. } if sheet == "Nothing"));

        let err = normalize_sheet(&Sheet::new("NoColumns", vec![vec![], vec![]])).unwrap_err();
        assert!(err.to_string().contains("unreadable"));
    }

    #[test]
    fn in_memory_workbook_opens_sheets_by_name() {
        let mut wb = InMemoryWorkbook::new(vec![
            Sheet::new("First", vec![vec![text("a")]]),
            Sheet::new("Second", vec![vec![text("b")]]),
        ]);
        assert_eq!(wb.sheet_names(), vec!["First", "Second"]);
        assert_eq!(wb.open_sheet("Second").unwrap().name(), "Second");
        assert!(wb.open_sheet("Third").is_err());
    }
}
