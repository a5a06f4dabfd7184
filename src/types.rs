//! Core data model types for sheet normalization.
//!
//! A sheet is read as a grid of [`RawCell`]s. Normalization turns it into a [`SheetResult`]:
//! warehouse-safe column identifiers, one [`NormalizedRow`] per data row, and one
//! [`InferredType`] per column. Cells that could not be classified are listed in a
//! [`NormalizationReport`] returned alongside the result.

use std::fmt;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Smallest `VARCHAR` width emitted for text columns.
pub const VARCHAR_MIN_LENGTH: usize = 100;
/// Largest `VARCHAR` width the warehouse accepts.
pub const VARCHAR_MAX_LENGTH: usize = 65_535;

/// A single sheet value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum RawCell {
    /// Missing/empty value.
    #[default]
    Empty,
    /// Text value.
    Text(String),
    /// 64-bit signed integer.
    Integer(i64),
    /// Floating point number.
    Decimal(f64),
    /// Date or date-time; the reader decides whether a native cell is a date.
    Timestamp(NaiveDateTime),
}

impl RawCell {
    /// Returns `true` for [`RawCell::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, RawCell::Empty)
    }

    /// Label used when this cell sits in the header row.
    ///
    /// Empty cells have no label; every other value is rendered to text.
    pub fn header_label(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => Some(s.clone()),
            RawCell::Integer(_) | RawCell::Decimal(_) | RawCell::Timestamp(_) => Some(self.to_field()),
        }
    }

    /// Render the value as a delimited-text field. Empty renders as an empty field.
    pub fn to_field(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) => s.clone(),
            RawCell::Integer(i) => i.to_string(),
            RawCell::Decimal(f) => f.to_string(),
            RawCell::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        }
    }
}

/// SQL storage type inferred for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InferredType {
    /// `TIMESTAMP`
    Timestamp,
    /// `DECIMAL(18,2)`
    Decimal,
    /// `BIGINT`
    BigInt,
    /// `VARCHAR(n)` with `n` in `VARCHAR_MIN_LENGTH..=VARCHAR_MAX_LENGTH`.
    Varchar(usize),
}

impl InferredType {
    /// `VARCHAR` sized at twice the longest observed text, clamped to the warehouse limits.
    pub fn varchar_for(max_text_length: usize) -> Self {
        let length = max_text_length
            .saturating_mul(2)
            .clamp(VARCHAR_MIN_LENGTH, VARCHAR_MAX_LENGTH);
        InferredType::Varchar(length)
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferredType::Timestamp => f.write_str("TIMESTAMP"),
            InferredType::Decimal => f.write_str("DECIMAL(18,2)"),
            InferredType::BigInt => f.write_str("BIGINT"),
            InferredType::Varchar(n) => write!(f, "VARCHAR({n})"),
        }
    }
}

impl Serialize for InferredType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One data row keyed by normalized identifier, in column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct NormalizedRow(IndexMap<String, RawCell>);

impl NormalizedRow {
    /// Create an empty row with room for `columns` values.
    pub fn with_capacity(columns: usize) -> Self {
        Self(IndexMap::with_capacity(columns))
    }

    /// Set the value for `identifier`.
    pub fn insert(&mut self, identifier: impl Into<String>, value: RawCell) {
        self.0.insert(identifier.into(), value);
    }

    /// Value stored under `identifier`, if the column exists.
    pub fn get(&self, identifier: &str) -> Option<&RawCell> {
        self.0.get(identifier)
    }

    /// Iterate `(identifier, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawCell)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate values in column order.
    pub fn values(&self) -> impl Iterator<Item = &RawCell> {
        self.0.values()
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Normalized form of one sheet: column identifiers, rows and column types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetResult {
    /// Column identifiers in source column order.
    pub identifiers: Vec<String>,
    /// One entry per data row (every sheet row below the header).
    pub rows: Vec<NormalizedRow>,
    /// Inferred SQL type per identifier, in column order.
    pub column_types: IndexMap<String, InferredType>,
}

impl SheetResult {
    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.identifiers.len()
    }

    /// Inferred type for `identifier`.
    pub fn column_type(&self, identifier: &str) -> Option<InferredType> {
        self.column_types.get(identifier).copied()
    }

    /// Column definitions (`"<identifier> <TYPE>"`) in column order.
    pub fn column_definitions(&self) -> Vec<String> {
        self.identifiers
            .iter()
            .filter_map(|id| self.column_types.get(id).map(|ty| format!("{id} {ty}")))
            .collect()
    }
}

/// A cell that could not be classified and was treated as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellAnomaly {
    /// 1-based sheet row (the header is row 1).
    pub row: usize,
    /// 1-based sheet column.
    pub column: usize,
    pub message: String,
}

impl fmt::Display for CellAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} column {}: {}", self.row, self.column, self.message)
    }
}

/// Per-sheet report of recovered anomalies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NormalizationReport {
    pub anomalies: Vec<CellAnomaly>,
}

impl NormalizationReport {
    /// Record an unclassifiable cell.
    pub fn record(&mut self, row: usize, column: usize, message: impl Into<String>) {
        self.anomalies.push(CellAnomaly {
            row,
            column,
            message: message.into(),
        });
    }

    /// Number of recorded anomalies.
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }

    /// Returns `true` if every cell was classified.
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}
