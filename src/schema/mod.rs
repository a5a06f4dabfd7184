//! Schema inference and sheet normalization.
//!
//! - [`identifier`]: warehouse-safe column identifiers and sheet-scoped deduplication
//! - [`inference`]: per-column SQL type inference
//! - [`sheet`]: the sheet abstraction and [`normalize_sheet`]
//!
//! ## Example
//!
//! ```rust
//! use sheet_loader::schema::{has_data, normalize_sheet, Sheet};
//! use sheet_loader::types::{InferredType, RawCell};
//!
//! let sheet = Sheet::new(
//!     "Orders",
//!     vec![
//!         vec![RawCell::Text("Order ID".into()), RawCell::Text("Order ID".into()), RawCell::Empty],
//!         vec![RawCell::Integer(1), RawCell::Decimal(2.5), RawCell::Text("2023-01-05".into())],
//!     ],
//! );
//!
//! assert!(has_data(&sheet));
//! let (result, report) = normalize_sheet(&sheet).unwrap();
//! assert_eq!(result.identifiers, vec!["order_id", "order_id_1", "col_3"]);
//! assert_eq!(result.column_type("order_id_1"), Some(InferredType::Decimal));
//! assert_eq!(result.column_type("col_3"), Some(InferredType::Timestamp));
//! assert!(report.is_clean());
//! ```

pub mod identifier;
pub mod inference;
pub mod sheet;

pub use identifier::{normalize_headers, normalize_identifier, table_name, IdentifierDeduper};
pub use inference::{infer_type, looks_like_date, TypeSignals, DATE_TEXT_PATTERN};
pub use sheet::{
    data_row_count, has_data, has_data_rows, normalize_sheet, InMemoryWorkbook, Sheet, SheetGrid, WorkbookSource,
    DEFAULT_MIN_DATA_ROWS,
};
