//! `sheet-loader` turns spreadsheet workbooks into warehouse tables.
//!
//! Every sheet of a workbook becomes one table: header labels are normalized into
//! warehouse-safe column identifiers, each column gets a SQL type inferred from its values, and
//! the rows are serialized into a delimited payload for bulk loading.
//!
//! The primary entrypoint is [`pipeline::load_workbook`] (or
//! [`pipeline::load_workbook_from_path`] with the `excel` feature). The warehouse side is
//! abstracted behind [`warehouse::TableSink`] and [`warehouse::BulkLoader`]; statement-based
//! implementations live in [`warehouse::staged`].
//!
//! ## Normalization rules
//!
//! - Identifiers are lower-cased; every character outside `[a-z0-9]` becomes `_`
//!   (`"Order ID"` → `order_id`). Empty header cells become `col_<position>`, and identifiers
//!   starting with a digit get a `col_` prefix.
//! - Repeated identifiers within a sheet get `_1`, `_2`, ... suffixes.
//! - Column types: any `YYYY-MM-DD` text or date value → `TIMESTAMP`; else any fractional
//!   number → `DECIMAL(18,2)`; else any integer → `BIGINT`; else `VARCHAR(n)` with
//!   `n = clamp(2 × longest text, 100, 65535)`.
//! - Table names are `<file stem>_<sheet name>`, both normalized.
//!
//! ## Quick example
//!
//! ```no_run
//! use sheet_loader::config::WarehouseConfig;
//! use sheet_loader::pipeline::{load_workbook_from_path, PipelineOptions};
//! use sheet_loader::warehouse::{LocalDirStore, SqlTableSink, StagedCopyLoader, StatementLog};
//!
//! # fn main() -> Result<(), sheet_loader::LoadError> {
//! let config = WarehouseConfig::from_env()?;
//! let statements = StatementLog::new();
//! let store = LocalDirStore::new("staging").with_uri_prefix(format!("s3://{}", config.bucket));
//! let sink = SqlTableSink::new(&statements);
//! let loader = StagedCopyLoader::new(store, &statements, config);
//!
//! let report = load_workbook_from_path("uploads/orders.xlsx", &sink, &loader, &PipelineOptions::default())?;
//! println!("loaded={} failed={}", report.loaded_count(), report.failed_count());
//! for sql in statements.statements() {
//!     println!("{sql}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`schema`]: identifier normalization, type inference, sheet normalization
//! - [`types`]: cell values, inferred types, normalized sheets
//! - [`ingestion`]: workbook reading, file-arrival events, observers
//! - [`warehouse`]: payload serialization, table sink and bulk loader
//! - [`pipeline`]: the per-sheet load loop and its reports
//! - [`config`]: warehouse settings
//! - [`error`]: the shared error type

pub mod config;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod schema;
pub mod types;
pub mod warehouse;

pub use error::{LoadError, LoadResult};
