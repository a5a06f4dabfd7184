//! Reading sources and reporting on load outcomes.
//!
//! - [`excel`]: `calamine`-backed workbook reader (feature `excel`, enabled by default)
//! - [`event`]: file-arrival notification parsing
//! - [`observability`]: observers for per-sheet success, skip, anomaly and failure events

pub mod event;
#[cfg(feature = "excel")]
pub mod excel;
pub mod observability;

pub use event::{FileArrivalEvent, ObjectRef};
#[cfg(feature = "excel")]
pub use excel::{classify_cell, open_excel_workbook, open_excel_workbook_from_bytes, ExcelSheet, ExcelWorkbook};
pub use observability::{
    CompositeObserver, FileObserver, LoadObserver, LoadSeverity, SheetContext, SheetStats, StdErrObserver,
    TracingObserver,
};
