//! Workbook-to-warehouse load pipeline.
//!
//! [`load_workbook`] walks every sheet of a workbook in order and, for each one:
//!
//! 1. opens the sheet
//! 2. skips it if it has fewer than [`PipelineOptions::min_data_rows`] data rows
//! 3. normalizes it (identifiers, rows, column types)
//! 4. derives the target table name from the source key and sheet name
//! 5. asks the [`TableSink`] to create the table
//! 6. serializes a [`crate::warehouse::DelimitedPayload`] and hands it to the [`BulkLoader`]
//!
//! A failure at any step marks only that sheet as failed; the remaining sheets are still
//! attempted. Outcomes are collected into a [`WorkbookReport`] and, when an observer is
//! configured, reported as they happen.

use std::fmt;
use std::sync::Arc;

use crate::error::{LoadError, LoadResult};
use crate::ingestion::observability::{LoadObserver, LoadSeverity, SheetContext, SheetStats};
use crate::schema::{
    data_row_count, has_data_rows, normalize_sheet, table_name, SheetGrid, WorkbookSource, DEFAULT_MIN_DATA_ROWS,
};
use crate::warehouse::{
    export_sheet, processed_export_key, to_delimited_payload, BulkLoader, DelimitedPayload, ObjectStore, TableSink,
};

#[cfg(feature = "excel")]
use std::path::Path;

#[cfg(feature = "excel")]
use crate::ingestion::event::FileArrivalEvent;
#[cfg(feature = "excel")]
use crate::ingestion::excel::{open_excel_workbook, open_excel_workbook_from_bytes};

/// Options controlling a load run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct PipelineOptions {
    /// Sheets with fewer data rows than this are skipped.
    pub min_data_rows: usize,
    /// Field delimiter of the bulk-load payload.
    pub delimiter: u8,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn LoadObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: LoadSeverity,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("min_data_rows", &self.min_data_rows)
            .field("delimiter", &char::from(self.delimiter))
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            min_data_rows: DEFAULT_MIN_DATA_ROWS,
            delimiter: b',',
            observer: None,
            alert_at_or_above: LoadSeverity::Critical,
        }
    }
}

/// What happened to one sheet.
#[derive(Debug)]
pub enum SheetOutcome {
    /// Table created and payload loaded.
    Loaded(SheetStats),
    /// Not enough data rows.
    Skipped { data_rows: usize },
    /// A step failed; nothing further was attempted for this sheet.
    Failed(LoadError),
}

/// Outcome of one sheet, in workbook order.
#[derive(Debug)]
pub struct SheetReport {
    pub sheet: String,
    /// Target table, if the run got far enough to derive it.
    pub table: Option<String>,
    pub outcome: SheetOutcome,
}

impl SheetReport {
    pub fn is_loaded(&self) -> bool {
        matches!(self.outcome, SheetOutcome::Loaded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, SheetOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&LoadError> {
        match &self.outcome {
            SheetOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Per-sheet outcomes of one workbook.
#[derive(Debug)]
pub struct WorkbookReport {
    /// Source object key or path.
    pub source: String,
    pub sheets: Vec<SheetReport>,
}

impl WorkbookReport {
    pub fn loaded_count(&self) -> usize {
        self.sheets.iter().filter(|s| s.is_loaded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.sheets.iter().filter(|s| s.is_failed()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.sheets
            .iter()
            .filter(|s| matches!(s.outcome, SheetOutcome::Skipped { .. }))
            .count()
    }

    /// `true` when no sheet failed.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Report for the sheet named `sheet`.
    pub fn sheet(&self, sheet: &str) -> Option<&SheetReport> {
        self.sheets.iter().find(|s| s.sheet == sheet)
    }
}

/// Load every sheet of `workbook` into the warehouse.
///
/// `source_key` is the object key (or path) the workbook came from; its file stem is the first
/// half of every table name.
///
/// When an observer is configured, this function reports:
/// - `on_sheet_loaded` / `on_sheet_skipped` per sheet
/// - `on_cell_anomalies` when normalization treated unclassifiable cells as empty
/// - `on_sheet_failed` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// ```
/// use indexmap::IndexMap;
/// use sheet_loader::error::BoxError;
/// use sheet_loader::pipeline::{load_workbook, PipelineOptions};
/// use sheet_loader::schema::{InMemoryWorkbook, Sheet};
/// use sheet_loader::types::{InferredType, RawCell};
/// use sheet_loader::warehouse::{BulkLoader, DelimitedPayload, TableSink};
///
/// struct Noop;
/// impl TableSink for Noop {
///     fn create_table(&self, _: &str, _: &[String], _: &IndexMap<String, InferredType>) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
/// impl BulkLoader for Noop {
///     fn load(&self, _: &str, _: &DelimitedPayload) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
///
/// let mut workbook = InMemoryWorkbook::new(vec![Sheet::new(
///     "Sheet1",
///     vec![vec![RawCell::Text("Id".into())], vec![RawCell::Integer(1)]],
/// )]);
/// let report = load_workbook("uploads/orders.xlsx", &mut workbook, &Noop, &Noop, &PipelineOptions::default());
/// assert_eq!(report.loaded_count(), 1);
/// assert_eq!(report.sheets[0].table.as_deref(), Some("orders_sheet1"));
/// ```
pub fn load_workbook<W, T, B>(
    source_key: &str,
    workbook: &mut W,
    sink: &T,
    loader: &B,
    options: &PipelineOptions,
) -> WorkbookReport
where
    W: WorkbookSource,
    T: TableSink + ?Sized,
    B: BulkLoader + ?Sized,
{
    let names = workbook.sheet_names();
    tracing::debug!(source = source_key, sheets = names.len(), "loading workbook");

    let mut sheets = Vec::with_capacity(names.len());
    for (index, name) in names.into_iter().enumerate() {
        let mut ctx = SheetContext {
            source: source_key.to_string(),
            sheet: name,
            table: None,
        };
        let outcome = match load_sheet(&mut ctx, index + 1, workbook, sink, loader, options) {
            Ok(outcome) => outcome,
            Err(e) => SheetOutcome::Failed(e),
        };
        notify(options, &ctx, &outcome);
        sheets.push(SheetReport {
            sheet: ctx.sheet,
            table: ctx.table,
            outcome,
        });
    }

    WorkbookReport {
        source: source_key.to_string(),
        sheets,
    }
}

fn load_sheet<W, T, B>(
    ctx: &mut SheetContext,
    position: usize,
    workbook: &mut W,
    sink: &T,
    loader: &B,
    options: &PipelineOptions,
) -> LoadResult<SheetOutcome>
where
    W: WorkbookSource,
    T: TableSink + ?Sized,
    B: BulkLoader + ?Sized,
{
    let sheet = workbook.open_sheet(&ctx.sheet)?;
    if !has_data_rows(&sheet, options.min_data_rows) {
        let data_rows = data_row_count(&sheet);
        tracing::debug!(sheet = %ctx.sheet, data_rows, "skipping sheet");
        return Ok(SheetOutcome::Skipped { data_rows });
    }

    let (result, report) = normalize_sheet(&sheet)?;
    if !report.is_clean() {
        if let Some(obs) = options.observer.as_ref() {
            obs.on_cell_anomalies(ctx, &report);
        }
    }

    let table = table_name(&ctx.source, &ctx.sheet, position);
    ctx.table = Some(table.clone());
    tracing::debug!(
        sheet = %ctx.sheet,
        table = %table,
        rows = result.row_count(),
        columns = result.column_count(),
        "sheet normalized"
    );

    sink.create_table(&table, &result.identifiers, &result.column_types)
        .map_err(|source| LoadError::Sink {
            table: table.clone(),
            source,
        })?;

    let payload = to_delimited_payload(&result, options.delimiter)?;
    loader.load(&table, &payload).map_err(|source| LoadError::Loader {
        table: table.clone(),
        source,
    })?;

    Ok(SheetOutcome::Loaded(SheetStats {
        rows: result.row_count(),
        columns: result.column_count(),
        anomalies: report.anomaly_count(),
    }))
}

fn notify(options: &PipelineOptions, ctx: &SheetContext, outcome: &SheetOutcome) {
    let Some(obs) = options.observer.as_ref() else {
        return;
    };
    match outcome {
        SheetOutcome::Loaded(stats) => obs.on_sheet_loaded(ctx, *stats),
        SheetOutcome::Skipped { data_rows } => obs.on_sheet_skipped(ctx, *data_rows),
        SheetOutcome::Failed(e) => {
            let sev = severity_for_error(e);
            obs.on_sheet_failed(ctx, sev, e);
            if sev >= options.alert_at_or_above {
                obs.on_alert(ctx, sev, e);
            }
        }
    }
}

/// Severity the pipeline reports for `e`.
pub fn severity_for_error(e: &LoadError) -> LoadSeverity {
    match e {
        LoadError::Io(_) => LoadSeverity::Critical,
        LoadError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => LoadSeverity::Critical,
            _ => LoadSeverity::Error,
        },
        #[cfg(feature = "excel")]
        LoadError::Excel(_) => LoadSeverity::Error,
        LoadError::Json(_) => LoadSeverity::Error,
        LoadError::InputUnreadable { .. } => LoadSeverity::Error,
        LoadError::Config { .. } => LoadSeverity::Error,
        LoadError::InvalidEvent { .. } => LoadSeverity::Error,
        LoadError::Sink { .. } | LoadError::Loader { .. } | LoadError::Store { .. } => {
            LoadSeverity::Critical
        }
    }
}

/// Render the first sheet of `workbook` verbatim as comma-delimited text.
///
/// See [`export_sheet`]; pair with [`crate::warehouse::processed_export_key`] for the output key.
pub fn export_first_sheet<W: WorkbookSource>(workbook: &mut W) -> LoadResult<DelimitedPayload> {
    let first = workbook
        .sheet_names()
        .into_iter()
        .next()
        .ok_or_else(|| LoadError::InputUnreadable {
            sheet: String::new(),
            message: "workbook has no sheets".to_string(),
        })?;
    let sheet = workbook.open_sheet(&first)?;
    tracing::debug!(sheet = %sheet.name(), rows = sheet.max_row(), "exporting first sheet");
    export_sheet(&sheet)
}

/// Export the first sheet of `workbook` into `store` at `processed/<stem>_sheet1.csv`, where the
/// stem comes from `source_key`. Returns the key written.
pub fn export_first_sheet_to<W, S>(workbook: &mut W, source_key: &str, store: &S) -> LoadResult<String>
where
    W: WorkbookSource,
    S: ObjectStore + ?Sized,
{
    let payload = export_first_sheet(workbook)?;
    let key = processed_export_key(source_key);
    store.put(&key, &payload.bytes).map_err(|source| LoadError::Store {
        key: key.clone(),
        source,
    })?;
    tracing::debug!(source = source_key, key = %key, records = payload.records, "first sheet exported");
    Ok(key)
}

/// Open the workbook at `path` and load it; the path doubles as the source key.
///
/// A workbook that cannot be opened is an error for the whole call.
#[cfg(feature = "excel")]
pub fn load_workbook_from_path<T, B>(
    path: impl AsRef<Path>,
    sink: &T,
    loader: &B,
    options: &PipelineOptions,
) -> LoadResult<WorkbookReport>
where
    T: TableSink + ?Sized,
    B: BulkLoader + ?Sized,
{
    let path = path.as_ref();
    let mut workbook = open_excel_workbook(path)?;
    let source_key = path.to_string_lossy();
    Ok(load_workbook(&source_key, &mut workbook, sink, loader, options))
}

/// Open an in-memory workbook and load it under `source_key`.
#[cfg(feature = "excel")]
pub fn load_workbook_from_bytes<T, B>(
    source_key: &str,
    bytes: Vec<u8>,
    sink: &T,
    loader: &B,
    options: &PipelineOptions,
) -> LoadResult<WorkbookReport>
where
    T: TableSink + ?Sized,
    B: BulkLoader + ?Sized,
{
    let mut workbook = open_excel_workbook_from_bytes(bytes)?;
    Ok(load_workbook(source_key, &mut workbook, sink, loader, options))
}

/// Load every object named by a file-arrival notification.
///
/// Each object is fetched from `store`, opened as a workbook and loaded. Results are returned in
/// record order; a failed fetch or an unopenable workbook fails only its own record.
#[cfg(feature = "excel")]
pub fn handle_event<S, T, B>(
    event: &FileArrivalEvent,
    store: &S,
    sink: &T,
    loader: &B,
    options: &PipelineOptions,
) -> Vec<LoadResult<WorkbookReport>>
where
    S: ObjectStore + ?Sized,
    T: TableSink + ?Sized,
    B: BulkLoader + ?Sized,
{
    event
        .objects
        .iter()
        .map(|object| -> LoadResult<WorkbookReport> {
            tracing::debug!(bucket = %object.bucket, key = %object.key, "processing object");
            let bytes = store.get(&object.key).map_err(|source| LoadError::Store {
                key: object.key.clone(),
                source,
            })?;
            load_workbook_from_bytes(&object.key, bytes, sink, loader, options)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{export_first_sheet, export_first_sheet_to, severity_for_error, PipelineOptions};
    use crate::error::{BoxError, LoadError};
    use crate::ingestion::observability::LoadSeverity;
    use crate::schema::{InMemoryWorkbook, Sheet};
    use crate::types::RawCell;
    use crate::warehouse::{LocalDirStore, ObjectStore};
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn default_options() {
        let opts = PipelineOptions::default();
        assert_eq!(opts.min_data_rows, 1);
        assert_eq!(opts.delimiter, b',');
        assert_eq!(opts.alert_at_or_above, LoadSeverity::Critical);
        assert!(format!("{opts:?}").contains("observer_set: false"));
    }

    #[test]
    fn collaborator_failures_are_critical() {
        let sink = LoadError::Sink {
            table: "t".to_string(),
            source: "denied".into(),
        };
        assert_eq!(severity_for_error(&sink), LoadSeverity::Critical);
        let unreadable = LoadError::InputUnreadable {
            sheet: "s".to_string(),
            message: "m".to_string(),
        };
        assert_eq!(severity_for_error(&unreadable), LoadSeverity::Error);
    }

    #[test]
    fn export_first_sheet_uses_first_sheet_only() {
        let mut workbook = InMemoryWorkbook::new(vec![
            Sheet::new(
                "First",
                vec![
                    vec![RawCell::Text("Raw Label".to_string())],
                    vec![RawCell::Integer(7)],
                ],
            ),
            Sheet::new("Second", vec![vec![RawCell::Text("other".to_string())]]),
        ]);
        let payload = export_first_sheet(&mut workbook).unwrap();
        assert_eq!(payload.as_str(), "Raw Label\n7\n");
    }

    #[test]
    fn export_first_sheet_rejects_empty_workbook() {
        let mut workbook = InMemoryWorkbook::new(Vec::new());
        let err = export_first_sheet(&mut workbook).unwrap_err();
        assert!(matches!(err, LoadError::InputUnreadable { .. }));
    }

    #[test]
    fn export_first_sheet_to_writes_processed_key() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let root = std::env::temp_dir().join(format!("sheet-loader-export-{nanos}"));
        let store = LocalDirStore::new(&root);
        let mut workbook = InMemoryWorkbook::new(vec![Sheet::new(
            "First",
            vec![
                vec![RawCell::Text("Raw Label".to_string())],
                vec![RawCell::Integer(7)],
            ],
        )]);

        let key = export_first_sheet_to(&mut workbook, "incoming/Q1 sales.xlsx", &store).unwrap();

        assert_eq!(key, "processed/Q1 sales_sheet1.csv");
        assert_eq!(store.get(&key).unwrap(), b"Raw Label\n7\n".to_vec());
        let _ = std::fs::remove_dir_all(&root);
    }

    struct ReadOnlyStore;

    impl ObjectStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Vec<u8>, BoxError> {
            Err(format!("no object '{key}'").into())
        }
        fn put(&self, _key: &str, _bytes: &[u8]) -> Result<(), BoxError> {
            Err("bucket is read-only".into())
        }
        fn delete(&self, _key: &str) -> Result<(), BoxError> {
            Ok(())
        }
        fn uri(&self, key: &str) -> String {
            format!("mem://{key}")
        }
    }

    #[test]
    fn export_first_sheet_to_reports_store_failure() {
        let mut workbook = InMemoryWorkbook::new(vec![Sheet::new(
            "First",
            vec![vec![RawCell::Text("a".to_string())]],
        )]);

        let err = export_first_sheet_to(&mut workbook, "uploads/orders.xlsx", &ReadOnlyStore).unwrap_err();
        match err {
            LoadError::Store { key, source } => {
                assert_eq!(key, "processed/orders_sheet1.csv");
                assert_eq!(source.to_string(), "bucket is read-only");
            }
            other => panic!("expected store error, got {other:?}"),
        }
    }
}
