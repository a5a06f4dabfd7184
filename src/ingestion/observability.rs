use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::LoadError;
use crate::types::NormalizationReport;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the sheet failed).
    Error,
    /// Critical error (I/O or collaborator failures).
    Critical,
}

impl LoadSeverity {
    /// Lowercase tag used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            LoadSeverity::Info => "info",
            LoadSeverity::Warning => "warning",
            LoadSeverity::Error => "error",
            LoadSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for LoadSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context about one sheet of a load attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetContext {
    /// Source object key or path.
    pub source: String,
    /// Sheet name.
    pub sheet: String,
    /// Target table, once derived.
    pub table: Option<String>,
}

/// Stats reported when a sheet is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetStats {
    /// Number of loaded rows.
    pub rows: usize,
    /// Number of table columns.
    pub columns: usize,
    /// Number of cells treated as empty because they could not be classified.
    pub anomalies: usize,
}

/// Observer interface for load outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait LoadObserver: Send + Sync {
    /// Called when a sheet is loaded.
    fn on_sheet_loaded(&self, _ctx: &SheetContext, _stats: SheetStats) {}

    /// Called when a sheet is skipped for having too few data rows.
    fn on_sheet_skipped(&self, _ctx: &SheetContext, _data_rows: usize) {}

    /// Called when normalization recovered from unclassifiable cells.
    fn on_cell_anomalies(&self, _ctx: &SheetContext, _report: &NormalizationReport) {}

    /// Called when a sheet fails.
    fn on_sheet_failed(&self, _ctx: &SheetContext, _severity: LoadSeverity, _error: &LoadError) {}

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_sheet_failed`].
    fn on_alert(&self, ctx: &SheetContext, severity: LoadSeverity, error: &LoadError) {
        self.on_sheet_failed(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn LoadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl LoadObserver for CompositeObserver {
    fn on_sheet_loaded(&self, ctx: &SheetContext, stats: SheetStats) {
        for o in &self.observers {
            o.on_sheet_loaded(ctx, stats);
        }
    }

    fn on_sheet_skipped(&self, ctx: &SheetContext, data_rows: usize) {
        for o in &self.observers {
            o.on_sheet_skipped(ctx, data_rows);
        }
    }

    fn on_cell_anomalies(&self, ctx: &SheetContext, report: &NormalizationReport) {
        for o in &self.observers {
            o.on_cell_anomalies(ctx, report);
        }
    }

    fn on_sheet_failed(&self, ctx: &SheetContext, severity: LoadSeverity, error: &LoadError) {
        for o in &self.observers {
            o.on_sheet_failed(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &SheetContext, severity: LoadSeverity, error: &LoadError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs load events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl LoadObserver for StdErrObserver {
    fn on_sheet_loaded(&self, ctx: &SheetContext, stats: SheetStats) {
        eprintln!(
            "[load][{}] loaded source={} sheet={} table={} rows={} columns={} anomalies={}",
            LoadSeverity::Info,
            ctx.source,
            ctx.sheet,
            table_label(ctx),
            stats.rows,
            stats.columns,
            stats.anomalies
        );
    }

    fn on_sheet_skipped(&self, ctx: &SheetContext, data_rows: usize) {
        eprintln!(
            "[load][{}] skipped source={} sheet={} data_rows={}",
            LoadSeverity::Info,
            ctx.source,
            ctx.sheet,
            data_rows
        );
    }

    fn on_cell_anomalies(&self, ctx: &SheetContext, report: &NormalizationReport) {
        eprintln!(
            "[load][{}] source={} sheet={} anomalies={}",
            LoadSeverity::Warning,
            ctx.source,
            ctx.sheet,
            report.anomaly_count()
        );
        for anomaly in &report.anomalies {
            eprintln!("[load][{}]   {anomaly}", LoadSeverity::Warning);
        }
    }

    fn on_sheet_failed(&self, ctx: &SheetContext, severity: LoadSeverity, error: &LoadError) {
        eprintln!(
            "[load][{}] source={} sheet={} table={} err={}",
            severity,
            ctx.source,
            ctx.sheet,
            table_label(ctx),
            error
        );
    }

    fn on_alert(&self, ctx: &SheetContext, severity: LoadSeverity, error: &LoadError) {
        eprintln!(
            "[ALERT][load][{}] source={} sheet={} table={} err={}",
            severity,
            ctx.source,
            ctx.sheet,
            table_label(ctx),
            error
        );
    }
}

/// Appends load events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl LoadObserver for FileObserver {
    fn on_sheet_loaded(&self, ctx: &SheetContext, stats: SheetStats) {
        self.append_line(&format!(
            "{} ok source={} sheet={} table={} rows={} anomalies={}",
            unix_ts(),
            ctx.source,
            ctx.sheet,
            table_label(ctx),
            stats.rows,
            stats.anomalies
        ));
    }

    fn on_sheet_skipped(&self, ctx: &SheetContext, data_rows: usize) {
        self.append_line(&format!(
            "{} skip source={} sheet={} data_rows={}",
            unix_ts(),
            ctx.source,
            ctx.sheet,
            data_rows
        ));
    }

    fn on_cell_anomalies(&self, ctx: &SheetContext, report: &NormalizationReport) {
        for anomaly in &report.anomalies {
            self.append_line(&format!(
                "{} anomaly source={} sheet={} {}",
                unix_ts(),
                ctx.source,
                ctx.sheet,
                anomaly
            ));
        }
    }

    fn on_sheet_failed(&self, ctx: &SheetContext, severity: LoadSeverity, error: &LoadError) {
        self.append_line(&format!(
            "{} fail severity={} source={} sheet={} err={}",
            unix_ts(),
            severity,
            ctx.source,
            ctx.sheet,
            error
        ));
    }

    fn on_alert(&self, ctx: &SheetContext, severity: LoadSeverity, error: &LoadError) {
        self.append_line(&format!(
            "{} ALERT severity={} source={} sheet={} err={}",
            unix_ts(),
            severity,
            ctx.source,
            ctx.sheet,
            error
        ));
    }
}

/// Emits load events as structured `tracing` events.
///
/// Install any `tracing` subscriber in the host to collect them.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl LoadObserver for TracingObserver {
    fn on_sheet_loaded(&self, ctx: &SheetContext, stats: SheetStats) {
        tracing::info!(
            source = %ctx.source,
            sheet = %ctx.sheet,
            table = table_label(ctx),
            rows = stats.rows,
            columns = stats.columns,
            anomalies = stats.anomalies,
            "sheet loaded"
        );
    }

    fn on_sheet_skipped(&self, ctx: &SheetContext, data_rows: usize) {
        tracing::info!(source = %ctx.source, sheet = %ctx.sheet, data_rows, "sheet skipped");
    }

    fn on_cell_anomalies(&self, ctx: &SheetContext, report: &NormalizationReport) {
        for anomaly in &report.anomalies {
            tracing::warn!(
                source = %ctx.source,
                sheet = %ctx.sheet,
                row = anomaly.row,
                column = anomaly.column,
                message = %anomaly.message,
                "cell treated as empty"
            );
        }
    }

    fn on_sheet_failed(&self, ctx: &SheetContext, severity: LoadSeverity, error: &LoadError) {
        tracing::error!(
            source = %ctx.source,
            sheet = %ctx.sheet,
            table = table_label(ctx),
            severity = severity.as_str(),
            error = %error,
            "sheet failed"
        );
    }

    fn on_alert(&self, ctx: &SheetContext, severity: LoadSeverity, error: &LoadError) {
        tracing::error!(
            alert = true,
            source = %ctx.source,
            sheet = %ctx.sheet,
            severity = severity.as_str(),
            error = %error,
            "sheet failure alert"
        );
    }
}

fn table_label(ctx: &SheetContext) -> &str {
    ctx.table.as_deref().unwrap_or("-")
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::{FileObserver, LoadObserver, LoadSeverity, SheetContext, SheetStats};
    use crate::error::LoadError;
    use crate::types::NormalizationReport;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn ctx() -> SheetContext {
        SheetContext {
            source: "uploads/orders.xlsx".to_string(),
            sheet: "Sheet1".to_string(),
            table: Some("orders_sheet1".to_string()),
        }
    }

    #[test]
    fn file_observer_appends_lines() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("sheet-loader-observer-{nanos}.log"));
        let observer = FileObserver::new(&path);

        observer.on_sheet_loaded(&ctx(), SheetStats { rows: 2, columns: 3, anomalies: 0 });
        let mut report = NormalizationReport::default();
        report.record(3, 2, "cell error Div0");
        observer.on_cell_anomalies(&ctx(), &report);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ok source=uploads/orders.xlsx sheet=Sheet1 table=orders_sheet1 rows=2"));
        assert!(lines[1].contains("row 3 column 2: cell error Div0"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn severity_tags_are_lowercase_and_ordered() {
        assert_eq!(LoadSeverity::Warning.to_string(), "warning");
        assert_eq!(format!("[load][{}]", LoadSeverity::Critical), "[load][critical]");
        assert!(LoadSeverity::Error < LoadSeverity::Critical);
    }

    #[test]
    fn file_observer_writes_lowercase_severity() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("sheet-loader-observer-sev-{nanos}.log"));
        let observer = FileObserver::new(&path);
        let error = LoadError::Config {
            message: "missing bucket".to_string(),
        };

        observer.on_sheet_failed(&ctx(), LoadSeverity::Error, &error);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("fail severity=error source=uploads/orders.xlsx"));
        let _ = std::fs::remove_file(&path);
    }
}
