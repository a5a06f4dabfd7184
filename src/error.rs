use thiserror::Error;

/// Convenience result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Boxed error produced by an external collaborator (table sink, bulk loader, object store).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type returned by loading functions.
///
/// This is a single error enum shared across sheet normalization, payload building,
/// configuration and the load pipeline.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Workbook reading error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Delimited payload writing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON configuration or event decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The sheet could not be read at all; no partial result exists for it.
    #[error("sheet '{sheet}' is unreadable: {message}")]
    InputUnreadable { sheet: String, message: String },

    /// Required configuration is missing or invalid.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// A file-arrival event could not be interpreted.
    #[error("invalid event: {message}")]
    InvalidEvent { message: String },

    /// The table sink rejected the create-table request.
    #[error("table sink failed for '{table}': {source}")]
    Sink {
        table: String,
        #[source]
        source: BoxError,
    },

    /// The bulk loader rejected the payload.
    #[error("bulk load failed for '{table}': {source}")]
    Loader {
        table: String,
        #[source]
        source: BoxError,
    },

    /// The object store could not serve a source object.
    #[error("object store failed for '{key}': {source}")]
    Store {
        key: String,
        #[source]
        source: BoxError,
    },
}
