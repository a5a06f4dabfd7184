//! Statement-based table creation and object-store staged bulk loading.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::config::WarehouseConfig;
use crate::error::BoxError;
use crate::types::InferredType;

use super::{copy_statement, create_table_statement, BulkLoader, DelimitedPayload, TableSink};

/// Runs one SQL statement against the warehouse.
pub trait StatementExecutor {
    fn execute(&self, sql: &str) -> Result<(), BoxError>;
}

impl<T: StatementExecutor + ?Sized> StatementExecutor for &T {
    fn execute(&self, sql: &str) -> Result<(), BoxError> {
        (**self).execute(sql)
    }
}

impl<T: StatementExecutor + ?Sized> StatementExecutor for Arc<T> {
    fn execute(&self, sql: &str) -> Result<(), BoxError> {
        (**self).execute(sql)
    }
}

/// Key/value object storage.
pub trait ObjectStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError>;
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BoxError>;
    fn delete(&self, key: &str) -> Result<(), BoxError>;
    /// Location of `key` as the warehouse sees it.
    fn uri(&self, key: &str) -> String;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError> {
        (**self).get(key)
    }
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BoxError> {
        (**self).put(key, bytes)
    }
    fn delete(&self, key: &str) -> Result<(), BoxError> {
        (**self).delete(key)
    }
    fn uri(&self, key: &str) -> String {
        (**self).uri(key)
    }
}

/// Creates tables by issuing `CREATE TABLE IF NOT EXISTS`.
#[derive(Debug)]
pub struct SqlTableSink<E> {
    executor: E,
}

impl<E: StatementExecutor> SqlTableSink<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

impl<E: StatementExecutor> TableSink for SqlTableSink<E> {
    fn create_table(
        &self,
        table: &str,
        identifiers: &[String],
        column_types: &IndexMap<String, InferredType>,
    ) -> Result<(), BoxError> {
        self.executor
            .execute(&create_table_statement(table, identifiers, column_types))
    }
}

/// Loads payloads by staging them in an [`ObjectStore`] and issuing `COPY`.
///
/// The staged object lives at [`WarehouseConfig::staging_key`] and is deleted after the `COPY`,
/// whether or not the `COPY` succeeded. A `COPY` error is returned as-is; a failed delete after
/// a successful `COPY` only logs a warning.
#[derive(Debug)]
pub struct StagedCopyLoader<S, E> {
    store: S,
    executor: E,
    config: WarehouseConfig,
}

impl<S: ObjectStore, E: StatementExecutor> StagedCopyLoader<S, E> {
    pub fn new(store: S, executor: E, config: WarehouseConfig) -> Self {
        Self {
            store,
            executor,
            config,
        }
    }
}

impl<S: ObjectStore, E: StatementExecutor> BulkLoader for StagedCopyLoader<S, E> {
    fn load(&self, table: &str, payload: &DelimitedPayload) -> Result<(), BoxError> {
        let key = self.config.staging_key(table);
        self.store.put(&key, &payload.bytes)?;

        let sql = copy_statement(
            table,
            &self.store.uri(&key),
            &self.config.iam_role_arn,
            payload.delimiter,
        );
        let copied = self.executor.execute(&sql);

        if let Err(e) = self.store.delete(&key) {
            tracing::warn!(key = %key, error = %e, "failed to delete staged payload");
        }
        copied
    }
}

/// Records statements instead of running them (dry runs, tests).
#[derive(Debug, Default)]
pub struct StatementLog {
    statements: Mutex<Vec<String>>,
}

impl StatementLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements recorded so far, in execution order.
    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl StatementExecutor for StatementLog {
    fn execute(&self, sql: &str) -> Result<(), BoxError> {
        self.statements
            .lock()
            .map_err(|_| "statement log mutex poisoned")?
            .push(sql.to_string());
        Ok(())
    }
}

/// Object store backed by a local directory; keys map to relative paths.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
    uri_prefix: Option<String>,
}

impl LocalDirStore {
    /// Store objects under `root`. URIs are local file paths.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            uri_prefix: None,
        }
    }

    /// Report URIs as `<prefix>/<key>` (e.g. `s3://bucket`) instead of local paths.
    pub fn with_uri_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.uri_prefix = Some(prefix.into());
        self
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BoxError> {
        let relative = Path::new(key);
        let is_plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !is_plain {
            return Err(format!("invalid object key '{key}'").into());
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for LocalDirStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError> {
        Ok(fs::read(self.path_for(key)?)?)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BoxError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), BoxError> {
        fs::remove_file(self.path_for(key)?)?;
        Ok(())
    }

    fn uri(&self, key: &str) -> String {
        match &self.uri_prefix {
            Some(prefix) => format!("{}/{key}", prefix.trim_end_matches('/')),
            None => self.root.join(key).display().to_string(),
        }
    }
}
