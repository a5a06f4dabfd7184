//! Warehouse-facing collaborators.
//!
//! The normalizer hands its output to two collaborators:
//!
//! - a [`TableSink`], which creates the target table if it does not exist
//! - a [`BulkLoader`], which inserts a [`DelimitedPayload`] into that table
//!
//! Their errors are returned to the caller unchanged (as the `source` of
//! [`crate::LoadError::Sink`] / [`crate::LoadError::Loader`]); nothing here retries.
//!
//! [`staged`] provides statement-based implementations: a sink that issues
//! `CREATE TABLE IF NOT EXISTS`, and a loader that stages the payload in an object store and
//! issues `COPY`.

pub mod payload;
pub mod staged;

use indexmap::IndexMap;

use crate::error::BoxError;
use crate::types::InferredType;

pub use payload::{export_sheet, processed_export_key, to_delimited_payload, DelimitedPayload};
pub use staged::{LocalDirStore, ObjectStore, SqlTableSink, StagedCopyLoader, StatementExecutor, StatementLog};

/// Creates target tables.
pub trait TableSink {
    /// Create `table` with one column per identifier, if it does not exist yet.
    fn create_table(
        &self,
        table: &str,
        identifiers: &[String],
        column_types: &IndexMap<String, InferredType>,
    ) -> Result<(), BoxError>;
}

/// Bulk-inserts delimited payloads.
pub trait BulkLoader {
    /// Insert every record of `payload` into `table`.
    fn load(&self, table: &str, payload: &DelimitedPayload) -> Result<(), BoxError>;
}

/// `CREATE TABLE IF NOT EXISTS <table> (<id> <TYPE>,...);`
///
/// Column definitions follow identifier order and are joined by commas.
pub fn create_table_statement(
    table: &str,
    identifiers: &[String],
    column_types: &IndexMap<String, InferredType>,
) -> String {
    let columns: Vec<String> = identifiers
        .iter()
        .map(|id| {
            let ty = column_types
                .get(id)
                .copied()
                .unwrap_or_else(|| InferredType::varchar_for(0));
            format!("{id} {ty}")
        })
        .collect();
    format!("CREATE TABLE IF NOT EXISTS {table} ({});", columns.join(","))
}

/// `COPY` statement loading a staged payload (with its header row) into `table`.
pub fn copy_statement(table: &str, source_uri: &str, iam_role_arn: &str, delimiter: u8) -> String {
    let mut sql = format!(
        "COPY {table} FROM '{}' IAM_ROLE '{}' CSV IGNOREHEADER 1",
        quote_literal(source_uri),
        quote_literal(iam_role_arn)
    );
    if delimiter != b',' {
        sql.push_str(&format!(
            " DELIMITER '{}'",
            quote_literal(&char::from(delimiter).to_string())
        ));
    }
    sql.push(';');
    sql
}

fn quote_literal(s: &str) -> String {
    s.replace('\'', "''")
}
