//! Warehouse connection settings.
//!
//! [`WarehouseConfig`] can be read from a JSON file or from environment variables:
//!
//! | key              | environment variable  | required |
//! |------------------|-----------------------|----------|
//! | `database`       | `REDSHIFT_DATABASE`   | yes      |
//! | `workgroup`      | `REDSHIFT_WORKGROUP`  | yes      |
//! | `iam_role_arn`   | `REDSHIFT_ROLE_ARN`   | yes      |
//! | `bucket`         | `SOURCE_BUCKET`       | yes      |
//! | `staging_prefix` | `STAGING_PREFIX`      | no (`temp`) |

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LoadResult};

/// Settings used by the statement-based sink and the staged loader.
///
/// `database` and `workgroup` identify where statements run; the host's
/// [`crate::warehouse::StatementExecutor`] reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseConfig {
    pub database: String,
    pub workgroup: String,
    /// Role the warehouse assumes to read staged payloads.
    pub iam_role_arn: String,
    /// Bucket holding uploads and staged payloads.
    pub bucket: String,
    /// Key prefix for staged payloads.
    #[serde(default = "default_staging_prefix")]
    pub staging_prefix: String,
}

fn default_staging_prefix() -> String {
    "temp".to_string()
}

impl WarehouseConfig {
    /// Read settings from a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> LoadResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Read settings from a JSON document.
    pub fn from_json_str(input: &str) -> LoadResult<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()
    }

    /// Read settings from the process environment.
    pub fn from_env() -> LoadResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps an environment variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> LoadResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| LoadError::Config {
                message: format!("missing environment variable {key}"),
            })
        };
        let config = Self {
            database: required("REDSHIFT_DATABASE")?,
            workgroup: required("REDSHIFT_WORKGROUP")?,
            iam_role_arn: required("REDSHIFT_ROLE_ARN")?,
            bucket: required("SOURCE_BUCKET")?,
            staging_prefix: lookup("STAGING_PREFIX").unwrap_or_else(default_staging_prefix),
        };
        config.validate()
    }

    /// Key under which the payload for `table` is staged.
    pub fn staging_key(&self, table: &str) -> String {
        let prefix = self.staging_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            format!("{table}.csv")
        } else {
            format!("{prefix}/{table}.csv")
        }
    }

    fn validate(self) -> LoadResult<Self> {
        for (name, value) in [
            ("database", &self.database),
            ("workgroup", &self.workgroup),
            ("iam_role_arn", &self.iam_role_arn),
            ("bucket", &self.bucket),
        ] {
            if value.trim().is_empty() {
                return Err(LoadError::Config {
                    message: format!("'{name}' must not be empty"),
                });
            }
        }
        Ok(self)
    }
}
