//! File-arrival notifications from object storage.
//!
//! Accepts the notification document shape `{"Records": [{"s3": {"bucket": {"name": ...},
//! "object": {"key": ...}}}]}`; fields other than bucket and key are ignored.

use serde::Deserialize;

use crate::error::{LoadError, LoadResult};

/// One stored object named by a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

/// A parsed file-arrival notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArrivalEvent {
    /// Objects named by the notification, in record order.
    pub objects: Vec<ObjectRef>,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "Records", default)]
    records: Vec<RawRecord>,
}

#[derive(Deserialize)]
struct RawRecord {
    s3: RawS3,
}

#[derive(Deserialize)]
struct RawS3 {
    bucket: RawBucket,
    object: RawObject,
}

#[derive(Deserialize)]
struct RawBucket {
    name: String,
}

#[derive(Deserialize)]
struct RawObject {
    key: String,
}

impl FileArrivalEvent {
    /// Parse a notification document.
    ///
    /// A document without records is rejected with [`LoadError::InvalidEvent`].
    pub fn from_json(input: &str) -> LoadResult<Self> {
        let raw: RawEvent = serde_json::from_str(input)?;
        Self::from_raw(raw)
    }

    /// Parse an already-decoded notification document.
    pub fn from_value(value: serde_json::Value) -> LoadResult<Self> {
        let raw: RawEvent = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEvent) -> LoadResult<Self> {
        if raw.records.is_empty() {
            return Err(LoadError::InvalidEvent {
                message: "event has no records".to_string(),
            });
        }
        let objects = raw
            .records
            .into_iter()
            .map(|r| ObjectRef {
                bucket: r.s3.bucket.name,
                key: r.s3.object.key,
            })
            .collect();
        Ok(Self { objects })
    }
}
