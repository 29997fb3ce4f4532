//! Hash field names and value encoding.
//!
//! Tasks are stored as flat string hashes. Timestamps are RFC 3339 strings
//! with millisecond precision; `result` and `error` hold JSON text.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};

pub const VIDEO_URL: &str = "videoUrl";
pub const VIDEO_ID: &str = "videoId";
pub const STATUS: &str = "status";
pub const CREATED_AT: &str = "createdAt";
pub const PROCESSING_STARTED_AT: &str = "processingStartedAt";
pub const COMPLETED_AT: &str = "completedAt";
pub const RESULT: &str = "result";
pub const ERROR: &str = "error";

/// Fields owned by the task model. Anything else in a hash is carried
/// through rewrites untouched.
pub const KNOWN: [&str; 8] = [
    VIDEO_URL,
    VIDEO_ID,
    STATUS,
    CREATED_AT,
    PROCESSING_STARTED_AT,
    COMPLETED_AT,
    RESULT,
    ERROR,
];

/// Current time truncated to milliseconds, matching the stored precision.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_timestamp(field: &'static str, raw: &str) -> ModelResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ModelError::InvalidTimestamp {
            field,
            value: raw.to_string(),
        })
}

pub fn encode_value(value: Option<&Value>) -> String {
    value.unwrap_or(&Value::Null).to_string()
}

/// Decode a stored `result`/`error` field. Text that is not JSON (written
/// by some other producer) comes back as a JSON string.
pub fn decode_value(raw: Option<&str>) -> Option<Value> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(raw.to_string())),
    }
}
