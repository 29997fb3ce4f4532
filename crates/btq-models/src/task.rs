//! Task record and lifecycle.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::fields;
use crate::video::extract_video_id;

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Task identifier, also the store key of the task hash.
///
/// Generated ids look like `task_1714552200123_k3j9x0q2m`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new id from the current epoch millis and a random suffix.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now().timestamp_millis())
    }

    fn generate_at(epoch_millis: i64) -> Self {
        let mut entropy = Uuid::new_v4().as_u128();
        let mut suffix = String::with_capacity(SUFFIX_LEN);
        for _ in 0..SUFFIX_LEN {
            suffix.push(BASE36[(entropy % 36) as usize] as char);
            entropy /= 36;
        }
        Self(format!("task_{}_{}", epoch_millis, suffix))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Task processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the pending list
    #[default]
    Pending,
    /// Claimed by a worker
    Processing,
    /// Worker reported a result
    Completed,
    /// Worker reported an error
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(ModelError::InvalidStatus(other.to_string())),
        }
    }
}

/// What a worker reports when it is done with a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl TaskOutcome {
    pub fn success(result: impl Into<Value>) -> Self {
        Self {
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<Value>) -> Self {
        Self {
            result: None,
            error: Some(error.into()),
        }
    }

    /// A report is a failure when its `error` is truthy: `null`, `false`,
    /// `0` and `""` do not count as errors.
    pub fn is_failure(&self) -> bool {
        match &self.error {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }
}

/// A queued video task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: TaskId,
    pub video_url: String,
    pub video_id: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    /// Hash fields written by someone other than this service.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Task {
    /// Create a pending task for a Bilibili URL.
    pub fn new(video_url: impl Into<String>) -> ModelResult<Self> {
        let video_url = video_url.into();
        let video_id = extract_video_id(&video_url)?;

        Ok(Self {
            task_id: TaskId::generate(),
            video_url,
            video_id,
            status: TaskStatus::Pending,
            created_at: fields::now_millis(),
            processing_started_at: None,
            completed_at: None,
            result: None,
            error: None,
            extra: BTreeMap::new(),
        })
    }

    /// Mark the task as claimed by a worker.
    pub fn start_processing(&mut self) {
        self.status = TaskStatus::Processing;
        self.processing_started_at = Some(fields::now_millis());
    }

    /// Record a worker report. No check is made on the current status.
    pub fn finish(&mut self, outcome: TaskOutcome) {
        self.status = if outcome.is_failure() {
            TaskStatus::Failed
        } else {
            TaskStatus::Completed
        };
        self.result = outcome.result.filter(|v| !v.is_null());
        self.error = outcome.error.filter(|v| !v.is_null());
        self.completed_at = Some(fields::now_millis());
    }

    /// Encode as hash fields.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(fields::KNOWN.len() + self.extra.len());
        out.push((fields::VIDEO_URL.into(), self.video_url.clone()));
        out.push((fields::VIDEO_ID.into(), self.video_id.clone()));
        out.push((fields::STATUS.into(), self.status.as_str().into()));
        out.push((fields::CREATED_AT.into(), fields::encode_timestamp(&self.created_at)));
        if let Some(ts) = &self.processing_started_at {
            out.push((fields::PROCESSING_STARTED_AT.into(), fields::encode_timestamp(ts)));
        }
        if let Some(ts) = &self.completed_at {
            out.push((fields::COMPLETED_AT.into(), fields::encode_timestamp(ts)));
        }
        out.push((fields::RESULT.into(), fields::encode_value(self.result.as_ref())));
        out.push((fields::ERROR.into(), fields::encode_value(self.error.as_ref())));
        out.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    /// Decode from the fields of a task hash.
    pub fn from_fields(task_id: TaskId, mut map: HashMap<String, String>) -> ModelResult<Self> {
        let status = map
            .remove(fields::STATUS)
            .ok_or(ModelError::MissingField(fields::STATUS))?
            .parse::<TaskStatus>()?;

        let created_raw = map
            .remove(fields::CREATED_AT)
            .ok_or(ModelError::MissingField(fields::CREATED_AT))?;
        let created_at = fields::decode_timestamp(fields::CREATED_AT, &created_raw)?;

        let processing_started_at = optional_timestamp(&mut map, fields::PROCESSING_STARTED_AT)?;
        let completed_at = optional_timestamp(&mut map, fields::COMPLETED_AT)?;

        let result = fields::decode_value(map.remove(fields::RESULT).as_deref());
        let error = fields::decode_value(map.remove(fields::ERROR).as_deref());

        Ok(Self {
            task_id,
            video_url: map.remove(fields::VIDEO_URL).unwrap_or_default(),
            video_id: map.remove(fields::VIDEO_ID).unwrap_or_default(),
            status,
            created_at,
            processing_started_at,
            completed_at,
            result,
            error,
            extra: map.into_iter().collect(),
        })
    }
}

fn optional_timestamp(
    map: &mut HashMap<String, String>,
    field: &'static str,
) -> ModelResult<Option<DateTime<Utc>>> {
    match map.remove(field) {
        Some(raw) if !raw.is_empty() && raw != "null" => {
            fields::decode_timestamp(field, &raw).map(Some)
        }
        _ => Ok(None),
    }
}
