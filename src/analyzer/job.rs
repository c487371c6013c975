use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of an asynchronous analysis job on the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the job id from a submission response.
    /// A missing, null or empty `id` means the service answered synchronously.
    pub fn from_submission(body: &Value) -> Option<Self> {
        match body.get("id") {
            Some(Value::String(id)) if !id.is_empty() => Some(Self(id.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed,
    Canceled,
    /// Anything else, including `NotStarted`, `Running` and a missing field.
    InProgress(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("succeeded") {
            JobStatus::Succeeded
        } else if raw.eq_ignore_ascii_case("failed") {
            JobStatus::Failed
        } else if raw.eq_ignore_ascii_case("canceled") {
            JobStatus::Canceled
        } else {
            JobStatus::InProgress(raw.to_string())
        }
    }
}

/// Job document returned by the service. Serialized back to callers untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobResult(Value);

impl JobResult {
    pub fn new(body: Value) -> Self {
        Self(body)
    }

    pub fn raw_status(&self) -> &str {
        self.0.get("status").and_then(Value::as_str).unwrap_or("")
    }

    /// `None` when `status` is present but null or not a string.
    pub fn status(&self) -> Option<JobStatus> {
        match self.0.get("status") {
            None => Some(JobStatus::InProgress(String::new())),
            Some(Value::String(raw)) => Some(JobStatus::parse(raw)),
            Some(_) => None,
        }
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}
