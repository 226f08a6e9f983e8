/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Job status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, waiting for a scheduler slot
    Pending,
    /// Admitted and running (also while retrying)
    Processing,
    /// Translation stored
    Completed,
    /// Translation pushed to the content source
    Published,
    /// Terminal failure
    Failed,
}

impl JobStatus {
    /// Whether the state machine allows moving from `self` to `next`
    ///
    /// Re-asserting the current status is accepted so a retried attempt can
    /// mark its job `Processing` again.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Processing)
                    | (Processing, Completed)
                    | (Processing, Failed)
                    | (Completed, Published)
            )
    }

    /// No further transitions except the optional publish step
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Published | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Published => write!(f, "published"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "published" => Ok(JobStatus::Published),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Severity of a job log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobLogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for JobLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobLogLevel::Debug => write!(f, "debug"),
            JobLogLevel::Info => write!(f, "info"),
            JobLogLevel::Warning => write!(f, "warning"),
            JobLogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for JobLogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(JobLogLevel::Debug),
            "info" => Ok(JobLogLevel::Info),
            "warning" => Ok(JobLogLevel::Warning),
            "error" => Ok(JobLogLevel::Error),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

/// Translation job record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier (UUID)
    pub id: String,
    /// Identifier of the item in the content source
    pub content_id: String,
    /// Target language code
    pub target_language: String,
    /// Current job status
    pub status: JobStatus,
    /// Progress checkpoint, 0-100
    pub progress: u8,
    /// Translated title, set on success
    pub translated_title: Option<String>,
    /// Translated body, set on success
    pub translated_content: Option<String>,
    /// Cumulative provider token usage
    pub tokens_used: u64,
    /// Failure reason, set when failed
    pub error_message: Option<String>,
    /// Identifier assigned by the content source on publish
    pub external_id: Option<String>,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last update timestamp (ISO 8601)
    pub updated_at: String,
}

impl JobRecord {
    /// Create a new pending job with a fresh id
    pub fn new(content_id: impl Into<String>, target_language: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content_id: content_id.into(),
            target_language: target_language.into(),
            status: JobStatus::Pending,
            progress: 0,
            translated_title: None,
            translated_content: None,
            tokens_used: 0,
            error_message: None,
            external_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Partial update of a job record; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub translated_title: Option<String>,
    pub translated_content: Option<String>,
    pub tokens_used: Option<u64>,
    pub error_message: Option<String>,
    pub external_id: Option<String>,
}

impl JobUpdate {
    /// Only move the progress checkpoint
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    /// Change status and progress together
    pub fn status(status: JobStatus, progress: u8) -> Self {
        Self {
            status: Some(status),
            progress: Some(progress),
            ..Default::default()
        }
    }

    /// Terminal failure with a message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Whether the update changes anything
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One line of a job's durable log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogRecord {
    /// Row id
    pub id: i64,
    /// Owning job
    pub job_id: String,
    /// Severity
    pub level: JobLogLevel,
    /// Human readable message
    pub message: String,
    /// Structured context (JSON)
    pub metadata: Option<serde_json::Value>,
    /// Timestamp (ISO 8601)
    pub created_at: String,
}

/// Job counts per status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub published: i64,
    pub failed: i64,
    /// Sum of tokens over all jobs
    pub tokens_used: i64,
}

impl JobStats {
    /// All jobs regardless of status
    pub fn total(&self) -> i64 {
        self.pending + self.processing + self.completed + self.published + self.failed
    }
}

impl fmt::Display for JobStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Jobs: {} (pending {}, processing {}, completed {}, published {}, failed {}), tokens used: {}",
            self.total(),
            self.pending,
            self.processing,
            self.completed,
            self.published,
            self.failed,
            self.tokens_used
        )
    }
}
