/*!
 * Job record store abstraction.
 *
 * The scheduler only needs three operations on durable job state. Keeping
 * them behind a trait lets tests observe every write a pipeline makes.
 */

use async_trait::async_trait;

use super::models::{JobLogLevel, JobRecord, JobUpdate};
use crate::errors::StoreError;

/// Durable state for translation jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch a job, `None` if it does not exist (for example after deletion)
    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError>;

    /// Apply a partial update and return the resulting record
    ///
    /// Implementations must reject status changes the job state machine
    /// does not allow.
    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<JobRecord, StoreError>;

    /// Append a line to the job's log
    async fn append_log(
        &self,
        job_id: &str,
        level: JobLogLevel,
        message: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), StoreError>;
}
