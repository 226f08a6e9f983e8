/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use super::connection::DatabaseConnection;
use super::models::{JobLogLevel, JobLogRecord, JobRecord, JobStats, JobStatus, JobUpdate};
use super::store::JobStore;
use crate::errors::StoreError;

const JOB_COLUMNS: &str = "id, content_id, target_language, status, progress, translated_title, \
     translated_content, tokens_used, error_message, external_id, created_at, updated_at";

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    // =========================================================================
    // Job Operations
    // =========================================================================

    /// Insert a new job
    pub async fn create_job(&self, job: &JobRecord) -> Result<()> {
        let job = job.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO jobs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                        JOB_COLUMNS
                    ),
                    params![
                        job.id,
                        job.content_id,
                        job.target_language,
                        job.status.to_string(),
                        job.progress,
                        job.translated_title,
                        job.translated_content,
                        job.tokens_used as i64,
                        job.error_message,
                        job.external_id,
                        job.created_at,
                        job.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| Self::get_job_sync(conn, &job_id))
            .await
    }

    /// Get a job by ID (synchronous version for use within transactions)
    fn get_job_sync(conn: &Connection, job_id: &str) -> Result<Option<JobRecord>> {
        let result = conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                [job_id],
                parse_job_row,
            )
            .optional()?;

        Ok(result)
    }

    /// Find a job for the same content and language that is still queued or running
    pub async fn find_active_job(
        &self,
        content_id: &str,
        target_language: &str,
    ) -> Result<Option<JobRecord>> {
        let content_id = content_id.to_string();
        let target_language = target_language.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM jobs
                             WHERE content_id = ?1 AND target_language = ?2
                               AND status IN ('pending', 'processing')
                             ORDER BY created_at DESC LIMIT 1",
                            JOB_COLUMNS
                        ),
                        params![content_id, target_language],
                        parse_job_row,
                    )
                    .optional()?;
                Ok(result)
            })
            .await
    }

    /// List jobs, newest first, optionally filtered by status
    pub async fn list_jobs(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<JobRecord>> {
        self.db
            .execute_async(move |conn| {
                let jobs = match status {
                    Some(status) => {
                        let mut stmt = conn.prepare(&format!(
                            "SELECT {} FROM jobs WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2",
                            JOB_COLUMNS
                        ))?;
                        let rows = stmt.query_map(params![status.to_string(), limit as i64], parse_job_row)?;
                        rows.collect::<rusqlite::Result<Vec<_>>>()?
                    }
                    None => {
                        let mut stmt = conn.prepare(&format!(
                            "SELECT {} FROM jobs ORDER BY created_at DESC LIMIT ?1",
                            JOB_COLUMNS
                        ))?;
                        let rows = stmt.query_map(params![limit as i64], parse_job_row)?;
                        rows.collect::<rusqlite::Result<Vec<_>>>()?
                    }
                };
                Ok(jobs)
            })
            .await
    }

    /// Delete a job and its logs; returns whether a row was removed
    pub async fn delete_job(&self, job_id: &str) -> Result<bool> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM jobs WHERE id = ?1", [&job_id])?;
                debug!("Deleted job {} ({} row)", job_id, deleted);
                Ok(deleted > 0)
            })
            .await
    }

    /// Apply a partial update inside a transaction, enforcing the state machine
    pub async fn update_job(&self, job_id: &str, update: JobUpdate) -> Result<JobRecord, StoreError> {
        if let Some(progress) = update.progress {
            if progress > 100 {
                return Err(StoreError::InvalidProgress(progress));
            }
        }

        let job_id = job_id.to_string();

        self.db
            .transaction_async(move |tx| {
                let Some(current) = Self::get_job_sync(tx, &job_id)? else {
                    return Ok(Err(StoreError::NotFound(job_id)));
                };

                if let Some(next) = update.status {
                    if !current.status.can_transition_to(next) {
                        return Ok(Err(StoreError::IllegalTransition {
                            job_id,
                            from: current.status.to_string(),
                            to: next.to_string(),
                        }));
                    }
                }

                tx.execute(
                    r#"
                    UPDATE jobs SET
                        status = COALESCE(?2, status),
                        progress = COALESCE(?3, progress),
                        translated_title = COALESCE(?4, translated_title),
                        translated_content = COALESCE(?5, translated_content),
                        tokens_used = COALESCE(?6, tokens_used),
                        error_message = COALESCE(?7, error_message),
                        external_id = COALESCE(?8, external_id),
                        updated_at = ?9
                    WHERE id = ?1
                    "#,
                    params![
                        job_id,
                        update.status.map(|s| s.to_string()),
                        update.progress,
                        update.translated_title,
                        update.translated_content,
                        update.tokens_used.map(|t| t as i64),
                        update.error_message,
                        update.external_id,
                        chrono::Utc::now().to_rfc3339(),
                    ],
                )?;

                let updated = Self::get_job_sync(tx, &job_id)?
                    .ok_or_else(|| anyhow::anyhow!("Job {} vanished during update", job_id))?;
                Ok(Ok(updated))
            })
            .await?
    }

    // =========================================================================
    // Log Operations
    // =========================================================================

    /// Append a log line for a job
    pub async fn insert_log(
        &self,
        job_id: &str,
        level: JobLogLevel,
        message: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<()> {
        let job_id = job_id.to_string();
        let message = message.to_string();
        let metadata = metadata.map(|m| m.to_string());

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO job_logs (job_id, level, message, metadata, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        job_id,
                        level.to_string(),
                        message,
                        metadata,
                        chrono::Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Get all log lines of a job in insertion order
    pub async fn get_logs(&self, job_id: &str) -> Result<Vec<JobLogRecord>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, job_id, level, message, metadata, created_at
                     FROM job_logs WHERE job_id = ?1 ORDER BY id",
                )?;

                let logs = stmt
                    .query_map([&job_id], |row| {
                        let metadata: Option<String> = row.get(4)?;
                        Ok(JobLogRecord {
                            id: row.get(0)?,
                            job_id: row.get(1)?,
                            level: row
                                .get::<_, String>(2)?
                                .parse()
                                .unwrap_or(JobLogLevel::Info),
                            message: row.get(3)?,
                            metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
                            created_at: row.get(5)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(logs)
            })
            .await
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Count jobs per status
    pub async fn stats(&self) -> Result<JobStats> {
        self.db
            .execute_async(|conn| {
                let mut stats = JobStats::default();
                let mut stmt = conn.prepare(
                    "SELECT status, COUNT(*), COALESCE(SUM(tokens_used), 0) FROM jobs GROUP BY status",
                )?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    let status: String = row.get(0)?;
                    let count: i64 = row.get(1)?;
                    stats.tokens_used += row.get::<_, i64>(2)?;
                    match status.parse::<JobStatus>() {
                        Ok(JobStatus::Pending) => stats.pending = count,
                        Ok(JobStatus::Processing) => stats.processing = count,
                        Ok(JobStatus::Completed) => stats.completed = count,
                        Ok(JobStatus::Published) => stats.published = count,
                        Ok(JobStatus::Failed) => stats.failed = count,
                        Err(_) => debug!("Ignoring unknown job status '{}'", status),
                    }
                }
                Ok(stats)
            })
            .await
    }
}

fn parse_job_row(row: &rusqlite::Row) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        id: row.get(0)?,
        content_id: row.get(1)?,
        target_language: row.get(2)?,
        status: row
            .get::<_, String>(3)?
            .parse()
            .unwrap_or(JobStatus::Pending),
        progress: row.get::<_, i64>(4)?.clamp(0, 100) as u8,
        translated_title: row.get(5)?,
        translated_content: row.get(6)?,
        tokens_used: row.get::<_, i64>(7)?.max(0) as u64,
        error_message: row.get(8)?,
        external_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[async_trait]
impl JobStore for Repository {
    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.get_job(job_id).await?)
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<JobRecord, StoreError> {
        self.update_job(job_id, update).await
    }

    async fn append_log(
        &self,
        job_id: &str,
        level: JobLogLevel,
        message: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), StoreError> {
        Ok(self.insert_log(job_id, level, message, metadata).await?)
    }
}
