/*!
 * Per-job pipeline: fetch, translate, persist, publish.
 *
 * Each step persists a progress checkpoint before moving on. A pipeline run
 * never lowers the persisted progress, so a retried attempt resumes
 * reporting from where the previous one stopped.
 */

use log::{debug, error, info, warn};
use serde_json::json;
use std::sync::Arc;

use super::rate_limiter::RateLimiter;
use super::JobDescriptor;
use crate::content::ContentSource;
use crate::database::{JobLogLevel, JobRecord, JobStatus, JobStore, JobUpdate};
use crate::errors::JobError;
use crate::translation::{Translation, Translator};

/// Progress checkpoints
pub mod progress {
    pub const STARTED: u8 = 10;
    pub const FETCHING: u8 = 20;
    pub const PREPARED: u8 = 40;
    pub const TRANSLATING: u8 = 60;
    pub const PERSISTED: u8 = 80;
    pub const DONE: u8 = 100;
}

/// Settings shared by every job run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Language the content is written in
    pub source_language: String,
    /// Extra instructions for body translations
    pub instructions: Option<String>,
    /// Push completed translations to the content source
    pub auto_publish: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            instructions: None,
            auto_publish: false,
        }
    }
}

/// Drives one job from `Processing` to a terminal state
pub struct JobPipeline {
    store: Arc<dyn JobStore>,
    content: Arc<dyn ContentSource>,
    translator: Arc<dyn Translator>,
    limiter: Arc<RateLimiter>,
    settings: PipelineSettings,
}

impl JobPipeline {
    pub fn new(
        store: Arc<dyn JobStore>,
        content: Arc<dyn ContentSource>,
        translator: Arc<dyn Translator>,
        limiter: Arc<RateLimiter>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            content,
            translator,
            limiter,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one attempt of the job; `attempt` counts retries so far.
    ///
    /// Errors are returned unclassified. Marking the job failed is left to
    /// the caller, which decides between retrying and giving up.
    pub async fn run(&self, job: &JobDescriptor, attempt: u32) -> Result<JobRecord, JobError> {
        let record = self
            .store
            .get(&job.job_id)
            .await?
            .ok_or_else(|| JobError::JobMissing(job.job_id.clone()))?;

        if record.status.is_terminal() {
            warn!("Job {} is already {}, skipping", job.job_id, record.status);
            return Ok(record);
        }

        // Step 1: mark processing
        let mut current = record.progress.max(progress::STARTED);
        // Tokens billed by earlier attempts stay on the job
        let mut spent = record.tokens_used;
        self.store
            .update(&job.job_id, JobUpdate::status(JobStatus::Processing, current))
            .await?;

        let start_message = if attempt == 0 {
            format!("Started translating {} into {}", job.content_id, job.target_language)
        } else {
            format!("Retry {} of {} into {}", attempt, job.content_id, job.target_language)
        };
        self.log(
            &job.job_id,
            JobLogLevel::Info,
            &start_message,
            Some(json!({
                "content_id": job.content_id,
                "target_language": job.target_language,
                "attempt": attempt,
                "translator": self.translator.name(),
            })),
        )
        .await;

        // Step 2: configuration
        self.content
            .ensure_configured()
            .map_err(|e| JobError::Configuration(e.to_string()))?;
        self.translator
            .ensure_configured()
            .map_err(|e| JobError::Configuration(e.to_string()))?;

        // Step 3: fetch
        self.checkpoint(&job.job_id, &mut current, progress::FETCHING).await?;
        let item = self.content.fetch(&job.content_id).await?;

        // Step 4: prepared content
        self.checkpoint(&job.job_id, &mut current, progress::PREPARED).await?;
        if item.is_empty() {
            let record = self
                .store
                .update(
                    &job.job_id,
                    JobUpdate {
                        translated_title: Some(item.title.clone()),
                        translated_content: Some(String::new()),
                        tokens_used: Some(spent),
                        ..JobUpdate::status(JobStatus::Completed, progress::DONE)
                    },
                )
                .await?;
            self.log(
                &job.job_id,
                JobLogLevel::Info,
                "Content is empty, nothing to translate",
                None,
            )
            .await;
            return Ok(record);
        }

        // Step 5: title
        self.checkpoint(&job.job_id, &mut current, progress::TRANSLATING).await?;
        let source_language = &self.settings.source_language;
        let title = if item.title.trim().is_empty() {
            Translation::default()
        } else {
            self.limiter.await_slot().await;
            self.translator
                .translate_title(&item.title, source_language, &job.target_language)
                .await?
        };
        spent = self.add_tokens(&job.job_id, spent, title.tokens_used).await?;
        debug!("Job {}: title translated ({} tokens)", job.job_id, title.tokens_used);

        // Step 6: body
        self.limiter.await_slot().await;
        let body = self
            .translator
            .translate_body(
                &item.body,
                source_language,
                &job.target_language,
                self.settings.instructions.as_deref(),
            )
            .await?;
        spent += body.tokens_used;

        // Step 7: persist
        current = current.max(progress::PERSISTED);
        self.store
            .update(
                &job.job_id,
                JobUpdate {
                    progress: Some(current),
                    translated_title: Some(title.text),
                    translated_content: Some(body.text),
                    tokens_used: Some(spent),
                    ..Default::default()
                },
            )
            .await?;

        // Step 8: completed
        let record = self
            .store
            .update(&job.job_id, JobUpdate::status(JobStatus::Completed, progress::DONE))
            .await?;
        self.log(
            &job.job_id,
            JobLogLevel::Info,
            "Translation completed",
            Some(json!({ "tokens_used": spent })),
        )
        .await;

        // Step 9: optional publish, failures keep the job completed
        if self.settings.auto_publish {
            return match self.publish(&record).await {
                Ok(published) => Ok(published),
                Err(e) => {
                    self.log(
                        &job.job_id,
                        JobLogLevel::Warning,
                        &format!("Auto-publish failed, job stays completed: {}", e),
                        None,
                    )
                    .await;
                    Ok(record)
                }
            };
        }

        Ok(record)
    }

    /// Persist tokens as soon as they are billed, so a later failure keeps them
    async fn add_tokens(&self, job_id: &str, spent: u64, tokens: u64) -> Result<u64, JobError> {
        if tokens == 0 {
            return Ok(spent);
        }
        let total = spent + tokens;
        self.store
            .update(
                job_id,
                JobUpdate {
                    tokens_used: Some(total),
                    ..Default::default()
                },
            )
            .await?;
        Ok(total)
    }

    /// Push a completed translation to the content source
    pub async fn publish(&self, record: &JobRecord) -> Result<JobRecord, JobError> {
        if record.status == JobStatus::Published {
            return Ok(record.clone());
        }
        if record.status != JobStatus::Completed {
            return Err(JobError::Configuration(format!(
                "Job {} is {}, only completed jobs can be published",
                record.id, record.status
            )));
        }

        let external_id = self
            .content
            .publish(
                &record.content_id,
                &record.target_language,
                record.translated_title.as_deref().unwrap_or_default(),
                record.translated_content.as_deref().unwrap_or_default(),
            )
            .await?;

        let published = self
            .store
            .update(
                &record.id,
                JobUpdate {
                    status: Some(JobStatus::Published),
                    external_id: Some(external_id.clone()),
                    ..Default::default()
                },
            )
            .await?;

        self.log(
            &record.id,
            JobLogLevel::Info,
            &format!("Published as {}", external_id),
            Some(json!({ "external_id": external_id })),
        )
        .await;

        Ok(published)
    }

    /// Persist a terminal failure
    pub async fn fail(&self, job: &JobDescriptor, message: &str, retries: u32) {
        let result = async {
            let Some(record) = self.store.get(&job.job_id).await? else {
                return Ok(false);
            };
            if record.status == JobStatus::Pending {
                self.store
                    .update(&job.job_id, JobUpdate::status(JobStatus::Processing, record.progress))
                    .await?;
            }
            self.store.update(&job.job_id, JobUpdate::failed(message)).await?;
            Ok::<bool, JobError>(true)
        }
        .await;

        match result {
            Ok(true) => {
                self.log(
                    &job.job_id,
                    JobLogLevel::Error,
                    &format!("Job failed: {}", message),
                    Some(json!({ "retries": retries })),
                )
                .await;
            }
            Ok(false) => warn!("Job {} vanished before it could be marked failed", job.job_id),
            Err(e) => error!("Could not mark job {} failed ({}): {}", job.job_id, message, e),
        }
    }

    /// Write to the process log and the job's durable log
    pub async fn log(
        &self,
        job_id: &str,
        level: JobLogLevel,
        message: &str,
        metadata: Option<serde_json::Value>,
    ) {
        match level {
            JobLogLevel::Debug => debug!("[job {}] {}", job_id, message),
            JobLogLevel::Info => info!("[job {}] {}", job_id, message),
            JobLogLevel::Warning => warn!("[job {}] {}", job_id, message),
            JobLogLevel::Error => error!("[job {}] {}", job_id, message),
        }

        if let Err(e) = self.store.append_log(job_id, level, message, metadata).await {
            warn!("Could not append to log of job {}: {}", job_id, e);
        }
    }

    async fn checkpoint(&self, job_id: &str, current: &mut u8, value: u8) -> Result<(), JobError> {
        if value > *current {
            self.store.update(job_id, JobUpdate::progress(value)).await?;
            *current = value;
        }
        Ok(())
    }
}
