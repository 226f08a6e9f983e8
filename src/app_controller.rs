use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::content::{ContentSource, WordPressClient};
use crate::database::{
    DatabaseConnection, JobLogRecord, JobRecord, JobStats, JobStatus, JobStore, Repository,
};
use crate::scheduler::{
    JobDescriptor, JobPipeline, PipelineSettings, RateLimiter, RetryPolicy, Scheduler, SchedulerStatus,
};
use crate::translation::{ProviderTranslator, Translator};

// @module: Application controller for translation jobs

/// Main application controller: owns the job store and the scheduler
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Job records and logs
    repository: Repository,
    // @field: Worker pool running the pipelines
    scheduler: Scheduler,
}

impl Controller {
    // @method: Build store, content source, translator and scheduler from configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let db = match &config.database_path {
            Some(path) => DatabaseConnection::new(path)?,
            None => DatabaseConnection::new_default()?,
        };
        let repository = Repository::new(db);

        let content: Arc<dyn ContentSource> = Arc::new(WordPressClient::new(&config.content_source));
        let translator: Arc<dyn Translator> = Arc::new(
            ProviderTranslator::from_config(&config.translation)
                .context("Failed to create translation provider")?,
        );
        let store: Arc<dyn JobStore> = Arc::new(repository.clone());

        Ok(Self::with_components(config, repository, store, content, translator))
    }

    /// Wire the controller from explicit parts
    ///
    /// `store` is what the pipelines write through; it normally wraps the same
    /// database as `repository`. Must be called inside a tokio runtime.
    pub fn with_components(
        config: Config,
        repository: Repository,
        store: Arc<dyn JobStore>,
        content: Arc<dyn ContentSource>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::per_minute(
            config.translation.get_rate_limit(),
            Duration::from_millis(config.scheduler.rate_limit_buffer_ms),
        ));

        let settings = PipelineSettings {
            source_language: config.source_language.clone(),
            instructions: config.translation.common.instructions.clone(),
            auto_publish: config.scheduler.auto_publish,
        };

        let pipeline = JobPipeline::new(store, content, translator, limiter, settings);
        let scheduler = Scheduler::start(
            pipeline,
            RetryPolicy::from_config(&config),
            config.scheduler.max_parallel_jobs,
        );

        Self {
            config,
            repository,
            scheduler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create jobs for the configured target language and schedule them
    pub async fn enqueue(&self, content_ids: &[String]) -> Result<Vec<JobRecord>> {
        let target_language = self.config.target_language.clone();
        self.enqueue_for(content_ids, &target_language).await
    }

    /// Create `Pending` jobs and submit them in order
    ///
    /// A content id that already has a pending or processing job for the
    /// language reuses that job instead of creating a second one.
    pub async fn enqueue_for(&self, content_ids: &[String], target_language: &str) -> Result<Vec<JobRecord>> {
        let mut jobs = Vec::with_capacity(content_ids.len());

        for content_id in content_ids {
            let content_id = content_id.trim();
            if content_id.is_empty() {
                warn!("Skipping empty content id");
                continue;
            }

            let job = match self.repository.find_active_job(content_id, target_language).await? {
                Some(existing) => {
                    info!(
                        "Content {} already has job {} ({}), reusing it",
                        content_id, existing.id, existing.status
                    );
                    existing
                }
                None => {
                    let job = JobRecord::new(content_id, target_language);
                    self.repository.create_job(&job).await?;
                    debug!("Created job {} for content {}", job.id, content_id);
                    job
                }
            };

            self.scheduler
                .submit(JobDescriptor::new(&job.id, &job.content_id, &job.target_language));
            jobs.push(job);
        }

        Ok(jobs)
    }

    /// Wait until every scheduled job reached a terminal state
    pub async fn wait_until_idle(&self) {
        self.scheduler.wait_idle().await;
    }

    /// Enqueue, then wait with a progress bar of finished jobs
    pub async fn translate_with_progress(&self, content_ids: &[String]) -> Result<Vec<JobRecord>> {
        let start_time = Instant::now();
        let jobs = self.enqueue(content_ids).await?;
        if jobs.is_empty() {
            return Err(anyhow!("No content ids to translate"));
        }

        info!(
            "Translating {} item(s) into {} with {} - {}",
            jobs.len(),
            self.config.target_language,
            self.config.translation.provider.display_name(),
            self.config.translation.get_model()
        );

        let progress_bar = ProgressBar::new(jobs.len() as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} jobs ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");

        let idle = self.wait_until_idle();
        tokio::pin!(idle);
        let mut ticker = tokio::time::interval(Duration::from_millis(250));

        loop {
            tokio::select! {
                _ = &mut idle => break,
                _ = ticker.tick() => {
                    let finished = self.reload(&jobs).await?
                        .iter()
                        .filter(|job| job.as_ref().is_none_or(|j| j.status.is_terminal()))
                        .count();
                    progress_bar.set_position(finished as u64);
                }
            }
        }
        progress_bar.finish_and_clear();

        let results: Vec<JobRecord> = self.reload(&jobs).await?.into_iter().flatten().collect();
        info!(
            "Finished {} job(s) in {}",
            results.len(),
            Self::format_duration(start_time.elapsed())
        );
        Ok(results)
    }

    async fn reload(&self, jobs: &[JobRecord]) -> Result<Vec<Option<JobRecord>>> {
        let mut records = Vec::with_capacity(jobs.len());
        for job in jobs {
            records.push(self.repository.get_job(&job.id).await?);
        }
        Ok(records)
    }

    /// Publish a completed job out-of-band
    pub async fn publish_job(&self, job_id: &str) -> Result<JobRecord> {
        let record = self
            .repository
            .get_job(job_id)
            .await?
            .ok_or_else(|| anyhow!("Job {} not found", job_id))?;

        Ok(self.scheduler.pipeline().publish(&record).await?)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.repository.get_job(job_id).await
    }

    pub async fn list_jobs(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<JobRecord>> {
        self.repository.list_jobs(status, limit).await
    }

    pub async fn job_logs(&self, job_id: &str) -> Result<Vec<JobLogRecord>> {
        self.repository.get_logs(job_id).await
    }

    /// Delete a job record and its logs
    ///
    /// A running attempt is not interrupted; it stops at its next store access.
    pub async fn delete_job(&self, job_id: &str) -> Result<bool> {
        let deleted = self.repository.delete_job(job_id).await?;
        if deleted {
            info!("Deleted job {}", job_id);
        }
        Ok(deleted)
    }

    pub async fn stats(&self) -> Result<JobStats> {
        self.repository.stats().await
    }

    pub fn scheduler_status(&self) -> SchedulerStatus {
        self.scheduler.status()
    }

    /// Stop the scheduler; returns descriptors that never started
    pub async fn shutdown(&self) -> Vec<JobDescriptor> {
        self.scheduler.shutdown().await
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
