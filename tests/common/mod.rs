/*!
 * Common test utilities for the lingopost test suite
 *
 * Scripted collaborators for the scheduler: a content source backed by a
 * map, a translator that follows an error script and records its calls, and
 * a job store that records every write the pipelines make.
 */

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use lingopost::app_config::Config;
use lingopost::content::{ContentItem, ContentSource};
use lingopost::database::{JobLogLevel, JobRecord, JobStatus, JobStore, JobUpdate, Repository};
use lingopost::errors::{ContentSourceError, ProviderError, StoreError};
use lingopost::translation::{Translation, Translator};
use lingopost::Controller;

/// Tokens reported for every successful title call
pub const TITLE_TOKENS: u64 = 3;
/// Tokens reported for every successful body call
pub const BODY_TOKENS: u64 = 7;

/// Initialize test logging once; repeated calls are ignored
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Config with fast retries, no rate limit and no auto-publish
pub fn test_config(max_parallel: usize, max_retries: u32, base_delay_ms: u64) -> Config {
    let mut config = Config::default();
    config.scheduler.max_parallel_jobs = max_parallel;
    config.scheduler.rate_limit_buffer_ms = 0;
    config.scheduler.auto_publish = false;
    config.translation.common.retry_count = max_retries;
    config.translation.common.retry_backoff_ms = base_delay_ms;
    if let Some(provider) = config.translation.get_active_provider_config_mut() {
        provider.rate_limit = None;
    }
    config
}

/// Content ids as owned strings
pub fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

// =========================================================================
// Content source
// =========================================================================

/// Content source backed by an in-memory map
#[derive(Default)]
pub struct ScriptedSource {
    items: Mutex<HashMap<String, ContentItem>>,
    fetch_delay: Mutex<Duration>,
    publish_error: Mutex<Option<ContentSourceError>>,
    not_configured: Mutex<bool>,
    published: Mutex<Vec<(String, String)>>,
    fetch_count: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source with one `Title {id}` / `<p>Body {id}</p>` item per id
    pub fn with_ids(content_ids: &[&str]) -> Self {
        let source = Self::new();
        for id in content_ids {
            source.add_item(id, &format!("Title {}", id), &format!("<p>Body {}</p>", id));
        }
        source
    }

    pub fn add_item(&self, content_id: &str, title: &str, body: &str) {
        self.items
            .lock()
            .insert(content_id.to_string(), ContentItem::new(title, body));
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = delay;
    }

    pub fn fail_publish(&self, error: ContentSourceError) {
        *self.publish_error.lock() = Some(error);
    }

    pub fn set_not_configured(&self) {
        *self.not_configured.lock() = true;
    }

    /// (content id, language) pairs published so far
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    fn ensure_configured(&self) -> Result<(), ContentSourceError> {
        if *self.not_configured.lock() {
            return Err(ContentSourceError::NotConfigured("no base url".to_string()));
        }
        Ok(())
    }

    async fn fetch(&self, content_id: &str) -> Result<ContentItem, ContentSourceError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.items
            .lock()
            .get(content_id)
            .cloned()
            .ok_or_else(|| ContentSourceError::NotFound(content_id.to_string()))
    }

    async fn publish(
        &self,
        content_id: &str,
        target_language: &str,
        _title: &str,
        _body: &str,
    ) -> Result<String, ContentSourceError> {
        if let Some(error) = self.publish_error.lock().clone() {
            return Err(error);
        }
        let mut published = self.published.lock();
        published.push((content_id.to_string(), target_language.to_string()));
        Ok(format!("wp-{}", published.len()))
    }
}

// =========================================================================
// Translator
// =========================================================================

/// Which translator method a recorded call went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Title,
    Body,
}

/// One recorded translator call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub text: String,
    pub at: Instant,
}

/// Translator that follows a per-call error script
///
/// Body calls pop the next scripted error, if any. `fail_always` applies to
/// every call. Output is `T:{text}` for titles and `B:{text}` for bodies.
#[derive(Default)]
pub struct ScriptedTranslator {
    body_script: Mutex<VecDeque<ProviderError>>,
    fail_always: Mutex<Option<ProviderError>>,
    not_configured: Mutex<Option<ProviderError>>,
    panic_marker: Mutex<Option<String>>,
    delay: Mutex<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors returned by the next body calls, in order
    pub fn script_body_errors(&self, errors: Vec<ProviderError>) {
        self.body_script.lock().extend(errors);
    }

    pub fn fail_always(&self, error: ProviderError) {
        *self.fail_always.lock() = Some(error);
    }

    pub fn set_not_configured(&self, error: ProviderError) {
        *self.not_configured.lock() = Some(error);
    }

    /// Panic while translating any body containing `marker`
    pub fn panic_on(&self, marker: &str) {
        *self.panic_marker.lock() = Some(marker.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Bodies passed to `translate_body`, in call order
    pub fn body_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.kind == CallKind::Body)
            .map(|c| c.text.clone())
            .collect()
    }

    /// Highest number of calls that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn call(&self, kind: CallKind, text: &str) -> Result<Translation, ProviderError> {
        self.calls.lock().push(RecordedCall {
            kind,
            text: text.to_string(),
            at: Instant::now(),
        });

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.fail_always.lock().clone() {
            return Err(error);
        }

        match kind {
            CallKind::Title => Ok(Translation::new(format!("T:{}", text), TITLE_TOKENS)),
            CallKind::Body => {
                let marker = self.panic_marker.lock().clone();
                if let Some(marker) = marker {
                    if text.contains(&marker) {
                        panic!("translator blew up on {}", marker);
                    }
                }
                let scripted = self.body_script.lock().pop_front();
                match scripted {
                    Some(error) => Err(error),
                    None => Ok(Translation::new(format!("B:{}", text), BODY_TOKENS)),
                }
            }
        }
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    fn name(&self) -> String {
        "Scripted".to_string()
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        match self.not_configured.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn translate_title(
        &self,
        text: &str,
        _source_language: &str,
        _target_language: &str,
    ) -> Result<Translation, ProviderError> {
        self.call(CallKind::Title, text).await
    }

    async fn translate_body(
        &self,
        text: &str,
        _source_language: &str,
        _target_language: &str,
        _instructions: Option<&str>,
    ) -> Result<Translation, ProviderError> {
        self.call(CallKind::Body, text).await
    }
}

// =========================================================================
// Job store
// =========================================================================

/// Job store that delegates to a repository and records every write
pub struct RecordingStore {
    inner: Repository,
    statuses: Mutex<HashMap<String, JobStatus>>,
    progress: Mutex<HashMap<String, Vec<u8>>>,
    max_processing: AtomicUsize,
}

impl RecordingStore {
    pub fn new(inner: Repository) -> Self {
        Self {
            inner,
            statuses: Mutex::new(HashMap::new()),
            progress: Mutex::new(HashMap::new()),
            max_processing: AtomicUsize::new(0),
        }
    }

    /// Persisted progress values of a job, in write order
    pub fn progress_history(&self, job_id: &str) -> Vec<u8> {
        self.progress.lock().get(job_id).cloned().unwrap_or_default()
    }

    /// Highest number of jobs persisted as `Processing` at the same time
    pub fn max_processing(&self) -> usize {
        self.max_processing.load(Ordering::SeqCst)
    }

    fn record(&self, record: &JobRecord) {
        self.progress
            .lock()
            .entry(record.id.clone())
            .or_default()
            .push(record.progress);

        let mut statuses = self.statuses.lock();
        statuses.insert(record.id.clone(), record.status);
        let processing = statuses
            .values()
            .filter(|s| **s == JobStatus::Processing)
            .count();
        self.max_processing.fetch_max(processing, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for RecordingStore {
    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        self.inner.get(job_id).await
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<JobRecord, StoreError> {
        let record = self.inner.update(job_id, update).await?;
        self.record(&record);
        Ok(record)
    }

    async fn append_log(
        &self,
        job_id: &str,
        level: JobLogLevel,
        message: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), StoreError> {
        self.inner.append_log(job_id, level, message, metadata).await
    }
}

// =========================================================================
// Harness
// =========================================================================

/// Controller wired to scripted collaborators
pub struct Harness {
    pub controller: Controller,
    pub repository: Repository,
    pub store: Arc<RecordingStore>,
    pub source: Arc<ScriptedSource>,
    pub translator: Arc<ScriptedTranslator>,
}

impl Harness {
    /// Must be called inside a tokio runtime
    pub fn new(config: Config, source: ScriptedSource) -> Self {
        Self::with_translator(config, source, ScriptedTranslator::new())
    }

    pub fn with_translator(config: Config, source: ScriptedSource, translator: ScriptedTranslator) -> Self {
        init_logging();

        let repository = Repository::new_in_memory().expect("in-memory database");
        let store = Arc::new(RecordingStore::new(repository.clone()));
        let source = Arc::new(source);
        let translator = Arc::new(translator);

        let controller = Controller::with_components(
            config,
            repository.clone(),
            store.clone(),
            source.clone(),
            translator.clone(),
        );

        Self {
            controller,
            repository,
            store,
            source,
            translator,
        }
    }

    /// Enqueue the ids, wait for the scheduler to drain and reload the jobs
    pub async fn run(&self, content_ids: &[&str]) -> Vec<JobRecord> {
        let jobs = self
            .controller
            .enqueue(&ids(content_ids))
            .await
            .expect("enqueue");
        self.wait_idle().await;

        let mut records = Vec::with_capacity(jobs.len());
        for job in jobs {
            records.push(
                self.repository
                    .get_job(&job.id)
                    .await
                    .expect("get job")
                    .expect("job exists"),
            );
        }
        records
    }

    /// Wait for idle, failing the test instead of hanging
    pub async fn wait_idle(&self) {
        tokio::time::timeout(Duration::from_secs(10), self.controller.wait_until_idle())
            .await
            .expect("scheduler did not become idle");
    }

    /// Messages of a job's log, oldest first
    pub async fn log_messages(&self, job_id: &str) -> Vec<String> {
        self.controller
            .job_logs(job_id)
            .await
            .expect("job logs")
            .into_iter()
            .map(|entry| entry.message)
            .collect()
    }
}
