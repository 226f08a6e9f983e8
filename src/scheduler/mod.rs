/*!
 * Job scheduler.
 *
 * A fixed pool of worker tasks pulls job descriptors from a shared FIFO
 * queue and drives each through the `JobPipeline`. The pool size is the
 * concurrency cap; a job waiting out a retry backoff keeps its slot, so the
 * number of jobs persisted as `Processing` never exceeds the cap either.
 *
 * - `rate_limiter`: sliding-window limiter shared by all provider calls
 * - `retry`: retryable/fatal classification and exponential backoff
 * - `pipeline`: the per-job state machine
 */

use futures::FutureExt;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub mod pipeline;
pub mod rate_limiter;
pub mod retry;

pub use pipeline::{JobPipeline, PipelineSettings};
pub use rate_limiter::RateLimiter;
pub use retry::{ErrorClass, RetryPolicy};

use crate::database::JobLogLevel;
use crate::errors::JobError;

/// Unit of scheduled work; the job record must exist before submission
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobDescriptor {
    pub job_id: String,
    pub content_id: String,
    pub target_language: String,
}

impl JobDescriptor {
    pub fn new(
        job_id: impl Into<String>,
        content_id: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            content_id: content_id.into(),
            target_language: target_language.into(),
        }
    }
}

/// Snapshot of the scheduler for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStatus {
    /// Descriptors waiting for a slot
    pub queue_length: usize,
    /// Slots in use, including jobs waiting out a backoff
    pub active_count: usize,
    /// Concurrency cap
    pub max_parallel: usize,
    /// Jobs currently waiting out a backoff
    pub retrying_count: usize,
}

#[derive(Debug, Default)]
struct SchedulerState {
    queue: VecDeque<JobDescriptor>,
    /// Job ids holding a slot
    active: HashSet<String>,
    /// Retries used so far, per job id
    retries: HashMap<String, u32>,
    /// Jobs sleeping before their next attempt
    backing_off: usize,
    shutdown: bool,
}

impl SchedulerState {
    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.active.is_empty()
    }

    fn release(&mut self, job_id: &str) {
        self.active.remove(job_id);
        self.retries.remove(job_id);
    }
}

struct Shared {
    state: Mutex<SchedulerState>,
    /// Signalled when work may be available or on shutdown
    work: Notify,
    /// Signalled when the scheduler becomes idle
    idle: Notify,
    pipeline: JobPipeline,
    policy: RetryPolicy,
    max_parallel: usize,
}

/// Bounded-concurrency job scheduler with retries
pub struct Scheduler {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Spawn `max_parallel` workers on the current tokio runtime
    pub fn start(pipeline: JobPipeline, policy: RetryPolicy, max_parallel: usize) -> Self {
        let max_parallel = max_parallel.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(SchedulerState::default()),
            work: Notify::new(),
            idle: Notify::new(),
            pipeline,
            policy,
            max_parallel,
        });

        let workers = (0..max_parallel)
            .map(|worker_id| tokio::spawn(worker_loop(Arc::clone(&shared), worker_id)))
            .collect();

        info!(
            "Scheduler started with {} workers (max retries {}, base delay {:?})",
            max_parallel, policy.max_retries, policy.base_delay
        );

        Self {
            shared,
            workers: Mutex::new(workers),
        }
    }

    /// Append a descriptor to the queue; returns false if it was dropped
    ///
    /// A descriptor whose job is already queued or running is dropped, as is
    /// anything submitted after shutdown.
    pub fn submit(&self, job: JobDescriptor) -> bool {
        {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                warn!("Scheduler is shut down, dropping job {}", job.job_id);
                return false;
            }
            if state.active.contains(&job.job_id) || state.queue.iter().any(|q| q.job_id == job.job_id) {
                warn!("Job {} is already scheduled, ignoring duplicate", job.job_id);
                return false;
            }
            debug!("Queued job {} ({} -> {})", job.job_id, job.content_id, job.target_language);
            state.queue.push_back(job);
        }
        self.shared.work.notify_one();
        true
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.shared.state.lock();
        SchedulerStatus {
            queue_length: state.queue.len(),
            active_count: state.active.len(),
            max_parallel: self.shared.max_parallel,
            retrying_count: state.backing_off,
        }
    }

    /// Pipeline the workers run, for out-of-band operations like publishing
    pub fn pipeline(&self) -> &JobPipeline {
        &self.shared.pipeline
    }

    /// Resolve once nothing is queued, running or waiting for a retry
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.shared.state.lock().is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Stop the workers and return the descriptors that never started
    ///
    /// Running jobs finish their current attempt; jobs waiting for a retry
    /// are marked failed when their backoff ends.
    pub async fn shutdown(&self) -> Vec<JobDescriptor> {
        let dropped: Vec<JobDescriptor> = {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.queue.drain(..).collect()
        };
        self.shared.work.notify_waiters();

        if !dropped.is_empty() {
            warn!("Scheduler shutting down, {} queued jobs not started", dropped.len());
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(e) = worker.await {
                error!("Scheduler worker ended abnormally: {}", e);
            }
        }

        self.shared.notify_if_idle();
        dropped
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.work.notify_waiters();
    }
}

async fn worker_loop(shared: Arc<Shared>, worker_id: usize) {
    debug!("Scheduler worker {} started", worker_id);

    loop {
        let notified = shared.work.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let next = {
            let mut state = shared.state.lock();
            if state.shutdown {
                break;
            }
            if state.active.len() >= shared.max_parallel {
                None
            } else {
                let job = state.queue.pop_front();
                if let Some(job) = &job {
                    state.active.insert(job.job_id.clone());
                }
                job
            }
        };

        match next {
            Some(job) => {
                Arc::clone(&shared).process(job).await;
            }
            None => notified.await,
        }
    }

    debug!("Scheduler worker {} stopped", worker_id);
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Shared {
    async fn process(self: Arc<Self>, job: JobDescriptor) {
        let attempt = self.state.lock().retries.get(&job.job_id).copied().unwrap_or(0);

        let result = AssertUnwindSafe(self.pipeline.run(&job, attempt))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(JobError::Panicked(panic_message(payload))));

        match result {
            Ok(record) => {
                debug!("Job {} finished as {}", job.job_id, record.status);
                self.finish(&job);
            }
            Err(JobError::JobMissing(_)) => {
                warn!("Job {} was deleted, dropping it", job.job_id);
                self.finish(&job);
            }
            Err(error) if self.policy.should_retry(&error, attempt) => {
                let delay = self.policy.next_delay(attempt);
                {
                    let mut state = self.state.lock();
                    state.retries.insert(job.job_id.clone(), attempt + 1);
                    state.backing_off += 1;
                }

                self.pipeline
                    .log(
                        &job.job_id,
                        JobLogLevel::Warning,
                        &format!("Attempt {} failed, retrying in {:?}: {}", attempt + 1, delay, error),
                        Some(serde_json::json!({
                            "attempt": attempt + 1,
                            "delay_ms": RetryPolicy::delay_millis(delay),
                        })),
                    )
                    .await;

                let shared = Arc::clone(&self);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    shared.requeue(job).await;
                });
            }
            Err(error) => {
                let message = RetryPolicy::user_facing_message(&error);
                self.pipeline.fail(&job, &message, attempt).await;
                self.finish(&job);
            }
        }
    }

    /// Put a job back at the front of the queue after its backoff
    async fn requeue(&self, job: JobDescriptor) {
        let shutting_down = {
            let mut state = self.state.lock();
            state.backing_off -= 1;
            if state.shutdown {
                true
            } else {
                // Still holds its slot; free it and take the head of the line
                state.active.remove(&job.job_id);
                state.queue.push_front(job.clone());
                false
            }
        };

        if shutting_down {
            let retries = self.state.lock().retries.get(&job.job_id).copied().unwrap_or(0);
            self.pipeline
                .fail(&job, "scheduler shut down before the job could be retried", retries)
                .await;
            self.finish(&job);
        } else {
            self.work.notify_one();
        }
    }

    fn finish(&self, job: &JobDescriptor) {
        self.state.lock().release(&job.job_id);
        self.work.notify_one();
        self.notify_if_idle();
    }

    fn notify_if_idle(&self) {
        if self.state.lock().is_idle() {
            self.idle.notify_waiters();
        }
    }
}
