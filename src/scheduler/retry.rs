/*!
 * Failure classification and backoff.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

use crate::app_config::Config;
use crate::errors::{ContentSourceError, JobError, ProviderError};

/// Message shown instead of raw quota errors
pub const QUOTA_MESSAGE: &str = "upstream quota exceeded, check provider dashboard";

/// Throttling or transient upstream failure
static TRANSIENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(internal|rate[ _-]?limit(ed)?|too many requests|overloaded|temporarily unavailable)\b")
        .expect("valid regex")
});

/// Exhausted account quota or billing problem
static QUOTA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(insufficient_quota|exceeded your current quota|quota exceeded|credit balance is too low)")
        .expect("valid regex")
});

/// Outcome of classifying a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth another attempt after a backoff
    Retryable,
    /// Terminates the job
    Fatal,
}

/// Retry budget and exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each following one
    pub base_delay: Duration,
}

fn is_transient_status(status_code: u16) -> bool {
    matches!(status_code, 429 | 500 | 503)
}

fn is_quota_error(error: &JobError) -> bool {
    QUOTA_PATTERN.is_match(&error.to_string())
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_retries(), config.base_retry_delay())
    }

    /// Decide whether an error is transient
    ///
    /// Status codes decide first; the message is only inspected for errors
    /// that carry no decisive code. Exhausted quotas never recover by waiting
    /// and are fatal even when reported as 429.
    pub fn classify(&self, error: &JobError) -> ErrorClass {
        if is_quota_error(error) {
            return ErrorClass::Fatal;
        }

        let retryable = match error {
            JobError::Provider(provider_error) => match provider_error {
                ProviderError::NotConfigured(_) | ProviderError::AuthenticationError(_) => false,
                ProviderError::RateLimitExceeded(_) | ProviderError::ConnectionError(_) => true,
                ProviderError::ApiError { status_code, message } => {
                    is_transient_status(*status_code) || TRANSIENT_PATTERN.is_match(message)
                }
                ProviderError::RequestFailed(message) | ProviderError::ParseError(message) => {
                    TRANSIENT_PATTERN.is_match(message)
                }
            },
            JobError::ContentSource(source_error) => match source_error {
                ContentSourceError::Http { status_code, .. } => is_transient_status(*status_code),
                ContentSourceError::RequestFailed(_) => true,
                ContentSourceError::NotConfigured(_)
                | ContentSourceError::NotFound(_)
                | ContentSourceError::ParseError(_) => false,
            },
            JobError::Configuration(_)
            | JobError::Store(_)
            | JobError::JobMissing(_)
            | JobError::Panicked(_) => false,
        };

        if retryable {
            ErrorClass::Retryable
        } else {
            ErrorClass::Fatal
        }
    }

    /// `base_delay * 2^attempt`, attempt 0 being the first retry
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Delay as whole milliseconds for log metadata, saturating at `u64::MAX`
    pub fn delay_millis(delay: Duration) -> u64 {
        u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether a job that already used `retries_so_far` retries gets another one
    pub fn should_retry(&self, error: &JobError, retries_so_far: u32) -> bool {
        retries_so_far < self.max_retries && self.classify(error) == ErrorClass::Retryable
    }

    /// Message persisted on the failed job
    pub fn user_facing_message(error: &JobError) -> String {
        if is_quota_error(error) {
            return QUOTA_MESSAGE.to_string();
        }
        match error {
            JobError::Provider(e) => e.to_string(),
            JobError::ContentSource(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(2000))
    }
}
