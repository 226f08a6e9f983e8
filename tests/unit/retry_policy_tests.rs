/*!
 * Tests for retry classification through the public API
 */

use std::time::Duration;

use lingopost::app_config::Config;
use lingopost::errors::{ContentSourceError, JobError, ProviderError};
use lingopost::scheduler::retry::QUOTA_MESSAGE;
use lingopost::scheduler::{ErrorClass, RetryPolicy};

#[test]
fn test_fromConfig_shouldUseTranslationRetrySettings() {
    let mut config = Config::default();
    config.translation.common.retry_count = 5;
    config.translation.common.retry_backoff_ms = 250;

    let policy = RetryPolicy::from_config(&config);
    assert_eq!(policy.max_retries, 5);
    assert_eq!(policy.base_delay, Duration::from_millis(250));
    assert_eq!(policy.next_delay(2), Duration::from_millis(1000));
}

#[test]
fn test_classify_contentSourceErrors() {
    let policy = RetryPolicy::default();
    let busy = JobError::ContentSource(ContentSourceError::Http {
        status_code: 503,
        message: "maintenance".to_string(),
    });
    let missing = JobError::ContentSource(ContentSourceError::NotFound("7".to_string()));

    assert_eq!(policy.classify(&busy), ErrorClass::Retryable);
    assert_eq!(policy.classify(&missing), ErrorClass::Fatal);
}

#[test]
fn test_shouldRetry_withZeroRetries_shouldNeverRetry() {
    let policy = RetryPolicy::new(0, Duration::from_millis(10));
    let error = JobError::Provider(ProviderError::from_status(503, "busy"));
    assert!(!policy.should_retry(&error, 0));
}

#[test]
fn test_nextDelay_withHugeAttempt_shouldSaturate() {
    let policy = RetryPolicy::new(3, Duration::from_secs(1));
    assert!(policy.next_delay(64) >= Duration::from_secs(u32::MAX as u64));
}

#[test]
fn test_delayMillis_shouldSaturateInsteadOfTruncating() {
    assert_eq!(RetryPolicy::delay_millis(Duration::from_millis(1500)), 1500);
    assert_eq!(RetryPolicy::delay_millis(Duration::MAX), u64::MAX);
}

#[test]
fn test_userFacingMessage_forQuota_shouldBeRewritten() {
    let error = JobError::Provider(ProviderError::ApiError {
        status_code: 403,
        message: "insufficient_quota".to_string(),
    });
    assert_eq!(RetryPolicy::user_facing_message(&error), QUOTA_MESSAGE);
}
