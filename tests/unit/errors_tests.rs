/*!
 * Tests for error types and conversions
 */

use lingopost::errors::{AppError, ContentSourceError, JobError, ProviderError, StoreError};

#[test]
fn test_providerError_fromStatus_shouldPickVariant() {
    assert!(matches!(
        ProviderError::from_status(429, "slow down"),
        ProviderError::RateLimitExceeded(_)
    ));
    assert!(matches!(
        ProviderError::from_status(401, "bad key"),
        ProviderError::AuthenticationError(_)
    ));
    assert!(matches!(
        ProviderError::from_status(403, "forbidden"),
        ProviderError::AuthenticationError(_)
    ));
    assert!(matches!(
        ProviderError::from_status(503, "unavailable"),
        ProviderError::ApiError { status_code: 503, .. }
    ));
}

#[test]
fn test_providerError_statusCode_shouldExposeHttpStatus() {
    assert_eq!(ProviderError::from_status(500, "boom").status_code(), Some(500));
    assert_eq!(ProviderError::RateLimitExceeded("x".to_string()).status_code(), Some(429));
    assert_eq!(ProviderError::ConnectionError("x".to_string()).status_code(), None);
}

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 429,
        message: "Too many requests".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("429"));
    assert!(display.contains("Too many requests"));
}

#[test]
fn test_contentSourceError_notFound_shouldNameItem() {
    let error = ContentSourceError::NotFound("42".to_string());
    assert_eq!(error.to_string(), "Content item 42 not found");
}

#[test]
fn test_jobError_fromLayerErrors_shouldWrapThem() {
    let provider: JobError = ProviderError::ConnectionError("reset".to_string()).into();
    assert!(matches!(provider, JobError::Provider(_)));
    assert!(provider.to_string().contains("reset"));

    let store: JobError = StoreError::NotFound("job-1".to_string()).into();
    assert!(matches!(store, JobError::Store(StoreError::NotFound(_))));

    let source: JobError = ContentSourceError::RequestFailed("dns".to_string()).into();
    assert!(matches!(source, JobError::ContentSource(_)));
}

#[test]
fn test_storeError_fromAnyhow_shouldKeepContext() {
    let error: StoreError = anyhow::anyhow!("disk full").context("writing job").into();
    let display = error.to_string();
    assert!(display.contains("writing job"));
    assert!(display.contains("disk full"));
}

#[test]
fn test_appError_fromJobError_shouldWrap() {
    let error: AppError = JobError::JobMissing("job-1".to_string()).into();
    assert!(matches!(error, AppError::Job(JobError::JobMissing(_))));
    assert!(error.to_string().contains("job-1"));
}
