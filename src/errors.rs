/*!
 * Error types for the lingopost application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider is missing required settings (API key, endpoint)
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Build an error from a non-success HTTP response
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            429 => Self::RateLimitExceeded(message),
            401 | 403 => Self::AuthenticationError(message),
            _ => Self::ApiError { status_code, message },
        }
    }

    /// HTTP status code carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            Self::RateLimitExceeded(_) => Some(429),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else if let Some(status) = error.status() {
            Self::from_status(status.as_u16(), error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur when talking to the content source
#[derive(Error, Debug, Clone)]
pub enum ContentSourceError {
    /// Base URL or credentials are missing
    #[error("Content source not configured: {0}")]
    NotConfigured(String),

    /// The requested item does not exist
    #[error("Content item {0} not found")]
    NotFound(String),

    /// The content source answered with a non-success status
    #[error("Content source responded with error: {status_code} - {message}")]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Response body or reason
        message: String,
    },

    /// The request could not be delivered
    #[error("Content source request failed: {0}")]
    RequestFailed(String),

    /// The response body was not what we expected
    #[error("Failed to parse content source response: {0}")]
    ParseError(String),
}

impl From<reqwest::Error> for ContentSourceError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::ParseError(error.to_string())
        } else if let Some(status) = error.status() {
            Self::Http {
                status_code: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised by the job record store
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// No job with the given id
    #[error("Job {0} not found")]
    NotFound(String),

    /// The requested status change is not part of the job state machine
    #[error("Illegal job transition for {job_id}: {from} -> {to}")]
    IllegalTransition {
        /// Job identifier
        job_id: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Progress outside 0..=100
    #[error("Invalid progress value {0}")]
    InvalidProgress(u8),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(error: anyhow::Error) -> Self {
        Self::Database(format!("{:#}", error))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.to_string())
    }
}

/// Errors surfaced by a job pipeline run
#[derive(Error, Debug, Clone)]
pub enum JobError {
    /// Missing credentials, base URL or similar
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from the translation provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the content source
    #[error("Content source error: {0}")]
    ContentSource(#[from] ContentSourceError),

    /// Error persisting job state
    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    /// The job record was deleted while the job was queued or running
    #[error("Job {0} no longer exists")]
    JobMissing(String),

    /// The pipeline panicked
    #[error("Job pipeline panicked: {0}")]
    Panicked(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the content source
    #[error("Content source error: {0}")]
    ContentSource(#[from] ContentSourceError),

    /// Error from the job store
    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    /// Error from a job run
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
