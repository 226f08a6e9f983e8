/*!
 * Mock provider for tests and dry runs.
 *
 * Behaviours:
 * - `MockProvider::working()` - echoes the text tagged with the target language
 * - `MockProvider::failing(status)` - always answers with the given HTTP status
 * - `MockProvider::intermittent(n)` - every n-th request answers 503
 * - `MockProvider::slow(ms)` - succeeds after a delay
 * - `MockProvider::empty()` - succeeds with an empty text
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::Provider;

/// Mock request
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Prompt sent to the model
    pub text: String,
    /// Target language code
    pub target_language: String,
}

/// Mock response
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Model output
    pub text: String,
    /// Simulated prompt tokens
    pub prompt_tokens: u64,
    /// Simulated completion tokens
    pub completion_tokens: u64,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails every Nth request with a 503
    Intermittent { fail_every: usize },
    /// Always fails with the given HTTP status
    Failing { status: u16 },
    /// Returns an empty text
    Empty,
    /// Succeeds after sleeping
    Slow { delay_ms: u64 },
}

/// Scriptable provider
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    /// Shared across clones
    request_count: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    pub fn failing(status: u16) -> Self {
        Self::new(MockBehavior::Failing { status })
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn echo(request: &MockRequest) -> MockResponse {
        let prompt_tokens = request.text.split_whitespace().count() as u64;
        MockResponse {
            text: format!("[{}] {}", request.target_language, request.text),
            prompt_tokens,
            completion_tokens: prompt_tokens + 1,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: MockRequest) -> Result<MockResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(Self::echo(&request)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::from_status(
                        503,
                        format!("Simulated intermittent failure (request #{})", count + 1),
                    ))
                } else {
                    Ok(Self::echo(&request))
                }
            }

            MockBehavior::Failing { status } => Err(ProviderError::from_status(
                status,
                format!("Simulated provider failure ({})", status),
            )),

            MockBehavior::Empty => Ok(MockResponse {
                text: String::new(),
                prompt_tokens: 0,
                completion_tokens: 0,
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(Self::echo(&request))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing { status } => Err(ProviderError::from_status(status, "unreachable")),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &MockResponse) -> String {
        response.text.clone()
    }

    fn token_usage(response: &MockResponse) -> u64 {
        response.prompt_tokens + response.completion_tokens
    }
}
