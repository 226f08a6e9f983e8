/*!
 * Sliding-window limiter for outbound provider calls.
 *
 * One instance is shared by every job: the quota belongs to the upstream
 * account, not to a job.
 */

use log::debug;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Allows at most `max_requests` calls in any trailing `window`
#[derive(Debug)]
pub struct RateLimiter {
    /// `None` disables limiting
    max_requests: Option<usize>,
    window: Duration,
    /// Added to computed waits to absorb scheduling jitter
    buffer: Duration,
    /// Timestamps of permitted calls, oldest first
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Rolling window used for requests-per-minute quotas
    pub const MINUTE: Duration = Duration::from_secs(60);

    /// `max_requests` of `None` or `0` means unlimited.
    pub fn new(max_requests: Option<u32>, window: Duration, buffer: Duration) -> Self {
        Self {
            max_requests: max_requests.filter(|&n| n > 0).map(|n| n as usize),
            window,
            buffer,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    pub fn per_minute(max_requests: Option<u32>, buffer: Duration) -> Self {
        Self::new(max_requests, Self::MINUTE, buffer)
    }

    pub fn unlimited() -> Self {
        Self::new(None, Self::MINUTE, Duration::ZERO)
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_requests.is_none()
    }

    /// Wait until a call is permitted, then record it.
    pub async fn await_slot(&self) {
        let Some(max_requests) = self.max_requests else {
            return;
        };

        loop {
            let wait = {
                let mut calls = self.calls.lock();
                let now = Instant::now();

                while let Some(&oldest) = calls.front() {
                    if now.duration_since(oldest) >= self.window {
                        calls.pop_front();
                    } else {
                        break;
                    }
                }

                match calls.front() {
                    Some(&oldest) if calls.len() >= max_requests => {
                        self.window.saturating_sub(now.duration_since(oldest)) + self.buffer
                    }
                    _ => {
                        calls.push_back(now);
                        return;
                    }
                }
            };

            debug!(
                "Rate limit of {} calls per {:?} reached, waiting {:?}",
                max_requests, self.window, wait
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Calls recorded inside the current window
    pub fn recent_calls(&self) -> usize {
        let now = Instant::now();
        self.calls
            .lock()
            .iter()
            .filter(|&&t| now.duration_since(t) < self.window)
            .count()
    }
}
