//! Retry timeout policy for failed posts.
//!
//! Each classified failure maps to a wait before the next attempt. Events
//! that point at an unhealthy or overloaded control plane wait longest;
//! validation-class errors retry quickly because a corrected declaration may
//! already be queued.

use std::time::Duration;

use as3_common::EventCode;

/// Default short wait.
pub const DEFAULT_SMALL_TIMEOUT: Duration = Duration::from_secs(3);

/// Default medium wait.
pub const DEFAULT_MEDIUM_TIMEOUT: Duration = Duration::from_secs(30);

/// Default long wait.
pub const DEFAULT_LARGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Maps event codes to retry timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after validation-class failures.
    pub small: Duration,
    /// Wait after transient failures and unknown events.
    pub medium: Duration,
    /// Wait after the control plane rejected the content or lacks AS3.
    pub large: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            small: DEFAULT_SMALL_TIMEOUT,
            medium: DEFAULT_MEDIUM_TIMEOUT,
            large: DEFAULT_LARGE_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit tiers.
    pub fn new(small: Duration, medium: Duration, large: Duration) -> Self {
        Self {
            small,
            medium,
            large,
        }
    }

    /// Returns the wait before retrying after `event`.
    ///
    /// Total over every event code; unknown events get the medium tier.
    pub fn timeout_for(&self, event: &EventCode) -> Duration {
        match event {
            EventCode::Ok => Duration::ZERO,
            EventCode::ValidationFailed => self.small,
            EventCode::ServiceUnavailable | EventCode::TransientError => self.medium,
            EventCode::UnprocessableEntity | EventCode::NotFound => self.large,
            EventCode::Unknown(_) => self.medium,
        }
    }
}
