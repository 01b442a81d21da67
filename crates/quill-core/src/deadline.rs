//! Session deadline threaded from session accept down to storage calls.

use std::time::{Duration, Instant};

use thiserror::Error;

/// The session ran past its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session deadline exceeded")]
pub struct DeadlineExceeded;

/// A point in time after which a session must stop doing work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            at: now.checked_add(timeout).unwrap_or(now),
        }
    }

    /// Deadline at a fixed instant.
    pub const fn at(at: Instant) -> Self {
        Self { at }
    }

    /// Time left before expiry, zero once expired.
    ///
    /// Async I/O is bounded with this via `tokio::time::timeout`.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Fail with [`DeadlineExceeded`] once the deadline has passed.
    pub fn check(&self) -> Result<(), DeadlineExceeded> {
        if Instant::now() >= self.at {
            Err(DeadlineExceeded)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_deadline_passes_check() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(deadline.check().is_ok());
        assert!(deadline.remaining() > Duration::from_secs(30));
    }

    #[test]
    fn past_deadline_fails_check() {
        let deadline = Deadline::at(Instant::now());
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(deadline.check(), Err(DeadlineExceeded));
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }
}
