//! Cooperative wall-clock limit.
//!
//! Long loops (diagram construction, ordering search, multigraph layers)
//! call [`Deadline::check`] periodically and unwind with
//! [`Error::Timeout`] once the limit has passed.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    end: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self { end: None }
    }

    pub fn after(limit: Duration) -> Self {
        Self {
            end: Some(Instant::now() + limit),
        }
    }

    /// `None` means unlimited.
    pub fn from_limit(limit: Option<Duration>) -> Self {
        limit.map_or_else(Self::none, Self::after)
    }

    pub fn expired(&self) -> bool {
        self.end.is_some_and(|end| Instant::now() >= end)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.end.map(|end| end.saturating_duration_since(Instant::now()))
    }

    pub fn check(&self) -> Result<()> {
        if self.expired() {
            Err(Error::Timeout)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_unlimited_never_expires() {
        let d = Deadline::none();
        assert!(!d.expired());
        assert!(d.check().is_ok());
        assert_eq!(d.remaining(), None);
    }

    #[test]
    fn test_zero_limit_expires() {
        let d = Deadline::after(Duration::ZERO);
        assert!(d.expired());
        assert!(matches!(d.check(), Err(Error::Timeout)));
    }
}
