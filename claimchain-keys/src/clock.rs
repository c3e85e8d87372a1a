//! Epoch labeling policy.
//!
//! Which epoch "now" belongs to is an external policy input; the core only
//! assumes the function is monotone across time. Labels are opaque strings
//! everywhere else, so rotation can later become finer-grained without wire
//! changes.

use chrono::Utc;

/// Maps wall time to the current epoch label.
pub trait EpochClock: Send + Sync {
    /// Label of the epoch the current instant belongs to.
    fn current_epoch_id(&self) -> String;
}

/// Default policy: one epoch per UTC calendar day, labeled `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcDateClock;

impl EpochClock for UtcDateClock {
    fn current_epoch_id(&self) -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }
}

/// A clock pinned to one label. For tests and replay tooling.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl FixedClock {
    pub fn new(epoch_id: impl Into<String>) -> Self {
        Self(epoch_id.into())
    }
}

impl EpochClock for FixedClock {
    fn current_epoch_id(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_date_clock_format() {
        let label = UtcDateClock.current_epoch_id();
        assert_eq!(label.len(), 10);
        assert_eq!(label.as_bytes()[4], b'-');
        assert_eq!(label.as_bytes()[7], b'-');
    }

    #[test]
    fn test_fixed_clock() {
        assert_eq!(FixedClock::new("E1").current_epoch_id(), "E1");
    }
}
