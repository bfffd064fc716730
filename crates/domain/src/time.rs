//! Clock and duration helpers.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC instant stamped on readings and responses.
pub type Timestamp = DateTime<Utc>;

/// Current UTC instant.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Whole milliseconds of `duration`, saturating at `u64::MAX`.
#[must_use]
pub fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
