//! Expiry arithmetic.
//!
//! All instants are UTC, so calendar-day addition and fixed 24h addition
//! agree. Calendar days are used anyway so the rule reads the way it is stated.

use chrono::{DateTime, Days, Utc};

/// Canonical license lifetime when the caller does not choose one.
pub const DEFAULT_DURATION_DAYS: u32 = 365;

/// `now + duration_days` calendar days.
///
/// Saturates at the largest representable instant instead of failing.
pub fn compute_expiry(now: DateTime<Utc>, duration_days: u32) -> DateTime<Utc> {
    now.checked_add_days(Days::new(u64::from(duration_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A license is expired from the exact instant it expires onwards.
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= expires_at
}
