//! Signed durations and their human-readable rendering.
//!
//! Expiry and renewal offsets are signed: a certificate that expired
//! yesterday has a negative time-to-expiry, and a renewal that is overdue
//! has a negative time-to-renewal. [`SignedDuration`] keeps the sign logic
//! in one place instead of every caller comparing raw integers against zero.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Marker appended to durations that lie in the past
const PAST_MARKER: &str = " ago";

/// A signed number of whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedDuration(i64);

impl SignedDuration {
    pub const ZERO: Self = Self(0);

    pub const fn from_secs(seconds: i64) -> Self {
        Self(seconds)
    }

    pub const fn from_days(days: i64) -> Self {
        Self(days.saturating_mul(SECS_PER_DAY as i64))
    }

    /// Number of seconds, negative for past offsets
    pub const fn seconds(self) -> i64 {
        self.0
    }

    /// Magnitude without the sign
    pub const fn abs_seconds(self) -> u64 {
        self.0.unsigned_abs()
    }

    /// True when the offset lies in the past.
    ///
    /// A zero offset is "now" and is not overdue.
    pub const fn is_overdue(self) -> bool {
        self.0 < 0
    }
}

impl Add for SignedDuration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for SignedDuration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for SignedDuration {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl From<i64> for SignedDuration {
    fn from(seconds: i64) -> Self {
        Self(seconds)
    }
}

impl fmt::Display for SignedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(self.0))
    }
}

/// Render a signed second count as `"Xd, Xh, Xm, Xs"`.
///
/// Only nonzero components are printed, largest unit first. Negative
/// inputs are rendered from their magnitude with `" ago"` appended.
/// Zero renders as the empty string since it has no nonzero component.
///
/// ```
/// use tlskeeper_common::format_duration;
///
/// assert_eq!(format_duration(90_061), "1d, 1h, 1m, 1s");
/// assert_eq!(format_duration(-3_600), "1h ago");
/// assert_eq!(format_duration(0), "");
/// ```
pub fn format_duration(seconds: i64) -> String {
    let mut remaining = seconds.unsigned_abs();

    let days = remaining / SECS_PER_DAY;
    remaining %= SECS_PER_DAY;
    let hours = remaining / SECS_PER_HOUR;
    remaining %= SECS_PER_HOUR;
    let minutes = remaining / SECS_PER_MINUTE;
    let secs = remaining % SECS_PER_MINUTE;

    let mut rendered = [(days, 'd'), (hours, 'h'), (minutes, 'm'), (secs, 's')]
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect::<Vec<_>>()
        .join(", ");

    if seconds < 0 {
        rendered.push_str(PAST_MARKER);
    }

    rendered
}
