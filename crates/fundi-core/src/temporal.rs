//! # Temporal Types — UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds
//! precision. Provider webhooks arrive with assorted offsets; everything
//! the engine stores or compares is normalized to UTC at the boundary so
//! deadline arithmetic (auto-validation, voucher expiry, reconciliation
//! grace) is unambiguous.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing a timestamp.
#[derive(Error, Debug)]
pub enum TimestampError {
    /// The input was not valid RFC 3339.
    #[error("invalid RFC 3339 timestamp {input:?}: {source}")]
    Invalid {
        /// The rejected input.
        input: String,
        /// The underlying chrono parse error.
        source: chrono::ParseError,
    },

    /// The epoch value was out of range.
    #[error("invalid Unix timestamp: {0}")]
    OutOfRange(i64),
}

/// A UTC timestamp with seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`] — current UTC time, truncated.
/// - [`Timestamp::from_utc()`] — from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`] — from an RFC 3339 string in any offset,
///   converted to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string, converting any offset to UTC.
    pub fn parse(s: &str) -> Result<Self, TimestampError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| TimestampError::Invalid {
            input: s.to_string(),
            source: e,
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// From a Unix epoch timestamp in seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, TimestampError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or(TimestampError::OutOfRange(secs))
    }

    /// The Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// This timestamp shifted by a signed duration.
    ///
    /// Saturates at the chrono range limits rather than panicking; a
    /// deadline beyond the representable range behaves as "never".
    pub fn offset(&self, delta: Duration) -> Self {
        Self(self.0.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Seconds elapsed from `earlier` to `self` (negative if `self` precedes it).
    pub fn seconds_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).num_seconds()
    }

    /// Render as ISO 8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision.
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
