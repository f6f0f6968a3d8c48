//! Timestamp providers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of transaction timestamps.
///
/// The provider fixes the resolution of every timestamp the graph hands to
/// its backend, so all instances sharing a backend must agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampProvider {
    /// Nanoseconds since the Unix epoch.
    Nano,
    /// Microseconds since the Unix epoch.
    #[default]
    Micro,
    /// Milliseconds since the Unix epoch.
    Milli,
}

impl TimestampProvider {
    /// Returns the current time in this provider's unit.
    #[must_use]
    pub fn now(self) -> u64 {
        // A clock before 1970 reads as zero
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let value = match self {
            Self::Nano => elapsed.as_nanos(),
            Self::Micro => elapsed.as_micros(),
            Self::Milli => elapsed.as_millis(),
        };
        u64::try_from(value).unwrap_or(u64::MAX)
    }

    /// Converts a timestamp of this provider to microseconds.
    #[must_use]
    pub const fn to_micros(self, time: u64) -> u64 {
        match self {
            Self::Nano => time / 1_000,
            Self::Micro => time,
            Self::Milli => time.saturating_mul(1_000),
        }
    }

    /// Returns the unit name.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Nano => "ns",
            Self::Micro => "us",
            Self::Milli => "ms",
        }
    }
}
