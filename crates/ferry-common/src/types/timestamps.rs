//! Snapshot timestamps.
//!
//! The storage engine orders every committed write by a packed 64-bit
//! version token: the high bits carry physical time in milliseconds since
//! the Unix epoch and the low [`LOGICAL_BITS`] bits carry a logical counter
//! that breaks ties within one millisecond.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{LOGICAL_BITS, LOGICAL_MASK};
use crate::error::{FerryError, FerryResult};

/// A logical point in time fixing the snapshot a read observes.
///
/// # Example
///
/// ```rust
/// use ferry_common::types::SnapshotTimestamp;
///
/// let ts = SnapshotTimestamp::new(1000, 3);
/// assert_eq!(SnapshotTimestamp::from_version(ts.version()), ts);
/// assert!(ts < ts.next());
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotTimestamp {
    /// Physical time in milliseconds since Unix epoch.
    physical: u64,
    /// Logical counter within the millisecond.
    logical: u64,
}

impl SnapshotTimestamp {
    /// Zero timestamp. Nothing is visible at zero.
    pub const ZERO: Self = Self {
        physical: 0,
        logical: 0,
    };

    /// Creates a timestamp from components.
    ///
    /// The logical counter is truncated to [`LOGICAL_BITS`] bits.
    #[inline]
    #[must_use]
    pub const fn new(physical: u64, logical: u64) -> Self {
        Self {
            physical,
            logical: logical & LOGICAL_MASK,
        }
    }

    /// Largest physical component a version token can carry.
    pub const MAX_PHYSICAL: u64 = u64::MAX >> LOGICAL_BITS;

    /// Decodes a packed version token.
    #[inline]
    #[must_use]
    pub const fn from_version(version: u64) -> Self {
        Self {
            physical: version >> LOGICAL_BITS,
            logical: version & LOGICAL_MASK,
        }
    }

    /// Parses a version token given as an unsigned decimal string.
    pub fn parse_version(value: &str) -> FerryResult<Self> {
        value
            .trim()
            .parse::<u64>()
            .map(Self::from_version)
            .map_err(|e| FerryError::InvalidVersion {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    /// Parses an ISO-8601 instant with offset, e.g. `2024-01-01T00:00:00Z`.
    ///
    /// A trailing zone id in brackets (`2024-01-01T00:00:00+01:00[Europe/Paris]`)
    /// is accepted and ignored, since the offset already fixes the instant.
    /// The logical counter of the result is zero.
    pub fn parse_iso8601(value: &str) -> FerryResult<Self> {
        let trimmed = value.trim();
        let instant = match trimmed.find('[') {
            Some(idx) if trimmed.ends_with(']') => &trimmed[..idx],
            _ => trimmed,
        };

        let parsed = chrono::DateTime::parse_from_rfc3339(instant).map_err(|e| {
            FerryError::InvalidTimestamp {
                value: value.to_string(),
                reason: e.to_string(),
            }
        })?;

        let millis = u64::try_from(parsed.timestamp_millis()).map_err(|_| {
            FerryError::InvalidTimestamp {
                value: value.to_string(),
                reason: "instant precedes the Unix epoch".to_string(),
            }
        })?;
        if millis > Self::MAX_PHYSICAL {
            return Err(FerryError::InvalidTimestamp {
                value: value.to_string(),
                reason: "instant is too late for a version token".to_string(),
            });
        }

        Ok(Self::new(millis, 0))
    }

    /// Returns the physical component (milliseconds since epoch).
    #[inline]
    #[must_use]
    pub const fn physical(self) -> u64 {
        self.physical
    }

    /// Returns the logical component.
    #[inline]
    #[must_use]
    pub const fn logical(self) -> u64 {
        self.logical
    }

    /// Packs this timestamp into a version token.
    #[inline]
    #[must_use]
    pub const fn version(self) -> u64 {
        (self.physical << LOGICAL_BITS) | self.logical
    }

    /// Returns the smallest timestamp strictly greater than this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self::from_version(self.version().saturating_add(1))
    }

    /// Returns true if this is the zero timestamp.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.physical == 0 && self.logical == 0
    }
}

impl fmt::Debug for SnapshotTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotTimestamp({}ms.{})", self.physical, self.logical)
    }
}

impl fmt::Display for SnapshotTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.physical, self.logical)
    }
}

impl From<u64> for SnapshotTimestamp {
    #[inline]
    fn from(version: u64) -> Self {
        Self::from_version(version)
    }
}

impl From<SnapshotTimestamp> for u64 {
    #[inline]
    fn from(ts: SnapshotTimestamp) -> Self {
        ts.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_decode() {
        let version = (42u64 << 18) | 7;
        let ts = SnapshotTimestamp::from_version(version);
        assert_eq!(ts.physical(), 42);
        assert_eq!(ts.logical(), 7);
        assert_eq!(ts.version(), version);
    }

    #[test]
    fn test_parse_version() {
        let ts = SnapshotTimestamp::parse_version("449876543210987520").unwrap();
        assert_eq!(ts.version(), 449_876_543_210_987_520);

        assert!(matches!(
            SnapshotTimestamp::parse_version("-1"),
            Err(FerryError::InvalidVersion { .. })
        ));
        assert!(SnapshotTimestamp::parse_version("abc").is_err());
    }

    #[test]
    fn test_parse_iso8601() {
        let ts = SnapshotTimestamp::parse_iso8601("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(ts.physical(), 1_704_067_200_000);
        assert_eq!(ts.logical(), 0);

        let offset = SnapshotTimestamp::parse_iso8601("2024-01-01T01:00:00+01:00").unwrap();
        assert_eq!(offset, ts);

        let zoned =
            SnapshotTimestamp::parse_iso8601("2024-01-01T01:00:00+01:00[Europe/Paris]").unwrap();
        assert_eq!(zoned, ts);
    }

    #[test]
    fn test_parse_iso8601_rejects() {
        assert!(matches!(
            SnapshotTimestamp::parse_iso8601("yesterday"),
            Err(FerryError::InvalidTimestamp { .. })
        ));
        assert!(SnapshotTimestamp::parse_iso8601("1960-01-01T00:00:00Z").is_err());
        assert!(matches!(
            SnapshotTimestamp::parse_iso8601("5000-01-01T00:00:00Z"),
            Err(FerryError::InvalidTimestamp { .. })
        ));
        let latest = SnapshotTimestamp::parse_iso8601("4000-01-01T00:00:00Z").unwrap();
        assert_eq!(SnapshotTimestamp::from_version(latest.version()), latest);
    }

    #[test]
    fn test_ordering() {
        let ts1 = SnapshotTimestamp::new(1000, 0);
        let ts2 = SnapshotTimestamp::new(1000, 1);
        let ts3 = SnapshotTimestamp::new(1001, 0);

        assert!(ts1 < ts2);
        assert!(ts2 < ts3);
        assert_eq!(ts1.next(), ts2);
    }

    #[test]
    fn test_logical_overflow_carries() {
        let ts = SnapshotTimestamp::new(5, LOGICAL_MASK);
        assert_eq!(ts.next(), SnapshotTimestamp::new(6, 0));
    }
}
