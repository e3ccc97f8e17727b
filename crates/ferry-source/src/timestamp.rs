//! Snapshot timestamp resolution.

use std::fmt;

use ferry_client::{ClientConfig, Split};
use ferry_common::SnapshotTimestamp;
use serde::{Deserialize, Serialize};

use crate::error::SourceResult;

/// Where a resolved snapshot timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    /// The configured version token.
    Version,
    /// The configured wall-clock timestamp.
    Timestamp,
    /// The split's planning-time default.
    Split,
}

impl fmt::Display for TimestampSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampSource::Version => write!(f, "version"),
            TimestampSource::Timestamp => write!(f, "timestamp"),
            TimestampSource::Split => write!(f, "split"),
        }
    }
}

/// A snapshot timestamp with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTimestamp {
    /// The timestamp reads observe.
    pub timestamp: SnapshotTimestamp,
    /// Where it came from.
    pub source: TimestampSource,
}

/// Picks the snapshot a reader of `split` observes.
///
/// A configured version token wins, even when a wall-clock timestamp is
/// configured too; the timestamp is then not parsed at all. A wall-clock
/// timestamp is converted with a zero logical counter. Without either the
/// split's default applies.
///
/// # Example
///
/// ```rust
/// use ferry_client::{ClientConfig, KeyRange, Split};
/// use ferry_common::{SnapshotTimestamp, TableRef};
/// use ferry_source::{resolve_timestamp, TimestampSource};
///
/// let split = Split::new(TableRef::new("db", "t"), KeyRange::full(), SnapshotTimestamp::new(5, 0));
/// let config = ClientConfig::new().snapshot_timestamp("2024-01-01T00:00:00Z");
///
/// let resolved = resolve_timestamp(&config, &split).unwrap();
/// assert_eq!(resolved.source, TimestampSource::Timestamp);
/// assert_eq!(resolved.timestamp, SnapshotTimestamp::new(1_704_067_200_000, 0));
/// ```
pub fn resolve_timestamp(config: &ClientConfig, split: &Split) -> SourceResult<ResolvedTimestamp> {
    if let Some(timestamp) = config.parsed_snapshot_version()? {
        return Ok(ResolvedTimestamp {
            timestamp,
            source: TimestampSource::Version,
        });
    }
    if let Some(timestamp) = config.parsed_snapshot_timestamp()? {
        return Ok(ResolvedTimestamp {
            timestamp,
            source: TimestampSource::Timestamp,
        });
    }
    Ok(ResolvedTimestamp {
        timestamp: split.timestamp,
        source: TimestampSource::Split,
    })
}
