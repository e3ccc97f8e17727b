//! Key ranges and splits.

use std::fmt;

use bytes::Bytes;
use ferry_common::{SnapshotTimestamp, TableRef};
use serde::{Deserialize, Serialize};

/// A half-open range of encoded row keys, `[start, end)`.
///
/// An empty `end` means the range is unbounded above.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    /// Inclusive lower bound.
    pub start: Bytes,
    /// Exclusive upper bound, empty for unbounded.
    pub end: Bytes,
}

impl KeyRange {
    /// Creates a range.
    pub fn new(start: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// The range covering every key.
    pub fn full() -> Self {
        Self::new(Bytes::new(), Bytes::new())
    }

    /// Returns true if the range has no upper bound.
    pub fn is_unbounded(&self) -> bool {
        self.end.is_empty()
    }

    /// Returns true if `key` lies within the range.
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_ref() && (self.is_unbounded() || key < self.end.as_ref())
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:02x?}, ", self.start.as_ref())?;
        if self.is_unbounded() {
            write!(f, "+inf)")
        } else {
            write!(f, "{:02x?})", self.end.as_ref())
        }
    }
}

/// A unit of read work assigned to one reader instance.
///
/// Carries the table and key range to scan and the snapshot timestamp
/// chosen at planning time, used when no override is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Table to scan.
    pub table_ref: TableRef,
    /// Key range to scan.
    pub range: KeyRange,
    /// Default snapshot timestamp.
    pub timestamp: SnapshotTimestamp,
}

impl Split {
    /// Creates a split.
    pub fn new(table_ref: TableRef, range: KeyRange, timestamp: SnapshotTimestamp) -> Self {
        Self {
            table_ref,
            range,
            timestamp,
        }
    }

    /// Returns the database name.
    pub fn database(&self) -> &str {
        &self.table_ref.database
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table_ref.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_range_contains() {
        let range = KeyRange::new(vec![0x10], vec![0x20]);
        assert!(range.contains(&[0x10]));
        assert!(range.contains(&[0x1f, 0xff]));
        assert!(!range.contains(&[0x20]));
        assert!(!range.contains(&[0x0f]));

        let full = KeyRange::full();
        assert!(full.is_unbounded());
        assert!(full.contains(&[]));
        assert!(full.contains(&[0xff; 16]));
    }

    #[test]
    fn test_split_accessors() {
        let split = Split::new(
            TableRef::new("db", "t"),
            KeyRange::full(),
            SnapshotTimestamp::new(10, 0),
        );
        assert_eq!(split.database(), "db");
        assert_eq!(split.table(), "t");
    }
}
