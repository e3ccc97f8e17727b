//! Bounded row buffers.
//!
//! A writer accumulates rows in a buffer until it is full or the input
//! ends, then flushes them in one write. The buffer never drops a row
//! silently: [`RowBuffer::add`] either accepts the row or reports why not.

mod keyed;

pub use keyed::KeyedRowBuffer;

use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::value::Row;

/// Outcome of offering a row to a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The row was appended.
    Added,
    /// The row's key collides with a buffered row. Whether the buffered row
    /// was kept or replaced depends on the [`MergePolicy`]; the size did not
    /// grow either way.
    Duplicate,
    /// The buffer is at capacity; the row was not taken.
    Full,
}

/// Which row survives when two rows in one batch share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// The buffered row is kept and the incoming row discarded.
    #[default]
    KeepFirst,
    /// The incoming row replaces the buffered row at the buffered row's
    /// position. If the incoming row collides with several buffered rows,
    /// all of them are replaced by it.
    KeepLast,
}

impl std::str::FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-first" => Ok(MergePolicy::KeepFirst),
            "keep-last" => Ok(MergePolicy::KeepLast),
            other => Err(format!("unknown merge policy '{other}'")),
        }
    }
}

/// An ordered, capacity-limited collection of rows awaiting flush.
///
/// Invariant: `len() <= capacity()`.
pub trait RowBuffer: Send {
    /// Offers a row.
    fn add(&mut self, row: Row) -> ClientResult<AddOutcome>;

    /// Removes and returns all rows in arrival order. The buffer keeps its
    /// allocation.
    fn drain(&mut self) -> Vec<Row>;

    /// Buffered rows in arrival order.
    fn rows(&self) -> &[Row];

    /// Maximum number of rows.
    fn capacity(&self) -> usize;

    /// Number of buffered rows.
    fn len(&self) -> usize {
        self.rows().len()
    }

    /// Returns true if nothing is buffered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the buffer is at capacity.
    fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_policy_parse() {
        assert_eq!("keep-first".parse::<MergePolicy>(), Ok(MergePolicy::KeepFirst));
        assert_eq!("KEEP-LAST".parse::<MergePolicy>(), Ok(MergePolicy::KeepLast));
        assert!("newest".parse::<MergePolicy>().is_err());
        assert_eq!(MergePolicy::default(), MergePolicy::KeepFirst);
    }
}
