//! Row-id allocation.
//!
//! Tables without an integer primary key store every row under an implicit
//! row id. Parallel writers must never hand out the same id, and asking the
//! engine for every single id would cost a round trip per row, so ids are
//! reserved in contiguous blocks of `step` ids:
//!
//! ```text
//! writer 0: [start0, start0 + step) ─▶ [b2, b2 + step) ─▶ ...
//! writer 1: [start1, start1 + step) ─▶ [b3, b3 + step) ─▶ ...
//! ```
//!
//! Each writer is seeded with its own first block; later blocks come from
//! the engine's shared id counter, which only ever moves forward.

mod dynamic;

pub use dynamic::DynamicRowIdAllocator;

use ferry_common::RowId;

use crate::error::ClientResult;

/// A per-writer source of strictly increasing row ids.
///
/// Not safe for concurrent use; a writer owns exactly one allocator.
pub trait RowIdAllocator: Send {
    /// Returns the next row id.
    fn next(&mut self) -> ClientResult<RowId>;

    /// Number of ids served by one block.
    fn step(&self) -> u64;
}

/// Reserves fresh row-id blocks from the engine.
pub trait RowIdBlockSource: Send {
    /// Reserves `step` ids and returns the first one.
    fn allocate_block(&mut self, step: u64) -> ClientResult<RowId>;
}
