//! Block-refilling row-id allocator.

use ferry_common::{FerryError, RowId, OPT_SINK_ROW_ID_STEP};
use tracing::debug;

use super::{RowIdAllocator, RowIdBlockSource};
use crate::error::{ClientError, ClientResult};

/// Serves ids from a seeded first block, then from engine-issued blocks.
pub struct DynamicRowIdAllocator<S> {
    source: S,
    table: String,
    step: u64,
    /// Next id to hand out.
    next: RowId,
    /// Exclusive end of the current block.
    end: RowId,
    /// Blocks requested from the engine so far.
    refills: u64,
}

impl<S: RowIdBlockSource> DynamicRowIdAllocator<S> {
    /// Creates an allocator whose first block is `[start, start + step)`.
    pub fn new(source: S, table: impl Into<String>, step: u64, start: RowId) -> ClientResult<Self> {
        let table = table.into();
        if step == 0 {
            return Err(FerryError::invalid_option(
                OPT_SINK_ROW_ID_STEP,
                "0",
                "row-id step must be positive",
            )
            .into());
        }
        let end = start
            .checked_add(step)
            .ok_or_else(|| ClientError::RowIdExhausted(table.clone()))?;

        debug!(table = %table, start = %start, step, "seeded row-id allocator");

        Ok(Self {
            source,
            table,
            step,
            next: start,
            end,
            refills: 0,
        })
    }

    /// Returns the number of blocks requested from the engine.
    pub fn refills(&self) -> u64 {
        self.refills
    }

    /// Returns how many ids remain in the current block.
    pub fn remaining(&self) -> u64 {
        self.end.as_i64().abs_diff(self.next.as_i64())
    }

    fn refill(&mut self) -> ClientResult<()> {
        let start = self.source.allocate_block(self.step)?;
        if start < self.end {
            return Err(ClientError::BlockRegressed {
                start: start.as_i64(),
                end: self.end.as_i64(),
            });
        }
        let end = start
            .checked_add(self.step)
            .ok_or_else(|| ClientError::RowIdExhausted(self.table.clone()))?;

        self.refills += 1;
        debug!(table = %self.table, start = %start, end = %end, "refilled row-id block");

        self.next = start;
        self.end = end;
        Ok(())
    }
}

impl<S: RowIdBlockSource> RowIdAllocator for DynamicRowIdAllocator<S> {
    fn next(&mut self) -> ClientResult<RowId> {
        if self.next >= self.end {
            self.refill()?;
        }
        let id = self.next;
        self.next = id.next();
        Ok(id)
    }

    fn step(&self) -> u64 {
        self.step
    }
}

impl<S> std::fmt::Debug for DynamicRowIdAllocator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicRowIdAllocator")
            .field("table", &self.table)
            .field("step", &self.step)
            .field("next", &self.next)
            .field("end", &self.end)
            .field("refills", &self.refills)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out consecutive blocks from a counter.
    struct Counter {
        next: i64,
    }

    impl RowIdBlockSource for Counter {
        fn allocate_block(&mut self, step: u64) -> ClientResult<RowId> {
            let start = RowId::new(self.next);
            self.next += step as i64;
            Ok(start)
        }
    }

    struct Backwards;

    impl RowIdBlockSource for Backwards {
        fn allocate_block(&mut self, _step: u64) -> ClientResult<RowId> {
            Ok(RowId::new(0))
        }
    }

    #[test]
    fn test_seeded_block_then_refill() {
        let mut alloc =
            DynamicRowIdAllocator::new(Counter { next: 1000 }, "t", 3, RowId::new(10)).unwrap();

        let ids: Vec<i64> = (0..5).map(|_| alloc.next().unwrap().as_i64()).collect();
        assert_eq!(ids, vec![10, 11, 12, 1000, 1001]);
        assert_eq!(alloc.refills(), 1);
        assert_eq!(alloc.remaining(), 1);
    }

    #[test]
    fn test_strictly_increasing() {
        let mut alloc =
            DynamicRowIdAllocator::new(Counter { next: 100 }, "t", 7, RowId::new(1)).unwrap();
        let mut last = alloc.next().unwrap();
        for _ in 0..50 {
            let id = alloc.next().unwrap();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn test_zero_step_rejected() {
        let err = DynamicRowIdAllocator::new(Counter { next: 0 }, "t", 0, RowId::new(1)).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_regressing_block_rejected() {
        let mut alloc = DynamicRowIdAllocator::new(Backwards, "t", 1, RowId::new(5)).unwrap();
        assert_eq!(alloc.next().unwrap(), RowId::new(5));
        assert!(matches!(
            alloc.next(),
            Err(ClientError::BlockRegressed { start: 0, end: 6 })
        ));
    }

    #[test]
    fn test_overflowing_seed_rejected() {
        let err = DynamicRowIdAllocator::new(Counter { next: 0 }, "t", 10, RowId::new(i64::MAX))
            .unwrap_err();
        assert!(matches!(err, ClientError::RowIdExhausted(_)));
    }
}
