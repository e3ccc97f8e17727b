//! Type definitions for Ferry.

mod ids;
mod timestamps;

pub use ids::{RowId, TableRef};
pub use timestamps::SnapshotTimestamp;
