//! Option keys and defaults shared across Ferry.
//!
//! Host frameworks hand configuration over as flat string maps, so every
//! recognized option is named here once.

// =============================================================================
// Client Options
// =============================================================================

/// Comma separated storage-engine endpoints.
pub const OPT_ENDPOINTS: &str = "ferry.endpoints";

/// Database used when a table reference carries no database.
pub const OPT_DATABASE: &str = "ferry.database";

/// Explicit snapshot version token (unsigned 64-bit packed timestamp).
///
/// Takes priority over [`OPT_SNAPSHOT_TIMESTAMP`].
pub const OPT_SNAPSHOT_VERSION: &str = "ferry.snapshot.version";

/// Explicit snapshot wall-clock timestamp (ISO-8601 with offset).
pub const OPT_SNAPSHOT_TIMESTAMP: &str = "ferry.snapshot.timestamp";

// =============================================================================
// Sink Options
// =============================================================================

/// Absorb duplicate keys within one batch instead of failing.
pub const OPT_SINK_DEDUPLICATE: &str = "sink.deduplicate";

/// Number of row ids served by one allocator block.
pub const OPT_SINK_ROW_ID_STEP: &str = "sink.row-id-allocator.step";

/// Maximum number of rows buffered before a flush.
pub const OPT_SINK_BUFFER_SIZE: &str = "sink.buffer-size";

/// Write mode, `minibatch` or `global`.
pub const OPT_SINK_WRITE_MODE: &str = "sink.write-mode";

/// Duplicate merge policy, `keep-first` or `keep-last`.
pub const OPT_SINK_MERGE_POLICY: &str = "sink.merge-policy";

/// Comma separated row-id start values indexed by writer ordinal.
pub const OPT_SINK_ROW_ID_STARTS: &str = "sink.row-id-starts";

/// Start version token of the shared transaction in global mode.
pub const OPT_SINK_GLOBAL_START_VERSION: &str = "sink.global.start-version";

/// Primary key of the shared transaction in global mode.
pub const OPT_SINK_GLOBAL_PRIMARY_KEY: &str = "sink.global.primary-key";

// =============================================================================
// Defaults
// =============================================================================

/// Default row-id allocator step.
pub const DEFAULT_ROW_ID_STEP: u64 = 30_000;

/// Default buffer capacity in rows.
pub const DEFAULT_BUFFER_SIZE: usize = 1_000;

/// Number of low bits holding the logical counter in a version token.
pub const LOGICAL_BITS: u32 = 18;

/// Mask selecting the logical counter of a version token.
pub const LOGICAL_MASK: u64 = (1 << LOGICAL_BITS) - 1;

/// Reported by readers that cannot compute fractional progress.
pub const PROGRESS_UNKNOWN: f32 = 0.0;
