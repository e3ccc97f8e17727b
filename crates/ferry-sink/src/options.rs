//! Sink options.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use ferry_client::MergePolicy;
use ferry_common::{
    FerryError, FerryResult, Properties, RowId, SnapshotTimestamp, DEFAULT_BUFFER_SIZE,
    DEFAULT_ROW_ID_STEP, OPT_SINK_BUFFER_SIZE, OPT_SINK_DEDUPLICATE,
    OPT_SINK_GLOBAL_PRIMARY_KEY, OPT_SINK_GLOBAL_START_VERSION, OPT_SINK_MERGE_POLICY,
    OPT_SINK_ROW_ID_STARTS, OPT_SINK_ROW_ID_STEP, OPT_SINK_WRITE_MODE,
};
use serde::{Deserialize, Serialize};

/// How batches are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteModeKind {
    /// Every flush commits its own transaction.
    #[default]
    MiniBatch,
    /// Every flush prewrites into one job-wide transaction.
    Global,
}

impl fmt::Display for WriteModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteModeKind::MiniBatch => write!(f, "minibatch"),
            WriteModeKind::Global => write!(f, "global"),
        }
    }
}

impl FromStr for WriteModeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minibatch" => Ok(WriteModeKind::MiniBatch),
            "global" => Ok(WriteModeKind::Global),
            other => Err(format!("unknown write mode '{other}'")),
        }
    }
}

/// The shared transaction every writer of a global-mode job joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalTxn {
    /// Start timestamp of the transaction.
    pub start_ts: SnapshotTimestamp,
    /// Primary key locked by the coordinator.
    pub primary_key: Bytes,
}

/// Options of a batch writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SinkOptions {
    /// Absorb duplicate keys within one batch instead of failing.
    #[serde(default)]
    pub deduplicate: bool,

    /// Row ids per allocator block.
    #[serde(default = "default_row_id_step")]
    pub row_id_step: u64,

    /// Buffer capacity in rows.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// How batches are committed.
    #[serde(default)]
    pub write_mode: WriteModeKind,

    /// Which row survives a deduplicated collision.
    #[serde(default)]
    pub merge_policy: MergePolicy,

    /// First row id of each writer, indexed by writer ordinal.
    #[serde(default)]
    pub row_id_starts: Vec<i64>,

    /// Start version token of the global transaction.
    #[serde(default)]
    pub global_start_version: Option<u64>,

    /// Primary key of the global transaction.
    #[serde(default)]
    pub global_primary_key: Option<String>,
}

fn default_row_id_step() -> u64 {
    DEFAULT_ROW_ID_STEP
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            deduplicate: false,
            row_id_step: default_row_id_step(),
            buffer_size: default_buffer_size(),
            write_mode: WriteModeKind::default(),
            merge_policy: MergePolicy::default(),
            row_id_starts: Vec::new(),
            global_start_version: None,
            global_primary_key: None,
        }
    }
}

impl SinkOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads options from host properties and validates them.
    pub fn from_properties(properties: &Properties) -> FerryResult<Self> {
        let options = Self {
            deduplicate: properties.get_bool(OPT_SINK_DEDUPLICATE)?.unwrap_or(false),
            row_id_step: properties
                .get_parsed(OPT_SINK_ROW_ID_STEP)?
                .unwrap_or(DEFAULT_ROW_ID_STEP),
            buffer_size: properties
                .get_parsed(OPT_SINK_BUFFER_SIZE)?
                .unwrap_or(DEFAULT_BUFFER_SIZE),
            write_mode: properties.get_parsed(OPT_SINK_WRITE_MODE)?.unwrap_or_default(),
            merge_policy: properties
                .get_parsed(OPT_SINK_MERGE_POLICY)?
                .unwrap_or_default(),
            row_id_starts: properties
                .get_list(OPT_SINK_ROW_ID_STARTS)?
                .unwrap_or_default(),
            global_start_version: properties.get_parsed(OPT_SINK_GLOBAL_START_VERSION)?,
            global_primary_key: properties
                .get(OPT_SINK_GLOBAL_PRIMARY_KEY)
                .map(str::to_string),
        };
        options.validate()?;
        Ok(options)
    }

    /// Sets deduplication.
    pub fn deduplicate(mut self, enabled: bool) -> Self {
        self.deduplicate = enabled;
        self
    }

    /// Sets the row-id step.
    pub fn row_id_step(mut self, step: u64) -> Self {
        self.row_id_step = step;
        self
    }

    /// Sets the buffer capacity.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the merge policy.
    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Sets the per-writer row-id starts.
    pub fn row_id_starts(mut self, starts: impl IntoIterator<Item = RowId>) -> Self {
        self.row_id_starts = starts.into_iter().map(RowId::as_i64).collect();
        self
    }

    /// Joins the writers to a global transaction.
    pub fn global(mut self, txn: &GlobalTxn) -> Self {
        self.write_mode = WriteModeKind::Global;
        self.global_start_version = Some(txn.start_ts.version());
        self.global_primary_key = Some(String::from_utf8_lossy(&txn.primary_key).into_owned());
        self
    }

    /// Checks value ranges and cross-option requirements.
    pub fn validate(&self) -> FerryResult<()> {
        if self.buffer_size == 0 {
            return Err(FerryError::invalid_option(
                OPT_SINK_BUFFER_SIZE,
                "0",
                "buffer size must be positive",
            ));
        }
        if self.row_id_step == 0 {
            return Err(FerryError::invalid_option(
                OPT_SINK_ROW_ID_STEP,
                "0",
                "row-id step must be positive",
            ));
        }
        self.check_row_id_starts()?;
        if self.write_mode == WriteModeKind::Global {
            self.global_transaction()?;
        }
        Ok(())
    }

    /// Rejects starts whose seed blocks `[start, start + step)` overlap.
    fn check_row_id_starts(&self) -> FerryResult<()> {
        let mut starts = self.row_id_starts.clone();
        starts.sort_unstable();
        let step = i64::try_from(self.row_id_step).unwrap_or(i64::MAX);
        for pair in starts.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            if upper.saturating_sub(lower) < step {
                let value: Vec<String> = self.row_id_starts.iter().map(i64::to_string).collect();
                return Err(FerryError::invalid_option(
                    OPT_SINK_ROW_ID_STARTS,
                    value.join(","),
                    format!("row-id blocks starting at {lower} and {upper} overlap with step {step}"),
                ));
            }
        }
        Ok(())
    }

    /// Returns the exclusive end of the highest configured seed block.
    pub fn row_id_seed_end(&self) -> Option<RowId> {
        let highest = self.row_id_starts.iter().copied().max()?;
        RowId::new(highest).checked_add(self.row_id_step)
    }

    /// Returns the configured start of writer `index`.
    pub fn row_id_start(&self, index: usize) -> FerryResult<RowId> {
        self.row_id_starts
            .get(index)
            .copied()
            .map(RowId::new)
            .ok_or(FerryError::MissingRowIdStart {
                index,
                available: self.row_id_starts.len(),
            })
    }

    /// Returns the global transaction the writers join.
    pub fn global_transaction(&self) -> FerryResult<GlobalTxn> {
        let version = self
            .global_start_version
            .ok_or_else(|| FerryError::missing_option(OPT_SINK_GLOBAL_START_VERSION))?;
        let primary_key = self
            .global_primary_key
            .as_deref()
            .ok_or_else(|| FerryError::missing_option(OPT_SINK_GLOBAL_PRIMARY_KEY))?;

        Ok(GlobalTxn {
            start_ts: SnapshotTimestamp::from_version(version),
            primary_key: Bytes::copy_from_slice(primary_key.as_bytes()),
        })
    }

    /// Writes the options back as host properties.
    pub fn to_properties(&self) -> Properties {
        let mut properties = Properties::new()
            .with(OPT_SINK_DEDUPLICATE, self.deduplicate.to_string())
            .with(OPT_SINK_ROW_ID_STEP, self.row_id_step.to_string())
            .with(OPT_SINK_BUFFER_SIZE, self.buffer_size.to_string())
            .with(OPT_SINK_WRITE_MODE, self.write_mode.to_string())
            .with(
                OPT_SINK_MERGE_POLICY,
                match self.merge_policy {
                    MergePolicy::KeepFirst => "keep-first",
                    MergePolicy::KeepLast => "keep-last",
                },
            );
        if !self.row_id_starts.is_empty() {
            let starts: Vec<String> = self.row_id_starts.iter().map(i64::to_string).collect();
            properties.insert(OPT_SINK_ROW_ID_STARTS, starts.join(","));
        }
        if let Some(version) = self.global_start_version {
            properties.insert(OPT_SINK_GLOBAL_START_VERSION, version.to_string());
        }
        if let Some(primary_key) = &self.global_primary_key {
            properties.insert(OPT_SINK_GLOBAL_PRIMARY_KEY, primary_key.clone());
        }
        properties
    }
}
