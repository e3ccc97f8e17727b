//! Client configuration.

use ferry_common::config::Properties;
use ferry_common::error::FerryResult;
use ferry_common::{
    SnapshotTimestamp, OPT_DATABASE, OPT_ENDPOINTS, OPT_SNAPSHOT_TIMESTAMP, OPT_SNAPSHOT_VERSION,
};

/// Client configuration.
///
/// Built from the string properties a host framework hands over. The full
/// property map is retained so storage-client specific keys reach the
/// session factory untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Storage-engine endpoints.
    pub endpoints: Vec<String>,
    /// Default database.
    pub database: Option<String>,
    /// Explicit snapshot version token.
    pub snapshot_version: Option<String>,
    /// Explicit snapshot timestamp (ISO-8601).
    pub snapshot_timestamp: Option<String>,
    /// All properties, including unrecognized ones.
    pub properties: Properties,
}

impl ClientConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from host properties.
    pub fn from_properties(properties: &Properties) -> FerryResult<Self> {
        let endpoints = properties
            .get_list::<String>(OPT_ENDPOINTS)?
            .unwrap_or_default();

        Ok(Self {
            endpoints,
            database: properties.get(OPT_DATABASE).map(str::to_string),
            snapshot_version: properties.get(OPT_SNAPSHOT_VERSION).map(str::to_string),
            snapshot_timestamp: properties.get(OPT_SNAPSHOT_TIMESTAMP).map(str::to_string),
            properties: properties.clone(),
        })
    }

    /// Adds an endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    /// Sets the default database.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the snapshot version token.
    pub fn snapshot_version(mut self, version: impl Into<String>) -> Self {
        self.snapshot_version = Some(version.into());
        self
    }

    /// Sets the snapshot timestamp.
    pub fn snapshot_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.snapshot_timestamp = Some(timestamp.into());
        self
    }

    /// Decodes the configured snapshot version, if any.
    pub fn parsed_snapshot_version(&self) -> FerryResult<Option<SnapshotTimestamp>> {
        self.snapshot_version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(SnapshotTimestamp::parse_version)
            .transpose()
    }

    /// Converts the configured snapshot timestamp, if any.
    pub fn parsed_snapshot_timestamp(&self) -> FerryResult<Option<SnapshotTimestamp>> {
        self.snapshot_timestamp
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(SnapshotTimestamp::parse_iso8601)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_properties() {
        let props = Properties::new()
            .with(OPT_ENDPOINTS, "pd-0:2379, pd-1:2379")
            .with(OPT_DATABASE, "shop")
            .with(OPT_SNAPSHOT_VERSION, "")
            .with("engine.tls", "true");

        let config = ClientConfig::from_properties(&props).unwrap();
        assert_eq!(config.endpoints, vec!["pd-0:2379", "pd-1:2379"]);
        assert_eq!(config.database.as_deref(), Some("shop"));
        assert_eq!(config.snapshot_version, None);
        assert_eq!(config.properties.get("engine.tls"), Some("true"));
    }

    #[test]
    fn test_parsed_snapshot_options() {
        let config = ClientConfig::new()
            .snapshot_version("262144")
            .snapshot_timestamp("2024-01-01T00:00:00Z");

        assert_eq!(
            config.parsed_snapshot_version().unwrap(),
            Some(SnapshotTimestamp::new(1, 0))
        );
        assert_eq!(
            config.parsed_snapshot_timestamp().unwrap(),
            Some(SnapshotTimestamp::new(1_704_067_200_000, 0))
        );

        let bad = ClientConfig::new().snapshot_timestamp("not a time");
        assert!(bad.parsed_snapshot_timestamp().is_err());
    }
}
