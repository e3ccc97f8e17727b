//! Flat string property maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{FerryError, FerryResult};

/// String properties as handed over by a host framework.
///
/// Empty values are treated as absent, matching how hosts blank out an
/// option they cannot remove.
///
/// # Example
///
/// ```rust
/// use ferry_common::config::Properties;
///
/// let props = Properties::new()
///     .with("sink.buffer-size", "64")
///     .with("sink.deduplicate", "true");
///
/// assert_eq!(props.get_parsed::<usize>("sink.buffer-size").unwrap(), Some(64));
/// assert_eq!(props.get_bool("sink.deduplicate").unwrap(), Some(true));
/// assert_eq!(props.get("missing"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    /// Creates an empty property map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property, returning the map.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a property.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the non-empty value of a property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns true if the property is present and non-empty.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Parses a property with `FromStr`.
    pub fn get_parsed<T>(&self, key: &str) -> FerryResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value
                    .trim()
                    .parse::<T>()
                    .map_err(|e| FerryError::invalid_option(key, value, e.to_string()))
            })
            .transpose()
    }

    /// Parses a boolean property (`true`/`false`, case-insensitive).
    pub fn get_bool(&self, key: &str) -> FerryResult<Option<bool>> {
        self.get(key)
            .map(|value| match value.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(FerryError::invalid_option(
                    key,
                    value,
                    "expected 'true' or 'false'",
                )),
            })
            .transpose()
    }

    /// Parses a comma separated list.
    pub fn get_list<T>(&self, key: &str) -> FerryResult<Option<Vec<T>>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| {
                        item.parse::<T>().map_err(|e| {
                            FerryError::invalid_option(key, value, format!("'{item}': {e}"))
                        })
                    })
                    .collect()
            })
            .transpose()
    }

    /// Iterates over all properties, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<std::collections::HashMap<String, String>> for Properties {
    fn from(map: std::collections::HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}
