//! Error categories.

use std::fmt;

/// Coarse classification of every Ferry error.
///
/// Hosts use the category to decide between aborting, reconfiguring, and
/// restarting. None of the categories is retried inside Ferry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Missing table, malformed timestamp, version or option.
    ///
    /// Fatal and surfaced immediately.
    Configuration = 0x01,
    /// Bad input data, such as a duplicate key within one batch.
    Data = 0x02,
    /// Session, cursor, or write failure in the storage client.
    ///
    /// Left to the host's restart policy.
    Resource = 0x03,
    /// Failure while releasing resources. Logged, never propagated.
    Teardown = 0x04,
    /// Operation issued in the wrong lifecycle phase.
    State = 0x05,
}

impl ErrorCategory {
    /// Returns the category name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Configuration => "Configuration",
            Self::Data => "Data",
            Self::Resource => "Resource",
            Self::Teardown => "Teardown",
            Self::State => "State",
        }
    }

    /// Returns true if restarting the job with the same configuration can
    /// succeed.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Resource)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        assert_eq!(ErrorCategory::Configuration.to_string(), "Configuration");
        assert_eq!(ErrorCategory::Teardown.name(), "Teardown");
    }

    #[test]
    fn test_transient() {
        assert!(ErrorCategory::Resource.is_transient());
        assert!(!ErrorCategory::Configuration.is_transient());
        assert!(!ErrorCategory::Data.is_transient());
    }
}
