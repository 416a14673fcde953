//! Error types for rate upgrade operations.

use fst_mgr_common::FstMgrError;
use fst_types::MacAddress;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rate upgrade operations.
pub type RateUpgradeResult<T> = Result<T, RateUpgradeError>;

/// Failures reported to the event dispatcher.
///
/// Adding a group that already exists and adding a group without a
/// configured master are not errors; see [`crate::AddGroupOutcome`].
#[derive(Debug, Error)]
pub enum RateUpgradeError {
    /// No group with this name is registered.
    #[error("No group exists {group}")]
    GroupNotFound { group: String },

    /// The peer is not admitted in the group.
    #[error("MAC {mac} is not connected in group {group}")]
    MacNotFound { group: String, mac: MacAddress },

    /// Configuration resolved zero slave interfaces.
    #[error("No slave ifaces found in group {group}")]
    NoSlaves { group: String },

    /// Configuration could not enumerate the group's interfaces.
    #[error("Cannot resolve slave ifaces of group {group}: {message}")]
    SlaveLookup { group: String, message: String },

    /// The ACL file could not be opened or written.
    #[error("group {group}: cannot write acl file {}: {source}", path.display())]
    Persistence {
        group: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An interface driver call failed.
    #[error("{operation} failed on iface {iface}: {source}")]
    Driver {
        operation: &'static str,
        iface: String,
        #[source]
        source: FstMgrError,
    },

    /// Best-effort teardown finished but some slaves reported errors.
    #[error("group {group}: cleanup failed on ifaces {}", failed.join(", "))]
    SlaveCleanup { group: String, failed: Vec<String> },

    /// Configuration file could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RateUpgradeError {
    /// Creates a driver error for `iface`.
    pub fn driver(operation: &'static str, iface: impl Into<String>, source: FstMgrError) -> Self {
        Self::Driver {
            operation,
            iface: iface.into(),
            source,
        }
    }

    /// Creates a persistence error.
    pub fn persistence(group: impl Into<String>, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Persistence {
            group: group.into(),
            path: path.into(),
            source,
        }
    }

    /// Returns true if the group or peer named by the event is unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RateUpgradeError::GroupNotFound { .. } | RateUpgradeError::MacNotFound { .. }
        )
    }
}
