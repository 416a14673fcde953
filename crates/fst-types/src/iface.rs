//! Radio interface descriptor.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Linux limit on interface names, excluding the terminating NUL.
pub const IFNAMSIZ: usize = 15;

/// Describes one interface of an FST group as read from configuration.
///
/// Only `name` is interpreted by the rate upgrade logic; `priority` and
/// `llt` are handed through untouched to the interface driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IfaceInfo {
    /// Kernel interface name, e.g. `wlan1`.
    pub name: String,

    /// Band priority used by the session transfer logic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,

    /// Link loss timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llt: Option<u32>,
}

impl IfaceInfo {
    /// Creates a descriptor with only a name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: None,
            llt: None,
        }
    }

    /// Checks that the name is usable as a kernel interface name.
    pub fn validate(&self) -> Result<(), ParseError> {
        let valid = !self.name.is_empty()
            && self.name.len() <= IFNAMSIZ
            && !self
                .name
                .chars()
                .any(|c| c.is_whitespace() || c == '/' || c == ':');
        if valid {
            Ok(())
        } else {
            Err(ParseError::InvalidIfaceName(self.name.clone()))
        }
    }
}

impl fmt::Display for IfaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
