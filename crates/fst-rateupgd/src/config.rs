//! Rate upgrade configuration.
//!
//! Loaded from a TOML file, by default `/etc/fst/fstman.toml`:
//!
//! ```toml
//! mode = "ap"
//!
//! [driver]
//! add_iface = "fstctl attach {master} {iface} {acl}"
//! del_iface = "fstctl detach {iface}"
//! dup_connection = "fstctl dup {iface} {master} {mac} {acl}"
//! dedup_connection = "fstctl dedup {iface} {acl}"
//!
//! [groups.grp0]
//! rate_upgrade_master = "wlan0"
//! rate_upgrade_acl_fname = "/var/run/fst/acl0"
//!
//! [[groups.grp0.ifaces]]
//! name = "wlan0"
//!
//! [[groups.grp0.ifaces]]
//! name = "wlan1"
//! priority = 2
//! ```

use fst_mgr_common::DriverTemplates;
use fst_types::IfaceInfo;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RateUpgradeError, RateUpgradeResult};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fst/fstman.toml";

/// What the rate upgrade manager needs to know about a group.
pub trait ConfigSource {
    /// Master interface of the group; `None` if the group does not take
    /// part in rate upgrade.
    fn rate_upgrade_master(&self, group: &str) -> Option<String>;

    /// ACL file of the group, if any.
    fn rate_upgrade_acl_fname(&self, group: &str) -> Option<PathBuf>;

    /// Interfaces of the group other than `master`, in configuration order.
    fn slave_ifaces(&self, group: &str, master: &str) -> RateUpgradeResult<Vec<IfaceInfo>>;

    /// True when running next to a station supplicant; ACL files are then
    /// not used.
    fn is_supplicant(&self) -> bool;
}

/// Which side of the link the manager runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Access point (hostapd)
    #[default]
    Ap,
    /// Station (wpa_supplicant)
    Supplicant,
}

/// Per-group configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Interface on which peers are first admitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_upgrade_master: Option<String>,

    /// File listing admitted peers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_upgrade_acl_fname: Option<PathBuf>,

    /// All interfaces of the group, master included
    #[serde(default)]
    pub ifaces: Vec<IfaceInfo>,
}

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FstConfig {
    #[serde(default)]
    pub mode: OperatingMode,

    /// Command templates for the shell interface driver
    #[serde(default)]
    pub driver: DriverTemplates,

    #[serde(default)]
    pub groups: BTreeMap<String, GroupConfig>,
}

impl FstConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> RateUpgradeResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RateUpgradeError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            RateUpgradeError::Config(msg) => {
                RateUpgradeError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> RateUpgradeResult<Self> {
        toml::from_str(content)
            .map_err(|e| RateUpgradeError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> RateUpgradeResult<()> {
        self.driver
            .validate()
            .map_err(|e| RateUpgradeError::Config(e.to_string()))?;

        for (name, group) in &self.groups {
            let mut seen = HashSet::new();
            for iface in &group.ifaces {
                iface.validate().map_err(|e| {
                    RateUpgradeError::Config(format!("groups.{}: {}", name, e))
                })?;
                if !seen.insert(iface.name.as_str()) {
                    return Err(RateUpgradeError::Config(format!(
                        "groups.{}: interface {} listed twice",
                        name, iface.name
                    )));
                }
            }

            if let Some(acl) = &group.rate_upgrade_acl_fname {
                if acl.as_os_str().is_empty() {
                    return Err(RateUpgradeError::Config(format!(
                        "groups.{}: rate_upgrade_acl_fname must not be empty",
                        name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Configured group identifiers, sorted
    pub fn group_ids(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }
}

impl ConfigSource for FstConfig {
    fn rate_upgrade_master(&self, group: &str) -> Option<String> {
        self.groups
            .get(group)?
            .rate_upgrade_master
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }

    fn rate_upgrade_acl_fname(&self, group: &str) -> Option<PathBuf> {
        self.groups.get(group)?.rate_upgrade_acl_fname.clone()
    }

    fn slave_ifaces(&self, group: &str, master: &str) -> RateUpgradeResult<Vec<IfaceInfo>> {
        let cfg = self
            .groups
            .get(group)
            .ok_or_else(|| RateUpgradeError::SlaveLookup {
                group: group.to_string(),
                message: "group is not configured".to_string(),
            })?;

        Ok(cfg
            .ifaces
            .iter()
            .filter(|iface| iface.name != master)
            .cloned()
            .collect())
    }

    fn is_supplicant(&self) -> bool {
        self.mode == OperatingMode::Supplicant
    }
}
