//! Test fixtures for rate upgrade scenarios
//!
//! Builds configurations in memory so tests never depend on files under
//! `/etc`, and provides scratch directories for ACL files.

use fst_rateupgd::{FstConfig, GroupConfig, OperatingMode};
use fst_types::{IfaceInfo, MacAddress};
use std::path::PathBuf;
use tempfile::TempDir;

/// Builder for [`FstConfig`] values
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: FstConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group with a master and the given slaves, without ACL file
    pub fn group(self, name: &str, master: &str, slaves: &[&str]) -> Self {
        self.insert(name, Some(master), None, slaves)
    }

    /// Group with a master, slaves and an ACL file
    pub fn group_with_acl(
        self,
        name: &str,
        master: &str,
        slaves: &[&str],
        acl: impl Into<PathBuf>,
    ) -> Self {
        self.insert(name, Some(master), Some(acl.into()), slaves)
    }

    /// Group listing interfaces but no rate upgrade master
    pub fn group_without_master(self, name: &str, ifaces: &[&str]) -> Self {
        self.insert(name, None, None, ifaces)
    }

    /// Run as a station supplicant
    pub fn supplicant(mut self) -> Self {
        self.config.mode = OperatingMode::Supplicant;
        self
    }

    pub fn build(self) -> FstConfig {
        self.config
    }

    fn insert(
        mut self,
        name: &str,
        master: Option<&str>,
        acl: Option<PathBuf>,
        slaves: &[&str],
    ) -> Self {
        let ifaces = master
            .into_iter()
            .chain(slaves.iter().copied())
            .map(|name| IfaceInfo::new(name))
            .collect();
        self.config.groups.insert(
            name.to_string(),
            GroupConfig {
                rate_upgrade_master: master.map(str::to_string),
                rate_upgrade_acl_fname: acl,
                ifaces,
            },
        );
        self
    }
}

/// Scratch directory for ACL files, removed on drop
pub struct AclDir {
    dir: TempDir,
}

impl AclDir {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Path of an ACL file inside the directory (not created)
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// The reference scenario: group `grp0`, master `wlan0`, slaves
/// `wlan1` and `wlan2`, ACL file `acl0` in `dir`.
pub fn grp0_scenario(dir: &AclDir) -> FstConfig {
    ConfigBuilder::new()
        .group_with_acl("grp0", "wlan0", &["wlan1", "wlan2"], dir.path("acl0"))
        .build()
}

/// Locally administered peer address ending in `last`
pub fn peer(last: u8) -> MacAddress {
    MacAddress::new([0x02, 0x00, 0x5e, 0x10, 0x00, last])
}
