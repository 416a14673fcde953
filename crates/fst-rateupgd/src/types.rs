//! Type definitions for the rate upgrade manager

use fst_types::{IfaceInfo, MacAddress};
use std::path::{Path, PathBuf};

/// Peers admitted in a group, kept in admission order.
///
/// A MAC appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacEntryStore {
    macs: Vec<MacAddress>,
}

impl MacEntryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `addr` is admitted
    pub fn contains(&self, addr: &MacAddress) -> bool {
        self.macs.contains(addr)
    }

    /// Appends `addr`; returns false if it was already present
    pub fn insert(&mut self, addr: MacAddress) -> bool {
        if self.contains(&addr) {
            return false;
        }
        self.macs.push(addr);
        true
    }

    /// Removes `addr`; returns false if it was not present
    pub fn remove(&mut self, addr: &MacAddress) -> bool {
        match self.macs.iter().position(|m| m == addr) {
            Some(pos) => {
                self.macs.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacAddress> {
        self.macs.iter()
    }

    pub fn len(&self) -> usize {
        self.macs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macs.is_empty()
    }
}

/// A master interface, its slaves and the peers admitted on the master.
///
/// Only the manager creates groups, and only with at least one slave.
#[derive(Debug, Clone)]
pub struct RateUpgradeGroup {
    name: String,
    master: String,
    acl_fname: Option<PathBuf>,
    slaves: Vec<IfaceInfo>,
    acl_macs: MacEntryStore,
}

impl RateUpgradeGroup {
    pub(crate) fn new(
        name: impl Into<String>,
        master: impl Into<String>,
        acl_fname: Option<PathBuf>,
        slaves: Vec<IfaceInfo>,
    ) -> Self {
        debug_assert!(!slaves.is_empty(), "group without slaves");
        Self {
            name: name.into(),
            master: master.into(),
            acl_fname,
            slaves,
            acl_macs: MacEntryStore::new(),
        }
    }

    /// Group identifier
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interface on which peer connect/disconnect events are observed
    pub fn master(&self) -> &str {
        &self.master
    }

    /// ACL file, if this group persists its admitted peers
    pub fn acl_fname(&self) -> Option<&Path> {
        self.acl_fname.as_deref()
    }

    /// Slave interfaces in configuration order
    pub fn slaves(&self) -> &[IfaceInfo] {
        &self.slaves
    }

    /// Admitted peers
    pub fn macs(&self) -> &MacEntryStore {
        &self.acl_macs
    }

    /// Returns true if `iface` is this group's master
    pub fn is_master(&self, iface: &str) -> bool {
        self.master == iface
    }

    pub(crate) fn admit(&mut self, addr: MacAddress) -> bool {
        self.acl_macs.insert(addr)
    }

    pub(crate) fn forget(&mut self, addr: &MacAddress) -> bool {
        self.acl_macs.remove(addr)
    }
}

/// Result of a group add request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddGroupOutcome {
    /// Group registered with every slave programmed
    Added,
    /// A group with this name already exists; nothing changed
    AlreadyExists,
    /// No rate upgrade master configured; the group does not participate
    NotConfigured,
}

/// Result of a peer connect notification that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Peer admitted and duplicated onto every slave
    Admitted,
    /// Peer was already admitted
    AlreadyAdmitted,
    /// Unknown group, or the event did not arrive on the group's master
    Ignored,
}

/// Result of a peer disconnect notification that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// Peer removed from the ACL and from every slave
    Removed,
    /// Unknown group, or the event did not arrive on the group's master
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0x02, 0, 0, 0, 0, last])
    }

    #[test]
    fn test_store_keeps_insertion_order() {
        let mut store = MacEntryStore::new();
        assert!(store.insert(mac(3)));
        assert!(store.insert(mac(1)));
        assert!(store.insert(mac(2)));
        let order: Vec<_> = store.iter().copied().collect();
        assert_eq!(order, vec![mac(3), mac(1), mac(2)]);
    }

    #[test]
    fn test_store_rejects_duplicates() {
        let mut store = MacEntryStore::new();
        assert!(store.insert(mac(1)));
        assert!(!store.insert(mac(1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_remove() {
        let mut store = MacEntryStore::new();
        store.insert(mac(1));
        store.insert(mac(2));
        assert!(store.remove(&mac(1)));
        assert!(!store.remove(&mac(1)));
        assert_eq!(store.iter().copied().collect::<Vec<_>>(), vec![mac(2)]);
    }

    #[test]
    fn test_group_master_match_is_exact() {
        let group = RateUpgradeGroup::new("grp0", "wlan0", None, vec![IfaceInfo::new("wlan1")]);
        assert!(group.is_master("wlan0"));
        assert!(!group.is_master("wlan"));
        assert!(!group.is_master("wlan1"));
        assert!(group.acl_fname().is_none());
        assert!(group.macs().is_empty());
    }
}
