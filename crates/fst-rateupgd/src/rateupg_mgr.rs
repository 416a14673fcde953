//! RateUpgradeMgr - group lifecycle and peer admission
//!
//! Group add and peer connect are all-or-nothing: every step that
//! succeeded is journaled and undone in reverse order if a later step
//! fails. Group removal and peer disconnect are best-effort: a failing
//! slave is reported but the remaining slaves are still processed.

use fst_mgr_common::IfaceDriver;
use fst_types::MacAddress;
use tracing::{debug, error, info, instrument, warn};

use crate::acl;
use crate::config::ConfigSource;
use crate::error::{RateUpgradeError, RateUpgradeResult};
use crate::events::GroupEvent;
use crate::registry::GroupRegistry;
use crate::txn::{Rollback, Step};
use crate::types::{AddGroupOutcome, ConnectOutcome, DisconnectOutcome, RateUpgradeGroup};

/// Owns the rate upgrade groups and applies group and peer events to them.
///
/// Entry points must be called one at a time; the event dispatcher
/// serializes them.
pub struct RateUpgradeMgr<C, D> {
    config: C,
    driver: D,
    groups: GroupRegistry,
}

impl<C, D> RateUpgradeMgr<C, D>
where
    C: ConfigSource,
    D: IfaceDriver,
{
    /// Creates a manager with no groups
    pub fn new(config: C, driver: D) -> Self {
        Self {
            config,
            driver,
            groups: GroupRegistry::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    pub fn find_group(&self, name: &str) -> Option<&RateUpgradeGroup> {
        self.groups.find(name)
    }

    /// Names of the registered groups, in the order they were added
    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name().to_string()).collect()
    }

    /// Creates a group from configuration and programs all its slaves.
    ///
    /// On failure nothing stays behind: slaves already programmed are
    /// removed again and the ACL file is put back as it was.
    #[instrument(skip(self))]
    pub async fn add_group(&mut self, group_id: &str) -> RateUpgradeResult<AddGroupOutcome> {
        if self.groups.contains(group_id) {
            warn!("Group {} already added", group_id);
            return Ok(AddGroupOutcome::AlreadyExists);
        }

        let Some(master) = self.config.rate_upgrade_master(group_id) else {
            debug!("No rate upgrade master configured for group {}", group_id);
            return Ok(AddGroupOutcome::NotConfigured);
        };

        let acl_fname = if self.config.is_supplicant() {
            None
        } else {
            self.config.rate_upgrade_acl_fname(group_id)
        };
        if let Some(acl) = &acl_fname {
            info!("Using ACL file {}", acl.display());
        }

        let slaves = self
            .config
            .slave_ifaces(group_id, &master)
            .inspect_err(|e| error!("Cannot add group {}: {}", group_id, e))?;
        if slaves.is_empty() {
            error!("No slave ifaces found in group {}", group_id);
            return Err(RateUpgradeError::NoSlaves {
                group: group_id.to_string(),
            });
        }

        let group = RateUpgradeGroup::new(group_id, master, acl_fname, slaves);
        let mut rollback = Rollback::new("add_group", group_id);

        if let Some(path) = group.acl_fname() {
            let previous = acl::snapshot(path)
                .map_err(|e| RateUpgradeError::persistence(group_id, path, e))?;
            acl::persist(&group)?;
            rollback.record(Step::WroteAclFile {
                path: path.to_path_buf(),
                previous,
            });
        }

        let mut failure = None;
        for iface in group.slaves() {
            match self
                .driver
                .add_iface(group.master(), iface, group.acl_fname())
                .await
            {
                Ok(()) => rollback.record(Step::ProgrammedIface(iface.clone())),
                Err(source) => {
                    error!("Cannot add slave interface {}: {}", iface, source);
                    failure = Some(RateUpgradeError::driver("add_iface", iface.name.as_str(), source));
                    break;
                }
            }
        }

        if let Some(err) = failure {
            rollback.unwind(&mut self.driver, group.acl_fname()).await;
            return Err(err);
        }

        rollback.commit();
        info!(
            master = group.master(),
            slaves = group.slaves().len(),
            "Rate upgrade group {} added",
            group_id
        );
        self.groups.insert(group);
        Ok(AddGroupOutcome::Added)
    }

    /// Removes a group, detaching every slave.
    ///
    /// The group is dropped even if some slaves fail to detach; those are
    /// reported in [`RateUpgradeError::SlaveCleanup`].
    #[instrument(skip(self))]
    pub async fn del_group(&mut self, group_id: &str) -> RateUpgradeResult<()> {
        let Some(group) = self.groups.remove(group_id) else {
            error!("No group exists {}", group_id);
            return Err(RateUpgradeError::GroupNotFound {
                group: group_id.to_string(),
            });
        };

        let mut failed = Vec::new();
        for iface in group.slaves() {
            if let Err(e) = self.driver.del_iface(iface).await {
                error!("Cannot delete iface {}: {}", iface, e);
                failed.push(iface.name.clone());
            }
        }

        info!(peers = group.macs().len(), "Rate upgrade group {} removed", group_id);

        if failed.is_empty() {
            Ok(())
        } else {
            Err(RateUpgradeError::SlaveCleanup {
                group: group_id.to_string(),
                failed,
            })
        }
    }

    /// Admits a peer that connected on the group's master.
    ///
    /// Events for unknown groups or from other interfaces are ignored.
    #[instrument(skip(self))]
    pub async fn on_connect(
        &mut self,
        group_id: &str,
        iface: &str,
        addr: MacAddress,
    ) -> RateUpgradeResult<ConnectOutcome> {
        let Some(group) = self.groups.find_mut(group_id) else {
            return Ok(ConnectOutcome::Ignored);
        };
        if !group.is_master(iface) {
            return Ok(ConnectOutcome::Ignored);
        }

        if group.macs().contains(&addr) {
            warn!("MAC {} is already connected", addr);
            return Ok(ConnectOutcome::AlreadyAdmitted);
        }

        group.admit(addr);

        // The file is not rewritten again if this fails
        if let Err(e) = acl::persist(group) {
            group.forget(&addr);
            return Err(e);
        }

        let mut rollback = Rollback::new("on_connect", group_id);
        let mut failure = None;
        for slave in group.slaves() {
            match self
                .driver
                .dup_connection(slave, group.master(), addr, group.acl_fname())
                .await
            {
                Ok(()) => rollback.record(Step::DuplicatedConnection(slave.clone())),
                Err(source) => {
                    error!("Cannot connect iface {}: {}", slave, source);
                    failure = Some(RateUpgradeError::driver(
                        "dup_connection",
                        slave.name.as_str(),
                        source,
                    ));
                    break;
                }
            }
        }

        if let Some(err) = failure {
            rollback.unwind(&mut self.driver, group.acl_fname()).await;
            group.forget(&addr);
            return Err(err);
        }

        rollback.commit();
        info!("MAC {} admitted in group {}", addr, group_id);
        Ok(ConnectOutcome::Admitted)
    }

    /// Withdraws a peer that disconnected from the group's master.
    ///
    /// The peer is dropped from the group before the ACL file is written
    /// and stays dropped if that write fails.
    #[instrument(skip(self))]
    pub async fn on_disconnect(
        &mut self,
        group_id: &str,
        iface: &str,
        addr: MacAddress,
    ) -> RateUpgradeResult<DisconnectOutcome> {
        let Some(group) = self.groups.find_mut(group_id) else {
            return Ok(DisconnectOutcome::Ignored);
        };
        if !group.is_master(iface) {
            return Ok(DisconnectOutcome::Ignored);
        }

        if !group.forget(&addr) {
            error!("Cannot find master peer {}", addr);
            return Err(RateUpgradeError::MacNotFound {
                group: group_id.to_string(),
                mac: addr,
            });
        }

        acl::persist(group)?;

        let mut failed = Vec::new();
        for slave in group.slaves() {
            if let Err(e) = self.driver.dedup_connection(slave, group.acl_fname()).await {
                error!("Cannot disconnect iface {}: {}", slave, e);
                failed.push(slave.name.clone());
            }
        }

        if !failed.is_empty() {
            return Err(RateUpgradeError::SlaveCleanup {
                group: group_id.to_string(),
                failed,
            });
        }

        info!("MAC {} removed from group {}", addr, group_id);
        Ok(DisconnectOutcome::Removed)
    }

    /// Applies one inbound event.
    pub async fn handle_event(&mut self, event: &GroupEvent) -> RateUpgradeResult<()> {
        match event {
            GroupEvent::GroupAdded { group } => self.add_group(group).await.map(|_| ()),
            GroupEvent::GroupRemoved { group } => self.del_group(group).await,
            GroupEvent::PeerConnected { group, iface, addr } => {
                self.on_connect(group, iface, *addr).await.map(|_| ())
            }
            GroupEvent::PeerDisconnected { group, iface, addr } => {
                self.on_disconnect(group, iface, *addr).await.map(|_| ())
            }
        }
    }

    /// Releases every group without touching the interfaces.
    ///
    /// Callers wanting slaves detached remove the groups first.
    pub fn shutdown(mut self) -> (C, D) {
        for group in self.groups.drain() {
            debug!(
                peers = group.macs().len(),
                "Releasing rate upgrade group {}",
                group.name()
            );
        }
        (self.config, self.driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FstConfig, GroupConfig, OperatingMode};
    use async_trait::async_trait;
    use fst_mgr_common::{FstMgrError, FstMgrResult};
    use fst_types::IfaceInfo;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Records driver calls; fails calls listed in `fail`.
    #[derive(Default)]
    struct MockDriver {
        calls: Vec<String>,
        fail: HashSet<String>,
    }

    impl MockDriver {
        fn call(&mut self, entry: String) -> FstMgrResult<()> {
            let failed = self.fail.contains(&entry);
            self.calls.push(entry.clone());
            if failed {
                Err(FstMgrError::driver("mock", entry, "injected failure"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl IfaceDriver for MockDriver {
        async fn add_iface(&mut self, master: &str, iface: &IfaceInfo, _: Option<&Path>) -> FstMgrResult<()> {
            self.call(format!("add {master} {iface}"))
        }

        async fn del_iface(&mut self, iface: &IfaceInfo) -> FstMgrResult<()> {
            self.call(format!("del {iface}"))
        }

        async fn dup_connection(
            &mut self,
            iface: &IfaceInfo,
            master: &str,
            addr: MacAddress,
            _: Option<&Path>,
        ) -> FstMgrResult<()> {
            self.call(format!("dup {iface} {master} {addr}"))
        }

        async fn dedup_connection(&mut self, iface: &IfaceInfo, _: Option<&Path>) -> FstMgrResult<()> {
            self.call(format!("dedup {iface}"))
        }
    }

    fn config(acl: Option<PathBuf>, slaves: &[&str]) -> FstConfig {
        let mut ifaces = vec![IfaceInfo::new("wlan0")];
        ifaces.extend(slaves.iter().map(|s| IfaceInfo::new(*s)));

        let mut config = FstConfig::default();
        config.groups.insert(
            "grp0".to_string(),
            GroupConfig {
                rate_upgrade_master: Some("wlan0".to_string()),
                rate_upgrade_acl_fname: acl,
                ifaces,
            },
        );
        config
    }

    fn mgr(config: FstConfig, fail: &[&str]) -> RateUpgradeMgr<FstConfig, MockDriver> {
        let driver = MockDriver {
            calls: Vec::new(),
            fail: fail.iter().map(|s| s.to_string()).collect(),
        };
        RateUpgradeMgr::new(config, driver)
    }

    fn peer() -> MacAddress {
        "AA:BB:CC:DD:EE:FF".parse().unwrap()
    }

    #[tokio::test]
    async fn test_add_group() {
        let dir = TempDir::new().unwrap();
        let acl = dir.path().join("acl0");
        let mut mgr = mgr(config(Some(acl.clone()), &["wlan1", "wlan2"]), &[]);

        assert_eq!(mgr.add_group("grp0").await.unwrap(), AddGroupOutcome::Added);

        let group = mgr.find_group("grp0").unwrap();
        assert_eq!(group.master(), "wlan0");
        assert_eq!(group.slaves().len(), 2);
        assert_eq!(fs::read_to_string(&acl).unwrap(), "");
        assert_eq!(mgr.driver().calls, vec!["add wlan0 wlan1", "add wlan0 wlan2"]);
    }

    #[tokio::test]
    async fn test_add_group_twice_is_noop() {
        let mut mgr = mgr(config(None, &["wlan1"]), &[]);
        mgr.add_group("grp0").await.unwrap();

        assert_eq!(
            mgr.add_group("grp0").await.unwrap(),
            AddGroupOutcome::AlreadyExists
        );
        assert_eq!(mgr.driver().calls.len(), 1);
        assert_eq!(mgr.groups().len(), 1);
    }

    #[tokio::test]
    async fn test_add_group_without_master() {
        let mut config = config(None, &["wlan1"]);
        config.groups.get_mut("grp0").unwrap().rate_upgrade_master = None;
        let mut mgr = mgr(config, &[]);

        assert_eq!(
            mgr.add_group("grp0").await.unwrap(),
            AddGroupOutcome::NotConfigured
        );
        assert!(mgr.find_group("grp0").is_none());
        assert!(mgr.driver().calls.is_empty());
    }

    #[tokio::test]
    async fn test_add_group_without_slaves() {
        let mut mgr = mgr(config(None, &[]), &[]);
        assert!(matches!(
            mgr.add_group("grp0").await,
            Err(RateUpgradeError::NoSlaves { .. })
        ));
        assert!(mgr.groups().is_empty());
    }

    #[tokio::test]
    async fn test_supplicant_mode_ignores_acl() {
        let dir = TempDir::new().unwrap();
        let acl = dir.path().join("acl0");
        let mut config = config(Some(acl.clone()), &["wlan1"]);
        config.mode = OperatingMode::Supplicant;
        let mut mgr = mgr(config, &[]);

        mgr.add_group("grp0").await.unwrap();
        assert!(mgr.find_group("grp0").unwrap().acl_fname().is_none());
        assert!(!acl.exists());
    }

    #[tokio::test]
    async fn test_add_group_rolls_back_programmed_slaves() {
        let dir = TempDir::new().unwrap();
        let acl = dir.path().join("acl0");
        let mut mgr = mgr(
            config(Some(acl.clone()), &["wlan1", "wlan2", "wlan3"]),
            &["add wlan0 wlan3"],
        );

        assert!(matches!(
            mgr.add_group("grp0").await,
            Err(RateUpgradeError::Driver { operation: "add_iface", .. })
        ));
        assert_eq!(
            mgr.driver().calls,
            vec![
                "add wlan0 wlan1",
                "add wlan0 wlan2",
                "add wlan0 wlan3",
                "del wlan2",
                "del wlan1",
            ]
        );
        assert!(mgr.find_group("grp0").is_none());
        assert!(!acl.exists());
    }

    #[tokio::test]
    async fn test_add_group_failure_restores_existing_acl() {
        let dir = TempDir::new().unwrap();
        let acl = dir.path().join("acl0");
        fs::write(&acl, "00:11:22:33:44:55\n").unwrap();
        let mut mgr = mgr(config(Some(acl.clone()), &["wlan1"]), &["add wlan0 wlan1"]);

        assert!(mgr.add_group("grp0").await.is_err());
        assert_eq!(fs::read_to_string(&acl).unwrap(), "00:11:22:33:44:55\n");
    }

    #[tokio::test]
    async fn test_del_group_best_effort() {
        let mut mgr = mgr(config(None, &["wlan1", "wlan2"]), &["del wlan1"]);
        mgr.add_group("grp0").await.unwrap();

        match mgr.del_group("grp0").await {
            Err(RateUpgradeError::SlaveCleanup { failed, .. }) => assert_eq!(failed, vec!["wlan1"]),
            other => panic!("Expected SlaveCleanup, got {other:?}"),
        }
        assert!(mgr.driver().calls.ends_with(&["del wlan1".to_string(), "del wlan2".to_string()]));
        assert!(mgr.find_group("grp0").is_none());
    }

    #[tokio::test]
    async fn test_del_unknown_group() {
        let mut mgr = mgr(config(None, &["wlan1"]), &[]);
        assert!(matches!(
            mgr.del_group("grp0").await,
            Err(RateUpgradeError::GroupNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let dir = TempDir::new().unwrap();
        let acl = dir.path().join("acl0");
        let mut mgr = mgr(config(Some(acl.clone()), &["wlan1", "wlan2"]), &[]);
        mgr.add_group("grp0").await.unwrap();

        assert_eq!(
            mgr.on_connect("grp0", "wlan0", peer()).await.unwrap(),
            ConnectOutcome::Admitted
        );
        assert_eq!(fs::read_to_string(&acl).unwrap(), "aa:bb:cc:dd:ee:ff\n");
        assert!(mgr.driver().calls.contains(&"dup wlan2 wlan0 aa:bb:cc:dd:ee:ff".to_string()));

        assert_eq!(
            mgr.on_disconnect("grp0", "wlan0", peer()).await.unwrap(),
            DisconnectOutcome::Removed
        );
        assert_eq!(fs::read_to_string(&acl).unwrap(), "");
        assert!(mgr.driver().calls.ends_with(&["dedup wlan1".to_string(), "dedup wlan2".to_string()]));
    }

    #[tokio::test]
    async fn test_connect_twice_is_idempotent() {
        let mut mgr = mgr(config(None, &["wlan1"]), &[]);
        mgr.add_group("grp0").await.unwrap();

        mgr.on_connect("grp0", "wlan0", peer()).await.unwrap();
        let calls = mgr.driver().calls.len();
        assert_eq!(
            mgr.on_connect("grp0", "wlan0", peer()).await.unwrap(),
            ConnectOutcome::AlreadyAdmitted
        );
        assert_eq!(mgr.driver().calls.len(), calls);
        assert_eq!(mgr.find_group("grp0").unwrap().macs().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_ignored_off_master() {
        let mut mgr = mgr(config(None, &["wlan1"]), &[]);
        mgr.add_group("grp0").await.unwrap();

        assert_eq!(
            mgr.on_connect("grp0", "wlan1", peer()).await.unwrap(),
            ConnectOutcome::Ignored
        );
        assert_eq!(
            mgr.on_connect("other", "wlan0", peer()).await.unwrap(),
            ConnectOutcome::Ignored
        );
        assert_eq!(
            mgr.on_disconnect("grp0", "wlan1", peer()).await.unwrap(),
            DisconnectOutcome::Ignored
        );
        assert!(mgr.find_group("grp0").unwrap().macs().is_empty());
    }

    #[tokio::test]
    async fn test_connect_rolls_back_duplicated_slaves() {
        let mut mgr = mgr(
            config(None, &["wlan1", "wlan2", "wlan3"]),
            &["dup wlan2 wlan0 aa:bb:cc:dd:ee:ff"],
        );
        mgr.add_group("grp0").await.unwrap();

        assert!(matches!(
            mgr.on_connect("grp0", "wlan0", peer()).await,
            Err(RateUpgradeError::Driver { operation: "dup_connection", .. })
        ));
        assert!(mgr.driver().calls.ends_with(&[
            "dup wlan1 wlan0 aa:bb:cc:dd:ee:ff".to_string(),
            "dup wlan2 wlan0 aa:bb:cc:dd:ee:ff".to_string(),
            "dedup wlan1".to_string(),
        ]));
        assert!(!mgr.find_group("grp0").unwrap().macs().contains(&peer()));
    }

    #[tokio::test]
    async fn test_connect_persist_failure_forgets_peer() {
        let dir = TempDir::new().unwrap();
        let acl = dir.path().join("acl0");
        let mut mgr = mgr(config(Some(acl.clone()), &["wlan1"]), &[]);
        mgr.add_group("grp0").await.unwrap();

        // Replacing the file with a directory makes the next open fail
        fs::remove_file(&acl).unwrap();
        fs::create_dir(&acl).unwrap();

        assert!(matches!(
            mgr.on_connect("grp0", "wlan0", peer()).await,
            Err(RateUpgradeError::Persistence { .. })
        ));
        assert!(mgr.find_group("grp0").unwrap().macs().is_empty());
        assert!(!mgr.driver().calls.iter().any(|c| c.starts_with("dup")));
    }

    #[tokio::test]
    async fn test_disconnect_persist_failure_keeps_peer_removed() {
        let dir = TempDir::new().unwrap();
        let acl = dir.path().join("acl0");
        let mut mgr = mgr(config(Some(acl.clone()), &["wlan1", "wlan2"]), &[]);
        mgr.add_group("grp0").await.unwrap();
        mgr.on_connect("grp0", "wlan0", peer()).await.unwrap();

        fs::remove_file(&acl).unwrap();
        fs::create_dir(&acl).unwrap();

        assert!(matches!(
            mgr.on_disconnect("grp0", "wlan0", peer()).await,
            Err(RateUpgradeError::Persistence { .. })
        ));
        assert!(mgr.find_group("grp0").unwrap().macs().is_empty());
        assert!(!mgr.driver().calls.iter().any(|c| c.starts_with("dedup")));
    }

    #[tokio::test]
    async fn test_add_group_unwritable_acl() {
        let dir = TempDir::new().unwrap();
        let acl = dir.path().join("missing").join("acl0");
        let mut mgr = mgr(config(Some(acl.clone()), &["wlan1", "wlan2"]), &[]);

        assert!(matches!(
            mgr.add_group("grp0").await,
            Err(RateUpgradeError::Persistence { .. })
        ));
        assert!(mgr.driver().calls.is_empty());
        assert!(mgr.find_group("grp0").is_none());
        assert!(!acl.exists());
    }

    #[tokio::test]
    async fn test_disconnect_unknown_peer() {
        let mut mgr = mgr(config(None, &["wlan1"]), &[]);
        mgr.add_group("grp0").await.unwrap();

        let err = mgr.on_disconnect("grp0", "wlan0", peer()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_disconnect_reports_slave_failures() {
        let mut mgr = mgr(config(None, &["wlan1", "wlan2"]), &["dedup wlan1"]);
        mgr.add_group("grp0").await.unwrap();
        mgr.on_connect("grp0", "wlan0", peer()).await.unwrap();

        match mgr.on_disconnect("grp0", "wlan0", peer()).await {
            Err(RateUpgradeError::SlaveCleanup { failed, .. }) => assert_eq!(failed, vec!["wlan1"]),
            other => panic!("Expected SlaveCleanup, got {other:?}"),
        }
        assert!(mgr.driver().calls.ends_with(&["dedup wlan1".to_string(), "dedup wlan2".to_string()]));
        assert!(mgr.find_group("grp0").unwrap().macs().is_empty());
    }

    #[tokio::test]
    async fn test_handle_event() {
        let mut mgr = mgr(config(None, &["wlan1"]), &[]);
        mgr.handle_event(&GroupEvent::GroupAdded {
            group: "grp0".to_string(),
        })
        .await
        .unwrap();
        mgr.handle_event(&GroupEvent::PeerConnected {
            group: "grp0".to_string(),
            iface: "wlan0".to_string(),
            addr: peer(),
        })
        .await
        .unwrap();
        assert_eq!(mgr.find_group("grp0").unwrap().macs().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_skips_driver() {
        let mut mgr = mgr(config(None, &["wlan1"]), &[]);
        mgr.add_group("grp0").await.unwrap();

        let (_, driver) = mgr.shutdown();
        assert_eq!(driver.calls, vec!["add wlan0 wlan1"]);
    }
}
