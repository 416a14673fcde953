//! Recording interface driver
//!
//! Stands in for the real interface layer: every call is recorded, and
//! chosen calls can be made to fail.

use async_trait::async_trait;
use fst_mgr_common::{FstMgrError, FstMgrResult, IfaceDriver};
use fst_types::{IfaceInfo, MacAddress};
use std::path::{Path, PathBuf};

/// One driver invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    AddIface {
        master: String,
        iface: String,
        acl: Option<PathBuf>,
    },
    DelIface {
        iface: String,
    },
    DupConnection {
        iface: String,
        master: String,
        addr: MacAddress,
        acl: Option<PathBuf>,
    },
    DedupConnection {
        iface: String,
        acl: Option<PathBuf>,
    },
}

impl DriverCall {
    /// Operation name as used in driver errors
    pub fn operation(&self) -> &'static str {
        match self {
            DriverCall::AddIface { .. } => "add_iface",
            DriverCall::DelIface { .. } => "del_iface",
            DriverCall::DupConnection { .. } => "dup_connection",
            DriverCall::DedupConnection { .. } => "dedup_connection",
        }
    }

    /// Interface the call targeted
    pub fn iface(&self) -> &str {
        match self {
            DriverCall::AddIface { iface, .. }
            | DriverCall::DelIface { iface }
            | DriverCall::DupConnection { iface, .. }
            | DriverCall::DedupConnection { iface, .. } => iface,
        }
    }
}

/// Driver that records calls and fails the ones it was told to
#[derive(Debug, Default)]
pub struct RecordingDriver {
    calls: Vec<DriverCall>,
    failures: Vec<(&'static str, String)>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `operation` call on `iface` fail
    pub fn fail_on(mut self, operation: &'static str, iface: impl Into<String>) -> Self {
        self.failures.push((operation, iface.into()));
        self
    }

    /// Stops failing calls
    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Every call so far, in order
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// Interfaces targeted by calls of one operation, in order
    pub fn calls_of(&self, operation: &str) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|c| c.operation() == operation)
            .map(DriverCall::iface)
            .collect()
    }

    /// Compact `(operation, iface)` trace of every call
    pub fn trace(&self) -> Vec<(&'static str, &str)> {
        self.calls.iter().map(|c| (c.operation(), c.iface())).collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn record(&mut self, call: DriverCall) -> FstMgrResult<()> {
        let operation = call.operation();
        let iface = call.iface().to_string();
        self.calls.push(call);

        if self
            .failures
            .iter()
            .any(|(op, name)| *op == operation && *name == iface)
        {
            return Err(FstMgrError::driver(operation, iface, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl IfaceDriver for RecordingDriver {
    async fn add_iface(
        &mut self,
        master: &str,
        iface: &IfaceInfo,
        acl_fname: Option<&Path>,
    ) -> FstMgrResult<()> {
        self.record(DriverCall::AddIface {
            master: master.to_string(),
            iface: iface.name.clone(),
            acl: acl_fname.map(Path::to_path_buf),
        })
    }

    async fn del_iface(&mut self, iface: &IfaceInfo) -> FstMgrResult<()> {
        self.record(DriverCall::DelIface {
            iface: iface.name.clone(),
        })
    }

    async fn dup_connection(
        &mut self,
        iface: &IfaceInfo,
        master: &str,
        addr: MacAddress,
        acl_fname: Option<&Path>,
    ) -> FstMgrResult<()> {
        self.record(DriverCall::DupConnection {
            iface: iface.name.clone(),
            master: master.to_string(),
            addr,
            acl: acl_fname.map(Path::to_path_buf),
        })
    }

    async fn dedup_connection(
        &mut self,
        iface: &IfaceInfo,
        acl_fname: Option<&Path>,
    ) -> FstMgrResult<()> {
        self.record(DriverCall::DedupConnection {
            iface: iface.name.clone(),
            acl: acl_fname.map(Path::to_path_buf),
        })
    }
}
