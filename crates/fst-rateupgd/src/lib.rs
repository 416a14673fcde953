//! fst-rateupgd - FST rate upgrade manager
//!
//! Keeps groups of one master and several slave radio interfaces in step:
//! every peer admitted on the master is written to the group's ACL file
//! and duplicated onto each slave, so the peer can move to a faster band
//! without re-authenticating.

mod acl;
mod config;
mod error;
mod events;
mod rateupg_mgr;
mod registry;
mod txn;
mod types;

pub use acl::{persist, read_acl_file, render};
pub use config::{ConfigSource, FstConfig, GroupConfig, OperatingMode, DEFAULT_CONFIG_PATH};
pub use error::{RateUpgradeError, RateUpgradeResult};
pub use events::{DispatchStats, EventDispatcher, GroupEvent};
pub use rateupg_mgr::RateUpgradeMgr;
pub use registry::GroupRegistry;
pub use types::*;
