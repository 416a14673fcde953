//! Inbound events and the serial dispatcher that applies them.

use fst_mgr_common::IfaceDriver;
use fst_types::MacAddress;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ConfigSource;
use crate::rateupg_mgr::RateUpgradeMgr;

/// Group and peer notifications delivered by the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEvent {
    GroupAdded {
        group: String,
    },
    GroupRemoved {
        group: String,
    },
    PeerConnected {
        group: String,
        iface: String,
        addr: MacAddress,
    },
    PeerDisconnected {
        group: String,
        iface: String,
        addr: MacAddress,
    },
}

impl GroupEvent {
    /// Group the event refers to
    pub fn group(&self) -> &str {
        match self {
            GroupEvent::GroupAdded { group }
            | GroupEvent::GroupRemoved { group }
            | GroupEvent::PeerConnected { group, .. }
            | GroupEvent::PeerDisconnected { group, .. } => group,
        }
    }

    /// Short event name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            GroupEvent::GroupAdded { .. } => "group-added",
            GroupEvent::GroupRemoved { .. } => "group-removed",
            GroupEvent::PeerConnected { .. } => "peer-connected",
            GroupEvent::PeerDisconnected { .. } => "peer-disconnected",
        }
    }
}

/// Counters kept by [`EventDispatcher`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub processed: u64,
    pub failed: u64,
}

/// Drains an event channel into a [`RateUpgradeMgr`], one event at a time.
///
/// A failing event is logged and counted; it never stops the loop.
pub struct EventDispatcher<C, D> {
    mgr: RateUpgradeMgr<C, D>,
    events: mpsc::Receiver<GroupEvent>,
    stats: DispatchStats,
}

impl<C, D> EventDispatcher<C, D>
where
    C: ConfigSource,
    D: IfaceDriver,
{
    pub fn new(mgr: RateUpgradeMgr<C, D>, events: mpsc::Receiver<GroupEvent>) -> Self {
        Self {
            mgr,
            events,
            stats: DispatchStats::default(),
        }
    }

    /// Runs until every sender is gone or `shutdown` completes, then hands
    /// the manager back for teardown.
    pub async fn run<F>(mut self, shutdown: F) -> (RateUpgradeMgr<C, D>, DispatchStats)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping event dispatch");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => {
                        debug!("Event channel closed");
                        break;
                    }
                },
            }
        }

        info!(
            processed = self.stats.processed,
            failed = self.stats.failed,
            "Event dispatch finished"
        );
        (self.mgr, self.stats)
    }

    async fn dispatch(&mut self, event: GroupEvent) {
        self.stats.processed += 1;
        debug!(kind = event.kind(), group = event.group(), "Dispatching event");

        if let Err(e) = self.mgr.handle_event(&event).await {
            self.stats.failed += 1;
            warn!(
                kind = event.kind(),
                group = event.group(),
                error = %e,
                "Event failed"
            );
        }
    }
}
