//! Rollback journal for multi-step group operations.
//!
//! Each completed step is recorded as it succeeds. If a later step fails,
//! [`Rollback::unwind`] runs the compensations newest first; on success
//! [`Rollback::commit`] discards the journal.

use fst_mgr_common::IfaceDriver;
use fst_types::IfaceInfo;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::acl;

/// A completed step and what is needed to undo it.
#[derive(Debug)]
pub(crate) enum Step {
    /// The ACL file was (re)written; holds the content it replaced.
    WroteAclFile {
        path: PathBuf,
        previous: Option<Vec<u8>>,
    },
    /// `add_iface` succeeded on this slave.
    ProgrammedIface(IfaceInfo),
    /// `dup_connection` succeeded on this slave.
    DuplicatedConnection(IfaceInfo),
}

#[derive(Debug)]
pub(crate) struct Rollback {
    operation: &'static str,
    group: String,
    steps: Vec<Step>,
    finished: bool,
}

impl Rollback {
    pub(crate) fn new(operation: &'static str, group: impl Into<String>) -> Self {
        Self {
            operation,
            group: group.into(),
            steps: Vec::new(),
            finished: false,
        }
    }

    pub(crate) fn record(&mut self, step: Step) {
        self.steps.push(step);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    /// Keeps every recorded step.
    pub(crate) fn commit(mut self) {
        self.steps.clear();
        self.finished = true;
    }

    /// Undoes every recorded step in reverse order.
    ///
    /// Compensation failures are logged and do not stop the unwind.
    pub(crate) async fn unwind<D>(mut self, driver: &mut D, acl_fname: Option<&Path>)
    where
        D: IfaceDriver + ?Sized,
    {
        debug!(
            operation = self.operation,
            group = %self.group,
            steps = self.steps.len(),
            "Rolling back"
        );

        while let Some(step) = self.steps.pop() {
            match step {
                Step::WroteAclFile { path, previous } => {
                    if let Err(e) = acl::restore(&path, previous.as_deref()) {
                        warn!(
                            group = %self.group,
                            acl = %path.display(),
                            error = %e,
                            "Cannot restore ACL file"
                        );
                    }
                }
                Step::ProgrammedIface(iface) => {
                    if let Err(e) = driver.del_iface(&iface).await {
                        warn!(group = %self.group, iface = %iface, error = %e, "Cannot delete iface");
                    }
                }
                Step::DuplicatedConnection(iface) => {
                    if let Err(e) = driver.dedup_connection(&iface, acl_fname).await {
                        warn!(
                            group = %self.group,
                            iface = %iface,
                            error = %e,
                            "Cannot disconnect iface"
                        );
                    }
                }
            }
        }
        self.finished = true;
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        if !self.finished && !self.steps.is_empty() {
            warn!(
                operation = self.operation,
                group = %self.group,
                steps = self.steps.len(),
                "Rollback journal dropped without commit or unwind"
            );
        }
    }
}
