//! Interface driver seam.
//!
//! Managers decide *when* an interface must be attached to a group or must
//! mirror a peer connection; an [`IfaceDriver`] carries the decision out.
//! Every call may fail independently and is expected to return quickly.

use async_trait::async_trait;
use fst_types::{IfaceInfo, MacAddress};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{FstMgrError, FstMgrResult};
use crate::shell;

/// Operations the rate upgrade manager needs from the interface layer.
#[async_trait]
pub trait IfaceDriver: Send {
    /// Attaches `iface` as a slave of `master`, optionally restricting
    /// admission to the MACs listed in `acl_fname`.
    async fn add_iface(
        &mut self,
        master: &str,
        iface: &IfaceInfo,
        acl_fname: Option<&Path>,
    ) -> FstMgrResult<()>;

    /// Detaches `iface` from its group.
    async fn del_iface(&mut self, iface: &IfaceInfo) -> FstMgrResult<()>;

    /// Mirrors the connection of `addr` on `master` onto `iface`.
    async fn dup_connection(
        &mut self,
        iface: &IfaceInfo,
        master: &str,
        addr: MacAddress,
        acl_fname: Option<&Path>,
    ) -> FstMgrResult<()>;

    /// Drops the mirrored connection state on `iface`.
    async fn dedup_connection(
        &mut self,
        iface: &IfaceInfo,
        acl_fname: Option<&Path>,
    ) -> FstMgrResult<()>;
}

/// Command templates used by [`ShellDriver`].
///
/// Placeholders: `{master}`, `{iface}`, `{acl}` and `{mac}`. An empty
/// template turns the operation into a successful no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverTemplates {
    #[serde(default)]
    pub add_iface: String,
    #[serde(default)]
    pub del_iface: String,
    #[serde(default)]
    pub dup_connection: String,
    #[serde(default)]
    pub dedup_connection: String,
}

impl DriverTemplates {
    /// Renders every template with sample values to catch unknown
    /// placeholders at startup instead of on the first peer event.
    pub fn validate(&self) -> FstMgrResult<()> {
        let sample = [
            ("master", "wlan0"),
            ("iface", "wlan1"),
            ("acl", "/tmp/acl"),
            ("mac", "00:00:00:00:00:00"),
        ];
        for (field, template) in self.entries() {
            shell::render_template(template, &sample)
                .map_err(|e| FstMgrError::invalid_config(format!("driver.{field}"), e.to_string()))?;
        }
        Ok(())
    }

    fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("add_iface", self.add_iface.as_str()),
            ("del_iface", self.del_iface.as_str()),
            ("dup_connection", self.dup_connection.as_str()),
            ("dedup_connection", self.dedup_connection.as_str()),
        ]
    }
}

/// Driver that programs interfaces by running rendered shell commands.
#[derive(Debug, Clone)]
pub struct ShellDriver {
    templates: DriverTemplates,
}

impl ShellDriver {
    pub fn new(templates: DriverTemplates) -> Self {
        Self { templates }
    }

    async fn run(
        &self,
        operation: &str,
        template: &str,
        iface: &IfaceInfo,
        vars: &[(&str, &str)],
    ) -> FstMgrResult<()> {
        if template.is_empty() {
            debug!(operation, iface = %iface, "No command configured, skipping");
            return Ok(());
        }

        let cmd = shell::render_template(template, vars)?;
        shell::run(&cmd)
            .await
            .map(|_| ())
            .map_err(|e| FstMgrError::driver(operation, iface.name.as_str(), e.to_string()))
    }
}

fn acl_str(acl_fname: Option<&Path>) -> String {
    acl_fname
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl IfaceDriver for ShellDriver {
    async fn add_iface(
        &mut self,
        master: &str,
        iface: &IfaceInfo,
        acl_fname: Option<&Path>,
    ) -> FstMgrResult<()> {
        let acl = acl_str(acl_fname);
        let vars = [("master", master), ("iface", iface.name.as_str()), ("acl", acl.as_str())];
        self.run("add_iface", &self.templates.add_iface, iface, &vars)
            .await
    }

    async fn del_iface(&mut self, iface: &IfaceInfo) -> FstMgrResult<()> {
        let vars = [("iface", iface.name.as_str())];
        self.run("del_iface", &self.templates.del_iface, iface, &vars)
            .await
    }

    async fn dup_connection(
        &mut self,
        iface: &IfaceInfo,
        master: &str,
        addr: MacAddress,
        acl_fname: Option<&Path>,
    ) -> FstMgrResult<()> {
        let acl = acl_str(acl_fname);
        let mac = addr.to_string();
        let vars = [
            ("master", master),
            ("iface", iface.name.as_str()),
            ("mac", mac.as_str()),
            ("acl", acl.as_str()),
        ];
        self.run("dup_connection", &self.templates.dup_connection, iface, &vars)
            .await
    }

    async fn dedup_connection(
        &mut self,
        iface: &IfaceInfo,
        acl_fname: Option<&Path>,
    ) -> FstMgrResult<()> {
        let acl = acl_str(acl_fname);
        let vars = [("iface", iface.name.as_str()), ("acl", acl.as_str())];
        self.run("dedup_connection", &self.templates.dedup_connection, iface, &vars)
            .await
    }
}
