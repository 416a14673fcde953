//! Common infrastructure for the FST manager components.
//!
//! - [`shell`]: Command template rendering and execution
//! - [`driver`]: The [`IfaceDriver`] seam through which managers program
//!   radio interfaces, plus the template based [`ShellDriver`]
//! - [`error`]: Error types shared by the components
//!
//! # Example
//!
//! ```ignore
//! use fst_mgr_common::{shell, FstMgrResult};
//!
//! async fn set_acl(iface: &str, acl: &str) -> FstMgrResult<()> {
//!     let cmd = shell::render_template(
//!         "hostapd_cli -i {iface} set accept_mac_file {acl}",
//!         &[("iface", iface), ("acl", acl)],
//!     )?;
//!     shell::run(&cmd).await?;
//!     Ok(())
//! }
//! ```

pub mod driver;
pub mod error;
pub mod shell;

pub use driver::{DriverTemplates, IfaceDriver, ShellDriver};
pub use error::{FstMgrError, FstMgrResult};
