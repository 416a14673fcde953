//! Integration test infrastructure for FST manager components
//!
//! Provides:
//! - A recording interface driver with failure injection
//! - Configuration fixtures for rate upgrade groups
//! - ACL file verification helpers

mod driver;
pub mod fixtures;
mod verification;

pub use driver::{DriverCall, RecordingDriver};
pub use fixtures::*;
pub use verification::*;
