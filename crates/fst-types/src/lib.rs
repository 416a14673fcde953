//! Common types for the FST (fast session transfer) manager.
//!
//! This crate provides type-safe representations of the primitives shared
//! by the FST manager components:
//!
//! - [`MacAddress`]: 48-bit peer station addresses
//! - [`IfaceInfo`]: descriptor of a radio interface taking part in a group

mod iface;
mod mac;

pub use iface::IfaceInfo;
pub use mac::MacAddress;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid interface name: {0:?}")]
    InvalidIfaceName(String),
}
