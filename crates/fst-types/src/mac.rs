//! Peer station addresses.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 48-bit station MAC address.
///
/// Accepts `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff` in either case and
/// always displays lowercase colon form, the form ACL files use.
///
/// ```
/// use fst_types::MacAddress;
///
/// let mac: MacAddress = "AA-BB-CC-DD-EE-FF".parse().unwrap();
/// assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const LEN: usize = 6;

    /// Text length of the canonical form, `xx:xx:xx:xx:xx:xx`
    const TEXT_LEN: usize = Self::LEN * 3 - 1;

    pub const fn new(octets: [u8; Self::LEN]) -> Self {
        Self(octets)
    }

    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, octet) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{octet:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMacAddress(s.to_string());

        let text = s.as_bytes();
        if text.len() != Self::TEXT_LEN {
            return Err(invalid());
        }
        // Separators must agree; "aa:bb-cc..." is rejected
        let sep = text[2];
        if sep != b':' && sep != b'-' {
            return Err(invalid());
        }

        let mut octets = [0u8; Self::LEN];
        for (i, octet) in octets.iter_mut().enumerate() {
            let at = i * 3;
            if i > 0 && text[at - 1] != sep {
                return Err(invalid());
            }
            let pair = s.get(at..at + 2).ok_or_else(invalid)?;
            if !pair.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(addr: MacAddress) -> Self {
        addr.to_string()
    }
}
