//! Network identifier (802.1Q VLAN id).

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The identifier the allocator hands to a Network at creation time.
///
/// Tenant networks are realised as 802.1Q VLANs, so the identifier is a
/// VLAN id in 1-4094. VLAN 1 is the switch default VLAN and is never
/// handed out by the pool.
///
/// # Examples
///
/// ```
/// use metalnet_types::VlanId;
///
/// let vlan = VlanId::new(52).unwrap();
/// assert_eq!(vlan.get(), 52);
/// assert!(VlanId::new(0).is_err());
/// assert!(VlanId::new(4095).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4094;

    /// Switch default VLAN.
    pub const DEFAULT: VlanId = VlanId(1);

    /// # Errors
    ///
    /// Returns an error if `id` is outside 1-4094.
    pub const fn new(id: u16) -> Result<Self, ParseError> {
        if id >= Self::MIN && id <= Self::MAX {
            Ok(VlanId(id))
        } else {
            Err(ParseError::InvalidVlanId(id as u32))
        }
    }

    pub const fn get(&self) -> u16 {
        self.0
    }

    pub const fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VlanId {
    type Err = ParseError;

    /// Accepts plain decimal text only (no sign, no prefix).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidVlanText(s.to_string()));
        }
        let id: u32 = s
            .parse()
            .map_err(|_| ParseError::InvalidVlanText(s.to_string()))?;
        let id = u16::try_from(id).map_err(|_| ParseError::InvalidVlanId(id))?;
        VlanId::new(id)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        VlanId::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(vlan: VlanId) -> u16 {
        vlan.0
    }
}
