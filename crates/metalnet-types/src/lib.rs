//! Value types shared by the metalnet control plane.
//!
//! - [`MacAddress`]: hardware address recorded on a Nic/Hnic
//! - [`VlanId`]: the allocated identifier of a tenant Network
//! - [`Channel`]: native or tagged VLAN binding on a switch port
//! - [`ChannelAssignment`]: an active (channel, network) pair

mod channel;
mod mac;
mod vlan;

pub use channel::{Channel, ChannelAssignment};
pub use mac::MacAddress;
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u32),

    #[error("invalid VLAN ID text: {0:?}")]
    InvalidVlanText(String),

    #[error("invalid channel: {0:?} (expected vlan/native or vlan/<id>)")]
    InvalidChannel(String),
}
