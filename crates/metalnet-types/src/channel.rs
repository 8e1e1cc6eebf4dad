//! Channels: the abstract (native | tagged) VLAN binding on a switch port.

use crate::{ParseError, VlanId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const PREFIX: &str = "vlan/";
const NATIVE: &str = "native";

/// A channel on a physical port.
///
/// Textual form is `vlan/native` or `vlan/<id>`.
///
/// ```
/// use metalnet_types::{Channel, VlanId};
///
/// assert_eq!("vlan/native".parse::<Channel>().unwrap(), Channel::Native);
/// assert_eq!(
///     "vlan/52".parse::<Channel>().unwrap(),
///     Channel::Tagged(VlanId::new(52).unwrap())
/// );
/// assert!("vlan/0".parse::<Channel>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Channel {
    /// Untagged frames.
    Native,
    /// Frames carrying this VLAN tag (trunk membership).
    Tagged(VlanId),
}

impl Channel {
    pub fn is_native(&self) -> bool {
        matches!(self, Channel::Native)
    }

    /// The VLAN named by a tagged channel.
    pub fn tag(&self) -> Option<VlanId> {
        match self {
            Channel::Native => None,
            Channel::Tagged(vlan) => Some(*vlan),
        }
    }

    /// Whether this channel may carry `network`. A tagged channel only
    /// carries the network whose identifier it names.
    pub fn carries(&self, network: VlanId) -> bool {
        match self {
            Channel::Native => true,
            Channel::Tagged(vlan) => *vlan == network,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Native => write!(f, "{PREFIX}{NATIVE}"),
            Channel::Tagged(vlan) => write!(f, "{PREFIX}{vlan}"),
        }
    }
}

impl FromStr for Channel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(PREFIX)
            .ok_or_else(|| ParseError::InvalidChannel(s.to_string()))?;
        if rest == NATIVE {
            return Ok(Channel::Native);
        }
        rest.parse::<VlanId>()
            .map(Channel::Tagged)
            .map_err(|_| ParseError::InvalidChannel(s.to_string()))
    }
}

impl TryFrom<String> for Channel {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> String {
        channel.to_string()
    }
}

/// One active (channel, network) pair on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelAssignment {
    pub channel: Channel,
    pub network: VlanId,
}

impl ChannelAssignment {
    pub fn native(network: VlanId) -> Self {
        Self {
            channel: Channel::Native,
            network,
        }
    }

    pub fn tagged(network: VlanId) -> Self {
        Self {
            channel: Channel::Tagged(network),
            network,
        }
    }
}

impl fmt::Display for ChannelAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.channel, self.network)
    }
}
