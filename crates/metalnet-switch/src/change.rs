//! Channel transition model.
//!
//! Every driver receives `(port, channel, network-or-none)` and must turn it
//! into exactly one of four transitions. Resolving the request here keeps the
//! tagged-channel agreement check in one place.

use std::collections::BTreeSet;

use metalnet_types::{Channel, ChannelAssignment, VlanId};
use serde::{Deserialize, Serialize};

use crate::error::{FabricError, FabricResult};

/// One channel transition on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelChange {
    /// Make `VlanId` the native VLAN, replacing any previous native VLAN.
    SetNative(VlanId),
    /// Drop the native assignment.
    ClearNative,
    /// Add a tagged membership (promotes the port to trunk mode).
    AddTagged(VlanId),
    /// Drop a tagged membership. Trunk mode is kept.
    RemoveTagged(VlanId),
}

impl ChannelChange {
    /// Resolves a `modify_channel` request.
    ///
    /// # Errors
    ///
    /// `ChannelMismatch` when a tagged channel is paired with a different
    /// network identifier.
    pub fn resolve(channel: Channel, network: Option<VlanId>) -> FabricResult<Self> {
        match (channel, network) {
            (Channel::Native, Some(vlan)) => Ok(ChannelChange::SetNative(vlan)),
            (Channel::Native, None) => Ok(ChannelChange::ClearNative),
            (Channel::Tagged(tag), None) => Ok(ChannelChange::RemoveTagged(tag)),
            (Channel::Tagged(tag), Some(vlan)) if tag == vlan => Ok(ChannelChange::AddTagged(tag)),
            (Channel::Tagged(_), Some(vlan)) => Err(FabricError::ChannelMismatch {
                channel,
                network: vlan,
            }),
        }
    }

    /// Returns true if `current` already reflects this transition.
    pub fn is_applied(&self, current: &BTreeSet<ChannelAssignment>) -> bool {
        let native = current
            .iter()
            .find(|a| a.channel.is_native())
            .map(|a| a.network);
        match self {
            ChannelChange::SetNative(vlan) => native == Some(*vlan),
            ChannelChange::ClearNative => native.is_none(),
            ChannelChange::AddTagged(vlan) => current.contains(&ChannelAssignment::tagged(*vlan)),
            ChannelChange::RemoveTagged(vlan) => {
                !current.contains(&ChannelAssignment::tagged(*vlan))
            }
        }
    }
}

/// Logical state of one physical port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortState {
    pub native: Option<VlanId>,
    pub tagged: BTreeSet<VlanId>,
    /// Trunk (hybrid) mode. Set by the first tagged membership, cleared
    /// only by a reset.
    pub trunk: bool,
    pub admin_up: bool,
}

impl Default for PortState {
    fn default() -> Self {
        Self {
            native: None,
            tagged: BTreeSet::new(),
            trunk: false,
            admin_up: true,
        }
    }
}

impl PortState {
    pub fn apply(&mut self, change: ChannelChange) {
        match change {
            ChannelChange::SetNative(vlan) => self.native = Some(vlan),
            ChannelChange::ClearNative => self.native = None,
            ChannelChange::AddTagged(vlan) => {
                self.trunk = true;
                self.tagged.insert(vlan);
            }
            ChannelChange::RemoveTagged(vlan) => {
                self.tagged.remove(&vlan);
            }
        }
    }

    pub fn assignments(&self) -> BTreeSet<ChannelAssignment> {
        self.native
            .map(ChannelAssignment::native)
            .into_iter()
            .chain(self.tagged.iter().copied().map(ChannelAssignment::tagged))
            .collect()
    }

    pub fn has_memberships(&self) -> bool {
        self.native.is_some() || !self.tagged.is_empty()
    }
}
