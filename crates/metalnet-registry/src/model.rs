//! Entity records stored in the resource graph.
//!
//! Relationship fields hold [`Id`]s of the peer entity. Both sides of every
//! relationship are written together by [`Graph`](crate::graph::Graph); the
//! fields are public for reading but should only be mutated through it.

use std::collections::BTreeSet;
use std::fmt;

use metalnet_switch::SwitchConfig;
use metalnet_types::{Channel, ChannelAssignment, MacAddress, VlanId};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::arena::{Id, Keyed};

macro_rules! keyed_by_label {
    ($($entity:ty => $kind:literal),* $(,)?) => {
        $(
            impl Keyed for $entity {
                const KIND: &'static str = $kind;

                type Key = String;

                fn key(&self) -> String {
                    self.label.clone()
                }

                fn label(&self) -> &str {
                    &self.label
                }
            }
        )*
    };
}

/// An operator account.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub label: String,
    /// Random per-user salt mixed into the digest.
    pub salt: [u8; 16],
    /// Hex SHA-256 digest of salt and secret.
    pub secret_digest: String,
    pub groups: BTreeSet<Id<Group>>,
}

impl User {
    pub fn new(label: impl Into<String>, secret: &str) -> Self {
        let salt: [u8; 16] = rand::random();
        Self {
            label: label.into(),
            salt,
            secret_digest: digest_secret(&salt, secret),
            groups: BTreeSet::new(),
        }
    }

    /// Returns true if `secret` hashes to the stored digest.
    pub fn check_secret(&self, secret: &str) -> bool {
        self.secret_digest == digest_secret(&self.salt, secret)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("label", &self.label)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

fn digest_secret(salt: &[u8], secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub label: String,
    pub users: BTreeSet<Id<User>>,
    pub projects: BTreeSet<Id<Project>>,
}

/// A tenant. Owned by exactly one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub label: String,
    pub group: Id<Group>,
    pub nodes: BTreeSet<Id<Node>>,
    pub networks: BTreeSet<Id<Network>>,
    pub headnode: Option<Id<Headnode>>,
}

/// A physical compute node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub label: String,
    pub nics: BTreeSet<Id<Nic>>,
    pub project: Option<Id<Project>>,
}

/// The network side of a Nic or Hnic attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub network: Id<Network>,
    pub channel: Channel,
}

/// A network interface of a node. Labels are unique across all nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nic {
    pub label: String,
    pub mac: MacAddress,
    pub node: Id<Node>,
    pub attachment: Option<Attachment>,
    pub port: Option<Id<Port>>,
}

/// A tenant network carrying one allocated VLAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub label: String,
    pub network_id: VlanId,
    pub project: Id<Project>,
    pub nics: BTreeSet<Id<Nic>>,
    pub hnics: BTreeSet<Id<Hnic>>,
}

/// A managed switch.
#[derive(Clone, PartialEq)]
pub struct Switch {
    pub label: String,
    pub vendor: String,
    pub config: SwitchConfig,
    pub ports: BTreeSet<Id<Port>>,
}

impl fmt::Debug for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // config carries credentials
        f.debug_struct("Switch")
            .field("label", &self.label)
            .field("vendor", &self.vendor)
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}

/// A physical switch port. Its label is only unique within its switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub switch: Id<Switch>,
    pub label: String,
    pub nic: Option<Id<Nic>>,
}

impl Keyed for Port {
    const KIND: &'static str = "port";

    type Key = (Id<Switch>, String);

    fn key(&self) -> Self::Key {
        (self.switch, self.label.clone())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// The virtual head-of-project node. At most one per project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headnode {
    pub label: String,
    pub project: Id<Project>,
    pub hnics: BTreeSet<Id<Hnic>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hnic {
    pub label: String,
    pub mac: MacAddress,
    pub headnode: Id<Headnode>,
    pub attachment: Option<Attachment>,
}

keyed_by_label!(
    User => "user",
    Group => "group",
    Project => "project",
    Node => "node",
    Nic => "nic",
    Network => "network",
    Switch => "switch",
    Headnode => "headnode",
    Hnic => "hnic",
);

/// Read-only view returned by `show_node`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub name: String,
    pub free: bool,
    pub nics: Vec<String>,
}

/// Read-only view returned by `show_network`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub name: String,
    pub owner: String,
    pub network_id: VlanId,
    pub attached: Vec<String>,
}

/// Read-only view returned by `show_headnode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadnodeInfo {
    pub name: String,
    pub project: String,
    pub hnics: Vec<String>,
}

/// Read-only view returned by `show_switch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchInfo {
    pub name: String,
    pub vendor: String,
    pub ports: Vec<String>,
}

/// A difference between the graph's intended channels on a port and what the
/// switch reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "drift", rename_all = "snake_case")]
pub enum ChannelDrift {
    /// Intended by the graph, absent on the switch.
    Missing {
        port: String,
        assignment: ChannelAssignment,
    },
    /// Active on the switch, not intended by the graph.
    Unexpected {
        port: String,
        assignment: ChannelAssignment,
    },
}
