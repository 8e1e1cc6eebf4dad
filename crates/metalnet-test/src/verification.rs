//! Verification helpers for registry tests
//!
//! [`GraphVerifier`] checks that both ends of every relationship agree and
//! that network identifiers are unique. [`FabricVerifier`] checks the mock
//! switch state against expected channel assignments.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use metalnet_registry::{Arena, Graph, Id, Keyed};
use metalnet_switch::{MockCall, MockFabric};
use metalnet_types::{ChannelAssignment, VlanId};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("{kind} {label}: {relation} points at a missing entity {target}")]
    DanglingLink {
        kind: &'static str,
        label: String,
        relation: &'static str,
        target: String,
    },

    #[error("{kind} {label}: {relation} is not mirrored by the other side")]
    OneSidedLink {
        kind: &'static str,
        label: String,
        relation: &'static str,
    },

    #[error("Network id {id} is used by both {first} and {second}")]
    DuplicateNetworkId {
        id: VlanId,
        first: String,
        second: String,
    },

    #[error("Nic {nic} is attached to {network} outside its node's project")]
    ForeignAttachment { nic: String, network: String },

    #[error("Port {switch}/{port}: expected {expected:?}, switch has {actual:?}")]
    PortMismatch {
        switch: String,
        port: String,
        expected: Vec<ChannelAssignment>,
        actual: Vec<ChannelAssignment>,
    },

    #[error("Expected {expected} switch calls, found {actual}")]
    CallCountMismatch { expected: usize, actual: usize },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

fn lookup<'g, T: Keyed>(
    arena: &'g Arena<T>,
    id: Id<T>,
    from_kind: &'static str,
    from_label: &str,
    relation: &'static str,
) -> VerifyResult<&'g T> {
    arena.get(id).ok_or_else(|| VerificationError::DanglingLink {
        kind: from_kind,
        label: from_label.to_string(),
        relation,
        target: format!("{}{id:?}", T::KIND),
    })
}

fn mirrored(holds: bool, kind: &'static str, label: &str, relation: &'static str) -> VerifyResult<()> {
    if holds {
        Ok(())
    } else {
        Err(VerificationError::OneSidedLink {
            kind,
            label: label.to_string(),
            relation,
        })
    }
}

/// Relationship invariant checker over a graph snapshot
pub struct GraphVerifier<'a> {
    graph: &'a Graph,
}

impl<'a> GraphVerifier<'a> {
    /// Create a verifier over `graph`
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph }
    }

    /// Run every check
    pub fn verify_all(&self) -> VerifyResult<()> {
        self.verify_memberships()?;
        self.verify_projects()?;
        self.verify_nodes_and_nics()?;
        self.verify_network_attachments()?;
        self.verify_port_bindings()?;
        self.verify_headnodes()?;
        self.verify_unique_network_ids()?;
        Ok(())
    }

    /// User.groups and Group.users agree
    pub fn verify_memberships(&self) -> VerifyResult<()> {
        let g = self.graph;
        for (user_id, user) in g.users.iter() {
            for group in &user.groups {
                let group = lookup(&g.groups, *group, "user", &user.label, "groups")?;
                mirrored(group.users.contains(&user_id), "user", &user.label, "groups")?;
            }
        }
        for (group_id, group) in g.groups.iter() {
            for user in &group.users {
                let user = lookup(&g.users, *user, "group", &group.label, "users")?;
                mirrored(user.groups.contains(&group_id), "group", &group.label, "users")?;
            }
        }
        Ok(())
    }

    /// Project.group/Group.projects and Project.nodes/Node.project agree
    pub fn verify_projects(&self) -> VerifyResult<()> {
        let g = self.graph;
        for (project_id, project) in g.projects.iter() {
            let group = lookup(&g.groups, project.group, "project", &project.label, "group")?;
            mirrored(
                group.projects.contains(&project_id),
                "project",
                &project.label,
                "group",
            )?;
            for node in &project.nodes {
                let node = lookup(&g.nodes, *node, "project", &project.label, "nodes")?;
                mirrored(node.project == Some(project_id), "project", &project.label, "nodes")?;
            }
            for network in &project.networks {
                let network = lookup(&g.networks, *network, "project", &project.label, "networks")?;
                mirrored(network.project == project_id, "project", &project.label, "networks")?;
            }
        }
        for (node_id, node) in g.nodes.iter() {
            if let Some(project) = node.project {
                let project = lookup(&g.projects, project, "node", &node.label, "project")?;
                mirrored(project.nodes.contains(&node_id), "node", &node.label, "project")?;
            }
        }
        Ok(())
    }

    /// Node.nics and Nic.node agree
    pub fn verify_nodes_and_nics(&self) -> VerifyResult<()> {
        let g = self.graph;
        for (node_id, node) in g.nodes.iter() {
            for nic in &node.nics {
                let nic = lookup(&g.nics, *nic, "node", &node.label, "nics")?;
                mirrored(nic.node == node_id, "node", &node.label, "nics")?;
            }
        }
        for (nic_id, nic) in g.nics.iter() {
            let node = lookup(&g.nodes, nic.node, "nic", &nic.label, "node")?;
            mirrored(node.nics.contains(&nic_id), "nic", &nic.label, "node")?;
        }
        Ok(())
    }

    /// Nic/Hnic attachments and Network.nics/hnics agree, and every attached
    /// nic's node belongs to the network's project
    pub fn verify_network_attachments(&self) -> VerifyResult<()> {
        let g = self.graph;
        for (nic_id, nic) in g.nics.iter() {
            let Some(attachment) = nic.attachment else {
                continue;
            };
            let network = lookup(&g.networks, attachment.network, "nic", &nic.label, "network")?;
            mirrored(network.nics.contains(&nic_id), "nic", &nic.label, "network")?;
            let node = lookup(&g.nodes, nic.node, "nic", &nic.label, "node")?;
            if node.project != Some(network.project) {
                return Err(VerificationError::ForeignAttachment {
                    nic: nic.label.clone(),
                    network: network.label.clone(),
                });
            }
        }
        for (hnic_id, hnic) in g.hnics.iter() {
            if let Some(attachment) = hnic.attachment {
                let network =
                    lookup(&g.networks, attachment.network, "hnic", &hnic.label, "network")?;
                mirrored(network.hnics.contains(&hnic_id), "hnic", &hnic.label, "network")?;
            }
        }
        for (network_id, network) in g.networks.iter() {
            for nic in &network.nics {
                let nic = lookup(&g.nics, *nic, "network", &network.label, "nics")?;
                mirrored(
                    nic.attachment.map(|a| a.network) == Some(network_id),
                    "network",
                    &network.label,
                    "nics",
                )?;
            }
            for hnic in &network.hnics {
                let hnic = lookup(&g.hnics, *hnic, "network", &network.label, "hnics")?;
                mirrored(
                    hnic.attachment.map(|a| a.network) == Some(network_id),
                    "network",
                    &network.label,
                    "hnics",
                )?;
            }
        }
        Ok(())
    }

    /// Switch.ports/Port.switch and Port.nic/Nic.port agree
    pub fn verify_port_bindings(&self) -> VerifyResult<()> {
        let g = self.graph;
        for (switch_id, switch) in g.switches.iter() {
            for port in &switch.ports {
                let port = lookup(&g.ports, *port, "switch", &switch.label, "ports")?;
                mirrored(port.switch == switch_id, "switch", &switch.label, "ports")?;
            }
        }
        for (port_id, port) in g.ports.iter() {
            let switch = lookup(&g.switches, port.switch, "port", &port.label, "switch")?;
            mirrored(switch.ports.contains(&port_id), "port", &port.label, "switch")?;
            if let Some(nic) = port.nic {
                let nic = lookup(&g.nics, nic, "port", &port.label, "nic")?;
                mirrored(nic.port == Some(port_id), "port", &port.label, "nic")?;
            }
        }
        for (nic_id, nic) in g.nics.iter() {
            if let Some(port) = nic.port {
                let port = lookup(&g.ports, port, "nic", &nic.label, "port")?;
                mirrored(port.nic == Some(nic_id), "nic", &nic.label, "port")?;
            }
        }
        Ok(())
    }

    /// Project.headnode/Headnode.project and Headnode.hnics/Hnic.headnode agree
    pub fn verify_headnodes(&self) -> VerifyResult<()> {
        let g = self.graph;
        for (headnode_id, headnode) in g.headnodes.iter() {
            let project =
                lookup(&g.projects, headnode.project, "headnode", &headnode.label, "project")?;
            mirrored(
                project.headnode == Some(headnode_id),
                "headnode",
                &headnode.label,
                "project",
            )?;
            for hnic in &headnode.hnics {
                let hnic = lookup(&g.hnics, *hnic, "headnode", &headnode.label, "hnics")?;
                mirrored(hnic.headnode == headnode_id, "headnode", &headnode.label, "hnics")?;
            }
        }
        for (hnic_id, hnic) in g.hnics.iter() {
            let headnode = lookup(&g.headnodes, hnic.headnode, "hnic", &hnic.label, "headnode")?;
            mirrored(headnode.hnics.contains(&hnic_id), "hnic", &hnic.label, "headnode")?;
        }
        Ok(())
    }

    /// No two networks share an identifier
    pub fn verify_unique_network_ids(&self) -> VerifyResult<()> {
        let mut seen: BTreeMap<VlanId, &str> = BTreeMap::new();
        for (_, network) in self.graph.networks.iter() {
            if let Some(first) = seen.insert(network.network_id, &network.label) {
                return Err(VerificationError::DuplicateNetworkId {
                    id: network.network_id,
                    first: first.to_string(),
                    second: network.label.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Mock switch state checker
pub struct FabricVerifier<'a> {
    fabric: &'a MockFabric,
}

impl<'a> FabricVerifier<'a> {
    pub fn new(fabric: &'a MockFabric) -> Self {
        Self { fabric }
    }

    /// Verify the exact set of channels active on a port
    pub fn assert_port_channels(
        &self,
        switch: &str,
        port: &str,
        expected: &[ChannelAssignment],
    ) -> VerifyResult<()> {
        let actual = self.fabric.port(switch, port).assignments();
        let expected: BTreeSet<ChannelAssignment> = expected.iter().copied().collect();
        if actual == expected {
            Ok(())
        } else {
            Err(VerificationError::PortMismatch {
                switch: switch.to_string(),
                port: port.to_string(),
                expected: expected.into_iter().collect(),
                actual: actual.into_iter().collect(),
            })
        }
    }

    /// Verify a port carries no VLAN membership
    pub fn assert_port_clean(&self, switch: &str, port: &str) -> VerifyResult<()> {
        self.assert_port_channels(switch, port, &[])
    }

    /// Verify the number of modify/revert/query calls made so far
    pub fn assert_call_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.fabric.calls().len();
        if actual != expected {
            return Err(VerificationError::CallCountMismatch { expected, actual });
        }
        Ok(())
    }

    /// Calls made since the first `skip`
    pub fn calls_after(&self, skip: usize) -> Vec<MockCall> {
        self.fabric.calls().into_iter().skip(skip).collect()
    }
}
