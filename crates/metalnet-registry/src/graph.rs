//! The resource graph and its dual-update helpers.
//!
//! Every relationship is stored on both ends. The helpers here are the only
//! code that writes relationship fields; each one checks every lookup it
//! needs before touching either end, so a failed helper leaves the graph as
//! it was.
//!
//! Helpers enforce structure (slot occupied, entity exists). Policy such as
//! "a switch with bound ports cannot be deleted" lives in the registry
//! operations.

use std::collections::BTreeSet;

use metalnet_types::{Channel, ChannelAssignment};

use crate::arena::{Arena, Id};
use crate::error::{RegistryError, RegistryResult};
use crate::model::{
    Attachment, Group, Headnode, Hnic, Network, Nic, Node, Port, Project, Switch, User,
};

/// All registry entities.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub users: Arena<User>,
    pub groups: Arena<Group>,
    pub projects: Arena<Project>,
    pub nodes: Arena<Node>,
    pub nics: Arena<Nic>,
    pub networks: Arena<Network>,
    pub switches: Arena<Switch>,
    pub ports: Arena<Port>,
    pub headnodes: Arena<Headnode>,
    pub hnics: Arena<Hnic>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // Lookups

    /// Port `label` of `switch`.
    pub fn port_id(&self, switch: Id<Switch>, label: &str) -> RegistryResult<Id<Port>> {
        let switch_label = &self.switches.at(switch)?.label;
        self.ports
            .find(&(switch, label.to_string()))
            .ok_or_else(|| RegistryError::not_found("port", format!("{switch_label}/{label}")))
    }

    /// Nic `label`, which must belong to `node`.
    pub fn nic_of(&self, node: Id<Node>, label: &str) -> RegistryResult<Id<Nic>> {
        let id = self.nics.require(label)?;
        if self.nics.at(id)?.node != node {
            let node_label = &self.nodes.at(node)?.label;
            return Err(RegistryError::not_found(
                "nic",
                format!("{node_label}/{label}"),
            ));
        }
        Ok(id)
    }

    /// Hnic `label`, which must belong to `headnode`.
    pub fn hnic_of(&self, headnode: Id<Headnode>, label: &str) -> RegistryResult<Id<Hnic>> {
        let id = self.hnics.require(label)?;
        if self.hnics.at(id)?.headnode != headnode {
            let headnode_label = &self.headnodes.at(headnode)?.label;
            return Err(RegistryError::not_found(
                "hnic",
                format!("{headnode_label}/{label}"),
            ));
        }
        Ok(id)
    }

    fn membership_label(&self, user: Id<User>, group: Id<Group>) -> RegistryResult<String> {
        Ok(format!(
            "{} in {}",
            self.users.at(user)?.label,
            self.groups.at(group)?.label
        ))
    }

    // User <-> Group

    pub fn add_membership(&mut self, user: Id<User>, group: Id<Group>) -> RegistryResult<()> {
        let label = self.membership_label(user, group)?;
        if self.users.at(user)?.groups.contains(&group) {
            return Err(RegistryError::duplicate("membership", label));
        }
        self.users.at_mut(user)?.groups.insert(group);
        self.groups.at_mut(group)?.users.insert(user);
        Ok(())
    }

    pub fn remove_membership(&mut self, user: Id<User>, group: Id<Group>) -> RegistryResult<()> {
        let label = self.membership_label(user, group)?;
        if !self.users.at(user)?.groups.contains(&group) {
            return Err(RegistryError::not_found("membership", label));
        }
        self.users.at_mut(user)?.groups.remove(&group);
        self.groups.at_mut(group)?.users.remove(&user);
        Ok(())
    }

    /// Removes a user and its memberships.
    pub fn remove_user(&mut self, user: Id<User>) -> RegistryResult<User> {
        let groups = self.users.at(user)?.groups.clone();
        for group in groups {
            self.groups.at_mut(group)?.users.remove(&user);
        }
        self.users
            .remove(user)
            .ok_or_else(|| RegistryError::not_found("user", format!("{user:?}")))
    }

    /// Removes a group and its memberships. The group must own no projects.
    pub fn remove_group(&mut self, group: Id<Group>) -> RegistryResult<Group> {
        let users = self.groups.at(group)?.users.clone();
        for user in users {
            self.users.at_mut(user)?.groups.remove(&group);
        }
        self.groups
            .remove(group)
            .ok_or_else(|| RegistryError::not_found("group", format!("{group:?}")))
    }

    // Group -> Project

    pub fn add_project(&mut self, project: Project) -> RegistryResult<Id<Project>> {
        let group = project.group;
        self.groups.at(group)?;
        let id = self.projects.insert(project)?;
        self.groups.at_mut(group)?.projects.insert(id);
        Ok(id)
    }

    /// Removes a project. It must have no nodes, networks or headnode.
    pub fn remove_project(&mut self, project: Id<Project>) -> RegistryResult<Project> {
        let group = self.projects.at(project)?.group;
        self.groups.at_mut(group)?.projects.remove(&project);
        self.projects
            .remove(project)
            .ok_or_else(|| RegistryError::not_found("project", format!("{project:?}")))
    }

    // Project <-> Node

    pub fn link_node(&mut self, project: Id<Project>, node: Id<Node>) -> RegistryResult<()> {
        self.projects.at(project)?;
        let entity = self.nodes.at(node)?;
        if entity.project.is_some() {
            return Err(RegistryError::duplicate(
                "project connection",
                entity.label.clone(),
            ));
        }
        self.nodes.at_mut(node)?.project = Some(project);
        self.projects.at_mut(project)?.nodes.insert(node);
        Ok(())
    }

    pub fn unlink_node(&mut self, project: Id<Project>, node: Id<Node>) -> RegistryResult<()> {
        let project_label = &self.projects.at(project)?.label;
        let entity = self.nodes.at(node)?;
        if entity.project != Some(project) {
            return Err(RegistryError::not_found(
                "project connection",
                format!("{} in {project_label}", entity.label),
            ));
        }
        self.nodes.at_mut(node)?.project = None;
        self.projects.at_mut(project)?.nodes.remove(&node);
        Ok(())
    }

    // Node -> Nic

    pub fn add_nic(&mut self, nic: Nic) -> RegistryResult<Id<Nic>> {
        let node = nic.node;
        self.nodes.at(node)?;
        let id = self.nics.insert(nic)?;
        self.nodes.at_mut(node)?.nics.insert(id);
        Ok(id)
    }

    /// Removes a nic. It must be unattached and unbound.
    pub fn remove_nic(&mut self, nic: Id<Nic>) -> RegistryResult<Nic> {
        let node = self.nics.at(nic)?.node;
        self.nodes.at_mut(node)?.nics.remove(&nic);
        self.nics
            .remove(nic)
            .ok_or_else(|| RegistryError::not_found("nic", format!("{nic:?}")))
    }

    /// Removes a node and its nics. The node must be free and no nic may be
    /// bound or attached.
    pub fn remove_node(&mut self, node: Id<Node>) -> RegistryResult<Node> {
        let nics = self.nodes.at(node)?.nics.clone();
        for nic in nics {
            self.nics.remove(nic);
        }
        self.nodes
            .remove(node)
            .ok_or_else(|| RegistryError::not_found("node", format!("{node:?}")))
    }

    // Project -> Network

    pub fn add_network(&mut self, network: Network) -> RegistryResult<Id<Network>> {
        let project = network.project;
        self.projects.at(project)?;
        let id = self.networks.insert(network)?;
        self.projects.at_mut(project)?.networks.insert(id);
        Ok(id)
    }

    /// Removes a network. Nothing may be attached to it.
    pub fn remove_network(&mut self, network: Id<Network>) -> RegistryResult<Network> {
        let project = self.networks.at(network)?.project;
        self.projects.at_mut(project)?.networks.remove(&network);
        self.networks
            .remove(network)
            .ok_or_else(|| RegistryError::not_found("network", format!("{network:?}")))
    }

    // Nic <-> Network

    pub fn attach_nic(
        &mut self,
        nic: Id<Nic>,
        network: Id<Network>,
        channel: Channel,
    ) -> RegistryResult<()> {
        self.networks.at(network)?;
        let entity = self.nics.at(nic)?;
        if entity.attachment.is_some() {
            return Err(RegistryError::duplicate(
                "network attachment",
                entity.label.clone(),
            ));
        }
        self.nics.at_mut(nic)?.attachment = Some(Attachment { network, channel });
        self.networks.at_mut(network)?.nics.insert(nic);
        Ok(())
    }

    pub fn detach_nic(&mut self, nic: Id<Nic>) -> RegistryResult<Attachment> {
        let entity = self.nics.at(nic)?;
        let attachment = entity
            .attachment
            .ok_or_else(|| RegistryError::not_found("network attachment", entity.label.clone()))?;
        self.networks.at(attachment.network)?;
        self.nics.at_mut(nic)?.attachment = None;
        self.networks.at_mut(attachment.network)?.nics.remove(&nic);
        Ok(attachment)
    }

    // Hnic <-> Network

    pub fn attach_hnic(&mut self, hnic: Id<Hnic>, network: Id<Network>) -> RegistryResult<()> {
        self.networks.at(network)?;
        let entity = self.hnics.at(hnic)?;
        if entity.attachment.is_some() {
            return Err(RegistryError::duplicate(
                "network attachment",
                entity.label.clone(),
            ));
        }
        self.hnics.at_mut(hnic)?.attachment = Some(Attachment {
            network,
            channel: Channel::Native,
        });
        self.networks.at_mut(network)?.hnics.insert(hnic);
        Ok(())
    }

    pub fn detach_hnic(&mut self, hnic: Id<Hnic>) -> RegistryResult<Attachment> {
        let entity = self.hnics.at(hnic)?;
        let attachment = entity
            .attachment
            .ok_or_else(|| RegistryError::not_found("network attachment", entity.label.clone()))?;
        self.networks.at(attachment.network)?;
        self.hnics.at_mut(hnic)?.attachment = None;
        self.networks.at_mut(attachment.network)?.hnics.remove(&hnic);
        Ok(attachment)
    }

    // Switch -> Port

    pub fn add_port(&mut self, port: Port) -> RegistryResult<Id<Port>> {
        let switch = port.switch;
        self.switches.at(switch)?;
        let id = self.ports.insert(port)?;
        self.switches.at_mut(switch)?.ports.insert(id);
        Ok(id)
    }

    /// Removes a port. It must be unbound.
    pub fn remove_port(&mut self, port: Id<Port>) -> RegistryResult<Port> {
        let switch = self.ports.at(port)?.switch;
        self.switches.at_mut(switch)?.ports.remove(&port);
        self.ports
            .remove(port)
            .ok_or_else(|| RegistryError::not_found("port", format!("{port:?}")))
    }

    /// Removes a switch and its ports. No port may be bound.
    pub fn remove_switch(&mut self, switch: Id<Switch>) -> RegistryResult<Switch> {
        let ports = self.switches.at(switch)?.ports.clone();
        for port in ports {
            self.ports.remove(port);
        }
        self.switches
            .remove(switch)
            .ok_or_else(|| RegistryError::not_found("switch", format!("{switch:?}")))
    }

    // Port <-> Nic

    pub fn bind_port(&mut self, port: Id<Port>, nic: Id<Nic>) -> RegistryResult<()> {
        let port_entity = self.ports.at(port)?;
        let nic_entity = self.nics.at(nic)?;
        if port_entity.nic.is_some() {
            return Err(RegistryError::duplicate(
                "port binding",
                port_entity.label.clone(),
            ));
        }
        if nic_entity.port.is_some() {
            return Err(RegistryError::duplicate(
                "port binding",
                nic_entity.label.clone(),
            ));
        }
        self.ports.at_mut(port)?.nic = Some(nic);
        self.nics.at_mut(nic)?.port = Some(port);
        Ok(())
    }

    pub fn unbind_port(&mut self, port: Id<Port>) -> RegistryResult<Id<Nic>> {
        let entity = self.ports.at(port)?;
        let nic = entity
            .nic
            .ok_or_else(|| RegistryError::not_found("port binding", entity.label.clone()))?;
        self.nics.at(nic)?;
        self.ports.at_mut(port)?.nic = None;
        self.nics.at_mut(nic)?.port = None;
        Ok(nic)
    }

    // Project -> Headnode -> Hnic

    /// Adds a headnode. Its project must not have one yet.
    pub fn add_headnode(&mut self, headnode: Headnode) -> RegistryResult<Id<Headnode>> {
        let project = self.projects.at(headnode.project)?;
        if project.headnode.is_some() {
            return Err(RegistryError::duplicate("headnode of", project.label.clone()));
        }
        let project = headnode.project;
        let id = self.headnodes.insert(headnode)?;
        self.projects.at_mut(project)?.headnode = Some(id);
        Ok(id)
    }

    /// Removes a headnode and its hnics. No hnic may be attached.
    pub fn remove_headnode(&mut self, headnode: Id<Headnode>) -> RegistryResult<Headnode> {
        let entity = self.headnodes.at(headnode)?;
        let project = entity.project;
        let hnics = entity.hnics.clone();
        for hnic in hnics {
            self.hnics.remove(hnic);
        }
        self.projects.at_mut(project)?.headnode = None;
        self.headnodes
            .remove(headnode)
            .ok_or_else(|| RegistryError::not_found("headnode", format!("{headnode:?}")))
    }

    pub fn add_hnic(&mut self, hnic: Hnic) -> RegistryResult<Id<Hnic>> {
        let headnode = hnic.headnode;
        self.headnodes.at(headnode)?;
        let id = self.hnics.insert(hnic)?;
        self.headnodes.at_mut(headnode)?.hnics.insert(id);
        Ok(id)
    }

    /// Removes an hnic. It must be unattached.
    pub fn remove_hnic(&mut self, hnic: Id<Hnic>) -> RegistryResult<Hnic> {
        let headnode = self.hnics.at(hnic)?.headnode;
        self.headnodes.at_mut(headnode)?.hnics.remove(&hnic);
        self.hnics
            .remove(hnic)
            .ok_or_else(|| RegistryError::not_found("hnic", format!("{hnic:?}")))
    }

    // Derived views

    /// Channel assignments the graph expects on `port`: the attachment of its
    /// bound nic, if any.
    pub fn intended_channels(&self, port: Id<Port>) -> RegistryResult<BTreeSet<ChannelAssignment>> {
        let mut channels = BTreeSet::new();
        let Some(nic) = self.ports.at(port)?.nic else {
            return Ok(channels);
        };
        if let Some(attachment) = self.nics.at(nic)?.attachment {
            let network = self.networks.at(attachment.network)?;
            channels.insert(ChannelAssignment {
                channel: attachment.channel,
                network: network.network_id,
            });
        }
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalnet_types::{MacAddress, VlanId};
    use pretty_assertions::assert_eq;

    fn mac() -> MacAddress {
        "de:ad:be:ef:20:14".parse().unwrap()
    }

    fn graph_with_project() -> (Graph, Id<Project>) {
        let mut graph = Graph::new();
        let group = graph
            .groups
            .insert(Group {
                label: "acme-code".to_string(),
                users: BTreeSet::new(),
                projects: BTreeSet::new(),
            })
            .unwrap();
        let project = graph
            .add_project(Project {
                label: "anvil-nextgen".to_string(),
                group,
                nodes: BTreeSet::new(),
                networks: BTreeSet::new(),
                headnode: None,
            })
            .unwrap();
        (graph, project)
    }

    fn add_node(graph: &mut Graph, label: &str) -> Id<Node> {
        graph
            .nodes
            .insert(Node {
                label: label.to_string(),
                nics: BTreeSet::new(),
                project: None,
            })
            .unwrap()
    }

    fn add_nic(graph: &mut Graph, node: Id<Node>, label: &str) -> Id<Nic> {
        graph
            .add_nic(Nic {
                label: label.to_string(),
                mac: mac(),
                node,
                attachment: None,
                port: None,
            })
            .unwrap()
    }

    #[test]
    fn test_membership_both_sides() {
        let mut graph = Graph::new();
        let user = graph.users.insert(User::new("alice", "secret")).unwrap();
        let group = graph
            .groups
            .insert(Group {
                label: "acme-corp".to_string(),
                users: BTreeSet::new(),
                projects: BTreeSet::new(),
            })
            .unwrap();

        graph.add_membership(user, group).unwrap();
        assert!(graph.users.at(user).unwrap().groups.contains(&group));
        assert!(graph.groups.at(group).unwrap().users.contains(&user));
        assert!(matches!(
            graph.add_membership(user, group),
            Err(RegistryError::Duplicate { .. })
        ));

        graph.remove_user(user).unwrap();
        assert!(graph.groups.at(group).unwrap().users.is_empty());
    }

    #[test]
    fn test_link_node_once() {
        let (mut graph, project) = graph_with_project();
        let node = add_node(&mut graph, "node-99");

        graph.link_node(project, node).unwrap();
        assert_eq!(graph.nodes.at(node).unwrap().project, Some(project));
        assert!(matches!(
            graph.link_node(project, node),
            Err(RegistryError::Duplicate { .. })
        ));

        graph.unlink_node(project, node).unwrap();
        assert!(graph.projects.at(project).unwrap().nodes.is_empty());
        assert!(matches!(
            graph.unlink_node(project, node),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_nic_of_wrong_node() {
        let mut graph = Graph::new();
        let owner = add_node(&mut graph, "compute-01");
        let other = add_node(&mut graph, "compute-02");
        add_nic(&mut graph, owner, "01-eth0");

        assert!(graph.nic_of(owner, "01-eth0").is_ok());
        assert_eq!(
            graph.nic_of(other, "01-eth0"),
            Err(RegistryError::not_found("nic", "compute-02/01-eth0"))
        );
    }

    #[test]
    fn test_attach_and_detach_nic() {
        let (mut graph, project) = graph_with_project();
        let node = add_node(&mut graph, "node-99");
        let nic = add_nic(&mut graph, node, "99-eth0");
        let network = graph
            .add_network(Network {
                label: "hammernet".to_string(),
                network_id: VlanId::new(100).unwrap(),
                project,
                nics: BTreeSet::new(),
                hnics: BTreeSet::new(),
            })
            .unwrap();

        graph.attach_nic(nic, network, Channel::Native).unwrap();
        assert!(graph.networks.at(network).unwrap().nics.contains(&nic));
        assert!(matches!(
            graph.attach_nic(nic, network, Channel::Native),
            Err(RegistryError::Duplicate { .. })
        ));

        let attachment = graph.detach_nic(nic).unwrap();
        assert_eq!(attachment.network, network);
        assert!(graph.networks.at(network).unwrap().nics.is_empty());
        assert!(graph.nics.at(nic).unwrap().attachment.is_none());
    }

    #[test]
    fn test_bind_port_exclusive() {
        let mut graph = Graph::new();
        let switch = graph
            .switches
            .insert(Switch {
                label: "bait-and".to_string(),
                vendor: "mock".to_string(),
                config: serde_json::json!({}),
                ports: BTreeSet::new(),
            })
            .unwrap();
        let port3 = graph
            .add_port(Port {
                switch,
                label: "3".to_string(),
                nic: None,
            })
            .unwrap();
        let port4 = graph
            .add_port(Port {
                switch,
                label: "4".to_string(),
                nic: None,
            })
            .unwrap();
        let node = add_node(&mut graph, "compute-01");
        let eth0 = add_nic(&mut graph, node, "eth0");
        let eth1 = add_nic(&mut graph, node, "eth1");

        graph.bind_port(port3, eth0).unwrap();
        assert!(graph.bind_port(port3, eth1).is_err());
        assert!(graph.bind_port(port4, eth0).is_err());
        assert_eq!(graph.ports.at(port4).unwrap().nic, None);
        assert_eq!(graph.nics.at(eth1).unwrap().port, None);

        assert_eq!(graph.unbind_port(port3).unwrap(), eth0);
        assert_eq!(graph.nics.at(eth0).unwrap().port, None);
        assert!(graph.unbind_port(port3).is_err());
    }

    #[test]
    fn test_one_headnode_per_project() {
        let (mut graph, project) = graph_with_project();
        let headnode = |label: &str| Headnode {
            label: label.to_string(),
            project,
            hnics: BTreeSet::new(),
        };
        let hn0 = graph.add_headnode(headnode("hn-0")).unwrap();
        assert!(graph.add_headnode(headnode("hn-1")).is_err());
        assert!(graph.headnodes.find("hn-1").is_none());

        graph.remove_headnode(hn0).unwrap();
        assert_eq!(graph.projects.at(project).unwrap().headnode, None);
        graph.add_headnode(headnode("hn-1")).unwrap();
    }
}
