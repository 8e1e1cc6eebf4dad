use std::collections::BTreeSet;

use metalnet_types::{Channel, MacAddress};
use tracing::{info, instrument};

use super::{PortTarget, Registry};
use crate::error::{RegistryError, RegistryResult};
use crate::model::{Nic, Node};

impl Registry {
    #[instrument(skip(self))]
    pub async fn node_register(&self, label: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        state.graph.nodes.insert(Node {
            label: label.to_string(),
            nics: BTreeSet::new(),
            project: None,
        })?;
        info!(node = label, "Node registered");
        Ok(())
    }

    /// Deletes a free node together with its nics. Refused while the node is
    /// connected to a project or any nic is bound to a port.
    #[instrument(skip(self))]
    pub async fn node_delete(&self, label: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;
        let node_id = graph.nodes.require(label)?;
        let node = graph.nodes.at(node_id)?;

        if let Some(project) = node.project {
            return Err(RegistryError::blocked(
                "node",
                label,
                format!("connected to project {}", graph.projects.at(project)?.label),
            ));
        }
        for nic in &node.nics {
            let nic = graph.nics.at(*nic)?;
            if nic.port.is_some() {
                return Err(RegistryError::blocked(
                    "node",
                    label,
                    format!("nic {} is bound to a port", nic.label),
                ));
            }
        }

        state.graph.remove_node(node_id)?;
        info!(node = label, "Node deleted");
        Ok(())
    }

    /// Adds a nic to `node`. Nic labels are unique across all nodes.
    #[instrument(skip(self))]
    pub async fn node_register_nic(
        &self,
        node: &str,
        nic: &str,
        mac: MacAddress,
    ) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let node_id = state.graph.nodes.require(node)?;
        state.graph.add_nic(Nic {
            label: nic.to_string(),
            mac,
            node: node_id,
            attachment: None,
            port: None,
        })?;
        info!(node, nic, %mac, "Nic registered");
        Ok(())
    }

    /// Deletes a nic of `node`. Refused while it is bound to a port or
    /// attached to a network.
    #[instrument(skip(self))]
    pub async fn node_delete_nic(&self, node: &str, nic: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;
        let node_id = graph.nodes.require(node)?;
        let nic_id = graph.nic_of(node_id, nic)?;
        let entity = graph.nics.at(nic_id)?;

        if entity.port.is_some() {
            return Err(RegistryError::blocked("nic", nic, "bound to a port"));
        }
        if let Some(attachment) = entity.attachment {
            return Err(RegistryError::blocked(
                "nic",
                nic,
                format!(
                    "attached to network {}",
                    graph.networks.at(attachment.network)?.label
                ),
            ));
        }

        state.graph.remove_nic(nic_id)?;
        info!(node, nic, "Nic deleted");
        Ok(())
    }

    /// Attaches a nic to a network of its node's project.
    ///
    /// `channel` defaults to the native channel; a tagged channel must name
    /// the network's own identifier. If the nic is bound to a port the switch
    /// is configured first, and the attachment is only recorded once the
    /// switch accepted it.
    #[instrument(skip(self))]
    pub async fn node_connect_network(
        &self,
        node: &str,
        nic: &str,
        network: &str,
        channel: Option<Channel>,
    ) -> RegistryResult<()> {
        let channel = channel.unwrap_or(Channel::Native);
        let mut state = self.state.write().await;
        let graph = &state.graph;

        let node_id = graph.nodes.require(node)?;
        let nic_id = graph.nic_of(node_id, nic)?;
        let network_id = graph.networks.require(network)?;
        let project = graph
            .nodes
            .at(node_id)?
            .project
            .ok_or_else(|| RegistryError::not_found("project connection", node))?;
        let target_network = graph.networks.at(network_id)?;
        if target_network.project != project {
            return Err(RegistryError::not_found(
                "network",
                format!("{network} in {}", graph.projects.at(project)?.label),
            ));
        }
        if graph.nics.at(nic_id)?.attachment.is_some() {
            return Err(RegistryError::duplicate("network attachment", nic));
        }
        let vlan = target_network.network_id;
        if !channel.carries(vlan) {
            return Err(RegistryError::bad_argument(format!(
                "channel {channel} cannot carry network {network} (id {vlan})"
            )));
        }

        if let Some(target) = PortTarget::of_nic(graph, nic_id)? {
            self.push_channel(&target, channel, Some(vlan)).await?;
        }

        state.graph.attach_nic(nic_id, network_id, channel)?;
        info!(node, nic, network, %channel, "Nic attached to network");
        Ok(())
    }

    /// Detaches a nic from its network, removing the channel from its port
    /// first if it is bound to one.
    #[instrument(skip(self))]
    pub async fn node_detach_network(&self, node: &str, nic: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;

        let node_id = graph.nodes.require(node)?;
        let nic_id = graph.nic_of(node_id, nic)?;
        let attachment = graph
            .nics
            .at(nic_id)?
            .attachment
            .ok_or_else(|| RegistryError::not_found("network attachment", nic))?;

        if let Some(target) = PortTarget::of_nic(graph, nic_id)? {
            self.push_channel(&target, attachment.channel, None).await?;
        }

        state.graph.detach_nic(nic_id)?;
        info!(node, nic, "Nic detached from network");
        Ok(())
    }
}
