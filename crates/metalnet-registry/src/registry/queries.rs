use std::collections::BTreeMap;

use metalnet_switch::PortChannels;
use tracing::{info, instrument, warn};

use super::Registry;
use crate::error::RegistryResult;
use crate::graph::Graph;
use crate::model::{ChannelDrift, HeadnodeInfo, NetworkInfo, NodeInfo, SwitchInfo};

impl Registry {
    /// Labels of nodes not connected to any project, sorted.
    pub async fn list_free_nodes(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut free: Vec<String> = state
            .graph
            .nodes
            .iter()
            .filter(|(_, node)| node.project.is_none())
            .map(|(_, node)| node.label.clone())
            .collect();
        free.sort();
        free
    }

    pub async fn show_node(&self, label: &str) -> RegistryResult<NodeInfo> {
        let state = self.state.read().await;
        let graph = &state.graph;
        let node = graph.nodes.at(graph.nodes.require(label)?)?;
        Ok(NodeInfo {
            name: node.label.clone(),
            free: node.project.is_none(),
            nics: graph.nics.labels(&node.nics),
        })
    }

    pub async fn list_project_nodes(&self, project: &str) -> RegistryResult<Vec<String>> {
        let state = self.state.read().await;
        let graph = &state.graph;
        let project = graph.projects.at(graph.projects.require(project)?)?;
        Ok(graph.nodes.labels(&project.nodes))
    }

    pub async fn list_project_networks(&self, project: &str) -> RegistryResult<Vec<String>> {
        let state = self.state.read().await;
        let graph = &state.graph;
        let project = graph.projects.at(graph.projects.require(project)?)?;
        Ok(graph.networks.labels(&project.networks))
    }

    /// Network details. `attached` lists nic and hnic labels together.
    pub async fn show_network(&self, label: &str) -> RegistryResult<NetworkInfo> {
        let state = self.state.read().await;
        let graph = &state.graph;
        let network = graph.networks.at(graph.networks.require(label)?)?;

        let mut attached = graph.nics.labels(&network.nics);
        attached.extend(graph.hnics.labels(&network.hnics));
        attached.sort();
        Ok(NetworkInfo {
            name: network.label.clone(),
            owner: graph.projects.at(network.project)?.label.clone(),
            network_id: network.network_id,
            attached,
        })
    }

    pub async fn show_headnode(&self, label: &str) -> RegistryResult<HeadnodeInfo> {
        let state = self.state.read().await;
        let graph = &state.graph;
        let headnode = graph.headnodes.at(graph.headnodes.require(label)?)?;
        Ok(HeadnodeInfo {
            name: headnode.label.clone(),
            project: graph.projects.at(headnode.project)?.label.clone(),
            hnics: graph.hnics.labels(&headnode.hnics),
        })
    }

    pub async fn list_switches(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut switches: Vec<String> = state
            .graph
            .switches
            .iter()
            .map(|(_, switch)| switch.label.clone())
            .collect();
        switches.sort();
        switches
    }

    pub async fn show_switch(&self, label: &str) -> RegistryResult<SwitchInfo> {
        let state = self.state.read().await;
        let graph = &state.graph;
        let switch = graph.switches.at(graph.switches.require(label)?)?;
        Ok(SwitchInfo {
            name: switch.label.clone(),
            vendor: switch.vendor.clone(),
            ports: graph.ports.labels(&switch.ports),
        })
    }

    pub async fn list_group_users(&self, group: &str) -> RegistryResult<Vec<String>> {
        let state = self.state.read().await;
        let graph = &state.graph;
        let group = graph.groups.at(graph.groups.require(group)?)?;
        Ok(graph.users.labels(&group.users))
    }

    pub async fn list_user_groups(&self, user: &str) -> RegistryResult<Vec<String>> {
        let state = self.state.read().await;
        let graph = &state.graph;
        let user = graph.users.at(graph.users.require(user)?)?;
        Ok(graph.groups.labels(&user.groups))
    }

    /// Reads the live channel assignments of registered ports of `switch`.
    #[instrument(skip(self))]
    pub async fn query_port_channels(
        &self,
        switch: &str,
        ports: &[String],
    ) -> RegistryResult<PortChannels> {
        let state = self.state.read().await;
        let graph = &state.graph;
        let switch_id = graph.switches.require(switch)?;
        for port in ports {
            graph.port_id(switch_id, port)?;
        }
        let switch = graph.switches.at(switch_id)?;
        Ok(self.controller.query(switch, ports).await?)
    }

    /// Compares every registered port of `switch` against the channels the
    /// graph intends for it.
    ///
    /// Returns one entry per assignment that is missing from the switch or
    /// present on it without a matching attachment, ordered by port.
    #[instrument(skip(self))]
    pub async fn audit_switch(&self, switch: &str) -> RegistryResult<Vec<ChannelDrift>> {
        let state = self.state.read().await;
        let graph = &state.graph;
        let switch_id = graph.switches.require(switch)?;
        let entity = graph.switches.at(switch_id)?;

        let mut intended = BTreeMap::new();
        for port in &entity.ports {
            let label = graph.ports.at(*port)?.label.clone();
            intended.insert(label, graph.intended_channels(*port)?);
        }
        let ports: Vec<String> = intended.keys().cloned().collect();
        let actual = self.controller.query(entity, &ports).await?;

        let mut drift = Vec::new();
        for (port, expected) in &intended {
            let reported = actual.get(port).cloned().unwrap_or_default();
            for assignment in expected.difference(&reported) {
                drift.push(ChannelDrift::Missing {
                    port: port.clone(),
                    assignment: *assignment,
                });
            }
            for assignment in reported.difference(expected) {
                drift.push(ChannelDrift::Unexpected {
                    port: port.clone(),
                    assignment: *assignment,
                });
            }
        }

        if drift.is_empty() {
            info!(switch, ports = ports.len(), "Switch matches the registry");
        } else {
            warn!(switch, drift = drift.len(), "Switch diverges from the registry");
        }
        Ok(drift)
    }

    /// Owned copy of the whole graph.
    pub async fn snapshot(&self) -> Graph {
        self.state.read().await.graph.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_registry;
    use super::*;
    use crate::error::RegistryError;
    use metalnet_switch::PortState;
    use metalnet_types::{ChannelAssignment, MacAddress, VlanId};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn mac() -> MacAddress {
        "de:ad:be:ef:20:14".parse().unwrap()
    }

    fn vlan(id: u16) -> VlanId {
        VlanId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_list_free_nodes_sorted() {
        let (registry, _) = test_registry();
        for node in ["robocop", "data", "master-control-program"] {
            registry.node_register(node).await.unwrap();
        }
        assert_eq!(
            registry.list_free_nodes().await,
            vec!["data", "master-control-program", "robocop"]
        );
    }

    #[tokio::test]
    async fn test_show_node() {
        let (registry, _) = test_registry();
        registry.node_register("robocop").await.unwrap();
        registry.node_register_nic("robocop", "wlan0", mac()).await.unwrap();
        registry.node_register_nic("robocop", "eth0", mac()).await.unwrap();

        let info = registry.show_node("robocop").await.unwrap();
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"name": "robocop", "free": true, "nics": ["eth0", "wlan0"]})
        );
        assert_eq!(
            registry.show_node("node-99").await,
            Err(RegistryError::not_found("node", "node-99"))
        );
    }

    #[tokio::test]
    async fn test_show_headnode() {
        let (registry, _) = test_registry();
        registry.group_create("acme-code").await.unwrap();
        registry.project_create("anvil-nextgen", "acme-code").await.unwrap();
        registry.headnode_create("hn-0", "anvil-nextgen").await.unwrap();
        assert_eq!(
            registry.show_headnode("hn-0").await.unwrap(),
            HeadnodeInfo {
                name: "hn-0".to_string(),
                project: "anvil-nextgen".to_string(),
                hnics: Vec::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_query_unknown_port() {
        let (registry, fabric) = test_registry();
        registry.switch_register("bait-and", "mock", json!({})).await.unwrap();
        registry.port_register("bait-and", "3").await.unwrap();

        assert_eq!(
            registry
                .query_port_channels("bait-and", &["4".to_string()])
                .await,
            Err(RegistryError::not_found("port", "bait-and/4"))
        );
        let channels = registry
            .query_port_channels("bait-and", &["3".to_string()])
            .await
            .unwrap();
        assert!(channels["3"].is_empty());
        assert_eq!(fabric.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_audit_reports_drift() {
        let (registry, fabric) = test_registry();
        registry.group_create("acme-code").await.unwrap();
        registry.project_create("anvil-nextgen", "acme-code").await.unwrap();
        registry.node_register("node-99").await.unwrap();
        registry.node_register_nic("node-99", "99-eth0", mac()).await.unwrap();
        registry.project_connect_node("anvil-nextgen", "node-99").await.unwrap();
        registry.network_create("hammernet", "anvil-nextgen").await.unwrap();
        registry.switch_register("bait-and", "mock", json!({})).await.unwrap();
        registry.port_register("bait-and", "3").await.unwrap();
        registry.port_register("bait-and", "4").await.unwrap();
        registry
            .port_connect_nic("bait-and", "3", "node-99", "99-eth0")
            .await
            .unwrap();
        registry
            .node_connect_network("node-99", "99-eth0", "hammernet", None)
            .await
            .unwrap();

        assert!(registry.audit_switch("bait-and").await.unwrap().is_empty());

        fabric.set_port("bait-and", "3", PortState::default());
        fabric.set_port(
            "bait-and",
            "4",
            PortState {
                native: Some(vlan(7)),
                ..PortState::default()
            },
        );

        assert_eq!(
            registry.audit_switch("bait-and").await.unwrap(),
            vec![
                ChannelDrift::Missing {
                    port: "3".to_string(),
                    assignment: ChannelAssignment::native(vlan(100)),
                },
                ChannelDrift::Unexpected {
                    port: "4".to_string(),
                    assignment: ChannelAssignment::native(vlan(7)),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let (registry, _) = test_registry();
        registry.node_register("data").await.unwrap();
        let snapshot = registry.snapshot().await;
        registry.node_register("robocop").await.unwrap();
        assert_eq!(snapshot.nodes.len(), 1);
    }
}
