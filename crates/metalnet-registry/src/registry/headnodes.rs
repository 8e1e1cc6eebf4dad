use std::collections::BTreeSet;

use metalnet_types::MacAddress;
use tracing::{info, instrument};

use super::Registry;
use crate::error::{RegistryError, RegistryResult};
use crate::model::{Headnode, Hnic};

// Headnodes have no switch ports: nothing here reaches the fabric.

impl Registry {
    /// Creates the headnode of `project`. A project has at most one.
    #[instrument(skip(self))]
    pub async fn headnode_create(&self, label: &str, project: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let project_id = state.graph.projects.require(project)?;
        if state.graph.headnodes.find(label).is_some() {
            return Err(RegistryError::duplicate("headnode", label));
        }
        state.graph.add_headnode(Headnode {
            label: label.to_string(),
            project: project_id,
            hnics: BTreeSet::new(),
        })?;
        info!(headnode = label, project, "Headnode created");
        Ok(())
    }

    /// Deletes a headnode and its hnics. Refused while any hnic is attached.
    #[instrument(skip(self))]
    pub async fn headnode_delete(&self, label: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;
        let headnode_id = graph.headnodes.require(label)?;
        for hnic in &graph.headnodes.at(headnode_id)?.hnics {
            let hnic = graph.hnics.at(*hnic)?;
            if hnic.attachment.is_some() {
                return Err(RegistryError::blocked(
                    "headnode",
                    label,
                    format!("hnic {} is attached to a network", hnic.label),
                ));
            }
        }

        state.graph.remove_headnode(headnode_id)?;
        info!(headnode = label, "Headnode deleted");
        Ok(())
    }

    /// Adds an hnic. Hnic labels are unique across all headnodes.
    #[instrument(skip(self))]
    pub async fn headnode_create_hnic(
        &self,
        headnode: &str,
        hnic: &str,
        mac: MacAddress,
    ) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let headnode_id = state.graph.headnodes.require(headnode)?;
        state.graph.add_hnic(Hnic {
            label: hnic.to_string(),
            mac,
            headnode: headnode_id,
            attachment: None,
        })?;
        info!(headnode, hnic, %mac, "Hnic created");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn headnode_delete_hnic(&self, headnode: &str, hnic: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;
        let headnode_id = graph.headnodes.require(headnode)?;
        let hnic_id = graph.hnic_of(headnode_id, hnic)?;
        if let Some(attachment) = graph.hnics.at(hnic_id)?.attachment {
            return Err(RegistryError::blocked(
                "hnic",
                hnic,
                format!(
                    "attached to network {}",
                    graph.networks.at(attachment.network)?.label
                ),
            ));
        }

        state.graph.remove_hnic(hnic_id)?;
        info!(headnode, hnic, "Hnic deleted");
        Ok(())
    }

    /// Attaches an hnic, on the native channel, to a network of the
    /// headnode's project.
    #[instrument(skip(self))]
    pub async fn headnode_connect_network(
        &self,
        headnode: &str,
        hnic: &str,
        network: &str,
    ) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;
        let headnode_id = graph.headnodes.require(headnode)?;
        let hnic_id = graph.hnic_of(headnode_id, hnic)?;
        let network_id = graph.networks.require(network)?;

        let project = graph.headnodes.at(headnode_id)?.project;
        if graph.networks.at(network_id)?.project != project {
            return Err(RegistryError::not_found(
                "network",
                format!("{network} in {}", graph.projects.at(project)?.label),
            ));
        }
        if graph.hnics.at(hnic_id)?.attachment.is_some() {
            return Err(RegistryError::duplicate("network attachment", hnic));
        }

        state.graph.attach_hnic(hnic_id, network_id)?;
        info!(headnode, hnic, network, "Hnic attached to network");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn headnode_detach_network(&self, headnode: &str, hnic: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let headnode_id = state.graph.headnodes.require(headnode)?;
        let hnic_id = state.graph.hnic_of(headnode_id, hnic)?;
        state.graph.detach_hnic(hnic_id)?;
        info!(headnode, hnic, "Hnic detached from network");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_registry;
    use super::*;
    use pretty_assertions::assert_eq;

    fn mac() -> MacAddress {
        "de:ad:be:ef:20:14".parse().unwrap()
    }

    async fn two_projects(registry: &Registry) {
        registry.group_create("acme-code").await.unwrap();
        registry.project_create("anvil-nextgen", "acme-code").await.unwrap();
        registry.project_create("anvil-oldtimer", "acme-code").await.unwrap();
    }

    #[tokio::test]
    async fn test_one_headnode_per_project() {
        let (registry, _) = test_registry();
        two_projects(&registry).await;

        registry.headnode_create("hn-0", "anvil-nextgen").await.unwrap();
        assert_eq!(
            registry.headnode_create("hn-1", "anvil-nextgen").await,
            Err(RegistryError::duplicate("headnode of", "anvil-nextgen"))
        );
        assert_eq!(
            registry.headnode_create("hn-0", "anvil-oldtimer").await,
            Err(RegistryError::duplicate("headnode", "hn-0"))
        );
        assert_eq!(
            registry.headnode_create("hn-2", "anvil-future").await,
            Err(RegistryError::not_found("project", "anvil-future"))
        );
        registry.headnode_create("hn-1", "anvil-oldtimer").await.unwrap();
    }

    #[tokio::test]
    async fn test_hnic_lifecycle() {
        let (registry, fabric) = test_registry();
        two_projects(&registry).await;
        registry.headnode_create("hn-0", "anvil-nextgen").await.unwrap();
        registry.headnode_create("hn-1", "anvil-oldtimer").await.unwrap();
        registry.network_create("hammernet", "anvil-nextgen").await.unwrap();

        registry.headnode_create_hnic("hn-0", "storage", mac()).await.unwrap();
        assert_eq!(
            registry.headnode_create_hnic("hn-1", "storage", mac()).await,
            Err(RegistryError::duplicate("hnic", "storage"))
        );
        assert_eq!(
            registry.headnode_connect_network("hn-1", "storage", "hammernet").await,
            Err(RegistryError::not_found("hnic", "hn-1/storage"))
        );

        registry
            .headnode_connect_network("hn-0", "storage", "hammernet")
            .await
            .unwrap();
        assert_eq!(
            registry.headnode_connect_network("hn-0", "storage", "hammernet").await,
            Err(RegistryError::duplicate("network attachment", "storage"))
        );
        assert!(matches!(
            registry.headnode_delete_hnic("hn-0", "storage").await,
            Err(RegistryError::Blocked { .. })
        ));
        assert!(matches!(
            registry.headnode_delete("hn-0").await,
            Err(RegistryError::Blocked { .. })
        ));

        registry.headnode_detach_network("hn-0", "storage").await.unwrap();
        assert!(matches!(
            registry.headnode_detach_network("hn-0", "storage").await,
            Err(RegistryError::NotFound { .. })
        ));
        registry.headnode_delete_hnic("hn-0", "storage").await.unwrap();
        assert!(fabric.calls().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_network_not_found() {
        let (registry, _) = test_registry();
        two_projects(&registry).await;
        registry.headnode_create("hn-1", "anvil-oldtimer").await.unwrap();
        registry.headnode_create_hnic("hn-1", "hn-1-eth0", mac()).await.unwrap();
        registry.network_create("hammernet", "anvil-nextgen").await.unwrap();
        assert!(matches!(
            registry
                .headnode_connect_network("hn-1", "hn-1-eth0", "hammernet")
                .await,
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_hnics() {
        let (registry, _) = test_registry();
        two_projects(&registry).await;
        registry.headnode_create("hn-0", "anvil-nextgen").await.unwrap();
        registry.headnode_create_hnic("hn-0", "hn-0-eth0", mac()).await.unwrap();

        registry.headnode_delete("hn-0").await.unwrap();
        assert!(registry.show_headnode("hn-0").await.is_err());
        registry.headnode_create("hn-0", "anvil-nextgen").await.unwrap();
        registry.headnode_create_hnic("hn-0", "hn-0-eth0", mac()).await.unwrap();
        assert_eq!(
            registry.show_headnode("hn-0").await.unwrap().hnics,
            vec!["hn-0-eth0"]
        );
    }
}
