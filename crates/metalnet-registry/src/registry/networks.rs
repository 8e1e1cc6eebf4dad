use std::collections::BTreeSet;

use tracing::{info, instrument};

use super::Registry;
use crate::error::{RegistryError, RegistryResult};
use crate::model::Network;

impl Registry {
    /// Creates a network owned by `project` and allocates its identifier.
    ///
    /// The label and project are checked before the allocator is asked, so a
    /// rejected create never consumes an identifier.
    #[instrument(skip(self))]
    pub async fn network_create(&self, label: &str, project: &str) -> RegistryResult<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let project_id = state.graph.projects.require(project)?;
        if state.graph.networks.find(label).is_some() {
            return Err(RegistryError::duplicate("network", label));
        }

        let network_id = state.allocator.allocate()?;
        let created = state.graph.add_network(Network {
            label: label.to_string(),
            network_id,
            project: project_id,
            nics: BTreeSet::new(),
            hnics: BTreeSet::new(),
        });
        if let Err(e) = created {
            state.allocator.release(network_id);
            return Err(e);
        }

        info!(network = label, project, %network_id, "Network created");
        Ok(())
    }

    /// Deletes a network with nothing attached and releases its identifier.
    #[instrument(skip(self))]
    pub async fn network_delete(&self, label: &str) -> RegistryResult<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let network_id = state.graph.networks.require(label)?;
        let network = state.graph.networks.at(network_id)?;
        let attached = network.nics.len() + network.hnics.len();
        if attached > 0 {
            return Err(RegistryError::blocked(
                "network",
                label,
                format!("{attached} interface(s) still attached"),
            ));
        }

        let removed = state.graph.remove_network(network_id)?;
        state.allocator.release(removed.network_id);
        info!(network = label, network_id = %removed.network_id, "Network deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_registry;
    use crate::error::RegistryError;
    use metalnet_types::VlanId;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_identifiers_allocated_and_released() {
        let (registry, _) = test_registry();
        registry.group_create("acme-code").await.unwrap();
        registry.project_create("anvil-nextgen", "acme-code").await.unwrap();

        registry.network_create("hammernet", "anvil-nextgen").await.unwrap();
        registry.network_create("hammernet2", "anvil-nextgen").await.unwrap();
        let first = registry.show_network("hammernet").await.unwrap();
        assert_eq!(first.network_id, VlanId::new(100).unwrap());
        assert_eq!(first.owner, "anvil-nextgen");

        registry.network_delete("hammernet").await.unwrap();
        registry.network_create("hammernet3", "anvil-nextgen").await.unwrap();
        assert_eq!(
            registry.show_network("hammernet3").await.unwrap().network_id,
            VlanId::new(100).unwrap()
        );
        assert_eq!(
            registry.list_project_networks("anvil-nextgen").await.unwrap(),
            vec!["hammernet2", "hammernet3"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_does_not_consume_identifier() {
        let (registry, _) = test_registry();
        registry.group_create("acme-code").await.unwrap();
        registry.project_create("anvil-nextgen", "acme-code").await.unwrap();
        registry.network_create("hammernet", "anvil-nextgen").await.unwrap();

        assert_eq!(
            registry.network_create("hammernet", "anvil-nextgen").await,
            Err(RegistryError::duplicate("network", "hammernet"))
        );
        assert_eq!(
            registry.network_create("hammernet2", "anvil-oldtimer").await,
            Err(RegistryError::not_found("project", "anvil-oldtimer"))
        );
        registry.network_create("hammernet2", "anvil-nextgen").await.unwrap();
        assert_eq!(
            registry.show_network("hammernet2").await.unwrap().network_id,
            VlanId::new(101).unwrap()
        );
    }

    #[tokio::test]
    async fn test_pool_exhaustion() {
        let (registry, _) = test_registry();
        registry.group_create("acme-code").await.unwrap();
        registry.project_create("anvil-nextgen", "acme-code").await.unwrap();
        for i in 0..10 {
            registry
                .network_create(&format!("net-{i}"), "anvil-nextgen")
                .await
                .unwrap();
        }

        assert!(matches!(
            registry.network_create("net-10", "anvil-nextgen").await,
            Err(RegistryError::Allocation(_))
        ));
        assert_eq!(
            registry.list_project_networks("anvil-nextgen").await.unwrap().len(),
            10
        );
    }

    #[tokio::test]
    async fn test_delete_blocked_while_attached() {
        let (registry, _) = test_registry();
        registry.group_create("acme-code").await.unwrap();
        registry.project_create("anvil-nextgen", "acme-code").await.unwrap();
        registry.network_create("hammernet", "anvil-nextgen").await.unwrap();
        registry.headnode_create("hn-0", "anvil-nextgen").await.unwrap();
        registry
            .headnode_create_hnic("hn-0", "hn-0-eth0", "de:ad:be:ef:20:14".parse().unwrap())
            .await
            .unwrap();
        registry
            .headnode_connect_network("hn-0", "hn-0-eth0", "hammernet")
            .await
            .unwrap();

        assert!(matches!(
            registry.network_delete("hammernet").await,
            Err(RegistryError::Blocked { .. })
        ));
        registry
            .headnode_detach_network("hn-0", "hn-0-eth0")
            .await
            .unwrap();
        registry.network_delete("hammernet").await.unwrap();
        assert_eq!(
            registry.network_delete("hammernet").await,
            Err(RegistryError::not_found("network", "hammernet"))
        );
    }
}
