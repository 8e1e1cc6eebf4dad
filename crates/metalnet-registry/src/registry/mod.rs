//! The resource registry.
//!
//! Every operation runs under one lock over the graph: mutations take the
//! write lock from their first lookup through any hardware call to the final
//! graph update, reads take the read lock. Operations validate every
//! precondition first, then call the controller, then commit. A failure at
//! any step returns before the graph is touched.
//!
//! Operations are grouped by the entity family they act on:
//!
//! - `users`: users, groups and memberships
//! - `projects`: projects and node connections
//! - `nodes`: nodes, nics and nic network attachment
//! - `networks`: networks and their identifiers
//! - `switches`: switches, ports and port bindings
//! - `headnodes`: headnodes, hnics and hnic network attachment
//! - `queries`: read-only views and fabric audit

mod headnodes;
mod networks;
mod nodes;
mod projects;
mod queries;
mod switches;
mod users;

use std::collections::BTreeSet;
use std::sync::Arc;

use metalnet_switch::{FabricError, HttpTransport, MockFabric};
use metalnet_types::{Channel, ChannelAssignment, VlanId};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::allocator::NetworkIdAllocator;
use crate::arena::Id;
use crate::config::RegistryConfig;
use crate::controller::{builtin_drivers, FabricController};
use crate::error::{RegistryError, RegistryResult};
use crate::graph::Graph;
use crate::model::{Nic, Port, Switch};

struct State {
    graph: Graph,
    allocator: Box<dyn NetworkIdAllocator>,
}

/// A switch port as the controller addresses it.
struct PortTarget {
    switch: Switch,
    port: String,
}

impl PortTarget {
    fn of_port(graph: &Graph, port: Id<Port>) -> RegistryResult<Self> {
        let entity = graph.ports.at(port)?;
        Ok(Self {
            switch: graph.switches.at(entity.switch)?.clone(),
            port: entity.label.clone(),
        })
    }

    /// The port `nic` is bound to, if any.
    fn of_nic(graph: &Graph, nic: Id<Nic>) -> RegistryResult<Option<Self>> {
        match graph.nics.at(nic)?.port {
            Some(port) => Self::of_port(graph, port).map(Some),
            None => Ok(None),
        }
    }
}

pub struct Registry {
    state: RwLock<State>,
    controller: FabricController,
}

impl Registry {
    pub fn new(controller: FabricController, allocator: Box<dyn NetworkIdAllocator>) -> Self {
        Self {
            state: RwLock::new(State {
                graph: Graph::new(),
                allocator,
            }),
            controller,
        }
    }

    /// Builds a registry with the configured VLAN pool and the built-in
    /// drivers over a real HTTP transport.
    pub fn from_config(config: &RegistryConfig) -> RegistryResult<Self> {
        config.validate()?;
        let pool = config.vlan_pool()?;
        let transport = HttpTransport::new(config.request_timeout())?;
        let drivers = builtin_drivers(Arc::new(transport), MockFabric::new());

        info!(
            vlan_pool = %pool,
            vendors = ?drivers.vendors(),
            "Registry initialized"
        );
        Ok(Self::new(FabricController::new(drivers), Box::new(pool)))
    }

    pub fn controller(&self) -> &FabricController {
        &self.controller
    }

    async fn push_channel(
        &self,
        target: &PortTarget,
        channel: Channel,
        network: Option<VlanId>,
    ) -> RegistryResult<()> {
        self.controller
            .set_channel(&target.switch, &target.port, channel, network)
            .await
            .map_err(|e| fabric_failure(target, e))
    }

    async fn reset_port(
        &self,
        target: &PortTarget,
        active: &BTreeSet<ChannelAssignment>,
    ) -> RegistryResult<()> {
        self.controller
            .reset_port(&target.switch, &target.port, active)
            .await
            .map_err(|e| fabric_failure(target, e))
    }
}

fn fabric_failure(target: &PortTarget, e: FabricError) -> RegistryError {
    error!(
        switch = %target.switch.label,
        port = %target.port,
        error = %e,
        "Switch call failed, graph left unchanged"
    );
    RegistryError::from(e)
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
fn test_registry() -> (Registry, MockFabric) {
    use crate::allocator::VlanPool;
    use metalnet_switch::transport::RecordingTransport;

    let fabric = MockFabric::new();
    let drivers = builtin_drivers(Arc::new(RecordingTransport::new()), fabric.clone());
    let pool: VlanPool = "100-109".parse().unwrap();
    (
        Registry::new(FabricController::new(drivers), Box::new(pool)),
        fabric,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, NetworkConfig};
    use metalnet_types::VlanId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_from_config_uses_configured_pool() {
        let config = RegistryConfig::from_toml_str(
            "[network]\nvlan_pool = \"300-301\"\n\n[fabric]\nrequest_timeout_secs = 5\n",
        )
        .unwrap();
        let registry = Registry::from_config(&config).unwrap();
        assert_eq!(
            registry.controller().drivers().vendors(),
            vec!["dellnos9", "mock"]
        );

        registry.group_create("acme-code").await.unwrap();
        registry.project_create("anvil-nextgen", "acme-code").await.unwrap();
        for network in ["hammernet", "sawnet"] {
            registry.network_create(network, "anvil-nextgen").await.unwrap();
        }
        assert_eq!(
            registry.show_network("hammernet").await.unwrap().network_id,
            VlanId::new(300).unwrap()
        );
        assert_eq!(
            registry.show_network("sawnet").await.unwrap().network_id,
            VlanId::new(301).unwrap()
        );
        assert!(matches!(
            registry.network_create("drillnet", "anvil-nextgen").await,
            Err(RegistryError::Allocation(_))
        ));

        registry.switch_register("bait-and", "mock", json!({})).await.unwrap();
    }

    #[test]
    fn test_from_config_rejects_invalid_pool() {
        let config = RegistryConfig {
            network: NetworkConfig {
                vlan_pool: "1-10".to_string(),
            },
            ..RegistryConfig::default()
        };
        assert!(matches!(
            Registry::from_config(&config),
            Err(RegistryError::Config(ConfigError::InvalidPool { .. }))
        ));
    }
}
