//! Test fixtures for registry scenarios
//!
//! Provides a registry wired to in-memory switches plus reusable tenant
//! layouts

use std::sync::Arc;

use metalnet_registry::{
    builtin_drivers, FabricController, Registry, RegistryResult, VlanPool,
};
use metalnet_switch::transport::RecordingTransport;
use metalnet_switch::MockFabric;
use metalnet_types::MacAddress;
use serde_json::json;

/// Network identifier pool used by [`RegistryFixture::new`]
pub const DEFAULT_POOL: &str = "100-199";

/// A registry whose switches are either `mock` (backed by [`MockFabric`]) or
/// `dellnos9` (backed by a [`RecordingTransport`])
pub struct RegistryFixture {
    pub registry: Registry,
    pub fabric: MockFabric,
    pub transport: Arc<RecordingTransport>,
}

impl RegistryFixture {
    /// Fixture with the [`DEFAULT_POOL`]
    pub fn new() -> Self {
        Self::with_pool(DEFAULT_POOL)
    }

    /// Fixture with a custom VLAN pool
    ///
    /// # Panics
    ///
    /// Panics if `pool` is not a valid VLAN pool.
    pub fn with_pool(pool: &str) -> Self {
        let fabric = MockFabric::new();
        let transport = Arc::new(RecordingTransport::new());
        let drivers = builtin_drivers(transport.clone(), fabric.clone());
        let pool: VlanPool = pool.parse().expect("fixture pool must be valid");

        Self {
            registry: Registry::new(FabricController::new(drivers), Box::new(pool)),
            fabric,
            transport,
        }
    }

    /// Creates `group` and a `project` owned by it
    pub async fn tenant(&self, group: &str, project: &str) -> RegistryResult<()> {
        self.registry.group_create(group).await?;
        self.registry.project_create(project, group).await
    }

    /// Registers `node` with one nic per label
    pub async fn node_with_nics(&self, node: &str, nics: &[&str]) -> RegistryResult<()> {
        self.registry.node_register(node).await?;
        for (index, nic) in nics.iter().enumerate() {
            self.registry
                .node_register_nic(node, nic, fixture_mac(index))
                .await?;
        }
        Ok(())
    }

    /// Registers a node with nics and connects it to `project`
    pub async fn project_node(&self, project: &str, node: &str, nics: &[&str]) -> RegistryResult<()> {
        self.node_with_nics(node, nics).await?;
        self.registry.project_connect_node(project, node).await
    }

    /// Registers a `mock` switch with `ports`
    pub async fn mock_switch(&self, switch: &str, ports: &[&str]) -> RegistryResult<()> {
        self.registry.switch_register(switch, "mock", json!({})).await?;
        for port in ports {
            self.registry.port_register(switch, port).await?;
        }
        Ok(())
    }

    /// Registers a `dellnos9` switch with `ports`
    pub async fn dell_switch(&self, switch: &str, ports: &[&str]) -> RegistryResult<()> {
        self.registry
            .switch_register(switch, "dellnos9", dell_fixtures::switch_config())
            .await?;
        for port in ports {
            self.registry.port_register(switch, port).await?;
        }
        Ok(())
    }
}

impl Default for RegistryFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Locally administered MAC address distinct per `index`
pub fn fixture_mac(index: usize) -> MacAddress {
    MacAddress::new([0x02, 0x00, 0xde, 0xad, (index >> 8) as u8, index as u8])
}

/// Common Dell OS9 fixtures
pub mod dell_fixtures {
    use serde_json::{json, Value};

    pub const HOSTNAME: &str = "http://switch.example.com";

    /// Valid `dellnos9` switch configuration
    pub fn switch_config() -> Value {
        json!({
            "hostname": HOSTNAME,
            "username": "admin",
            "password": "hunter2",
            "interface_type": "GigabitEthernet",
        })
    }

    /// `show interfaces switchport` output for a port
    ///
    /// A port without native VLAN reports the default VLAN 1.
    pub fn switchport_output(native: Option<u16>, tagged: &[u16]) -> String {
        let native = native.unwrap_or(1);
        let mut output = format!("Vlan membership:\nQ       Vlans\nU       {native}\n");
        if !tagged.is_empty() {
            let tagged: Vec<String> = tagged.iter().map(u16::to_string).collect();
            output.push_str(&format!("T       {}\n", tagged.join(",")));
        }
        output.push_str(&format!("\nNative Vlan Id:         {native}.\n"));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_macs_distinct() {
        assert_ne!(fixture_mac(0), fixture_mac(1));
        assert_eq!(fixture_mac(1).to_string(), "02:00:de:ad:00:01");
    }

    #[test]
    fn test_switchport_output() {
        let output = dell_fixtures::switchport_output(Some(23), &[52, 53]);
        assert!(output.contains("T       52,53\n"));
        assert!(output.contains("Native Vlan Id:         23."));
        assert!(!dell_fixtures::switchport_output(None, &[]).contains("T  "));
    }
}
