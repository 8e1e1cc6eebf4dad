//! Network fabric controller.
//!
//! Translates registry decisions into driver calls. The controller keeps no
//! state about ports; it only serializes access per switch and manages the
//! session lifecycle (open, command, close) of every call.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use metalnet_dellnos9::DellNos9Driver;
use metalnet_switch::{
    DriverRegistry, FabricResult, MockDriver, MockFabric, PortChannels, SwitchConfig,
    SwitchSession, Transport,
};
use metalnet_types::{Channel, ChannelAssignment, VlanId};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::model::Switch;

/// Driver registry with every built-in vendor: `dellnos9` over `transport`
/// and `mock` over `mock`.
pub fn builtin_drivers(transport: Arc<dyn Transport>, mock: MockFabric) -> DriverRegistry {
    DriverRegistry::new()
        .with(Arc::new(DellNos9Driver::new(transport)))
        .with(Arc::new(MockDriver::new(mock)))
}

struct OpenSession {
    switch: String,
    session: Box<dyn SwitchSession>,
    _guard: OwnedMutexGuard<()>,
}

pub struct FabricController {
    drivers: DriverRegistry,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FabricController {
    pub fn new(drivers: DriverRegistry) -> Self {
        Self {
            drivers,
            locks: DashMap::new(),
        }
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    /// Checks that `vendor` is registered and accepts `config`.
    pub fn validate_switch(&self, vendor: &str, config: &SwitchConfig) -> FabricResult<()> {
        self.drivers.get(vendor)?.validate(config)
    }

    pub fn validate_port_name(&self, vendor: &str, port: &str) -> FabricResult<()> {
        self.drivers.get(vendor)?.validate_port_name(port)
    }

    /// Drops the lock entry of a deleted switch.
    pub fn forget_switch(&self, switch: &str) {
        self.locks.remove(switch);
    }

    fn switch_lock(&self, switch: &str) -> Arc<Mutex<()>> {
        self.locks.entry(switch.to_string()).or_default().clone()
    }

    async fn open(&self, switch: &Switch) -> FabricResult<OpenSession> {
        let driver = self.drivers.get(&switch.vendor)?;
        let guard = self.switch_lock(&switch.label).lock_owned().await;

        let mut session = driver.session(&switch.label, &switch.config)?;
        session.open().await?;
        debug!(switch = %switch.label, vendor = %switch.vendor, "Switch session opened");

        Ok(OpenSession {
            switch: switch.label.clone(),
            session,
            _guard: guard,
        })
    }

    async fn finish<T>(mut open: OpenSession, result: FabricResult<T>) -> FabricResult<T> {
        if let Err(e) = open.session.close().await {
            warn!(switch = %open.switch, error = %e, "Failed to close switch session");
        }
        result
    }

    /// Applies one channel transition on `port`.
    #[instrument(skip(self, switch), fields(switch = %switch.label))]
    pub async fn set_channel(
        &self,
        switch: &Switch,
        port: &str,
        channel: Channel,
        network: Option<VlanId>,
    ) -> FabricResult<()> {
        let mut open = self.open(switch).await?;
        let result = open.session.modify_channel(port, channel, network).await;
        if result.is_ok() {
            info!(switch = %switch.label, port, %channel, ?network, "Port channel updated");
        }
        Self::finish(open, result).await
    }

    /// Strips `active` from `port`, then reverts it to factory defaults.
    #[instrument(skip(self, switch, active), fields(switch = %switch.label))]
    pub async fn reset_port(
        &self,
        switch: &Switch,
        port: &str,
        active: &BTreeSet<ChannelAssignment>,
    ) -> FabricResult<()> {
        let mut open = self.open(switch).await?;
        let result = async {
            for assignment in active {
                open.session
                    .modify_channel(port, assignment.channel, None)
                    .await?;
            }
            open.session.revert_port(port).await
        }
        .await;
        if result.is_ok() {
            info!(switch = %switch.label, port, stripped = active.len(), "Port reset");
        }
        Self::finish(open, result).await
    }

    /// Reads the live channel assignments of `ports`.
    #[instrument(skip(self, switch), fields(switch = %switch.label))]
    pub async fn query(&self, switch: &Switch, ports: &[String]) -> FabricResult<PortChannels> {
        let mut open = self.open(switch).await?;
        let result = open.session.query_port_channels(ports).await;
        Self::finish(open, result).await
    }
}

impl std::fmt::Debug for FabricController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FabricController")
            .field("drivers", &self.drivers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalnet_switch::transport::RecordingTransport;
    use metalnet_switch::{ChannelChange, FabricError, MockCall};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn vlan(id: u16) -> VlanId {
        VlanId::new(id).unwrap()
    }

    fn mock_switch() -> Switch {
        Switch {
            label: "bait-and".to_string(),
            vendor: "mock".to_string(),
            config: json!({}),
            ports: BTreeSet::new(),
        }
    }

    fn controller(fabric: &MockFabric) -> FabricController {
        FabricController::new(builtin_drivers(
            Arc::new(RecordingTransport::new()),
            fabric.clone(),
        ))
    }

    #[test]
    fn test_builtin_vendors() {
        let ctl = controller(&MockFabric::new());
        assert_eq!(ctl.drivers().vendors(), vec!["dellnos9", "mock"]);
        assert!(ctl.validate_switch("mock", &json!({})).is_ok());
        assert!(ctl.validate_switch("dellnos9", &json!({})).is_err());
        assert!(matches!(
            ctl.validate_switch("acme", &json!({})),
            Err(FabricError::UnknownVendor(_))
        ));
        assert!(ctl.validate_port_name("dellnos9", "1/3").is_ok());
        assert!(ctl.validate_port_name("dellnos9", "a/b").is_err());
    }

    #[tokio::test]
    async fn test_set_channel() {
        let fabric = MockFabric::new();
        controller(&fabric)
            .set_channel(&mock_switch(), "3", Channel::Native, Some(vlan(100)))
            .await
            .unwrap();
        assert_eq!(fabric.port("bait-and", "3").native, Some(vlan(100)));
    }

    #[tokio::test]
    async fn test_reset_port_strips_before_revert() {
        let fabric = MockFabric::new();
        let ctl = controller(&fabric);
        let switch = mock_switch();
        ctl.set_channel(&switch, "3", Channel::Tagged(vlan(52)), Some(vlan(52)))
            .await
            .unwrap();

        let active = BTreeSet::from([ChannelAssignment::tagged(vlan(52))]);
        ctl.reset_port(&switch, "3", &active).await.unwrap();

        let port = fabric.port("bait-and", "3");
        assert!(!port.has_memberships());
        assert!(!port.trunk);
        let calls = fabric.calls();
        assert_eq!(
            calls[1],
            MockCall::Modify {
                switch: "bait-and".to_string(),
                port: "3".to_string(),
                change: ChannelChange::RemoveTagged(vlan(52)),
            }
        );
        assert!(matches!(calls[2], MockCall::Revert { .. }));
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let fabric = MockFabric::new();
        fabric.fail_next(FabricError::Transport {
            url: "mock".to_string(),
            message: "unplugged".to_string(),
        });
        let result = controller(&fabric)
            .set_channel(&mock_switch(), "3", Channel::Native, Some(vlan(100)))
            .await;
        assert!(matches!(result, Err(FabricError::Transport { .. })));
        assert_eq!(fabric.port("bait-and", "3").native, None);
    }

    #[tokio::test]
    async fn test_calls_on_one_switch_are_serialized() {
        let fabric = MockFabric::new();
        let ctl = Arc::new(controller(&fabric));
        let switch = mock_switch();

        let tasks: Vec<_> = (100..110)
            .map(|id| {
                let ctl = ctl.clone();
                let switch = switch.clone();
                tokio::spawn(async move {
                    ctl.set_channel(&switch, "3", Channel::Tagged(vlan(id)), Some(vlan(id)))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(fabric.port("bait-and", "3").tagged.len(), 10);
    }
}
