//! In-memory switch driver (vendor `"mock"`).
//!
//! Port state lives in a shared [`MockFabric`] so it survives the
//! per-call sessions and can be inspected by tests. `revert_port` behaves
//! like the reference hardware: it resets admin and trunk state but leaves
//! VLAN memberships alone, so a caller that forgets to strip them first is
//! visible in the resulting state.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use metalnet_types::{Channel, VlanId};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::change::{ChannelChange, PortState};
use crate::driver::{PortChannels, SwitchConfig, SwitchDriver, SwitchSession};
use crate::error::{FabricError, FabricResult};

/// Vendor identifier of the mock driver.
pub const MOCK_VENDOR: &str = "mock";

/// A call observed by the mock fabric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Modify {
        switch: String,
        port: String,
        change: ChannelChange,
    },
    Revert {
        switch: String,
        port: String,
    },
    Query {
        switch: String,
        ports: Vec<String>,
    },
}

#[derive(Debug, Default)]
struct MockState {
    ports: BTreeMap<(String, String), PortState>,
    calls: Vec<MockCall>,
    fail_next: Option<FabricError>,
}

/// Shared state behind every mock session.
#[derive(Debug, Clone, Default)]
pub struct MockFabric {
    inner: Arc<Mutex<MockState>>,
}

impl MockFabric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a port; ports never touched report the default.
    pub fn port(&self, switch: &str, port: &str) -> PortState {
        self.inner
            .lock()
            .ports
            .get(&(switch.to_string(), port.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.inner.lock().calls.clone()
    }

    /// Makes the next modify/revert/query fail with `error`.
    pub fn fail_next(&self, error: FabricError) {
        self.inner.lock().fail_next = Some(error);
    }

    /// Overwrites a port's state, e.g. to simulate out-of-band changes.
    pub fn set_port(&self, switch: &str, port: &str, state: PortState) {
        self.inner
            .lock()
            .ports
            .insert((switch.to_string(), port.to_string()), state);
    }

    fn take_failure(&self) -> FabricResult<()> {
        match self.inner.lock().fail_next.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// The mock vendor variant.
#[derive(Debug, Clone)]
pub struct MockDriver {
    fabric: MockFabric,
}

impl MockDriver {
    pub fn new(fabric: MockFabric) -> Self {
        Self { fabric }
    }

    pub fn fabric(&self) -> &MockFabric {
        &self.fabric
    }
}

impl SwitchDriver for MockDriver {
    fn vendor(&self) -> &str {
        MOCK_VENDOR
    }

    fn validate(&self, config: &SwitchConfig) -> FabricResult<()> {
        if config.is_object() {
            Ok(())
        } else {
            Err(FabricError::invalid_config("<root>", "expected an object"))
        }
    }

    fn validate_port_name(&self, name: &str) -> FabricResult<()> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(FabricError::bad_argument(format!(
                "Invalid port name {name:?}: must be non-empty without whitespace"
            )));
        }
        Ok(())
    }

    fn session(&self, switch: &str, config: &SwitchConfig) -> FabricResult<Box<dyn SwitchSession>> {
        self.validate(config)?;
        Ok(Box::new(MockSession {
            switch: switch.to_string(),
            fabric: self.fabric.clone(),
        }))
    }
}

struct MockSession {
    switch: String,
    fabric: MockFabric,
}

#[async_trait]
impl SwitchSession for MockSession {
    async fn modify_channel(
        &mut self,
        port: &str,
        channel: Channel,
        network: Option<VlanId>,
    ) -> FabricResult<()> {
        let change = ChannelChange::resolve(channel, network)?;
        self.fabric.take_failure()?;

        let mut state = self.fabric.inner.lock();
        state.calls.push(MockCall::Modify {
            switch: self.switch.clone(),
            port: port.to_string(),
            change,
        });
        state
            .ports
            .entry((self.switch.clone(), port.to_string()))
            .or_default()
            .apply(change);
        debug!(switch = %self.switch, port, ?change, "Mock channel change applied");
        Ok(())
    }

    async fn revert_port(&mut self, port: &str) -> FabricResult<()> {
        self.fabric.take_failure()?;

        let mut state = self.fabric.inner.lock();
        state.calls.push(MockCall::Revert {
            switch: self.switch.clone(),
            port: port.to_string(),
        });
        let entry = state
            .ports
            .entry((self.switch.clone(), port.to_string()))
            .or_default();
        if entry.has_memberships() {
            warn!(switch = %self.switch, port, "Reverting port that still carries VLAN memberships");
        }
        entry.trunk = false;
        entry.admin_up = true;
        Ok(())
    }

    async fn query_port_channels(&mut self, ports: &[String]) -> FabricResult<PortChannels> {
        self.fabric.take_failure()?;

        let mut state = self.fabric.inner.lock();
        state.calls.push(MockCall::Query {
            switch: self.switch.clone(),
            ports: ports.to_vec(),
        });
        Ok(ports
            .iter()
            .map(|port| {
                let assignments = state
                    .ports
                    .get(&(self.switch.clone(), port.clone()))
                    .map(PortState::assignments)
                    .unwrap_or_default();
                (port.clone(), assignments)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalnet_types::ChannelAssignment;
    use serde_json::json;

    fn vlan(id: u16) -> VlanId {
        VlanId::new(id).unwrap()
    }

    fn session(fabric: &MockFabric) -> Box<dyn SwitchSession> {
        MockDriver::new(fabric.clone())
            .session("bait-and", &json!({}))
            .unwrap()
    }

    #[test]
    fn test_validate() {
        let driver = MockDriver::new(MockFabric::new());
        assert!(driver.validate(&json!({"anything": 1})).is_ok());
        assert!(driver.validate(&json!([])).is_err());
        assert!(driver.validate_port_name("3").is_ok());
        assert!(driver.validate_port_name("").is_err());
        assert!(driver.validate_port_name("gi 1/3").is_err());
    }

    #[tokio::test]
    async fn test_state_survives_sessions() {
        let fabric = MockFabric::new();
        session(&fabric)
            .modify_channel("3", Channel::Native, Some(vlan(23)))
            .await
            .unwrap();

        let channels = session(&fabric)
            .query_port_channels(&["3".to_string(), "4".to_string()])
            .await
            .unwrap();
        assert_eq!(
            channels["3"].iter().copied().collect::<Vec<_>>(),
            vec![ChannelAssignment::native(vlan(23))]
        );
        assert!(channels["4"].is_empty());
    }

    #[tokio::test]
    async fn test_modify_is_idempotent() {
        let fabric = MockFabric::new();
        let mut s = session(&fabric);
        s.modify_channel("3", Channel::Tagged(vlan(52)), Some(vlan(52)))
            .await
            .unwrap();
        s.modify_channel("3", Channel::Tagged(vlan(52)), Some(vlan(52)))
            .await
            .unwrap();
        s.modify_channel("3", Channel::Native, None).await.unwrap();

        let port = fabric.port("bait-and", "3");
        assert_eq!(port.tagged.len(), 1);
        assert!(port.native.is_none());
    }

    #[tokio::test]
    async fn test_mismatch_rejected_without_call() {
        let fabric = MockFabric::new();
        let result = session(&fabric)
            .modify_channel("3", Channel::Tagged(vlan(52)), Some(vlan(7)))
            .await;
        assert!(matches!(result, Err(FabricError::ChannelMismatch { .. })));
        assert!(fabric.calls().is_empty());
    }

    #[tokio::test]
    async fn test_revert_keeps_memberships() {
        let fabric = MockFabric::new();
        let mut s = session(&fabric);
        s.modify_channel("3", Channel::Tagged(vlan(52)), Some(vlan(52)))
            .await
            .unwrap();
        s.revert_port("3").await.unwrap();

        let port = fabric.port("bait-and", "3");
        assert!(!port.trunk);
        assert!(port.tagged.contains(&vlan(52)));
    }

    #[tokio::test]
    async fn test_fail_next() {
        let fabric = MockFabric::new();
        fabric.fail_next(FabricError::Transport {
            url: "mock".to_string(),
            message: "unplugged".to_string(),
        });

        let mut s = session(&fabric);
        assert!(s.revert_port("3").await.is_err());
        assert!(s.revert_port("3").await.is_ok());
        assert_eq!(fabric.calls().len(), 1);
    }
}
