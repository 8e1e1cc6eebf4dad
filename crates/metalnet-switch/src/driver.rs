//! Switch driver capability interface.
//!
//! A vendor is represented by two traits:
//!
//! - [`SwitchDriver`]: the stateless variant registered under a vendor
//!   identifier. It validates configuration and port names and opens
//!   sessions.
//! - [`SwitchSession`]: one conversation with one switch, built from that
//!   switch's stored configuration. Sessions are never shared between
//!   switches and never outlive the controller call that opened them.
//!
//! # Example
//!
//! ```ignore
//! use metalnet_switch::{DriverRegistry, SwitchConfig};
//!
//! let driver = registry.get("dellnos9")?;
//! driver.validate(&config)?;
//! let mut session = driver.session("sw-1", &config)?;
//! session.open().await?;
//! session.modify_channel("1/3", Channel::Native, Some(vlan)).await?;
//! session.close().await?;
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use metalnet_types::{Channel, ChannelAssignment, VlanId};

use crate::error::{FabricError, FabricResult};

/// Vendor-specific configuration stored with a Switch record.
pub type SwitchConfig = serde_json::Value;

/// Channels active on each queried port.
pub type PortChannels = BTreeMap<String, BTreeSet<ChannelAssignment>>;

/// One open conversation with a switch.
#[async_trait]
pub trait SwitchSession: Send {
    /// Acquires whatever connection state the transport needs.
    async fn open(&mut self) -> FabricResult<()> {
        Ok(())
    }

    /// Releases connection state. Called even when a command failed.
    async fn close(&mut self) -> FabricResult<()> {
        Ok(())
    }

    /// Applies one channel transition. Reapplying an already-applied state
    /// succeeds without touching the device.
    async fn modify_channel(
        &mut self,
        port: &str,
        channel: Channel,
        network: Option<VlanId>,
    ) -> FabricResult<()>;

    /// Returns the port to its factory-default logical state.
    ///
    /// Every VLAN membership must already be stripped from the port.
    async fn revert_port(&mut self, port: &str) -> FabricResult<()>;

    /// Reports the channel assignments the device currently has on each
    /// port. Read-only.
    async fn query_port_channels(&mut self, ports: &[String]) -> FabricResult<PortChannels>;
}

/// A vendor variant.
pub trait SwitchDriver: Send + Sync {
    /// Identifier stored on Switch records of this vendor.
    fn vendor(&self) -> &str;

    /// Rejects a configuration object missing or mistyping a required
    /// field. Pure; no I/O.
    fn validate(&self, config: &SwitchConfig) -> FabricResult<()>;

    /// Fails with [`FabricError::BadArgument`] when `name` does not match the
    /// vendor's port naming grammar.
    fn validate_port_name(&self, name: &str) -> FabricResult<()>;

    /// Builds a session for the switch `switch` from its stored config.
    fn session(&self, switch: &str, config: &SwitchConfig) -> FabricResult<Box<dyn SwitchSession>>;
}

/// Registered vendor variants keyed by vendor identifier.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn SwitchDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `driver` under its own vendor identifier, replacing any
    /// earlier registration.
    pub fn register(&mut self, driver: Arc<dyn SwitchDriver>) {
        self.drivers.insert(driver.vendor().to_string(), driver);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, driver: Arc<dyn SwitchDriver>) -> Self {
        self.register(driver);
        self
    }

    pub fn get(&self, vendor: &str) -> FabricResult<Arc<dyn SwitchDriver>> {
        self.drivers
            .get(vendor)
            .cloned()
            .ok_or_else(|| FabricError::UnknownVendor(vendor.to_string()))
    }

    /// Registered vendor identifiers, sorted.
    pub fn vendors(&self) -> Vec<String> {
        let mut vendors: Vec<String> = self.drivers.keys().cloned().collect();
        vendors.sort();
        vendors
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("vendors", &self.vendors())
            .finish()
    }
}

/// Reads a required string field from a switch config object.
pub fn require_str<'a>(config: &'a SwitchConfig, field: &str) -> FabricResult<&'a str> {
    let object = config
        .as_object()
        .ok_or_else(|| FabricError::invalid_config("<root>", "expected an object"))?;
    match object.get(field) {
        Some(serde_json::Value::String(value)) => Ok(value),
        Some(_) => Err(FabricError::invalid_config(field, "expected a string")),
        None => Err(FabricError::invalid_config(field, "missing")),
    }
}
