//! Resource registry and network fabric controller for metalnet.
//!
//! This crate owns the entity graph of the bare-metal control plane and
//! pushes network attachment changes to the switch fabric:
//!
//! - [`Registry`]: every create/delete/connect/detach operation and query
//! - [`FabricController`]: per-switch serialized driver calls
//! - [`Graph`]: the arena-backed entity graph and its dual-update helpers
//! - [`VlanPool`]: the network identifier allocator
//! - [`RegistryConfig`]: TOML configuration
//!
//! # Architecture
//!
//! 1. A front end calls a [`Registry`] operation
//! 2. The registry validates every precondition against the graph
//! 3. Attachment changes on bound ports go through the [`FabricController`]
//!    to the switch's driver
//! 4. The graph is updated only after the switch accepted the change
//!
//! # Example
//!
//! ```ignore
//! use metalnet_registry::{Registry, RegistryConfig};
//!
//! let registry = Registry::from_config(&RegistryConfig::load("metalnet.toml")?)?;
//! registry.group_create("acme-code").await?;
//! registry.project_create("anvil-nextgen", "acme-code").await?;
//! registry.network_create("hammernet", "anvil-nextgen").await?;
//! registry.node_connect_network("node-99", "99-eth0", "hammernet", None).await?;
//! ```

pub mod allocator;
pub mod arena;
pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
pub mod model;
mod registry;

pub use allocator::{AllocationError, NetworkIdAllocator, VlanPool};
pub use arena::{Arena, Id, Keyed};
pub use config::{ConfigError, RegistryConfig};
pub use controller::{builtin_drivers, FabricController};
pub use error::{RegistryError, RegistryResult};
pub use graph::Graph;
pub use model::{
    Attachment, ChannelDrift, Group, Headnode, HeadnodeInfo, Hnic, Network, NetworkInfo, Nic,
    Node, NodeInfo, Port, Project, Switch, SwitchInfo, User,
};
pub use registry::Registry;
