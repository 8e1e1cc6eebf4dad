//! Switch driver infrastructure for the metalnet fabric controller.
//!
//! This crate holds everything vendor drivers share:
//!
//! - [`driver`]: the [`SwitchDriver`] / [`SwitchSession`] capability traits
//!   and the [`DriverRegistry`] that maps vendor identifiers to variants
//! - [`change`]: the [`ChannelChange`] transition model every driver
//!   resolves `modify_channel` requests through
//! - [`transport`]: HTTP transport with a `reqwest` implementation and a
//!   recording implementation for tests
//! - [`mock`]: an in-memory vendor used by registry tests
//! - [`error`]: [`FabricError`]
//!
//! # Architecture
//!
//! ```text
//! Registry ──> FabricController ──> DriverRegistry[vendor]
//!                                        │ session(switch, config)
//!                                        ↓
//!                                  SwitchSession ──> Transport ──> switch
//! ```

pub mod change;
pub mod driver;
pub mod error;
pub mod mock;
pub mod transport;

pub use change::{ChannelChange, PortState};
pub use driver::{require_str, DriverRegistry, PortChannels, SwitchConfig, SwitchDriver, SwitchSession};
pub use error::{FabricError, FabricResult};
pub use mock::{MockCall, MockDriver, MockFabric, MOCK_VENDOR};
pub use transport::{Credentials, HttpRequest, HttpResponse, HttpTransport, Method, Transport};
