//! metalnet-dellnos9 - switch driver for Dell S3048-ON running OS9
//!
//! Talks to the switch's XML REST API. Admin state goes through the
//! structured interface resource; VLAN membership goes through the CLI
//! operations endpoint, and reads scrape the rendered CLI text (see
//! [`parser`]).

pub mod commands;
pub mod driver;
pub mod parser;
pub mod types;

pub use driver::{validate_port_name, DellNos9Driver, DellNos9Session};
pub use parser::Switchport;
pub use types::{DellConfig, InterfaceType, DELLNOS9_VENDOR};
