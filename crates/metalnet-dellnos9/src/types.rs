//! Type definitions for the Dell OS9 driver

use std::fmt;
use std::str::FromStr;

use metalnet_switch::{require_str, Credentials, FabricError, FabricResult, SwitchConfig};
use serde::{Deserialize, Serialize};

/// Vendor identifier stored on Dell OS9 switch records.
pub const DELLNOS9_VENDOR: &str = "dellnos9";

/// Interface family of the switch's front-panel ports.
///
/// The CLI names interfaces by family (`TenGigabitEthernet 1/3`), the REST
/// API by a URL prefix (`tengig-1-3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceType {
    GigabitEthernet,
    TenGigabitEthernet,
    TwentyfiveGigabitEthernet,
    FortyGigE,
    PeGigabitEthernet,
    FiftyGigabitEthernet,
    HundredGigabitEthernet,
}

impl InterfaceType {
    pub const ALL: [InterfaceType; 7] = [
        InterfaceType::GigabitEthernet,
        InterfaceType::TenGigabitEthernet,
        InterfaceType::TwentyfiveGigabitEthernet,
        InterfaceType::FortyGigE,
        InterfaceType::PeGigabitEthernet,
        InterfaceType::FiftyGigabitEthernet,
        InterfaceType::HundredGigabitEthernet,
    ];

    /// Name as typed in the switch CLI.
    pub fn cli_name(&self) -> &'static str {
        match self {
            InterfaceType::GigabitEthernet => "GigabitEthernet",
            InterfaceType::TenGigabitEthernet => "TenGigabitEthernet",
            InterfaceType::TwentyfiveGigabitEthernet => "TwentyfiveGigabitEthernet",
            InterfaceType::FortyGigE => "fortyGigE",
            InterfaceType::PeGigabitEthernet => "peGigabitEthernet",
            InterfaceType::FiftyGigabitEthernet => "FiftyGigabitEthernet",
            InterfaceType::HundredGigabitEthernet => "HundredGigabitEthernet",
        }
    }

    /// Prefix of the interface resource name in REST URLs.
    pub fn url_prefix(&self) -> &'static str {
        match self {
            InterfaceType::GigabitEthernet => "gige-",
            InterfaceType::TenGigabitEthernet => "tengig-",
            InterfaceType::TwentyfiveGigabitEthernet => "twentyfivegig-",
            InterfaceType::FortyGigE => "fortygig-",
            InterfaceType::PeGigabitEthernet => "pegig-",
            InterfaceType::FiftyGigabitEthernet => "fiftygig-",
            InterfaceType::HundredGigabitEthernet => "hundredgig-",
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

impl FromStr for InterfaceType {
    type Err = FabricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InterfaceType::ALL
            .into_iter()
            .find(|t| t.cli_name() == s)
            .ok_or_else(|| {
                FabricError::invalid_config(
                    "interface_type",
                    format!("unsupported interface type {s:?}"),
                )
            })
    }
}

/// Validated switch configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DellConfig {
    /// Base URL including scheme, e.g. `http://10.0.0.5`.
    pub hostname: String,
    pub credentials: Credentials,
    pub interface_type: InterfaceType,
}

impl DellConfig {
    pub const FIELDS: [&'static str; 4] = ["hostname", "username", "password", "interface_type"];

    /// Parses and validates a stored switch configuration object.
    pub fn from_config(config: &SwitchConfig) -> FabricResult<Self> {
        for field in Self::FIELDS {
            require_str(config, field)?;
        }

        let hostname = require_str(config, "hostname")?.trim_end_matches('/');
        if hostname.is_empty() {
            return Err(FabricError::invalid_config("hostname", "must not be empty"));
        }

        Ok(Self {
            hostname: hostname.to_string(),
            credentials: Credentials::new(
                require_str(config, "username")?,
                require_str(config, "password")?,
            ),
            interface_type: require_str(config, "interface_type")?.parse()?,
        })
    }
}
