//! DellNos9Driver - switch driver for Dell S3048-ON running OS9

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument};

use metalnet_switch::transport::send_checked;
use metalnet_switch::{
    ChannelChange, FabricError, FabricResult, HttpRequest, PortChannels, SwitchConfig,
    SwitchDriver, SwitchSession, Transport,
};
use metalnet_types::{Channel, VlanId};

use crate::commands::{
    build_cli_url, build_config_payload, build_interface_query_url, build_interface_url,
    build_port_on_body, build_port_shutdown_body, build_show_payload, build_switchport_show_cmd,
    build_vlan_member_cmd, MemberAction,
};
use crate::parser::{parse_shutdown, parse_switchport, Switchport};
use crate::types::{DellConfig, DELLNOS9_VENDOR};

static PORT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+/\d+(/\d+)?$").expect("Invalid regex pattern"));

/// Checks the `1/2` or `1/0/1` port grammar.
pub fn validate_port_name(name: &str) -> FabricResult<()> {
    if PORT_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(FabricError::bad_argument(format!(
            "Invalid port name {name:?}. Valid port names for this switch are of the form 1/0/1 or 1/2"
        )))
    }
}

/// The `dellnos9` vendor variant.
///
/// Holds only the transport; everything switch-specific comes from the
/// config handed to [`SwitchDriver::session`].
#[derive(Clone)]
pub struct DellNos9Driver {
    transport: Arc<dyn Transport>,
}

impl DellNos9Driver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Typed session, for callers that need the OS9-only operations.
    pub fn connect(&self, switch: &str, config: &SwitchConfig) -> FabricResult<DellNos9Session> {
        let config = DellConfig::from_config(config)?;
        Ok(DellNos9Session::new(switch, config, self.transport.clone()))
    }
}

impl std::fmt::Debug for DellNos9Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DellNos9Driver").finish_non_exhaustive()
    }
}

impl SwitchDriver for DellNos9Driver {
    fn vendor(&self) -> &str {
        DELLNOS9_VENDOR
    }

    fn validate(&self, config: &SwitchConfig) -> FabricResult<()> {
        DellConfig::from_config(config).map(|_| ())
    }

    fn validate_port_name(&self, name: &str) -> FabricResult<()> {
        validate_port_name(name)
    }

    fn session(&self, switch: &str, config: &SwitchConfig) -> FabricResult<Box<dyn SwitchSession>> {
        Ok(Box::new(self.connect(switch, config)?))
    }
}

/// One conversation with one OS9 switch.
pub struct DellNos9Session {
    switch: String,
    config: DellConfig,
    transport: Arc<dyn Transport>,
}

impl DellNos9Session {
    pub fn new(switch: impl Into<String>, config: DellConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            switch: switch.into(),
            config,
            transport,
        }
    }

    pub fn config(&self) -> &DellConfig {
        &self.config
    }

    async fn run_config(&self, command: String) -> FabricResult<()> {
        let request = HttpRequest::post(
            build_cli_url(&self.config.hostname),
            build_config_payload(&command),
            self.config.credentials.clone(),
        );
        send_checked(self.transport.as_ref(), request, &[]).await?;
        Ok(())
    }

    async fn set_member(&self, vlan: VlanId, action: MemberAction, port: &str) -> FabricResult<()> {
        debug!(switch = %self.switch, port, %vlan, action = action.as_str(), "Changing VLAN membership");
        self.run_config(build_vlan_member_cmd(
            vlan,
            action,
            self.config.interface_type,
            port,
        ))
        .await
    }

    /// Reads a port's native and tagged VLANs through the CLI endpoint.
    #[instrument(skip(self), fields(switch = %self.switch))]
    pub async fn switchport(&self, port: &str) -> FabricResult<Switchport> {
        validate_port_name(port)?;
        let command = build_switchport_show_cmd(self.config.interface_type, port);
        let request = HttpRequest::post(
            build_cli_url(&self.config.hostname),
            build_show_payload(&command),
            self.config.credentials.clone(),
        );
        let response = send_checked(self.transport.as_ref(), request, &[]).await?;
        parse_switchport(&command, &response.body)
    }

    /// Returns true when the port is administratively up.
    #[instrument(skip(self), fields(switch = %self.switch))]
    pub async fn is_port_on(&self, port: &str) -> FabricResult<bool> {
        validate_port_name(port)?;
        let url = build_interface_query_url(&self.config.hostname, self.config.interface_type, port);
        let request = HttpRequest::get(url.clone(), self.config.credentials.clone());
        let response = send_checked(self.transport.as_ref(), request, &[]).await?;
        Ok(!parse_shutdown(&url, &response.body)?)
    }

    async fn put_interface(&self, port: &str, body: String) -> FabricResult<()> {
        let request = HttpRequest::put(
            build_interface_url(&self.config.hostname, self.config.interface_type, port),
            body,
            self.config.credentials.clone(),
        );
        send_checked(self.transport.as_ref(), request, &[]).await?;
        Ok(())
    }

    /// Turns off hybrid portmode and shuts the port down.
    pub async fn port_shutdown(&self, port: &str) -> FabricResult<()> {
        self.put_interface(port, build_port_shutdown_body(self.config.interface_type, port))
            .await
    }

    /// Enables hybrid portmode and switchport and brings the port up.
    pub async fn port_on(&self, port: &str) -> FabricResult<()> {
        self.put_interface(port, build_port_on_body(self.config.interface_type, port))
            .await
    }
}

#[async_trait]
impl SwitchSession for DellNos9Session {
    #[instrument(skip(self), fields(switch = %self.switch))]
    async fn modify_channel(
        &mut self,
        port: &str,
        channel: Channel,
        network: Option<VlanId>,
    ) -> FabricResult<()> {
        let change = ChannelChange::resolve(channel, network)?;
        validate_port_name(port)?;

        let current = self.switchport(port).await?;
        if change.is_applied(&current.assignments()) {
            debug!(switch = %self.switch, port, ?change, "Channel change already applied");
            return Ok(());
        }

        match change {
            ChannelChange::SetNative(vlan) => {
                if let Some(old) = current.native {
                    self.set_member(old, MemberAction::NoUntagged, port).await?;
                }
                self.set_member(vlan, MemberAction::Untagged, port).await?;
            }
            ChannelChange::ClearNative => {
                if let Some(old) = current.native {
                    self.set_member(old, MemberAction::NoUntagged, port).await?;
                }
            }
            ChannelChange::AddTagged(vlan) => {
                self.set_member(vlan, MemberAction::Tagged, port).await?;
            }
            ChannelChange::RemoveTagged(vlan) => {
                self.set_member(vlan, MemberAction::NoTagged, port).await?;
            }
        }

        info!(switch = %self.switch, port, ?change, "Channel change applied");
        Ok(())
    }

    #[instrument(skip(self), fields(switch = %self.switch))]
    async fn revert_port(&mut self, port: &str) -> FabricResult<()> {
        validate_port_name(port)?;
        self.port_shutdown(port).await?;
        self.port_on(port).await?;
        info!(switch = %self.switch, port, "Port reverted to defaults");
        Ok(())
    }

    #[instrument(skip(self), fields(switch = %self.switch))]
    async fn query_port_channels(&mut self, ports: &[String]) -> FabricResult<PortChannels> {
        let mut channels = PortChannels::new();
        for port in ports {
            let switchport = self.switchport(port).await?;
            channels.insert(port.clone(), switchport.assignments());
        }
        Ok(channels)
    }
}
