use std::collections::BTreeSet;

use metalnet_switch::SwitchConfig;
use tracing::{info, instrument};

use super::{PortTarget, Registry};
use crate::error::{RegistryError, RegistryResult};
use crate::model::{Port, Switch};

impl Registry {
    /// Registers a switch driven by `vendor`. The vendor must be known and
    /// must accept `config`.
    #[instrument(skip(self, config))]
    pub async fn switch_register(
        &self,
        label: &str,
        vendor: &str,
        config: SwitchConfig,
    ) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        if state.graph.switches.find(label).is_some() {
            return Err(RegistryError::duplicate("switch", label));
        }
        self.controller.validate_switch(vendor, &config)?;

        state.graph.switches.insert(Switch {
            label: label.to_string(),
            vendor: vendor.to_string(),
            config,
            ports: BTreeSet::new(),
        })?;
        info!(switch = label, vendor, "Switch registered");
        Ok(())
    }

    /// Deletes a switch and its ports. Refused while any port is bound.
    #[instrument(skip(self))]
    pub async fn switch_delete(&self, label: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;
        let switch_id = graph.switches.require(label)?;

        let mut bound = Vec::new();
        for port in &graph.switches.at(switch_id)?.ports {
            let port = graph.ports.at(*port)?;
            if port.nic.is_some() {
                bound.push(port.label.clone());
            }
        }
        if !bound.is_empty() {
            bound.sort();
            return Err(RegistryError::blocked(
                "switch",
                label,
                format!("ports {} have bound nics", bound.join(", ")),
            ));
        }

        state.graph.remove_switch(switch_id)?;
        self.controller.forget_switch(label);
        info!(switch = label, "Switch deleted");
        Ok(())
    }

    /// Registers a port on `switch`. The name must match the vendor's port
    /// naming grammar.
    #[instrument(skip(self))]
    pub async fn port_register(&self, switch: &str, port: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let switch_id = state.graph.switches.require(switch)?;
        let vendor = &state.graph.switches.at(switch_id)?.vendor;
        self.controller.validate_port_name(vendor, port)?;

        state.graph.add_port(Port {
            switch: switch_id,
            label: port.to_string(),
            nic: None,
        })?;
        info!(switch, port, "Port registered");
        Ok(())
    }

    /// Deletes an unbound port.
    #[instrument(skip(self))]
    pub async fn port_delete(&self, switch: &str, port: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;
        let switch_id = graph.switches.require(switch)?;
        let port_id = graph.port_id(switch_id, port)?;
        if let Some(nic) = graph.ports.at(port_id)?.nic {
            return Err(RegistryError::blocked(
                "port",
                format!("{switch}/{port}"),
                format!("bound to nic {}", graph.nics.at(nic)?.label),
            ));
        }

        state.graph.remove_port(port_id)?;
        info!(switch, port, "Port deleted");
        Ok(())
    }

    /// Binds a nic of `node` to a port.
    ///
    /// Both sides must be free. If the nic is already attached to a network
    /// that attachment is configured on the port before the binding is
    /// recorded.
    #[instrument(skip(self))]
    pub async fn port_connect_nic(
        &self,
        switch: &str,
        port: &str,
        node: &str,
        nic: &str,
    ) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;

        let switch_id = graph.switches.require(switch)?;
        let port_id = graph.port_id(switch_id, port)?;
        let node_id = graph.nodes.require(node)?;
        let nic_id = graph.nic_of(node_id, nic)?;

        if graph.ports.at(port_id)?.nic.is_some() {
            return Err(RegistryError::duplicate(
                "port binding",
                format!("{switch}/{port}"),
            ));
        }
        let entity = graph.nics.at(nic_id)?;
        if entity.port.is_some() {
            return Err(RegistryError::duplicate("port binding", nic));
        }

        if let Some(attachment) = entity.attachment {
            let vlan = graph.networks.at(attachment.network)?.network_id;
            let target = PortTarget::of_port(graph, port_id)?;
            self.push_channel(&target, attachment.channel, Some(vlan))
                .await?;
        }

        state.graph.bind_port(port_id, nic_id)?;
        info!(switch, port, node, nic, "Nic bound to port");
        Ok(())
    }

    /// Unbinds the nic of a port and resets the port.
    ///
    /// Every channel the graph has configured on the port is removed before
    /// the reset. The nic keeps its network attachment.
    #[instrument(skip(self))]
    pub async fn port_detach_nic(&self, switch: &str, port: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;

        let switch_id = graph.switches.require(switch)?;
        let port_id = graph.port_id(switch_id, port)?;
        if graph.ports.at(port_id)?.nic.is_none() {
            return Err(RegistryError::not_found(
                "port binding",
                format!("{switch}/{port}"),
            ));
        }

        let active = graph.intended_channels(port_id)?;
        let target = PortTarget::of_port(graph, port_id)?;
        self.reset_port(&target, &active).await?;

        state.graph.unbind_port(port_id)?;
        info!(switch, port, "Nic unbound from port");
        Ok(())
    }
}
