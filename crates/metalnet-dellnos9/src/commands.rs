//! URL and payload builders for the OS9 REST API
//!
//! Two paths exist on the device:
//!
//! - the structured interface resource, PUT/GET as XML, used for admin state
//! - the CLI operations endpoint, which accepts literal CLI text wrapped in an
//!   XML envelope and answers with the rendered CLI output
//!
//! Every input reaching these builders is already validated (port names by
//! grammar, interface types from a fixed table, VLAN ids numeric), so nothing
//! here needs XML escaping.

use metalnet_types::VlanId;

use crate::types::InterfaceType;

/// Path of the CLI operations endpoint.
pub const CLI_PATH: &str = "/api/running/dell/_operations/cli";

/// Path prefix of interface resources.
pub const INTERFACE_PATH: &str = "/api/running/dell/interfaces/interface/";

/// Query suffix that makes the device include default-valued elements.
pub const WITH_DEFAULTS: &str = "?with-defaults";

/// Envelope element for mutating CLI text.
pub const CONFIG_TAG: &str = "config-commands";

/// Envelope element for read-only CLI text.
pub const SHOW_TAG: &str = "show-command";

/// VLAN membership verbs accepted under `interface vlan <id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAction {
    Tagged,
    Untagged,
    NoTagged,
    NoUntagged,
}

impl MemberAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberAction::Tagged => "tagged",
            MemberAction::Untagged => "untagged",
            MemberAction::NoTagged => "no tagged",
            MemberAction::NoUntagged => "no untagged",
        }
    }
}

/// Build the CLI endpoint URL
pub fn build_cli_url(hostname: &str) -> String {
    format!("{hostname}{CLI_PATH}")
}

/// Name of a port's interface resource: `1/0/3` becomes `tengig-1-0-3`.
pub fn interface_resource_name(iftype: InterfaceType, port: &str) -> String {
    format!("{}{}", iftype.url_prefix(), port.replace('/', "-"))
}

/// Build the interface resource URL
pub fn build_interface_url(hostname: &str, iftype: InterfaceType, port: &str) -> String {
    format!(
        "{hostname}{INTERFACE_PATH}{}",
        interface_resource_name(iftype, port)
    )
}

/// Build the interface resource URL that reports default values too
pub fn build_interface_query_url(hostname: &str, iftype: InterfaceType, port: &str) -> String {
    format!("{}{WITH_DEFAULTS}", build_interface_url(hostname, iftype, port))
}

fn wrap(tag: &str, command: &str) -> String {
    format!("<input><{tag}>{command}</{tag}></input>")
}

/// Wraps mutating CLI text for the operations endpoint.
pub fn build_config_payload(command: &str) -> String {
    wrap(CONFIG_TAG, command)
}

/// Wraps read-only CLI text for the operations endpoint.
pub fn build_show_payload(command: &str) -> String {
    wrap(SHOW_TAG, command)
}

/// Build a VLAN membership command
///
/// The device is VLAN-centric: membership is configured from the VLAN's
/// interface context, not the port's.
pub fn build_vlan_member_cmd(
    vlan: VlanId,
    action: MemberAction,
    iftype: InterfaceType,
    port: &str,
) -> String {
    format!(
        "interface vlan {}\r\n {} {} {}",
        vlan,
        action.as_str(),
        iftype.cli_name(),
        port
    )
}

/// Build the switchport show command
pub fn build_switchport_show_cmd(iftype: InterfaceType, port: &str) -> String {
    format!("interfaces switchport {} {}", iftype.cli_name(), port)
}

/// Interface body that disables hybrid portmode and shuts the port down.
pub fn build_port_shutdown_body(iftype: InterfaceType, port: &str) -> String {
    format!(
        "<interface><name>{}</name><portmode><hybrid>false</hybrid></portmode>\
         <shutdown>true</shutdown></interface>",
        interface_resource_name(iftype, port)
    )
}

/// Interface body that enables hybrid portmode and switchport and brings the
/// port up.
pub fn build_port_on_body(iftype: InterfaceType, port: &str) -> String {
    format!(
        "<interface><name>{}</name><portmode><hybrid>true</hybrid></portmode>\
         <switchport/><shutdown>false</shutdown></interface>",
        interface_resource_name(iftype, port)
    )
}
