//! dellnos9ctl - diagnostic client for one Dell OS9 switch
//!
//! Runs single driver operations against a switch, bypassing the registry.
//! Useful for checking credentials, port grammar and firmware output layout
//! before registering a switch.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use metalnet_dellnos9::{DellNos9Driver, DellNos9Session};
use metalnet_switch::{HttpTransport, SwitchSession};
use metalnet_types::{Channel, VlanId};

/// Dell OS9 switch diagnostic client
#[derive(Parser, Debug)]
#[command(name = "dellnos9ctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Switch base URL including scheme, e.g. http://10.0.0.5
    #[arg(long, env = "DELLNOS9_HOSTNAME")]
    hostname: String,

    /// REST API user
    #[arg(short = 'u', long, env = "DELLNOS9_USERNAME")]
    username: String,

    /// REST API password
    #[arg(long, env = "DELLNOS9_PASSWORD", hide_env_values = true)]
    password: String,

    /// Interface family of the ports, as named in the switch CLI
    #[arg(short = 'i', long, default_value = "TenGigabitEthernet")]
    interface_type: String,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether a port is administratively up
    IsPortOn { port: String },
    /// Show the native and tagged VLANs of a port
    Show { port: String },
    /// Make VLAN the native VLAN of a port
    SetNative { port: String, vlan: VlanId },
    /// Remove the native VLAN of a port
    ClearNative { port: String },
    /// Add a tagged VLAN to a port
    AddTagged { port: String, vlan: VlanId },
    /// Remove a tagged VLAN from a port
    RemoveTagged { port: String, vlan: VlanId },
    /// Disable and re-enable a port, restoring factory defaults
    Revert { port: String },
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let transport = HttpTransport::new(args.timeout_secs.map(Duration::from_secs))
        .context("failed to build HTTP transport")?;
    let config = json!({
        "hostname": args.hostname,
        "username": args.username,
        "password": args.password,
        "interface_type": args.interface_type,
    });
    let mut session: DellNos9Session = DellNos9Driver::new(Arc::new(transport))
        .connect("dellnos9ctl", &config)
        .context("invalid switch configuration")?;

    match args.command {
        Command::IsPortOn { port } => {
            let on = session.is_port_on(&port).await?;
            println!("{port}: {}", if on { "up" } else { "shutdown" });
        }
        Command::Show { port } => {
            let switchport = session.switchport(&port).await?;
            match switchport.native {
                Some(vlan) => println!("native: {vlan}"),
                None => println!("native: -"),
            }
            let tagged: Vec<String> = switchport.tagged.iter().map(ToString::to_string).collect();
            println!("tagged: {}", tagged.join(","));
        }
        Command::SetNative { port, vlan } => {
            session
                .modify_channel(&port, Channel::Native, Some(vlan))
                .await?;
        }
        Command::ClearNative { port } => {
            session.modify_channel(&port, Channel::Native, None).await?;
        }
        Command::AddTagged { port, vlan } => {
            session
                .modify_channel(&port, Channel::Tagged(vlan), Some(vlan))
                .await?;
        }
        Command::RemoveTagged { port, vlan } => {
            session
                .modify_channel(&port, Channel::Tagged(vlan), None)
                .await?;
        }
        Command::Revert { port } => {
            session.revert_port(&port).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!(hostname = %args.hostname, command = ?args.command, "Running dellnos9ctl");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
