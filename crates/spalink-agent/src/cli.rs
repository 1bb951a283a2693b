//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

/// Bridge a cloud-connected spa controller to an MQTT broker.
///
/// Action flags are not mutually exclusive; without any, only the
/// credential check runs.
#[derive(Debug, Parser)]
#[command(name = "spalink", version, about)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "spalink.toml")]
    pub config: PathBuf,

    /// Force a fresh login and persist the new session token and device id
    #[arg(long)]
    pub refresh_credentials: bool,

    /// Fetch telemetry once and publish it to the broker
    #[arg(long)]
    pub publish_once: bool,

    /// Fetch telemetry once and print it
    #[arg(long)]
    pub print: bool,

    /// Send a single command to the device
    #[arg(long, num_args = 2, value_names = ["COMMAND", "VALUE"])]
    pub send: Option<Vec<String>>,

    /// Run the continuous loop: subscribe for commands and poll periodically
    #[arg(long)]
    pub daemon: bool,
}
