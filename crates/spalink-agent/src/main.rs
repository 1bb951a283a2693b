//! # spalink
//!
//! Bridges a cloud-connected spa controller to a local MQTT broker.
//!
//! ## Architecture
//!
//! Two activities run concurrently in daemon mode:
//! 1. **Poll-publish**: periodically fetch device telemetry from the
//!    cloud API and publish it to `<root_topic>/info`
//! 2. **Command relay**: receive control messages under the command
//!    topic and translate them into cloud API calls
//!
//! A credential bootstrap runs first: with no cached session, the agent
//! logs in, looks up the device binding, and persists the result back to
//! the config file. Missing credentials and a rejected bootstrap are the
//! only fatal paths; every per-cycle error is logged and skipped.

use anyhow::{Context, Result};
use clap::Parser;
use spalink_api::{ApiClient, ApiClientConfig, DEFAULT_TIMEOUT};
use tracing_subscriber::EnvFilter;

mod bootstrap;
mod cli;
mod config;
mod runtime;
mod store;

use cli::Cli;
use config::AgentConfig;
use runtime::Agent;
use store::CredentialStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "starting spalink"
    );

    let config = AgentConfig::load(&args.config)?;
    let store = CredentialStore::new(&args.config);
    let credentials = config.credentials();

    let client = ApiClient::new(ApiClientConfig {
        base_url: config.spa.api_url.clone(),
        application_id: credentials.application_id.clone(),
        timeout: DEFAULT_TIMEOUT,
    })
    .context("cannot create API client")?;

    // The login check must pass before any poll or dispatch; this is the
    // only fatal path once the process is up.
    let credentials =
        bootstrap::run(&client, &store, credentials, args.refresh_credentials).await?;

    let mut agent = Agent::new(config, client, credentials);

    if args.print {
        agent.print_state().await?;
    }
    if args.publish_once {
        agent.publish_once().await?;
    }
    if let Some(send) = &args.send {
        agent.send(&send[0], &send[1]).await?;
    }
    if args.daemon {
        agent.run_loop().await?;
    }

    if !args.print && !args.publish_once && args.send.is_none() && !args.daemon {
        tracing::info!("no action requested; run with --help for the list of actions");
    }

    Ok(())
}
