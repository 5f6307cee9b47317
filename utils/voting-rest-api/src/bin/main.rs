use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use voting_ledger_bridge::contract::VotingContract;
use voting_ledger_bridge::{EthersLedgerClient, LedgerBridge};
use voting_rest_api::{app, AppStateInner, Config, Metrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Unable to set global default subscriber")?;

    let config = Config::parse();
    let (bridge_config, http_config) = config.load()?;

    let contract = VotingContract::bundled().context("Bundled contract ABI is invalid")?;
    let client = EthersLedgerClient::new(&bridge_config.node, contract);
    info!(
        contract = %bridge_config.ledger_address(),
        forwarder = ?bridge_config.deployment.forwarder_address,
        node = %bridge_config.node.endpoint,
        "Bridge configured"
    );

    let socket_addr = http_config.socket_addr();
    let app_state = Arc::new(AppStateInner {
        bridge: LedgerBridge::new(client, bridge_config),
        http: http_config,
        metrics: Metrics::new().context("Failed to register metrics")?,
    });

    info!(socket_addr = socket_addr.to_string(), "Serving requests...");

    axum::Server::bind(&socket_addr)
        .serve(app(app_state).into_make_service())
        .await?;

    Ok(())
}
