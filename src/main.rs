use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use healthchain_core::{
    constants::{DEFAULT_REST_ADDR, REST_ADDR_ENV},
    session, CoreConfig, WalletConnector,
};

/// Main entry point for the HealthChain server
///
/// Connects to the wallet once, binds the `HealthcareRecords` contract and serves the REST API
/// (default `127.0.0.1:3000`).
///
/// A failed wallet connection is logged and the server still starts: `/health` and `/session`
/// answer, contract routes return 503.
///
/// # Environment Variables
/// - `HEALTHCHAIN_RPC_URL`: wallet / JSON-RPC endpoint
/// - `HEALTHCHAIN_CONTRACT_ADDRESS`: deployed contract address (required)
/// - `HEALTHCHAIN_RECEIPT_POLL_MS`, `HEALTHCHAIN_RECEIPT_POLL_ATTEMPTS`: receipt polling
/// - `HEALTHCHAIN_REST_ADDR`: REST server address
///
/// # Errors
/// Returns an error if the configuration is invalid, the address cannot be bound or the server
/// fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("healthchain=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(CoreConfig::from_env()?);
    let rest_addr = std::env::var(REST_ADDR_ENV).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    let connector = WalletConnector::from_config(&cfg);
    let state = match session::connect(&cfg, &connector).await {
        Ok(connection) => AppState::connected(connection),
        Err(e) => {
            tracing::error!("Error connecting to wallet: {:?}", e);
            AppState::disconnected(cfg.contract_address(), e.to_string())
        }
    };

    tracing::info!("++ Starting HealthChain REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
