//! ClaimLedger API Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin claimledger-api
//!
//! # Run with environment variables
//! CLAIMLEDGER_SERVER__PORT=8080 CLAIMLEDGER_DATABASE__URL=postgres://... cargo run --bin claimledger-api
//! ```
//!
//! # Environment Variables
//!
//! * `CLAIMLEDGER_SERVER__HOST` / `CLAIMLEDGER_SERVER__PORT` - Bind address (default: 0.0.0.0:8080)
//! * `CLAIMLEDGER_SERVER__JSON_LOGS` - Emit JSON log lines
//! * `CLAIMLEDGER_AUTH__JWT_SECRET` - JWT signing secret (required in release builds)
//! * `CLAIMLEDGER_DATABASE__URL` - PostgreSQL connection string
//! * `CLAIMLEDGER_GEMINI__API_KEY` - Enables Gemini claim analysis
//! * `CLAIMLEDGER_CIRCLE__API_KEY` - Enables custodial wallets
//! * `CLAIMLEDGER_CHAIN__SETTLEMENT_PRIVATE_KEY` - Enables USDC settlement
//! * `RUST_LOG` - Log filter, overrides `CLAIMLEDGER_SERVER__LOG_LEVEL`

use std::net::SocketAddr;

use anyhow::{bail, Context};
use tokio::net::TcpListener;

use interface_api::bootstrap::{build_adapters, init_tracing};
use interface_api::config::{AppConfig, DEV_JWT_SECRET};
use interface_api::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    init_tracing(&config.server);

    if config.auth.jwt_secret == DEV_JWT_SECRET {
        if cfg!(debug_assertions) {
            tracing::warn!("Using the development JWT secret");
        } else {
            bail!("CLAIMLEDGER_AUTH__JWT_SECRET must be set");
        }
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Starting ClaimLedger API server"
    );

    let pool = infra_db::create_pool(config.database.pool_config())
        .await
        .context("database connection failed")?;
    infra_db::run_migrations(&pool)
        .await
        .context("database migrations failed")?;

    let adapters = build_adapters(&config, pool).context("adapter setup failed")?;
    let addr: SocketAddr = config
        .server
        .server_addr()
        .parse()
        .context("invalid server address")?;
    let state = AppState::new(config, adapters).context("invalid evaluation settings")?;
    let app = create_router(state);

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
