//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use core_kernel::HealthCheckResult;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub version: String,
    pub checks: Vec<HealthCheckResult>,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check
///
/// Only the stores gate readiness; the analyzer, chain and wallet provider are
/// reported so operators can see them.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let adapters = &state.adapters;
    let (users, claims) = tokio::join!(
        adapters.users.health_check(),
        adapters.claims.health_check()
    );
    let ready = users.is_operational() && claims.is_operational();

    let mut checks = vec![users, claims, adapters.analyzer.health_check().await];
    if let Some(chain) = &adapters.chain {
        checks.push(chain.health_check().await);
    }
    if let Some(provider) = &adapters.wallet_provider {
        checks.push(provider.health_check().await);
    }

    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        status,
        Json(ReadinessResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks,
        }),
    )
}
