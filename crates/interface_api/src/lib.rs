//! HTTP API Layer
//!
//! This crate provides the ClaimLedger REST API using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for auth, claims, evaluation and settlement
//! - **Middleware**: Bearer-token authentication and audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Every failure becomes `{ "error": kind, "message": detail }`
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, Adapters, AppState};
//!
//! let state = AppState::new(config, adapters)?;
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod directory;
pub mod bootstrap;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_claims::{
    ClaimAnalysisPort, ClaimError, ClaimService, ClaimStore, EvaluationService, SettlementPort,
    SettlementService,
};
use domain_identity::{AccountService, UserStore};
use domain_wallet::{WalletProviderPort, WalletService};

use crate::config::AppConfig;
use crate::directory::UserWalletDirectory;
use crate::handlers::{agent, auth as auth_handlers, blockchain, claims, health};
use crate::middleware::{audit_middleware, auth_middleware};

/// Port implementations the application is wired with
#[derive(Clone)]
pub struct Adapters {
    pub users: Arc<dyn UserStore>,
    pub claims: Arc<dyn ClaimStore>,
    pub analyzer: Arc<dyn ClaimAnalysisPort>,
    /// Absent when no settlement key is configured
    pub chain: Option<Arc<dyn SettlementPort>>,
    /// Absent when no custodial wallet provider is configured
    pub wallet_provider: Option<Arc<dyn WalletProviderPort>>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub accounts: AccountService,
    pub claims: ClaimService,
    pub evaluator: EvaluationService,
    pub settlement: Option<SettlementService>,
    pub wallets: Option<WalletService>,
    pub adapters: Adapters,
}

impl AppState {
    /// Builds the services on top of `adapters`
    pub fn new(config: AppConfig, adapters: Adapters) -> Result<Self, ClaimError> {
        let policy = config.evaluation.policy()?;
        let directory = Arc::new(UserWalletDirectory::new(adapters.users.clone()));

        let settlement = adapters
            .chain
            .clone()
            .map(|chain| SettlementService::new(adapters.claims.clone(), chain, directory));

        Ok(Self {
            accounts: AccountService::new(adapters.users.clone()),
            claims: ClaimService::new(adapters.claims.clone(), policy),
            evaluator: EvaluationService::new(
                adapters.claims.clone(),
                adapters.analyzer.clone(),
                policy,
            ),
            settlement,
            wallets: adapters.wallet_provider.clone().map(WalletService::new),
            config: Arc::new(config),
            adapters,
        })
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login));

    let auth_routes = Router::new()
        .route("/me", get(auth_handlers::me))
        .route("/wallet", post(auth_handlers::link_wallet).get(auth_handlers::get_wallet));

    let claims_routes = Router::new()
        .route("/", post(claims::submit_claim).get(claims::list_claims))
        .route("/:id", get(claims::get_claim))
        .route("/:id/evaluation", get(claims::get_evaluation))
        .route("/:id/logs", get(claims::get_logs))
        .route("/:id/review", post(claims::review_claim));

    let agent_routes = Router::new().route("/evaluate/:claim_id", post(agent::evaluate_claim));

    let blockchain_routes = Router::new()
        .route("/settle/:claim_id", post(blockchain::settle_claim))
        .route("/status/:tx_hash", get(blockchain::transaction_status));

    // Protected routes
    let protected_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/claims", claims_routes)
        .nest("/agent", agent_routes)
        .nest("/blockchain", blockchain_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
