//! Registration, login and wallet linkage handlers

use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, warn};
use validator::Validate;

use core_kernel::EvmAddress;
use domain_identity::{IdentityError, Role, WalletLink};
use domain_wallet::WalletOverview;

use crate::auth::{create_token, AuthUser};
use crate::dto::auth::*;
use crate::dto::wallet::*;
use crate::extract::OptionalJson;
use crate::{error::ApiError, AppState};

/// Registers a claimant, or an insurer whose email is on the allowlist
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    request.validate()?;
    let role = request.role.unwrap_or(Role::Claimant);
    if role == Role::Insurer && !state.config.auth.may_register_insurer(&request.email) {
        warn!(email = %request.email, "Insurer registration refused");
        return Err(ApiError::Forbidden(
            "insurer accounts cannot be self-registered".to_string(),
        ));
    }
    let user = state
        .accounts
        .register(&request.email, &request.password, role)
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Exchanges credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .accounts
        .authenticate(&request.email, &request.password)
        .await?;

    let expires_in = state.config.auth.jwt_expiration_secs;
    let access_token = create_token(&user, &state.config.auth.jwt_secret, expires_in)?;
    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in,
        user: user.into(),
    }))
}

/// Returns the caller's profile
pub async fn me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.accounts.get(caller.id).await?;
    Ok(Json(user.into()))
}

/// Links the caller's payout wallet
///
/// With `wallet_address` the address is recorded as-is; without it a
/// custodial wallet is provisioned at the wallet provider.
pub async fn link_wallet(
    State(state): State<AppState>,
    caller: AuthUser,
    body: OptionalJson<LinkWalletRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let request = body.unwrap_or_default();

    let link = match request.wallet_address {
        Some(raw) => WalletLink::External(EvmAddress::parse(&raw).map_err(IdentityError::from)?),
        None => {
            let wallets = state.wallets.as_ref().ok_or_else(|| {
                ApiError::ServiceUnavailable("custodial wallets are not configured".to_string())
            })?;
            // Checked up front so a linked user does not get a stray wallet
            if state.accounts.get(caller.id).await?.has_wallet() {
                return Err(IdentityError::WalletAlreadyLinked.into());
            }
            let wallet = wallets.provision(caller.id).await?;
            WalletLink::Custodial {
                wallet_id: wallet.id,
                address: wallet.address,
            }
        }
    };

    let user = state.accounts.link_wallet(caller.id, link).await?;
    Ok(Json(user.into()))
}

/// Returns the caller's wallet with balances
pub async fn get_wallet(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<WalletResponse>, ApiError> {
    let user = state.accounts.get(caller.id).await?;
    let address = user
        .wallet_address
        .ok_or_else(|| ApiError::NotFound("no wallet linked".to_string()))?;

    let overview = match &state.wallets {
        Some(wallets) => wallets.overview(&address, user.wallet_id.as_deref()).await?,
        None => WalletOverview {
            address,
            wallet: None,
            balances: Vec::new(),
            unified: None,
        },
    };

    Ok(Json(WalletResponse::from_overview(overview, user.wallet_id)))
}
