//! Settlement handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use core_kernel::{ClaimId, EvmAddress};
use domain_claims::{SettlementService, TransferReceipt};
use domain_identity::Role;

use crate::auth::AuthUser;
use crate::dto::blockchain::*;
use crate::extract::OptionalJson;
use crate::{error::ApiError, AppState};

fn settlement(state: &AppState) -> Result<&SettlementService, ApiError> {
    state.settlement.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("settlement chain is not configured".to_string())
    })
}

/// Pays out an approved claim in USDC
pub async fn settle_claim(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(claim_id): Path<Uuid>,
    body: OptionalJson<SettleRequest>,
) -> Result<Json<SettlementResponse>, ApiError> {
    caller.require(Role::Insurer)?;
    let request = body.unwrap_or_default();

    let recipient = request
        .recipient
        .as_deref()
        .map(EvmAddress::parse)
        .transpose()
        .map_err(|e| ApiError::BadRequest(format!("recipient: {}", e)))?;

    let outcome = settlement(&state)?
        .settle(ClaimId::from_uuid(claim_id), recipient)
        .await?;
    Ok(Json(outcome.into()))
}

/// Looks up a settlement transaction on chain
pub async fn transaction_status(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(tx_hash): Path<String>,
) -> Result<Json<TransferReceipt>, ApiError> {
    let receipt = settlement(&state)?.transaction_status(&tx_hash).await?;
    Ok(Json(receipt))
}
