//! Claims handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ClaimId, UserId};
use domain_claims::{AgentLog, Claim, Evaluation};
use domain_identity::Role;

use crate::auth::AuthUser;
use crate::dto::claims::*;
use crate::{error::ApiError, AppState};

/// Loads a claim the caller may see
pub(crate) async fn authorized_claim(
    state: &AppState,
    caller: &AuthUser,
    id: ClaimId,
) -> Result<Claim, ApiError> {
    let claim = state.claims.get(id).await?;
    caller.require_owner_or_insurer(claim.claimant_id)?;
    Ok(claim)
}

/// Submits a claim with its evidence
pub async fn submit_claim(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(request): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    caller.require(Role::Claimant)?;
    request.validate()?;

    let claim = state.claims.submit(caller.id, request.into()).await?;
    let evidence = state.claims.evidence(claim.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ClaimResponse::from(claim).with_evidence(evidence)),
    ))
}

/// Lists the caller's claims, or every claim for insurers
pub async fn list_claims(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<ClaimResponse>>, ApiError> {
    let claimant: Option<UserId> = if caller.is_insurer() {
        None
    } else {
        Some(caller.id)
    };
    let claims = state.claims.list(claimant).await?;
    Ok(Json(claims.into_iter().map(ClaimResponse::from).collect()))
}

/// Gets a claim by ID
pub async fn get_claim(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = authorized_claim(&state, &caller, ClaimId::from_uuid(id)).await?;
    let evidence = state.claims.evidence(claim.id).await?;
    Ok(Json(ClaimResponse::from(claim).with_evidence(evidence)))
}

/// Gets the evaluation of a claim
pub async fn get_evaluation(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Evaluation>, ApiError> {
    let claim = authorized_claim(&state, &caller, ClaimId::from_uuid(id)).await?;
    Ok(Json(state.claims.evaluation(claim.id).await?))
}

/// Gets the agent log of a claim, oldest first
pub async fn get_logs(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AgentLog>>, ApiError> {
    let claim = authorized_claim(&state, &caller, ClaimId::from_uuid(id)).await?;
    Ok(Json(state.claims.logs(claim.id).await?))
}

/// Applies an insurer's decision to a claim in NEEDS_REVIEW
pub async fn review_claim(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    caller.require(Role::Insurer)?;
    let outcome = request.outcome()?;
    let claim = state
        .claims
        .review(ClaimId::from_uuid(id), caller.id, outcome, request.notes)
        .await?;
    Ok(Json(claim.into()))
}
