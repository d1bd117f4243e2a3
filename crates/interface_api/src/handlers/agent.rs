//! Evaluation handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use core_kernel::ClaimId;

use crate::auth::AuthUser;
use crate::dto::claims::EvaluationResponse;
use crate::handlers::claims::authorized_claim;
use crate::{error::ApiError, AppState};

/// Runs the four-step AI evaluation of a submitted claim
pub async fn evaluate_claim(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(claim_id): Path<Uuid>,
) -> Result<Json<EvaluationResponse>, ApiError> {
    let claim = authorized_claim(&state, &caller, ClaimId::from_uuid(claim_id)).await?;
    let outcome = state.evaluator.evaluate(claim.id).await?;
    Ok(Json(outcome.into()))
}
