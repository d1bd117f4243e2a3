//! Claims DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::UsdcAmount;
use domain_claims::{
    Claim, ClaimError, ClaimEvidence, ClaimStatus, Decision, EvaluationOutcome, EvidenceKind,
    Evaluation, NewClaimRequest, NewEvidence, ReviewOutcome,
};

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitClaimRequest {
    #[validate(length(min = 1, max = 5000, message = "must be 1 to 5000 characters"))]
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    #[validate(nested)]
    pub evidence: Vec<EvidenceRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EvidenceRequest {
    pub kind: EvidenceKind,
    #[validate(length(min = 1))]
    pub file_name: String,
    #[validate(length(min = 1))]
    pub mime_type: String,
    #[validate(length(min = 1))]
    pub uri: String,
}

impl From<SubmitClaimRequest> for NewClaimRequest {
    fn from(request: SubmitClaimRequest) -> Self {
        Self {
            description: request.description,
            amount: request.amount,
            evidence: request
                .evidence
                .into_iter()
                .map(|e| NewEvidence {
                    kind: e.kind,
                    file_name: e.file_name,
                    mime_type: e.mime_type,
                    uri: e.uri,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    /// Approved payout; defaults to the requested amount
    pub approved_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl ReviewRequest {
    pub fn outcome(&self) -> Result<ReviewOutcome, ClaimError> {
        match self.decision {
            ReviewDecision::Approve => Ok(ReviewOutcome::Approve {
                amount: self.approved_amount.map(UsdcAmount::positive).transpose()?,
            }),
            ReviewDecision::Reject => Ok(ReviewOutcome::Reject),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub id: Uuid,
    pub claim_number: String,
    pub claimant_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub status: ClaimStatus,
    pub decision: Option<String>,
    pub confidence: Option<f64>,
    pub approved_amount: Option<Decimal>,
    pub tx_hash: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<ClaimEvidence>>,
}

impl From<Claim> for ClaimResponse {
    fn from(claim: Claim) -> Self {
        Self {
            id: claim.id.into(),
            claim_number: claim.claim_number,
            claimant_id: claim.claimant_id.into(),
            description: claim.description,
            amount: claim.amount.amount(),
            status: claim.status,
            decision: claim.decision,
            confidence: claim.confidence,
            approved_amount: claim.approved_amount.map(|a| a.amount()),
            tx_hash: claim.tx_hash,
            settled_at: claim.settled_at,
            created_at: claim.created_at,
            updated_at: claim.updated_at,
            evidence: None,
        }
    }
}

impl ClaimResponse {
    pub fn with_evidence(mut self, evidence: Vec<ClaimEvidence>) -> Self {
        self.evidence = Some(evidence);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub status: ClaimStatus,
    pub confidence: Option<f64>,
    pub approved_amount: Option<Decimal>,
    pub summary: String,
}

impl From<Decision> for DecisionResponse {
    fn from(decision: Decision) -> Self {
        Self {
            status: decision.status,
            confidence: decision.confidence,
            approved_amount: decision.approved_amount.map(|a| a.amount()),
            summary: decision.summary,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub claim: ClaimResponse,
    pub decision: DecisionResponse,
    pub evaluation: Evaluation,
}

impl From<EvaluationOutcome> for EvaluationResponse {
    fn from(outcome: EvaluationOutcome) -> Self {
        Self {
            claim: outcome.claim.into(),
            decision: outcome.decision.into(),
            evaluation: outcome.evaluation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_review_request_parses_partial_approval() {
        let request: ReviewRequest = serde_json::from_value(serde_json::json!({
            "decision": "approve",
            "approved_amount": "120.50",
        }))
        .unwrap();

        match request.outcome().unwrap() {
            ReviewOutcome::Approve { amount } => {
                assert_eq!(amount.unwrap().amount(), dec!(120.50));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_review_rejects_non_positive_amount() {
        let request = ReviewRequest {
            decision: ReviewDecision::Approve,
            approved_amount: Some(dec!(0)),
            notes: None,
        };
        assert!(request.outcome().is_err());
    }

    #[test]
    fn test_submit_requires_description() {
        let request = SubmitClaimRequest {
            description: String::new(),
            amount: dec!(100),
            evidence: vec![],
        };
        assert!(request.validate().is_err());
    }
}
