//! Claim submission, reads and manual review

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use core_kernel::{ClaimId, EvidenceId, UserId, UsdcAmount};

use crate::agent_log::{AgentKind, AgentLog};
use crate::claim::{Claim, ClaimEvidence, EvidenceKind, ReviewOutcome};
use crate::decision::DecisionPolicy;
use crate::error::ClaimError;
use crate::evaluation::Evaluation;
use crate::ports::ClaimStore;

/// Evidence reference supplied at submission
#[derive(Debug, Clone)]
pub struct NewEvidence {
    pub kind: EvidenceKind,
    pub file_name: String,
    pub mime_type: String,
    pub uri: String,
}

/// A claim as submitted by a claimant
#[derive(Debug, Clone)]
pub struct NewClaimRequest {
    pub description: String,
    pub amount: Decimal,
    pub evidence: Vec<NewEvidence>,
}

/// Maximum number of evidence files on one claim
pub const MAX_EVIDENCE_FILES: usize = 20;

/// Claim lifecycle operations outside evaluation and settlement
#[derive(Clone)]
pub struct ClaimService {
    store: Arc<dyn ClaimStore>,
    policy: DecisionPolicy,
}

impl ClaimService {
    pub fn new(store: Arc<dyn ClaimStore>, policy: DecisionPolicy) -> Self {
        Self { store, policy }
    }

    /// Creates a SUBMITTED claim with its evidence
    #[instrument(skip_all, fields(claimant = %claimant_id))]
    pub async fn submit(&self, claimant_id: UserId, request: NewClaimRequest) -> Result<Claim, ClaimError> {
        let description = request.description.trim();
        if description.is_empty() {
            return Err(ClaimError::Validation("description is required".to_string()));
        }
        if request.evidence.len() > MAX_EVIDENCE_FILES {
            return Err(ClaimError::Validation(format!(
                "at most {} evidence files are accepted",
                MAX_EVIDENCE_FILES
            )));
        }
        let amount = UsdcAmount::positive(request.amount)?;

        let claim = Claim::submit(claimant_id, description, amount);
        let evidence = request
            .evidence
            .into_iter()
            .map(|e| {
                if e.uri.trim().is_empty() {
                    return Err(ClaimError::Validation(format!(
                        "evidence '{}' has no uri",
                        e.file_name
                    )));
                }
                Ok(ClaimEvidence {
                    id: EvidenceId::new_v7(),
                    claim_id: claim.id,
                    kind: e.kind,
                    file_name: e.file_name,
                    mime_type: e.mime_type,
                    uri: e.uri,
                    created_at: Utc::now(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.store.insert_claim(&claim, &evidence).await?;

        info!(
            claim_id = %claim.id,
            claim_number = %claim.claim_number,
            amount = %claim.amount,
            evidence = evidence.len(),
            "Claim submitted"
        );
        Ok(claim)
    }

    pub async fn get(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        Ok(self.store.get_claim(id).await?)
    }

    /// Lists claims; `None` lists every claim (insurer view)
    pub async fn list(&self, claimant: Option<UserId>) -> Result<Vec<Claim>, ClaimError> {
        Ok(self.store.list_claims(claimant).await?)
    }

    pub async fn evidence(&self, id: ClaimId) -> Result<Vec<ClaimEvidence>, ClaimError> {
        Ok(self.store.list_evidence(id).await?)
    }

    /// Returns the evaluation, or NotFound if the claim was never evaluated
    pub async fn evaluation(&self, id: ClaimId) -> Result<Evaluation, ClaimError> {
        self.store
            .get_evaluation(id)
            .await?
            .ok_or_else(|| ClaimError::NotFound(format!("evaluation for claim {}", id)))
    }

    pub async fn logs(&self, id: ClaimId) -> Result<Vec<AgentLog>, ClaimError> {
        Ok(self.store.list_logs(id).await?)
    }

    /// Applies an insurer decision to a claim that needs review
    #[instrument(skip_all, fields(claim_id = %id, reviewer = %reviewer))]
    pub async fn review(
        &self,
        id: ClaimId,
        reviewer: UserId,
        outcome: ReviewOutcome,
        notes: Option<String>,
    ) -> Result<Claim, ClaimError> {
        let mut claim = self.store.get_claim(id).await?;
        let decision = self.policy.review(&claim, &outcome, notes.as_deref())?;
        claim.apply_decision(&decision)?;

        self.store.record_review(&claim).await?;

        let entry = AgentLog::info(claim.id, AgentKind::Review, decision.summary.clone())
            .with_data(serde_json::json!({
                "reviewer": reviewer.to_string(),
                "status": claim.status,
                "approved_amount": claim.approved_amount,
            }));
        if let Err(e) = self.store.append_log(&entry).await {
            warn!(claim_id = %claim.id, error = %e, "Failed to append review log");
        }

        info!(claim_id = %claim.id, status = %claim.status, "Claim reviewed");
        Ok(claim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ClaimStatus;
    use crate::ports::mock::MockClaimStore;
    use rust_decimal_macros::dec;

    fn service() -> (ClaimService, MockClaimStore) {
        let store = MockClaimStore::new();
        (ClaimService::new(Arc::new(store.clone()), DecisionPolicy::default()), store)
    }

    fn request(amount: Decimal) -> NewClaimRequest {
        NewClaimRequest {
            description: "Rear-ended at a red light".to_string(),
            amount,
            evidence: vec![NewEvidence {
                kind: EvidenceKind::Document,
                file_name: "police-report.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                uri: "gs://claims/police-report.pdf".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_submit_persists_claim_and_evidence() {
        let (service, _) = service();
        let claimant = UserId::new();

        let claim = service.submit(claimant, request(dec!(2500))).await.unwrap();
        assert_eq!(claim.status, ClaimStatus::Submitted);
        assert_eq!(service.evidence(claim.id).await.unwrap().len(), 1);
        assert_eq!(service.list(Some(claimant)).await.unwrap().len(), 1);
        assert!(service.list(Some(UserId::new())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_input() {
        let (service, _) = service();

        let err = service.submit(UserId::new(), request(dec!(0))).await.unwrap_err();
        assert!(matches!(err, ClaimError::Money(_)));

        let mut blank = request(dec!(10));
        blank.description = "   ".to_string();
        let err = service.submit(UserId::new(), blank).await.unwrap_err();
        assert!(matches!(err, ClaimError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_evaluation_is_not_found() {
        let (service, _) = service();
        let claim = service.submit(UserId::new(), request(dec!(10))).await.unwrap();
        assert!(matches!(service.evaluation(claim.id).await, Err(ClaimError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_review_rejects_claim_needing_review() {
        let (service, store) = service();
        let mut claim = Claim::submit(UserId::new(), "Flood", UsdcAmount::new(dec!(900)).unwrap());
        claim.status = ClaimStatus::NeedsReview;
        store.put_claim(claim.clone()).await;

        let reviewed = service
            .review(claim.id, UserId::new(), ReviewOutcome::Reject, Some("no policy".to_string()))
            .await
            .unwrap();
        assert_eq!(reviewed.status, ClaimStatus::Rejected);
        assert_eq!(store.log_count(claim.id).await, 1);

        let again = service
            .review(claim.id, UserId::new(), ReviewOutcome::Reject, None)
            .await;
        assert!(matches!(again, Err(ClaimError::InvalidStatusTransition { .. })));
    }
}
