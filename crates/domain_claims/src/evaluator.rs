//! Evaluation orchestrator
//!
//! Runs the fixed four-step analysis pipeline for a submitted claim and
//! records the aggregated decision:
//!
//! ```text
//! documents -> damage (images) -> fraud -> reasoning -> DecisionPolicy
//! ```
//!
//! A failing step aborts the run. Nothing but agent logs is written until the
//! final compare-and-swap in [`ClaimStore::record_evaluation`], so an aborted
//! run leaves the claim SUBMITTED.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use core_kernel::{ClaimId, PortError};

use crate::agent_log::{AgentKind, AgentLog};
use crate::claim::{Claim, ClaimStatus};
use crate::decision::{Decision, DecisionPolicy};
use crate::error::ClaimError;
use crate::evaluation::{Evaluation, EvaluationFindings};
use crate::ports::{AnalysisRequest, ClaimAnalysisPort, ClaimStore, PriorFindings};

/// Result of a completed evaluation
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub claim: Claim,
    pub evaluation: Evaluation,
    pub decision: Decision,
}

/// Orchestrates claim evaluation
#[derive(Clone)]
pub struct EvaluationService {
    store: Arc<dyn ClaimStore>,
    analyzer: Arc<dyn ClaimAnalysisPort>,
    policy: DecisionPolicy,
}

impl EvaluationService {
    pub fn new(
        store: Arc<dyn ClaimStore>,
        analyzer: Arc<dyn ClaimAnalysisPort>,
        policy: DecisionPolicy,
    ) -> Self {
        Self { store, analyzer, policy }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Evaluates a SUBMITTED claim
    #[instrument(skip(self), fields(provider = self.analyzer.provider()))]
    pub async fn evaluate(&self, claim_id: ClaimId) -> Result<EvaluationOutcome, ClaimError> {
        let mut claim = self.store.get_claim(claim_id).await?;
        if claim.status != ClaimStatus::Submitted {
            return Err(ClaimError::AlreadyEvaluated(format!(
                "claim {} is {}",
                claim.claim_number, claim.status
            )));
        }

        let evidence = self.store.list_evidence(claim_id).await?;
        let request = AnalysisRequest {
            claim: claim.clone(),
            evidence,
        };

        self.log(AgentLog::info(
            claim_id,
            AgentKind::Orchestrator,
            format!(
                "Evaluation started with {} evidence file(s) using {}",
                request.evidence.len(),
                self.analyzer.provider()
            ),
        ))
        .await;

        let document = self
            .step(claim_id, AgentKind::Document, self.analyzer.assess_documents(&request))
            .await?;
        let damage = self
            .step(claim_id, AgentKind::Image, self.analyzer.assess_damage(&request))
            .await?;
        let fraud = self
            .step(
                claim_id,
                AgentKind::Fraud,
                self.analyzer.score_fraud(&request, &document, &damage),
            )
            .await?;
        let prior = PriorFindings { document, damage, fraud };
        let reasoning = self
            .step(claim_id, AgentKind::Reasoning, self.analyzer.reason(&request, &prior))
            .await?;

        let findings = EvaluationFindings {
            document: prior.document,
            damage: prior.damage,
            fraud: prior.fraud,
            reasoning,
        };
        let decision = self.policy.decide(&claim, &findings);
        claim.apply_decision(&decision)?;
        let evaluation = Evaluation::record(claim_id, findings, &decision);

        if let Err(e) = self.store.record_evaluation(&claim, &evaluation).await {
            warn!(claim_id = %claim_id, error = %e, "Evaluation could not be recorded");
            return Err(e.into());
        }

        self.log(
            AgentLog::info(claim_id, AgentKind::Orchestrator, decision.summary.clone()).with_data(
                serde_json::json!({
                    "status": claim.status,
                    "confidence": decision.confidence,
                    "scores": evaluation.scores,
                }),
            ),
        )
        .await;

        info!(
            claim_id = %claim_id,
            status = %claim.status,
            confidence = decision.confidence.unwrap_or_default(),
            "Claim evaluated"
        );

        Ok(EvaluationOutcome {
            claim,
            evaluation,
            decision,
        })
    }

    /// Runs one analysis step, logging start and completion or failure
    async fn step<T, F>(&self, claim_id: ClaimId, agent: AgentKind, call: F) -> Result<T, ClaimError>
    where
        T: Serialize,
        F: Future<Output = Result<T, PortError>>,
    {
        self.log(AgentLog::info(claim_id, agent, format!("{} analysis started", agent)))
            .await;
        let started = Instant::now();

        match call.await {
            Ok(output) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let data = serde_json::to_value(&output).unwrap_or(serde_json::Value::Null);
                self.log(
                    AgentLog::info(claim_id, agent, format!("{} analysis completed", agent))
                        .with_data(serde_json::json!({ "output": data, "elapsed_ms": elapsed_ms })),
                )
                .await;
                Ok(output)
            }
            Err(source) => {
                error!(claim_id = %claim_id, step = %agent, error = %source, "Analysis step failed");
                self.log(AgentLog::error(
                    claim_id,
                    agent,
                    format!("{} analysis failed: {}", agent, source),
                ))
                .await;
                Err(ClaimError::AnalysisFailed { step: agent, source })
            }
        }
    }

    async fn log(&self, entry: AgentLog) {
        if let Err(e) = self.store.append_log(&entry).await {
            warn!(claim_id = %entry.claim_id, error = %e, "Failed to append agent log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_log::LogLevel;
    use crate::ports::mock::{MockAnalyzer, MockClaimStore};
    use core_kernel::{UserId, UsdcAmount};
    use rust_decimal_macros::dec;

    async fn setup(analyzer: MockAnalyzer) -> (EvaluationService, MockClaimStore, Arc<MockAnalyzer>, Claim) {
        let store = MockClaimStore::new();
        let claim = Claim::submit(UserId::new(), "Kitchen fire", UsdcAmount::new(dec!(4200)).unwrap());
        store.insert_claim(&claim, &[]).await.unwrap();
        let analyzer = Arc::new(analyzer);
        let service = EvaluationService::new(
            Arc::new(store.clone()),
            analyzer.clone(),
            DecisionPolicy::default(),
        );
        (service, store, analyzer, claim)
    }

    #[tokio::test]
    async fn test_confident_evaluation_approves() {
        let (service, store, analyzer, claim) = setup(MockAnalyzer::uniform(0.95)).await;

        let outcome = service.evaluate(claim.id).await.unwrap();
        assert_eq!(outcome.claim.status, ClaimStatus::Approved);
        assert_eq!(outcome.claim.approved_amount, Some(claim.amount));
        assert_eq!(analyzer.calls(), 4);

        let stored = store.get_claim(claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Approved);
        assert!(store.get_evaluation(claim.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_low_confidence_needs_review() {
        let (service, _, _, claim) = setup(MockAnalyzer::uniform(0.5)).await;

        let outcome = service.evaluate(claim.id).await.unwrap();
        assert_eq!(outcome.claim.status, ClaimStatus::NeedsReview);
        assert!(outcome.claim.approved_amount.is_none());
        assert!(outcome.evaluation.confidence < DecisionPolicy::default().approval_threshold());
    }

    #[tokio::test]
    async fn test_second_evaluation_fails_without_writes() {
        let (service, store, analyzer, claim) = setup(MockAnalyzer::uniform(0.95)).await;
        service.evaluate(claim.id).await.unwrap();
        let logs_before = store.log_count(claim.id).await;

        let err = service.evaluate(claim.id).await.unwrap_err();
        assert!(matches!(err, ClaimError::AlreadyEvaluated(_)));
        assert_eq!(store.log_count(claim.id).await, logs_before);
        assert_eq!(analyzer.calls(), 4);
    }

    #[tokio::test]
    async fn test_failed_step_leaves_claim_submitted() {
        let (service, store, analyzer, claim) =
            setup(MockAnalyzer::uniform(0.95).failing_at(AgentKind::Fraud)).await;

        let err = service.evaluate(claim.id).await.unwrap_err();
        assert!(matches!(err, ClaimError::AnalysisFailed { step: AgentKind::Fraud, .. }));
        assert_eq!(analyzer.calls(), 3);

        let stored = store.get_claim(claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Submitted);
        assert!(store.get_evaluation(claim.id).await.unwrap().is_none());

        let logs = store.list_logs(claim.id).await.unwrap();
        let last = logs.last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert_eq!(last.agent, AgentKind::Fraud);
    }

    #[tokio::test]
    async fn test_unknown_claim_is_not_found() {
        let (service, _, _, _) = setup(MockAnalyzer::uniform(0.9)).await;
        let err = service.evaluate(ClaimId::new()).await.unwrap_err();
        assert!(matches!(err, ClaimError::NotFound(_)));
    }
}
