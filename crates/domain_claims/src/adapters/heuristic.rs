//! Deterministic local analyzer
//!
//! Scores a claim from its evidence mix, amount and description alone. Used
//! when no Gemini key is configured so the full pipeline still runs in
//! development and tests.

use async_trait::async_trait;
use rust_decimal::Decimal;

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError};

use crate::adapters::prompts;
use crate::claim::EvidenceKind;
use crate::evaluation::{
    DamageAssessment, DocumentAssessment, FraudAssessment, ReasoningAssessment, Score,
};
use crate::ports::{AnalysisRequest, ClaimAnalysisPort, PriorFindings};

/// Amounts above this add moderate fraud risk
const ELEVATED_AMOUNT: i64 = 2_000;
/// Amounts above this add high fraud risk
const HIGH_AMOUNT: i64 = 10_000;
const MIN_DESCRIPTION_LEN: usize = 20;

#[derive(Debug, Default, Clone)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

fn coverage_score(count: usize) -> Score {
    match count {
        0 => Score::clamped(0.3),
        1 => Score::clamped(0.8),
        _ => Score::clamped(0.9),
    }
}

impl DomainPort for HeuristicAnalyzer {}

#[async_trait]
impl HealthCheckable for HeuristicAnalyzer {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("heuristic-analyzer", 0)
    }
}

#[async_trait]
impl ClaimAnalysisPort for HeuristicAnalyzer {
    fn provider(&self) -> &'static str {
        "heuristic"
    }

    async fn assess_documents(&self, request: &AnalysisRequest) -> Result<DocumentAssessment, PortError> {
        let documents = prompts::of_kind(request, EvidenceKind::Document);
        let findings = if documents.is_empty() {
            vec!["no supporting documents".to_string()]
        } else {
            documents.iter().map(|d| format!("received {}", d.file_name)).collect()
        };
        Ok(DocumentAssessment {
            validity_score: coverage_score(documents.len()),
            findings,
            extracted_amount: None,
        })
    }

    async fn assess_damage(&self, request: &AnalysisRequest) -> Result<DamageAssessment, PortError> {
        let images = prompts::of_kind(request, EvidenceKind::Image);
        Ok(DamageAssessment {
            consistency_score: coverage_score(images.len()),
            damage_summary: format!("{} image(s) provided", images.len()),
            estimated_cost: None,
        })
    }

    async fn score_fraud(
        &self,
        request: &AnalysisRequest,
        _document: &DocumentAssessment,
        _damage: &DamageAssessment,
    ) -> Result<FraudAssessment, PortError> {
        let mut risk = 0.05;
        let mut indicators = Vec::new();

        let amount = request.claim.amount.amount();
        if amount > Decimal::from(HIGH_AMOUNT) {
            risk += 0.3;
            indicators.push(format!("amount above {}", HIGH_AMOUNT));
        } else if amount > Decimal::from(ELEVATED_AMOUNT) {
            risk += 0.1;
            indicators.push(format!("amount above {}", ELEVATED_AMOUNT));
        }
        if request.evidence.is_empty() {
            risk += 0.4;
            indicators.push("no evidence attached".to_string());
        }
        if request.claim.description.trim().len() < MIN_DESCRIPTION_LEN {
            risk += 0.1;
            indicators.push("very short description".to_string());
        }

        Ok(FraudAssessment {
            risk_score: Score::clamped(risk),
            indicators,
        })
    }

    async fn reason(
        &self,
        _request: &AnalysisRequest,
        prior: &PriorFindings,
    ) -> Result<ReasoningAssessment, PortError> {
        let confidence = (prior.document.validity_score.value()
            + prior.damage.consistency_score.value()
            + prior.fraud.risk_score.complement().value())
            / 3.0;
        let reasoning = format!(
            "Document validity {}, damage consistency {}, fraud risk {}.",
            prior.document.validity_score, prior.damage.consistency_score, prior.fraud.risk_score
        );
        Ok(ReasoningAssessment {
            confidence: Score::clamped(confidence),
            reasoning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{Claim, ClaimEvidence};
    use crate::decision::DecisionPolicy;
    use crate::claim::ClaimStatus;
    use crate::evaluation::EvaluationFindings;
    use chrono::Utc;
    use core_kernel::{EvidenceId, UserId, UsdcAmount};
    use rust_decimal_macros::dec;

    fn request(amount: Decimal, documents: usize, images: usize) -> AnalysisRequest {
        let claim = Claim::submit(
            UserId::new(),
            "Water leak from upstairs flat damaged the ceiling",
            UsdcAmount::new(amount).unwrap(),
        );
        let evidence = (0..documents)
            .map(|i| (EvidenceKind::Document, format!("invoice-{i}.pdf"), "application/pdf"))
            .chain((0..images).map(|i| (EvidenceKind::Image, format!("photo-{i}.jpg"), "image/jpeg")))
            .map(|(kind, file_name, mime)| ClaimEvidence {
                id: EvidenceId::new(),
                claim_id: claim.id,
                kind,
                uri: format!("gs://claims/{file_name}"),
                file_name,
                mime_type: mime.to_string(),
                created_at: Utc::now(),
            })
            .collect();
        AnalysisRequest { claim, evidence }
    }

    async fn run(request: &AnalysisRequest) -> EvaluationFindings {
        let analyzer = HeuristicAnalyzer::new();
        let document = analyzer.assess_documents(request).await.unwrap();
        let damage = analyzer.assess_damage(request).await.unwrap();
        let fraud = analyzer.score_fraud(request, &document, &damage).await.unwrap();
        let prior = PriorFindings { document, damage, fraud };
        let reasoning = analyzer.reason(request, &prior).await.unwrap();
        EvaluationFindings {
            document: prior.document,
            damage: prior.damage,
            fraud: prior.fraud,
            reasoning,
        }
    }

    #[tokio::test]
    async fn test_well_evidenced_small_claim_is_approved() {
        let request = request(dec!(500), 2, 2);
        let findings = run(&request).await;
        let decision = DecisionPolicy::default().decide(&request.claim, &findings);
        assert_eq!(decision.status, ClaimStatus::Approved);
    }

    #[tokio::test]
    async fn test_claim_without_evidence_needs_review() {
        let request = request(dec!(500), 0, 0);
        let findings = run(&request).await;
        assert!(findings.fraud.indicators.iter().any(|i| i.contains("no evidence")));
        let decision = DecisionPolicy::default().decide(&request.claim, &findings);
        assert_eq!(decision.status, ClaimStatus::NeedsReview);
    }

    #[tokio::test]
    async fn test_large_amount_raises_fraud_risk() {
        let small = run(&request(dec!(500), 1, 1)).await;
        let large = run(&request(dec!(50000), 1, 1)).await;
        assert!(large.fraud.risk_score > small.fraud.risk_score);
    }
}
