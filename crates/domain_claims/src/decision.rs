//! Decision policy
//!
//! Turns step findings (or an insurer review) into the next claim status.

use serde::{Deserialize, Serialize};

use core_kernel::UsdcAmount;
use crate::claim::{Claim, ClaimStatus, ReviewOutcome};
use crate::error::ClaimError;
use crate::evaluation::{AgentScores, EvaluationFindings};

/// Confidence at or above which a claim is approved without review
pub const DEFAULT_APPROVAL_THRESHOLD: f64 = 0.85;

/// Outcome applied to a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub status: ClaimStatus,
    /// Aggregated confidence; absent for manual reviews
    pub confidence: Option<f64>,
    pub approved_amount: Option<UsdcAmount>,
    pub summary: String,
}

/// Thresholding policy for automatic decisions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    approval_threshold: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
        }
    }
}

impl DecisionPolicy {
    /// Creates a policy; the threshold must lie in `(0, 1]`
    pub fn new(approval_threshold: f64) -> Result<Self, ClaimError> {
        if !approval_threshold.is_finite() || approval_threshold <= 0.0 || approval_threshold > 1.0 {
            return Err(ClaimError::Validation(format!(
                "approval threshold {} must be in (0, 1]",
                approval_threshold
            )));
        }
        Ok(Self { approval_threshold })
    }

    pub fn approval_threshold(&self) -> f64 {
        self.approval_threshold
    }

    /// Mean of document validity, image consistency, inverted fraud risk and
    /// reasoning confidence
    pub fn aggregate(&self, scores: &AgentScores) -> f64 {
        let sum = scores.document + scores.image + (1.0 - scores.fraud_risk) + scores.reasoning;
        (sum / 4.0).clamp(0.0, 1.0)
    }

    /// Decides the status a submitted claim moves to after evaluation
    pub fn decide(&self, claim: &Claim, findings: &EvaluationFindings) -> Decision {
        let confidence = self.aggregate(&findings.scores());

        if confidence >= self.approval_threshold {
            Decision {
                status: ClaimStatus::Approved,
                confidence: Some(confidence),
                approved_amount: Some(claim.amount),
                summary: format!(
                    "Approved automatically with confidence {:.2}",
                    confidence
                ),
            }
        } else {
            Decision {
                status: ClaimStatus::NeedsReview,
                confidence: Some(confidence),
                approved_amount: None,
                summary: format!(
                    "Needs manual review: confidence {:.2} is below {:.2}",
                    confidence, self.approval_threshold
                ),
            }
        }
    }

    /// Decides the outcome of an insurer review
    pub fn review(&self, claim: &Claim, outcome: &ReviewOutcome, notes: Option<&str>) -> Result<Decision, ClaimError> {
        if claim.status != ClaimStatus::NeedsReview {
            return Err(ClaimError::InvalidStatusTransition {
                from: claim.status.to_string(),
                to: match outcome {
                    ReviewOutcome::Approve { .. } => ClaimStatus::Approved.to_string(),
                    ReviewOutcome::Reject => ClaimStatus::Rejected.to_string(),
                },
            });
        }

        let suffix = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| format!(": {}", n))
            .unwrap_or_default();

        match outcome {
            ReviewOutcome::Approve { amount } => {
                let approved = amount.unwrap_or(claim.amount);
                if approved.is_zero() {
                    return Err(ClaimError::Validation(
                        "approved amount must be positive".to_string(),
                    ));
                }
                if approved > claim.amount {
                    return Err(ClaimError::Validation(format!(
                        "approved amount {} exceeds requested {}",
                        approved, claim.amount
                    )));
                }
                Ok(Decision {
                    status: ClaimStatus::Approved,
                    confidence: None,
                    approved_amount: Some(approved),
                    summary: format!("Approved on review for {}{}", approved, suffix),
                })
            }
            ReviewOutcome::Reject => Ok(Decision {
                status: ClaimStatus::Rejected,
                confidence: None,
                approved_amount: None,
                summary: format!("Rejected on review{}", suffix),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::UserId;
    use rust_decimal_macros::dec;
    use crate::evaluation::{
        DamageAssessment, DocumentAssessment, FraudAssessment, ReasoningAssessment, Score,
    };

    fn findings(document: f64, image: f64, fraud: f64, reasoning: f64) -> EvaluationFindings {
        EvaluationFindings {
            document: DocumentAssessment {
                validity_score: Score::new(document).unwrap(),
                findings: vec![],
                extracted_amount: None,
            },
            damage: DamageAssessment {
                consistency_score: Score::new(image).unwrap(),
                damage_summary: String::new(),
                estimated_cost: None,
            },
            fraud: FraudAssessment {
                risk_score: Score::new(fraud).unwrap(),
                indicators: vec![],
            },
            reasoning: ReasoningAssessment {
                confidence: Score::new(reasoning).unwrap(),
                reasoning: "ok".to_string(),
            },
        }
    }

    fn claim() -> Claim {
        Claim::submit(UserId::new(), "Burst pipe", UsdcAmount::new(dec!(1250)).unwrap())
    }

    #[test]
    fn test_high_confidence_approves_requested_amount() {
        let claim = claim();
        let decision = DecisionPolicy::default().decide(&claim, &findings(0.95, 0.9, 0.05, 0.9));
        assert_eq!(decision.status, ClaimStatus::Approved);
        assert_eq!(decision.approved_amount, Some(claim.amount));
        assert!(decision.confidence.unwrap() >= DEFAULT_APPROVAL_THRESHOLD);
    }

    #[test]
    fn test_low_confidence_needs_review() {
        let decision = DecisionPolicy::default().decide(&claim(), &findings(0.6, 0.7, 0.4, 0.6));
        assert_eq!(decision.status, ClaimStatus::NeedsReview);
        assert!(decision.approved_amount.is_none());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = DecisionPolicy::new(0.75).unwrap();
        // (1.0 + 0.5 + 1.0 + 0.5) / 4 = 0.75
        let decision = policy.decide(&claim(), &findings(1.0, 0.5, 0.0, 0.5));
        assert_eq!(decision.status, ClaimStatus::Approved);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(DecisionPolicy::new(0.0).is_err());
        assert!(DecisionPolicy::new(1.5).is_err());
        assert!(DecisionPolicy::new(1.0).is_ok());
    }

    #[test]
    fn test_review_requires_needs_review() {
        let claim = claim();
        let result = DecisionPolicy::default().review(&claim, &ReviewOutcome::Reject, None);
        assert!(matches!(result, Err(ClaimError::InvalidStatusTransition { .. })));
    }

    #[test]
    fn test_review_approval_cannot_exceed_request() {
        let mut claim = claim();
        claim.status = ClaimStatus::NeedsReview;
        let policy = DecisionPolicy::default();

        let too_much = ReviewOutcome::Approve {
            amount: Some(UsdcAmount::new(dec!(5000)).unwrap()),
        };
        assert!(matches!(policy.review(&claim, &too_much, None), Err(ClaimError::Validation(_))));

        let partial = ReviewOutcome::Approve {
            amount: Some(UsdcAmount::new(dec!(1000)).unwrap()),
        };
        let decision = policy.review(&claim, &partial, Some("receipt covers 1000")).unwrap();
        assert_eq!(decision.status, ClaimStatus::Approved);
        assert_eq!(decision.approved_amount.unwrap().amount(), dec!(1000));
        assert!(decision.summary.contains("receipt covers 1000"));
    }

    #[test]
    fn test_review_summary_states_exact_amount() {
        let mut claim = claim();
        claim.status = ClaimStatus::NeedsReview;
        let partial = ReviewOutcome::Approve {
            amount: Some(UsdcAmount::new(dec!(12.345678)).unwrap()),
        };
        let decision = DecisionPolicy::default().review(&claim, &partial, None).unwrap();
        assert_eq!(decision.summary, "Approved on review for 12.345678 USDC");
    }

    proptest::proptest! {
        #[test]
        fn decision_matches_threshold(
            d in 0.0f64..=1.0, i in 0.0f64..=1.0, f in 0.0f64..=1.0, r in 0.0f64..=1.0
        ) {
            let claim = claim();
            let decision = DecisionPolicy::default().decide(&claim, &findings(d, i, f, r));
            let confidence = decision.confidence.unwrap();
            proptest::prop_assert!((0.0..=1.0).contains(&confidence));
            if confidence >= DEFAULT_APPROVAL_THRESHOLD {
                proptest::prop_assert_eq!(decision.status, ClaimStatus::Approved);
                proptest::prop_assert_eq!(decision.approved_amount, Some(claim.amount));
            } else {
                proptest::prop_assert_eq!(decision.status, ClaimStatus::NeedsReview);
                proptest::prop_assert!(decision.approved_amount.is_none());
            }
        }
    }
}
