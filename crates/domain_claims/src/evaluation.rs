//! Evaluation records and analysis findings
//!
//! Each analysis step produces a typed assessment carrying a [`Score`] in
//! `[0, 1]`. Scores are validated on construction and on deserialization, so
//! an analyzer returning an out-of-range value fails before it reaches the
//! decision policy.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{ClaimId, EvaluationId};
use crate::decision::Decision;
use crate::error::ClaimError;

/// A score in the closed interval `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Score(f64);

impl Score {
    pub fn new(value: f64) -> Result<Self, ClaimError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ClaimError::Validation(format!(
                "score {} is outside [0, 1]",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Clamps an arbitrary value into range (NaN becomes 0)
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// `1 - score`
    pub fn complement(&self) -> Self {
        Self(1.0 - self.0)
    }
}

impl TryFrom<f64> for Score {
    type Error = ClaimError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> f64 {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Document validity step output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAssessment {
    pub validity_score: Score,
    #[serde(default)]
    pub findings: Vec<String>,
    /// Total found on invoices or receipts, if any
    #[serde(default)]
    pub extracted_amount: Option<Decimal>,
}

/// Image damage step output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageAssessment {
    pub consistency_score: Score,
    #[serde(default)]
    pub damage_summary: String,
    #[serde(default)]
    pub estimated_cost: Option<Decimal>,
}

/// Fraud step output; higher means riskier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    pub risk_score: Score,
    #[serde(default)]
    pub indicators: Vec<String>,
}

/// Final reasoning step output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningAssessment {
    pub confidence: Score,
    pub reasoning: String,
}

/// All four step outputs of one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationFindings {
    pub document: DocumentAssessment,
    pub damage: DamageAssessment,
    pub fraud: FraudAssessment,
    pub reasoning: ReasoningAssessment,
}

impl EvaluationFindings {
    pub fn scores(&self) -> AgentScores {
        AgentScores {
            document: self.document.validity_score.value(),
            image: self.damage.consistency_score.value(),
            fraud_risk: self.fraud.risk_score.value(),
            reasoning: self.reasoning.confidence.value(),
        }
    }
}

/// Per-agent sub-scores as persisted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentScores {
    pub document: f64,
    pub image: f64,
    pub fraud_risk: f64,
    pub reasoning: f64,
}

/// The one evaluation record of a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: EvaluationId,
    pub claim_id: ClaimId,
    pub reasoning: String,
    pub scores: AgentScores,
    pub confidence: f64,
    pub findings: EvaluationFindings,
    pub created_at: DateTime<Utc>,
}

impl Evaluation {
    pub fn record(claim_id: ClaimId, findings: EvaluationFindings, decision: &Decision) -> Self {
        Self {
            id: EvaluationId::new_v7(),
            claim_id,
            reasoning: findings.reasoning.reasoning.clone(),
            scores: findings.scores(),
            confidence: decision.confidence.unwrap_or_default(),
            findings,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_score_bounds() {
        assert!(Score::new(0.0).is_ok());
        assert!(Score::new(1.0).is_ok());
        assert!(Score::new(1.01).is_err());
        assert!(Score::new(-0.1).is_err());
        assert!(Score::new(f64::NAN).is_err());
    }

    #[test]
    fn test_out_of_range_score_fails_deserialization() {
        let json = r#"{"risk_score": 1.7, "indicators": []}"#;
        assert!(serde_json::from_str::<FraudAssessment>(json).is_err());

        let json = r#"{"risk_score": 0.2}"#;
        let parsed: FraudAssessment = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.risk_score.value(), 0.2);
        assert!(parsed.indicators.is_empty());
    }

    proptest! {
        #[test]
        fn clamped_is_always_in_range(value in proptest::num::f64::ANY) {
            let score = Score::clamped(value);
            prop_assert!((0.0..=1.0).contains(&score.value()));
        }
    }
}
