//! Claim aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, EvidenceId, UserId, UsdcAmount};
use crate::decision::Decision;
use crate::error::ClaimError;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    /// Submitted by the claimant, awaiting evaluation
    Submitted,
    /// Approved for payout
    Approved,
    /// Evaluation confidence too low, waiting for an insurer
    NeedsReview,
    /// Rejected by an insurer
    Rejected,
    /// Paid out on-chain
    Settled,
}

impl ClaimStatus {
    /// Returns the wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Submitted => "SUBMITTED",
            ClaimStatus::Approved => "APPROVED",
            ClaimStatus::NeedsReview => "NEEDS_REVIEW",
            ClaimStatus::Rejected => "REJECTED",
            ClaimStatus::Settled => "SETTLED",
        }
    }

    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClaimStatus::Rejected | ClaimStatus::Settled)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUBMITTED" => Ok(ClaimStatus::Submitted),
            "APPROVED" => Ok(ClaimStatus::Approved),
            "NEEDS_REVIEW" => Ok(ClaimStatus::NeedsReview),
            "REJECTED" => Ok(ClaimStatus::Rejected),
            "SETTLED" => Ok(ClaimStatus::Settled),
            other => Err(ClaimError::Validation(format!("unknown claim status '{}'", other))),
        }
    }
}

/// Kind of evidence attached to a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// Invoices, police reports, receipts
    Document,
    /// Photos of the damage
    Image,
}

/// A file attached to a claim at submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimEvidence {
    pub id: EvidenceId,
    pub claim_id: ClaimId,
    pub kind: EvidenceKind,
    pub file_name: String,
    pub mime_type: String,
    /// Where the analyzer can fetch the file (object storage or provider file URI)
    pub uri: String,
    pub created_at: DateTime<Utc>,
}

/// Insurer decision on a claim that needs review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// Approve, optionally for less than the requested amount
    Approve { amount: Option<UsdcAmount> },
    /// Reject the claim
    Reject,
}

/// An insurance claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,
    /// Human-facing claim number
    pub claim_number: String,
    /// Submitting user
    pub claimant_id: UserId,
    /// What happened
    pub description: String,
    /// Amount requested by the claimant
    pub amount: UsdcAmount,
    /// Lifecycle status
    pub status: ClaimStatus,
    /// Summary of the latest decision
    pub decision: Option<String>,
    /// Aggregated evaluation confidence
    pub confidence: Option<f64>,
    /// Amount approved for payout
    pub approved_amount: Option<UsdcAmount>,
    /// Settlement transaction hash
    pub tx_hash: Option<String>,
    /// Set while a settlement transfer is in flight
    pub settlement_started_at: Option<DateTime<Utc>>,
    /// When the claim was settled
    pub settled_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Creates a newly submitted claim
    pub fn submit(claimant_id: UserId, description: impl Into<String>, amount: UsdcAmount) -> Self {
        let now = Utc::now();
        let id = ClaimId::new_v7();

        Self {
            id,
            claim_number: generate_claim_number(id, now),
            claimant_id,
            description: description.into(),
            amount,
            status: ClaimStatus::Submitted,
            decision: None,
            confidence: None,
            approved_amount: None,
            tx_hash: None,
            settlement_started_at: None,
            settled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies an evaluation or review decision
    ///
    /// Evaluation decisions are only valid on a submitted claim and review
    /// decisions only on a claim that needs review; both cases are covered by
    /// the transition table.
    pub fn apply_decision(&mut self, decision: &Decision) -> Result<(), ClaimError> {
        if decision.status == ClaimStatus::Approved && decision.approved_amount.is_none() {
            return Err(ClaimError::Validation(
                "an approval must carry an approved amount".to_string(),
            ));
        }
        self.transition(decision.status)?;
        self.decision = Some(decision.summary.clone());
        if decision.confidence.is_some() {
            self.confidence = decision.confidence;
        }
        self.approved_amount = decision.approved_amount;
        Ok(())
    }

    /// Returns the amount to pay out if the claim can be settled now
    pub fn settleable_amount(&self) -> Result<UsdcAmount, ClaimError> {
        if self.status != ClaimStatus::Approved {
            return Err(ClaimError::NotSettleable(format!(
                "claim {} is {}, only APPROVED claims can be settled",
                self.claim_number, self.status
            )));
        }
        let amount = self.approved_amount.ok_or_else(|| {
            ClaimError::NotSettleable(format!(
                "claim {} has no approved amount",
                self.claim_number
            ))
        })?;
        if self.settlement_started_at.is_some() {
            return Err(ClaimError::ConcurrentModification(format!(
                "settlement of claim {} is already in progress",
                self.claim_number
            )));
        }
        Ok(amount)
    }

    /// Marks a settlement as in flight
    pub fn begin_settlement(&mut self) -> Result<UsdcAmount, ClaimError> {
        let amount = self.settleable_amount()?;
        let now = Utc::now();
        self.settlement_started_at = Some(now);
        self.updated_at = now;
        Ok(amount)
    }

    /// Clears an in-flight settlement after a failed transfer
    pub fn release_settlement(&mut self) {
        if self.status == ClaimStatus::Approved {
            self.settlement_started_at = None;
            self.updated_at = Utc::now();
        }
    }

    /// Records the settlement transaction
    pub fn complete_settlement(&mut self, tx_hash: impl Into<String>) -> Result<(), ClaimError> {
        if self.settlement_started_at.is_none() {
            return Err(ClaimError::NotSettleable(format!(
                "claim {} has no settlement in progress",
                self.claim_number
            )));
        }
        self.transition(ClaimStatus::Settled)?;
        self.tx_hash = Some(tx_hash.into());
        self.settled_at = Some(self.updated_at);
        Ok(())
    }

    /// Checks if transition is valid
    pub fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (self.status, target),
            (Submitted, Approved) |
            (Submitted, NeedsReview) |
            (NeedsReview, Approved) |
            (NeedsReview, Rejected) |
            (Approved, Settled)
        )
    }

    fn transition(&mut self, target: ClaimStatus) -> Result<(), ClaimError> {
        if !self.can_transition_to(target) {
            return Err(ClaimError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// `CLM-YYYYMMDD-XXXXXXXXXXXX`, the suffix taken from the low 48 bits of the id
fn generate_claim_number(id: ClaimId, now: DateTime<Utc>) -> String {
    let low_bits = id.as_uuid().as_u128() & 0xFFFF_FFFF_FFFF;
    format!("CLM-{}-{:012X}", now.format("%Y%m%d"), low_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn submitted() -> Claim {
        Claim::submit(UserId::new(), "Hail damage to roof", UsdcAmount::new(dec!(800)).unwrap())
    }

    fn approval(amount: UsdcAmount) -> Decision {
        Decision {
            status: ClaimStatus::Approved,
            confidence: Some(0.9),
            approved_amount: Some(amount),
            summary: "approved".to_string(),
        }
    }

    #[test]
    fn test_new_claim_is_submitted() {
        let claim = submitted();
        assert_eq!(claim.status, ClaimStatus::Submitted);
        assert!(claim.claim_number.starts_with("CLM-"));
        assert!(claim.approved_amount.is_none());
    }

    #[test]
    fn test_claim_numbers_unique_within_a_burst() {
        let claimant = UserId::new();
        let amount = UsdcAmount::new(dec!(100)).unwrap();
        let numbers: std::collections::HashSet<String> = (0..10_000)
            .map(|_| Claim::submit(claimant, "burst", amount).claim_number)
            .collect();
        assert_eq!(numbers.len(), 10_000);
    }

    #[test]
    fn test_claim_number_format() {
        let claim = submitted();
        let parts: Vec<&str> = claim.claim_number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], claim.created_at.format("%Y%m%d").to_string());
        assert_eq!(parts[2].len(), 12);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_transitions_only_move_forward() {
        let mut claim = submitted();
        assert!(claim.can_transition_to(ClaimStatus::Approved));
        assert!(claim.can_transition_to(ClaimStatus::NeedsReview));
        assert!(!claim.can_transition_to(ClaimStatus::Settled));
        assert!(!claim.can_transition_to(ClaimStatus::Rejected));

        claim.apply_decision(&approval(claim.amount)).unwrap();
        assert!(!claim.can_transition_to(ClaimStatus::Submitted));
        assert!(!claim.can_transition_to(ClaimStatus::NeedsReview));
        assert!(claim.can_transition_to(ClaimStatus::Settled));
    }

    #[test]
    fn test_approval_without_amount_is_rejected_without_mutation() {
        let mut claim = submitted();
        let decision = Decision {
            approved_amount: None,
            ..approval(claim.amount)
        };
        assert!(claim.apply_decision(&decision).is_err());
        assert_eq!(claim.status, ClaimStatus::Submitted);
    }

    #[test]
    fn test_submitted_claim_is_not_settleable() {
        let claim = submitted();
        assert!(matches!(claim.settleable_amount(), Err(ClaimError::NotSettleable(_))));
    }

    #[test]
    fn test_settlement_lifecycle() {
        let mut claim = submitted();
        claim.apply_decision(&approval(claim.amount)).unwrap();

        assert!(claim.complete_settlement("0xabc").is_err());

        let amount = claim.begin_settlement().unwrap();
        assert_eq!(amount, claim.amount);
        assert!(matches!(
            claim.begin_settlement(),
            Err(ClaimError::ConcurrentModification(_))
        ));

        claim.release_settlement();
        claim.begin_settlement().unwrap();
        claim.complete_settlement("0xabc").unwrap();

        assert_eq!(claim.status, ClaimStatus::Settled);
        assert_eq!(claim.tx_hash.as_deref(), Some("0xabc"));
        assert!(claim.settled_at.is_some());
        assert!(claim.settleable_amount().is_err());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            ClaimStatus::Submitted,
            ClaimStatus::Approved,
            ClaimStatus::NeedsReview,
            ClaimStatus::Rejected,
            ClaimStatus::Settled,
        ] {
            assert_eq!(status.as_str().parse::<ClaimStatus>().unwrap(), status);
        }
        assert!("PAID".parse::<ClaimStatus>().is_err());
    }
}
