//! Pre-built Test Fixtures
//!
//! Ready-to-use data for the entities the claims pipeline passes around.
//! Values are fixed so assertions can compare against them directly.

use chrono::Utc;
use core_kernel::{ClaimId, EvidenceId, EvmAddress, UsdcAmount, UserId};
use domain_claims::{
    ClaimEvidence, DamageAssessment, DocumentAssessment, EvaluationFindings, EvidenceKind,
    FraudAssessment, NewClaimRequest, NewEvidence, ReasoningAssessment, Score,
};
use domain_identity::{Role, User};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Password every fixture user is registered with
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Fixture for USDC amounts
pub struct AmountFixtures;

impl AmountFixtures {
    /// A typical small claim
    pub fn usdc_500() -> UsdcAmount {
        UsdcAmount::positive(dec!(500)).unwrap()
    }

    /// The amount the API tests submit
    pub fn usdc_1250() -> UsdcAmount {
        UsdcAmount::positive(dec!(1250.00)).unwrap()
    }

    /// Smallest representable USDC amount
    pub fn one_base_unit() -> UsdcAmount {
        UsdcAmount::from_base_units(1).unwrap()
    }

    pub fn zero() -> UsdcAmount {
        UsdcAmount::zero()
    }
}

/// Fixture for EVM addresses
pub struct AddressFixtures;

impl AddressFixtures {
    /// Claimant payout address
    pub fn payout() -> EvmAddress {
        EvmAddress::parse("0x2c7536e3605d9c16a7a3d7b1898e529396a65c23").unwrap()
    }

    /// A second, unrelated address for override-recipient cases
    pub fn alternate() -> EvmAddress {
        EvmAddress::parse("0x8ba1f109551bd432803012645ac136ddd64dba72").unwrap()
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    /// Deterministic claimant ID
    pub fn claimant_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("0192a7c4-5b1e-7f00-8a3d-4c2b1e0f0001").unwrap())
    }

    /// Deterministic insurer ID
    pub fn insurer_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("0192a7c4-5b1e-7f00-8a3d-4c2b1e0f0002").unwrap())
    }

    /// Deterministic claim ID
    pub fn claim_id() -> ClaimId {
        ClaimId::from_uuid(Uuid::parse_str("0192a7c4-5b1e-7f00-8a3d-4c2b1e0f0003").unwrap())
    }
}

/// Fixture for users
///
/// Password hashes are real but cheap to recompute, so fixtures can be used
/// with `AccountService::authenticate`.
pub struct UserFixtures;

impl UserFixtures {
    pub fn claimant() -> User {
        crate::builders::UserBuilder::new()
            .with_email("claimant@claimledger.io")
            .build()
    }

    pub fn insurer() -> User {
        crate::builders::UserBuilder::new()
            .with_email("insurer@claimledger.io")
            .with_role(Role::Insurer)
            .build()
    }

    /// Claimant with an external payout address linked
    pub fn claimant_with_wallet() -> User {
        crate::builders::UserBuilder::new()
            .with_email("paid-claimant@claimledger.io")
            .with_external_wallet(AddressFixtures::payout())
            .build()
    }
}

/// Fixture for claim evidence
pub struct EvidenceFixtures;

impl EvidenceFixtures {
    /// Repair invoice document
    pub fn invoice(claim_id: ClaimId) -> ClaimEvidence {
        ClaimEvidence {
            id: EvidenceId::new_v7(),
            claim_id,
            kind: EvidenceKind::Document,
            file_name: "repair-invoice.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            uri: "gs://claimledger-evidence/repair-invoice.pdf".to_string(),
            created_at: Utc::now(),
        }
    }

    /// Photo of the damage
    pub fn damage_photo(claim_id: ClaimId) -> ClaimEvidence {
        ClaimEvidence {
            id: EvidenceId::new_v7(),
            claim_id,
            kind: EvidenceKind::Image,
            file_name: "rear-bumper.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            uri: "gs://claimledger-evidence/rear-bumper.jpg".to_string(),
            created_at: Utc::now(),
        }
    }

    /// The invoice and photo pair, as submitted
    pub fn submission() -> Vec<NewEvidence> {
        vec![
            NewEvidence {
                kind: EvidenceKind::Document,
                file_name: "repair-invoice.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                uri: "gs://claimledger-evidence/repair-invoice.pdf".to_string(),
            },
            NewEvidence {
                kind: EvidenceKind::Image,
                file_name: "rear-bumper.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                uri: "gs://claimledger-evidence/rear-bumper.jpg".to_string(),
            },
        ]
    }
}

/// Fixture for claim submissions
pub struct SubmissionFixtures;

impl SubmissionFixtures {
    /// A well-formed submission with invoice and photo
    pub fn rear_bumper() -> NewClaimRequest {
        NewClaimRequest {
            description: "Rear bumper cracked by a reversing delivery van".to_string(),
            amount: dec!(1250.00),
            evidence: EvidenceFixtures::submission(),
        }
    }

    /// Submission with the given amount and no evidence
    pub fn without_evidence(amount: Decimal) -> NewClaimRequest {
        NewClaimRequest {
            description: "Cracked windscreen".to_string(),
            amount,
            evidence: Vec::new(),
        }
    }
}

/// Fixture for analysis findings
pub struct FindingsFixtures;

impl FindingsFixtures {
    /// Findings where every specialist agrees with `score`
    ///
    /// The fraud risk is the complement, so the aggregate confidence equals
    /// `score` under the default weighting.
    pub fn uniform(score: f64) -> EvaluationFindings {
        let s = Score::clamped(score);
        EvaluationFindings {
            document: DocumentAssessment {
                validity_score: s,
                findings: vec!["invoice total matches the claimed amount".to_string()],
                extracted_amount: Some(dec!(1250.00)),
            },
            damage: DamageAssessment {
                consistency_score: s,
                damage_summary: "cracked rear bumper, paint transfer".to_string(),
                estimated_cost: Some(dec!(1200.00)),
            },
            fraud: FraudAssessment {
                risk_score: s.complement(),
                indicators: Vec::new(),
            },
            reasoning: ReasoningAssessment {
                confidence: s,
                reasoning: "evidence is consistent with the description".to_string(),
            },
        }
    }

    /// Findings clearly above the default approval threshold
    pub fn strong() -> EvaluationFindings {
        Self::uniform(0.95)
    }

    /// Findings that route a claim to manual review
    pub fn weak() -> EvaluationFindings {
        let mut findings = Self::uniform(0.5);
        findings.fraud.indicators = vec!["invoice date precedes the incident".to_string()];
        findings
    }
}
