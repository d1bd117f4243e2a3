//! Test Data Builders
//!
//! Builders for users, claims and findings. Tests set only the fields they
//! care about; claims are walked through the real lifecycle methods so a
//! built claim is always one the domain could have produced.

use core_kernel::{EvmAddress, UsdcAmount, UserId};
use domain_claims::{
    Claim, ClaimEvidence, ClaimStatus, DecisionPolicy, EvaluationFindings, ReviewOutcome,
};
use domain_identity::{hash_password, Role, User, WalletLink};
use once_cell::sync::Lazy;

use crate::fixtures::{AmountFixtures, EvidenceFixtures, FindingsFixtures, TEST_PASSWORD};

/// Hash of [`TEST_PASSWORD`], computed once per test binary
static TEST_PASSWORD_HASH: Lazy<String> =
    Lazy::new(|| hash_password(TEST_PASSWORD).expect("hashing the test password"));

/// Builder for users
pub struct UserBuilder {
    email: String,
    password: Option<String>,
    role: Role,
    wallet: Option<WalletLink>,
}

impl Default for UserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UserBuilder {
    /// A claimant with [`TEST_PASSWORD`] and no wallet
    pub fn new() -> Self {
        Self {
            email: "claimant@claimledger.io".to_string(),
            password: None,
            role: Role::Claimant,
            wallet: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Uses a password other than [`TEST_PASSWORD`]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Links a self-custodied payout address
    pub fn with_external_wallet(mut self, address: EvmAddress) -> Self {
        self.wallet = Some(WalletLink::External(address));
        self
    }

    /// Links a provider-managed wallet
    pub fn with_custodial_wallet(mut self, wallet_id: impl Into<String>, address: EvmAddress) -> Self {
        self.wallet = Some(WalletLink::Custodial {
            wallet_id: wallet_id.into(),
            address,
        });
        self
    }

    pub fn build(self) -> User {
        let hash = match &self.password {
            Some(password) => hash_password(password).expect("hashing a test password"),
            None => TEST_PASSWORD_HASH.clone(),
        };
        let mut user = User::register(&self.email, hash, self.role);
        if let Some(link) = &self.wallet {
            user.link_wallet(link).expect("fresh user has no wallet");
        }
        user
    }
}

/// Builder for claims at any point of the lifecycle
pub struct ClaimBuilder {
    claimant_id: UserId,
    description: String,
    amount: UsdcAmount,
    status: ClaimStatus,
    approved_amount: Option<UsdcAmount>,
    tx_hash: String,
    with_evidence: bool,
}

impl Default for ClaimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimBuilder {
    /// A submitted 1250 USDC claim from a fresh claimant
    pub fn new() -> Self {
        Self {
            claimant_id: UserId::new_v7(),
            description: "Rear bumper cracked by a reversing delivery van".to_string(),
            amount: AmountFixtures::usdc_1250(),
            status: ClaimStatus::Submitted,
            approved_amount: None,
            tx_hash: format!("0x{:064x}", 1),
            with_evidence: true,
        }
    }

    pub fn with_claimant(mut self, claimant_id: UserId) -> Self {
        self.claimant_id = claimant_id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_amount(mut self, amount: UsdcAmount) -> Self {
        self.amount = amount;
        self
    }

    /// Target status; intermediate transitions are applied in order
    pub fn with_status(mut self, status: ClaimStatus) -> Self {
        self.status = status;
        self
    }

    /// Approved amount used when the claim passes through manual review
    pub fn with_approved_amount(mut self, amount: UsdcAmount) -> Self {
        self.approved_amount = Some(amount);
        self
    }

    /// Hash recorded when the target status is SETTLED
    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tx_hash = tx_hash.into();
        self
    }

    pub fn without_evidence(mut self) -> Self {
        self.with_evidence = false;
        self
    }

    /// Builds the claim only
    pub fn build(self) -> Claim {
        self.build_with_evidence().0
    }

    /// Builds the claim with an invoice and a damage photo attached
    pub fn build_with_evidence(self) -> (Claim, Vec<ClaimEvidence>) {
        let policy = DecisionPolicy::default();
        let mut claim = Claim::submit(self.claimant_id, self.description, self.amount);

        match self.status {
            ClaimStatus::Submitted => {}
            ClaimStatus::NeedsReview => {
                apply_evaluation(&policy, &mut claim, &FindingsFixtures::weak());
            }
            ClaimStatus::Rejected => {
                apply_evaluation(&policy, &mut claim, &FindingsFixtures::weak());
                apply_review(&policy, &mut claim, ReviewOutcome::Reject);
            }
            ClaimStatus::Approved | ClaimStatus::Settled => match self.approved_amount {
                Some(amount) => {
                    apply_evaluation(&policy, &mut claim, &FindingsFixtures::weak());
                    apply_review(
                        &policy,
                        &mut claim,
                        ReviewOutcome::Approve {
                            amount: Some(amount),
                        },
                    );
                }
                None => apply_evaluation(&policy, &mut claim, &FindingsFixtures::strong()),
            },
        }

        if self.status == ClaimStatus::Settled {
            claim.begin_settlement().expect("approved claim is settleable");
            claim
                .complete_settlement(self.tx_hash)
                .expect("settlement was started");
        }

        let evidence = if self.with_evidence {
            vec![
                EvidenceFixtures::invoice(claim.id),
                EvidenceFixtures::damage_photo(claim.id),
            ]
        } else {
            Vec::new()
        };
        (claim, evidence)
    }
}

fn apply_evaluation(policy: &DecisionPolicy, claim: &mut Claim, findings: &EvaluationFindings) {
    let decision = policy.decide(claim, findings);
    claim
        .apply_decision(&decision)
        .expect("submitted claim accepts an evaluation");
}

fn apply_review(policy: &DecisionPolicy, claim: &mut Claim, outcome: ReviewOutcome) {
    let decision = policy
        .review(claim, &outcome, Some("reviewed in test"))
        .expect("claim is awaiting review");
    claim
        .apply_decision(&decision)
        .expect("claim accepts the review decision");
}

/// Builder for analysis findings with per-agent scores
pub struct FindingsBuilder {
    findings: EvaluationFindings,
}

impl Default for FindingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FindingsBuilder {
    /// Starts from findings that approve under the default threshold
    pub fn new() -> Self {
        Self {
            findings: FindingsFixtures::strong(),
        }
    }

    pub fn document(mut self, score: f64) -> Self {
        self.findings.document.validity_score = domain_claims::Score::clamped(score);
        self
    }

    pub fn damage(mut self, score: f64) -> Self {
        self.findings.damage.consistency_score = domain_claims::Score::clamped(score);
        self
    }

    pub fn fraud_risk(mut self, score: f64) -> Self {
        self.findings.fraud.risk_score = domain_claims::Score::clamped(score);
        self
    }

    pub fn reasoning(mut self, score: f64) -> Self {
        self.findings.reasoning.confidence = domain_claims::Score::clamped(score);
        self
    }

    pub fn indicator(mut self, indicator: impl Into<String>) -> Self {
        self.findings.fraud.indicators.push(indicator.into());
        self
    }

    pub fn build(self) -> EvaluationFindings {
        self.findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::AddressFixtures;
    use domain_identity::verify_password;
    use rust_decimal_macros::dec;

    #[test]
    fn test_user_builder_uses_shared_password() {
        let user = UserBuilder::new().build();
        assert!(verify_password(TEST_PASSWORD, &user.password_hash));
        assert_eq!(user.role, Role::Claimant);
    }

    #[test]
    fn test_user_builder_links_custodial_wallet() {
        let user = UserBuilder::new()
            .with_custodial_wallet("wallet-1", AddressFixtures::payout())
            .build();
        assert_eq!(user.wallet_id.as_deref(), Some("wallet-1"));
        assert_eq!(user.wallet_address, Some(AddressFixtures::payout()));
    }

    #[test]
    fn test_claim_builder_reaches_every_status() {
        for status in [
            ClaimStatus::Submitted,
            ClaimStatus::Approved,
            ClaimStatus::NeedsReview,
            ClaimStatus::Rejected,
            ClaimStatus::Settled,
        ] {
            let claim = ClaimBuilder::new().with_status(status).build();
            assert_eq!(claim.status, status);
        }
    }

    #[test]
    fn test_reviewed_approval_uses_reduced_amount() {
        let reduced = UsdcAmount::positive(dec!(900)).unwrap();
        let claim = ClaimBuilder::new()
            .with_status(ClaimStatus::Approved)
            .with_approved_amount(reduced)
            .build();
        assert_eq!(claim.approved_amount, Some(reduced));
    }

    #[test]
    fn test_settled_claim_carries_tx_hash() {
        let (claim, evidence) = ClaimBuilder::new()
            .with_status(ClaimStatus::Settled)
            .with_tx_hash("0xabc")
            .build_with_evidence();
        assert_eq!(claim.tx_hash.as_deref(), Some("0xabc"));
        assert!(claim.settled_at.is_some());
        assert_eq!(evidence.len(), 2);
        assert!(evidence.iter().all(|e| e.claim_id == claim.id));
    }

    #[test]
    fn test_findings_builder_lowers_confidence() {
        let policy = DecisionPolicy::default();
        let findings = FindingsBuilder::new().fraud_risk(0.9).document(0.3).build();
        assert!(policy.aggregate(&findings.scores()) < policy.approval_threshold());
    }
}
