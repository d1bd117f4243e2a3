//! Property-Based Test Generators
//!
//! Proptest strategies that only produce values the domain accepts.

use core_kernel::{EvmAddress, UsdcAmount, USDC_DECIMALS};
use domain_claims::{
    ClaimStatus, DamageAssessment, DocumentAssessment, EvaluationFindings, FraudAssessment,
    ReasoningAssessment, Score,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Scores in `[0, 1]`, endpoints included
pub fn score_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        1 => Just(0.0),
        1 => Just(1.0),
        8 => 0.0f64..=1.0f64,
    ]
}

/// Positive USDC amounts with up to six decimals, below one trillion
pub fn usdc_amount_strategy() -> impl Strategy<Value = UsdcAmount> {
    (1i64..1_000_000_000_000_000i64).prop_map(|units| {
        UsdcAmount::positive(Decimal::new(units, USDC_DECIMALS)).expect("strategy yields positive amounts")
    })
}

/// Decimals with more precision than USDC can carry
pub fn over_precise_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64, (USDC_DECIMALS + 1)..=12u32)
        .prop_filter("must not reduce to six decimals", |(units, _)| units % 10 != 0)
        .prop_map(|(units, scale)| Decimal::new(units, scale))
}

/// Lowercase EVM addresses
pub fn evm_address_strategy() -> impl Strategy<Value = EvmAddress> {
    "[0-9a-f]{40}".prop_map(|hex| {
        EvmAddress::parse(&format!("0x{}", hex)).expect("strategy yields 40 hex digits")
    })
}

/// Registration emails
pub fn email_strategy() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9]{2,12}", "[a-z]{3,10}").prop_map(|(local, domain)| format!("{}@{}.io", local, domain))
}

pub fn claim_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    prop_oneof![
        Just(ClaimStatus::Submitted),
        Just(ClaimStatus::Approved),
        Just(ClaimStatus::NeedsReview),
        Just(ClaimStatus::Rejected),
        Just(ClaimStatus::Settled),
    ]
}

/// Findings with independent per-agent scores
pub fn findings_strategy() -> impl Strategy<Value = EvaluationFindings> {
    (score_strategy(), score_strategy(), score_strategy(), score_strategy()).prop_map(
        |(document, damage, fraud, reasoning)| EvaluationFindings {
            document: DocumentAssessment {
                validity_score: Score::clamped(document),
                findings: Vec::new(),
                extracted_amount: None,
            },
            damage: DamageAssessment {
                consistency_score: Score::clamped(damage),
                damage_summary: String::new(),
                estimated_cost: None,
            },
            fraud: FraudAssessment {
                risk_score: Score::clamped(fraud),
                indicators: Vec::new(),
            },
            reasoning: ReasoningAssessment {
                confidence: Score::clamped(reasoning),
                reasoning: String::new(),
            },
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_claims::{Claim, DecisionPolicy};
    use core_kernel::UserId;

    proptest! {
        #[test]
        fn prop_amounts_round_trip_base_units(amount in usdc_amount_strategy()) {
            let units = amount.to_base_units().unwrap();
            prop_assert_eq!(UsdcAmount::from_base_units(units).unwrap(), amount);
        }

        #[test]
        fn prop_over_precise_amounts_rejected(amount in over_precise_amount_strategy()) {
            prop_assert!(UsdcAmount::new(amount).is_err());
        }

        #[test]
        fn prop_confidence_stays_in_unit_interval(findings in findings_strategy()) {
            let confidence = DecisionPolicy::default().aggregate(&findings.scores());
            prop_assert!((0.0..=1.0).contains(&confidence));
        }

        #[test]
        fn prop_decision_matches_threshold(findings in findings_strategy(), amount in usdc_amount_strategy()) {
            let policy = DecisionPolicy::default();
            let claim = Claim::submit(UserId::new_v7(), "generated", amount);
            let decision = policy.decide(&claim, &findings);
            let confidence = policy.aggregate(&findings.scores());
            if confidence >= policy.approval_threshold() {
                prop_assert_eq!(decision.status, ClaimStatus::Approved);
                prop_assert_eq!(decision.approved_amount, Some(amount));
            } else {
                prop_assert_eq!(decision.status, ClaimStatus::NeedsReview);
                prop_assert!(decision.approved_amount.is_none());
            }
        }

        #[test]
        fn prop_status_wire_names_round_trip(status in claim_status_strategy()) {
            let json = serde_json::to_value(status).unwrap();
            prop_assert_eq!(json.as_str(), Some(status.as_str()));
        }

        #[test]
        fn prop_emails_are_normalized_lowercase(email in email_strategy()) {
            let user = crate::builders::UserBuilder::new().with_email(email.clone()).build();
            prop_assert_eq!(user.email, email);
        }

        #[test]
        fn prop_addresses_parse_back(address in evm_address_strategy()) {
            prop_assert_eq!(EvmAddress::parse(address.as_str()).unwrap(), address);
        }
    }
}
