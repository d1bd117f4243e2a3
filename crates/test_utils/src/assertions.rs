//! Custom Test Assertions
//!
//! Lifecycle and trace assertions with messages that name the claim.

use core_kernel::UsdcAmount;
use domain_claims::{AgentKind, AgentLog, Claim, ClaimStatus, LogLevel};

/// Asserts the claim is in `expected`
pub fn assert_claim_status(claim: &Claim, expected: ClaimStatus) {
    assert_eq!(
        claim.status, expected,
        "claim {} is {}, expected {}",
        claim.claim_number, claim.status, expected
    );
}

/// Asserts the claim was paid exactly once with a recorded transaction
pub fn assert_settled(claim: &Claim) {
    assert_claim_status(claim, ClaimStatus::Settled);
    assert!(
        claim.tx_hash.is_some(),
        "settled claim {} has no transaction hash",
        claim.claim_number
    );
    assert!(
        claim.settled_at.is_some(),
        "settled claim {} has no settlement time",
        claim.claim_number
    );
}

/// Asserts the claim is approved, idle and will pay `amount`
pub fn assert_awaiting_settlement(claim: &Claim, amount: UsdcAmount) {
    assert_claim_status(claim, ClaimStatus::Approved);
    assert_eq!(
        claim.approved_amount,
        Some(amount),
        "claim {} approved for the wrong amount",
        claim.claim_number
    );
    assert!(
        claim.settlement_started_at.is_none(),
        "claim {} still holds a settlement lock",
        claim.claim_number
    );
    assert!(claim.tx_hash.is_none());
}

/// Asserts some log entry came from `agent` at `level`
pub fn assert_logged(logs: &[AgentLog], agent: AgentKind, level: LogLevel) {
    assert!(
        logs.iter().any(|l| l.agent == agent && l.level == level),
        "no {:?} entry from {:?} among {} log(s)",
        level,
        agent,
        logs.len()
    );
}

/// Asserts no entry in the trace is an error
pub fn assert_no_errors(logs: &[AgentLog]) {
    if let Some(entry) = logs.iter().find(|l| l.level == LogLevel::Error) {
        panic!("unexpected error from {:?}: {}", entry.agent, entry.message);
    }
}

/// Asserts log timestamps never go backwards
pub fn assert_chronological(logs: &[AgentLog]) {
    for pair in logs.windows(2) {
        assert!(
            pair[0].created_at <= pair[1].created_at,
            "log entries out of order: {:?} after {:?}",
            pair[1].message,
            pair[0].message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::ClaimBuilder;
    use crate::fixtures::AmountFixtures;

    #[test]
    fn test_assert_settled_passes_for_settled_claim() {
        assert_settled(&ClaimBuilder::new().with_status(ClaimStatus::Settled).build());
    }

    #[test]
    #[should_panic(expected = "expected SETTLED")]
    fn test_assert_settled_fails_for_approved_claim() {
        assert_settled(&ClaimBuilder::new().with_status(ClaimStatus::Approved).build());
    }

    #[test]
    fn test_awaiting_settlement() {
        let claim = ClaimBuilder::new().with_status(ClaimStatus::Approved).build();
        assert_awaiting_settlement(&claim, AmountFixtures::usdc_1250());
    }

    #[test]
    fn test_log_assertions() {
        let claim = ClaimBuilder::new().build();
        let logs = vec![
            AgentLog::info(claim.id, AgentKind::Orchestrator, "evaluation started"),
            AgentLog::warning(claim.id, AgentKind::Fraud, "invoice date precedes incident"),
        ];
        assert_logged(&logs, AgentKind::Fraud, LogLevel::Warning);
        assert_no_errors(&logs);
        assert_chronological(&logs);
    }

    #[test]
    #[should_panic(expected = "unexpected error")]
    fn test_assert_no_errors_fails_on_error_entry() {
        let claim = ClaimBuilder::new().build();
        assert_no_errors(&[AgentLog::error(claim.id, AgentKind::Image, "analysis failed")]);
    }
}
