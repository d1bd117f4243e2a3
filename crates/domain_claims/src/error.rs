//! Claims domain errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError};
use crate::agent_log::AgentKind;

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Claim not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Claim already evaluated: {0}")]
    AlreadyEvaluated(String),

    #[error("Claim cannot be settled: {0}")]
    NotSettleable(String),

    #[error("No wallet to pay claim {0}")]
    MissingRecipient(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("{step} analysis failed: {source}")]
    AnalysisFailed {
        step: AgentKind,
        #[source]
        source: PortError,
    },

    #[error("Settlement transfer failed: {0}")]
    TransferFailed(#[source] PortError),

    #[error("Settlement transfer {tx_hash} reverted")]
    TransferReverted { tx_hash: String },

    #[error("Invalid amount: {0}")]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Port(PortError),
}

impl From<PortError> for ClaimError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => {
                ClaimError::NotFound(format!("{} {}", entity_type, id))
            }
            PortError::Conflict { message } => ClaimError::ConcurrentModification(message),
            other => ClaimError::Port(other),
        }
    }
}

impl ClaimError {
    /// Returns true if the caller sent a request the claim cannot accept
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ClaimError::Validation(_)
                | ClaimError::InvalidStatusTransition { .. }
                | ClaimError::AlreadyEvaluated(_)
                | ClaimError::NotSettleable(_)
                | ClaimError::MissingRecipient(_)
                | ClaimError::Money(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_errors_are_mapped() {
        let not_found: ClaimError = PortError::not_found("Claim", "CLM-1").into();
        assert!(matches!(not_found, ClaimError::NotFound(_)));

        let conflict: ClaimError = PortError::conflict("status changed").into();
        assert!(matches!(conflict, ClaimError::ConcurrentModification(_)));

        let other: ClaimError = PortError::internal("boom").into();
        assert!(matches!(other, ClaimError::Port(_)));
        assert!(!other.is_client_error());
    }
}
