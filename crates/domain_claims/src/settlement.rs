//! Settlement of approved claims
//!
//! ```text
//! APPROVED --acquire lock--> transfer --confirmed/pending--> SETTLED
//!                               \--reverted/failed--> release lock (still APPROVED)
//! ```
//!
//! If the transfer went out but the final write fails, the lock is kept so the
//! claim cannot be paid twice; an operator resolves it from the logs.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use core_kernel::{ClaimId, EvmAddress};

use crate::agent_log::{AgentKind, AgentLog};
use crate::claim::Claim;
use crate::error::ClaimError;
use crate::ports::{
    ClaimStore, SettlementPort, TransferReceipt, TransferRequest, TransferStatus, WalletDirectory,
};

/// Result of a settlement
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub claim: Claim,
    pub recipient: EvmAddress,
    pub receipt: TransferReceipt,
}

/// Pays approved claims in USDC
#[derive(Clone)]
pub struct SettlementService {
    store: Arc<dyn ClaimStore>,
    chain: Arc<dyn SettlementPort>,
    wallets: Arc<dyn WalletDirectory>,
}

impl SettlementService {
    pub fn new(
        store: Arc<dyn ClaimStore>,
        chain: Arc<dyn SettlementPort>,
        wallets: Arc<dyn WalletDirectory>,
    ) -> Self {
        Self { store, chain, wallets }
    }

    /// Transfers the approved amount and marks the claim SETTLED
    ///
    /// `recipient` overrides the claimant's linked wallet.
    #[instrument(skip(self))]
    pub async fn settle(
        &self,
        claim_id: ClaimId,
        recipient: Option<EvmAddress>,
    ) -> Result<SettlementOutcome, ClaimError> {
        let claim = self.store.get_claim(claim_id).await?;
        claim.settleable_amount()?;

        let recipient = match recipient {
            Some(address) => address,
            None => self
                .wallets
                .wallet_address(claim.claimant_id)
                .await?
                .ok_or_else(|| ClaimError::MissingRecipient(claim.claim_number.clone()))?,
        };

        let locked = self.store.acquire_settlement(claim_id).await?;
        let amount = locked
            .approved_amount
            .ok_or_else(|| ClaimError::NotSettleable(locked.claim_number.clone()))?;

        self.log(AgentLog::info(
            claim_id,
            AgentKind::Settlement,
            format!("Transferring {} to {}", amount, recipient),
        ))
        .await;

        let request = TransferRequest {
            claim_id,
            recipient: recipient.clone(),
            amount,
        };

        let receipt = match self.chain.transfer(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(claim_id = %claim_id, error = %e, "Settlement transfer failed");
                self.release(claim_id, format!("Transfer failed: {}", e)).await;
                return Err(ClaimError::TransferFailed(e));
            }
        };

        if receipt.status == TransferStatus::Failed {
            warn!(claim_id = %claim_id, tx_hash = %receipt.tx_hash, "Settlement transfer reverted");
            self.release(claim_id, format!("Transfer {} reverted", receipt.tx_hash))
                .await;
            return Err(ClaimError::TransferReverted {
                tx_hash: receipt.tx_hash,
            });
        }

        let settled = match self.store.complete_settlement(claim_id, &receipt.tx_hash).await {
            Ok(claim) => claim,
            Err(e) => {
                error!(
                    claim_id = %claim_id,
                    tx_hash = %receipt.tx_hash,
                    error = %e,
                    "Transfer sent but settlement could not be recorded; lock kept"
                );
                return Err(e.into());
            }
        };

        self.log(
            AgentLog::info(
                claim_id,
                AgentKind::Settlement,
                format!("Settled in transaction {}", receipt.tx_hash),
            )
            .with_data(serde_json::json!({
                "status": receipt.status,
                "block_number": receipt.block_number,
                "recipient": recipient,
            })),
        )
        .await;

        info!(
            claim_id = %claim_id,
            tx_hash = %receipt.tx_hash,
            amount = %amount,
            "Claim settled"
        );

        Ok(SettlementOutcome {
            claim: settled,
            recipient,
            receipt,
        })
    }

    /// Looks up a settlement transaction on chain
    pub async fn transaction_status(&self, tx_hash: &str) -> Result<TransferReceipt, ClaimError> {
        Ok(self.chain.transaction_status(tx_hash).await?)
    }

    async fn release(&self, claim_id: ClaimId, reason: String) {
        if let Err(e) = self.store.release_settlement(claim_id).await {
            error!(claim_id = %claim_id, error = %e, "Failed to release settlement lock");
        }
        self.log(AgentLog::error(claim_id, AgentKind::Settlement, reason)).await;
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
    use crate::claim::ClaimStatus;
    use crate::decision::Decision;
    use crate::ports::mock::{MockClaimStore, MockSettlement, MockTransferMode, MockWalletDirectory};
    use core_kernel::{UserId, UsdcAmount};
    use rust_decimal_macros::dec;

    struct Fixture {
        service: SettlementService,
        store: MockClaimStore,
        chain: Arc<MockSettlement>,
        claim: Claim,
    }

    fn wallet() -> EvmAddress {
        EvmAddress::parse("0x1111111111111111111111111111111111111111").unwrap()
    }

    async fn fixture(mode: MockTransferMode, approved: bool) -> Fixture {
        let store = MockClaimStore::new();
        let wallets = MockWalletDirectory::new();
        let chain = Arc::new(MockSettlement::new(mode));

        let mut claim = Claim::submit(UserId::new(), "Stolen bike", UsdcAmount::new(dec!(350)).unwrap());
        if approved {
            claim
                .apply_decision(&Decision {
                    status: ClaimStatus::Approved,
                    confidence: Some(0.9),
                    approved_amount: Some(claim.amount),
                    summary: "ok".to_string(),
                })
                .unwrap();
        }
        store.put_claim(claim.clone()).await;
        wallets.link(claim.claimant_id, wallet()).await;

        let service = SettlementService::new(
            Arc::new(store.clone()),
            chain.clone(),
            Arc::new(wallets),
        );
        Fixture { service, store, chain, claim }
    }

    #[tokio::test]
    async fn test_settles_approved_claim_once() {
        let f = fixture(MockTransferMode::Confirm, true).await;

        let outcome = f.service.settle(f.claim.id, None).await.unwrap();
        assert_eq!(outcome.claim.status, ClaimStatus::Settled);
        assert_eq!(outcome.claim.tx_hash.as_deref(), Some(outcome.receipt.tx_hash.as_str()));
        assert_eq!(outcome.recipient, wallet());

        let again = f.service.settle(f.claim.id, None).await;
        assert!(matches!(again, Err(ClaimError::NotSettleable(_))));
        assert_eq!(f.chain.transfers().await.len(), 1);
    }

    #[tokio::test]
    async fn test_submitted_claim_cannot_be_settled() {
        let f = fixture(MockTransferMode::Confirm, false).await;
        let err = f.service.settle(f.claim.id, None).await.unwrap_err();
        assert!(matches!(err, ClaimError::NotSettleable(_)));
        assert!(f.chain.transfers().await.is_empty());
    }

    #[tokio::test]
    async fn test_reverted_transfer_leaves_claim_settleable() {
        let f = fixture(MockTransferMode::Revert, true).await;

        let err = f.service.settle(f.claim.id, None).await.unwrap_err();
        assert!(matches!(err, ClaimError::TransferReverted { .. }));

        let stored = f.store.get_claim(f.claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Approved);
        assert!(stored.settlement_started_at.is_none());

        f.chain.set_mode(MockTransferMode::Confirm);
        let outcome = f.service.settle(f.claim.id, None).await.unwrap();
        assert_eq!(outcome.claim.status, ClaimStatus::Settled);
    }

    #[tokio::test]
    async fn test_unreachable_chain_releases_lock() {
        let f = fixture(MockTransferMode::Unreachable, true).await;

        let err = f.service.settle(f.claim.id, None).await.unwrap_err();
        assert!(matches!(err, ClaimError::TransferFailed(_)));
        assert!(f.store.get_claim(f.claim.id).await.unwrap().settlement_started_at.is_none());
    }

    #[tokio::test]
    async fn test_pending_receipt_still_settles() {
        let f = fixture(MockTransferMode::Timeout, true).await;
        let outcome = f.service.settle(f.claim.id, None).await.unwrap();
        assert_eq!(outcome.receipt.status, TransferStatus::Pending);
        assert_eq!(outcome.claim.status, ClaimStatus::Settled);
    }

    #[tokio::test]
    async fn test_explicit_recipient_overrides_wallet() {
        let f = fixture(MockTransferMode::Confirm, true).await;
        let other = EvmAddress::parse("0x2222222222222222222222222222222222222222").unwrap();

        f.service.settle(f.claim.id, Some(other.clone())).await.unwrap();
        assert_eq!(f.chain.transfers().await[0].1.recipient, other);
    }

    #[tokio::test]
    async fn test_locked_claim_conflicts() {
        let f = fixture(MockTransferMode::Confirm, true).await;
        f.store.acquire_settlement(f.claim.id).await.unwrap();

        let err = f.service.settle(f.claim.id, None).await.unwrap_err();
        assert!(matches!(err, ClaimError::ConcurrentModification(_)));
    }
}
