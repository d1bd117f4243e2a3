//! Settlement DTOs

use serde::{Deserialize, Serialize};

use domain_claims::{SettlementOutcome, TransferStatus};

use super::claims::ClaimResponse;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettleRequest {
    /// Pays this address instead of the claimant's linked wallet
    pub recipient: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SettlementResponse {
    pub claim: ClaimResponse,
    pub recipient: String,
    pub tx_hash: String,
    pub status: TransferStatus,
    pub block_number: Option<u64>,
    pub explorer_url: Option<String>,
}

impl From<SettlementOutcome> for SettlementResponse {
    fn from(outcome: SettlementOutcome) -> Self {
        Self {
            recipient: outcome.recipient.as_str().to_string(),
            tx_hash: outcome.receipt.tx_hash,
            status: outcome.receipt.status,
            block_number: outcome.receipt.block_number,
            explorer_url: outcome.receipt.explorer_url,
            claim: outcome.claim.into(),
        }
    }
}
