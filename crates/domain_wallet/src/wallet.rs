//! Wallet and balance types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::EvmAddress;

/// Provider-side wallet state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletState {
    Live,
    Frozen,
}

/// A wallet held by the custodial provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustodialWallet {
    /// Provider wallet id
    pub id: String,
    pub address: EvmAddress,
    /// Provider chain identifier, e.g. `ARC-TESTNET`
    pub blockchain: String,
    pub state: WalletState,
    pub wallet_set_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Balance of one token held by a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub symbol: String,
    pub amount: Decimal,
    pub decimals: Option<u32>,
    pub token_address: Option<String>,
    pub blockchain: Option<String>,
}

/// Gateway balance on one source domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainBalance {
    pub domain: u32,
    pub balance: Decimal,
}

/// USDC available to an address across all Gateway domains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedBalance {
    pub token: String,
    pub total: Decimal,
    pub domains: Vec<DomainBalance>,
}

impl UnifiedBalance {
    pub fn from_domains(token: impl Into<String>, domains: Vec<DomainBalance>) -> Self {
        let total = domains.iter().map(|d| d.balance).sum();
        Self {
            token: token.into(),
            total,
            domains,
        }
    }
}

/// Everything known about a user's wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletOverview {
    pub address: EvmAddress,
    pub wallet: Option<CustodialWallet>,
    pub balances: Vec<TokenBalance>,
    /// Absent when Gateway could not be reached
    pub unified: Option<UnifiedBalance>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unified_total_sums_domains() {
        let unified = UnifiedBalance::from_domains(
            "USDC",
            vec![
                DomainBalance { domain: 0, balance: dec!(10.5) },
                DomainBalance { domain: 6, balance: dec!(2.25) },
            ],
        );
        assert_eq!(unified.total, dec!(12.75));
    }
}
