//! Wallet DTOs

use serde::{Deserialize, Serialize};

use domain_wallet::{CustodialWallet, TokenBalance, UnifiedBalance, WalletOverview};

/// Links `wallet_address` when given, otherwise provisions a custodial wallet
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkWalletRequest {
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub wallet_address: String,
    pub wallet_id: Option<String>,
    pub custodial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<CustodialWallet>,
    pub balances: Vec<TokenBalance>,
    pub unified: Option<UnifiedBalance>,
}

impl WalletResponse {
    pub fn from_overview(overview: WalletOverview, wallet_id: Option<String>) -> Self {
        Self {
            wallet_address: overview.address.as_str().to_string(),
            custodial: wallet_id.is_some(),
            wallet_id,
            wallet: overview.wallet,
            balances: overview.balances,
            unified: overview.unified,
        }
    }
}
