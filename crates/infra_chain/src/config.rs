//! Chain connection settings

use std::time::Duration;

use serde::Deserialize;

/// USDC uses six decimals on every supported chain
pub const USDC_DECIMALS: u8 = 6;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    pub chain_id: u64,
    /// USDC token contract
    pub usdc_contract: String,
    /// Hex private key of the auto-settle account
    pub settlement_private_key: String,
    /// Block explorer base URL, e.g. `https://testnet.arcscan.app`
    pub explorer_url: Option<String>,
    /// How long `transfer` waits for a receipt
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc.testnet.arc.network".to_string(),
            chain_id: 5_042_002,
            usdc_contract: "0x3600000000000000000000000000000000000000".to_string(),
            settlement_private_key: String::new(),
            explorer_url: Some("https://testnet.arcscan.app".to_string()),
            confirmation_timeout_secs: 60,
            poll_interval_ms: 2_000,
        }
    }
}

impl ChainConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    /// Explorer link for a transaction, if an explorer is configured
    pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
        self.explorer_url
            .as_deref()
            .filter(|base| !base.is_empty())
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}
