//! Wallet Domain Ports

use async_trait::async_trait;

use core_kernel::{DomainPort, EvmAddress, HealthCheckable, PortError};

use crate::wallet::{CustodialWallet, TokenBalance, UnifiedBalance};

/// Parameters for provisioning a custodial wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWalletRequest {
    /// Repeating a request with the same key returns the same wallet
    pub idempotency_key: String,
    /// Free-form label stored at the provider
    pub name: Option<String>,
}

/// Custodial wallet provider
#[async_trait]
pub trait WalletProviderPort: DomainPort + HealthCheckable {
    async fn create_wallet(&self, request: &CreateWalletRequest) -> Result<CustodialWallet, PortError>;

    async fn get_wallet(&self, wallet_id: &str) -> Result<CustodialWallet, PortError>;

    /// Token balances of a provider wallet
    async fn get_balances(&self, wallet_id: &str) -> Result<Vec<TokenBalance>, PortError>;

    /// USDC balance of any address across Gateway domains
    async fn unified_balance(&self, address: &EvmAddress) -> Result<UnifiedBalance, PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;
    use crate::wallet::{DomainBalance, WalletState};

    /// In-memory wallet provider
    ///
    /// Creation is idempotent per key, like the real provider.
    #[derive(Debug, Default, Clone)]
    pub struct MockWalletProvider {
        wallets: Arc<RwLock<HashMap<String, CustodialWallet>>>,
        by_key: Arc<RwLock<HashMap<String, String>>>,
        balances: Arc<RwLock<HashMap<String, Decimal>>>,
        next: Arc<AtomicU64>,
        gateway_down: Arc<AtomicBool>,
    }

    impl MockWalletProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sets the USDC balance of a wallet
        pub async fn fund(&self, wallet_id: &str, amount: Decimal) {
            self.balances.write().await.insert(wallet_id.to_string(), amount);
        }

        /// Makes unified balance lookups fail
        pub fn set_gateway_down(&self, down: bool) {
            self.gateway_down.store(down, Ordering::SeqCst);
        }

        pub async fn wallet_count(&self) -> usize {
            self.wallets.read().await.len()
        }
    }

    impl DomainPort for MockWalletProvider {}

    #[async_trait]
    impl HealthCheckable for MockWalletProvider {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-wallet-provider", 0)
        }
    }

    #[async_trait]
    impl WalletProviderPort for MockWalletProvider {
        async fn create_wallet(&self, request: &CreateWalletRequest) -> Result<CustodialWallet, PortError> {
            if let Some(id) = self.by_key.read().await.get(&request.idempotency_key) {
                return self.get_wallet(id).await;
            }

            let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            let address = EvmAddress::parse(&format!("0x{:040x}", n))
                .map_err(|e| PortError::internal(e.to_string()))?;
            let wallet = CustodialWallet {
                id: format!("mock-wallet-{}", n),
                address,
                blockchain: "ARC-TESTNET".to_string(),
                state: WalletState::Live,
                wallet_set_id: Some("mock-set".to_string()),
                created_at: Some(Utc::now()),
            };

            self.wallets.write().await.insert(wallet.id.clone(), wallet.clone());
            self.by_key
                .write()
                .await
                .insert(request.idempotency_key.clone(), wallet.id.clone());
            Ok(wallet)
        }

        async fn get_wallet(&self, wallet_id: &str) -> Result<CustodialWallet, PortError> {
            self.wallets
                .read()
                .await
                .get(wallet_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Wallet", wallet_id))
        }

        async fn get_balances(&self, wallet_id: &str) -> Result<Vec<TokenBalance>, PortError> {
            self.get_wallet(wallet_id).await?;
            let amount = self
                .balances
                .read()
                .await
                .get(wallet_id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            Ok(vec![TokenBalance {
                symbol: "USDC".to_string(),
                amount,
                decimals: Some(6),
                token_address: None,
                blockchain: Some("ARC-TESTNET".to_string()),
            }])
        }

        async fn unified_balance(&self, address: &EvmAddress) -> Result<UnifiedBalance, PortError> {
            if self.gateway_down.load(Ordering::SeqCst) {
                return Err(PortError::ServiceUnavailable {
                    service: "mock gateway".to_string(),
                });
            }
            let wallets = self.wallets.read().await;
            let balances = self.balances.read().await;
            let total = wallets
                .values()
                .filter(|w| &w.address == address)
                .filter_map(|w| balances.get(&w.id))
                .copied()
                .sum();
            Ok(UnifiedBalance::from_domains(
                "USDC",
                vec![DomainBalance { domain: 26, balance: total }],
            ))
        }
    }
}
