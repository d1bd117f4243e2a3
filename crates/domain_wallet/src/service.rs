//! Wallet provisioning and balance lookups

use std::sync::Arc;

use tracing::{info, instrument, warn};

use core_kernel::{EvmAddress, PortError, UserId};

use crate::ports::{CreateWalletRequest, WalletProviderPort};
use crate::wallet::{CustodialWallet, WalletOverview};

#[derive(Clone)]
pub struct WalletService {
    provider: Arc<dyn WalletProviderPort>,
}

impl WalletService {
    pub fn new(provider: Arc<dyn WalletProviderPort>) -> Self {
        Self { provider }
    }

    /// Creates the custodial wallet of a user
    ///
    /// The user id is the idempotency key, so a retried request after a lost
    /// response yields the same wallet instead of a second one.
    #[instrument(skip(self))]
    pub async fn provision(&self, user_id: UserId) -> Result<CustodialWallet, PortError> {
        let request = CreateWalletRequest {
            idempotency_key: user_id.as_uuid().to_string(),
            name: Some(format!("claimledger-{}", user_id)),
        };
        let wallet = self.provider.create_wallet(&request).await?;
        info!(wallet_id = %wallet.id, address = %wallet.address, "Custodial wallet provisioned");
        Ok(wallet)
    }

    /// Collects wallet details and balances
    ///
    /// Token balances need a provider wallet id; the unified Gateway balance
    /// works for any address and is left out if Gateway fails.
    pub async fn overview(
        &self,
        address: &EvmAddress,
        wallet_id: Option<&str>,
    ) -> Result<WalletOverview, PortError> {
        let (wallet, balances) = match wallet_id {
            Some(id) => {
                let wallet = self.provider.get_wallet(id).await?;
                let balances = self.provider.get_balances(id).await?;
                (Some(wallet), balances)
            }
            None => (None, Vec::new()),
        };

        let unified = match self.provider.unified_balance(address).await {
            Ok(unified) => Some(unified),
            Err(e) => {
                warn!(address = %address, error = %e, "Unified balance unavailable");
                None
            }
        };

        Ok(WalletOverview {
            address: address.clone(),
            wallet,
            balances,
            unified,
        })
    }

    pub fn provider(&self) -> &Arc<dyn WalletProviderPort> {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::MockWalletProvider;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_provision_is_idempotent_per_user() {
        let provider = MockWalletProvider::new();
        let service = WalletService::new(Arc::new(provider.clone()));
        let user = UserId::new();

        let first = service.provision(user).await.unwrap();
        let second = service.provision(user).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.wallet_count().await, 1);
    }

    #[tokio::test]
    async fn test_overview_tolerates_gateway_outage() {
        let provider = MockWalletProvider::new();
        let service = WalletService::new(Arc::new(provider.clone()));
        let wallet = service.provision(UserId::new()).await.unwrap();
        provider.fund(&wallet.id, dec!(75)).await;

        let overview = service.overview(&wallet.address, Some(&wallet.id)).await.unwrap();
        assert_eq!(overview.balances[0].amount, dec!(75));
        assert_eq!(overview.unified.unwrap().total, dec!(75));

        provider.set_gateway_down(true);
        let overview = service.overview(&wallet.address, Some(&wallet.id)).await.unwrap();
        assert!(overview.unified.is_none());
        assert_eq!(overview.balances.len(), 1);
    }
}
