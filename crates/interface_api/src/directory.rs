//! Payout address lookup backed by the user store

use std::sync::Arc;

use async_trait::async_trait;

use core_kernel::{DomainPort, EvmAddress, PortError, UserId};
use domain_claims::WalletDirectory;
use domain_identity::UserStore;

/// Resolves a claimant's payout address from their linked wallet
pub struct UserWalletDirectory {
    users: Arc<dyn UserStore>,
}

impl UserWalletDirectory {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

impl DomainPort for UserWalletDirectory {}

#[async_trait]
impl WalletDirectory for UserWalletDirectory {
    async fn wallet_address(&self, user_id: UserId) -> Result<Option<EvmAddress>, PortError> {
        Ok(self.users.get_user(user_id).await?.wallet_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_identity::{MockUserStore, Role, User};

    #[tokio::test]
    async fn test_returns_linked_address() {
        let store = Arc::new(MockUserStore::new());
        let user = User::register("pat@example.com", "hash".to_string(), Role::Claimant);
        store.insert_user(&user).await.unwrap();

        let directory = UserWalletDirectory::new(store.clone());
        assert_eq!(directory.wallet_address(user.id).await.unwrap(), None);

        let address = EvmAddress::parse("0x2c7536e3605d9c16a7a3d7b1898e529396a65c23").unwrap();
        store.set_wallet(user.id, &address, None).await.unwrap();
        assert_eq!(directory.wallet_address(user.id).await.unwrap(), Some(address));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let directory = UserWalletDirectory::new(Arc::new(MockUserStore::new()));
        let err = directory.wallet_address(UserId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
