//! Identity Domain Ports

use async_trait::async_trait;

use core_kernel::{DomainPort, EvmAddress, HealthCheckable, PortError, UserId};

use crate::user::User;

/// Storage of users
#[async_trait]
pub trait UserStore: DomainPort + HealthCheckable {
    /// Inserts a new user; a duplicate email is a `PortError::Conflict`
    async fn insert_user(&self, user: &User) -> Result<(), PortError>;

    /// Finds a user by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, PortError>;

    /// Retrieves a user by ID
    async fn get_user(&self, id: UserId) -> Result<User, PortError>;

    /// Stores the wallet of a user that has none yet
    ///
    /// Returns `PortError::Conflict` if a wallet was linked concurrently.
    async fn set_wallet(
        &self,
        id: UserId,
        address: &EvmAddress,
        wallet_id: Option<&str>,
    ) -> Result<User, PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use chrono::Utc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    /// In-memory mock implementation of UserStore
    #[derive(Debug, Default, Clone)]
    pub struct MockUserStore {
        users: Arc<RwLock<HashMap<UserId, User>>>,
    }

    impl MockUserStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for MockUserStore {}

    #[async_trait]
    impl HealthCheckable for MockUserStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-user-store", 0)
        }
    }

    #[async_trait]
    impl UserStore for MockUserStore {
        async fn insert_user(&self, user: &User) -> Result<(), PortError> {
            let mut users = self.users.write().await;
            if users.values().any(|u| u.email == user.email) {
                return Err(PortError::conflict(format!("email {} already exists", user.email)));
            }
            users.insert(user.id, user.clone());
            Ok(())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, PortError> {
            Ok(self
                .users
                .read()
                .await
                .values()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn get_user(&self, id: UserId) -> Result<User, PortError> {
            self.users
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("User", id))
        }

        async fn set_wallet(
            &self,
            id: UserId,
            address: &EvmAddress,
            wallet_id: Option<&str>,
        ) -> Result<User, PortError> {
            let mut users = self.users.write().await;
            let user = users
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("User", id))?;
            if user.wallet_address.is_some() {
                return Err(PortError::conflict(format!("user {} already has a wallet", id)));
            }
            user.wallet_address = Some(address.clone());
            user.wallet_id = wallet_id.map(str::to_string);
            user.updated_at = Utc::now();
            Ok(user.clone())
        }
    }
}
