//! Account operations

use std::sync::Arc;

use tracing::{info, instrument, warn};
use validator::ValidateEmail;

use core_kernel::{PortError, UserId};

use crate::error::IdentityError;
use crate::password::{hash_password, verify_password};
use crate::ports::UserStore;
use crate::user::{normalize_email, Role, User, WalletLink};

/// Minimum password length in characters
pub const MIN_PASSWORD_LEN: usize = 8;

/// Registration, login and wallet linkage
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Registers a new user
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str, role: Role) -> Result<User, IdentityError> {
        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(IdentityError::Validation(format!("'{}' is not a valid email", email)));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(IdentityError::EmailTaken(email));
        }

        let user = User::register(&email, hash_password(password)?, role);
        match self.store.insert_user(&user).await {
            Ok(()) => {}
            Err(PortError::Conflict { .. }) => return Err(IdentityError::EmailTaken(email)),
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Verifies credentials and returns the user
    ///
    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, IdentityError> {
        let email = normalize_email(email);
        let user = self.store.find_by_email(&email).await?;

        match user {
            Some(user) if verify_password(password, &user.password_hash) => Ok(user),
            _ => {
                warn!("Failed login attempt");
                Err(IdentityError::InvalidCredentials)
            }
        }
    }

    pub async fn get(&self, id: UserId) -> Result<User, IdentityError> {
        Ok(self.store.get_user(id).await?)
    }

    /// Links a wallet to a user that has none
    #[instrument(skip(self, link), fields(address = %link.address()))]
    pub async fn link_wallet(&self, id: UserId, link: WalletLink) -> Result<User, IdentityError> {
        let mut user = self.store.get_user(id).await?;
        user.link_wallet(&link)?;

        let user = match self.store.set_wallet(id, link.address(), link.wallet_id()).await {
            Ok(user) => user,
            Err(PortError::Conflict { .. }) => return Err(IdentityError::WalletAlreadyLinked),
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %id, custodial = link.wallet_id().is_some(), "Wallet linked");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::MockUserStore;
    use core_kernel::EvmAddress;

    fn service() -> AccountService {
        AccountService::new(Arc::new(MockUserStore::new()))
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let accounts = service();
        let user = accounts
            .register("Dana@Example.com", "s3cure-pass", Role::Claimant)
            .await
            .unwrap();
        assert_eq!(user.email, "dana@example.com");
        assert_ne!(user.password_hash, "s3cure-pass");

        let logged_in = accounts.authenticate("dana@example.com", "s3cure-pass").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let wrong = accounts.authenticate("dana@example.com", "wrong-pass").await;
        assert!(matches!(wrong, Err(IdentityError::InvalidCredentials)));

        let unknown = accounts.authenticate("nobody@example.com", "s3cure-pass").await;
        assert!(matches!(unknown, Err(IdentityError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let accounts = service();
        accounts.register("x@y.io", "password1", Role::Insurer).await.unwrap();
        let again = accounts.register("X@Y.io", "password2", Role::Claimant).await;
        assert!(matches!(again, Err(IdentityError::EmailTaken(_))));
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let accounts = service();
        assert!(matches!(
            accounts.register("not-an-email", "password1", Role::Claimant).await,
            Err(IdentityError::Validation(_))
        ));
        assert!(matches!(
            accounts.register("a@b.io", "short", Role::Claimant).await,
            Err(IdentityError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_link_wallet_once() {
        let accounts = service();
        let user = accounts.register("w@b.io", "password1", Role::Claimant).await.unwrap();
        let address = EvmAddress::parse("0x1234567890abcdef1234567890abcdef12345678").unwrap();

        let linked = accounts
            .link_wallet(user.id, WalletLink::External(address.clone()))
            .await
            .unwrap();
        assert_eq!(linked.wallet_address, Some(address.clone()));

        let again = accounts.link_wallet(user.id, WalletLink::External(address)).await;
        assert!(matches!(again, Err(IdentityError::WalletAlreadyLinked)));
    }
}
