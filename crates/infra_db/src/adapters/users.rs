//! PostgreSQL user store

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{DomainPort, EvmAddress, HealthCheckResult, HealthCheckable, PortError, UserId};
use domain_identity::{Role, User, UserStore};

use crate::adapters::claims::ping;
use crate::repositories::users::{UserRepository, UserRole, UserRow};

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    repository: UserRepository,
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: UserRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresUserStore {}

#[async_trait]
impl HealthCheckable for PostgresUserStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-user-store").await
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip_all, fields(user_id = %user.id))]
    async fn insert_user(&self, user: &User) -> Result<(), PortError> {
        self.repository.insert(&user_to_row(user)).await?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, PortError> {
        self.repository
            .find_by_email(email)
            .await?
            .map(row_to_user)
            .transpose()
    }

    async fn get_user(&self, id: UserId) -> Result<User, PortError> {
        let row = self.repository.get_by_id(id.into()).await.map_err(|e| {
            if e.is_not_found() {
                PortError::not_found("User", id)
            } else {
                e.into()
            }
        })?;
        row_to_user(row)
    }

    #[instrument(skip(self), fields(address = %address))]
    async fn set_wallet(
        &self,
        id: UserId,
        address: &EvmAddress,
        wallet_id: Option<&str>,
    ) -> Result<User, PortError> {
        let row = self
            .repository
            .set_wallet(id.into(), address.as_str(), wallet_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    PortError::not_found("User", id)
                } else {
                    e.into()
                }
            })?;
        row_to_user(row)
    }
}

fn user_to_row(user: &User) -> UserRow {
    UserRow {
        user_id: user.id.into(),
        email: user.email.clone(),
        password_hash: user.password_hash.clone(),
        role: match user.role {
            Role::Claimant => UserRole::Claimant,
            Role::Insurer => UserRole::Insurer,
        },
        wallet_address: user.wallet_address.as_ref().map(|a| a.as_str().to_string()),
        wallet_id: user.wallet_id.clone(),
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

fn row_to_user(row: UserRow) -> Result<User, PortError> {
    let wallet_address = row
        .wallet_address
        .as_deref()
        .map(EvmAddress::parse)
        .transpose()
        .map_err(|e| PortError::transformation(format!("stored wallet address: {e}")))?;
    Ok(User {
        id: UserId::from(row.user_id),
        email: row.email,
        password_hash: row.password_hash,
        role: match row.role {
            UserRole::Claimant => Role::Claimant,
            UserRole::Insurer => Role::Insurer,
        },
        wallet_address,
        wallet_id: row.wallet_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_row_roundtrip() {
        let mut user = User::register("Insurer@Example.com", "$pbkdf2-sha256$i=1$a$b".to_string(), Role::Insurer);
        user.wallet_address = Some(EvmAddress::parse("0x00000000000000000000000000000000000000ff").unwrap());
        let back = row_to_user(user_to_row(&user)).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_corrupt_wallet_address_is_transformation_error() {
        let user = User::register("a@b.io", "hash".to_string(), Role::Claimant);
        let mut row = user_to_row(&user);
        row.wallet_address = Some("not-an-address".to_string());
        assert!(matches!(row_to_user(row), Err(PortError::Transformation { .. })));
    }
}
