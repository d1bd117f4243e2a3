//! Users repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    Claimant,
    Insurer,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub wallet_address: Option<String>,
    pub wallet_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "user_id, email, password_hash, role, wallet_address, wallet_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a user; a taken email surfaces as `DuplicateEntry`
    pub async fn insert(&self, row: &UserRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id, email, password_hash, role,
                wallet_address, wallet_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(row.user_id)
        .bind(&row.email)
        .bind(&row.password_hash)
        .bind(row.role)
        .bind(&row.wallet_address)
        .bind(&row.wallet_id)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_by_id(&self, user_id: Uuid) -> Result<UserRow, DatabaseError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("User", user_id))
    }

    /// Sets the wallet of a user that has none yet
    pub async fn set_wallet(
        &self,
        user_id: Uuid,
        wallet_address: &str,
        wallet_id: Option<&str>,
    ) -> Result<UserRow, DatabaseError> {
        let updated = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET wallet_address = $2, wallet_id = $3, updated_at = NOW()
            WHERE user_id = $1 AND wallet_address IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(wallet_address)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => Ok(row),
            None => {
                // Distinguish a missing user from one that already has a wallet
                self.get_by_id(user_id).await?;
                Err(DatabaseError::stale("User", user_id, "without a wallet"))
            }
        }
    }
}
