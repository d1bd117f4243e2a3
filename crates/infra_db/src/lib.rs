//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for ClaimLedger using SQLx. Repositories hold the
//! SQL and row types; adapters implement the domain store ports on top of
//! them.
//!
//! State transitions (evaluation, review, settlement lock and completion) are
//! single guarded `UPDATE` statements, so concurrent requests race on the
//! database row rather than in process memory.
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClaimStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claimledger")).await?;
//! run_migrations(&pool).await?;
//! let claims = PostgresClaimStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, DatabaseConfig, create_pool, run_migrations, MIGRATOR};
pub use error::DatabaseError;
pub use adapters::{PostgresClaimStore, PostgresUserStore};
