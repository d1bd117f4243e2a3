//! Port implementations backed by PostgreSQL

pub mod claims;
pub mod users;

pub use claims::PostgresClaimStore;
pub use users::PostgresUserStore;
