//! Repository implementations
//!
//! Repositories own the SQL and map rows to plain structs; the adapters in
//! [`crate::adapters`] turn those rows into domain types.

pub mod claims;
pub mod users;

pub use claims::ClaimsRepository;
pub use users::UserRepository;
