//! Test Utilities Crate
//!
//! Shared test infrastructure for the ClaimLedger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Ready-made users, claims, evidence and analysis findings
//! - `builders`: Builders for claims, users and findings in any lifecycle state
//! - `database`: PostgreSQL testcontainer with the schema migrated
//! - `assertions`: Claim lifecycle and agent log assertions
//! - `generators`: Proptest strategies for scores, amounts and addresses

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
