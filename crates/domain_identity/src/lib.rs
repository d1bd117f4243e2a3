//! Identity Domain
//!
//! Users of ClaimLedger are either claimants, who submit claims and receive
//! payouts, or insurers, who review and settle them. This crate covers
//! registration, credential verification and the one-time linkage of a payout
//! wallet to a user.
//!
//! Token issuance lives in the API layer; this crate only answers "who is
//! this and did they prove it".

pub mod user;
pub mod password;
pub mod error;
pub mod ports;
pub mod service;

pub use user::{normalize_email, User, Role, WalletLink};
pub use password::{hash_password, verify_password};
pub use error::IdentityError;
pub use ports::UserStore;
pub use service::{AccountService, MIN_PASSWORD_LEN};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockUserStore;
