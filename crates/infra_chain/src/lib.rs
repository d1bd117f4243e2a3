//! EVM Chain Infrastructure
//!
//! Settlement transfers are plain ERC-20 `transfer(to, amount)` calls on the
//! configured USDC contract, signed by the auto-settle account. The adapter
//! implements [`domain_claims::SettlementPort`].
//!
//! A transfer is submitted once and its receipt polled until the configured
//! timeout. A receipt that has not arrived by then is reported as pending
//! with the broadcast hash; the transaction is never re-sent.

pub mod config;
pub mod error;
pub mod erc20;
pub mod keys;
pub mod evm;

pub use config::ChainConfig;
pub use error::ChainError;
pub use keys::{generate_keypair, signer_from_hex, Keypair};
pub use evm::EvmSettlementAdapter;
