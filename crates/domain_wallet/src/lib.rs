//! Wallet Domain
//!
//! Custodial wallets are created and held by a third-party provider (Circle
//! Developer-Controlled Wallets); ClaimLedger only keeps the wallet id and
//! address. Balances come from the provider's wallet API and from Circle
//! Gateway, which reports a unified USDC balance across chains.
//!
//! No key material for custodial wallets ever exists in this process.

pub mod wallet;
pub mod ports;
pub mod service;
pub mod adapters;

pub use wallet::{CustodialWallet, WalletState, TokenBalance, UnifiedBalance, DomainBalance, WalletOverview};
pub use ports::{WalletProviderPort, CreateWalletRequest};
pub use service::WalletService;
pub use adapters::{CircleConfig, CircleWalletAdapter};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockWalletProvider;
