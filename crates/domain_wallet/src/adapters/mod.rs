//! Wallet provider adapters

pub mod circle;

pub use circle::{CircleConfig, CircleWalletAdapter};
