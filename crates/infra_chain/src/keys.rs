//! Auto-settle account keys
//!
//! Only the non-custodial settlement account has local key material.
//! Custodial user wallets never touch this module.

use alloy::signers::local::PrivateKeySigner;

use core_kernel::EvmAddress;

use crate::error::ChainError;

/// A freshly generated secp256k1 account
#[derive(Clone)]
pub struct Keypair {
    pub address: EvmAddress,
    /// 0x-prefixed hex private key
    pub private_key: String,
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

pub fn generate_keypair() -> Result<Keypair, ChainError> {
    let signer = PrivateKeySigner::random();
    let address = EvmAddress::parse(&signer.address().to_string())
        .map_err(|e| ChainError::InvalidAddress(e.to_string()))?;
    Ok(Keypair {
        address,
        private_key: format!("0x{}", alloy::hex::encode(signer.to_bytes())),
    })
}

/// Parses a hex private key, with or without `0x`
pub fn signer_from_hex(private_key: &str) -> Result<PrivateKeySigner, ChainError> {
    let trimmed = private_key.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = alloy::hex::decode(hex).map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;
    PrivateKeySigner::from_slice(&bytes).map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))
}
