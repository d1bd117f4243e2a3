//! Identity domain errors

use thiserror::Error;

use core_kernel::{AddressError, PortError};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("A wallet is already linked to this user")]
    WalletAlreadyLinked,

    #[error("Invalid wallet address: {0}")]
    Address(#[from] AddressError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Port(PortError),
}

impl From<PortError> for IdentityError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => {
                IdentityError::NotFound(format!("{} {}", entity_type, id))
            }
            other => IdentityError::Port(other),
        }
    }
}
