//! Chain error types

use thiserror::Error;

use core_kernel::PortError;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid transaction hash: {0}")]
    InvalidTxHash(String),

    #[error("Amount out of range: {0}")]
    InvalidAmount(String),

    #[error("RPC unreachable: {0}")]
    Unreachable(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract error: {0}")]
    Contract(String),
}

impl From<ChainError> for PortError {
    fn from(error: ChainError) -> Self {
        match error {
            ChainError::InvalidRpcUrl(_) | ChainError::InvalidPrivateKey(_) => {
                PortError::internal(error.to_string())
            }
            ChainError::InvalidAddress(_)
            | ChainError::InvalidTxHash(_)
            | ChainError::InvalidAmount(_) => PortError::validation(error.to_string()),
            ChainError::Unreachable(message) => PortError::connection(message),
            ChainError::Rpc(message) | ChainError::Contract(message) => PortError::ServiceUnavailable {
                service: format!("evm rpc: {message}"),
            },
        }
    }
}

impl<E> From<alloy::transports::RpcError<E>> for ChainError
where
    E: std::fmt::Display,
{
    fn from(error: alloy::transports::RpcError<E>) -> Self {
        match &error {
            alloy::transports::RpcError::Transport(_) => ChainError::Unreachable(error.to_string()),
            alloy::transports::RpcError::ErrorResp(payload) => ChainError::Rpc(payload.message.to_string()),
            _ => ChainError::Rpc(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_hash_is_a_validation_error() {
        let port: PortError = ChainError::InvalidTxHash("0x12".to_string()).into();
        assert!(matches!(port, PortError::Validation { .. }));
    }

    #[test]
    fn test_unreachable_is_transient() {
        let port: PortError = ChainError::Unreachable("connection refused".to_string()).into();
        assert!(port.is_transient());
    }
}
