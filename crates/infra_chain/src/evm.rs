//! alloy-backed settlement adapter

use std::str::FromStr;
use std::time::Instant;

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, B256, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::{TransactionReceipt, TransactionRequest},
    sol_types::SolCall,
};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    DomainPort, EvmAddress, HealthCheckResult, HealthCheckable, PortError, UsdcAmount,
};
use domain_claims::{SettlementPort, TransferReceipt, TransferRequest, TransferStatus};

use crate::config::ChainConfig;
use crate::erc20::IERC20;
use crate::error::ChainError;
use crate::keys::signer_from_hex;

/// HTTP provider with the recommended fillers plus the settlement wallet
type SigningProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
>;

fn parse_address(raw: &str) -> Result<Address, ChainError> {
    Address::from_str(raw).map_err(|e| ChainError::InvalidAddress(format!("{raw}: {e}")))
}

fn to_evm_address(address: Address) -> Result<EvmAddress, ChainError> {
    EvmAddress::parse(&address.to_string()).map_err(|e| ChainError::InvalidAddress(e.to_string()))
}

/// Submits USDC transfers from the auto-settle account
pub struct EvmSettlementAdapter {
    config: ChainConfig,
    provider: SigningProvider,
    token: Address,
    sender: Address,
}

impl std::fmt::Debug for EvmSettlementAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmSettlementAdapter")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("token", &self.token)
            .field("sender", &self.sender)
            .finish()
    }
}

impl EvmSettlementAdapter {
    pub fn new(config: ChainConfig) -> Result<Self, ChainError> {
        let url: url::Url = config
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;
        let token = parse_address(&config.usdc_contract)?;
        let signer = signer_from_hex(&config.settlement_private_key)?;
        let sender = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url);

        info!(chain_id = config.chain_id, sender = %sender, token = %token, "EVM settlement adapter ready");
        Ok(Self {
            config,
            provider,
            token,
            sender,
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Address of the auto-settle account
    pub fn sender(&self) -> Result<EvmAddress, PortError> {
        Ok(to_evm_address(self.sender)?)
    }

    /// Chain id reported by the RPC endpoint
    pub async fn remote_chain_id(&self) -> Result<u64, PortError> {
        Ok(self.provider.get_chain_id().await.map_err(ChainError::from)?)
    }

    /// USDC held by `owner`
    pub async fn usdc_balance(&self, owner: &EvmAddress) -> Result<UsdcAmount, PortError> {
        let contract = IERC20::new(self.token, self.provider.clone());
        let raw: U256 = contract
            .balanceOf(parse_address(owner.as_str())?)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;
        let units = u128::try_from(raw).map_err(|e| ChainError::InvalidAmount(e.to_string()))?;
        UsdcAmount::from_base_units(units).map_err(|e| PortError::transformation(e.to_string()))
    }

    /// Native gas token balance of `owner` in wei
    pub async fn native_balance(&self, owner: &EvmAddress) -> Result<U256, PortError> {
        Ok(self
            .provider
            .get_balance(parse_address(owner.as_str())?)
            .await
            .map_err(ChainError::from)?)
    }

    /// Polls for a receipt until the confirmation timeout
    async fn wait_for_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>, ChainError> {
        let deadline = tokio::time::Instant::now() + self.config.confirmation_timeout();
        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(hash).await? {
                return Ok(Some(receipt));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    fn to_receipt(&self, tx_hash: String, receipt: Option<&TransactionReceipt>) -> TransferReceipt {
        let explorer_url = self.config.explorer_tx_url(&tx_hash);
        match receipt {
            Some(r) => TransferReceipt {
                tx_hash,
                status: if r.status() {
                    TransferStatus::Confirmed
                } else {
                    TransferStatus::Failed
                },
                block_number: r.block_number,
                gas_used: Some(r.gas_used as u64),
                explorer_url,
            },
            None => TransferReceipt {
                tx_hash,
                status: TransferStatus::Pending,
                block_number: None,
                gas_used: None,
                explorer_url,
            },
        }
    }
}

impl DomainPort for EvmSettlementAdapter {}

#[async_trait]
impl HealthCheckable for EvmSettlementAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = self.provider.get_block_number().await;
        let latency = start.elapsed().as_millis() as u64;

        match result {
            Ok(block) => {
                debug!(block, "EVM RPC reachable");
                HealthCheckResult::healthy("evm-rpc", latency)
            }
            Err(e) => HealthCheckResult::unhealthy("evm-rpc", latency, e.to_string()),
        }
    }
}

#[async_trait]
impl SettlementPort for EvmSettlementAdapter {
    #[instrument(skip(self, request), fields(claim_id = %request.claim_id, recipient = %request.recipient, amount = %request.amount))]
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PortError> {
        let recipient = parse_address(request.recipient.as_str())?;
        let units = request
            .amount
            .to_base_units()
            .map_err(|e| ChainError::InvalidAmount(e.to_string()))?;

        let call = IERC20::transferCall {
            to: recipient,
            amount: U256::from(units),
        };
        let tx = TransactionRequest::default()
            .to(self.token)
            .input(call.abi_encode().into());

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(ChainError::from)?;
        let hash = *pending.tx_hash();
        let tx_hash = format!("{:?}", hash);
        info!(tx_hash = %tx_hash, "USDC transfer broadcast");

        // Once broadcast, lookup failures must not turn into a failed transfer
        let receipt = match self.wait_for_receipt(hash).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed; reporting transfer as pending");
                None
            }
        };

        let result = self.to_receipt(tx_hash, receipt.as_ref());
        match result.status {
            TransferStatus::Confirmed => info!(block = ?result.block_number, "USDC transfer confirmed"),
            TransferStatus::Failed => warn!(tx_hash = %result.tx_hash, "USDC transfer reverted"),
            TransferStatus::Pending => warn!(tx_hash = %result.tx_hash, "No receipt before timeout"),
        }
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn transaction_status(&self, tx_hash: &str) -> Result<TransferReceipt, PortError> {
        let hash = B256::from_str(tx_hash)
            .map_err(|e| ChainError::InvalidTxHash(format!("{tx_hash}: {e}")))?;

        if let Some(receipt) = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(ChainError::from)?
        {
            return Ok(self.to_receipt(format!("{:?}", hash), Some(&receipt)));
        }

        let known = self
            .provider
            .get_transaction_by_hash(hash)
            .await
            .map_err(ChainError::from)?
            .is_some();
        if known {
            Ok(self.to_receipt(format!("{:?}", hash), None))
        } else {
            Err(PortError::not_found("Transaction", tx_hash))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn config() -> ChainConfig {
        ChainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            settlement_private_key: TEST_KEY.to_string(),
            confirmation_timeout_secs: 1,
            poll_interval_ms: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_builds_with_valid_config() {
        let adapter = EvmSettlementAdapter::new(config()).unwrap();
        assert_eq!(
            adapter.sender().unwrap().as_str(),
            "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23"
        );
    }

    #[test]
    fn test_rejects_bad_contract_address() {
        let result = EvmSettlementAdapter::new(ChainConfig {
            usdc_contract: "usdc".to_string(),
            ..config()
        });
        assert!(matches!(result, Err(ChainError::InvalidAddress(_))));
    }

    #[test]
    fn test_rejects_missing_key() {
        let result = EvmSettlementAdapter::new(ChainConfig {
            settlement_private_key: String::new(),
            ..config()
        });
        assert!(matches!(result, Err(ChainError::InvalidPrivateKey(_))));
    }

    #[tokio::test]
    async fn test_malformed_hash_is_rejected_before_any_rpc() {
        let adapter = EvmSettlementAdapter::new(config()).unwrap();
        let result = adapter.transaction_status("0x1234").await;
        assert!(matches!(result, Err(PortError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_rpc_is_unhealthy() {
        let adapter = EvmSettlementAdapter::new(config()).unwrap();
        let health = adapter.health_check().await;
        assert!(!health.is_operational());
    }

    #[test]
    fn test_pending_receipt_keeps_explorer_link() {
        let adapter = EvmSettlementAdapter::new(config()).unwrap();
        let receipt = adapter.to_receipt("0xfeed".to_string(), None);
        assert_eq!(receipt.status, TransferStatus::Pending);
        assert_eq!(receipt.explorer_url.as_deref(), Some("https://testnet.arcscan.app/tx/0xfeed"));
    }
}
