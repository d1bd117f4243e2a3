//! Tests for domain_wallet

use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::{EvmAddress, PortError, UserId};
use domain_wallet::{MockWalletProvider, WalletProviderPort, WalletService, WalletState};

#[tokio::test]
async fn test_distinct_users_get_distinct_wallets() {
    let provider = MockWalletProvider::new();
    let service = WalletService::new(Arc::new(provider.clone()));

    let a = service.provision(UserId::new()).await.unwrap();
    let b = service.provision(UserId::new()).await.unwrap();

    assert_ne!(a.id, b.id);
    assert_ne!(a.address, b.address);
    assert_eq!(a.state, WalletState::Live);
    assert_eq!(provider.wallet_count().await, 2);
}

#[tokio::test]
async fn test_overview_for_external_address_has_no_token_balances() {
    let service = WalletService::new(Arc::new(MockWalletProvider::new()));
    let address = EvmAddress::parse("0x00000000000000000000000000000000000000aa").unwrap();

    let overview = service.overview(&address, None).await.unwrap();
    assert!(overview.wallet.is_none());
    assert!(overview.balances.is_empty());
    assert_eq!(overview.unified.unwrap().total, dec!(0));
}

#[tokio::test]
async fn test_unknown_wallet_id_is_not_found() {
    let provider = MockWalletProvider::new();
    let result = provider.get_balances("missing").await;
    assert!(matches!(result, Err(PortError::NotFound { .. })));
}
