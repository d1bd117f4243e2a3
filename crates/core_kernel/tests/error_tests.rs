//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;
use core_kernel::address::{AddressError, EvmAddress};

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_invalid_state() {
    let error = CoreError::invalid_state("Cannot transition from SUBMITTED to SETTLED");

    match error {
        CoreError::InvalidStateTransition(msg) => assert!(msg.contains("Cannot transition")),
        _ => panic!("Expected InvalidStateTransition error"),
    }
}

#[test]
fn test_core_error_not_found() {
    let error = CoreError::not_found("Claim not found");

    match error {
        CoreError::NotFound(msg) => assert_eq!(msg, "Claim not found"),
        _ => panic!("Expected NotFound error"),
    }
}

#[test]
fn test_core_error_from_money_error() {
    let core_error: CoreError = MoneyError::TooPrecise.into();
    assert!(matches!(core_error, CoreError::Money(MoneyError::TooPrecise)));
}

#[test]
fn test_core_error_from_address_error() {
    let address_error = EvmAddress::parse("not-an-address").unwrap_err();
    let core_error: CoreError = address_error.into();
    assert!(matches!(core_error, CoreError::Address(AddressError::MissingPrefix)));
}

#[test]
fn test_core_error_display() {
    let error = CoreError::Configuration("Missing CLAIMLEDGER_CHAIN__RPC_URL".to_string());
    let display = format!("{}", error);

    assert!(display.contains("Configuration error"));
    assert!(display.contains("RPC_URL"));
}
