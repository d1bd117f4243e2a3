//! Core Kernel - Foundational types and utilities for ClaimLedger
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - USDC amounts with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - EVM address validation
//! - Port abstractions shared by every adapter

pub mod money;
pub mod identifiers;
pub mod address;
pub mod ports;
pub mod error;

pub use money::{UsdcAmount, MoneyError, USDC_DECIMALS};
pub use identifiers::{UserId, ClaimId, EvidenceId, EvaluationId, AgentLogId};
pub use address::{EvmAddress, AddressError};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
pub use error::CoreError;
