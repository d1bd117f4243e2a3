//! Claims Domain
//!
//! This crate implements the claim lifecycle from submission through AI
//! evaluation, optional manual review, and on-chain USDC settlement.
//!
//! # Claim Lifecycle
//!
//! ```text
//! SUBMITTED -> APPROVED ------------------------> SETTLED
//!           \-> NEEDS_REVIEW -> APPROVED -------/
//!                           \-> REJECTED
//! ```
//!
//! Transitions only move forward. Every state-changing write is a
//! compare-and-swap on the current status, so two concurrent callers cannot
//! both evaluate or both settle the same claim.

pub mod claim;
pub mod evaluation;
pub mod decision;
pub mod agent_log;
pub mod error;
pub mod ports;
pub mod service;
pub mod evaluator;
pub mod settlement;
pub mod adapters;

pub use claim::{Claim, ClaimStatus, ClaimEvidence, EvidenceKind, ReviewOutcome};
pub use evaluation::{
    Score, AgentScores, Evaluation, EvaluationFindings,
    DocumentAssessment, DamageAssessment, FraudAssessment, ReasoningAssessment,
};
pub use decision::{Decision, DecisionPolicy, DEFAULT_APPROVAL_THRESHOLD};
pub use agent_log::{AgentLog, AgentKind, LogLevel};
pub use error::ClaimError;
pub use ports::{
    ClaimStore, ClaimAnalysisPort, SettlementPort, WalletDirectory,
    AnalysisRequest, PriorFindings, TransferRequest, TransferReceipt, TransferStatus,
};
pub use service::{ClaimService, NewClaimRequest, NewEvidence};
pub use evaluator::{EvaluationService, EvaluationOutcome};
pub use settlement::{SettlementService, SettlementOutcome};
pub use adapters::{GeminiAnalyzer, GeminiConfig, HeuristicAnalyzer};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{
    MockClaimStore, MockAnalyzer, MockSettlement, MockTransferMode, MockWalletDirectory,
};
