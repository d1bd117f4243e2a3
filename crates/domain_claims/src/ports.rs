//! Claims Domain Ports
//!
//! Port interfaces the claims domain needs from the outside world:
//!
//! - [`ClaimStore`]: persistence of claims, evidence, evaluations and agent logs
//!   (PostgreSQL in `infra_db`)
//! - [`ClaimAnalysisPort`]: the four analysis steps of the evaluation pipeline
//!   (Gemini or the local heuristic analyzer)
//! - [`SettlementPort`]: USDC transfers on an EVM chain (`infra_chain`)
//! - [`WalletDirectory`]: lookup of a claimant's payout address
//!
//! # Compare-and-swap writes
//!
//! `record_evaluation`, `record_review`, `acquire_settlement` and
//! `complete_settlement` only succeed while the stored claim is still in the
//! expected state. A caller that loses the race gets `PortError::Conflict` and
//! nothing is written.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{
    ClaimId, DomainPort, EvmAddress, HealthCheckable, PortError, UsdcAmount, UserId,
};

use crate::agent_log::AgentLog;
use crate::claim::{Claim, ClaimEvidence};
use crate::evaluation::{
    DamageAssessment, DocumentAssessment, Evaluation, FraudAssessment, ReasoningAssessment,
};

/// Storage of claims and everything attached to them
#[async_trait]
pub trait ClaimStore: DomainPort + HealthCheckable {
    /// Inserts a new claim together with its evidence
    async fn insert_claim(&self, claim: &Claim, evidence: &[ClaimEvidence]) -> Result<(), PortError>;

    /// Retrieves a claim by ID
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError>;

    /// Lists claims, newest first, optionally restricted to one claimant
    async fn list_claims(&self, claimant: Option<UserId>) -> Result<Vec<Claim>, PortError>;

    /// Lists the evidence attached to a claim
    async fn list_evidence(&self, claim_id: ClaimId) -> Result<Vec<ClaimEvidence>, PortError>;

    /// Stores the evaluation and the decided claim fields in one transaction
    ///
    /// Succeeds only while the stored claim is SUBMITTED and has no evaluation.
    async fn record_evaluation(&self, claim: &Claim, evaluation: &Evaluation) -> Result<(), PortError>;

    /// Retrieves the evaluation of a claim, if it has been evaluated
    async fn get_evaluation(&self, claim_id: ClaimId) -> Result<Option<Evaluation>, PortError>;

    /// Stores the outcome of a manual review
    ///
    /// Succeeds only while the stored claim is NEEDS_REVIEW.
    async fn record_review(&self, claim: &Claim) -> Result<(), PortError>;

    /// Takes the settlement lock and returns the locked claim
    ///
    /// Succeeds only while the claim is APPROVED, has an approved amount and
    /// no settlement is in flight.
    async fn acquire_settlement(&self, claim_id: ClaimId) -> Result<Claim, PortError>;

    /// Drops the settlement lock after a failed transfer
    async fn release_settlement(&self, claim_id: ClaimId) -> Result<(), PortError>;

    /// Marks a locked claim SETTLED with its transaction hash
    async fn complete_settlement(&self, claim_id: ClaimId, tx_hash: &str) -> Result<Claim, PortError>;

    /// Appends an agent log entry
    async fn append_log(&self, log: &AgentLog) -> Result<(), PortError>;

    /// Lists a claim's log entries in insertion order
    async fn list_logs(&self, claim_id: ClaimId) -> Result<Vec<AgentLog>, PortError>;
}

/// Input shared by every analysis step
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub claim: Claim,
    pub evidence: Vec<ClaimEvidence>,
}

/// Step outputs available to the final reasoning step
#[derive(Debug, Clone, Serialize)]
pub struct PriorFindings {
    pub document: DocumentAssessment,
    pub damage: DamageAssessment,
    pub fraud: FraudAssessment,
}

/// The external analysis pipeline
///
/// Steps are called in order: documents, damage, fraud, reasoning. Later
/// steps receive the outputs of earlier ones.
#[async_trait]
pub trait ClaimAnalysisPort: DomainPort + HealthCheckable {
    /// Short provider name for logs
    fn provider(&self) -> &'static str;

    async fn assess_documents(&self, request: &AnalysisRequest) -> Result<DocumentAssessment, PortError>;

    async fn assess_damage(&self, request: &AnalysisRequest) -> Result<DamageAssessment, PortError>;

    async fn score_fraud(
        &self,
        request: &AnalysisRequest,
        document: &DocumentAssessment,
        damage: &DamageAssessment,
    ) -> Result<FraudAssessment, PortError>;

    async fn reason(
        &self,
        request: &AnalysisRequest,
        prior: &PriorFindings,
    ) -> Result<ReasoningAssessment, PortError>;
}

/// A USDC payout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub claim_id: ClaimId,
    pub recipient: EvmAddress,
    pub amount: UsdcAmount,
}

/// On-chain state of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Broadcast, no receipt yet
    Pending,
    /// Mined successfully
    Confirmed,
    /// Mined and reverted
    Failed,
}

/// What the chain reported about a transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub tx_hash: String,
    pub status: TransferStatus,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub explorer_url: Option<String>,
}

/// Token transfers on the settlement chain
#[async_trait]
pub trait SettlementPort: DomainPort + HealthCheckable {
    /// Submits the transfer and waits for a receipt up to the adapter's timeout
    ///
    /// A timeout is not an error: the receipt comes back `Pending` with the
    /// broadcast hash.
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PortError>;

    /// Looks up a transaction by hash
    async fn transaction_status(&self, tx_hash: &str) -> Result<TransferReceipt, PortError>;
}

/// Lookup of payout addresses
#[async_trait]
pub trait WalletDirectory: DomainPort {
    /// Returns the wallet address linked to a user, if any
    async fn wallet_address(&self, user_id: UserId) -> Result<Option<EvmAddress>, PortError>;
}

/// In-memory implementations for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use chrono::Utc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;
    use crate::agent_log::AgentKind;
    use crate::claim::ClaimStatus;
    use crate::evaluation::{EvaluationFindings, Score};

    #[derive(Debug, Default)]
    struct Tables {
        claims: HashMap<ClaimId, Claim>,
        evidence: HashMap<ClaimId, Vec<ClaimEvidence>>,
        evaluations: HashMap<ClaimId, Evaluation>,
        logs: Vec<AgentLog>,
    }

    /// In-memory mock implementation of ClaimStore
    ///
    /// All tables sit behind one lock so the compare-and-swap writes behave
    /// like their SQL counterparts.
    #[derive(Debug, Default, Clone)]
    pub struct MockClaimStore {
        tables: Arc<RwLock<Tables>>,
    }

    impl MockClaimStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Stores a claim as-is, bypassing submission rules
        pub async fn put_claim(&self, claim: Claim) {
            self.tables.write().await.claims.insert(claim.id, claim);
        }

        pub async fn log_count(&self, claim_id: ClaimId) -> usize {
            self.tables
                .read()
                .await
                .logs
                .iter()
                .filter(|l| l.claim_id == claim_id)
                .count()
        }
    }

    impl DomainPort for MockClaimStore {}

    #[async_trait]
    impl HealthCheckable for MockClaimStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-claim-store", 0)
        }
    }

    fn conflict(claim_id: ClaimId, expected: &str) -> PortError {
        PortError::conflict(format!("claim {} is no longer {}", claim_id, expected))
    }

    #[async_trait]
    impl ClaimStore for MockClaimStore {
        async fn insert_claim(&self, claim: &Claim, evidence: &[ClaimEvidence]) -> Result<(), PortError> {
            let mut tables = self.tables.write().await;
            if tables.claims.contains_key(&claim.id) {
                return Err(PortError::conflict(format!("claim {} already exists", claim.id)));
            }
            tables.claims.insert(claim.id, claim.clone());
            tables.evidence.insert(claim.id, evidence.to_vec());
            Ok(())
        }

        async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
            self.tables
                .read()
                .await
                .claims
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Claim", id))
        }

        async fn list_claims(&self, claimant: Option<UserId>) -> Result<Vec<Claim>, PortError> {
            let tables = self.tables.read().await;
            let mut claims: Vec<_> = tables
                .claims
                .values()
                .filter(|c| claimant.map_or(true, |id| c.claimant_id == id))
                .cloned()
                .collect();
            claims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(claims)
        }

        async fn list_evidence(&self, claim_id: ClaimId) -> Result<Vec<ClaimEvidence>, PortError> {
            Ok(self
                .tables
                .read()
                .await
                .evidence
                .get(&claim_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn record_evaluation(&self, claim: &Claim, evaluation: &Evaluation) -> Result<(), PortError> {
            let mut tables = self.tables.write().await;
            let stored = tables
                .claims
                .get(&claim.id)
                .ok_or_else(|| PortError::not_found("Claim", claim.id))?;
            if stored.status != ClaimStatus::Submitted || tables.evaluations.contains_key(&claim.id) {
                return Err(conflict(claim.id, "SUBMITTED"));
            }
            tables.claims.insert(claim.id, claim.clone());
            tables.evaluations.insert(claim.id, evaluation.clone());
            Ok(())
        }

        async fn get_evaluation(&self, claim_id: ClaimId) -> Result<Option<Evaluation>, PortError> {
            Ok(self.tables.read().await.evaluations.get(&claim_id).cloned())
        }

        async fn record_review(&self, claim: &Claim) -> Result<(), PortError> {
            let mut tables = self.tables.write().await;
            let stored = tables
                .claims
                .get(&claim.id)
                .ok_or_else(|| PortError::not_found("Claim", claim.id))?;
            if stored.status != ClaimStatus::NeedsReview {
                return Err(conflict(claim.id, "NEEDS_REVIEW"));
            }
            tables.claims.insert(claim.id, claim.clone());
            Ok(())
        }

        async fn acquire_settlement(&self, claim_id: ClaimId) -> Result<Claim, PortError> {
            let mut tables = self.tables.write().await;
            let stored = tables
                .claims
                .get_mut(&claim_id)
                .ok_or_else(|| PortError::not_found("Claim", claim_id))?;
            if stored.status != ClaimStatus::Approved
                || stored.approved_amount.is_none()
                || stored.settlement_started_at.is_some()
            {
                return Err(conflict(claim_id, "settleable"));
            }
            let now = Utc::now();
            stored.settlement_started_at = Some(now);
            stored.updated_at = now;
            Ok(stored.clone())
        }

        async fn release_settlement(&self, claim_id: ClaimId) -> Result<(), PortError> {
            let mut tables = self.tables.write().await;
            if let Some(stored) = tables.claims.get_mut(&claim_id) {
                if stored.status == ClaimStatus::Approved {
                    stored.settlement_started_at = None;
                    stored.updated_at = Utc::now();
                }
            }
            Ok(())
        }

        async fn complete_settlement(&self, claim_id: ClaimId, tx_hash: &str) -> Result<Claim, PortError> {
            let mut tables = self.tables.write().await;
            let stored = tables
                .claims
                .get_mut(&claim_id)
                .ok_or_else(|| PortError::not_found("Claim", claim_id))?;
            if stored.status != ClaimStatus::Approved || stored.settlement_started_at.is_none() {
                return Err(conflict(claim_id, "locked for settlement"));
            }
            let now = Utc::now();
            stored.status = ClaimStatus::Settled;
            stored.tx_hash = Some(tx_hash.to_string());
            stored.settled_at = Some(now);
            stored.updated_at = now;
            Ok(stored.clone())
        }

        async fn append_log(&self, log: &AgentLog) -> Result<(), PortError> {
            self.tables.write().await.logs.push(log.clone());
            Ok(())
        }

        async fn list_logs(&self, claim_id: ClaimId) -> Result<Vec<AgentLog>, PortError> {
            Ok(self
                .tables
                .read()
                .await
                .logs
                .iter()
                .filter(|l| l.claim_id == claim_id)
                .cloned()
                .collect())
        }
    }

    /// Analyzer returning fixed findings, optionally failing at one step
    #[derive(Debug)]
    pub struct MockAnalyzer {
        findings: EvaluationFindings,
        fail_at: Option<AgentKind>,
        calls: AtomicUsize,
    }

    impl MockAnalyzer {
        pub fn new(findings: EvaluationFindings) -> Self {
            Self {
                findings,
                fail_at: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Every step scores the same value; fraud risk is the complement
        pub fn uniform(score: f64) -> Self {
            let s = Score::clamped(score);
            Self::new(EvaluationFindings {
                document: DocumentAssessment {
                    validity_score: s,
                    findings: vec!["invoice present".to_string()],
                    extracted_amount: None,
                },
                damage: DamageAssessment {
                    consistency_score: s,
                    damage_summary: "damage consistent with description".to_string(),
                    estimated_cost: None,
                },
                fraud: FraudAssessment {
                    risk_score: s.complement(),
                    indicators: vec![],
                },
                reasoning: ReasoningAssessment {
                    confidence: s,
                    reasoning: format!("uniform score {}", s),
                },
            })
        }

        /// Makes the given step return a service-unavailable error
        pub fn failing_at(mut self, step: AgentKind) -> Self {
            self.fail_at = Some(step);
            self
        }

        /// Number of step calls made so far
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn enter(&self, step: AgentKind) -> Result<(), PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(step) {
                return Err(PortError::ServiceUnavailable {
                    service: format!("mock {} analyzer", step),
                });
            }
            Ok(())
        }
    }

    impl DomainPort for MockAnalyzer {}

    #[async_trait]
    impl HealthCheckable for MockAnalyzer {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-analyzer", 0)
        }
    }

    #[async_trait]
    impl ClaimAnalysisPort for MockAnalyzer {
        fn provider(&self) -> &'static str {
            "mock"
        }

        async fn assess_documents(&self, _request: &AnalysisRequest) -> Result<DocumentAssessment, PortError> {
            self.enter(AgentKind::Document)?;
            Ok(self.findings.document.clone())
        }

        async fn assess_damage(&self, _request: &AnalysisRequest) -> Result<DamageAssessment, PortError> {
            self.enter(AgentKind::Image)?;
            Ok(self.findings.damage.clone())
        }

        async fn score_fraud(
            &self,
            _request: &AnalysisRequest,
            _document: &DocumentAssessment,
            _damage: &DamageAssessment,
        ) -> Result<FraudAssessment, PortError> {
            self.enter(AgentKind::Fraud)?;
            Ok(self.findings.fraud.clone())
        }

        async fn reason(
            &self,
            _request: &AnalysisRequest,
            _prior: &PriorFindings,
        ) -> Result<ReasoningAssessment, PortError> {
            self.enter(AgentKind::Reasoning)?;
            Ok(self.findings.reasoning.clone())
        }
    }

    /// How the mock chain answers transfers
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockTransferMode {
        Confirm,
        Revert,
        Timeout,
        Unreachable,
    }

    /// Chain mock recording every transfer it accepted
    #[derive(Debug)]
    pub struct MockSettlement {
        mode: std::sync::Mutex<MockTransferMode>,
        transfers: RwLock<Vec<(String, TransferRequest)>>,
        counter: AtomicUsize,
    }

    impl Default for MockSettlement {
        fn default() -> Self {
            Self::new(MockTransferMode::Confirm)
        }
    }

    impl MockSettlement {
        pub fn new(mode: MockTransferMode) -> Self {
            Self {
                mode: std::sync::Mutex::new(mode),
                transfers: RwLock::new(Vec::new()),
                counter: AtomicUsize::new(0),
            }
        }

        pub fn set_mode(&self, mode: MockTransferMode) {
            if let Ok(mut current) = self.mode.lock() {
                *current = mode;
            }
        }

        fn mode(&self) -> MockTransferMode {
            self.mode
                .lock()
                .map(|m| *m)
                .unwrap_or(MockTransferMode::Unreachable)
        }

        /// Transfers that reached the chain, with their hashes
        pub async fn transfers(&self) -> Vec<(String, TransferRequest)> {
            self.transfers.read().await.clone()
        }
    }

    impl DomainPort for MockSettlement {}

    #[async_trait]
    impl HealthCheckable for MockSettlement {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-settlement", 0)
        }
    }

    #[async_trait]
    impl SettlementPort for MockSettlement {
        async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PortError> {
            let mode = self.mode();
            if mode == MockTransferMode::Unreachable {
                return Err(PortError::connection("mock rpc unreachable"));
            }

            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            let tx_hash = format!("0x{:064x}", n);
            self.transfers.write().await.push((tx_hash.clone(), request.clone()));

            let (status, block_number) = match mode {
                MockTransferMode::Confirm => (TransferStatus::Confirmed, Some(100 + n as u64)),
                MockTransferMode::Revert => (TransferStatus::Failed, Some(100 + n as u64)),
                _ => (TransferStatus::Pending, None),
            };
            Ok(TransferReceipt {
                tx_hash,
                status,
                block_number,
                gas_used: block_number.map(|_| 45_000),
                explorer_url: None,
            })
        }

        async fn transaction_status(&self, tx_hash: &str) -> Result<TransferReceipt, PortError> {
            let known = self
                .transfers
                .read()
                .await
                .iter()
                .any(|(hash, _)| hash == tx_hash);
            if !known {
                return Err(PortError::not_found("Transaction", tx_hash));
            }
            Ok(TransferReceipt {
                tx_hash: tx_hash.to_string(),
                status: TransferStatus::Confirmed,
                block_number: Some(100),
                gas_used: Some(45_000),
                explorer_url: None,
            })
        }
    }

    /// Fixed user to address map
    #[derive(Debug, Default, Clone)]
    pub struct MockWalletDirectory {
        wallets: Arc<RwLock<HashMap<UserId, EvmAddress>>>,
    }

    impl MockWalletDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn link(&self, user_id: UserId, address: EvmAddress) {
            self.wallets.write().await.insert(user_id, address);
        }
    }

    impl DomainPort for MockWalletDirectory {}

    #[async_trait]
    impl WalletDirectory for MockWalletDirectory {
        async fn wallet_address(&self, user_id: UserId) -> Result<Option<EvmAddress>, PortError> {
            Ok(self.wallets.read().await.get(&user_id).cloned())
        }
    }
}
