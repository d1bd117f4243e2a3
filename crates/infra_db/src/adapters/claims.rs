//! PostgreSQL claim store
//!
//! Implements [`ClaimStore`] over [`ClaimsRepository`]. Rows are converted
//! to domain types here; a row that no longer fits the domain (bad amount,
//! unreadable findings JSON) is reported as `PortError::Transformation`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError, UsdcAmount, UserId,
};
use domain_claims::{
    AgentKind, AgentLog, AgentScores, Claim, ClaimEvidence, ClaimStatus, ClaimStore, Evaluation,
    EvaluationFindings, EvidenceKind, LogLevel,
};

use crate::error::DatabaseError;
use crate::repositories::claims::{
    AgentKind as DbAgentKind, AgentLogRow, ClaimRow, ClaimStatus as DbClaimStatus,
    ClaimsRepository, EvaluationRow, EvidenceKind as DbEvidenceKind, EvidenceRow,
    LogLevel as DbLogLevel,
};

#[derive(Debug, Clone)]
pub struct PostgresClaimStore {
    repository: ClaimsRepository,
    pool: PgPool,
}

impl PostgresClaimStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClaimsRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &ClaimsRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClaimStore {}

#[async_trait]
impl HealthCheckable for PostgresClaimStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-claim-store").await
    }
}

/// Runs `SELECT 1` against the pool
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult::healthy(adapter_id, latency_ms),
        Err(e) => HealthCheckResult::unhealthy(adapter_id, latency_ms, format!("Database error: {}", e)),
    }
}

/// Converts a database error, naming the entity on not-found
fn port_error(e: DatabaseError, entity: &str, id: impl std::fmt::Display) -> PortError {
    if e.is_not_found() {
        PortError::not_found(entity, id)
    } else {
        e.into()
    }
}

#[async_trait]
impl ClaimStore for PostgresClaimStore {
    #[instrument(skip_all, fields(claim_id = %claim.id, evidence = evidence.len()))]
    async fn insert_claim(&self, claim: &Claim, evidence: &[ClaimEvidence]) -> Result<(), PortError> {
        let rows: Vec<EvidenceRow> = evidence.iter().map(evidence_to_row).collect();
        self.repository
            .insert_with_evidence(&claim_to_row(claim), &rows)
            .await?;
        debug!("Claim inserted");
        Ok(())
    }

    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        let row = self
            .repository
            .get_by_id(id.into())
            .await
            .map_err(|e| port_error(e, "Claim", id))?;
        row_to_claim(row)
    }

    async fn list_claims(&self, claimant: Option<UserId>) -> Result<Vec<Claim>, PortError> {
        self.repository
            .list(claimant.map(Into::into))
            .await?
            .into_iter()
            .map(row_to_claim)
            .collect()
    }

    async fn list_evidence(&self, claim_id: ClaimId) -> Result<Vec<ClaimEvidence>, PortError> {
        Ok(self
            .repository
            .list_evidence(claim_id.into())
            .await?
            .into_iter()
            .map(row_to_evidence)
            .collect())
    }

    #[instrument(skip_all, fields(claim_id = %claim.id, status = %claim.status))]
    async fn record_evaluation(&self, claim: &Claim, evaluation: &Evaluation) -> Result<(), PortError> {
        let row = evaluation_to_row(evaluation)?;
        self.repository
            .record_evaluation(&claim_to_row(claim), &row)
            .await
            .map_err(|e| port_error(e, "Claim", claim.id))
    }

    async fn get_evaluation(&self, claim_id: ClaimId) -> Result<Option<Evaluation>, PortError> {
        self.repository
            .get_evaluation(claim_id.into())
            .await?
            .map(row_to_evaluation)
            .transpose()
    }

    #[instrument(skip_all, fields(claim_id = %claim.id, status = %claim.status))]
    async fn record_review(&self, claim: &Claim) -> Result<(), PortError> {
        self.repository
            .record_review(&claim_to_row(claim))
            .await
            .map_err(|e| port_error(e, "Claim", claim.id))
    }

    #[instrument(skip(self))]
    async fn acquire_settlement(&self, claim_id: ClaimId) -> Result<Claim, PortError> {
        let row = self
            .repository
            .acquire_settlement(claim_id.into())
            .await
            .map_err(|e| port_error(e, "Claim", claim_id))?;
        row_to_claim(row)
    }

    #[instrument(skip(self))]
    async fn release_settlement(&self, claim_id: ClaimId) -> Result<(), PortError> {
        self.repository.release_settlement(claim_id.into()).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn complete_settlement(&self, claim_id: ClaimId, tx_hash: &str) -> Result<Claim, PortError> {
        let row = self
            .repository
            .complete_settlement(claim_id.into(), tx_hash)
            .await
            .map_err(|e| port_error(e, "Claim", claim_id))?;
        row_to_claim(row)
    }

    async fn append_log(&self, log: &AgentLog) -> Result<(), PortError> {
        self.repository.append_log(&log_to_row(log)).await?;
        Ok(())
    }

    async fn list_logs(&self, claim_id: ClaimId) -> Result<Vec<AgentLog>, PortError> {
        Ok(self
            .repository
            .list_logs(claim_id.into())
            .await?
            .into_iter()
            .map(row_to_log)
            .collect())
    }
}

// ============================================================================
// Row conversions
// ============================================================================

fn amount(value: rust_decimal::Decimal) -> Result<UsdcAmount, PortError> {
    UsdcAmount::new(value).map_err(|e| PortError::transformation(format!("stored amount: {e}")))
}

fn claim_to_row(claim: &Claim) -> ClaimRow {
    ClaimRow {
        claim_id: claim.id.into(),
        claim_number: claim.claim_number.clone(),
        claimant_id: claim.claimant_id.into(),
        description: claim.description.clone(),
        amount: claim.amount.amount(),
        status: status_to_db(claim.status),
        decision: claim.decision.clone(),
        confidence: claim.confidence,
        approved_amount: claim.approved_amount.map(|a| a.amount()),
        tx_hash: claim.tx_hash.clone(),
        settlement_started_at: claim.settlement_started_at,
        settled_at: claim.settled_at,
        created_at: claim.created_at,
        updated_at: claim.updated_at,
    }
}

fn row_to_claim(row: ClaimRow) -> Result<Claim, PortError> {
    Ok(Claim {
        id: ClaimId::from(row.claim_id),
        claim_number: row.claim_number,
        claimant_id: UserId::from(row.claimant_id),
        description: row.description,
        amount: amount(row.amount)?,
        status: status_from_db(row.status),
        decision: row.decision,
        confidence: row.confidence,
        approved_amount: row.approved_amount.map(amount).transpose()?,
        tx_hash: row.tx_hash,
        settlement_started_at: row.settlement_started_at,
        settled_at: row.settled_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn evidence_to_row(evidence: &ClaimEvidence) -> EvidenceRow {
    EvidenceRow {
        evidence_id: evidence.id.into(),
        claim_id: evidence.claim_id.into(),
        kind: match evidence.kind {
            EvidenceKind::Document => DbEvidenceKind::Document,
            EvidenceKind::Image => DbEvidenceKind::Image,
        },
        file_name: evidence.file_name.clone(),
        mime_type: evidence.mime_type.clone(),
        uri: evidence.uri.clone(),
        created_at: evidence.created_at,
    }
}

fn row_to_evidence(row: EvidenceRow) -> ClaimEvidence {
    ClaimEvidence {
        id: row.evidence_id.into(),
        claim_id: row.claim_id.into(),
        kind: match row.kind {
            DbEvidenceKind::Document => EvidenceKind::Document,
            DbEvidenceKind::Image => EvidenceKind::Image,
        },
        file_name: row.file_name,
        mime_type: row.mime_type,
        uri: row.uri,
        created_at: row.created_at,
    }
}

fn evaluation_to_row(evaluation: &Evaluation) -> Result<EvaluationRow, PortError> {
    let findings = serde_json::to_value(&evaluation.findings)
        .map_err(|e| PortError::transformation(format!("findings: {e}")))?;
    Ok(EvaluationRow {
        evaluation_id: evaluation.id.into(),
        claim_id: evaluation.claim_id.into(),
        reasoning: evaluation.reasoning.clone(),
        document_score: evaluation.scores.document,
        image_score: evaluation.scores.image,
        fraud_score: evaluation.scores.fraud_risk,
        reasoning_score: evaluation.scores.reasoning,
        confidence: evaluation.confidence,
        findings,
        created_at: evaluation.created_at,
    })
}

fn row_to_evaluation(row: EvaluationRow) -> Result<Evaluation, PortError> {
    let findings: EvaluationFindings = serde_json::from_value(row.findings)
        .map_err(|e| PortError::transformation(format!("stored findings: {e}")))?;
    Ok(Evaluation {
        id: row.evaluation_id.into(),
        claim_id: row.claim_id.into(),
        reasoning: row.reasoning,
        scores: AgentScores {
            document: row.document_score,
            image: row.image_score,
            fraud_risk: row.fraud_score,
            reasoning: row.reasoning_score,
        },
        confidence: row.confidence,
        findings,
        created_at: row.created_at,
    })
}

fn log_to_row(log: &AgentLog) -> AgentLogRow {
    AgentLogRow {
        log_id: log.id.into(),
        claim_id: log.claim_id.into(),
        agent: agent_to_db(log.agent),
        level: match log.level {
            LogLevel::Info => DbLogLevel::Info,
            LogLevel::Warning => DbLogLevel::Warning,
            LogLevel::Error => DbLogLevel::Error,
        },
        message: log.message.clone(),
        data: log.data.clone(),
        created_at: log.created_at,
    }
}

fn row_to_log(row: AgentLogRow) -> AgentLog {
    AgentLog {
        id: row.log_id.into(),
        claim_id: row.claim_id.into(),
        agent: agent_from_db(row.agent),
        level: match row.level {
            DbLogLevel::Info => LogLevel::Info,
            DbLogLevel::Warning => LogLevel::Warning,
            DbLogLevel::Error => LogLevel::Error,
        },
        message: row.message,
        data: row.data,
        created_at: row.created_at,
    }
}

fn status_to_db(status: ClaimStatus) -> DbClaimStatus {
    match status {
        ClaimStatus::Submitted => DbClaimStatus::Submitted,
        ClaimStatus::NeedsReview => DbClaimStatus::NeedsReview,
        ClaimStatus::Approved => DbClaimStatus::Approved,
        ClaimStatus::Rejected => DbClaimStatus::Rejected,
        ClaimStatus::Settled => DbClaimStatus::Settled,
    }
}

fn status_from_db(status: DbClaimStatus) -> ClaimStatus {
    match status {
        DbClaimStatus::Submitted => ClaimStatus::Submitted,
        DbClaimStatus::NeedsReview => ClaimStatus::NeedsReview,
        DbClaimStatus::Approved => ClaimStatus::Approved,
        DbClaimStatus::Rejected => ClaimStatus::Rejected,
        DbClaimStatus::Settled => ClaimStatus::Settled,
    }
}

fn agent_to_db(agent: AgentKind) -> DbAgentKind {
    match agent {
        AgentKind::Orchestrator => DbAgentKind::Orchestrator,
        AgentKind::Document => DbAgentKind::Document,
        AgentKind::Image => DbAgentKind::Image,
        AgentKind::Fraud => DbAgentKind::Fraud,
        AgentKind::Reasoning => DbAgentKind::Reasoning,
        AgentKind::Review => DbAgentKind::Review,
        AgentKind::Settlement => DbAgentKind::Settlement,
    }
}

fn agent_from_db(agent: DbAgentKind) -> AgentKind {
    match agent {
        DbAgentKind::Orchestrator => AgentKind::Orchestrator,
        DbAgentKind::Document => AgentKind::Document,
        DbAgentKind::Image => AgentKind::Image,
        DbAgentKind::Fraud => AgentKind::Fraud,
        DbAgentKind::Reasoning => AgentKind::Reasoning,
        DbAgentKind::Review => AgentKind::Review,
        DbAgentKind::Settlement => AgentKind::Settlement,
    }
}
