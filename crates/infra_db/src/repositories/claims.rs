//! Claims repository
//!
//! Claims, their evidence, evaluations and agent logs. Every state
//! transition is a guarded `UPDATE ... WHERE status = ...`; when the guard
//! matches no row the repository reports `StaleState` (or `NotFound` if the
//! claim does not exist at all).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "claim_status", rename_all = "snake_case")]
pub enum ClaimStatus {
    Submitted,
    NeedsReview,
    Approved,
    Rejected,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "evidence_kind", rename_all = "snake_case")]
pub enum EvidenceKind {
    Document,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "agent_kind", rename_all = "snake_case")]
pub enum AgentKind {
    Orchestrator,
    Document,
    Image,
    Fraud,
    Reasoning,
    Review,
    Settlement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "log_level", rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub claim_number: String,
    pub claimant_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub status: ClaimStatus,
    pub decision: Option<String>,
    pub confidence: Option<f64>,
    pub approved_amount: Option<Decimal>,
    pub tx_hash: Option<String>,
    pub settlement_started_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EvidenceRow {
    pub evidence_id: Uuid,
    pub claim_id: Uuid,
    pub kind: EvidenceKind,
    pub file_name: String,
    pub mime_type: String,
    pub uri: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EvaluationRow {
    pub evaluation_id: Uuid,
    pub claim_id: Uuid,
    pub reasoning: String,
    pub document_score: f64,
    pub image_score: f64,
    pub fraud_score: f64,
    pub reasoning_score: f64,
    pub confidence: f64,
    /// Full step outputs as JSONB
    pub findings: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AgentLogRow {
    pub log_id: Uuid,
    pub claim_id: Uuid,
    pub agent: AgentKind,
    pub level: LogLevel,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

const CLAIM_COLUMNS: &str = r#"
    claim_id, claim_number, claimant_id, description, amount, status,
    decision, confidence, approved_amount, tx_hash,
    settlement_started_at, settled_at, created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a claim and its evidence in one transaction
    pub async fn insert_with_evidence(
        &self,
        claim: &ClaimRow,
        evidence: &[EvidenceRow],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO claims (
                claim_id, claim_number, claimant_id, description, amount, status,
                decision, confidence, approved_amount, tx_hash,
                settlement_started_at, settled_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(claim.claim_id)
        .bind(&claim.claim_number)
        .bind(claim.claimant_id)
        .bind(&claim.description)
        .bind(claim.amount)
        .bind(claim.status)
        .bind(&claim.decision)
        .bind(claim.confidence)
        .bind(claim.approved_amount)
        .bind(&claim.tx_hash)
        .bind(claim.settlement_started_at)
        .bind(claim.settled_at)
        .bind(claim.created_at)
        .bind(claim.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in evidence {
            sqlx::query(
                r#"
                INSERT INTO claim_evidence (
                    evidence_id, claim_id, kind, file_name, mime_type, uri, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.evidence_id)
            .bind(item.claim_id)
            .bind(item.kind)
            .bind(&item.file_name)
            .bind(&item.mime_type)
            .bind(&item.uri)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_by_id(&self, claim_id: Uuid) -> Result<ClaimRow, DatabaseError> {
        sqlx::query_as::<_, ClaimRow>(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE claim_id = $1"
        ))
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))
    }

    /// Lists claims newest first, optionally for one claimant
    pub async fn list(&self, claimant_id: Option<Uuid>) -> Result<Vec<ClaimRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClaimRow>(&format!(
            r#"
            SELECT {CLAIM_COLUMNS} FROM claims
            WHERE ($1::uuid IS NULL OR claimant_id = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(claimant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_evidence(&self, claim_id: Uuid) -> Result<Vec<EvidenceRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, EvidenceRow>(
            r#"
            SELECT evidence_id, claim_id, kind, file_name, mime_type, uri, created_at
            FROM claim_evidence
            WHERE claim_id = $1
            ORDER BY created_at, evidence_id
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Writes the decided claim fields and the evaluation row
    ///
    /// Guarded on `status = 'submitted'`; the unique `evaluations.claim_id`
    /// backs the guard up.
    pub async fn record_evaluation(
        &self,
        claim: &ClaimRow,
        evaluation: &EvaluationRow,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE claims
            SET status = $2, decision = $3, confidence = $4, approved_amount = $5, updated_at = $6
            WHERE claim_id = $1 AND status = 'submitted'
            "#,
        )
        .bind(claim.claim_id)
        .bind(claim.status)
        .bind(&claim.decision)
        .bind(claim.confidence)
        .bind(claim.approved_amount)
        .bind(claim.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Err(self.guard_failure(claim.claim_id, "SUBMITTED").await);
        }

        sqlx::query(
            r#"
            INSERT INTO evaluations (
                evaluation_id, claim_id, reasoning, document_score, image_score,
                fraud_score, reasoning_score, confidence, findings, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(evaluation.evaluation_id)
        .bind(evaluation.claim_id)
        .bind(&evaluation.reasoning)
        .bind(evaluation.document_score)
        .bind(evaluation.image_score)
        .bind(evaluation.fraud_score)
        .bind(evaluation.reasoning_score)
        .bind(evaluation.confidence)
        .bind(&evaluation.findings)
        .bind(evaluation.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_evaluation(&self, claim_id: Uuid) -> Result<Option<EvaluationRow>, DatabaseError> {
        let row = sqlx::query_as::<_, EvaluationRow>(
            r#"
            SELECT evaluation_id, claim_id, reasoning, document_score, image_score,
                   fraud_score, reasoning_score, confidence, findings, created_at
            FROM evaluations
            WHERE claim_id = $1
            "#,
        )
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Stores a review outcome, guarded on `status = 'needs_review'`
    pub async fn record_review(&self, claim: &ClaimRow) -> Result<(), DatabaseError> {
        let updated = sqlx::query(
            r#"
            UPDATE claims
            SET status = $2, decision = $3, approved_amount = $4, updated_at = $5
            WHERE claim_id = $1 AND status = 'needs_review'
            "#,
        )
        .bind(claim.claim_id)
        .bind(claim.status)
        .bind(&claim.decision)
        .bind(claim.approved_amount)
        .bind(claim.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(self.guard_failure(claim.claim_id, "NEEDS_REVIEW").await);
        }
        Ok(())
    }

    /// Takes the settlement lock of an approved claim
    pub async fn acquire_settlement(&self, claim_id: Uuid) -> Result<ClaimRow, DatabaseError> {
        let row = sqlx::query_as::<_, ClaimRow>(&format!(
            r#"
            UPDATE claims
            SET settlement_started_at = NOW(), updated_at = NOW()
            WHERE claim_id = $1
              AND status = 'approved'
              AND approved_amount IS NOT NULL
              AND settlement_started_at IS NULL
            RETURNING {CLAIM_COLUMNS}
            "#
        ))
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row),
            None => Err(self.guard_failure(claim_id, "settleable").await),
        }
    }

    pub async fn release_settlement(&self, claim_id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            UPDATE claims
            SET settlement_started_at = NULL, updated_at = NOW()
            WHERE claim_id = $1 AND status = 'approved'
            "#,
        )
        .bind(claim_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Marks a locked claim settled
    pub async fn complete_settlement(&self, claim_id: Uuid, tx_hash: &str) -> Result<ClaimRow, DatabaseError> {
        let row = sqlx::query_as::<_, ClaimRow>(&format!(
            r#"
            UPDATE claims
            SET status = 'settled', tx_hash = $2, settled_at = NOW(), updated_at = NOW()
            WHERE claim_id = $1
              AND status = 'approved'
              AND settlement_started_at IS NOT NULL
            RETURNING {CLAIM_COLUMNS}
            "#
        ))
        .bind(claim_id)
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row),
            None => Err(self.guard_failure(claim_id, "locked for settlement").await),
        }
    }

    pub async fn append_log(&self, log: &AgentLogRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO agent_logs (log_id, claim_id, agent, level, message, data, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(log.log_id)
        .bind(log.claim_id)
        .bind(log.agent)
        .bind(log.level)
        .bind(&log.message)
        .bind(&log.data)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_logs(&self, claim_id: Uuid) -> Result<Vec<AgentLogRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AgentLogRow>(
            r#"
            SELECT log_id, claim_id, agent, level, message, data, created_at
            FROM agent_logs
            WHERE claim_id = $1
            ORDER BY seq
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Explains why a guarded update matched nothing
    async fn guard_failure(&self, claim_id: Uuid, expected: &str) -> DatabaseError {
        match self.exists(claim_id).await {
            Ok(false) => DatabaseError::not_found("Claim", claim_id),
            Ok(true) => DatabaseError::stale("Claim", claim_id, expected),
            Err(e) => e,
        }
    }

    async fn exists(&self, claim_id: Uuid) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM claims WHERE claim_id = $1)",
        )
        .bind(claim_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
