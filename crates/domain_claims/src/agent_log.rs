//! Agent activity trace
//!
//! Append-only log entries tied to a claim. They exist for observability and
//! are never read back by the evaluation or settlement logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AgentLogId, ClaimId};

/// The pipeline participant that produced a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Orchestrator,
    Document,
    Image,
    Fraud,
    Reasoning,
    Review,
    Settlement,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Orchestrator => "orchestrator",
            AgentKind::Document => "document",
            AgentKind::Image => "image",
            AgentKind::Fraud => "fraud",
            AgentKind::Reasoning => "reasoning",
            AgentKind::Review => "review",
            AgentKind::Settlement => "settlement",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One entry of a claim's activity trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLog {
    pub id: AgentLogId,
    pub claim_id: ClaimId,
    pub agent: AgentKind,
    pub level: LogLevel,
    pub message: String,
    /// Structured payload, e.g. a step's findings
    pub data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AgentLog {
    fn new(claim_id: ClaimId, agent: AgentKind, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            id: AgentLogId::new_v7(),
            claim_id,
            agent,
            level,
            message: message.into(),
            data: None,
            created_at: Utc::now(),
        }
    }

    pub fn info(claim_id: ClaimId, agent: AgentKind, message: impl Into<String>) -> Self {
        Self::new(claim_id, agent, LogLevel::Info, message)
    }

    pub fn warning(claim_id: ClaimId, agent: AgentKind, message: impl Into<String>) -> Self {
        Self::new(claim_id, agent, LogLevel::Warning, message)
    }

    pub fn error(claim_id: ClaimId, agent: AgentKind, message: impl Into<String>) -> Self {
        Self::new(claim_id, agent, LogLevel::Error, message)
    }

    /// Attaches a structured payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
