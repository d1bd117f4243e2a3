//! Google Gemini analysis adapter
//!
//! Each pipeline step is one `models/{model}:generateContent` call with JSON
//! output requested. Evidence files are passed by URI (`fileData`), so they
//! must already be reachable by Gemini (Files API or Cloud Storage).
//!
//! Error mapping:
//! - HTTP status -> [`PortError::from_http_status`]
//! - request timeout -> `PortError::Timeout`
//! - connection failure -> `PortError::Connection`
//! - unparseable or out-of-range model output -> `PortError::Transformation`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};

use crate::adapters::prompts;
use crate::claim::{ClaimEvidence, EvidenceKind};
use crate::evaluation::{DamageAssessment, DocumentAssessment, FraudAssessment, ReasoningAssessment};
use crate::ports::{AnalysisRequest, ClaimAnalysisPort, PriorFindings};

const SERVICE: &str = "gemini";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Connection settings for the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Gemini-backed implementation of [`ClaimAnalysisPort`]
#[derive(Debug, Clone)]
pub struct GeminiAnalyzer {
    config: GeminiConfig,
    http: Client,
}

impl GeminiAnalyzer {
    pub fn new(config: GeminiConfig) -> Result<Self, PortError> {
        if config.api_key.trim().is_empty() {
            return Err(PortError::validation_field("Gemini API key is empty", "gemini.api_key"));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PortError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    fn model_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn map_transport(&self, err: reqwest::Error, operation: &str) -> PortError {
        if err.is_timeout() {
            PortError::Timeout {
                operation: format!("{SERVICE} {operation}"),
                duration_ms: self.config.timeout_secs * 1000,
            }
        } else if err.is_connect() {
            PortError::Connection {
                message: format!("{SERVICE} unreachable"),
                source: Some(Box::new(err)),
            }
        } else {
            PortError::Internal {
                message: format!("{SERVICE} request failed"),
                source: Some(Box::new(err)),
            }
        }
    }

    /// Runs one generateContent call and parses the JSON answer into `T`
    async fn generate<T: DeserializeOwned>(
        &self,
        step: &str,
        prompt: String,
        files: &[&ClaimEvidence],
    ) -> Result<T, PortError> {
        let url = format!("{}:generateContent", self.model_url());

        let mut parts = vec![Part::Text { text: prompt }];
        parts.extend(files.iter().map(|e| Part::File {
            file_data: FileData {
                mime_type: e.mime_type.clone(),
                file_uri: e.uri.clone(),
            },
        }));
        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.1,
            },
        };

        debug!(step, model = %self.config.model, files = files.len(), "Calling Gemini");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e, step))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PortError::from_http_status(status.as_u16(), SERVICE, text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| PortError::transformation(format!("{SERVICE} response: {e}")))?;

        let text = extract_text(parsed)?;
        parse_model_json(&text)
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, PortError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| PortError::transformation("Gemini returned no candidates"))?;

    let finish_reason = candidate.finish_reason.unwrap_or_default();
    candidate
        .content
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| {
            PortError::transformation(format!(
                "Gemini candidate has no text (finish reason: {})",
                finish_reason
            ))
        })
}

/// Parses model output, tolerating a surrounding markdown code fence
fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T, PortError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim())
        .map_err(|e| PortError::transformation(format!("unexpected model output: {e}")))
}

impl DomainPort for GeminiAnalyzer {}

#[async_trait]
impl HealthCheckable for GeminiAnalyzer {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = self
            .http
            .get(self.model_url())
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) if response.status().is_success() => {
                HealthCheckResult::healthy("gemini-analyzer", latency_ms)
            }
            Ok(response) if response.status().is_server_error() => HealthCheckResult {
                status: AdapterHealth::Degraded,
                message: Some(format!("model endpoint returned {}", response.status())),
                ..HealthCheckResult::healthy("gemini-analyzer", latency_ms)
            },
            Ok(response) => HealthCheckResult::unhealthy(
                "gemini-analyzer",
                latency_ms,
                format!("model endpoint returned {}", response.status()),
            ),
            Err(e) => HealthCheckResult::unhealthy("gemini-analyzer", latency_ms, e.to_string()),
        }
    }
}

#[async_trait]
impl ClaimAnalysisPort for GeminiAnalyzer {
    fn provider(&self) -> &'static str {
        SERVICE
    }

    #[instrument(skip_all, fields(claim_id = %request.claim.id))]
    async fn assess_documents(&self, request: &AnalysisRequest) -> Result<DocumentAssessment, PortError> {
        let files = prompts::of_kind(request, EvidenceKind::Document);
        self.generate("documents", prompts::documents(request), &files).await
    }

    #[instrument(skip_all, fields(claim_id = %request.claim.id))]
    async fn assess_damage(&self, request: &AnalysisRequest) -> Result<DamageAssessment, PortError> {
        let files = prompts::of_kind(request, EvidenceKind::Image);
        self.generate("damage", prompts::damage(request), &files).await
    }

    #[instrument(skip_all, fields(claim_id = %request.claim.id))]
    async fn score_fraud(
        &self,
        request: &AnalysisRequest,
        document: &DocumentAssessment,
        damage: &DamageAssessment,
    ) -> Result<FraudAssessment, PortError> {
        let files: Vec<&ClaimEvidence> = request.evidence.iter().collect();
        self.generate("fraud", prompts::fraud(request, document, damage), &files)
            .await
    }

    #[instrument(skip_all, fields(claim_id = %request.claim.id))]
    async fn reason(
        &self,
        request: &AnalysisRequest,
        prior: &PriorFindings,
    ) -> Result<ReasoningAssessment, PortError> {
        self.generate("reasoning", prompts::reasoning(request, prior), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(GeminiAnalyzer::new(GeminiConfig::default()).is_err());
    }

    #[test]
    fn test_request_shape() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: "hi".to_string() },
                    Part::File {
                        file_data: FileData {
                            mime_type: "image/png".to_string(),
                            file_uri: "gs://b/x.png".to_string(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.1,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["contents"][0]["parts"][1]["fileData"]["fileUri"], "gs://b/x.png");
        assert_eq!(json["contents"][0]["parts"][1]["fileData"]["mimeType"], "image/png");
    }

    #[test]
    fn test_extracts_first_candidate_text() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "{\"risk_score\": 0.1, \"indicators\": []}"}], "role": "model"},
                "finishReason": "STOP"
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let text = extract_text(response).unwrap();
        let fraud: FraudAssessment = parse_model_json(&text).unwrap();
        assert_eq!(fraud.risk_score.value(), 0.1);
    }

    #[test]
    fn test_empty_candidates_is_transformation_error() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(extract_text(response), Err(PortError::Transformation { .. })));
    }

    #[test]
    fn test_fenced_output_and_range_check() {
        let fenced = "```json\n{\"confidence\": 0.8, \"reasoning\": \"fine\"}\n```";
        let reasoning: ReasoningAssessment = parse_model_json(fenced).unwrap();
        assert_eq!(reasoning.reasoning, "fine");

        let out_of_range = "{\"confidence\": 8, \"reasoning\": \"fine\"}";
        assert!(parse_model_json::<ReasoningAssessment>(out_of_range).is_err());
    }
}
