//! Prompt templates for the analysis steps
//!
//! Each prompt names the exact JSON shape expected back; the field names match
//! the assessment structs so the model output deserializes directly.

use crate::claim::{ClaimEvidence, EvidenceKind};
use crate::evaluation::{DamageAssessment, DocumentAssessment};
use crate::ports::{AnalysisRequest, PriorFindings};

const PREAMBLE: &str = "You are an insurance claims analyst. Respond with a single JSON object \
and nothing else. All scores are numbers between 0 and 1.";

fn claim_header(request: &AnalysisRequest) -> String {
    format!(
        "Claim {}\nRequested amount: {}\nDescription: {}\n",
        request.claim.claim_number, request.claim.amount, request.claim.description
    )
}

fn file_list(evidence: &[&ClaimEvidence]) -> String {
    if evidence.is_empty() {
        return "No files were provided.\n".to_string();
    }
    evidence
        .iter()
        .map(|e| format!("- {} ({})\n", e.file_name, e.mime_type))
        .collect()
}

pub(crate) fn of_kind(request: &AnalysisRequest, kind: EvidenceKind) -> Vec<&ClaimEvidence> {
    request.evidence.iter().filter(|e| e.kind == kind).collect()
}

pub(crate) fn documents(request: &AnalysisRequest) -> String {
    format!(
        "{PREAMBLE}\n\n{}Attached documents:\n{}\n\
         Check that the documents are authentic, internally consistent and support the \
         description and amount. Return:\n\
         {{\"validity_score\": number, \"findings\": [string], \"extracted_amount\": number or null}}",
        claim_header(request),
        file_list(&of_kind(request, EvidenceKind::Document)),
    )
}

pub(crate) fn damage(request: &AnalysisRequest) -> String {
    format!(
        "{PREAMBLE}\n\n{}Attached images:\n{}\n\
         Assess whether the visible damage is consistent with the description and estimate \
         the repair cost in USD. Return:\n\
         {{\"consistency_score\": number, \"damage_summary\": string, \"estimated_cost\": number or null}}",
        claim_header(request),
        file_list(&of_kind(request, EvidenceKind::Image)),
    )
}

pub(crate) fn fraud(
    request: &AnalysisRequest,
    document: &DocumentAssessment,
    damage: &DamageAssessment,
) -> String {
    let document_json = serde_json::to_string(document).unwrap_or_default();
    let damage_json = serde_json::to_string(damage).unwrap_or_default();
    format!(
        "{PREAMBLE}\n\n{}Document analysis: {}\nDamage analysis: {}\n\n\
         Score the risk that this claim is fraudulent (1 = certainly fraudulent). Look for \
         amount mismatches, inconsistent dates and reused images. Return:\n\
         {{\"risk_score\": number, \"indicators\": [string]}}",
        claim_header(request),
        document_json,
        damage_json,
    )
}

pub(crate) fn reasoning(request: &AnalysisRequest, prior: &PriorFindings) -> String {
    let prior_json = serde_json::to_string(prior).unwrap_or_default();
    format!(
        "{PREAMBLE}\n\n{}Findings so far: {}\n\n\
         Decide how confident you are that the claim should be paid in full and explain why \
         in a few sentences. Return:\n\
         {{\"confidence\": number, \"reasoning\": string}}",
        claim_header(request),
        prior_json,
    )
}
