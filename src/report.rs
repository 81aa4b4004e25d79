//! The completed-job payload produced by the analysis pipeline.
//!
//! The client treats this as read-only external data. Every collection is
//! `#[serde(default)]`: a pipeline stage that produced nothing (no gaps, no
//! validation report) simply omits its key, and that must read as "none
//! found", not as a decode failure.

use serde::{Deserialize, Serialize};

/// `result` of a `COMPLETED` status response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    #[serde(default)]
    pub doc: DocStructure,
    #[serde(default)]
    pub claims: ClaimSet,
    #[serde(default)]
    pub gaps: GapAnalysis,
    #[serde(default)]
    pub validation: ValidationReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocStructure {
    #[serde(default)]
    pub sections: Vec<DocSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocSection {
    pub section_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    #[serde(default)]
    pub claims: Vec<Claim>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: String,
    pub statement: String,
    /// `high` / `medium` / `low` when the pipeline rates the claim.
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    #[serde(default)]
    pub analysis: Vec<ClaimGaps>,
}

/// Gap signals attached to one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimGaps {
    pub claim_id: String,
    #[serde(default)]
    pub signals: Vec<GapSignal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapSignal {
    pub signal: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(default)]
    pub report: Vec<ClaimValidation>,
}

/// Validation questions attached to one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimValidation {
    pub claim_id: String,
    #[serde(default)]
    pub questions: Vec<ValidationQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationQuestion {
    pub question: String,
}

impl ReportResult {
    /// Decode a `result` value; `None` (a completed job without a payload)
    /// reads as an empty report.
    pub fn from_payload(payload: Option<&serde_json::Value>) -> Result<Self, serde_json::Error> {
        match payload {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(v) => Self::deserialize(v),
        }
    }

    /// First gap entry for `claim_id`, if any.
    pub fn gaps_for(&self, claim_id: &str) -> Option<&ClaimGaps> {
        self.gaps.analysis.iter().find(|g| g.claim_id == claim_id)
    }

    /// First validation entry for `claim_id`, if any.
    pub fn validation_for(&self, claim_id: &str) -> Option<&ClaimValidation> {
        self.validation
            .report
            .iter()
            .find(|v| v.claim_id == claim_id)
    }
}
