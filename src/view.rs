//! View models: the displayable shape of a completed report.
//!
//! [`ReportView::build`] is a pure function of a [`ReportResult`]. Renderers in
//! [`crate::render`] consume the view, never the raw payload, so the lookup
//! rules (which gaps and questions belong to which claim, how much of a section
//! to preview) live in exactly one place and can be tested without any output
//! format.

use crate::report::{Claim, ReportResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Characters of section content shown in the structural view.
pub const PREVIEW_CHARS: usize = 300;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Both views plus the summary counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportView {
    pub structure: StructureView,
    pub critique: CritiqueView,
    pub summary: ReportSummary,
}

/// One block per document section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureView {
    pub sections: Vec<SectionBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionBlock {
    pub section_id: String,
    pub title: String,
    pub preview: String,
    pub truncated: bool,
}

/// One block per extracted claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CritiqueView {
    pub claims: Vec<ClaimBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimBlock {
    /// 1-indexed position in the claims list.
    pub number: usize,
    pub claim_id: String,
    pub statement: String,
    pub confidence: Option<String>,
    pub evidence: Vec<EvidenceItem>,
    /// `None` when no gap entry matched or the match carried no signals.
    pub gaps: Option<Vec<String>>,
    /// `None` when no validation entry matched or it carried no questions.
    pub questions: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub text: String,
    pub source: Option<String>,
}

/// Counts for the summary table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub sections: usize,
    pub claims: usize,
    pub evidence: usize,
    /// Gap signals attached to extracted claims.
    pub gaps: usize,
    /// Validation questions attached to extracted claims.
    pub questions: usize,
}

impl ReportView {
    pub fn build(report: &ReportResult) -> Self {
        let structure = StructureView {
            sections: report
                .doc
                .sections
                .iter()
                .map(|s| {
                    let (preview, truncated) = preview(&s.content, PREVIEW_CHARS);
                    SectionBlock {
                        section_id: s.section_id.clone(),
                        title: s.title.clone(),
                        preview,
                        truncated,
                    }
                })
                .collect(),
        };

        let critique = CritiqueView {
            claims: report
                .claims
                .claims
                .iter()
                .enumerate()
                .map(|(i, c)| claim_block(report, i + 1, c))
                .collect(),
        };

        let summary = ReportSummary {
            sections: structure.sections.len(),
            claims: critique.claims.len(),
            evidence: critique.claims.iter().map(|c| c.evidence.len()).sum(),
            gaps: critique
                .claims
                .iter()
                .map(|c| c.gaps.as_ref().map_or(0, Vec::len))
                .sum(),
            questions: critique
                .claims
                .iter()
                .map(|c| c.questions.as_ref().map_or(0, Vec::len))
                .sum(),
        };

        Self {
            structure,
            critique,
            summary,
        }
    }
}

fn claim_block(report: &ReportResult, number: usize, claim: &Claim) -> ClaimBlock {
    let gaps = report
        .gaps_for(&claim.claim_id)
        .filter(|g| !g.signals.is_empty())
        .map(|g| g.signals.iter().map(|s| s.signal.clone()).collect());

    let questions = report
        .validation_for(&claim.claim_id)
        .filter(|v| !v.questions.is_empty())
        .map(|v| v.questions.iter().map(|q| q.question.clone()).collect());

    ClaimBlock {
        number,
        claim_id: claim.claim_id.clone(),
        statement: claim.statement.clone(),
        confidence: claim.confidence.clone(),
        evidence: claim
            .evidence
            .iter()
            .map(|e| EvidenceItem {
                text: e.text.clone(),
                source: e.source.clone(),
            })
            .collect(),
        gaps,
        questions,
    }
}

/// Collapse whitespace runs and keep the first `max_chars` characters.
///
/// Returns the preview and whether anything was cut. Counts Unicode scalar
/// values, so a multi-byte character is never split.
pub fn preview(content: &str, max_chars: usize) -> (String, bool) {
    let collapsed = WHITESPACE_RUN.replace_all(content.trim(), " ");
    match collapsed.char_indices().nth(max_chars) {
        Some((cut, _)) => (format!("{}...", collapsed[..cut].trim_end()), true),
        None => (collapsed.into_owned(), false),
    }
}
