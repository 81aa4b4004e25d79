//! Renderers: [`ReportView`] → text, Markdown, HTML or JSON.
//!
//! Every renderer is a pure function of the view (plus an optional document
//! name), so rendering the same payload twice yields byte-identical output.
//! No timestamps are embedded for that reason.
//!
//! Empty conditions are content, not errors: a report without claims says so,
//! and a claim without evidence says so. Gap and question subsections are
//! omitted entirely when the view has none for a claim.

use crate::error::ScarfError;
use crate::view::{ClaimBlock, ReportView};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const NO_CLAIMS: &str = "No claims were extracted from this document.";
pub const NO_EVIDENCE: &str = "No evidence found";

/// Output format for a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Plain-text report for terminals (default).
    #[default]
    Text,
    Markdown,
    /// Split view: document structure beside the critique.
    Html,
    /// The view model itself.
    Json,
}

impl FromStr for ReportFormat {
    type Err = ScarfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            other => Err(ScarfError::InvalidConfig(format!(
                "unknown report format '{other}' (expected text, markdown, html or json)"
            ))),
        }
    }
}

impl ReportFormat {
    /// Conventional file extension, used when writing to a directory.
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Markdown => "md",
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
        }
    }
}

/// Render `view` in the requested format.
pub fn render(
    view: &ReportView,
    document: Option<&str>,
    format: ReportFormat,
) -> Result<String, ScarfError> {
    match format {
        ReportFormat::Text => Ok(render_text(view, document)),
        ReportFormat::Markdown => Ok(render_markdown(view, document)),
        ReportFormat::Html => Ok(render_html(view, document)),
        ReportFormat::Json => serde_json::to_string_pretty(view)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| ScarfError::Internal(format!("Failed to serialise report view: {e}"))),
    }
}

// ── Text ─────────────────────────────────────────────────────────────────────

pub fn render_text(view: &ReportView, document: Option<&str>) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);
    let thin = "-".repeat(60);

    out.push_str("SCARF ANALYSIS REPORT\n");
    if let Some(doc) = document {
        out.push_str(&format!("Document: {doc}\n"));
    }
    out.push_str(&format!("{rule}\n\n"));

    let s = &view.summary;
    out.push_str("SUMMARY\n");
    out.push_str(&format!("  {:<24}{:>6}\n", "Claims Extracted:", s.claims));
    out.push_str(&format!("  {:<24}{:>6}\n", "Evidence Links:", s.evidence));
    out.push_str(&format!("  {:<24}{:>6}\n", "Gaps Identified:", s.gaps));
    out.push_str(&format!("  {:<24}{:>6}\n", "Validation Questions:", s.questions));
    out.push_str(&format!("\n{thin}\n\n"));

    out.push_str("DOCUMENT STRUCTURE\n");
    for sec in &view.structure.sections {
        out.push_str(&format!("  {} ({})\n", sec.title, sec.section_id));
        if !sec.preview.is_empty() {
            out.push_str(&format!("    {}\n", sec.preview));
        }
    }
    out.push_str(&format!("\n{thin}\n\n"));

    out.push_str("CLAIMS ANALYSIS\n");
    if view.critique.claims.is_empty() {
        out.push_str(&format!("  {NO_CLAIMS}\n"));
    }
    for claim in &view.critique.claims {
        out.push('\n');
        text_claim(&mut out, claim);
    }

    out.push_str(&format!("\n{rule}\n"));
    out.push_str("Generated by SCARF - Scientific Claim Analysis & Reasoning Framework\n");
    out
}

fn text_claim(out: &mut String, claim: &ClaimBlock) {
    match &claim.confidence {
        Some(c) => {
            out.push_str(&format!("CLAIM #{} ({} CONFIDENCE)\n", claim.number, c.to_uppercase()));
        }
        None => {
            out.push_str(&format!("CLAIM #{}\n", claim.number));
        }
    }
    out.push_str(&format!("  | {}\n", claim.statement));

    out.push_str(&format!("EVIDENCE ({})\n", claim.evidence.len()));
    if claim.evidence.is_empty() {
        out.push_str(&format!("  {NO_EVIDENCE}\n"));
    }
    for (i, ev) in claim.evidence.iter().enumerate() {
        out.push_str(&format!("  [{}] {}\n", i + 1, ev.text));
        if let Some(src) = &ev.source {
            out.push_str(&format!("      Source: {src}\n"));
        }
    }

    if let Some(gaps) = &claim.gaps {
        out.push_str(&format!("GAPS IDENTIFIED ({})\n", gaps.len()));
        for g in gaps {
            out.push_str(&format!("  • {g}\n"));
        }
    }

    if let Some(questions) = &claim.questions {
        out.push_str(&format!("VALIDATION QUESTIONS ({})\n", questions.len()));
        for (i, q) in questions.iter().enumerate() {
            out.push_str(&format!("  {}. {q}\n", i + 1));
        }
    }
}

// ── Markdown ─────────────────────────────────────────────────────────────────

pub fn render_markdown(view: &ReportView, document: Option<&str>) -> String {
    let mut out = String::from("# SCARF Analysis Report\n\n");
    if let Some(doc) = document {
        out.push_str(&format!("_Document: {doc}_\n\n"));
    }

    let s = &view.summary;
    out.push_str("## Summary\n\n| Metric | Count |\n| --- | ---: |\n");
    out.push_str(&format!("| Claims Extracted | {} |\n", s.claims));
    out.push_str(&format!("| Evidence Links | {} |\n", s.evidence));
    out.push_str(&format!("| Gaps Identified | {} |\n", s.gaps));
    out.push_str(&format!("| Validation Questions | {} |\n\n", s.questions));

    out.push_str("## Document Structure\n\n");
    for sec in &view.structure.sections {
        out.push_str(&format!("### {} ({})\n\n", sec.title, sec.section_id));
        if !sec.preview.is_empty() {
            out.push_str(&format!("{}\n\n", sec.preview));
        }
    }

    out.push_str("## SCARF Critique\n\n");
    if view.critique.claims.is_empty() {
        out.push_str(&format!("{NO_CLAIMS}\n\n"));
    }
    for claim in &view.critique.claims {
        match &claim.confidence {
            Some(c) => {
                out.push_str(&format!(
                    "### Claim {} ({} confidence)\n\n",
                    claim.number,
                    c.to_lowercase()
                ));
            }
            None => {
                out.push_str(&format!("### Claim {}\n\n", claim.number));
            }
        }
        out.push_str(&format!("> {}\n\n", claim.statement));

        out.push_str(&format!("**Evidence ({})**\n\n", claim.evidence.len()));
        if claim.evidence.is_empty() {
            out.push_str(&format!("_{NO_EVIDENCE}_\n\n"));
        } else {
            for (i, ev) in claim.evidence.iter().enumerate() {
                match &ev.source {
                    Some(src) => {
                        out.push_str(&format!("{}. {} _(source: {src})_\n", i + 1, ev.text));
                    }
                    None => {
                        out.push_str(&format!("{}. {}\n", i + 1, ev.text));
                    }
                }
            }
            out.push('\n');
        }

        if let Some(gaps) = &claim.gaps {
            out.push_str("**⚠️ Gaps Detected:**\n\n");
            for g in gaps {
                out.push_str(&format!("- {g}\n"));
            }
            out.push('\n');
        }

        if let Some(questions) = &claim.questions {
            out.push_str("**❓ Research Questions:**\n\n");
            for q in questions {
                out.push_str(&format!("- {q}\n"));
            }
            out.push('\n');
        }
    }

    // exactly one trailing newline
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

// ── HTML ─────────────────────────────────────────────────────────────────────

pub fn render_html(view: &ReportView, document: Option<&str>) -> String {
    let title = match document {
        Some(doc) => format!("SCARF Critique: {}", escape_html(doc)),
        None => "SCARF Critique".to_string(),
    };

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n");
    out.push_str("<html lang=\"en\">\n");
    out.push_str(&format!("<head><meta charset=\"utf-8\"><title>{title}</title></head>\n"));
    out.push_str("<body>\n");
    out.push_str("<div id=\"resultsArea\" class=\"results-area\">\n");

    // Left: document structure
    out.push_str("<div id=\"originalView\" class=\"original-view\">\n");
    out.push_str("<h3>Document Structure</h3>\n");
    for sec in &view.structure.sections {
        out.push_str(&format!(
            "<div class=\"doc-section\"><h4>{} ({})</h4><p>{}</p></div>\n",
            escape_html(&sec.title),
            escape_html(&sec.section_id),
            escape_html(&sec.preview)
        ));
    }
    out.push_str("</div>\n");

    // Right: critique
    out.push_str("<div id=\"critiqueView\" class=\"critique-view\">\n");
    out.push_str("<h3>SCARF Critique</h3>\n");
    if view.critique.claims.is_empty() {
        out.push_str(&format!("<p class=\"empty\">{NO_CLAIMS}</p>\n"));
    }
    for claim in &view.critique.claims {
        html_claim(&mut out, claim);
    }
    out.push_str("</div>\n");

    out.push_str("</div>\n");
    out.push_str("</body>\n");
    out.push_str("</html>\n");
    out
}

fn html_claim(out: &mut String, claim: &ClaimBlock) {
    out.push_str(&format!(
        "<div class=\"claim-card\" data-claim-id=\"{}\">\n",
        escape_html(&claim.claim_id)
    ));
    out.push_str(&format!(
        "<div class=\"claim-header\"><span class=\"badge-claim\">CLAIM</span> {}</div>\n",
        escape_html(&claim.statement)
    ));

    if claim.evidence.is_empty() {
        out.push_str(&format!("<div class=\"evidence-section\"><em>{NO_EVIDENCE}</em></div>\n"));
    } else {
        let items: String = claim
            .evidence
            .iter()
            .map(|ev| match &ev.source {
                Some(src) => format!(
                    "<li>{} <small>{}</small></li>",
                    escape_html(&ev.text),
                    escape_html(src)
                ),
                None => format!("<li>{}</li>", escape_html(&ev.text)),
            })
            .collect();
        out.push_str(&format!(
            "<div class=\"evidence-section\"><strong>Evidence:</strong><ol>{items}</ol></div>\n"
        ));
    }

    if let Some(gaps) = &claim.gaps {
        let items: String = gaps
            .iter()
            .map(|g| format!("<li>{}</li>", escape_html(g)))
            .collect();
        out.push_str(&format!(
            "<div class=\"gap-section\"><strong>⚠️ Gaps Detected:</strong><ul>{items}</ul></div>\n"
        ));
    }

    if let Some(questions) = &claim.questions {
        let items: String = questions
            .iter()
            .map(|q| format!("<li>{}</li>", escape_html(q)))
            .collect();
        out.push_str(&format!(
            "<div class=\"question-section\"><strong>❓ Research Questions:</strong><ul>{items}</ul></div>\n"
        ));
    }

    out.push_str("</div>\n");
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportResult;
    use serde_json::json;

    fn view(v: serde_json::Value) -> ReportView {
        ReportView::build(&ReportResult::from_payload(Some(&v)).unwrap())
    }

    fn sample() -> ReportView {
        view(json!({
            "doc": {"sections": [{"section_id": "s1", "title": "Intro", "content": "Background."}]},
            "claims": {"claims": [
                {"claim_id": "c1", "statement": "A <b>bold</b> claim & more", "confidence": "high"},
                {"claim_id": "c2", "statement": "Second claim",
                 "evidence": [{"text": "Table 1", "source": "p. 2"}]}
            ]},
            "gaps": {"analysis": [{"claim_id": "c2", "signals": [{"signal": "Underpowered"}]}]},
            "validation": {"report": [{"claim_id": "c2", "questions": [{"question": "Sample size?"}]}]}
        }))
    }

    #[test]
    fn format_parsing() {
        assert_eq!("md".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert_eq!("HTML".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        assert!("pdf".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn text_report_layout() {
        let out = render_text(&sample(), Some("paper.pdf"));
        assert!(out.starts_with("SCARF ANALYSIS REPORT\nDocument: paper.pdf\n"));
        assert!(out.contains("CLAIM #1 (HIGH CONFIDENCE)"));
        assert!(out.contains("CLAIM #2\n"));
        assert!(out.contains("EVIDENCE (0)\n  No evidence found"));
        assert!(out.contains("  [1] Table 1\n      Source: p. 2"));
        assert!(out.contains("GAPS IDENTIFIED (1)\n  • Underpowered"));
        assert!(out.contains("VALIDATION QUESTIONS (1)\n  1. Sample size?"));
    }

    #[test]
    fn text_claim_without_matches_has_no_gap_or_question_section() {
        let out = render_text(&sample(), None);
        let c1 = out
            .split("CLAIM #2")
            .next()
            .and_then(|s| s.split("CLAIM #1").nth(1))
            .unwrap();
        assert!(!c1.contains("GAPS IDENTIFIED"));
        assert!(!c1.contains("VALIDATION QUESTIONS"));
    }

    #[test]
    fn empty_report_says_no_claims() {
        let v = ReportView::default();
        assert!(render_text(&v, None).contains(NO_CLAIMS));
        assert!(render_markdown(&v, None).contains(NO_CLAIMS));
        assert!(render_html(&v, None).contains(NO_CLAIMS));
    }

    #[test]
    fn html_escapes_payload_text() {
        let out = render_html(&sample(), Some("a&b.pdf"));
        assert!(out.contains("A &lt;b&gt;bold&lt;/b&gt; claim &amp; more"));
        assert!(!out.contains("<b>bold</b>"));
        assert!(out.contains("<title>SCARF Critique: a&amp;b.pdf</title>"));
    }

    #[test]
    fn html_has_split_view() {
        let out = render_html(&sample(), None);
        assert!(out.contains("<h3>Document Structure</h3>"));
        assert!(out.contains("<div class=\"doc-section\"><h4>Intro (s1)</h4><p>Background.</p></div>"));
        assert!(out.contains("<h3>SCARF Critique</h3>"));
        assert_eq!(out.matches("class=\"claim-card\"").count(), 2);
        assert_eq!(out.matches("class=\"gap-section\"").count(), 1);
        assert_eq!(out.matches("class=\"question-section\"").count(), 1);
    }

    #[test]
    fn markdown_ends_with_single_newline() {
        let out = render_markdown(&sample(), Some("paper.pdf"));
        assert!(out.ends_with('\n'));
        assert!(!out.ends_with("\n\n"));
        assert!(out.contains("### Claim 1 (high confidence)"));
        assert!(out.contains("**⚠️ Gaps Detected:**\n\n- Underpowered"));
    }

    #[test]
    fn rendering_twice_is_identical() {
        let v = sample();
        for format in [
            ReportFormat::Text,
            ReportFormat::Markdown,
            ReportFormat::Html,
            ReportFormat::Json,
        ] {
            let a = render(&v, Some("paper.pdf"), format).unwrap();
            let b = render(&v, Some("paper.pdf"), format).unwrap();
            assert_eq!(a, b, "{format:?} output differs between renders");
        }
    }

    #[test]
    fn json_is_the_view_model() {
        let v = sample();
        let out = render(&v, None, ReportFormat::Json).unwrap();
        let back: ReportView = serde_json::from_str(&out).unwrap();
        assert_eq!(back, v);
    }
}
