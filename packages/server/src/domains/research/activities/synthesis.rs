//! Report synthesis
//!
//! One concurrent completion per non-empty category writes a section brief;
//! a failed brief is rebuilt from its document titles. A final completion
//! composes the executive report. If that fails the caller falls back to
//! [`fallback_report`], which needs no external calls.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use futures::future::join_all;
use tracing::{info, warn};

use super::context::PhaseContext;
use super::extract_mentions::truncate;
use super::role_focus::RoleFocus;
use crate::domains::research::models::{
    CompanyProfile, Document, PhaseOutcome, ResearchCategory, ResearchState, SectionBrief,
};
use crate::error::{ResearchError, Result};

const MAX_BRIEF_DOCUMENTS: usize = 10;
const MAX_BRIEF_DOCUMENT_CHARS: usize = 500;
const MAX_FALLBACK_SOURCES: usize = 5;

/// Write section briefs into `state.briefs`.
///
/// Returns the sections that had to be reconstructed, degraded if any.
pub async fn write_briefs(
    ctx: &PhaseContext<'_>,
    company: &str,
    state: &mut ResearchState,
) -> Result<PhaseOutcome<Vec<ResearchCategory>>> {
    let sections: Vec<(ResearchCategory, &Vec<Document>)> = state
        .curated
        .iter()
        .filter(|(_, documents)| !documents.is_empty())
        .map(|(category, documents)| (*category, documents))
        .collect();

    let drafts = join_all(sections.iter().map(|(category, documents)| async move {
        let prompt = build_brief_prompt(company, *category, documents);
        let result = ctx.deps.gateway.complete(&prompt, ctx.cancel).await;
        (*category, result)
    }))
    .await;
    ctx.check_cancelled()?;

    let mut briefs = BTreeMap::new();
    for (category, result) in drafts {
        let documents = &state.curated[&category];
        let brief = match result {
            Ok(text) if !text.trim().is_empty() => SectionBrief {
                category,
                text: text.trim().to_string(),
                reconstructed: false,
            },
            Ok(_) => {
                warn!(job_id = %ctx.job_id, category = %category, "Empty section brief");
                reconstruct_brief(category, documents)
            }
            Err(error) => {
                if let Some(fatal) = ResearchError::escalate(&error) {
                    return Err(fatal);
                }
                warn!(job_id = %ctx.job_id, category = %category, error = %error, "Section brief failed");
                reconstruct_brief(category, documents)
            }
        };
        briefs.insert(category, brief);
    }

    let reconstructed: Vec<ResearchCategory> = briefs
        .values()
        .filter(|b| b.reconstructed)
        .map(|b| b.category)
        .collect();
    state.briefs = briefs;

    info!(
        job_id = %ctx.job_id,
        briefs = state.briefs.len(),
        reconstructed = reconstructed.len(),
        "Section briefs written"
    );

    let degraded = !reconstructed.is_empty();
    let reason = format!(
        "sections reconstructed from sources: {}",
        reconstructed
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(PhaseOutcome::degraded_if(reconstructed, degraded, || reason))
}

/// Compose the final report.
///
/// Any non-fatal provider failure, or an empty answer, is a
/// `SynthesisFailure`.
pub async fn write_report(
    ctx: &PhaseContext<'_>,
    company: &str,
    user_role: Option<&str>,
    state: &ResearchState,
) -> Result<String> {
    let prompt = build_report_prompt(company, user_role, state);
    let report = ctx
        .deps
        .gateway
        .complete(&prompt, ctx.cancel)
        .await
        .map_err(|error| {
            ResearchError::escalate(&error)
                .unwrap_or_else(|| ResearchError::SynthesisFailure(error.to_string()))
        })?;

    let report = report.trim();
    if report.is_empty() {
        return Err(ResearchError::SynthesisFailure(
            "completion returned an empty report".to_string(),
        ));
    }
    Ok(report.to_string())
}

fn build_brief_prompt(company: &str, category: ResearchCategory, documents: &[Document]) -> String {
    let mut prompt = String::from("TASK: section-brief\n\n");
    let _ = writeln!(prompt, "Company: {}", company);
    let _ = writeln!(prompt, "Section: {}\n", category.title());
    prompt.push_str("## Sources\n\n");
    for (i, document) in documents.iter().take(MAX_BRIEF_DOCUMENTS).enumerate() {
        let _ = writeln!(
            prompt,
            "[{}] {} ({})\n{}\n",
            i + 1,
            document.label(),
            document.url,
            truncate(&document.content, MAX_BRIEF_DOCUMENT_CHARS)
        );
    }
    prompt.push_str(
        "Write a concise brief of 3-5 bullet points for this section. \
         Cite sources by their number. Respond with markdown only.\n",
    );
    prompt
}

fn build_report_prompt(company: &str, user_role: Option<&str>, state: &ResearchState) -> String {
    let mut prompt = String::from("TASK: executive-report\n\n");
    let _ = writeln!(prompt, "Company: {}", company);
    if let Some(role) = user_role {
        let _ = writeln!(prompt, "Prepared for: {}", role);
        let focus = RoleFocus::infer(Some(role));
        let _ = writeln!(prompt, "Focus areas: {}", focus.interests().join(", "));
    }
    if let Some(profile) = &state.profile {
        let _ = writeln!(prompt, "Industry: {}", profile.industry_label());
        if !profile.description.is_empty() {
            let _ = writeln!(prompt, "Description: {}", profile.description);
        }
    }

    prompt.push_str("\n## Competitors\n\n");
    for candidate in &state.candidates {
        let _ = writeln!(
            prompt,
            "- {} ({}, score {:.2})",
            candidate.name,
            candidate.category.as_str(),
            candidate.score
        );
    }

    for brief in state.briefs.values() {
        let _ = writeln!(prompt, "\n## {}\n\n{}", brief.category.title(), brief.text);
    }

    prompt.push_str(
        "\nWrite an executive research report in markdown with a title, an executive summary, \
         one section per topic above and a short list of recommendations",
    );
    match user_role {
        Some(role) => {
            let _ = writeln!(prompt, " tailored to a {}.", role);
        }
        None => prompt.push_str(".\n"),
    }
    prompt
}

fn reconstruct_brief(category: ResearchCategory, documents: &[Document]) -> SectionBrief {
    SectionBrief {
        category,
        text: source_list(documents),
        reconstructed: true,
    }
}

fn source_list(documents: &[Document]) -> String {
    documents
        .iter()
        .take(MAX_FALLBACK_SOURCES)
        .map(|d| format!("- {} ({})", d.label(), d.url))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sections [`fallback_report`] writes: those with a brief or any documents.
pub fn fallback_sections(state: &ResearchState) -> Vec<ResearchCategory> {
    ResearchCategory::ALL
        .into_iter()
        .filter(|category| {
            state.briefs.contains_key(category) || !section_documents(state, *category).is_empty()
        })
        .collect()
}

/// Curated documents when curation ran, raw documents otherwise.
fn section_documents(state: &ResearchState, category: ResearchCategory) -> &[Document] {
    state
        .curated
        .get(&category)
        .or_else(|| state.raw_documents.get(&category))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Minimal markdown report assembled from whatever `state` holds.
pub fn fallback_report(company: &str, state: &ResearchState) -> String {
    let mut report = format!("# {} Research Report\n\n## Overview\n\n", company);

    match &state.profile {
        Some(CompanyProfile { description, .. }) if !description.is_empty() => {
            let _ = writeln!(report, "{}", description);
        }
        _ => report.push_str("No profile information was gathered.\n"),
    }
    if let Some(profile) = &state.profile {
        if profile.industry.is_some() || profile.sector.is_some() {
            let _ = writeln!(report, "\nIndustry: {}", profile.industry_label());
        }
    }

    report.push_str("\n## Competitors\n\n");
    if state.candidates.is_empty() {
        report.push_str("No competitors identified.\n");
    }
    for candidate in &state.candidates {
        let _ = writeln!(report, "- {} ({})", candidate.name, candidate.category.as_str());
    }

    for category in fallback_sections(state) {
        let section = match state.briefs.get(&category) {
            Some(brief) => brief.text.clone(),
            None => source_list(section_documents(state, category)),
        };
        let _ = write!(report, "\n## {}\n\n{}\n", category.title(), section);
    }

    report.push_str(
        "\n## Note\n\nThis report was assembled from partial research data because \
         synthesis did not complete.\n",
    );
    report
}
