//! Company profiling
//!
//! Three concurrent searches about the target company, then one completion
//! that turns the evidence into a structured profile. If the completion
//! fails or cannot be parsed, the best snippet stands in as the description.

use serde::Deserialize;
use tracing::{info, warn};

use super::context::PhaseContext;
use super::extract_mentions::{json_slice, truncate};
use super::search::search_all;
use crate::domains::research::models::{
    CompanyProfile, Document, PhaseOutcome, ResearchCategory, ResearchState,
};
use crate::error::{ResearchError, Result};

const MAX_SOURCE_CHARS: usize = 1500;
const MAX_FALLBACK_CHARS: usize = 500;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProfileFields {
    description: String,
    industry: Option<String>,
    sector: Option<String>,
    clients: Vec<String>,
    partners: Vec<String>,
    products: Vec<String>,
}

pub fn profile_queries(company: &str) -> Vec<String> {
    vec![
        format!("{} company overview", company),
        format!("{} products services customers", company),
        format!("{} industry market sector", company),
    ]
}

/// Build the profile and keep the gathered documents in `state`.
pub async fn build_profile(
    ctx: &PhaseContext<'_>,
    company: &str,
    company_url: Option<&str>,
    state: &mut ResearchState,
) -> Result<PhaseOutcome<CompanyProfile>> {
    let results = search_all(
        ctx,
        profile_queries(company)
            .into_iter()
            .map(|q| (ResearchCategory::Company, q))
            .collect(),
        ctx.settings().enrichment.results_per_query,
    )
    .await?;

    let failed = results.iter().filter(|r| r.failed()).count();
    let mut documents: Vec<Document> = results
        .into_iter()
        .filter_map(|r| r.outcome.ok())
        .flatten()
        .collect();
    documents.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

    let minimal = CompanyProfile::minimal(company, company_url.map(str::to_string));
    if documents.is_empty() {
        warn!(job_id = %ctx.job_id, company, "No profile evidence found");
        return Ok(PhaseOutcome::Degraded(
            minimal,
            "no evidence found for company profile".to_string(),
        ));
    }

    let prompt = build_profile_prompt(company, company_url, &documents);
    let parsed = match ctx.deps.gateway.complete(&prompt, ctx.cancel).await {
        Ok(response) => parse_profile(&response),
        Err(error) => {
            if let Some(fatal) = ResearchError::escalate(&error) {
                return Err(fatal);
            }
            warn!(job_id = %ctx.job_id, error = %error, "Profile completion failed");
            None
        }
    };

    let best_snippet = truncate(&documents[0].content, MAX_FALLBACK_CHARS).to_string();
    let outcome = match parsed {
        Some(fields) => {
            let description = if fields.description.trim().is_empty() {
                best_snippet
            } else {
                fields.description
            };
            let profile = CompanyProfile {
                description,
                industry: fields.industry.filter(|s| !s.trim().is_empty()),
                sector: fields.sector.filter(|s| !s.trim().is_empty()),
                clients: fields.clients,
                partners: fields.partners,
                products: fields.products,
                ..minimal
            };
            PhaseOutcome::degraded_if(profile, failed > 0, || {
                format!("{} profile queries failed", failed)
            })
        }
        None => PhaseOutcome::Degraded(
            CompanyProfile {
                description: best_snippet,
                ..minimal
            },
            "profile built from search snippets".to_string(),
        ),
    };

    info!(
        job_id = %ctx.job_id,
        company,
        documents = documents.len(),
        degraded = outcome.is_degraded(),
        "Company profile built"
    );
    state.add_documents(documents);
    Ok(outcome)
}

fn build_profile_prompt(company: &str, url: Option<&str>, documents: &[Document]) -> String {
    let mut prompt = String::from("TASK: company-profile\n\n");
    prompt.push_str(&format!("Company: {}\n", company));
    if let Some(url) = url {
        prompt.push_str(&format!("Website: {}\n", url));
    }
    prompt.push_str("\n## Sources\n\n");
    for (i, document) in documents.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] {}\n{}\n\n",
            i + 1,
            document.label(),
            truncate(&document.content, MAX_SOURCE_CHARS)
        ));
    }
    prompt.push_str(
        "## Response Format\n\n\
         Respond with only a JSON object:\n\
         {\"description\": \"two sentences\", \"industry\": \"...\", \"sector\": \"...\", \
         \"clients\": [\"...\"], \"partners\": [\"...\"], \"products\": [\"...\"]}\n",
    );
    prompt
}

fn parse_profile(response: &str) -> Option<ProfileFields> {
    let json = json_slice(response, '{', '}')?;
    match serde_json::from_str(json) {
        Ok(fields) => Some(fields),
        Err(error) => {
            warn!(error = %error, "Could not parse profile response");
            None
        }
    }
}
