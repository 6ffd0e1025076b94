//! Accumulated research state owned by a job's task.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CompetitorCandidate, Document, EvaluationResult, ResearchCategory};

/// What we learned about the target company.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub clients: Vec<String>,
    #[serde(default)]
    pub partners: Vec<String>,
    #[serde(default)]
    pub products: Vec<String>,
}

impl CompanyProfile {
    pub fn minimal(name: impl Into<String>, url: Option<String>) -> Self {
        Self {
            name: name.into(),
            url,
            ..Default::default()
        }
    }

    /// Industry, falling back to sector, then to a generic phrase.
    pub fn industry_label(&self) -> String {
        self.industry
            .as_deref()
            .or(self.sector.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} market", self.name))
    }

    pub fn primary_product(&self) -> String {
        self.products
            .first()
            .cloned()
            .unwrap_or_else(|| self.industry_label())
    }

    /// Text candidates are compared against.
    pub fn similarity_text(&self) -> String {
        let mut parts = vec![self.description.clone()];
        parts.extend(self.industry.clone());
        parts.extend(self.sector.clone());
        parts.extend(self.products.iter().cloned());
        parts.join(" ")
    }
}

/// Output of the discovery loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryOutcome {
    pub candidates: Vec<CompetitorCandidate>,
    pub evaluation: EvaluationResult,
    pub iterations: u32,
    pub passed: bool,
    pub failed_queries: usize,
}

/// One synthesized report section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionBrief {
    pub category: ResearchCategory,
    pub text: String,
    /// Built from document titles because completion failed.
    pub reconstructed: bool,
}

/// Everything a job has gathered so far. Grows phase by phase.
#[derive(Debug, Clone, Default)]
pub struct ResearchState {
    pub profile: Option<CompanyProfile>,
    pub candidates: Vec<CompetitorCandidate>,
    pub discovery: Option<DiscoveryOutcome>,
    pub raw_documents: BTreeMap<ResearchCategory, Vec<Document>>,
    pub curated: BTreeMap<ResearchCategory, Vec<Document>>,
    pub briefs: BTreeMap<ResearchCategory, SectionBrief>,
    pub report: Option<String>,
}

impl ResearchState {
    pub fn add_documents(&mut self, documents: impl IntoIterator<Item = Document>) {
        for document in documents {
            self.raw_documents
                .entry(document.category)
                .or_default()
                .push(document);
        }
    }

    pub fn document_count(&self) -> usize {
        self.raw_documents.values().map(Vec::len).sum()
    }

    pub fn curated_count(&self) -> usize {
        self.curated.values().map(Vec::len).sum()
    }

    /// Whether anything worth putting in a fallback report exists.
    pub fn has_data(&self) -> bool {
        self.profile.is_some() || !self.candidates.is_empty() || self.document_count() > 0
    }
}
