//! Competitor candidates and the raw mentions they are built from.

use serde::{Deserialize, Serialize};

/// How a candidate competes with the target company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateCategory {
    #[default]
    Direct,
    Indirect,
    Emerging,
    /// Added by a reviewer at the checkpoint.
    Manual,
}

impl CandidateCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Indirect => "indirect",
            Self::Emerging => "emerging",
            Self::Manual => "manual",
        }
    }

    /// Lenient parse for model output; unknown labels read as `Direct`.
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "indirect" | "adjacent" | "substitute" => Self::Indirect,
            "emerging" | "startup" | "new_entrant" | "new entrant" => Self::Emerging,
            "manual" => Self::Manual,
            _ => Self::Direct,
        }
    }

    /// Higher wins when two candidates merge.
    fn specificity(self) -> u8 {
        match self {
            Self::Direct => 3,
            Self::Indirect => 2,
            Self::Emerging => 1,
            Self::Manual => 0,
        }
    }
}

/// One source that mentioned a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEvidence {
    pub source_id: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// A raw entity mention extracted from one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    pub name: String,
    pub source_id: String,
    pub confidence: f32,
    pub category: CandidateCategory,
    pub snippet: Option<String>,
    pub description: Option<String>,
}

/// A deduplicated, scored competitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorCandidate {
    pub name: String,
    pub category: CandidateCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unique by `source_id`.
    #[serde(default)]
    pub evidence: Vec<SourceEvidence>,
    /// Number of distinct sources mentioning this candidate.
    #[serde(default)]
    pub frequency: u32,
    /// Highest confidence any source assigned.
    #[serde(default)]
    pub confidence: f32,
    /// Similarity of the evidence text to the company profile.
    #[serde(default)]
    pub similarity: f32,
    /// Composite ranking score.
    #[serde(default)]
    pub score: f32,
}

impl CompetitorCandidate {
    pub fn from_mention(name: impl Into<String>, mention: &EntityMention) -> Self {
        let confidence = mention.confidence.clamp(0.0, 1.0);
        Self {
            name: name.into(),
            category: mention.category,
            description: mention.description.clone(),
            evidence: vec![SourceEvidence {
                source_id: mention.source_id.clone(),
                confidence,
                snippet: mention.snippet.clone(),
            }],
            frequency: 1,
            confidence,
            similarity: 0.0,
            score: 0.0,
        }
    }

    /// Reviewer-supplied candidate without gathered evidence.
    pub fn manual(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: CandidateCategory::Manual,
            description: None,
            evidence: Vec::new(),
            frequency: 0,
            confidence: 1.0,
            similarity: 0.0,
            score: 0.0,
        }
    }

    pub fn mean_source_confidence(&self) -> f32 {
        if self.evidence.is_empty() {
            return self.confidence;
        }
        self.evidence.iter().map(|e| e.confidence).sum::<f32>() / self.evidence.len() as f32
    }

    /// Text used for similarity scoring.
    pub fn evidence_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        if let Some(description) = &self.description {
            parts.push(description);
        }
        parts.extend(self.evidence.iter().filter_map(|e| e.snippet.as_deref()));
        parts.join(" ")
    }

    /// Fold `other` into `self`.
    ///
    /// Evidence is unioned by source id keeping the higher confidence, so
    /// frequency grows by the number of new sources and merging a candidate
    /// with itself changes nothing.
    pub fn merge(&mut self, other: CompetitorCandidate) {
        for incoming in other.evidence {
            match self
                .evidence
                .iter_mut()
                .find(|e| e.source_id == incoming.source_id)
            {
                Some(existing) => {
                    if incoming.confidence > existing.confidence {
                        existing.confidence = incoming.confidence;
                    }
                    if existing.snippet.is_none() {
                        existing.snippet = incoming.snippet;
                    }
                }
                None => self.evidence.push(incoming),
            }
        }

        self.frequency = self.evidence.len() as u32;
        self.confidence = self.confidence.max(other.confidence);
        self.similarity = self.similarity.max(other.similarity);
        self.score = self.score.max(other.score);
        if other.category.specificity() > self.category.specificity() {
            self.category = other.category;
        }
        if self.description.is_none() {
            self.description = other.description;
        }
    }
}

/// A reviewer's edit submitted at the checkpoint.
///
/// Accepts either a bare name or an object so simple clients can post
/// `["Rival A", "Rival B"]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CompetitorEdit {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        category: Option<CandidateCategory>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl CompetitorEdit {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Detailed { name, .. } => name,
        }
    }
}
