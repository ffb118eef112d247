use crate::budget::BudgetState;
use crate::rules::MechanismId;
use crate::section::{Section, SectionType};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ApplicationId = Uuid;
pub type UserId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Draft,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub owner_id: UserId,
    pub title: String,
    pub mechanism: MechanismId,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub architecture: Option<ArchitectureData>,
    #[serde(default)]
    pub budget: Option<BudgetState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn new(owner_id: UserId, title: impl Into<String>, mechanism: MechanismId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            mechanism,
            status: ApplicationStatus::Draft,
            sections: Vec::new(),
            attachments: Vec::new(),
            references: Vec::new(),
            architecture: None,
            budget: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn section(&self, section_type: SectionType) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.section_type == section_type)
    }

    pub fn has_section(&self, section_type: SectionType) -> bool {
        self.section(section_type).is_some()
    }

    /// Inserts or replaces the section of the same type.
    pub fn upsert_section(&mut self, section: Section) {
        match self
            .sections
            .iter_mut()
            .find(|s| s.section_type == section.section_type)
        {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
        self.touch();
    }

    pub fn remove_section(&mut self, section_type: SectionType) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.section_type != section_type);
        let removed = self.sections.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub id: Uuid,
    pub citation: String,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub verification: Option<VerificationResult>,
}

impl Reference {
    pub fn new(citation: impl Into<String>) -> Self {
        let citation = citation.into();
        Self {
            id: Uuid::new_v4(),
            doi: extract_doi(&citation),
            citation,
            verification: None,
        }
    }

    pub fn is_unverified(&self) -> bool {
        matches!(&self.verification, Some(v) if !v.verified)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub matched_title: Option<String>,
    pub doi: Option<String>,
    pub score: f64,
    pub checked_at: DateTime<Utc>,
}

static DOI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(10\.\d{4,9}/[^\s"<>]+)"#).expect("valid DOI regex"));

/// Pulls the first DOI out of a free-form citation, without trailing punctuation.
pub fn extract_doi(citation: &str) -> Option<String> {
    DOI_PATTERN
        .captures(citation)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ')']).to_lowercase())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchitectureData {
    #[serde(default)]
    pub central_hypothesis: String,
    #[serde(default)]
    pub innovation: String,
    #[serde(default)]
    pub aims: Vec<Aim>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Aim {
    pub title: String,
    #[serde(default)]
    pub hypothesis: String,
    #[serde(default)]
    pub falsifiable: bool,
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub rationale: String,
}

impl Aim {
    /// Title, hypothesis and rationale joined for keyword matching.
    pub fn combined_text(&self) -> String {
        format!("{}\n{}\n{}", self.title, self.hypothesis, self.rationale)
    }
}
