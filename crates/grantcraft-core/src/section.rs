use crate::error::{GrantError, Result};
use crate::text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    SpecificAims,
    ResearchStrategy,
    Significance,
    Innovation,
    Approach,
    ProjectSummary,
    ProjectNarrative,
    Introduction,
    Bibliography,
    FacilitiesResources,
    EquipmentDescription,
    HumanSubjects,
    VertebrateAnimals,
    CommercializationPlan,
    LettersOfSupport,
    DataManagementSharing,
    BudgetJustification,
    Other,
}

impl SectionType {
    pub fn all() -> &'static [SectionType] {
        &[
            SectionType::SpecificAims,
            SectionType::ResearchStrategy,
            SectionType::Significance,
            SectionType::Innovation,
            SectionType::Approach,
            SectionType::ProjectSummary,
            SectionType::ProjectNarrative,
            SectionType::Introduction,
            SectionType::Bibliography,
            SectionType::FacilitiesResources,
            SectionType::EquipmentDescription,
            SectionType::HumanSubjects,
            SectionType::VertebrateAnimals,
            SectionType::CommercializationPlan,
            SectionType::LettersOfSupport,
            SectionType::DataManagementSharing,
            SectionType::BudgetJustification,
            SectionType::Other,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::SpecificAims => "specific_aims",
            SectionType::ResearchStrategy => "research_strategy",
            SectionType::Significance => "significance",
            SectionType::Innovation => "innovation",
            SectionType::Approach => "approach",
            SectionType::ProjectSummary => "project_summary",
            SectionType::ProjectNarrative => "project_narrative",
            SectionType::Introduction => "introduction",
            SectionType::Bibliography => "bibliography",
            SectionType::FacilitiesResources => "facilities_resources",
            SectionType::EquipmentDescription => "equipment_description",
            SectionType::HumanSubjects => "human_subjects",
            SectionType::VertebrateAnimals => "vertebrate_animals",
            SectionType::CommercializationPlan => "commercialization_plan",
            SectionType::LettersOfSupport => "letters_of_support",
            SectionType::DataManagementSharing => "data_management_sharing",
            SectionType::BudgetJustification => "budget_justification",
            SectionType::Other => "other",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionType::SpecificAims => "Specific Aims",
            SectionType::ResearchStrategy => "Research Strategy",
            SectionType::Significance => "Significance",
            SectionType::Innovation => "Innovation",
            SectionType::Approach => "Approach",
            SectionType::ProjectSummary => "Project Summary",
            SectionType::ProjectNarrative => "Project Narrative",
            SectionType::Introduction => "Introduction",
            SectionType::Bibliography => "Bibliography",
            SectionType::FacilitiesResources => "Facilities and Other Resources",
            SectionType::EquipmentDescription => "Equipment",
            SectionType::HumanSubjects => "Protection of Human Subjects",
            SectionType::VertebrateAnimals => "Vertebrate Animals",
            SectionType::CommercializationPlan => "Commercialization Plan",
            SectionType::LettersOfSupport => "Letters of Support",
            SectionType::DataManagementSharing => "Data Management and Sharing Plan",
            SectionType::BudgetJustification => "Budget Justification",
            SectionType::Other => "Other",
        }
    }

    /// Heading variants recognised when splitting an uploaded document.
    fn heading_aliases(&self) -> &'static [&'static str] {
        match self {
            SectionType::SpecificAims => &["specific aims"],
            SectionType::ResearchStrategy => &["research strategy"],
            SectionType::Significance => &["significance"],
            SectionType::Innovation => &["innovation"],
            SectionType::Approach => &["approach"],
            SectionType::ProjectSummary => &["project summary", "project summary/abstract", "abstract"],
            SectionType::ProjectNarrative => &["project narrative", "public health relevance"],
            SectionType::Introduction => &["introduction to application", "introduction to resubmission", "introduction"],
            SectionType::Bibliography => &["bibliography", "references cited", "literature cited", "references"],
            SectionType::FacilitiesResources => &["facilities and other resources", "facilities & other resources"],
            SectionType::EquipmentDescription => &["equipment"],
            SectionType::HumanSubjects => &["protection of human subjects", "human subjects"],
            SectionType::VertebrateAnimals => &["vertebrate animals"],
            SectionType::CommercializationPlan => &["commercialization plan"],
            SectionType::LettersOfSupport => &["letters of support"],
            SectionType::DataManagementSharing => &["data management and sharing plan", "data management and sharing"],
            SectionType::BudgetJustification => &["budget justification"],
            SectionType::Other => &[],
        }
    }

    /// Headings reviewers expect to find inside the section.
    pub fn required_headings(&self) -> &'static [&'static str] {
        match self {
            SectionType::ResearchStrategy => &["Significance", "Innovation", "Approach"],
            SectionType::SpecificAims => &["Aim 1"],
            SectionType::CommercializationPlan => &[
                "Value",
                "Company",
                "Market",
                "Intellectual Property",
                "Finance",
                "Revenue",
            ],
            _ => &[],
        }
    }

    /// Sections that make up the Research Strategy attachment.
    pub fn is_strategy_part(&self) -> bool {
        matches!(
            self,
            SectionType::Significance | SectionType::Innovation | SectionType::Approach
        )
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        SectionType::all()
            .iter()
            .find(|t| t.as_str() == normalized)
            .copied()
            .ok_or_else(|| GrantError::Validation(format!("unknown section type: {}", s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub section_type: SectionType,
    /// Editor content, HTML or plain text.
    pub content: String,
    pub word_count: usize,
    pub page_count: f64,
}

impl Section {
    pub fn new(section_type: SectionType, content: impl Into<String>) -> Self {
        let content = content.into();
        let plain = text::strip_html(&content);
        Self {
            section_type,
            word_count: text::word_count(&plain),
            page_count: text::estimate_pages(&plain),
            content,
        }
    }

    pub fn plain_text(&self) -> String {
        text::strip_html(&self.content)
    }

    pub fn title(&self) -> &'static str {
        self.section_type.title()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSection {
    pub section_type: SectionType,
    pub heading: String,
    pub content: String,
}

impl ExtractedSection {
    pub fn into_section(self) -> Section {
        Section::new(self.section_type, self.content)
    }
}

/// Longest aliases first so "project summary/abstract" wins over "abstract".
fn heading_table() -> Vec<(&'static str, SectionType)> {
    let mut table: Vec<(&'static str, SectionType)> = SectionType::all()
        .iter()
        .flat_map(|t| t.heading_aliases().iter().map(move |alias| (*alias, *t)))
        .collect();
    table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    table
}

fn match_heading(line: &str, table: &[(&'static str, SectionType)]) -> Option<SectionType> {
    let candidate = text::heading_candidate(line).to_lowercase();
    if candidate.is_empty() || candidate.len() > 60 {
        return None;
    }
    table.iter().find_map(|(alias, t)| {
        let rest = candidate.strip_prefix(alias)?;
        // The heading must be the whole line, allowing a short suffix like "(continued)".
        let rest = rest.trim();
        if rest.is_empty() || (rest.starts_with('(') && rest.len() <= 20) {
            Some(*t)
        } else {
            None
        }
    })
}

fn flush_section(
    sections: &mut Vec<ExtractedSection>,
    section_type: SectionType,
    heading: &str,
    buffer: &mut Vec<&str>,
) {
    let content = buffer.join("\n").trim().to_string();
    buffer.clear();
    if content.is_empty() && section_type == SectionType::Other {
        return;
    }
    sections.push(ExtractedSection {
        section_type,
        heading: heading.to_string(),
        content,
    });
}

/// Splits extracted document text on recognised NIH section headings.
///
/// Text before the first heading is returned as [`SectionType::Other`] when
/// it has content. Repeated headings produce separate sections in document
/// order.
pub fn split_document(text: &str) -> Vec<ExtractedSection> {
    let table = heading_table();
    let mut sections = Vec::new();
    let mut current_type = SectionType::Other;
    let mut current_heading = String::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(found) = match_heading(line, &table) {
            flush_section(&mut sections, current_type, &current_heading, &mut buffer);
            current_type = found;
            current_heading = line.trim().to_string();
        } else {
            buffer.push(line);
        }
    }
    flush_section(&mut sections, current_type, &current_heading, &mut buffer);

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_section_types_from_paths() {
        assert_eq!(
            "specific-aims".parse::<SectionType>().unwrap(),
            SectionType::SpecificAims
        );
        assert_eq!(
            "Research Strategy".parse::<SectionType>().unwrap(),
            SectionType::ResearchStrategy
        );
        assert!("appendix".parse::<SectionType>().is_err());
    }

    #[test]
    fn section_counts_words_from_html() {
        let section = Section::new(SectionType::SpecificAims, "<p>one two</p><p>three</p>");
        assert_eq!(section.word_count, 3);
        assert_eq!(section.page_count, 0.1);
    }

    #[test]
    fn splits_on_headings() {
        let doc = "Cover page text\nSPECIFIC AIMS\nAim 1 text.\nResearch Strategy\nA. Significance\nWhy it matters.\nB. Innovation\nNew things.\nC. Approach\nHow.\nReferences Cited\n1. Smith J. Nature 2020.";
        let sections = split_document(doc);
        let types: Vec<SectionType> = sections.iter().map(|s| s.section_type).collect();
        assert_eq!(
            types,
            vec![
                SectionType::Other,
                SectionType::SpecificAims,
                SectionType::ResearchStrategy,
                SectionType::Significance,
                SectionType::Innovation,
                SectionType::Approach,
                SectionType::Bibliography,
            ]
        );
        assert_eq!(sections[1].content, "Aim 1 text.");
        assert_eq!(sections[3].heading, "A. Significance");
    }

    #[test]
    fn body_lines_are_not_headings() {
        let doc = "Specific Aims\nThe approach we take builds on prior work in this area.";
        let sections = split_document(doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section_type, SectionType::SpecificAims);
    }

    #[test]
    fn empty_document_yields_nothing() {
        assert!(split_document("   \n").is_empty());
    }
}
