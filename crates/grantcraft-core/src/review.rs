//! Whole-document review: split an uploaded application into sections, then
//! score and compliance-check each one.

use crate::compliance::{self, ComplianceIssue};
use crate::model::Severity;
use crate::rules::{rules_for, MechanismId, SectionLimit};
use crate::scoring::{self, SectionScore, StructuralScore};
use crate::section::{self, Section, SectionType};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionReview {
    pub section_type: SectionType,
    pub heading: String,
    pub word_count: usize,
    pub page_count: f64,
    pub page_limit: Option<SectionLimit>,
    pub score: SectionScore,
    pub issues: Vec<ComplianceIssue>,
}

impl SectionReview {
    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReview {
    pub mechanism: MechanismId,
    pub sections: Vec<SectionReview>,
    pub structural: StructuralScore,
    /// Required sections not found anywhere in the document.
    pub missing_sections: Vec<SectionType>,
    /// Checks that span several sections, such as a split Research Strategy
    /// measured against its page limit.
    #[serde(default)]
    pub issues: Vec<ComplianceIssue>,
}

pub fn review_section(mechanism: MechanismId, heading: impl Into<String>, section: &Section) -> SectionReview {
    SectionReview {
        section_type: section.section_type,
        heading: heading.into(),
        word_count: section.word_count,
        page_count: section.page_count,
        page_limit: rules_for(mechanism).section_limit(section.section_type),
        score: scoring::score_section(mechanism, section),
        issues: compliance::check_section(mechanism, section),
    }
}

pub fn review_document(mechanism: MechanismId, text: &str) -> DocumentReview {
    let extracted = section::split_document(text);
    debug!(sections = extracted.len(), %mechanism, "split document for review");

    let mut sections = Vec::with_capacity(extracted.len());
    let mut reviews = Vec::with_capacity(extracted.len());
    // A bare "Research Strategy" heading followed by its sub-headings comes
    // back empty; its content lives in the parts.
    for part in extracted.into_iter().filter(|p| !p.content.is_empty()) {
        let heading = part.heading.clone();
        let section = part.into_section();
        reviews.push(review_section(mechanism, heading, &section));
        sections.push(section);
    }

    let has_split_strategy = sections.iter().any(|s| s.section_type.is_strategy_part());
    let missing_sections = rules_for(mechanism)
        .required_sections
        .iter()
        .copied()
        .filter(|t| !sections.iter().any(|s| s.section_type == *t))
        .filter(|t| *t != SectionType::ResearchStrategy || !has_split_strategy)
        .collect();

    let issues: Vec<ComplianceIssue> = compliance::split_strategy_issue(mechanism, &sections)
        .into_iter()
        .collect();

    DocumentReview {
        mechanism,
        structural: scoring::score_application(mechanism, &sections),
        sections: reviews,
        missing_sections,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "Specific Aims\n\
        We hypothesize that stress drives aging. Aim 1: measure. Aim 2: perturb.\n\
        Research Strategy\n\
        Significance\nHeart disease matters.\n\
        Innovation\nA novel sensor.\n\
        Approach\nWe will use rigorous statistical methods. TBD.\n";

    #[test]
    fn reviews_each_section() {
        let review = review_document(MechanismId::R21, DOCUMENT);
        assert!(!review.sections.is_empty());
        let aims = review
            .sections
            .iter()
            .find(|s| s.section_type == SectionType::SpecificAims)
            .expect("specific aims found");
        assert_eq!(aims.page_limit, Some(SectionLimit::Pages(1.0)));
        assert_eq!(aims.errors(), 0);
        assert!(review.structural.overall > 0.0);
        assert!(review.missing_sections.contains(&SectionType::Bibliography));
        assert!(!review.missing_sections.contains(&SectionType::ResearchStrategy));
    }

    #[test]
    fn split_strategy_over_the_limit_is_a_document_issue() {
        let body = "data ".repeat(1200);
        let document = format!(
            "Specific Aims\nAim 1: measure.\nResearch Strategy\nSignificance\n{body}\nInnovation\n{body}\nApproach\n{body}\n"
        );
        let review = review_document(MechanismId::R21, &document);

        let parts: Vec<&SectionReview> = review
            .sections
            .iter()
            .filter(|s| s.section_type.is_strategy_part())
            .collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.errors() == 0));

        let page = review
            .issues
            .iter()
            .find(|i| i.rule == "PAGE_LIMIT")
            .expect("combined strategy is over 6 pages");
        assert_eq!(page.section_type, Some(SectionType::ResearchStrategy));
        assert_eq!(page.severity, Severity::Error);

        assert!(review_document(MechanismId::R01, &document).issues.is_empty());
        assert!(review_document(MechanismId::R21, DOCUMENT).issues.is_empty());
    }

    #[test]
    fn placeholder_counts_as_warning() {
        let review = review_document(MechanismId::R21, DOCUMENT);
        let warnings: usize = review.sections.iter().map(|s| s.warnings()).sum();
        assert!(warnings >= 1);
    }

    #[test]
    fn empty_document_has_no_sections() {
        let review = review_document(MechanismId::R01, "   ");
        assert!(review.sections.is_empty());
        assert_eq!(review.structural.overall, 0.0);
    }
}
