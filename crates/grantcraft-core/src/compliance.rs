//! Regex and keyword compliance checks against NIH formatting rules.

use crate::model::{Application, Severity};
use crate::rules::{rules_for, MechanismId, SectionLimit};
use crate::section::{Section, SectionType};
use crate::text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(https?://|www\.)\S+").expect("valid url regex"));

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\bTBD\b|\bTODO\b|\bXXX+\b|\[insert|lorem ipsum)").expect("valid regex")
});

const HUMAN_SUBJECT_TERMS: &[&str] = &[
    "patients",
    "participants",
    "subjects",
    "clinical trial",
    "volunteers",
    "informed consent",
];

const VERTEBRATE_TERMS: &[&str] = &[
    "mice",
    "mouse model",
    "rats",
    "animal model",
    "primates",
    "zebrafish",
    "rodent",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceIssue {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_type: Option<SectionType>,
}

impl ComplianceIssue {
    fn new(
        rule: &str,
        severity: Severity,
        message: impl Into<String>,
        section_type: Option<SectionType>,
    ) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            message: message.into(),
            section_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub issues: Vec<ComplianceIssue>,
    pub errors: usize,
    pub warnings: usize,
    pub passed: bool,
}

impl ComplianceReport {
    pub fn from_issues(issues: Vec<ComplianceIssue>) -> Self {
        let errors = issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        let warnings = issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count();
        Self {
            passed: errors == 0,
            issues,
            errors,
            warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item: String,
    pub satisfied: bool,
    pub note: String,
}

/// Sections where NIH allows hyperlinks.
fn urls_allowed(section_type: SectionType) -> bool {
    matches!(
        section_type,
        SectionType::Bibliography | SectionType::LettersOfSupport | SectionType::DataManagementSharing
    )
}

/// Page-limit result for a section: `(measured, limit)` when over.
pub fn over_limit(mechanism: MechanismId, section: &Section) -> Option<(f64, SectionLimit)> {
    let limit = rules_for(mechanism).section_limit(section.section_type)?;
    let plain = section.plain_text();
    let measured = match limit {
        SectionLimit::Pages(pages) => {
            let estimate = text::estimate_pages(&plain);
            (estimate > pages).then_some(estimate)
        }
        SectionLimit::Lines(lines) => {
            let estimate = text::estimate_lines(&plain) as f64;
            (estimate > f64::from(lines)).then_some(estimate)
        }
        SectionLimit::Sentences(sentences) => {
            let count = text::sentence_count(&plain) as f64;
            (count > f64::from(sentences)).then_some(count)
        }
    };
    measured.map(|m| (m, limit))
}

/// Section-local checks: limits, headings, URLs, placeholders, emptiness.
pub fn check_section(mechanism: MechanismId, section: &Section) -> Vec<ComplianceIssue> {
    let mut issues = Vec::new();
    let section_type = section.section_type;
    let title = section_type.title();
    let plain = section.plain_text();

    if text::word_count(&plain) == 0 {
        issues.push(ComplianceIssue::new(
            "EMPTY_SECTION",
            Severity::Error,
            format!("{} has no content", title),
            Some(section_type),
        ));
        return issues;
    }

    if let Some((measured, limit)) = over_limit(mechanism, section) {
        issues.push(ComplianceIssue::new(
            "PAGE_LIMIT",
            Severity::Error,
            format!(
                "{} is estimated at {} against a limit of {}",
                title,
                format_measure(measured, limit),
                limit
            ),
            Some(section_type),
        ));
    }

    let required = section_type.required_headings();
    if !required.is_empty() {
        let found = text::find_headings(&plain, required);
        for heading in required.iter().filter(|h| !found.contains(*h)) {
            // "Aim 1" is usually inline rather than on its own line.
            if section_type == SectionType::SpecificAims && text::contains_any(&plain, &[*heading]) {
                continue;
            }
            issues.push(ComplianceIssue::new(
                "MISSING_HEADING",
                Severity::Warning,
                format!("{} is missing the '{}' heading", title, heading),
                Some(section_type),
            ));
        }
    }

    let page_limited = rules_for(mechanism)
        .section_limit(section_type)
        .is_some()
        || section_type.is_strategy_part();
    if page_limited && !urls_allowed(section_type) {
        if let Some(m) = URL_PATTERN.find(&plain) {
            issues.push(ComplianceIssue::new(
                "URL_NOT_ALLOWED",
                Severity::Error,
                format!(
                    "{} contains a hyperlink ({}); URLs are not allowed in page-limited attachments",
                    title,
                    m.as_str()
                ),
                Some(section_type),
            ));
        }
    }

    if let Some(m) = PLACEHOLDER_PATTERN.find(&plain) {
        issues.push(ComplianceIssue::new(
            "PLACEHOLDER_TEXT",
            Severity::Warning,
            format!("{} still contains placeholder text '{}'", title, m.as_str()),
            Some(section_type),
        ));
    }

    issues
}

/// Page check for a Research Strategy written as Significance, Innovation
/// and Approach parts. The parts carry no limit of their own, so their pages
/// are added together with any Research Strategy text and measured against
/// the Research Strategy limit.
pub fn split_strategy_issue(mechanism: MechanismId, sections: &[Section]) -> Option<ComplianceIssue> {
    if !sections.iter().any(|s| s.section_type.is_strategy_part()) {
        return None;
    }
    let SectionLimit::Pages(limit) =
        rules_for(mechanism).section_limit(SectionType::ResearchStrategy)?
    else {
        return None;
    };

    let strategy: Vec<&Section> = sections
        .iter()
        .filter(|s| s.section_type == SectionType::ResearchStrategy || s.section_type.is_strategy_part())
        .collect();
    // An oversized Research Strategy on its own is already reported by `check_section`.
    if strategy
        .iter()
        .any(|s| s.section_type == SectionType::ResearchStrategy && s.page_count > limit)
    {
        return None;
    }

    let pages: f64 = strategy.iter().map(|s| s.page_count).sum();
    (pages > limit).then(|| {
        ComplianceIssue::new(
            "PAGE_LIMIT",
            Severity::Error,
            format!(
                "Research Strategy (Significance, Innovation and Approach) is estimated at {} against a limit of {}",
                format_measure(pages, SectionLimit::Pages(limit)),
                SectionLimit::Pages(limit)
            ),
            Some(SectionType::ResearchStrategy),
        )
    })
}

fn format_measure(measured: f64, limit: SectionLimit) -> String {
    match limit {
        SectionLimit::Pages(_) => format!("{:.1} page(s)", measured),
        SectionLimit::Lines(_) => format!("{:.0} line(s)", measured),
        SectionLimit::Sentences(_) => format!("{:.0} sentence(s)", measured),
    }
}

fn research_text(app: &Application) -> String {
    app.sections
        .iter()
        .filter(|s| {
            s.section_type == SectionType::ResearchStrategy
                || s.section_type.is_strategy_part()
                || s.section_type == SectionType::SpecificAims
        })
        .map(|s| s.plain_text())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn needs_human_subjects(app: &Application) -> bool {
    text::contains_any(&research_text(app), HUMAN_SUBJECT_TERMS)
}

pub fn needs_vertebrate_animals(app: &Application) -> bool {
    text::contains_any(&research_text(app), VERTEBRATE_TERMS)
}

/// Whole-application check: every section plus required sections and the
/// human-subjects / vertebrate-animals cross checks.
pub fn check_application(app: &Application) -> ComplianceReport {
    let rules = rules_for(app.mechanism);
    let mut issues: Vec<ComplianceIssue> = rules
        .required_sections
        .iter()
        .filter(|t| !app.has_section(**t))
        // A split strategy (Significance/Innovation/Approach) satisfies Research Strategy.
        .filter(|t| {
            **t != SectionType::ResearchStrategy
                || !app.sections.iter().any(|s| s.section_type.is_strategy_part())
        })
        .map(|t| {
            ComplianceIssue::new(
                "MISSING_SECTION",
                Severity::Error,
                format!("{} is required for {}", t.title(), app.mechanism),
                Some(*t),
            )
        })
        .collect();

    for section in &app.sections {
        issues.extend(check_section(app.mechanism, section));
    }
    issues.extend(split_strategy_issue(app.mechanism, &app.sections));

    if needs_human_subjects(app) && !app.has_section(SectionType::HumanSubjects) {
        issues.push(ComplianceIssue::new(
            "HUMAN_SUBJECTS_KEYWORDS",
            Severity::Warning,
            "research text mentions human participants but there is no Protection of Human Subjects section",
            Some(SectionType::HumanSubjects),
        ));
    }

    if needs_vertebrate_animals(app) && !app.has_section(SectionType::VertebrateAnimals) {
        issues.push(ComplianceIssue::new(
            "VERTEBRATE_ANIMALS_KEYWORDS",
            Severity::Warning,
            "research text mentions vertebrate animals but there is no Vertebrate Animals section",
            Some(SectionType::VertebrateAnimals),
        ));
    }

    ComplianceReport::from_issues(issues)
}

/// The regulatory checklist shown next to the grant builder.
pub fn regulatory_checklist(app: &Application) -> Vec<ChecklistItem> {
    let mut items = Vec::new();

    let human = needs_human_subjects(app);
    items.push(ChecklistItem {
        item: "Protection of Human Subjects".to_string(),
        satisfied: !human || app.has_section(SectionType::HumanSubjects),
        note: if human {
            "human participants are described in the research plan".to_string()
        } else {
            "no human participants detected".to_string()
        },
    });

    let animals = needs_vertebrate_animals(app);
    items.push(ChecklistItem {
        item: "Vertebrate Animals".to_string(),
        satisfied: !animals || app.has_section(SectionType::VertebrateAnimals),
        note: if animals {
            "vertebrate animals are described in the research plan".to_string()
        } else {
            "no vertebrate animals detected".to_string()
        },
    });

    items.push(ChecklistItem {
        item: "Data Management and Sharing Plan".to_string(),
        satisfied: app.has_section(SectionType::DataManagementSharing),
        note: "required for all research generating scientific data".to_string(),
    });

    let has_subawards = app.budget.as_ref().is_some_and(|b| {
        b.direct_costs
            .iter()
            .any(|d| d.category == crate::budget::CostCategory::Subaward)
    });
    let letters_needed = app.mechanism.is_phase_two() || has_subawards;
    items.push(ChecklistItem {
        item: "Letters of Support".to_string(),
        satisfied: !letters_needed || app.has_section(SectionType::LettersOfSupport),
        note: if letters_needed {
            "required for Phase II applications and subaward collaborators".to_string()
        } else {
            "recommended".to_string()
        },
    });

    items.push(ChecklistItem {
        item: "Bibliography".to_string(),
        satisfied: app.has_section(SectionType::Bibliography) || !app.references.is_empty(),
        note: "references cited in the research plan".to_string(),
    });

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn rules(issues: &[ComplianceIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.rule.as_str()).collect()
    }

    #[test]
    fn flags_page_limit_overrun() {
        let content = "word ".repeat(600);
        let section = Section::new(SectionType::SpecificAims, format!("Aim 1 {}", content));
        let issues = check_section(MechanismId::R01, &section);
        assert!(rules(&issues).contains(&"PAGE_LIMIT"));
    }

    #[test]
    fn within_limit_passes() {
        let section = Section::new(
            SectionType::SpecificAims,
            "Heart failure remains lethal. Aim 1: test the hypothesis.",
        );
        assert!(check_section(MechanismId::R01, &section).is_empty());
    }

    #[test]
    fn narrative_sentence_limit() {
        let section = Section::new(
            SectionType::ProjectNarrative,
            "One. Two. Three. Four.",
        );
        let issues = check_section(MechanismId::R21, &section);
        assert_eq!(rules(&issues), vec!["PAGE_LIMIT"]);
        assert!(issues[0].message.contains("4 sentence(s)"));
    }

    #[test]
    fn urls_rejected_outside_bibliography() {
        let strategy = Section::new(
            SectionType::ResearchStrategy,
            "Significance\nSee https://example.org/data\nInnovation\nNew\nApproach\nPlan",
        );
        assert!(rules(&check_section(MechanismId::R01, &strategy)).contains(&"URL_NOT_ALLOWED"));

        let bibliography = Section::new(
            SectionType::Bibliography,
            "1. Doe J. https://doi.org/10.1000/xyz",
        );
        assert!(check_section(MechanismId::R01, &bibliography).is_empty());
    }

    #[test]
    fn missing_headings_and_placeholders() {
        let strategy = Section::new(
            SectionType::ResearchStrategy,
            "Significance\nImportant. TBD\nApproach\nSteps",
        );
        let issues = check_section(MechanismId::R01, &strategy);
        let found = rules(&issues);
        assert!(found.contains(&"MISSING_HEADING"));
        assert!(found.contains(&"PLACEHOLDER_TEXT"));
        assert!(issues.iter().any(|i| i.message.contains("Innovation")));
    }

    #[test]
    fn empty_section_is_an_error() {
        let section = Section::new(SectionType::Approach, "<p></p>");
        let issues = check_section(MechanismId::R01, &section);
        assert_eq!(rules(&issues), vec!["EMPTY_SECTION"]);
    }

    #[test]
    fn application_report_lists_missing_sections_and_cross_checks() {
        let mut app = Application::new(Uuid::nil(), "Trial", MechanismId::R01);
        app.upsert_section(Section::new(
            SectionType::SpecificAims,
            "Aim 1: enroll 200 patients in a clinical trial.",
        ));
        let report = check_application(&app);
        assert!(!report.passed);
        let found = rules(&report.issues);
        assert!(found.contains(&"MISSING_SECTION"));
        assert!(found.contains(&"HUMAN_SUBJECTS_KEYWORDS"));
        assert!(!found.contains(&"VERTEBRATE_ANIMALS_KEYWORDS"));
        assert_eq!(report.errors + report.warnings, report.issues.len());
    }

    fn strategy_part(section_type: SectionType, words: usize) -> Section {
        Section::new(section_type, "data ".repeat(words))
    }

    #[test]
    fn split_strategy_is_held_to_the_research_strategy_limit() {
        let mut app = Application::new(Uuid::nil(), "Split", MechanismId::R21);
        for part in [SectionType::Significance, SectionType::Innovation, SectionType::Approach] {
            app.upsert_section(strategy_part(part, 1200));
        }
        // 3 x 2.4 pages against the R21 limit of 6.
        let report = check_application(&app);
        let page = report
            .issues
            .iter()
            .find(|i| i.rule == "PAGE_LIMIT")
            .expect("combined strategy is over the limit");
        assert_eq!(page.section_type, Some(SectionType::ResearchStrategy));
        assert_eq!(page.severity, Severity::Error);
        assert!(page.message.contains("7.2 page(s)"));
        assert!(!report.passed);
    }

    #[test]
    fn split_strategy_within_limit_has_no_page_issue() {
        let sections = vec![
            strategy_part(SectionType::Significance, 500),
            strategy_part(SectionType::Approach, 1500),
        ];
        assert!(split_strategy_issue(MechanismId::R21, &sections).is_none());
        // R01 allows 12 pages.
        let long = vec![
            strategy_part(SectionType::Significance, 2000),
            strategy_part(SectionType::Approach, 2000),
        ];
        assert!(split_strategy_issue(MechanismId::R01, &long).is_none());
        assert!(split_strategy_issue(MechanismId::R21, &long).is_some());
    }

    #[test]
    fn study_subjects_need_a_human_subjects_section() {
        let mut app = Application::new(Uuid::nil(), "Cohort", MechanismId::R01);
        app.upsert_section(Section::new(
            SectionType::Approach,
            "Study subjects will complete a survey at baseline.",
        ));
        assert!(needs_human_subjects(&app));
        assert!(rules(&check_application(&app).issues).contains(&"HUMAN_SUBJECTS_KEYWORDS"));
    }

    #[test]
    fn checklist_tracks_letters_for_phase_two() {
        let app = Application::new(Uuid::nil(), "Device", MechanismId::SbirPhase2);
        let checklist = regulatory_checklist(&app);
        let letters = checklist
            .iter()
            .find(|c| c.item == "Letters of Support")
            .unwrap();
        assert!(!letters.satisfied);
        let human = checklist
            .iter()
            .find(|c| c.item == "Protection of Human Subjects")
            .unwrap();
        assert!(human.satisfied);
    }
}
