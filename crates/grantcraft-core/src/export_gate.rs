use crate::budget::BudgetSummary;
use crate::compliance;
use crate::model::{Application, Severity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateSource {
    Application,
    Compliance,
    Budget,
    References,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateItem {
    pub source: GateSource,
    pub code: String,
    pub message: String,
}

impl GateItem {
    fn new(source: GateSource, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source,
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDecision {
    pub allowed: bool,
    pub blockers: Vec<GateItem>,
    pub warnings: Vec<GateItem>,
}

/// Decide whether an application may be exported or marked complete.
///
/// Missing required sections arrive through the compliance report as
/// `MISSING_SECTION` errors. Info-level findings never block or warn.
pub fn evaluate(app: &Application, budget: Option<&BudgetSummary>) -> ExportDecision {
    let mut blockers = Vec::new();
    let mut warnings = Vec::new();

    if app.title.trim().is_empty() {
        blockers.push(GateItem::new(
            GateSource::Application,
            "EMPTY_TITLE",
            "application title is empty",
        ));
    }

    let report = compliance::check_application(app);
    for issue in report.issues {
        let message = match issue.section_type {
            Some(t) => format!("{}: {}", t.title(), issue.message),
            None => issue.message,
        };
        let item = GateItem::new(GateSource::Compliance, issue.rule, message);
        match issue.severity {
            Severity::Error => blockers.push(item),
            Severity::Warning => warnings.push(item),
            Severity::Info => {}
        }
    }

    if let Some(summary) = budget {
        for issue in &summary.issues {
            let message = match issue.year {
                Some(year) => format!("year {}: {}", year, issue.message),
                None => issue.message.clone(),
            };
            let item = GateItem::new(GateSource::Budget, issue.code.clone(), message);
            match issue.severity {
                Severity::Error => blockers.push(item),
                Severity::Warning => warnings.push(item),
                Severity::Info => {}
            }
        }
    }

    for reference in app.references.iter().filter(|r| r.is_unverified()) {
        warnings.push(GateItem::new(
            GateSource::References,
            "UNVERIFIED_REFERENCE",
            format!("could not verify citation: {}", reference.citation),
        ));
    }

    ExportDecision {
        allowed: blockers.is_empty(),
        blockers,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{self, BudgetState, Personnel};
    use crate::model::{Reference, VerificationResult};
    use crate::rules::MechanismId;
    use crate::section::{Section, SectionType};
    use chrono::Utc;
    use uuid::Uuid;

    fn complete_r21() -> Application {
        let mut app = Application::new(Uuid::nil(), "Cardiac aging", MechanismId::R21);
        let required = crate::rules::rules_for(MechanismId::R21).required_sections.clone();
        for section_type in required {
            let content = match section_type {
                SectionType::SpecificAims => {
                    "We hypothesize that X drives Y. Aim 1: test X. Aim 2: test Y.".to_string()
                }
                SectionType::ResearchStrategy => {
                    "Significance\nImportant.\nInnovation\nNovel.\nApproach\nRigorous.".to_string()
                }
                SectionType::ProjectNarrative => "This work improves heart health.".to_string(),
                other => format!("{} content for the application", other.title()),
            };
            app.upsert_section(Section::new(section_type, content));
        }
        app
    }

    #[test]
    fn blocks_on_missing_sections_and_empty_title() {
        let app = Application::new(Uuid::nil(), "  ", MechanismId::R01);
        let decision = evaluate(&app, None);
        assert!(!decision.allowed);
        assert!(decision.blockers.iter().any(|b| b.code == "EMPTY_TITLE"));
        assert!(decision.blockers.iter().any(|b| b.code == "MISSING_SECTION"));
    }

    #[test]
    fn complete_application_is_allowed() {
        let decision = evaluate(&complete_r21(), None);
        assert!(decision.allowed, "{:?}", decision.blockers);
    }

    #[test]
    fn unverified_references_only_warn() {
        let mut app = complete_r21();
        let mut reference = Reference::new("Doe J. Unknown paper. 2019.");
        reference.verification = Some(VerificationResult {
            verified: false,
            matched_title: None,
            doi: None,
            score: 12.0,
            checked_at: Utc::now(),
        });
        app.references.push(reference);
        let decision = evaluate(&app, None);
        assert!(decision.allowed);
        assert!(decision.warnings.iter().any(|w| w.code == "UNVERIFIED_REFERENCE"));
    }

    #[test]
    fn budget_errors_block() {
        let mut state = BudgetState::new(MechanismId::R21);
        state.personnel.push(Personnel {
            name: "PI".to_string(),
            role: "PI".to_string(),
            base_salary: 200_000.0,
            effort_percent: 150.0,
            months: 12.0,
        });
        let summary = budget::calculate(&state).unwrap();
        let decision = evaluate(&complete_r21(), Some(&summary));
        assert!(!decision.allowed);
        assert!(decision
            .blockers
            .iter()
            .any(|b| b.source == GateSource::Budget && b.code == "INVALID_EFFORT"));
    }
}
