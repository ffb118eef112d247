//! Reviewer-risk flags for the grant architecture (hypothesis + aims).

use crate::dependency::{self, DependencyGraph};
use crate::model::{Aim, ArchitectureData};
use crate::text;
use serde::{Deserialize, Serialize};

const INNOVATION_TERMS: &[&str] = &["novel", "first", "innovative", "new", "paradigm", "unique"];
const DESCRIPTIVE_OPENERS: &[&str] = &[
    "characterize",
    "describe",
    "explore",
    "investigate",
    "determine whether",
];
const HYPOTHESIS_TERMS: &[&str] = &["hypothes", "test whether", "predict"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

impl RiskSeverity {
    pub fn weight(&self) -> u32 {
        match self {
            RiskSeverity::Low => 5,
            RiskSeverity::Medium => 10,
            RiskSeverity::High => 25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=24 => RiskLevel::Low,
            25..=49 => RiskLevel::Moderate,
            _ => RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFlag {
    pub code: String,
    pub severity: RiskSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aim: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub flags: Vec<RiskFlag>,
    pub score: u32,
    pub level: RiskLevel,
    pub dependencies: DependencyGraph,
}

struct Flags(Vec<RiskFlag>);

impl Flags {
    fn push(&mut self, code: &str, severity: RiskSeverity, message: impl Into<String>, aim: Option<usize>) {
        self.0.push(RiskFlag {
            code: code.to_string(),
            severity,
            message: message.into(),
            aim,
        });
    }
}

pub fn assess(data: &ArchitectureData) -> RiskReport {
    let mut flags = Flags(Vec::new());

    if data.central_hypothesis.trim().is_empty() {
        flags.push(
            "NO_CENTRAL_HYPOTHESIS",
            RiskSeverity::High,
            "no central hypothesis; reviewers expect one that unifies the aims",
            None,
        );
    }

    match data.aims.len() {
        0 => flags.push("NO_AIMS", RiskSeverity::High, "no aims defined", None),
        1 => flags.push(
            "SINGLE_AIM",
            RiskSeverity::Low,
            "a single aim concentrates all risk in one experiment",
            None,
        ),
        n if n > 4 => flags.push(
            "TOO_MANY_AIMS",
            RiskSeverity::Medium,
            format!("{} aims is likely overambitious for the project period", n),
            None,
        ),
        _ => {}
    }

    for (index, aim) in data.aims.iter().enumerate() {
        assess_aim(index + 1, aim, &mut flags);
    }

    let dependencies = dependency::build(&data.aims);
    assess_dependencies(&dependencies, &mut flags);

    let innovation = data.innovation.trim();
    if innovation.is_empty() || !text::contains_any(innovation, INNOVATION_TERMS) {
        flags.push(
            "WEAK_INNOVATION",
            RiskSeverity::Low,
            "innovation statement does not say what is new",
            None,
        );
    }

    let score = flags
        .0
        .iter()
        .map(|f| f.severity.weight())
        .sum::<u32>()
        .min(100);

    RiskReport {
        level: RiskLevel::from_score(score),
        flags: flags.0,
        score,
        dependencies,
    }
}

fn assess_aim(number: usize, aim: &Aim, flags: &mut Flags) {
    let has_hypothesis = !aim.hypothesis.trim().is_empty();
    if !has_hypothesis {
        flags.push(
            "MISSING_HYPOTHESIS",
            RiskSeverity::Medium,
            format!("Aim {} has no hypothesis", number),
            Some(number),
        );
    }
    if !aim.falsifiable {
        flags.push(
            "NON_FALSIFIABLE",
            RiskSeverity::Medium,
            format!("Aim {} is not framed as falsifiable", number),
            Some(number),
        );
    }
    if aim.endpoints.iter().all(|e| e.trim().is_empty()) {
        flags.push(
            "MISSING_ENDPOINTS",
            RiskSeverity::Medium,
            format!("Aim {} has no measurable endpoints", number),
            Some(number),
        );
    }
    if aim.rationale.trim().is_empty() {
        flags.push(
            "MISSING_RATIONALE",
            RiskSeverity::Low,
            format!("Aim {} has no rationale", number),
            Some(number),
        );
    }

    let title = aim.title.trim().to_lowercase();
    let descriptive = DESCRIPTIVE_OPENERS.iter().any(|o| title.starts_with(o));
    if descriptive && !has_hypothesis && !text::contains_any(&aim.title, HYPOTHESIS_TERMS) {
        flags.push(
            "DESCRIPTIVE_AIM",
            RiskSeverity::Low,
            format!("Aim {} reads as descriptive rather than hypothesis-driven", number),
            Some(number),
        );
    }
}

fn assess_dependencies(graph: &DependencyGraph, flags: &mut Flags) {
    if graph.has_cycle {
        flags.push(
            "CIRCULAR_DEPENDENCY",
            RiskSeverity::High,
            "aims depend on each other in a cycle",
            None,
        );
    }

    let chain = &graph.longest_chain;
    if chain.len() >= 2 {
        let covers_all = chain.len() == graph.aim_count;
        let severity = if chain.len() >= 3 || covers_all {
            RiskSeverity::High
        } else {
            RiskSeverity::Medium
        };
        let path = chain
            .iter()
            .map(|n| format!("Aim {}", n))
            .collect::<Vec<_>>()
            .join(" -> ");
        flags.push(
            "CASCADING_DEPENDENCY",
            severity,
            format!(
                "failure of Aim {} would compromise the chain {}",
                chain[0], path
            ),
            Some(chain[0]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_aim(title: &str, rationale: &str) -> Aim {
        Aim {
            title: title.to_string(),
            hypothesis: "X drives Y".to_string(),
            falsifiable: true,
            endpoints: vec![format!("{} endpoint", title)],
            rationale: rationale.to_string(),
        }
    }

    fn codes(report: &RiskReport) -> Vec<&str> {
        report.flags.iter().map(|f| f.code.as_str()).collect()
    }

    #[test]
    fn well_formed_architecture_is_low_risk() {
        let data = ArchitectureData {
            central_hypothesis: "Mitochondrial stress drives cardiac aging".to_string(),
            innovation: "First use of a novel in vivo sensor".to_string(),
            aims: vec![
                solid_aim("Define the mechanism", "Preliminary data"),
                solid_aim("Test the intervention", "Pilot data"),
            ],
        };
        let report = assess(&data);
        assert!(report.flags.is_empty(), "{:?}", codes(&report));
        assert_eq!(report.score, 0);
        assert_eq!(report.level, RiskLevel::Low);
    }

    #[test]
    fn empty_architecture_is_high_risk() {
        let report = assess(&ArchitectureData::default());
        assert_eq!(codes(&report), vec!["NO_CENTRAL_HYPOTHESIS", "NO_AIMS", "WEAK_INNOVATION"]);
        assert_eq!(report.score, 55);
        assert_eq!(report.level, RiskLevel::High);
    }

    #[test]
    fn flags_incomplete_aims() {
        let data = ArchitectureData {
            central_hypothesis: "H".to_string(),
            innovation: "novel".to_string(),
            aims: vec![
                Aim {
                    title: "Characterize expression patterns".to_string(),
                    ..Default::default()
                },
                solid_aim("Second", "r"),
            ],
        };
        let report = assess(&data);
        let found = codes(&report);
        for code in [
            "MISSING_HYPOTHESIS",
            "NON_FALSIFIABLE",
            "MISSING_ENDPOINTS",
            "MISSING_RATIONALE",
            "DESCRIPTIVE_AIM",
        ] {
            assert!(found.contains(&code), "missing {}", code);
        }
        assert!(report.flags.iter().all(|f| f.aim != Some(2)));
    }

    #[test]
    fn cascading_dependency_severity() {
        let data = ArchitectureData {
            central_hypothesis: "H".to_string(),
            innovation: "novel".to_string(),
            aims: vec![
                solid_aim("Build", "r"),
                solid_aim("Extend", "using results of Aim 1"),
                solid_aim("Apply", "requires Aim 2 outputs"),
            ],
        };
        let report = assess(&data);
        let flag = report
            .flags
            .iter()
            .find(|f| f.code == "CASCADING_DEPENDENCY")
            .expect("cascading flag");
        assert_eq!(flag.severity, RiskSeverity::High);
        assert_eq!(flag.aim, Some(1));
        assert_eq!(report.dependencies.longest_chain, vec![1, 2, 3]);
    }

    #[test]
    fn score_is_capped() {
        let data = ArchitectureData {
            aims: (0..6).map(|_| Aim::default()).collect(),
            ..Default::default()
        };
        let report = assess(&data);
        assert_eq!(report.score, 100);
        assert!(codes(&report).contains(&"TOO_MANY_AIMS"));
    }
}
