//! Structural scoring: additive keyword formulas per section type, combined
//! into a weighted average and mapped onto the NIH 1-9 impact scale.

use crate::compliance::over_limit;
use crate::rules::MechanismId;
use crate::section::{Section, SectionType};
use crate::text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const BASE_SCORE: f64 = 50.0;
const OVER_LIMIT_PENALTY: f64 = 20.0;

const HYPOTHESIS_TERMS: &[&str] = &["hypothesis", "we hypothesize", "hypothesize that"];
const GOAL_TERMS: &[&str] = &["long-term goal", "objective", "overall goal"];
const OUTCOME_TERMS: &[&str] = &[
    "expected outcome",
    "impact",
    "will enable",
    "positive impact",
];
const GAP_TERMS: &[&str] = &["gap", "unknown", "critical need"];
const RIGOR_TERMS: &[(&str, &str)] = &[
    ("rigor", "scientific rigor"),
    ("reproducib", "reproducibility"),
    ("power analysis", "power analysis"),
    ("sex as a biological variable", "sex as a biological variable"),
    ("statistical", "statistical analysis"),
];
const PITFALL_TERMS: &[&str] = &["pitfalls", "alternative"];
const TIMELINE_TERMS: &[&str] = &["timeline", "milestone"];
const SIGNIFICANCE_TERMS: &[&str] = &[
    "burden",
    "prevalence",
    "gap",
    "mortality",
    "public health",
    "scientific premise",
    "critical barrier",
];
const INNOVATION_TERMS: &[&str] = &[
    "novel",
    "first",
    "innovative",
    "paradigm",
    "new approach",
    "unique",
];
const APPROACH_TERMS: &[&str] = &[
    "design",
    "sample size",
    "statistical",
    "pitfalls",
    "alternative",
    "timeline",
    "rigor",
];
const PUBLIC_HEALTH_TERMS: &[&str] = &[
    "public health",
    "patients",
    "disease",
    "health",
    "improve",
    "treatment",
];
const MARKET_TERMS: &[&str] = &["market size", "addressable market", "market share"];
const REVENUE_TERMS: &[&str] = &["revenue"];

static AIM_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\baim\s*#?\s*(\d+)").expect("valid aim regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionScore {
    pub section_type: SectionType,
    pub score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralScore {
    pub overall: f64,
    pub impact_estimate: u8,
    pub grade: String,
    pub sections: Vec<SectionScore>,
}

/// Tallies one section's formula.
struct Tally {
    score: f64,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
}

impl Tally {
    fn new() -> Self {
        Self {
            score: BASE_SCORE,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
        }
    }

    fn reward(&mut self, points: f64, note: impl Into<String>) {
        self.score += points;
        self.strengths.push(note.into());
    }

    fn penalize(&mut self, points: f64, note: impl Into<String>) {
        self.score -= points;
        self.weaknesses.push(note.into());
    }

    fn check(&mut self, present: bool, points: f64, good: &str, missing: &str) {
        if present {
            self.reward(points, good);
        } else {
            self.weaknesses.push(missing.to_string());
        }
    }

    fn finish(self, section_type: SectionType) -> SectionScore {
        SectionScore {
            section_type,
            score: self.score.clamp(0.0, 100.0),
            strengths: self.strengths,
            weaknesses: self.weaknesses,
        }
    }
}

/// Distinct aim numbers mentioned in `text`.
pub fn count_aims(text: &str) -> usize {
    AIM_NUMBER
        .captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .collect::<BTreeSet<_>>()
        .len()
}

pub fn score_section(mechanism: MechanismId, section: &Section) -> SectionScore {
    let plain = section.plain_text();
    let mut tally = Tally::new();

    match section.section_type {
        SectionType::SpecificAims => score_aims(&plain, &mut tally),
        SectionType::ResearchStrategy => score_strategy(&plain, &mut tally),
        SectionType::Significance => score_keywords(&plain, SIGNIFICANCE_TERMS, &mut tally),
        SectionType::Innovation => score_keywords(&plain, INNOVATION_TERMS, &mut tally),
        SectionType::Approach => score_keywords(&plain, APPROACH_TERMS, &mut tally),
        SectionType::ProjectSummary | SectionType::ProjectNarrative => {
            if over_limit(mechanism, section).is_none() {
                tally.reward(20.0, "within the length limit");
            }
            tally.check(
                text::contains_any(&plain, PUBLIC_HEALTH_TERMS),
                10.0,
                "states public health relevance",
                "public health relevance is not explicit",
            );
        }
        SectionType::CommercializationPlan => score_commercialization(&plain, &mut tally),
        _ => {
            if text::word_count(&plain) >= 100 {
                tally.reward(10.0, "substantive content");
            } else {
                tally.weaknesses.push("very short".to_string());
            }
        }
    }

    if let Some((measured, limit)) = over_limit(mechanism, section) {
        tally.penalize(
            OVER_LIMIT_PENALTY,
            format!("exceeds the {} limit ({:.1})", limit, measured),
        );
    }

    tally.finish(section.section_type)
}

fn score_aims(plain: &str, tally: &mut Tally) {
    tally.check(
        text::contains_any(plain, HYPOTHESIS_TERMS),
        15.0,
        "states a testable hypothesis",
        "no explicit hypothesis",
    );
    tally.check(
        text::contains_any(plain, GOAL_TERMS),
        10.0,
        "states the long-term goal or objective",
        "long-term goal or objective is not stated",
    );

    match count_aims(plain) {
        0 => tally.penalize(20.0, "no numbered aims found"),
        n @ 2..=4 => tally.reward(10.0, format!("{} aims", n)),
        1 => tally.penalize(10.0, "only one aim"),
        n => tally.penalize(10.0, format!("{} aims is likely overambitious", n)),
    }

    tally.check(
        text::contains_any(plain, OUTCOME_TERMS),
        10.0,
        "describes expected outcomes and impact",
        "expected outcomes are not described",
    );
    tally.check(
        text::contains_any(plain, GAP_TERMS),
        5.0,
        "identifies a gap in knowledge",
        "gap in knowledge is not identified",
    );
}

fn score_strategy(plain: &str, tally: &mut Tally) {
    let required = SectionType::ResearchStrategy.required_headings();
    let found = text::find_headings(plain, required);
    for heading in required {
        if found.contains(heading) {
            tally.reward(10.0, format!("has a {} subsection", heading));
        } else {
            tally.penalize(10.0, format!("missing the {} subsection", heading));
        }
    }

    for (needle, label) in RIGOR_TERMS {
        if text::contains_any(plain, &[*needle]) {
            tally.reward(5.0, format!("addresses {}", label));
        }
    }

    tally.check(
        text::contains_any(plain, PITFALL_TERMS),
        10.0,
        "discusses pitfalls and alternatives",
        "no pitfalls or alternative strategies",
    );
    tally.check(
        text::contains_any(plain, TIMELINE_TERMS),
        5.0,
        "includes a timeline or milestones",
        "no timeline or milestones",
    );
}

/// +8 per keyword present, counting at most four.
fn score_keywords(plain: &str, keywords: &[&str], tally: &mut Tally) {
    let hits = text::count_keywords(plain, keywords).min(4);
    if hits == 0 {
        tally.weaknesses.push("few of the expected review terms".to_string());
    } else {
        tally.reward(8.0 * hits as f64, format!("{} expected review term(s)", hits));
    }
}

fn score_commercialization(plain: &str, tally: &mut Tally) {
    let required = SectionType::CommercializationPlan.required_headings();
    let found = text::find_headings(plain, required);
    for heading in required {
        if found.contains(heading) {
            tally.reward(5.0, format!("covers {}", heading));
        } else {
            tally.weaknesses.push(format!("missing {}", heading));
        }
    }
    tally.check(
        text::contains_any(plain, MARKET_TERMS),
        10.0,
        "sizes the market",
        "market size is not quantified",
    );
    tally.check(
        text::contains_any(plain, REVENUE_TERMS),
        10.0,
        "projects revenue",
        "no revenue projection",
    );
}

pub fn section_weight(section_type: SectionType) -> f64 {
    match section_type {
        SectionType::ResearchStrategy => 0.35,
        SectionType::SpecificAims => 0.30,
        SectionType::CommercializationPlan => 0.20,
        SectionType::Approach => 0.15,
        SectionType::Significance | SectionType::Innovation => 0.10,
        SectionType::ProjectSummary | SectionType::ProjectNarrative => 0.05,
        _ => 0.02,
    }
}

/// 1 (exceptional) to 9 (poor).
pub fn impact_estimate(overall: f64) -> u8 {
    let raw = 1.0 + ((100.0 - overall) / 12.5).round();
    raw.clamp(1.0, 9.0) as u8
}

pub fn grade(impact: u8) -> &'static str {
    match impact {
        1..=2 => "Exceptional",
        3..=4 => "Strong",
        5..=6 => "Moderate",
        _ => "Weak",
    }
}

pub fn score_application(mechanism: MechanismId, sections: &[Section]) -> StructuralScore {
    let scores: Vec<SectionScore> = sections
        .iter()
        .map(|s| score_section(mechanism, s))
        .collect();

    let (weighted, weights) = scores.iter().fold((0.0, 0.0), |(sum, w), s| {
        let weight = section_weight(s.section_type);
        (sum + s.score * weight, w + weight)
    });
    let overall = if weights > 0.0 {
        (weighted / weights).clamp(0.0, 100.0)
    } else {
        0.0
    };
    let overall = (overall * 10.0).round() / 10.0;
    let impact = impact_estimate(overall);

    StructuralScore {
        overall,
        impact_estimate: impact,
        grade: grade(impact).to_string(),
        sections: scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRONG_AIMS: &str = "Heart failure is a critical need with a major gap in knowledge. \
        Our long-term goal is to prevent it. We hypothesize that mitochondrial stress drives decline. \
        Aim 1: Define the mechanism. Aim 2: Test the intervention. Aim 3: Validate in cohorts. \
        The expected outcome will have a positive impact.";

    #[test]
    fn strong_aims_score_high() {
        let section = Section::new(SectionType::SpecificAims, STRONG_AIMS);
        let score = score_section(MechanismId::R01, &section);
        // 50 + 15 + 10 + 10 + 10 + 5
        assert_eq!(score.score, 100.0);
        assert!(score.weaknesses.is_empty());
    }

    #[test]
    fn weak_aims_score_low() {
        let section = Section::new(SectionType::SpecificAims, "We will study cells.");
        let score = score_section(MechanismId::R01, &section);
        assert_eq!(score.score, 30.0);
        assert!(score.weaknesses.iter().any(|w| w.contains("hypothesis")));
    }

    #[test]
    fn over_limit_is_penalized_and_clamped() {
        let long = format!("{} {}", STRONG_AIMS, "filler ".repeat(700));
        let score = score_section(MechanismId::R01, &Section::new(SectionType::SpecificAims, long));
        assert_eq!(score.score, 80.0);
        assert!(score.weaknesses.iter().any(|w| w.contains("exceeds")));
    }

    #[test]
    fn counts_distinct_aims() {
        assert_eq!(count_aims("Aim 1 ... aim 2 ... Aim #2 ... AIM1"), 2);
        assert_eq!(count_aims("no aims"), 0);
    }

    #[test]
    fn strategy_rewards_headings_and_rigor() {
        let text = "Significance\nBurden is high.\nInnovation\nNovel.\nApproach\n\
            Rigor and reproducibility with a power analysis. Potential pitfalls and alternative \
            strategies are described. Timeline provided.";
        let score = score_section(MechanismId::R01, &Section::new(SectionType::ResearchStrategy, text));
        // 50 + 30 headings + 15 rigor terms + 10 pitfalls + 5 timeline
        assert_eq!(score.score, 100.0);
    }

    #[test]
    fn overall_is_weighted_average_within_bounds() {
        let sections = vec![
            Section::new(SectionType::SpecificAims, STRONG_AIMS),
            Section::new(SectionType::Bibliography, "1. Doe J."),
        ];
        let result = score_application(MechanismId::R01, &sections);
        let expected = (100.0 * 0.30 + 50.0 * 0.02) / 0.32;
        assert!((result.overall - (expected * 10.0_f64).round() / 10.0).abs() < 1e-9);
        assert!((0.0..=100.0).contains(&result.overall));
    }

    #[test]
    fn empty_application_scores_zero() {
        let result = score_application(MechanismId::R21, &[]);
        assert_eq!(result.overall, 0.0);
        assert_eq!(result.impact_estimate, 9);
        assert_eq!(result.grade, "Weak");
    }

    #[test]
    fn impact_scale_mapping() {
        assert_eq!(impact_estimate(100.0), 1);
        assert_eq!(impact_estimate(75.0), 3);
        assert_eq!(impact_estimate(50.0), 5);
        assert_eq!(impact_estimate(0.0), 9);
    }
}
