//! Static NIH / SBIR / STTR rule tables.
//!
//! Every number here comes from the published NIH application guide for the
//! relevant activity code. Values are keyed by [`MechanismId`] and never
//! change at runtime.

use crate::error::{GrantError, Result};
use crate::section::SectionType;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// NIH Executive Level II salary cap applied to academic mechanisms.
pub const NIH_SALARY_CAP: f64 = 221_900.0;

/// Direct costs per year above which an R01 needs a detailed (non-modular) budget.
pub const MODULAR_BUDGET_THRESHOLD: f64 = 250_000.0;

/// Portion of each subaward that stays in the indirect base.
pub const SUBAWARD_INDIRECT_THRESHOLD: f64 = 25_000.0;

/// Default annual escalation for out-year projections.
pub const DEFAULT_ESCALATION_RATE: f64 = 0.03;

/// Words that fit on a single-spaced page at 11pt Arial with half-inch margins.
pub const WORDS_PER_PAGE: f64 = 500.0;

/// Characters per rendered line used for line-limited sections.
pub const CHARS_PER_LINE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MechanismId {
    #[serde(rename = "R01")]
    R01,
    #[serde(rename = "R03")]
    R03,
    #[serde(rename = "R15")]
    R15,
    #[serde(rename = "R21")]
    R21,
    #[serde(rename = "K99")]
    K99,
    #[serde(rename = "F31")]
    F31,
    #[serde(rename = "SBIR_PHASE_1")]
    SbirPhase1,
    #[serde(rename = "SBIR_PHASE_2")]
    SbirPhase2,
    #[serde(rename = "STTR_PHASE_1")]
    SttrPhase1,
    #[serde(rename = "STTR_PHASE_2")]
    SttrPhase2,
}

impl MechanismId {
    pub fn all() -> &'static [MechanismId] {
        &[
            MechanismId::R01,
            MechanismId::R03,
            MechanismId::R15,
            MechanismId::R21,
            MechanismId::K99,
            MechanismId::F31,
            MechanismId::SbirPhase1,
            MechanismId::SbirPhase2,
            MechanismId::SttrPhase1,
            MechanismId::SttrPhase2,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MechanismId::R01 => "R01",
            MechanismId::R03 => "R03",
            MechanismId::R15 => "R15",
            MechanismId::R21 => "R21",
            MechanismId::K99 => "K99",
            MechanismId::F31 => "F31",
            MechanismId::SbirPhase1 => "SBIR_PHASE_1",
            MechanismId::SbirPhase2 => "SBIR_PHASE_2",
            MechanismId::SttrPhase1 => "STTR_PHASE_1",
            MechanismId::SttrPhase2 => "STTR_PHASE_2",
        }
    }

    /// Small-business mechanisms carry a fee and are not subject to the salary cap.
    pub fn is_small_business(&self) -> bool {
        matches!(
            self,
            MechanismId::SbirPhase1
                | MechanismId::SbirPhase2
                | MechanismId::SttrPhase1
                | MechanismId::SttrPhase2
        )
    }

    pub fn is_phase_two(&self) -> bool {
        matches!(self, MechanismId::SbirPhase2 | MechanismId::SttrPhase2)
    }

    pub fn rules(&self) -> &'static MechanismRules {
        rules_for(*self)
    }
}

impl fmt::Display for MechanismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MechanismId {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .to_ascii_uppercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        let id = match normalized.as_str() {
            "R01" => MechanismId::R01,
            "R03" => MechanismId::R03,
            "R15" => MechanismId::R15,
            "R21" => MechanismId::R21,
            "K99" | "K99_R00" | "K99/R00" => MechanismId::K99,
            "F31" => MechanismId::F31,
            "SBIR_PHASE_1" | "SBIR_PHASE_I" | "SBIR_I" | "SBIR1" | "R43" => MechanismId::SbirPhase1,
            "SBIR_PHASE_2" | "SBIR_PHASE_II" | "SBIR_II" | "SBIR2" | "R44" => {
                MechanismId::SbirPhase2
            }
            "STTR_PHASE_1" | "STTR_PHASE_I" | "STTR_I" | "STTR1" | "R41" => MechanismId::SttrPhase1,
            "STTR_PHASE_2" | "STTR_PHASE_II" | "STTR_II" | "STTR2" | "R42" => {
                MechanismId::SttrPhase2
            }
            _ => return Err(GrantError::UnknownMechanism(s.to_string())),
        };
        Ok(id)
    }
}

/// Budget ceiling attached to a mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetCap {
    /// Direct costs may not exceed `amount` in any single year.
    DirectPerYear { amount: f64 },
    /// Direct costs capped over the whole project and per year.
    DirectTotal { total: f64, per_year: f64 },
    /// Hard cap on total costs (direct + indirect + fee) for the whole award.
    TotalCost { amount: f64 },
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateDefaults {
    pub fringe_rate: f64,
    pub indirect_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SectionLimit {
    Pages(f64),
    Lines(u32),
    Sentences(u32),
}

impl fmt::Display for SectionLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionLimit::Pages(p) => write!(f, "{} page(s)", p),
            SectionLimit::Lines(l) => write!(f, "{} line(s)", l),
            SectionLimit::Sentences(s) => write!(f, "{} sentence(s)", s),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MechanismRules {
    pub id: MechanismId,
    pub name: &'static str,
    pub max_years: u8,
    pub budget_cap: BudgetCap,
    pub default_rates: RateDefaults,
    pub fee_rate: f64,
    pub salary_capped: bool,
    pub section_limits: HashMap<SectionType, SectionLimit>,
    pub required_sections: Vec<SectionType>,
}

impl MechanismRules {
    pub fn section_limit(&self, section_type: SectionType) -> Option<SectionLimit> {
        self.section_limits.get(&section_type).copied()
    }

    pub fn requires(&self, section_type: SectionType) -> bool {
        self.required_sections.contains(&section_type)
    }
}

const ACADEMIC_RATES: RateDefaults = RateDefaults {
    fringe_rate: 0.30,
    indirect_rate: 0.55,
};

const SMALL_BUSINESS_RATES: RateDefaults = RateDefaults {
    fringe_rate: 0.25,
    indirect_rate: 0.40,
};

const SMALL_BUSINESS_FEE: f64 = 0.07;

fn base_limits(strategy_pages: f64) -> HashMap<SectionType, SectionLimit> {
    let mut limits = HashMap::new();
    limits.insert(SectionType::SpecificAims, SectionLimit::Pages(1.0));
    limits.insert(
        SectionType::ResearchStrategy,
        SectionLimit::Pages(strategy_pages),
    );
    limits.insert(SectionType::ProjectSummary, SectionLimit::Lines(30));
    limits.insert(SectionType::ProjectNarrative, SectionLimit::Sentences(3));
    limits.insert(SectionType::Introduction, SectionLimit::Pages(1.0));
    limits
}

fn academic(
    id: MechanismId,
    name: &'static str,
    max_years: u8,
    budget_cap: BudgetCap,
    strategy_pages: f64,
) -> MechanismRules {
    MechanismRules {
        id,
        name,
        max_years,
        budget_cap,
        default_rates: ACADEMIC_RATES,
        fee_rate: 0.0,
        salary_capped: true,
        section_limits: base_limits(strategy_pages),
        required_sections: vec![
            SectionType::ProjectSummary,
            SectionType::ProjectNarrative,
            SectionType::SpecificAims,
            SectionType::ResearchStrategy,
            SectionType::Bibliography,
        ],
    }
}

fn small_business(
    id: MechanismId,
    name: &'static str,
    max_years: u8,
    total_cap: f64,
) -> MechanismRules {
    let phase_two = id.is_phase_two();
    let mut section_limits = base_limits(if phase_two { 12.0 } else { 6.0 });
    let mut required_sections = vec![
        SectionType::ProjectSummary,
        SectionType::ProjectNarrative,
        SectionType::SpecificAims,
        SectionType::ResearchStrategy,
        SectionType::Bibliography,
    ];
    if phase_two {
        section_limits.insert(SectionType::CommercializationPlan, SectionLimit::Pages(12.0));
        required_sections.push(SectionType::CommercializationPlan);
        required_sections.push(SectionType::LettersOfSupport);
    }

    MechanismRules {
        id,
        name,
        max_years,
        budget_cap: BudgetCap::TotalCost { amount: total_cap },
        default_rates: SMALL_BUSINESS_RATES,
        fee_rate: SMALL_BUSINESS_FEE,
        salary_capped: false,
        section_limits,
        required_sections,
    }
}

fn build_rules(id: MechanismId) -> MechanismRules {
    match id {
        MechanismId::R01 => academic(
            id,
            "Research Project Grant",
            5,
            BudgetCap::DirectPerYear { amount: 500_000.0 },
            12.0,
        ),
        MechanismId::R03 => academic(
            id,
            "Small Research Grant",
            2,
            BudgetCap::DirectPerYear { amount: 50_000.0 },
            6.0,
        ),
        MechanismId::R15 => academic(
            id,
            "Research Enhancement Award",
            3,
            BudgetCap::DirectTotal {
                total: 300_000.0,
                per_year: 300_000.0,
            },
            12.0,
        ),
        MechanismId::R21 => academic(
            id,
            "Exploratory/Developmental Research Grant",
            2,
            BudgetCap::DirectTotal {
                total: 275_000.0,
                per_year: 200_000.0,
            },
            6.0,
        ),
        MechanismId::K99 => academic(id, "Pathway to Independence Award", 5, BudgetCap::None, 12.0),
        MechanismId::F31 => academic(id, "Predoctoral Individual NRSA", 5, BudgetCap::None, 6.0),
        MechanismId::SbirPhase1 => small_business(id, "SBIR Phase I", 2, 314_363.0),
        MechanismId::SbirPhase2 => small_business(id, "SBIR Phase II", 3, 2_095_748.0),
        MechanismId::SttrPhase1 => small_business(id, "STTR Phase I", 2, 314_363.0),
        MechanismId::SttrPhase2 => small_business(id, "STTR Phase II", 3, 2_095_748.0),
    }
}

static RULES: Lazy<HashMap<MechanismId, MechanismRules>> = Lazy::new(|| {
    MechanismId::all()
        .iter()
        .map(|id| (*id, build_rules(*id)))
        .collect()
});

pub fn rules_for(id: MechanismId) -> &'static MechanismRules {
    // One entry per `MechanismId::all()`; `build_rules` matches every variant.
    &RULES[&id]
}

pub fn section_limit(id: MechanismId, section_type: SectionType) -> Option<SectionLimit> {
    rules_for(id).section_limit(section_type)
}
