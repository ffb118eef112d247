//! Budget calculator for the budget wizard.
//!
//! Pure arithmetic over the form state: personnel cost, direct cost
//! categories, indirect (F&A) on the modified base, and the small-business
//! fee. The state is recomputed on every edit and never persisted as a
//! derived object.

use crate::error::{GrantError, Result};
use crate::model::Severity;
use crate::rules::{
    rules_for, BudgetCap, MechanismId, DEFAULT_ESCALATION_RATE, MODULAR_BUDGET_THRESHOLD,
    NIH_SALARY_CAP, SUBAWARD_INDIRECT_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Equipment,
    Supplies,
    Travel,
    Consultants,
    Subaward,
    Publication,
    ParticipantSupport,
    Other,
}

impl CostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostCategory::Equipment => "equipment",
            CostCategory::Supplies => "supplies",
            CostCategory::Travel => "travel",
            CostCategory::Consultants => "consultants",
            CostCategory::Subaward => "subaward",
            CostCategory::Publication => "publication",
            CostCategory::ParticipantSupport => "participant_support",
            CostCategory::Other => "other",
        }
    }
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personnel {
    pub name: String,
    #[serde(default)]
    pub role: String,
    pub base_salary: f64,
    pub effort_percent: f64,
    #[serde(default = "Personnel::default_months")]
    pub months: f64,
}

impl Personnel {
    fn default_months() -> f64 {
        12.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectCostItem {
    pub category: CostCategory,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetState {
    pub mechanism: MechanismId,
    #[serde(default = "BudgetState::default_years")]
    pub years: u8,
    #[serde(default)]
    pub personnel: Vec<Personnel>,
    #[serde(default)]
    pub direct_costs: Vec<DirectCostItem>,
    #[serde(default)]
    pub fringe_rate_override: Option<f64>,
    #[serde(default)]
    pub indirect_rate_override: Option<f64>,
    #[serde(default)]
    pub escalation_rate: Option<f64>,
}

impl BudgetState {
    fn default_years() -> u8 {
        1
    }

    pub fn new(mechanism: MechanismId) -> Self {
        Self {
            mechanism,
            years: 1,
            personnel: Vec::new(),
            direct_costs: Vec::new(),
            fringe_rate_override: None,
            indirect_rate_override: None,
            escalation_rate: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonnelLine {
    pub name: String,
    pub role: String,
    pub base_salary: f64,
    /// Salary after escalation and the NIH cap.
    pub applied_salary: f64,
    pub effort_percent: f64,
    pub months: f64,
    pub salary_requested: f64,
    pub fringe: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectLine {
    pub category: CostCategory,
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearBudget {
    pub year: u8,
    pub personnel: Vec<PersonnelLine>,
    pub direct_costs: Vec<DirectLine>,
    pub personnel_total: f64,
    pub other_direct_total: f64,
    pub total_direct: f64,
    pub equipment_total: f64,
    pub subaward_excess: f64,
    pub indirect_base: f64,
    pub indirect: f64,
    pub total_cost: f64,
    pub fee: f64,
    pub total_with_fee: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetTotals {
    pub personnel_total: f64,
    pub other_direct_total: f64,
    pub total_direct: f64,
    pub indirect: f64,
    pub total_cost: f64,
    pub fee: f64,
    pub total_with_fee: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AppliedRates {
    pub fringe_rate: f64,
    pub indirect_rate: f64,
    pub fee_rate: f64,
    pub escalation_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetIssue {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u8>,
}

impl BudgetIssue {
    fn new(code: &str, severity: Severity, message: impl Into<String>, year: Option<u8>) -> Self {
        Self {
            code: code.to_string(),
            severity,
            message: message.into(),
            year,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub mechanism: MechanismId,
    pub years: Vec<YearBudget>,
    pub totals: BudgetTotals,
    pub rates: AppliedRates,
    pub issues: Vec<BudgetIssue>,
}

impl BudgetSummary {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn check_rate(name: &str, rate: Option<f64>, default: f64) -> Result<f64> {
    match rate {
        Some(r) if !(0.0..=1.0).contains(&r) || r.is_nan() => Err(GrantError::Validation(
            format!("{} must be between 0 and 1, got {}", name, r),
        )),
        Some(r) => Ok(r),
        None => Ok(default),
    }
}

/// Computes every project year and the project totals, then attaches the
/// validation issues from [`validate`].
pub fn calculate(state: &BudgetState) -> Result<BudgetSummary> {
    if state.years == 0 {
        return Err(GrantError::Validation(
            "budget must cover at least one year".to_string(),
        ));
    }

    let rules = rules_for(state.mechanism);
    let rates = AppliedRates {
        fringe_rate: check_rate(
            "fringe_rate_override",
            state.fringe_rate_override,
            rules.default_rates.fringe_rate,
        )?,
        indirect_rate: check_rate(
            "indirect_rate_override",
            state.indirect_rate_override,
            rules.default_rates.indirect_rate,
        )?,
        fee_rate: rules.fee_rate,
        escalation_rate: check_rate(
            "escalation_rate",
            state.escalation_rate,
            DEFAULT_ESCALATION_RATE,
        )?,
    };

    let years: Vec<YearBudget> = (1..=state.years)
        .map(|year| calculate_year(state, year, &rates, rules.salary_capped))
        .collect();

    let mut totals = BudgetTotals::default();
    for y in &years {
        totals.personnel_total += y.personnel_total;
        totals.other_direct_total += y.other_direct_total;
        totals.indirect += y.indirect;
        totals.fee += y.fee;
    }
    totals.personnel_total = round_cents(totals.personnel_total);
    totals.other_direct_total = round_cents(totals.other_direct_total);
    totals.indirect = round_cents(totals.indirect);
    totals.fee = round_cents(totals.fee);
    totals.total_direct = round_cents(totals.personnel_total + totals.other_direct_total);
    totals.total_cost = round_cents(totals.total_direct + totals.indirect);
    totals.total_with_fee = round_cents(totals.total_cost + totals.fee);

    let mut summary = BudgetSummary {
        mechanism: state.mechanism,
        years,
        totals,
        rates,
        issues: Vec::new(),
    };
    summary.issues = validate(state, &summary);

    tracing::debug!(
        mechanism = %state.mechanism,
        years = state.years,
        total_cost = summary.totals.total_cost,
        issues = summary.issues.len(),
        "budget calculated"
    );

    Ok(summary)
}

fn calculate_year(
    state: &BudgetState,
    year: u8,
    rates: &AppliedRates,
    salary_capped: bool,
) -> YearBudget {
    let factor = (1.0 + rates.escalation_rate).powi(i32::from(year) - 1);

    let personnel: Vec<PersonnelLine> = state
        .personnel
        .iter()
        .map(|p| {
            let escalated = p.base_salary * factor;
            let applied_salary = if salary_capped {
                escalated.min(NIH_SALARY_CAP)
            } else {
                escalated
            };
            let salary_requested =
                round_cents(applied_salary * p.effort_percent / 100.0 * p.months / 12.0);
            let fringe = round_cents(salary_requested * rates.fringe_rate);
            PersonnelLine {
                name: p.name.clone(),
                role: p.role.clone(),
                base_salary: p.base_salary,
                applied_salary: round_cents(applied_salary),
                effort_percent: p.effort_percent,
                months: p.months,
                salary_requested,
                fringe,
                total: round_cents(salary_requested + fringe),
            }
        })
        .collect();

    let direct_costs: Vec<DirectLine> = state
        .direct_costs
        .iter()
        .filter(|item| item.category != CostCategory::Equipment || year == 1)
        .map(|item| {
            let amount = if item.category == CostCategory::Equipment {
                item.amount
            } else {
                item.amount * factor
            };
            DirectLine {
                category: item.category,
                description: item.description.clone(),
                amount: round_cents(amount),
            }
        })
        .collect();

    let personnel_total = round_cents(personnel.iter().map(|p| p.total).sum());
    let other_direct_total = round_cents(direct_costs.iter().map(|d| d.amount).sum());
    let total_direct = round_cents(personnel_total + other_direct_total);

    let equipment_total = round_cents(
        direct_costs
            .iter()
            .filter(|d| d.category == CostCategory::Equipment)
            .map(|d| d.amount)
            .sum(),
    );
    let subaward_excess = round_cents(
        direct_costs
            .iter()
            .filter(|d| d.category == CostCategory::Subaward)
            .map(|d| (d.amount - SUBAWARD_INDIRECT_THRESHOLD).max(0.0))
            .sum(),
    );
    let indirect_base = round_cents((total_direct - equipment_total - subaward_excess).max(0.0));
    let indirect = round_cents(indirect_base * rates.indirect_rate);
    let total_cost = round_cents(total_direct + indirect);
    let fee = round_cents(total_cost * rates.fee_rate);

    YearBudget {
        year,
        personnel,
        direct_costs,
        personnel_total,
        other_direct_total,
        total_direct,
        equipment_total,
        subaward_excess,
        indirect_base,
        indirect,
        total_cost,
        fee,
        total_with_fee: round_cents(total_cost + fee),
    }
}

/// Checks form input and computed totals against the mechanism's static limits.
pub fn validate(state: &BudgetState, summary: &BudgetSummary) -> Vec<BudgetIssue> {
    let rules = rules_for(state.mechanism);
    let mut issues = Vec::new();

    if state.years > rules.max_years {
        issues.push(BudgetIssue::new(
            "TOO_MANY_YEARS",
            Severity::Error,
            format!(
                "{} allows at most {} year(s), budget covers {}",
                state.mechanism, rules.max_years, state.years
            ),
            None,
        ));
    }

    for p in &state.personnel {
        if !(0.0..=100.0).contains(&p.effort_percent) {
            issues.push(BudgetIssue::new(
                "INVALID_EFFORT",
                Severity::Error,
                format!(
                    "{}: effort must be between 0 and 100%, got {}",
                    p.name, p.effort_percent
                ),
                None,
            ));
        }
        if !(0.0..=12.0).contains(&p.months) {
            issues.push(BudgetIssue::new(
                "INVALID_MONTHS",
                Severity::Error,
                format!("{}: months must be between 0 and 12, got {}", p.name, p.months),
                None,
            ));
        }
        if p.base_salary < 0.0 {
            issues.push(BudgetIssue::new(
                "NEGATIVE_AMOUNT",
                Severity::Error,
                format!("{}: salary cannot be negative", p.name),
                None,
            ));
        }
        if rules.salary_capped && p.base_salary > NIH_SALARY_CAP {
            issues.push(BudgetIssue::new(
                "SALARY_CAPPED",
                Severity::Warning,
                format!(
                    "{}: salary ${:.0} exceeds the NIH cap and is limited to ${:.0}",
                    p.name, p.base_salary, NIH_SALARY_CAP
                ),
                None,
            ));
        }
    }

    for item in &state.direct_costs {
        if item.amount < 0.0 {
            issues.push(BudgetIssue::new(
                "NEGATIVE_AMOUNT",
                Severity::Error,
                format!(
                    "{} line '{}' cannot be negative",
                    item.category, item.description
                ),
                None,
            ));
        }
    }

    match rules.budget_cap {
        BudgetCap::DirectPerYear { amount } => {
            for y in summary.years.iter().filter(|y| y.total_direct > amount) {
                issues.push(direct_year_issue(state.mechanism, y, amount));
            }
        }
        BudgetCap::DirectTotal { total, per_year } => {
            for y in summary.years.iter().filter(|y| y.total_direct > per_year) {
                issues.push(direct_year_issue(state.mechanism, y, per_year));
            }
            if summary.totals.total_direct > total {
                issues.push(BudgetIssue::new(
                    "DIRECT_TOTAL_CAP_EXCEEDED",
                    Severity::Error,
                    format!(
                        "total direct costs ${:.2} exceed the {} project limit of ${:.0}",
                        summary.totals.total_direct, state.mechanism, total
                    ),
                    None,
                ));
            }
        }
        BudgetCap::TotalCost { amount } => {
            if summary.totals.total_with_fee > amount {
                issues.push(BudgetIssue::new(
                    "TOTAL_COST_CAP_EXCEEDED",
                    Severity::Error,
                    format!(
                        "total costs including fee ${:.2} exceed the {} cap of ${:.0}",
                        summary.totals.total_with_fee, state.mechanism, amount
                    ),
                    None,
                ));
            }
        }
        BudgetCap::None => {}
    }

    if state.mechanism == MechanismId::R01 {
        for y in summary
            .years
            .iter()
            .filter(|y| y.total_direct > MODULAR_BUDGET_THRESHOLD)
        {
            issues.push(BudgetIssue::new(
                "NON_MODULAR",
                Severity::Info,
                format!(
                    "year {} direct costs exceed ${:.0}; a detailed R&R budget is required",
                    y.year, MODULAR_BUDGET_THRESHOLD
                ),
                Some(y.year),
            ));
        }
    }

    issues
}

fn direct_year_issue(mechanism: MechanismId, year: &YearBudget, cap: f64) -> BudgetIssue {
    BudgetIssue::new(
        "DIRECT_CAP_EXCEEDED",
        Severity::Error,
        format!(
            "year {} direct costs ${:.2} exceed the {} annual limit of ${:.0}",
            year.year, year.total_direct, mechanism, cap
        ),
        Some(year.year),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn person(name: &str, salary: f64, effort: f64) -> Personnel {
        Personnel {
            name: name.to_string(),
            role: "PI".to_string(),
            base_salary: salary,
            effort_percent: effort,
            months: 12.0,
        }
    }

    fn item(category: CostCategory, amount: f64) -> DirectCostItem {
        DirectCostItem {
            category,
            description: format!("{}", category),
            amount,
        }
    }

    #[test]
    fn personnel_cost_formula() {
        let mut state = BudgetState::new(MechanismId::R01);
        state.personnel.push(Personnel {
            months: 6.0,
            ..person("Lee", 100_000.0, 50.0)
        });
        let summary = calculate(&state).unwrap();
        let line = &summary.years[0].personnel[0];
        // 100k * 50% * 6/12 = 25k, fringe 30% = 7.5k
        assert_abs_diff_eq!(line.salary_requested, 25_000.0);
        assert_abs_diff_eq!(line.fringe, 7_500.0);
        assert_abs_diff_eq!(line.total, 32_500.0);
    }

    #[test]
    fn indirect_base_excludes_equipment_and_subaward_excess() {
        let mut state = BudgetState::new(MechanismId::R01);
        state.personnel.push(person("Lee", 100_000.0, 10.0));
        state.direct_costs.push(item(CostCategory::Equipment, 40_000.0));
        state.direct_costs.push(item(CostCategory::Subaward, 60_000.0));
        state.direct_costs.push(item(CostCategory::Subaward, 10_000.0));
        state.direct_costs.push(item(CostCategory::Supplies, 5_000.0));
        let summary = calculate(&state).unwrap();
        let y = &summary.years[0];

        // personnel 10k + 3k fringe = 13k; other direct 115k
        assert_abs_diff_eq!(y.total_direct, 128_000.0);
        assert_abs_diff_eq!(y.subaward_excess, 35_000.0);
        assert_abs_diff_eq!(y.indirect_base, 128_000.0 - 40_000.0 - 35_000.0);
        assert_abs_diff_eq!(y.indirect, 53_000.0 * 0.55, epsilon = 0.01);
    }

    #[test]
    fn totals_are_consistent() {
        let mut state = BudgetState::new(MechanismId::R01);
        state.years = 3;
        state.personnel.push(person("Lee", 187_333.0, 25.0));
        state.personnel.push(person("Ng", 61_250.0, 100.0));
        state.direct_costs.push(item(CostCategory::Travel, 3_333.33));
        state.direct_costs.push(item(CostCategory::Equipment, 12_500.0));
        let summary = calculate(&state).unwrap();

        for y in &summary.years {
            assert_abs_diff_eq!(
                y.personnel_total + y.other_direct_total + y.indirect,
                y.total_cost,
                epsilon = 0.011
            );
        }
        let t = &summary.totals;
        assert_abs_diff_eq!(
            t.personnel_total + t.other_direct_total + t.indirect,
            t.total_cost,
            epsilon = 0.011
        );
        // equipment is a year-one cost only
        assert_abs_diff_eq!(summary.years[1].equipment_total, 0.0);
    }

    #[test]
    fn escalation_applies_to_out_years() {
        let mut state = BudgetState::new(MechanismId::R01);
        state.years = 2;
        state.personnel.push(person("Lee", 100_000.0, 100.0));
        let summary = calculate(&state).unwrap();
        assert_abs_diff_eq!(summary.years[1].personnel[0].applied_salary, 103_000.0);
    }

    #[test]
    fn salary_cap_applies_to_academic_only() {
        let mut state = BudgetState::new(MechanismId::R01);
        state.personnel.push(person("Chief", 300_000.0, 10.0));
        let summary = calculate(&state).unwrap();
        assert_abs_diff_eq!(summary.years[0].personnel[0].applied_salary, NIH_SALARY_CAP);
        assert!(summary.issues.iter().any(|i| i.code == "SALARY_CAPPED"));

        state.mechanism = MechanismId::SbirPhase1;
        let summary = calculate(&state).unwrap();
        assert_abs_diff_eq!(summary.years[0].personnel[0].applied_salary, 300_000.0);
        assert!(!summary.issues.iter().any(|i| i.code == "SALARY_CAPPED"));
    }

    #[test]
    fn small_business_fee_and_total_cap() {
        let mut state = BudgetState::new(MechanismId::SbirPhase1);
        state.direct_costs.push(item(CostCategory::Supplies, 100_000.0));
        let summary = calculate(&state).unwrap();
        let y = &summary.years[0];
        assert_abs_diff_eq!(y.indirect, 40_000.0);
        assert_abs_diff_eq!(y.fee, 140_000.0 * 0.07, epsilon = 0.01);
        assert!(!summary.has_errors());

        state.direct_costs.push(item(CostCategory::Supplies, 150_000.0));
        let summary = calculate(&state).unwrap();
        assert!(summary
            .issues
            .iter()
            .any(|i| i.code == "TOTAL_COST_CAP_EXCEEDED"));
    }

    #[test]
    fn r21_caps_per_year_and_total() {
        let mut state = BudgetState::new(MechanismId::R21);
        state.years = 2;
        state.escalation_rate = Some(0.0);
        state.direct_costs.push(item(CostCategory::Supplies, 150_000.0));
        let summary = calculate(&state).unwrap();
        let codes: Vec<&str> = summary.issues.iter().map(|i| i.code.as_str()).collect();
        assert!(codes.contains(&"DIRECT_TOTAL_CAP_EXCEEDED"));
        assert!(!codes.contains(&"DIRECT_CAP_EXCEEDED"));

        state.years = 3;
        let summary = calculate(&state).unwrap();
        assert!(summary.issues.iter().any(|i| i.code == "TOO_MANY_YEARS"));
    }

    #[test]
    fn rejects_out_of_range_rates() {
        let mut state = BudgetState::new(MechanismId::R01);
        state.indirect_rate_override = Some(1.5);
        assert!(matches!(calculate(&state), Err(GrantError::Validation(_))));

        state.indirect_rate_override = Some(0.61);
        let summary = calculate(&state).unwrap();
        assert_abs_diff_eq!(summary.rates.indirect_rate, 0.61);
    }

    #[test]
    fn invalid_inputs_are_reported() {
        let mut state = BudgetState::new(MechanismId::R03);
        state.personnel.push(Personnel {
            months: 14.0,
            ..person("Lee", 90_000.0, 120.0)
        });
        state.direct_costs.push(item(CostCategory::Travel, -10.0));
        let summary = calculate(&state).unwrap();
        let codes: Vec<&str> = summary.issues.iter().map(|i| i.code.as_str()).collect();
        assert!(codes.contains(&"INVALID_EFFORT"));
        assert!(codes.contains(&"INVALID_MONTHS"));
        assert!(codes.contains(&"NEGATIVE_AMOUNT"));
        assert!(summary.has_errors());
    }

    #[test]
    fn modular_threshold_is_informational() {
        let mut state = BudgetState::new(MechanismId::R01);
        state.direct_costs.push(item(CostCategory::Supplies, 260_000.0));
        let summary = calculate(&state).unwrap();
        let issue = summary
            .issues
            .iter()
            .find(|i| i.code == "NON_MODULAR")
            .expect("non-modular notice");
        assert_eq!(issue.severity, Severity::Info);
        assert!(!summary.has_errors());
    }

    #[test]
    fn modular_notice_is_r01_only() {
        let mut state = BudgetState::new(MechanismId::R15);
        state.direct_costs.push(item(CostCategory::Supplies, 260_000.0));
        let summary = calculate(&state).unwrap();
        assert!(summary.issues.iter().all(|i| i.code != "NON_MODULAR"));
    }
}
