use approx::assert_abs_diff_eq;
use grantcraft_core::budget::{calculate, BudgetState, CostCategory, DirectCostItem, Personnel};
use grantcraft_core::MechanismId;

fn person(name: &str, salary: f64, effort: f64) -> Personnel {
    Personnel {
        name: name.to_string(),
        role: String::new(),
        base_salary: salary,
        effort_percent: effort,
        months: 12.0,
    }
}

fn item(category: CostCategory, amount: f64) -> DirectCostItem {
    DirectCostItem {
        category,
        description: category.to_string(),
        amount,
    }
}

fn mixed_state(mechanism: MechanismId, years: u8) -> BudgetState {
    let mut state = BudgetState::new(mechanism);
    state.years = years;
    state.personnel = vec![
        person("PI", 250_000.0, 25.0),
        person("Postdoc", 62_000.0, 100.0),
        person("Technician", 48_500.0, 50.0),
    ];
    state.direct_costs = vec![
        item(CostCategory::Equipment, 40_000.0),
        item(CostCategory::Supplies, 18_250.0),
        item(CostCategory::Travel, 3_400.0),
        item(CostCategory::Subaward, 60_000.0),
        item(CostCategory::Subaward, 10_000.0),
    ];
    state
}

#[test]
fn totals_are_consistent_for_every_mechanism() {
    for mechanism in MechanismId::all() {
        let state = mixed_state(*mechanism, 2);
        let summary = calculate(&state).unwrap();

        for year in &summary.years {
            assert_abs_diff_eq!(
                year.personnel_total + year.other_direct_total + year.indirect,
                year.total_cost,
                epsilon = 0.011
            );
            assert_abs_diff_eq!(year.total_cost + year.fee, year.total_with_fee, epsilon = 0.011);
        }

        let totals = &summary.totals;
        assert_abs_diff_eq!(
            totals.personnel_total + totals.other_direct_total + totals.indirect,
            totals.total_cost,
            epsilon = 0.011
        );
        let yearly: f64 = summary.years.iter().map(|y| y.total_cost).sum();
        assert_abs_diff_eq!(yearly, totals.total_cost, epsilon = 0.05);
    }
}

#[test]
fn indirect_base_excludes_equipment_and_large_subawards() {
    let summary = calculate(&mixed_state(MechanismId::R01, 1)).unwrap();
    let year = &summary.years[0];
    // 60k subaward contributes only its first 25k; the 10k one counts fully.
    let expected_base = year.total_direct - 40_000.0 - 35_000.0;
    assert_abs_diff_eq!(year.indirect_base, expected_base, epsilon = 0.011);
    assert_abs_diff_eq!(year.indirect, expected_base * 0.55, epsilon = 0.011);
}

#[test]
fn equipment_is_only_charged_in_year_one() {
    let summary = calculate(&mixed_state(MechanismId::R01, 3)).unwrap();
    assert_abs_diff_eq!(summary.years[0].equipment_total, 40_000.0, epsilon = 0.001);
    assert_abs_diff_eq!(summary.years[1].equipment_total, 0.0, epsilon = 0.001);
    assert_abs_diff_eq!(summary.years[2].equipment_total, 0.0, epsilon = 0.001);
}

#[test]
fn small_business_fee_is_reported_separately() {
    let summary = calculate(&mixed_state(MechanismId::SttrPhase2, 1)).unwrap();
    let year = &summary.years[0];
    assert!(year.fee > 0.0);
    assert_abs_diff_eq!(year.fee, year.total_cost * 0.07, epsilon = 0.011);
}
