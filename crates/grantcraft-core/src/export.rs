//! JSON and CSV encoders for downloads.

use crate::budget::BudgetSummary;
use crate::error::{GrantError, Result};
use crate::review::SectionReview;
use serde::Serialize;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => JSON_CONTENT_TYPE,
            ExportFormat::Csv => CSV_CONTENT_TYPE,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn amount(value: f64) -> String {
    format!("{:.2}", value)
}

pub fn budget_to_csv(summary: &BudgetSummary) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["year", "category", "description", "amount"])?;

    for year in &summary.years {
        let y = year.year.to_string();
        for line in &year.personnel {
            let description = if line.role.is_empty() {
                line.name.clone()
            } else {
                format!("{} ({})", line.name, line.role)
            };
            writer.write_record([y.as_str(), "personnel", description.as_str(), amount(line.total).as_str()])?;
        }
        for line in &year.direct_costs {
            writer.write_record([
                y.as_str(),
                line.category.as_str(),
                line.description.as_str(),
                amount(line.amount).as_str(),
            ])?;
        }
        writer.write_record([y.as_str(), "indirect", "F&A costs", amount(year.indirect).as_str()])?;
        if year.fee > 0.0 {
            writer.write_record([y.as_str(), "fee", "small business fee", amount(year.fee).as_str()])?;
        }
        writer.write_record([y.as_str(), "total", "total cost", amount(year.total_with_fee).as_str()])?;
    }

    finish(writer)
}

pub fn review_to_csv(reviews: &[SectionReview]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["section", "score", "errors", "warnings", "pages", "page_limit"])?;

    for review in reviews {
        let limit = review
            .page_limit
            .map(|l| l.to_string())
            .unwrap_or_default();
        writer.write_record([
            review.section_type.title().to_string(),
            format!("{:.1}", review.score.score),
            review.errors().to_string(),
            review.warnings().to_string(),
            format!("{:.1}", review.page_count),
            limit,
        ])?;
    }

    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| GrantError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| GrantError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{calculate, BudgetState, CostCategory, DirectCostItem, Personnel};
    use crate::review::review_document;
    use crate::rules::MechanismId;

    fn summary() -> BudgetSummary {
        let mut state = BudgetState::new(MechanismId::SbirPhase1);
        state.personnel.push(Personnel {
            name: "Ada".to_string(),
            role: "PI".to_string(),
            base_salary: 120_000.0,
            effort_percent: 50.0,
            months: 12.0,
        });
        state.direct_costs.push(DirectCostItem {
            category: CostCategory::Supplies,
            description: "Reagents, plates".to_string(),
            amount: 10_000.0,
        });
        calculate(&state).unwrap()
    }

    #[test]
    fn budget_csv_has_header_and_rows() {
        let csv = budget_to_csv(&summary()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "year,category,description,amount");
        assert_eq!(lines[1], "1,personnel,Ada (PI),75000.00");
        // Commas in descriptions are quoted.
        assert_eq!(lines[2], "1,supplies,\"Reagents, plates\",10000.00");
        assert!(lines[3].starts_with("1,indirect,"));
        assert!(lines[4].starts_with("1,fee,"));
        assert!(lines[5].starts_with("1,total,"));
    }

    #[test]
    fn review_csv_rows() {
        let review = review_document(
            MechanismId::R01,
            "Specific Aims\nWe hypothesize X. Aim 1 tests it.\nReferences Cited\nDoe 2020.",
        );
        let csv = review_to_csv(&review.sections).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "section,score,errors,warnings,pages,page_limit");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Specific Aims,"));
    }

    #[test]
    fn json_is_pretty() {
        let json = to_json_pretty(&summary()).unwrap();
        assert!(json.contains("\n  \"mechanism\": \"SBIR_PHASE_1\""));
    }
}
