use axum::{extract::Query, response::Response, Json};
use grantcraft_core::{budget, export, BudgetState, BudgetSummary, ExportFormat};
use tracing::debug;

use super::{download, FormatQuery};
use crate::ApiResult;

#[utoipa::path(
    post,
    path = "/api/budget/calculate",
    tag = "budget",
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Per-year and total costs with validation issues", body = serde_json::Value),
        (status = 400, description = "Invalid budget input")
    )
)]
pub async fn calculate(Json(state): Json<BudgetState>) -> ApiResult<Json<BudgetSummary>> {
    let summary = budget::calculate(&state)?;
    debug!(
        mechanism = %summary.mechanism,
        years = summary.years.len(),
        issues = summary.issues.len(),
        "budget calculated"
    );
    Ok(Json(summary))
}

#[utoipa::path(
    post,
    path = "/api/budget/export",
    tag = "budget",
    params(FormatQuery),
    request_body = serde_json::Value,
    responses((status = 200, description = "Budget download (CSV or JSON)"))
)]
pub async fn export_budget(
    Query(query): Query<FormatQuery>,
    Json(state): Json<BudgetState>,
) -> ApiResult<Response> {
    let summary = budget::calculate(&state)?;
    let body = match query.format {
        ExportFormat::Json => export::to_json_pretty(&summary)?,
        ExportFormat::Csv => export::budget_to_csv(&summary)?,
    };
    Ok(download(query.format, "budget", body))
}
