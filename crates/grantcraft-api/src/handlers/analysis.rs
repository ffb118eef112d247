//! Stateless checks on text the caller sends, for editors that have not
//! saved an application yet.

use axum::Json;
use grantcraft_core::{
    compliance, risk, rules, scoring, ArchitectureData, ComplianceIssue, MechanismId, RiskReport,
    Section, SectionLimit, SectionScore, SectionType, Severity,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ApiResult;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SectionCheckRequest {
    #[schema(value_type = String, example = "R01")]
    pub mechanism: MechanismId,
    #[schema(value_type = String, example = "specific_aims")]
    pub section_type: SectionType,
    /// HTML or plain text.
    pub content: String,
}

impl SectionCheckRequest {
    fn section(&self) -> Section {
        Section::new(self.section_type, self.content.as_str())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SectionCheckResponse {
    #[schema(value_type = String)]
    pub section_type: SectionType,
    pub word_count: usize,
    pub page_count: f64,
    #[schema(value_type = Option<Object>)]
    pub page_limit: Option<SectionLimit>,
    pub passed: bool,
    #[schema(value_type = Vec<Object>)]
    pub issues: Vec<ComplianceIssue>,
}

#[utoipa::path(
    post,
    path = "/api/compliance/check",
    tag = "analysis",
    request_body = SectionCheckRequest,
    responses((status = 200, description = "Compliance issues for one section", body = SectionCheckResponse))
)]
pub async fn check_compliance(
    Json(request): Json<SectionCheckRequest>,
) -> ApiResult<Json<SectionCheckResponse>> {
    let section = request.section();
    let issues = compliance::check_section(request.mechanism, &section);
    Ok(Json(SectionCheckResponse {
        section_type: section.section_type,
        word_count: section.word_count,
        page_count: section.page_count,
        page_limit: rules::section_limit(request.mechanism, section.section_type),
        passed: !issues.iter().any(|i| i.severity == Severity::Error),
        issues,
    }))
}

#[utoipa::path(
    post,
    path = "/api/scoring/section",
    tag = "analysis",
    request_body = SectionCheckRequest,
    responses((status = 200, description = "Heuristic 0-100 section score", body = serde_json::Value))
)]
pub async fn score_section(Json(request): Json<SectionCheckRequest>) -> ApiResult<Json<SectionScore>> {
    Ok(Json(scoring::score_section(request.mechanism, &request.section())))
}

#[utoipa::path(
    post,
    path = "/api/architecture/analyze",
    tag = "analysis",
    request_body = serde_json::Value,
    responses((status = 200, description = "Risk flags and aim dependency graph", body = serde_json::Value))
)]
pub async fn analyze_architecture(Json(data): Json<ArchitectureData>) -> ApiResult<Json<RiskReport>> {
    Ok(Json(risk::assess(&data)))
}
