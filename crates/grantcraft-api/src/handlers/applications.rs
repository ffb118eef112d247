use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use grantcraft_core::{
    budget, compliance, export, export_gate, review, risk, scoring, Application, ApplicationId,
    ApplicationStatus, ArchitectureData, Attachment, BudgetState, BudgetSummary, ChecklistItem,
    ComplianceReport, ExportDecision, ExportFormat, GrantError, MechanismId, Reference, RiskReport,
    Section, SectionReview, SectionType, StructuralScore,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{download, require_text, FormatQuery};
use crate::{ApiError, ApiResult, AppState, AuthUser};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateApplication {
    pub title: String,
    #[schema(value_type = String, example = "R01")]
    pub mechanism: MechanismId,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateApplication {
    pub title: Option<String>,
    #[schema(value_type = Option<String>)]
    pub mechanism: Option<MechanismId>,
    /// `draft` or `complete`. Completing requires a clean export gate.
    #[schema(value_type = Option<String>)]
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SectionContent {
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewAttachment {
    pub file_name: String,
    #[serde(default = "NewAttachment::default_content_type")]
    pub content_type: String,
    pub size_bytes: u64,
}

impl NewAttachment {
    fn default_content_type() -> String {
        "application/octet-stream".to_string()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewReference {
    pub citation: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub title: String,
    #[schema(value_type = String)]
    pub mechanism: MechanismId,
    #[schema(value_type = String)]
    pub status: ApplicationStatus,
    pub section_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&Application> for ApplicationSummary {
    fn from(app: &Application) -> Self {
        Self {
            id: app.id,
            title: app.title.clone(),
            mechanism: app.mechanism,
            status: app.status,
            section_count: app.sections.len(),
            updated_at: app.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplicationCompliance {
    #[serde(flatten)]
    pub report: ComplianceReport,
    pub checklist: Vec<ChecklistItem>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationExport {
    pub application: Application,
    pub budget: Option<BudgetSummary>,
    pub score: StructuralScore,
    pub compliance: ComplianceReport,
    pub export_gate: ExportDecision,
}

/// A stored budget that no longer calculates is treated as absent.
fn budget_summary(app: &Application) -> Option<BudgetSummary> {
    app.budget.as_ref().and_then(|state| match budget::calculate(state) {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!(application = %app.id, "stored budget does not calculate: {}", e);
            None
        }
    })
}

fn gate(app: &Application) -> ExportDecision {
    export_gate::evaluate(app, budget_summary(app).as_ref())
}

fn blocker_message(decision: &ExportDecision) -> String {
    let codes: Vec<&str> = decision.blockers.iter().map(|b| b.code.as_str()).collect();
    format!(
        "application has {} export blocker(s): {}",
        codes.len(),
        codes.join(", ")
    )
}

fn parse_section_type(raw: &str) -> ApiResult<SectionType> {
    Ok(raw.parse::<SectionType>()?)
}

#[utoipa::path(
    get,
    path = "/api/applications",
    tag = "applications",
    responses((status = 200, description = "The caller's applications", body = [ApplicationSummary]))
)]
pub async fn list_applications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Json<Vec<ApplicationSummary>> {
    let apps = state.store.list(user.id()).await;
    Json(apps.iter().map(ApplicationSummary::from).collect())
}

#[utoipa::path(
    post,
    path = "/api/applications",
    tag = "applications",
    request_body = CreateApplication,
    responses(
        (status = 201, description = "Application created", body = serde_json::Value),
        (status = 400, description = "Invalid title or mechanism")
    )
)]
pub async fn create_application(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateApplication>,
) -> ApiResult<(StatusCode, Json<Application>)> {
    let title = require_text("title", &request.title)?;
    let app = state
        .store
        .insert(Application::new(user.id(), title, request.mechanism))
        .await?;
    info!(application = %app.id, mechanism = %app.mechanism, "application created");
    Ok((StatusCode::CREATED, Json(app)))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    responses(
        (status = 200, description = "The application", body = serde_json::Value),
        (status = 404, description = "Not found or not owned by the caller")
    )
)]
pub async fn get_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
) -> ApiResult<Json<Application>> {
    Ok(Json(state.store.get(user.id(), id).await?))
}

#[utoipa::path(
    put,
    path = "/api/applications/{id}",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    request_body = UpdateApplication,
    responses(
        (status = 200, description = "Updated application", body = serde_json::Value),
        (status = 400, description = "Invalid update, or completion blocked by the export gate")
    )
)]
pub async fn update_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
    Json(request): Json<UpdateApplication>,
) -> ApiResult<Json<Application>> {
    let title = match request.title.as_deref() {
        Some(title) => Some(require_text("title", title)?.to_string()),
        None => None,
    };

    let app = state
        .store
        .update(
            user.id(),
            id,
            Box::new(move |app: &mut Application| {
                if let Some(title) = title {
                    app.title = title;
                }
                if let Some(mechanism) = request.mechanism {
                    // A stored budget follows the application so the gate
                    // measures it against the new mechanism's caps.
                    if let Some(budget_state) = app.budget.as_mut() {
                        budget_state.mechanism = mechanism;
                        budget::calculate(budget_state)?;
                    }
                    app.mechanism = mechanism;
                }
                match request.status {
                    Some(ApplicationStatus::Complete) => {
                        let decision = gate(app);
                        if !decision.allowed {
                            return Err(GrantError::Validation(blocker_message(&decision)));
                        }
                        app.status = ApplicationStatus::Complete;
                    }
                    Some(ApplicationStatus::Draft) => app.status = ApplicationStatus::Draft,
                    None => {}
                }
                Ok(())
            }),
        )
        .await?;
    Ok(Json(app))
}

#[utoipa::path(
    delete,
    path = "/api/applications/{id}",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not found"))
)]
pub async fn delete_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
) -> ApiResult<StatusCode> {
    state.store.delete(user.id(), id).await?;
    info!(application = %id, "application deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/applications/{id}/sections/{section_type}",
    tag = "applications",
    params(
        ("id" = Uuid, Path, description = "Application id"),
        ("section_type" = String, Path, description = "Section type, e.g. specific_aims")
    ),
    request_body = SectionContent,
    responses((status = 200, description = "Stored section with word and page counts", body = serde_json::Value))
)]
pub async fn upsert_section(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, section_type)): Path<(ApplicationId, String)>,
    Json(request): Json<SectionContent>,
) -> ApiResult<Json<Section>> {
    let section = Section::new(parse_section_type(&section_type)?, request.content);
    let stored = section.clone();
    state
        .store
        .update(
            user.id(),
            id,
            Box::new(move |app: &mut Application| {
                app.upsert_section(stored);
                Ok(())
            }),
        )
        .await?;
    Ok(Json(section))
}

#[utoipa::path(
    delete,
    path = "/api/applications/{id}/sections/{section_type}",
    tag = "applications",
    params(
        ("id" = Uuid, Path, description = "Application id"),
        ("section_type" = String, Path, description = "Section type, e.g. specific_aims")
    ),
    responses(
        (status = 204, description = "Section removed"),
        (status = 404, description = "Application or section not found")
    )
)]
pub async fn delete_section(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, section_type)): Path<(ApplicationId, String)>,
) -> ApiResult<StatusCode> {
    let section_type = parse_section_type(&section_type)?;
    state
        .store
        .update(
            user.id(),
            id,
            Box::new(move |app: &mut Application| {
                if app.remove_section(section_type) {
                    Ok(())
                } else {
                    Err(GrantError::NotFound(format!("section {}", section_type)))
                }
            }),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/applications/{id}/architecture",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    request_body = serde_json::Value,
    responses((status = 200, description = "Stored; returns the risk report", body = serde_json::Value))
)]
pub async fn put_architecture(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
    Json(data): Json<ArchitectureData>,
) -> ApiResult<Json<RiskReport>> {
    let report = risk::assess(&data);
    state
        .store
        .update(
            user.id(),
            id,
            Box::new(move |app: &mut Application| {
                app.architecture = Some(data);
                Ok(())
            }),
        )
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    put,
    path = "/api/applications/{id}/budget",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Stored; returns the calculated budget", body = serde_json::Value),
        (status = 400, description = "Budget mechanism differs from the application or does not calculate")
    )
)]
pub async fn put_budget(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
    Json(budget_state): Json<BudgetState>,
) -> ApiResult<Json<BudgetSummary>> {
    let summary = budget::calculate(&budget_state)?;
    state
        .store
        .update(
            user.id(),
            id,
            Box::new(move |app: &mut Application| {
                if budget_state.mechanism != app.mechanism {
                    return Err(GrantError::Validation(format!(
                        "budget is for {} but the application is {}",
                        budget_state.mechanism, app.mechanism
                    )));
                }
                app.budget = Some(budget_state);
                Ok(())
            }),
        )
        .await?;
    Ok(Json(summary))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/attachments",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    request_body = NewAttachment,
    responses(
        (status = 201, description = "Attachment recorded", body = serde_json::Value),
        (status = 400, description = "Attachment exceeds the upload limit")
    )
)]
pub async fn add_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
    Json(request): Json<NewAttachment>,
) -> ApiResult<(StatusCode, Json<Attachment>)> {
    let file_name = require_text("file_name", &request.file_name)?.to_string();
    let max = state.settings.server.max_upload_bytes as u64;
    if request.size_bytes > max {
        return Err(ApiError::Validation(format!(
            "attachment is {} bytes; the limit is {} bytes",
            request.size_bytes, max
        )));
    }

    let attachment = Attachment {
        id: Uuid::new_v4(),
        file_name,
        content_type: request.content_type,
        size_bytes: request.size_bytes,
        uploaded_at: Utc::now(),
    };
    let stored = attachment.clone();
    state
        .store
        .update(
            user.id(),
            id,
            Box::new(move |app: &mut Application| {
                app.attachments.push(stored);
                Ok(())
            }),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/references",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    request_body = NewReference,
    responses((status = 201, description = "Reference added", body = serde_json::Value))
)]
pub async fn add_reference(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
    Json(request): Json<NewReference>,
) -> ApiResult<(StatusCode, Json<Reference>)> {
    let reference = Reference::new(require_text("citation", &request.citation)?);
    let stored = reference.clone();
    state
        .store
        .update(
            user.id(),
            id,
            Box::new(move |app: &mut Application| {
                app.references.push(stored);
                Ok(())
            }),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(reference)))
}

/// Checks every reference in turn. A failed lookup is logged and leaves
/// that reference without a verification; the rest continue.
#[utoipa::path(
    post,
    path = "/api/applications/{id}/references/verify",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    responses((status = 200, description = "References with their verification; failed lookups are left unverified", body = serde_json::Value))
)]
pub async fn verify_references(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
) -> ApiResult<Json<Vec<Reference>>> {
    let app = state.store.get(user.id(), id).await?;

    let mut results = Vec::with_capacity(app.references.len());
    for reference in &app.references {
        let verification = match state
            .verifier
            .verify(&reference.citation, reference.doi.as_deref())
            .await
        {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(reference = %reference.id, "reference lookup failed, skipping: {:#}", e);
                None
            }
        };
        results.push((reference.id, verification));
    }

    let updated = state
        .store
        .update(
            user.id(),
            id,
            Box::new(move |app: &mut Application| {
                for (reference_id, verification) in results {
                    if let Some(reference) = app.references.iter_mut().find(|r| r.id == reference_id) {
                        reference.verification = verification;
                    }
                }
                Ok(())
            }),
        )
        .await?;
    Ok(Json(updated.references))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/compliance",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    responses((status = 200, description = "Compliance report and regulatory checklist", body = serde_json::Value))
)]
pub async fn get_compliance(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
) -> ApiResult<Json<ApplicationCompliance>> {
    let app = state.store.get(user.id(), id).await?;
    Ok(Json(ApplicationCompliance {
        report: compliance::check_application(&app),
        checklist: compliance::regulatory_checklist(&app),
    }))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/score",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    responses((status = 200, description = "Structural score", body = serde_json::Value))
)]
pub async fn get_score(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
) -> ApiResult<Json<StructuralScore>> {
    let app = state.store.get(user.id(), id).await?;
    Ok(Json(scoring::score_application(app.mechanism, &app.sections)))
}

/// An application without architecture data is assessed as empty, which
/// flags the missing hypothesis and aims.
#[utoipa::path(
    get,
    path = "/api/applications/{id}/risk",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    responses((status = 200, description = "Risk flags and aim dependency graph", body = serde_json::Value))
)]
pub async fn get_risk(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
) -> ApiResult<Json<RiskReport>> {
    let app = state.store.get(user.id(), id).await?;
    let data = app.architecture.unwrap_or_default();
    Ok(Json(risk::assess(&data)))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/export-gate",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    responses((status = 200, description = "Export readiness: blockers and warnings", body = serde_json::Value))
)]
pub async fn get_export_gate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
) -> ApiResult<Json<ExportDecision>> {
    let app = state.store.get(user.id(), id).await?;
    Ok(Json(gate(&app)))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/export",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id"), FormatQuery),
    responses(
        (status = 200, description = "Application download"),
        (status = 400, description = "Export gate reports blockers")
    )
)]
pub async fn export_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ApplicationId>,
    Query(query): Query<FormatQuery>,
) -> ApiResult<Response> {
    let app = state.store.get(user.id(), id).await?;
    let budget = budget_summary(&app);
    let decision = export_gate::evaluate(&app, budget.as_ref());
    if !decision.allowed {
        return Err(ApiError::Validation(blocker_message(&decision)));
    }

    let body = match query.format {
        ExportFormat::Json => export::to_json_pretty(&ApplicationExport {
            score: scoring::score_application(app.mechanism, &app.sections),
            compliance: compliance::check_application(&app),
            export_gate: decision,
            budget,
            application: app,
        })?,
        ExportFormat::Csv => {
            let reviews: Vec<SectionReview> = app
                .sections
                .iter()
                .map(|s| review::review_section(app.mechanism, s.section_type.title(), s))
                .collect();
            export::review_to_csv(&reviews)?
        }
    };
    info!(application = %id, format = query.format.extension(), "application exported");
    Ok(download(query.format, "application", body))
}
