use axum::{extract::State, Json};
use grantcraft_ai::{Critique, CritiqueRequest, LetterKind, RewriteGoal};
use grantcraft_core::{ApplicationId, MechanismId, SectionType};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use super::require_text;
use crate::{ApiError, ApiResult, AppState, AuthUser};

const UPSTREAM_FAILED: &str = "AI provider request failed";

fn upstream(e: anyhow::Error) -> ApiError {
    error!("AI provider error: {:#}", e);
    ApiError::Upstream(UPSTREAM_FAILED.to_string())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CritiqueBody {
    pub text: String,
    #[schema(value_type = String, example = "specific_aims")]
    pub section_type: SectionType,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub mechanism: Option<MechanismId>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkCritiqueBody {
    /// Critique the stored sections of this application...
    #[schema(value_type = Option<String>, format = Uuid)]
    pub application_id: Option<ApplicationId>,
    /// ...or these sections.
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub sections: Option<Vec<CritiqueRequest>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub mechanism: Option<MechanismId>,
}

#[derive(Debug, Serialize)]
pub struct SectionCritique {
    pub section_type: SectionType,
    pub critique: Critique,
}

#[derive(Debug, Serialize)]
pub struct BulkCritiqueResponse {
    pub mechanism: MechanismId,
    pub critiques: Vec<SectionCritique>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HypothesesBody {
    pub topic: String,
    #[serde(default)]
    pub background: String,
    #[serde(default = "HypothesesBody::default_count")]
    pub count: usize,
}

impl HypothesesBody {
    fn default_count() -> usize {
        3
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HypothesesResponse {
    pub hypotheses: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LetterBody {
    #[schema(value_type = String, example = "support")]
    pub kind: LetterKind,
    pub details: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RewriteBody {
    pub text: String,
    #[schema(value_type = String, example = "concise")]
    pub goal: RewriteGoal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NarrativeBody {
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TextResponse {
    pub text: String,
}

#[utoipa::path(
    post,
    path = "/api/ai-critique",
    tag = "ai",
    request_body = CritiqueBody,
    responses(
        (status = 200, description = "Reviewer critique, or the fallback critique when the provider fails", body = serde_json::Value),
        (status = 429, description = "AI rate limit exceeded"),
        (status = 503, description = "No LLM provider configured")
    )
)]
pub async fn critique(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<CritiqueBody>,
) -> ApiResult<Json<Critique>> {
    let text = require_text("text", &body.text)?;
    let service = state.critique_service()?;
    let mechanism = body.mechanism.unwrap_or(MechanismId::R01);
    Ok(Json(service.critique(text, body.section_type, mechanism).await))
}

#[utoipa::path(
    post,
    path = "/api/ai-critique/bulk",
    tag = "ai",
    request_body = BulkCritiqueBody,
    responses((status = 200, description = "One critique per section, in order", body = serde_json::Value))
)]
pub async fn critique_bulk(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<BulkCritiqueBody>,
) -> ApiResult<Json<BulkCritiqueResponse>> {
    let (mechanism, items) = match (body.application_id, body.sections) {
        (Some(id), _) => {
            let app = state.store.get(user.id(), id).await?;
            let items: Vec<CritiqueRequest> = app
                .sections
                .iter()
                .map(|s| CritiqueRequest {
                    section_type: s.section_type,
                    text: s.plain_text(),
                })
                .filter(|item| !item.text.trim().is_empty())
                .collect();
            (body.mechanism.unwrap_or(app.mechanism), items)
        }
        (None, Some(sections)) => (
            body.mechanism.unwrap_or(MechanismId::R01),
            sections
                .into_iter()
                .filter(|item| !item.text.trim().is_empty())
                .collect(),
        ),
        (None, None) => {
            return Err(ApiError::Validation(
                "either application_id or sections is required".to_string(),
            ))
        }
    };
    if items.is_empty() {
        return Err(ApiError::Validation("there are no non-empty sections to critique".to_string()));
    }

    let service = state.critique_service()?;
    let critiques = service.critique_many(&items, mechanism).await;
    info!(
        sections = items.len(),
        fallbacks = critiques.iter().filter(|c| c.fallback).count(),
        "bulk critique finished"
    );

    Ok(Json(BulkCritiqueResponse {
        mechanism,
        critiques: items
            .iter()
            .zip(critiques)
            .map(|(item, critique)| SectionCritique {
                section_type: item.section_type,
                critique,
            })
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/ai/hypotheses",
    tag = "ai",
    request_body = HypothesesBody,
    responses(
        (status = 200, description = "Candidate hypotheses", body = HypothesesResponse),
        (status = 502, description = "Provider failure")
    )
)]
pub async fn hypotheses(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<HypothesesBody>,
) -> ApiResult<Json<HypothesesResponse>> {
    let topic = require_text("topic", &body.topic)?;
    let hypotheses = state
        .writing_service()?
        .generate_hypotheses(topic, &body.background, body.count)
        .await
        .map_err(upstream)?;
    Ok(Json(HypothesesResponse { hypotheses }))
}

#[utoipa::path(
    post,
    path = "/api/ai/letter",
    tag = "ai",
    request_body = LetterBody,
    responses((status = 200, description = "Letter draft", body = TextResponse))
)]
pub async fn letter(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<LetterBody>,
) -> ApiResult<Json<TextResponse>> {
    let details = require_text("details", &body.details)?;
    let text = state
        .writing_service()?
        .draft_letter(body.kind, details)
        .await
        .map_err(upstream)?;
    Ok(Json(TextResponse { text }))
}

#[utoipa::path(
    post,
    path = "/api/ai/rewrite",
    tag = "ai",
    request_body = RewriteBody,
    responses((status = 200, description = "Rewritten text", body = TextResponse))
)]
pub async fn rewrite(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<RewriteBody>,
) -> ApiResult<Json<TextResponse>> {
    let text = require_text("text", &body.text)?;
    let text = state
        .writing_service()?
        .rewrite(text, body.goal)
        .await
        .map_err(upstream)?;
    Ok(Json(TextResponse { text }))
}

#[utoipa::path(
    post,
    path = "/api/ai/narrative",
    tag = "ai",
    request_body = NarrativeBody,
    responses((status = 200, description = "Project Narrative draft", body = TextResponse))
)]
pub async fn narrative(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<NarrativeBody>,
) -> ApiResult<Json<TextResponse>> {
    let text = require_text("text", &body.text)?;
    let text = state
        .writing_service()?
        .summarize_for_public(text)
        .await
        .map_err(upstream)?;
    Ok(Json(TextResponse { text }))
}
