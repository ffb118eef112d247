use axum::{extract::State, Json};
use grantcraft_core::{model::extract_doi, VerificationResult};
use serde::Deserialize;
use tracing::error;
use utoipa::ToSchema;

use super::require_text;
use crate::{ApiError, ApiResult, AppState, AuthUser};

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyCitation {
    pub citation: String,
}

#[utoipa::path(
    post,
    path = "/api/references/verify",
    tag = "references",
    request_body = VerifyCitation,
    responses(
        (status = 200, description = "Crossref match for the citation", body = serde_json::Value),
        (status = 502, description = "Crossref request failed")
    )
)]
pub async fn verify_citation(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<VerifyCitation>,
) -> ApiResult<Json<VerificationResult>> {
    let citation = require_text("citation", &body.citation)?;
    let doi = extract_doi(citation);
    let result = state
        .verifier
        .verify(citation, doi.as_deref())
        .await
        .map_err(|e| {
            error!("reference verification failed: {:#}", e);
            ApiError::Upstream("reference lookup failed".to_string())
        })?;
    Ok(Json(result))
}
