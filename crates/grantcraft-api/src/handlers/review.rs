//! Upload review: a finished document is split into sections, each scored
//! and checked against the mechanism's rules.

use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::header,
    response::Response,
    Json,
};
use grantcraft_core::{export, review, DocumentReview, ExportFormat, MechanismId, SectionReview};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::{download, require_text, FormatQuery};
use crate::{ApiError, ApiResult, AppState, AuthUser};

pub const PDF_ERROR: &str = "could not extract text from PDF";

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewTextRequest {
    pub text: String,
    /// Defaults to R01.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub mechanism: Option<MechanismId>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReviewExportRequest {
    pub sections: Vec<SectionReview>,
}

fn is_pdf(file_name: Option<&str>, content_type: Option<&str>, bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
        || content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"))
        || file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf"))
}

/// Runs the extractor off the async runtime. Malformed files can make the
/// extractor panic, which surfaces here as a join error.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> ApiResult<String> {
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| {
            warn!("PDF extraction aborted: {}", e);
            ApiError::BadRequest(PDF_ERROR.to_string())
        })?;
    match extracted {
        Ok(text) if !text.trim().is_empty() => Ok(text),
        Ok(_) => Err(ApiError::BadRequest(PDF_ERROR.to_string())),
        Err(e) => {
            debug!("PDF extraction failed: {}", e);
            Err(ApiError::BadRequest(PDF_ERROR.to_string()))
        }
    }
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<(String, Option<MechanismId>)> {
    let mut text = None;
    let mut mechanism = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                debug!(size = bytes.len(), file = ?file_name, "review upload received");
                text = Some(if is_pdf(file_name.as_deref(), content_type.as_deref(), &bytes) {
                    extract_pdf_text(bytes.to_vec()).await?
                } else {
                    String::from_utf8(bytes.to_vec()).map_err(|_| {
                        ApiError::BadRequest("uploaded file is neither PDF nor UTF-8 text".to_string())
                    })?
                });
            }
            Some("mechanism") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                mechanism = Some(raw.parse::<MechanismId>()?);
            }
            _ => {}
        }
    }

    let text = text.ok_or_else(|| ApiError::BadRequest("multipart field `file` is required".to_string()))?;
    Ok((text, mechanism))
}

#[utoipa::path(
    post,
    path = "/api/review/analyze",
    tag = "review",
    request_body(content = ReviewTextRequest, description = "JSON text, or multipart/form-data with a `file` (PDF or text) and optional `mechanism`"),
    responses(
        (status = 200, description = "Per-section scores and compliance issues", body = serde_json::Value),
        (status = 400, description = "Unreadable upload")
    )
)]
pub async fn analyze(
    State(state): State<AppState>,
    _user: AuthUser,
    request: Request,
) -> ApiResult<Json<DocumentReview>> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let (text, mechanism) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        read_upload(multipart).await?
    } else {
        let Json(body) = Json::<ReviewTextRequest>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        (body.text, body.mechanism)
    };

    let text = require_text("text", &text)?;
    let mechanism = mechanism.unwrap_or(MechanismId::R01);
    let result = review::review_document(mechanism, text);
    info!(
        mechanism = %mechanism,
        sections = result.sections.len(),
        missing = result.missing_sections.len(),
        "document reviewed"
    );
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/review/export",
    tag = "review",
    params(FormatQuery),
    request_body = serde_json::Value,
    responses((status = 200, description = "Review download"))
)]
pub async fn export_review(
    Query(query): Query<FormatQuery>,
    Json(request): Json<ReviewExportRequest>,
) -> ApiResult<Response> {
    let body = match query.format {
        ExportFormat::Json => export::to_json_pretty(&request)?,
        ExportFormat::Csv => export::review_to_csv(&request.sections)?,
    };
    Ok(download(query.format, "review", body))
}
