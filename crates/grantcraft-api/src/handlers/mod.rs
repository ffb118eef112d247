pub mod ai;
pub mod analysis;
pub mod applications;
pub mod budget;
pub mod grants;
pub mod health;
pub mod mechanisms;
pub mod references;
pub mod review;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use grantcraft_core::ExportFormat;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{ApiError, ApiResult};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FormatQuery {
    /// `json` (default) or `csv`.
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub format: ExportFormat,
}

/// Wraps an export body in download headers.
pub(crate) fn download(format: ExportFormat, stem: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.{}\"", stem, format.extension()),
            ),
        ],
        body,
    )
        .into_response()
}

pub(crate) fn require_text<'a>(field: &str, value: &'a str) -> ApiResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}
