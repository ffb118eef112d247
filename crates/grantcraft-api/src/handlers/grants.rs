use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use super::require_text;
use crate::clients::GrantListing;
use crate::{ApiError, ApiResult, AppState};

pub const DEFAULT_ROWS: u32 = 25;
pub const MAX_ROWS: u32 = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct GrantSearchQuery {
    /// Keyword(s) to search for.
    #[serde(default)]
    pub q: String,
    /// 1..=100, default 25.
    pub rows: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GrantSearchResponse {
    pub query: String,
    pub hits: Vec<GrantListing>,
}

#[utoipa::path(
    get,
    path = "/api/grants/search",
    tag = "grants",
    params(GrantSearchQuery),
    responses(
        (status = 200, description = "Matching funding opportunities", body = GrantSearchResponse),
        (status = 400, description = "Empty query"),
        (status = 502, description = "Grants.gov request failed")
    )
)]
pub async fn search_grants(
    State(state): State<AppState>,
    Query(query): Query<GrantSearchQuery>,
) -> ApiResult<Json<GrantSearchResponse>> {
    let keyword = require_text("q", &query.q)?;
    let rows = query.rows.unwrap_or(DEFAULT_ROWS).clamp(1, MAX_ROWS);
    let hits = state.grants.search(keyword, rows).await.map_err(|e| {
        error!("grant search failed: {:#}", e);
        ApiError::Upstream("grant search failed".to_string())
    })?;
    Ok(Json(GrantSearchResponse {
        query: keyword.to_string(),
        hits,
    }))
}
