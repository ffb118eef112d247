use axum::{extract::Path, Json};
use grantcraft_core::{rules, MechanismId, MechanismRules};

use crate::{ApiError, ApiResult};

#[utoipa::path(
    get,
    path = "/api/mechanisms",
    tag = "mechanisms",
    responses((status = 200, description = "Rule tables of every supported mechanism", body = serde_json::Value))
)]
pub async fn list_mechanisms() -> Json<Vec<&'static MechanismRules>> {
    Json(MechanismId::all().iter().map(|m| rules::rules_for(*m)).collect())
}

#[utoipa::path(
    get,
    path = "/api/mechanisms/{id}",
    tag = "mechanisms",
    params(("id" = String, Path, description = "Mechanism id, e.g. R01 or SBIR_PHASE_1")),
    responses(
        (status = 200, description = "Rule table", body = serde_json::Value),
        (status = 404, description = "Unknown mechanism")
    )
)]
pub async fn get_mechanism(Path(id): Path<String>) -> ApiResult<Json<&'static MechanismRules>> {
    let mechanism: MechanismId = id
        .parse()
        .map_err(|_| ApiError::NotFound(format!("mechanism {}", id)))?;
    Ok(Json(rules::rules_for(mechanism)))
}
