use crate::{handlers, ApiError, AppState};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use http::{HeaderValue, StatusCode};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Oversized bodies are reported as a client error like any other bad upload.
async fn oversized_as_bad_request(response: Response) -> Response {
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::BadRequest("request body exceeds the upload limit".to_string()).into_response();
    }
    response
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.settings.server.max_upload_bytes;
    let cors = cors_layer(&state.settings.security.allowed_origins);

    Router::new()
        // System
        .route("/health", get(handlers::health::health))
        .route("/api/openapi.json", get(handlers::health::openapi))

        // Rule tables
        .route("/api/mechanisms", get(handlers::mechanisms::list_mechanisms))
        .route("/api/mechanisms/{id}", get(handlers::mechanisms::get_mechanism))

        // Budget
        .route("/api/budget/calculate", post(handlers::budget::calculate))
        .route("/api/budget/export", post(handlers::budget::export_budget))

        // Applications
        .route(
            "/api/applications",
            get(handlers::applications::list_applications)
                .post(handlers::applications::create_application),
        )
        .route(
            "/api/applications/{id}",
            get(handlers::applications::get_application)
                .put(handlers::applications::update_application)
                .delete(handlers::applications::delete_application),
        )
        .route(
            "/api/applications/{id}/sections/{section_type}",
            put(handlers::applications::upsert_section)
                .delete(handlers::applications::delete_section),
        )
        .route("/api/applications/{id}/architecture", put(handlers::applications::put_architecture))
        .route("/api/applications/{id}/budget", put(handlers::applications::put_budget))
        .route("/api/applications/{id}/attachments", post(handlers::applications::add_attachment))
        .route("/api/applications/{id}/references", post(handlers::applications::add_reference))
        .route(
            "/api/applications/{id}/references/verify",
            post(handlers::applications::verify_references),
        )
        .route("/api/applications/{id}/compliance", get(handlers::applications::get_compliance))
        .route("/api/applications/{id}/score", get(handlers::applications::get_score))
        .route("/api/applications/{id}/risk", get(handlers::applications::get_risk))
        .route("/api/applications/{id}/export-gate", get(handlers::applications::get_export_gate))
        .route("/api/applications/{id}/export", get(handlers::applications::export_application))

        // Ad-hoc analysis
        .route("/api/compliance/check", post(handlers::analysis::check_compliance))
        .route("/api/scoring/section", post(handlers::analysis::score_section))
        .route("/api/architecture/analyze", post(handlers::analysis::analyze_architecture))

        // Document review
        .route("/api/review/analyze", post(handlers::review::analyze))
        .route("/api/review/export", post(handlers::review::export_review))

        // AI (rate limited)
        .route("/api/ai-critique", post(handlers::ai::critique))
        .route("/api/ai-critique/bulk", post(handlers::ai::critique_bulk))
        .route("/api/ai/hypotheses", post(handlers::ai::hypotheses))
        .route("/api/ai/letter", post(handlers::ai::letter))
        .route("/api/ai/rewrite", post(handlers::ai::rewrite))
        .route("/api/ai/narrative", post(handlers::ai::narrative))

        // Integrations
        .route("/api/references/verify", post(handlers::references::verify_citation))
        .route("/api/grants/search", get(handlers::grants::search_grants))

        .with_state(state)

        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::map_response(oversized_as_bad_request)),
        )
}
