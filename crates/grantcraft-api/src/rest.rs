use utoipa::OpenApi;

use crate::clients::GrantListing;
use crate::handlers::{ai, analysis, applications, budget, grants, health, mechanisms, references, review};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        mechanisms::list_mechanisms,
        mechanisms::get_mechanism,
        budget::calculate,
        budget::export_budget,
        applications::list_applications,
        applications::create_application,
        applications::get_application,
        applications::update_application,
        applications::delete_application,
        applications::upsert_section,
        applications::delete_section,
        applications::put_architecture,
        applications::put_budget,
        applications::add_attachment,
        applications::add_reference,
        applications::verify_references,
        applications::get_compliance,
        applications::get_score,
        applications::get_risk,
        applications::get_export_gate,
        applications::export_application,
        analysis::check_compliance,
        analysis::score_section,
        analysis::analyze_architecture,
        review::analyze,
        review::export_review,
        ai::critique,
        ai::critique_bulk,
        ai::hypotheses,
        ai::letter,
        ai::rewrite,
        ai::narrative,
        references::verify_citation,
        grants::search_grants,
    ),
    components(
        schemas(
            health::HealthResponse,
            applications::CreateApplication,
            applications::UpdateApplication,
            applications::SectionContent,
            applications::NewAttachment,
            applications::NewReference,
            applications::ApplicationSummary,
            analysis::SectionCheckRequest,
            analysis::SectionCheckResponse,
            review::ReviewTextRequest,
            ai::CritiqueBody,
            ai::BulkCritiqueBody,
            ai::HypothesesBody,
            ai::HypothesesResponse,
            ai::LetterBody,
            ai::RewriteBody,
            ai::NarrativeBody,
            ai::TextResponse,
            references::VerifyCitation,
            grants::GrantSearchResponse,
            GrantListing,
        )
    ),
    tags(
        (name = "system", description = "Health and API description"),
        (name = "mechanisms", description = "NIH/SBIR/STTR rule tables"),
        (name = "budget", description = "Budget calculation and export"),
        (name = "applications", description = "Application records"),
        (name = "analysis", description = "Ad-hoc compliance, scoring and risk checks"),
        (name = "review", description = "Finished-document review"),
        (name = "ai", description = "LLM-assisted critique and writing"),
        (name = "references", description = "Citation verification"),
        (name = "grants", description = "Funding opportunity search")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/applications/{id}",
            "/api/applications/{id}/sections/{section_type}",
            "/api/applications/{id}/budget",
            "/api/applications/{id}/references/verify",
            "/api/applications/{id}/export-gate",
            "/api/review/analyze",
            "/api/grants/search",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
