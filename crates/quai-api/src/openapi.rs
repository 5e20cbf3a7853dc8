//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "QUAI — Vehicle Accreditation API",
        version = "0.1.0",
        description = "Vehicle accreditation intake and loading-dock logistics for the Palais des Festivals et des Congrès de Cannes.\n\nProvides:\n- **Accreditation lifecycle**: creation, field patches, and the NOUVEAU/ATTENTE/ENTREE/SORTIE/REFUS/ABSENT status state machine with write-once entry/exit timestamps\n- **Vehicle operations**: add, patch, remove, and destructive replace-all\n- **PDF credential** rendering with QR code, stateless or from a stored record\n- **Email dispatch** of the credential with an append-only dispatch log\n- **Audit history** that survives deletion of its accreditation\n- **Logistician dashboard** with free-text search, filters, sorting, and self-correcting pagination",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Accreditations ───────────────────────────────────────────────
        crate::routes::accreditations::create_accreditation,
        crate::routes::accreditations::list_accreditations,
        crate::routes::accreditations::get_accreditation,
        crate::routes::accreditations::update_accreditation,
        crate::routes::accreditations::delete_accreditation,
        crate::routes::accreditations::get_history,
        crate::routes::accreditations::append_history,
        crate::routes::accreditations::get_emails,
        crate::routes::accreditations::send_credential,
        crate::routes::accreditations::download_credential,
        // ── Vehicles ─────────────────────────────────────────────────────
        crate::routes::vehicles::add_vehicle,
        crate::routes::vehicles::replace_vehicles,
        crate::routes::vehicles::update_vehicle,
        crate::routes::vehicles::delete_vehicle,
        // ── PDF ──────────────────────────────────────────────────────────
        crate::routes::pdf::render_credential,
        // ── Dashboard ────────────────────────────────────────────────────
        crate::routes::dashboard::dashboard,
    ),
    components(schemas(
        quai_core::Accreditation,
        quai_core::Vehicle,
        quai_core::NewAccreditation,
        quai_core::NewVehicle,
        quai_core::Status,
        quai_core::UnloadingProvider,
        quai_core::UnloadingSide,
        quai_core::VehicleSize,
        quai_core::EventKey,
        quai_core::HistoryAction,
        quai_core::HistoryEntry,
        quai_core::EmailRecord,
        quai_core::query::DashboardPage,
        quai_pdf::CredentialPayload,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::accreditations::CreateAccreditationRequest,
        crate::routes::accreditations::UpdateAccreditationRequest,
        crate::routes::accreditations::AppendHistoryRequest,
        crate::routes::accreditations::SendEmailRequest,
        crate::routes::vehicles::ReplaceVehiclesRequest,
        crate::routes::vehicles::UpdateVehicleRequest,
    )),
    tags(
        (name = "accreditations", description = "Accreditation lifecycle"),
        (name = "vehicles", description = "Vehicle child operations"),
        (name = "pdf", description = "Credential rendering"),
        (name = "emails", description = "Credential dispatch"),
        (name = "history", description = "Audit trail"),
        (name = "dashboard", description = "Logistician dashboard"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_spec))
}

/// GET /openapi.json — The assembled spec.
async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
