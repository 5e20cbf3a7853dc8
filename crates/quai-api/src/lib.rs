//! # quai-api — Accreditation HTTP Service
//!
//! Axum service for vehicle accreditation intake and loading-dock
//! logistics at the Palais des Festivals: public submissions, the
//! logistician console (status lifecycle, vehicle edits, audit trail),
//! PDF credential rendering and email dispatch, and the dashboard
//! query layer.
//!
//! ## API Surface
//!
//! | Prefix                        | Module                        | Domain                  |
//! |-------------------------------|-------------------------------|-------------------------|
//! | `/accreditations*`            | [`routes::accreditations`]    | CRUD, status, history, email |
//! | `/accreditations/{id}/vehicles`, `/vehicles/*` | [`routes::vehicles`] | Vehicle child ops |
//! | `/accreditation/pdf`          | [`routes::pdf`]               | Stateless rendering     |
//! | `/dashboard`                  | [`routes::dashboard`]         | Query layer             |
//! | `/openapi.json`               | [`openapi`]                   | Spec                    |
//!
//! ## Persistence
//!
//! In-memory [`repo::Repository`] with optional Postgres write-through:
//! `DATABASE_URL` absent means volatile state, present means every
//! mutation is mirrored and the store is reloaded on startup.
//!
//! ## OpenAPI
//!
//! Auto-generated spec via utoipa derive macros at `/openapi.json`.

pub mod db;
pub mod email;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod repo;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
///
/// Health probes (`/health/*`) stay outside the traced API stack so
/// orchestration polling does not flood the request log.
pub fn app(state: AppState) -> Router {
    // Body size limit: 2 MiB. Nothing legitimate comes close; the
    // largest payload is a multi-vehicle replace.
    let api = Router::new()
        .merge(routes::accreditations::router())
        .merge(routes::vehicles::router())
        .merge(routes::pdf::router())
        .merge(routes::dashboard::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let probes = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new().merge(probes).merge(api)
}

/// Liveness probe — 200 whenever the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the store is reachable and, when
/// configured, that the database answers.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Touch the store; a poisoned shard would surface here.
    let _ = state.repo.list_all().len();

    if let Some(pool) = state.db_pool() {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
