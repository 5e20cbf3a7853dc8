//! # Logistician Dashboard
//!
//! One endpoint running the full query layer over the repository list:
//! free-text search, status and date-range filters, sorting, and the
//! self-correcting fixed-size pagination. The query semantics live in
//! `quai_core::query`; this route only feeds it.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use quai_core::query::{self, DashboardPage, DashboardParams};

use crate::state::AppState;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

/// GET /dashboard — Filtered, sorted, paginated accreditation list.
///
/// When the requested page is out of range the response carries the
/// clamped page and `redirected: true`; clients re-issue the request
/// with the corrected page parameter.
#[utoipa::path(
    get,
    path = "/dashboard",
    params(
        ("q" = Option<String>, Query, description = "Free-text search: id, first plate, status label, localized creation date"),
        ("status" = Option<String>, Query, description = "Exact status filter; empty or 'all' disables it"),
        ("from" = Option<String>, Query, description = "Range start, YYYY-MM-DD, inclusive"),
        ("to" = Option<String>, Query, description = "Range end, YYYY-MM-DD, inclusive"),
        ("sort" = Option<String>, Query, description = "Sort key; unknown values fall back to createdAt"),
        ("dir" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<usize>, Query, description = "1-based page number"),
        ("sel" = Option<Uuid>, Query, description = "Explicit selection for the side panel"),
    ),
    responses(
        (status = 200, description = "One dashboard page", body = DashboardPage),
    ),
    tag = "dashboard"
)]
pub(crate) async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Json<DashboardPage> {
    Json(query::run(&params, &state.repo.list_all()))
}
