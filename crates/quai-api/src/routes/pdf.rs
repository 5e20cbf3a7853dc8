//! # Stateless Credential Rendering
//!
//! `POST /accreditation/pdf` renders a credential straight from the
//! request payload without touching the repository, so the public form
//! can offer a download before (or without) persisting anything.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use quai_pdf::CredentialPayload;

use crate::error::AppError;
use crate::state::AppState;

/// Build the PDF router.
pub fn router() -> Router<AppState> {
    Router::new().route("/accreditation/pdf", post(render_credential))
}

/// Wrap PDF bytes in a download response.
pub(crate) fn pdf_response(pdf: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"accreditation.pdf\"",
            ),
        ],
        pdf,
    )
        .into_response()
}

/// POST /accreditation/pdf — Render a credential from the payload.
#[utoipa::path(
    post,
    path = "/accreditation/pdf",
    request_body = CredentialPayload,
    responses(
        (status = 200, description = "Rendered credential", content_type = "application/pdf"),
        (status = 400, description = "Invalid payload", body = crate::error::ErrorBody),
        (status = 500, description = "PDF generation failed", body = crate::error::ErrorBody),
    ),
    tag = "pdf"
)]
pub(crate) async fn render_credential(
    State(_state): State<AppState>,
    body: Result<Json<CredentialPayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let pdf = quai_pdf::render_credential(&payload)?;
    Ok(pdf_response(pdf))
}
