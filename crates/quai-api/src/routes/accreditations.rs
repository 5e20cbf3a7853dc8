//! # Accreditation CRUD, Status Lifecycle, History & Email Dispatch
//!
//! The accreditation routes: create/list/get/patch/delete, the audit
//! trail, the dispatch log, and credential email sending. Vehicle child
//! operations live in [`super::vehicles`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use quai_core::{
    Accreditation, EmailRecord, EventKey, HistoryAction, HistoryEntry, NewAccreditation, Status,
    UnloadingProvider,
};
use quai_pdf::CredentialPayload;

use crate::email::MailError;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::repo::AccreditationPatch;
use crate::state::AppState;

/// Request to create an accreditation.
///
/// The public form omits `status` and gets `ATTENTE`; the logistician
/// intake passes `NOUVEAU`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAccreditationRequest {
    #[serde(flatten)]
    pub submission: NewAccreditation,
    #[serde(default)]
    pub status: Option<Status>,
}

impl Validate for CreateAccreditationRequest {
    fn validate(&self) -> Result<(), String> {
        NewAccreditation::validate(&self.submission).map_err(|e| e.to_string())?;
        match self.status {
            None | Some(Status::Attente) | Some(Status::Nouveau) => Ok(()),
            Some(other) => Err(format!(
                "an accreditation cannot be created directly in status {}",
                other.as_str()
            )),
        }
    }
}

/// Field/status patch. Absent fields stay untouched; vehicles are never
/// patched here (see `PUT /accreditations/{id}/vehicles`).
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateAccreditationRequest {
    pub company: Option<String>,
    pub stand: Option<String>,
    pub unloading: Option<UnloadingProvider>,
    pub event: Option<EventKey>,
    pub message: Option<String>,
    pub email: Option<String>,
    /// Target status; unknown spellings fail deserialization (400).
    pub status: Option<Status>,
    /// Operator confirmation required for the transition into ENTREE.
    #[serde(default)]
    pub confirm_entry: bool,
}

impl Validate for UpdateAccreditationRequest {
    fn validate(&self) -> Result<(), String> {
        for (field, value) in [("company", &self.company), ("stand", &self.stand)] {
            if let Some(value) = value {
                if value.trim().is_empty() {
                    return Err(format!("{field} must not be blank"));
                }
            }
        }
        Ok(())
    }
}

/// Manual audit entry, appended by the logistician console.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AppendHistoryRequest {
    pub action: HistoryAction,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
    pub description: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Validate for AppendHistoryRequest {
    fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("description must not be blank".to_string());
        }
        Ok(())
    }
}

/// Credential dispatch request. The explicit address wins over the one
/// stored on the record.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SendEmailRequest {
    #[serde(default)]
    pub email: Option<String>,
}

impl Validate for SendEmailRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Build the accreditations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/accreditations",
            get(list_accreditations).post(create_accreditation),
        )
        .route(
            "/accreditations/:id",
            get(get_accreditation)
                .patch(update_accreditation)
                .delete(delete_accreditation),
        )
        .route(
            "/accreditations/:id/history",
            get(get_history).post(append_history),
        )
        .route("/accreditations/:id/emails", get(get_emails))
        .route("/accreditations/:id/send", post(send_credential))
        .route("/accreditations/:id/pdf", get(download_credential))
}

/// POST /accreditations — Create an accreditation.
#[utoipa::path(
    post,
    path = "/accreditations",
    request_body = CreateAccreditationRequest,
    responses(
        (status = 201, description = "Accreditation created", body = Accreditation),
        (status = 400, description = "Validation failure", body = crate::error::ErrorBody),
    ),
    tag = "accreditations"
)]
pub(crate) async fn create_accreditation(
    State(state): State<AppState>,
    body: Result<Json<CreateAccreditationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Accreditation>), AppError> {
    let req = extract_validated_json(body)?;
    let status = req.status.unwrap_or(Status::Attente);
    let record = state.repo.create(req.submission, status).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /accreditations — Full unfiltered list, newest first.
#[utoipa::path(
    get,
    path = "/accreditations",
    responses(
        (status = 200, description = "All accreditations", body = Vec<Accreditation>),
    ),
    tag = "accreditations"
)]
pub(crate) async fn list_accreditations(State(state): State<AppState>) -> Json<Vec<Accreditation>> {
    Json(state.repo.list_all())
}

/// GET /accreditations/:id — One accreditation.
#[utoipa::path(
    get,
    path = "/accreditations/{id}",
    params(("id" = Uuid, Path, description = "Accreditation ID")),
    responses(
        (status = 200, description = "Accreditation found", body = Accreditation),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "accreditations"
)]
pub(crate) async fn get_accreditation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Accreditation>, AppError> {
    state
        .repo
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("accreditation {id} not found")))
}

/// PATCH /accreditations/:id — Patch fields and/or transition status.
///
/// Status changes go through the lifecycle state machine: illegal moves
/// return 409 with a diagnostic, the transition into ENTREE additionally
/// requires `confirm_entry: true`. Entry/exit timestamps are stamped on
/// the first transition into ENTREE/SORTIE and never overwritten.
#[utoipa::path(
    patch,
    path = "/accreditations/{id}",
    params(("id" = Uuid, Path, description = "Accreditation ID")),
    request_body = UpdateAccreditationRequest,
    responses(
        (status = 200, description = "Updated accreditation", body = Accreditation),
        (status = 400, description = "Invalid payload", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Illegal status transition", body = crate::error::ErrorBody),
    ),
    tag = "accreditations"
)]
pub(crate) async fn update_accreditation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateAccreditationRequest>, JsonRejection>,
) -> Result<Json<Accreditation>, AppError> {
    let req = extract_validated_json(body)?;
    let patch = AccreditationPatch {
        company: req.company,
        stand: req.stand,
        unloading: req.unloading,
        event: req.event,
        message: req.message,
        email: req.email,
        status: req.status,
        confirm_entry: req.confirm_entry,
    };
    let record = state.repo.update(id, patch).await?;
    Ok(Json(record))
}

/// DELETE /accreditations/:id — Delete an accreditation.
///
/// Vehicles go with it; the audit trail stays.
#[utoipa::path(
    delete,
    path = "/accreditations/{id}",
    params(("id" = Uuid, Path, description = "Accreditation ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "accreditations"
)]
pub(crate) async fn delete_accreditation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /accreditations/:id/history — Audit trail, newest first.
///
/// Served even after the accreditation itself was deleted.
#[utoipa::path(
    get,
    path = "/accreditations/{id}/history",
    params(("id" = Uuid, Path, description = "Accreditation ID")),
    responses(
        (status = 200, description = "Audit trail", body = Vec<HistoryEntry>),
    ),
    tag = "history"
)]
pub(crate) async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Json<Vec<HistoryEntry>> {
    Json(state.repo.history_for(id))
}

/// POST /accreditations/:id/history — Append a manual audit entry.
#[utoipa::path(
    post,
    path = "/accreditations/{id}/history",
    params(("id" = Uuid, Path, description = "Accreditation ID")),
    request_body = AppendHistoryRequest,
    responses(
        (status = 201, description = "Entry appended", body = HistoryEntry),
        (status = 404, description = "Accreditation not found", body = crate::error::ErrorBody),
    ),
    tag = "history"
)]
pub(crate) async fn append_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<AppendHistoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<HistoryEntry>), AppError> {
    let req = extract_validated_json(body)?;
    if state.repo.get(id).is_none() {
        return Err(AppError::NotFound(format!("accreditation {id} not found")));
    }

    let entry = HistoryEntry {
        id: Uuid::new_v4(),
        accreditation_id: id,
        action: req.action,
        field: req.field,
        old_value: req.old_value,
        new_value: req.new_value,
        description: req.description,
        created_at: Utc::now(),
        user_id: req.user_id,
    };
    state.repo.append_history(entry.clone()).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /accreditations/:id/emails — Dispatch log, newest first.
#[utoipa::path(
    get,
    path = "/accreditations/{id}/emails",
    params(("id" = Uuid, Path, description = "Accreditation ID")),
    responses(
        (status = 200, description = "Dispatch log", body = Vec<EmailRecord>),
    ),
    tag = "emails"
)]
pub(crate) async fn get_emails(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Json<Vec<EmailRecord>> {
    Json(state.repo.emails_for(id))
}

/// POST /accreditations/:id/send — Render the credential and email it.
///
/// Recipient resolution: explicit body address, else the address stored
/// on the record, else 400. Without a configured mailer the route is a
/// 503. A dispatch failure leaves the record untouched; nothing rolls
/// back.
#[utoipa::path(
    post,
    path = "/accreditations/{id}/send",
    params(("id" = Uuid, Path, description = "Accreditation ID")),
    request_body = SendEmailRequest,
    responses(
        (status = 200, description = "Credential dispatched", body = Accreditation),
        (status = 400, description = "No resolvable recipient", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 503, description = "Mailer not configured", body = crate::error::ErrorBody),
    ),
    tag = "emails"
)]
pub(crate) async fn send_credential(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<SendEmailRequest>, JsonRejection>,
) -> Result<Json<Accreditation>, AppError> {
    let req = extract_validated_json(body)?;
    let record = state
        .repo
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("accreditation {id} not found")))?;

    let recipient = req
        .email
        .or_else(|| record.email.clone())
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| {
            AppError::Validation("no recipient address on the request or the record".to_string())
        })?;

    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("email dispatch not configured".to_string()))?;

    let pdf = quai_pdf::render_credential(&CredentialPayload::from(&record))?;
    mailer
        .send_credential(&recipient, pdf)
        .await
        .map_err(|err| match err {
            MailError::Address(err) => AppError::Validation(format!("invalid recipient: {err}")),
            other => AppError::Internal(format!("email dispatch failed: {other}")),
        })?;

    let updated = state.repo.record_email(id, &recipient).await?;
    Ok(Json(updated))
}

/// GET /accreditations/:id/pdf — Download the stored record's credential.
#[utoipa::path(
    get,
    path = "/accreditations/{id}/pdf",
    params(("id" = Uuid, Path, description = "Accreditation ID")),
    responses(
        (status = 200, description = "Credential PDF", content_type = "application/pdf"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "pdf"
)]
pub(crate) async fn download_credential(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let record = state
        .repo
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("accreditation {id} not found")))?;
    let pdf = quai_pdf::render_credential(&CredentialPayload::from(&record))?;
    Ok(super::pdf::pdf_response(pdf))
}
