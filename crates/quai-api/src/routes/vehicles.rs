//! # Vehicle Child Operations
//!
//! Add/patch/remove single vehicles and the destructive replace-all.
//! Replacement regenerates vehicle ids; clients must re-read the record
//! instead of holding on to old ones.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use quai_core::{Accreditation, NewVehicle, UnloadingSide, Vehicle, VehicleSize};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::repo::VehiclePatch;
use crate::state::AppState;

/// Replace the whole vehicle set of an accreditation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceVehiclesRequest {
    pub vehicles: Vec<NewVehicle>,
}

impl Validate for ReplaceVehiclesRequest {
    fn validate(&self) -> Result<(), String> {
        if self.vehicles.is_empty() {
            return Err("at least one vehicle is required".to_string());
        }
        Ok(())
    }
}

/// Field-level vehicle patch. Absent fields stay untouched.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateVehicleRequest {
    pub plate: Option<String>,
    pub size: Option<VehicleSize>,
    pub phone_code: Option<String>,
    pub phone_number: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub city: Option<String>,
    pub unloading: Option<Vec<UnloadingSide>>,
    pub kms: Option<String>,
}

impl Validate for UpdateVehicleRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(plate) = &self.plate {
            if plate.trim().is_empty() {
                return Err("plate must not be blank".to_string());
            }
        }
        Ok(())
    }
}

/// Build the vehicles router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/accreditations/:id/vehicles",
            post(add_vehicle).put(replace_vehicles),
        )
        .route(
            "/vehicles/:id",
            delete(delete_vehicle).patch(update_vehicle),
        )
}

/// POST /accreditations/:id/vehicles — Append a vehicle.
#[utoipa::path(
    post,
    path = "/accreditations/{id}/vehicles",
    params(("id" = Uuid, Path, description = "Accreditation ID")),
    request_body = NewVehicle,
    responses(
        (status = 201, description = "Vehicle added", body = Vehicle),
        (status = 400, description = "Validation failure", body = crate::error::ErrorBody),
        (status = 404, description = "Accreditation not found", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
pub(crate) async fn add_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<NewVehicle>, JsonRejection>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    let Json(new) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let vehicle = state.repo.add_vehicle(id, new).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// PUT /accreditations/:id/vehicles — Replace every vehicle.
///
/// Delete-all-then-recreate with fresh ids, recorded as one bulk
/// history entry.
#[utoipa::path(
    put,
    path = "/accreditations/{id}/vehicles",
    params(("id" = Uuid, Path, description = "Accreditation ID")),
    request_body = ReplaceVehiclesRequest,
    responses(
        (status = 200, description = "Vehicle set replaced", body = Accreditation),
        (status = 400, description = "Validation failure", body = crate::error::ErrorBody),
        (status = 404, description = "Accreditation not found", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
pub(crate) async fn replace_vehicles(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<ReplaceVehiclesRequest>, JsonRejection>,
) -> Result<Json<Accreditation>, AppError> {
    let req = extract_validated_json(body)?;
    let record = state.repo.replace_vehicles(id, req.vehicles).await?;
    Ok(Json(record))
}

/// PATCH /vehicles/:id — Patch one vehicle.
#[utoipa::path(
    patch,
    path = "/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = UpdateVehicleRequest,
    responses(
        (status = 200, description = "Updated vehicle", body = Vehicle),
        (status = 404, description = "Vehicle not found", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
pub(crate) async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateVehicleRequest>, JsonRejection>,
) -> Result<Json<Vehicle>, AppError> {
    let req = extract_validated_json(body)?;
    let patch = VehiclePatch {
        plate: req.plate,
        size: req.size,
        phone_code: req.phone_code,
        phone_number: req.phone_number,
        date: req.date,
        time: req.time,
        city: req.city,
        unloading: req.unloading,
        kms: req.kms,
    };
    let vehicle = state.repo.update_vehicle(id, patch).await?;
    Ok(Json(vehicle))
}

/// DELETE /vehicles/:id — Remove one vehicle.
///
/// The last vehicle of an accreditation cannot be removed.
#[utoipa::path(
    delete,
    path = "/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 204, description = "Vehicle removed"),
        (status = 404, description = "Vehicle not found", body = crate::error::ErrorBody),
        (status = 409, description = "Last vehicle cannot be removed", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
pub(crate) async fn delete_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_vehicle(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
