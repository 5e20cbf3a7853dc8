//! # Accreditation & Vehicle Records
//!
//! The accreditation is the root aggregate: it owns its vehicles
//! (cascade delete) and carries the lifecycle status plus the
//! write-once entry/exit timestamps.
//!
//! ## The `unloading` shape drift
//!
//! Across revisions of the system the vehicle `unloading` field was
//! stored as a single enum string (`"lat"` / `"rear"`, with the legacy
//! `"arr"` spelling), as a JSON array, and as a JSON-encoded string of
//! an array. [`normalize_unloading`] collapses all of those into one
//! tagged representation, `Vec<UnloadingSide>`, and must be applied on
//! every read from persistent storage so the ambiguity never leaks past
//! the repository layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::status::{check_transition, Status, TransitionError, TransitionOutcome};

/// Who unloads the vehicle at the dock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum UnloadingProvider {
    /// Venue staff.
    #[serde(rename = "Palais")]
    Palais,
    /// The on-site handling contractor.
    #[serde(rename = "SVMM")]
    Svmm,
    /// The exhibitor unloads on their own.
    #[serde(rename = "Autonome")]
    Autonome,
}

impl UnloadingProvider {
    /// Wire spelling, also the display form (uppercased on the PDF).
    pub fn as_str(self) -> &'static str {
        match self {
            UnloadingProvider::Palais => "Palais",
            UnloadingProvider::Svmm => "SVMM",
            UnloadingProvider::Autonome => "Autonome",
        }
    }
}

/// Which event the accreditation is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventKey {
    Festival,
    Miptv,
    Mipcom,
}

impl EventKey {
    /// Wire spelling (`"festival"`, …).
    pub fn as_str(self) -> &'static str {
        match self {
            EventKey::Festival => "festival",
            EventKey::Miptv => "miptv",
            EventKey::Mipcom => "mipcom",
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            EventKey::Festival => "Festival du Film",
            EventKey::Miptv => "MIPTV",
            EventKey::Mipcom => "MIPCOM",
        }
    }
}

/// Vehicle capacity band in cubic metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum VehicleSize {
    #[serde(rename = "-10")]
    Under10,
    #[serde(rename = "10-14")]
    From10To14,
    #[serde(rename = "15-20")]
    From15To20,
    #[serde(rename = "+20")]
    Over20,
}

impl VehicleSize {
    /// Wire spelling, also the display form.
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleSize::Under10 => "-10",
            VehicleSize::From10To14 => "10-14",
            VehicleSize::From15To20 => "15-20",
            VehicleSize::Over20 => "+20",
        }
    }
}

/// Side of the vehicle used for unloading. The historical mobile form
/// wrote `"arr"` for the rear side; the alias keeps those drafts and
/// rows readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UnloadingSide {
    /// Lateral (side) unloading.
    Lat,
    /// Rear unloading.
    #[serde(alias = "arr")]
    Rear,
}

impl UnloadingSide {
    /// Wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            UnloadingSide::Lat => "lat",
            UnloadingSide::Rear => "rear",
        }
    }

    /// Display label for the PDF credential.
    pub fn label(self) -> &'static str {
        match self {
            UnloadingSide::Lat => "Latéral",
            UnloadingSide::Rear => "Arrière",
        }
    }

    /// Parse a stored spelling, accepting the legacy `"arr"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lat" => Some(UnloadingSide::Lat),
            "rear" | "arr" => Some(UnloadingSide::Rear),
            _ => None,
        }
    }
}

/// Normalize any historical shape of the `unloading` field into the
/// canonical side set.
///
/// - JSON array → element-wise parse (unknown spellings are dropped
///   with a warning);
/// - string starting with `[` → parse as JSON, then recurse;
/// - plain non-empty string → single-element set;
/// - anything else (empty, null, numbers, …) → empty set.
pub fn normalize_unloading(value: &serde_json::Value) -> Vec<UnloadingSide> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| match item.as_str() {
                Some(s) => {
                    let side = UnloadingSide::parse(s);
                    if side.is_none() {
                        tracing::warn!(raw = s, "dropping unknown unloading side");
                    }
                    side
                }
                None => None,
            })
            .collect(),
        serde_json::Value::String(s) => normalize_unloading_text(s),
        _ => Vec::new(),
    }
}

/// Normalize the stored-text form of the `unloading` field (the storage
/// layer kept it as a TEXT column, sometimes JSON-encoded).
pub fn normalize_unloading_text(raw: &str) -> Vec<UnloadingSide> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.starts_with('[') {
        return match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => normalize_unloading(&value),
            Err(_) => {
                tracing::warn!(raw = trimmed, "unparseable unloading column, treating as empty");
                Vec::new()
            }
        };
    }
    UnloadingSide::parse(trimmed).into_iter().collect()
}

/// One vehicle on an accreditation. Owned by exactly one accreditation;
/// deleting the parent deletes the vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Vehicle {
    /// Unique vehicle identifier. Regenerated on a replace-all.
    pub id: Uuid,
    /// Licence plate as typed by the driver.
    pub plate: String,
    /// Capacity band.
    pub size: VehicleSize,
    /// International dialing prefix (e.g. `"+33"`).
    pub phone_code: String,
    /// Driver phone number without the prefix.
    pub phone_number: String,
    /// Planned arrival date, `YYYY-MM-DD` as entered in the form.
    pub date: String,
    /// Planned arrival time, `HH:MM` as entered in the form.
    pub time: String,
    /// Departure city.
    pub city: String,
    /// Unloading sides, normalized. Non-empty for a valid vehicle.
    pub unloading: Vec<UnloadingSide>,
    /// Distance driven, free text, optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms: Option<String>,
}

/// One accreditation request tracked through its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Accreditation {
    /// Opaque unique identifier, assigned at creation, immutable.
    pub id: Uuid,
    /// Creation timestamp, immutable.
    pub created_at: DateTime<Utc>,
    /// Company name.
    pub company: String,
    /// Stand served inside the venue.
    pub stand: String,
    /// Who unloads at the dock.
    pub unloading: UnloadingProvider,
    /// Event the accreditation is for.
    pub event: EventKey,
    /// Free-text intervention message. May be empty.
    pub message: String,
    /// Privacy-policy consent. Required true for public submission.
    pub consent: bool,
    /// Lifecycle status.
    pub status: Status,
    /// Set once on the first transition into `ENTREE`, never overwritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_at: Option<DateTime<Utc>>,
    /// Set once on the first transition into `SORTIE`, never overwritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_at: Option<DateTime<Utc>>,
    /// Address the credential was last sent to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// When the credential email was last dispatched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    /// Owned vehicles, in submission order. Never empty after creation.
    pub vehicles: Vec<Vehicle>,
}

impl Accreditation {
    /// Apply a status transition, enforcing the state machine and the
    /// write-once timestamp side effects.
    ///
    /// A same-status call is a no-op that reports `changed: false` so
    /// callers can skip the STATUS_CHANGED history entry.
    ///
    /// # Errors
    ///
    /// Propagates [`TransitionError`] from
    /// [`check_transition`](crate::status::check_transition); the record
    /// is untouched on error.
    pub fn transition_to(
        &mut self,
        to: Status,
        confirmed: bool,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, TransitionError> {
        check_transition(self.status, to, confirmed)?;
        if self.status == to {
            return Ok(TransitionOutcome::default());
        }
        let mut outcome = TransitionOutcome {
            changed: true,
            ..TransitionOutcome::default()
        };
        if to == Status::Entree && self.entry_at.is_none() {
            self.entry_at = Some(now);
            outcome.entry_set = true;
        }
        if to == Status::Sortie && self.exit_at.is_none() {
            self.exit_at = Some(now);
            outcome.exit_set = true;
        }
        self.status = to;
        Ok(outcome)
    }
}

/// Payload for creating a vehicle (no id yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewVehicle {
    pub plate: String,
    pub size: VehicleSize,
    pub phone_code: String,
    pub phone_number: String,
    pub date: String,
    pub time: String,
    pub city: String,
    pub unloading: Vec<UnloadingSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms: Option<String>,
}

impl NewVehicle {
    /// Check the required fields, reporting the vehicle's position in
    /// the payload on failure.
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        for (field, value) in [
            ("plate", &self.plate),
            ("phone_code", &self.phone_code),
            ("phone_number", &self.phone_number),
            ("date", &self.date),
            ("time", &self.time),
            ("city", &self.city),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingVehicleField { index, field });
            }
        }
        if self.unloading.is_empty() {
            return Err(ValidationError::NoUnloadingSide { index });
        }
        Ok(())
    }

    /// Materialize the vehicle with a fresh id.
    pub fn into_vehicle(self) -> Vehicle {
        Vehicle {
            id: Uuid::new_v4(),
            plate: self.plate,
            size: self.size,
            phone_code: self.phone_code,
            phone_number: self.phone_number,
            date: self.date,
            time: self.time,
            city: self.city,
            unloading: self.unloading,
            kms: self.kms,
        }
    }
}

/// Payload for creating an accreditation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewAccreditation {
    pub company: String,
    pub stand: String,
    pub unloading: UnloadingProvider,
    pub event: EventKey,
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_consent")]
    pub consent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub vehicles: Vec<NewVehicle>,
}

fn default_consent() -> bool {
    true
}

impl NewAccreditation {
    /// Validate the identity fields and every vehicle. Rejection means
    /// nothing may be persisted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.company.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "company" });
        }
        if self.stand.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "stand" });
        }
        if self.vehicles.is_empty() {
            return Err(ValidationError::NoVehicles);
        }
        for (index, vehicle) in self.vehicles.iter().enumerate() {
            vehicle.validate(index)?;
        }
        Ok(())
    }

    /// Materialize the record with a fresh id, the given default status
    /// and `now` as the creation timestamp.
    pub fn into_accreditation(self, status: Status, now: DateTime<Utc>) -> Accreditation {
        Accreditation {
            id: Uuid::new_v4(),
            created_at: now,
            company: self.company,
            stand: self.stand,
            unloading: self.unloading,
            event: self.event,
            message: self.message,
            consent: self.consent,
            status,
            entry_at: None,
            exit_at: None,
            email: self.email,
            sent_at: None,
            vehicles: self.vehicles.into_iter().map(NewVehicle::into_vehicle).collect(),
        }
    }
}
