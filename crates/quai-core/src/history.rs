//! # Audit History
//!
//! Every change to an accreditation leaves an immutable [`HistoryEntry`]
//! behind. Entries are append-only, never mutated or deleted, and they
//! deliberately survive the deletion of their accreditation: the audit
//! trail must outlive the record it describes.
//!
//! The constructors here produce the canonical French descriptions so
//! every writer (HTTP routes, repository, email dispatch) phrases the
//! same event the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::status::Status;

/// What kind of change a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Created,
    StatusChanged,
    VehicleAdded,
    VehicleRemoved,
    VehicleUpdated,
    EmailSent,
    InfoUpdated,
    Deleted,
}

impl HistoryAction {
    /// Wire spelling (`"STATUS_CHANGED"`, …).
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::Created => "CREATED",
            HistoryAction::StatusChanged => "STATUS_CHANGED",
            HistoryAction::VehicleAdded => "VEHICLE_ADDED",
            HistoryAction::VehicleRemoved => "VEHICLE_REMOVED",
            HistoryAction::VehicleUpdated => "VEHICLE_UPDATED",
            HistoryAction::EmailSent => "EMAIL_SENT",
            HistoryAction::InfoUpdated => "INFO_UPDATED",
            HistoryAction::Deleted => "DELETED",
        }
    }

    /// Parse a wire spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(HistoryAction::Created),
            "STATUS_CHANGED" => Some(HistoryAction::StatusChanged),
            "VEHICLE_ADDED" => Some(HistoryAction::VehicleAdded),
            "VEHICLE_REMOVED" => Some(HistoryAction::VehicleRemoved),
            "VEHICLE_UPDATED" => Some(HistoryAction::VehicleUpdated),
            "EMAIL_SENT" => Some(HistoryAction::EmailSent),
            "INFO_UPDATED" => Some(HistoryAction::InfoUpdated),
            "DELETED" => Some(HistoryAction::Deleted),
            _ => None,
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// The accreditation this entry describes. Not an owning reference:
    /// entries survive deletion of the accreditation.
    pub accreditation_id: Uuid,
    /// Kind of change.
    pub action: HistoryAction,
    /// Field name for field-level changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Previous value, human-readable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    /// New value, human-readable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    /// Canonical description of the event.
    pub description: String,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
    /// Operator who triggered the change, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl HistoryEntry {
    fn base(accreditation_id: Uuid, action: HistoryAction, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            accreditation_id,
            action,
            field: None,
            old_value: None,
            new_value: None,
            description,
            created_at: Utc::now(),
            user_id: None,
        }
    }

    /// Record creation of an accreditation.
    pub fn created(accreditation_id: Uuid, user_id: Option<String>) -> Self {
        let mut entry = Self::base(
            accreditation_id,
            HistoryAction::Created,
            "Accréditation créée".to_string(),
        );
        entry.user_id = user_id;
        entry
    }

    /// Record an effective status change.
    pub fn status_changed(accreditation_id: Uuid, old: Status, new: Status) -> Self {
        let mut entry = Self::base(
            accreditation_id,
            HistoryAction::StatusChanged,
            format!("Statut modifié : {} → {}", old.label(), new.label()),
        );
        entry.field = Some("status".to_string());
        entry.old_value = Some(old.as_str().to_string());
        entry.new_value = Some(new.as_str().to_string());
        entry
    }

    /// Record a top-level field update.
    pub fn info_updated(
        accreditation_id: Uuid,
        field: &str,
        old_value: &str,
        new_value: &str,
    ) -> Self {
        let mut entry = Self::base(
            accreditation_id,
            HistoryAction::InfoUpdated,
            format!("Champ {field} modifié : {old_value} → {new_value}"),
        );
        entry.field = Some(field.to_string());
        entry.old_value = Some(old_value.to_string());
        entry.new_value = Some(new_value.to_string());
        entry
    }

    /// Record the addition of one vehicle.
    pub fn vehicle_added(accreditation_id: Uuid, plate: &str) -> Self {
        Self::base(
            accreditation_id,
            HistoryAction::VehicleAdded,
            format!("Véhicule ajouté : {plate}"),
        )
    }

    /// Record the removal of one vehicle.
    pub fn vehicle_removed(accreditation_id: Uuid, plate: &str) -> Self {
        Self::base(
            accreditation_id,
            HistoryAction::VehicleRemoved,
            format!("Véhicule supprimé : {plate}"),
        )
    }

    /// Record an update to one vehicle.
    pub fn vehicle_updated(accreditation_id: Uuid, plate: &str) -> Self {
        Self::base(
            accreditation_id,
            HistoryAction::VehicleUpdated,
            format!("Véhicule modifié : {plate}"),
        )
    }

    /// Record a bulk replacement of the vehicle collection.
    pub fn vehicles_replaced(accreditation_id: Uuid, count: usize) -> Self {
        Self::base(
            accreditation_id,
            HistoryAction::VehicleUpdated,
            format!("Véhicules remplacés ({count})"),
        )
    }

    /// Record a credential email dispatch.
    pub fn email_sent(accreditation_id: Uuid, email: &str) -> Self {
        Self::base(
            accreditation_id,
            HistoryAction::EmailSent,
            format!("Accréditation envoyée à {email}"),
        )
    }

    /// Record deletion of the accreditation. Written just before the
    /// record disappears; this entry outlives it.
    pub fn deleted(accreditation_id: Uuid) -> Self {
        Self::base(
            accreditation_id,
            HistoryAction::Deleted,
            "Accréditation supprimée".to_string(),
        )
    }
}

/// One credential email dispatch, logged append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmailRecord {
    /// The accreditation the credential belonged to.
    pub accreditation_id: Uuid,
    /// Target address.
    pub email: String,
    /// Dispatch time.
    pub sent_at: DateTime<Utc>,
}
