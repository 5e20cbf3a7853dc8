//! Validation errors for creation payloads.
//!
//! Every error names the offending field (and vehicle index where
//! relevant) so the HTTP layer can return a descriptive 400 without
//! inspecting the payload again.

use thiserror::Error;

/// A creation payload failed structural validation.
///
/// Validation is all-or-nothing: the caller must not persist anything
/// when any variant is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required identity field on the accreditation is empty.
    #[error("{field} must not be empty")]
    MissingField {
        /// Name of the empty field.
        field: &'static str,
    },

    /// The payload carries no vehicles at all.
    #[error("at least one vehicle is required")]
    NoVehicles,

    /// A required field on one of the vehicles is empty.
    #[error("vehicle {index}: {field} must not be empty")]
    MissingVehicleField {
        /// Zero-based index of the vehicle in the payload.
        index: usize,
        /// Name of the empty field.
        field: &'static str,
    },

    /// A vehicle declares no unloading side.
    #[error("vehicle {index}: at least one unloading side is required")]
    NoUnloadingSide {
        /// Zero-based index of the vehicle in the payload.
        index: usize,
    },
}
