//! # quai-core — Domain Model for the QUAI Accreditation System
//!
//! QUAI tracks vehicle accreditations for the loading docks of an event
//! venue. A driver or company submits an accreditation request (identity,
//! vehicles, message/consent), receives a PDF credential, and a back-office
//! logistician advances the record through its lifecycle at the gate.
//!
//! This crate holds everything that is pure domain logic:
//!
//! - [`status`] — the lifecycle state machine (`NOUVEAU` → … → `SORTIE`)
//!   with its write-once entry/exit timestamps.
//! - [`accreditation`] — accreditation and vehicle records, creation
//!   payload validation, and the normalization of the legacy `unloading`
//!   field shapes.
//! - [`history`] — append-only audit entries with canonical descriptions.
//! - [`query`] — the logistician dashboard query layer: filtering,
//!   multi-key sorting, and self-correcting pagination.
//!
//! Persistence, HTTP, PDF rendering, and the form wizard live in the
//! sibling crates (`quai-api`, `quai-pdf`, `quai-wizard`).

pub mod accreditation;
pub mod error;
pub mod history;
pub mod query;
pub mod status;

pub use accreditation::{
    normalize_unloading, normalize_unloading_text, Accreditation, EventKey, NewAccreditation,
    NewVehicle, UnloadingProvider, UnloadingSide, Vehicle, VehicleSize,
};
pub use error::ValidationError;
pub use history::{EmailRecord, HistoryAction, HistoryEntry};
pub use status::{duration_on_site, Status, TransitionError, TransitionOutcome};
