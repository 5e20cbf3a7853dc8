//! # quai-wizard — Multi-step Form Controller
//!
//! Drives the four-step accreditation request flow: identity, vehicles,
//! message/consent, finalize. Each step owns a patchable draft that is
//! written to a [`store::DraftStore`] on every change and loaded back on
//! construction, so an interrupted session resumes where it left off.
//!
//! The store is injected, never ambient. Two flows share the controller
//! with distinct key prefixes ([`WizardKind`]) so a public submission
//! draft and a logistician's intake draft never collide.
//!
//! Malformed persisted drafts are discarded silently and replaced with
//! defaults; a corrupt draft must never block a new submission.

pub mod draft;
pub mod store;
pub mod wizard;

pub use draft::{StepOneDraft, StepThreeDraft, VehicleDraft};
pub use store::{DraftStore, MemoryDraftStore};
pub use wizard::{Wizard, WizardError, WizardKind, STEP_COUNT};
