//! The step controller itself.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::warn;

use quai_core::{NewAccreditation, ValidationError};

use crate::draft::{StepOneDraft, StepThreeDraft, VehicleDraft};
use crate::store::DraftStore;

/// Steps: identity, vehicles, message/consent, finalize.
pub const STEP_COUNT: usize = 4;

/// Which flow the controller serves. Each flow persists under its own
/// key prefix so drafts never bleed between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardKind {
    /// Public driver/company submission.
    Public,
    /// Logistician back-office intake.
    Logistician,
}

impl WizardKind {
    fn prefix(self) -> &'static str {
        match self {
            WizardKind::Public => "acc",
            WizardKind::Logistician => "log",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WizardError {
    /// `advance` was called while the current step is still invalid.
    #[error("step {step} is not complete")]
    StepLocked { step: usize },

    /// `finalize` found an earlier step invalid.
    #[error("cannot finalize, step {step} is incomplete")]
    Incomplete { step: usize },

    /// `finalize` assembled a payload that failed submission
    /// validation. The drafts are left intact.
    #[error("payload rejected: {0}")]
    Rejected(#[from] ValidationError),
}

/// Four-step form controller. Drafts write through to the injected
/// store on every change and are loaded back on construction.
pub struct Wizard<S: DraftStore> {
    store: S,
    kind: WizardKind,
    step: usize,
    can_advance: bool,
    step_one: StepOneDraft,
    vehicles: Vec<VehicleDraft>,
    step_three: StepThreeDraft,
}

impl<S: DraftStore> Wizard<S> {
    /// Build a controller on step 1, resuming any drafts the store
    /// holds. A draft that fails to parse is dropped and replaced with
    /// defaults without surfacing an error.
    pub fn new(store: S, kind: WizardKind) -> Self {
        let step_one = load_draft(&store, kind, "step1").unwrap_or_default();
        let vehicles: Vec<VehicleDraft> =
            load_draft(&store, kind, "vehicles").unwrap_or_else(|| vec![VehicleDraft::default()]);
        let vehicles = if vehicles.is_empty() {
            vec![VehicleDraft::default()]
        } else {
            vehicles
        };
        let step_three = load_draft(&store, kind, "step3").unwrap_or_default();

        let mut wizard = Wizard {
            store,
            kind,
            step: 1,
            can_advance: false,
            step_one,
            vehicles,
            step_three,
        };
        wizard.revalidate();
        wizard
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn can_advance(&self) -> bool {
        self.can_advance
    }

    pub fn step_one(&self) -> &StepOneDraft {
        &self.step_one
    }

    pub fn vehicles(&self) -> &[VehicleDraft] {
        &self.vehicles
    }

    pub fn step_three(&self) -> &StepThreeDraft {
        &self.step_three
    }

    /// Jump to a step. Out-of-range targets clamp into `1..=4`. The
    /// advance gate drops closed until the target step revalidates.
    pub fn goto(&mut self, step: usize) {
        self.step = step.clamp(1, STEP_COUNT);
        self.can_advance = false;
        self.revalidate();
    }

    /// Move to the next step, refused while the current one is invalid.
    pub fn advance(&mut self) -> Result<usize, WizardError> {
        if !self.can_advance {
            return Err(WizardError::StepLocked { step: self.step });
        }
        self.goto(self.step + 1);
        Ok(self.step)
    }

    pub fn back(&mut self) {
        self.goto(self.step.saturating_sub(1));
    }

    pub fn patch_step_one(&mut self, patch: impl FnOnce(&mut StepOneDraft)) {
        patch(&mut self.step_one);
        self.persist();
        self.revalidate();
    }

    /// Patch one vehicle sub-form. Out-of-range indexes are ignored.
    pub fn patch_vehicle(&mut self, index: usize, patch: impl FnOnce(&mut VehicleDraft)) {
        if let Some(vehicle) = self.vehicles.get_mut(index) {
            patch(vehicle);
            self.persist();
            self.revalidate();
        }
    }

    pub fn add_vehicle(&mut self) {
        self.vehicles.push(VehicleDraft::default());
        self.persist();
        self.revalidate();
    }

    /// Remove a vehicle sub-form. The form always keeps at least one.
    pub fn remove_vehicle(&mut self, index: usize) {
        if self.vehicles.len() > 1 && index < self.vehicles.len() {
            self.vehicles.remove(index);
            self.persist();
            self.revalidate();
        }
    }

    pub fn patch_step_three(&mut self, patch: impl FnOnce(&mut StepThreeDraft)) {
        patch(&mut self.step_three);
        self.persist();
        self.revalidate();
    }

    /// Recompute the advance gate from the current step's own validity.
    pub fn revalidate(&mut self) {
        self.can_advance = match self.step {
            1 => self.step_one.is_valid(),
            2 => !self.vehicles.is_empty() && self.vehicles.iter().all(VehicleDraft::is_valid),
            3 => self.step_three.is_valid(),
            // Finalize has no gate of its own.
            _ => true,
        };
    }

    /// Assemble the submission payload, run it through submission
    /// validation and clear all drafts. Refused with the first
    /// incomplete step when any of steps 1 to 3 is invalid, and with
    /// the validation error when the assembled payload is rejected;
    /// the drafts stay intact in both cases.
    pub fn finalize(&mut self) -> Result<NewAccreditation, WizardError> {
        if !self.step_one.is_valid() {
            return Err(WizardError::Incomplete { step: 1 });
        }
        if self.vehicles.is_empty() || !self.vehicles.iter().all(VehicleDraft::is_valid) {
            return Err(WizardError::Incomplete { step: 2 });
        }
        if !self.step_three.is_valid() {
            return Err(WizardError::Incomplete { step: 3 });
        }

        let payload = NewAccreditation {
            company: self.step_one.company.clone(),
            stand: self.step_one.stand.clone(),
            unloading: self.step_one.unloading.expect("checked by is_valid"),
            event: self.step_one.event.expect("checked by is_valid"),
            message: self.step_three.message.clone(),
            consent: self.step_three.consent,
            email: None,
            vehicles: self
                .vehicles
                .iter()
                .cloned()
                .map(VehicleDraft::into_new_vehicle)
                .collect(),
        };
        payload.validate()?;
        self.reset();
        Ok(payload)
    }

    /// Drop every draft, in memory and in the store, and return to
    /// step 1.
    pub fn reset(&mut self) {
        for key in ["step1", "vehicles", "step3"] {
            self.store.remove(&self.key(key));
        }
        self.step_one = StepOneDraft::default();
        self.vehicles = vec![VehicleDraft::default()];
        self.step_three = StepThreeDraft::default();
        self.step = 1;
        self.revalidate();
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.kind.prefix(), suffix)
    }

    fn persist(&self) {
        store_draft(&self.store, self.kind, "step1", &self.step_one);
        store_draft(&self.store, self.kind, "vehicles", &self.vehicles);
        store_draft(&self.store, self.kind, "step3", &self.step_three);
    }
}

fn load_draft<T: DeserializeOwned>(store: &impl DraftStore, kind: WizardKind, suffix: &str) -> Option<T> {
    let key = format!("{}_{}", kind.prefix(), suffix);
    let raw = store.get(&key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(%key, %err, "discarding malformed draft");
            None
        }
    }
}

fn store_draft<T: Serialize>(store: &impl DraftStore, kind: WizardKind, suffix: &str, value: &T) {
    let key = format!("{}_{}", kind.prefix(), suffix);
    match serde_json::to_string(value) {
        Ok(raw) => store.put(&key, raw),
        Err(err) => warn!(%key, %err, "failed to serialize draft"),
    }
}
