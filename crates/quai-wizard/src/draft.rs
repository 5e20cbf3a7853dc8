//! Per-step draft state and validity rules.

use serde::{Deserialize, Serialize};

use quai_core::{EventKey, NewVehicle, UnloadingProvider, UnloadingSide, VehicleSize};

/// Step 1: identity of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOneDraft {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub stand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unloading: Option<UnloadingProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventKey>,
}

impl StepOneDraft {
    /// Valid once company, stand, unloading provider and event are all
    /// filled in.
    pub fn is_valid(&self) -> bool {
        !self.company.trim().is_empty()
            && !self.stand.trim().is_empty()
            && self.unloading.is_some()
            && self.event.is_some()
    }
}

/// One vehicle sub-form on step 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleDraft {
    #[serde(default)]
    pub plate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<VehicleSize>,
    #[serde(default = "default_phone_code")]
    pub phone_code: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub unloading: Vec<UnloadingSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms: Option<String>,
}

fn default_phone_code() -> String {
    "+33".to_string()
}

impl Default for VehicleDraft {
    fn default() -> Self {
        VehicleDraft {
            plate: String::new(),
            size: None,
            phone_code: default_phone_code(),
            phone_number: String::new(),
            date: String::new(),
            time: String::new(),
            city: String::new(),
            unloading: Vec::new(),
            kms: None,
        }
    }
}

impl VehicleDraft {
    /// Plate, size, phone number, date, city and at least one unloading
    /// side. The arrival time is not gating here; submission-side
    /// validation still requires it.
    pub fn is_valid(&self) -> bool {
        !self.plate.trim().is_empty()
            && self.size.is_some()
            && !self.phone_number.trim().is_empty()
            && !self.date.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.unloading.is_empty()
    }

    /// Convert to the submission shape. Only callable once
    /// [`is_valid`](Self::is_valid) holds, which guarantees `size`.
    pub(crate) fn into_new_vehicle(self) -> NewVehicle {
        NewVehicle {
            plate: self.plate,
            size: self.size.unwrap_or(VehicleSize::Under10),
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

/// Step 3: message and consent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepThreeDraft {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub consent: bool,
}

impl StepThreeDraft {
    /// The message is optional; consent is not.
    pub fn is_valid(&self) -> bool {
        self.consent
    }
}
