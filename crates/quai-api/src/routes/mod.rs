//! HTTP route modules.

pub mod accreditations;
pub mod dashboard;
pub mod pdf;
pub mod vehicles;
