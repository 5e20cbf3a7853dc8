//! # Validated JSON Extraction
//!
//! Request bodies implement [`Validate`]; handlers take
//! `Result<Json<T>, JsonRejection>` and run both the deserialization
//! result and the semantic checks through [`extract_validated_json`],
//! so malformed JSON and invalid content produce the same structured
//! 400 body instead of Axum's plain-text rejection.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Semantic validation of a request body, run after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON extraction and validate the payload.
pub fn extract_validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Probe {
        ok: bool,
    }

    impl Validate for Probe {
        fn validate(&self) -> Result<(), String> {
            if self.ok {
                Ok(())
            } else {
                Err("probe rejected".to_string())
            }
        }
    }

    #[test]
    fn valid_payload_passes_through() {
        let out = extract_validated_json(Ok(Json(Probe { ok: true })));
        assert!(out.is_ok());
    }

    #[test]
    fn invalid_payload_maps_to_validation_error() {
        let out = extract_validated_json(Ok(Json(Probe { ok: false })));
        match out {
            Err(AppError::Validation(msg)) => assert!(msg.contains("probe rejected")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
