/// Request extractors
///
/// [`AppJson`] and [`AppQuery`] wrap the axum extractors with rejections
/// turned into [`ApiError`], so a malformed body or query string gets the
/// usual error JSON and a 400 instead of axum's plain text response.

use axum::extract::{FromRequest, FromRequestParts};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tasktrack_shared::validation::{self, FieldError};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// `axum::extract::Query` with rejections turned into [`ApiError`]
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// Raw PATCH body, kept as a map so unknown keys can be seen
pub type PatchBody = Map<String, Value>;

/// Checks a PATCH body against `allowed` and deserializes it
///
/// Unknown keys reject the whole request before anything is applied.
pub fn parse_patch<T: DeserializeOwned>(body: PatchBody, allowed: &[&str]) -> ApiResult<T> {
    let rejected = validation::disallowed_keys(body.keys(), allowed);
    if !rejected.is_empty() {
        return Err(ApiError::ValidationError(
            rejected
                .into_iter()
                .map(|key| FieldError::new(key, "Invalid update"))
                .collect(),
        ));
    }

    serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::BadRequest(format!("Invalid update: {}", e)))
}
