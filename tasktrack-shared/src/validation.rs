/// Field-level validation errors
///
/// Model validation reports every failing field at once so the HTTP layer can
/// echo the whole list back in a `400` body.

use serde::{Deserialize, Serialize};

/// One failing field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Flattens `validator` output into [`FieldError`]s
///
/// Errors are sorted by field name so responses are stable.
pub fn from_validator(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();

    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

/// Rejects keys outside `allowed`
///
/// Used by PATCH handlers; returns the offending keys, sorted.
pub fn disallowed_keys<'a, I>(keys: I, allowed: &[&str]) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut rejected: Vec<String> = keys
        .into_iter()
        .filter(|key| !allowed.contains(&key.as_str()))
        .cloned()
        .collect();
    rejected.sort();
    rejected
}
