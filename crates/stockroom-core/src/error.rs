use thiserror::Error;

use crate::api::ApiError;

/// Errors surfaced by the cache accessors and the mutation controller.
///
/// Persistence failures never appear here: the persistent tier degrades to
/// "no data" instead.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Network failure or non-2xx response while reading.
    #[error("Failed to fetch {what}: {source}")]
    Fetch {
        what: String,
        #[source]
        source: ApiError,
    },

    /// Local field checks failed before any state change.
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    /// The server rejected an optimistically applied change.
    #[error("{message}")]
    MutationConflict {
        message: String,
        #[source]
        source: ApiError,
    },

    /// The mutation request never completed; local state was rolled back.
    #[error("{message}")]
    MutationFailed {
        message: String,
        #[source]
        source: ApiError,
    },

    #[error("Instrument {0} is not in the current list")]
    NotInList(i64),
}

impl InventoryError {
    pub fn fetch(what: impl Into<String>, source: ApiError) -> Self {
        InventoryError::Fetch {
            what: what.into(),
            source,
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        InventoryError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Build the error for a failed mutation request.
    ///
    /// The message prefers the server's structured payload and falls back to
    /// `generic` when there is none.
    pub fn from_mutation_failure(source: ApiError, generic: impl Into<String>) -> Self {
        let message = source.server_message().unwrap_or_else(|| generic.into());
        if source.is_rejection() {
            InventoryError::MutationConflict { message, source }
        } else {
            InventoryError::MutationFailed { message, source }
        }
    }

    /// Field name for validation failures, used by forms to place the message.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            InventoryError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_mutation_failure_uses_server_message() {
        let api = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"detail": "Serial already used"}"#);
        let err = InventoryError::from_mutation_failure(api, "Failed to update Microscope");
        assert!(matches!(err, InventoryError::MutationConflict { .. }));
        assert_eq!(err.to_string(), "Serial already used");
    }

    #[test]
    fn test_mutation_failure_generic_message() {
        let api = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "oops");
        let err = InventoryError::from_mutation_failure(api, "Failed to update Microscope");
        assert_eq!(err.to_string(), "Failed to update Microscope");
    }

    #[test]
    fn test_unanswered_request_is_failed_not_conflict() {
        let api = ApiError::InvalidResponse("connection closed before message completed".into());
        let err = InventoryError::from_mutation_failure(api, "Failed to delete Microscope");
        assert!(matches!(err, InventoryError::MutationFailed { .. }));
        assert_eq!(err.to_string(), "Failed to delete Microscope");
    }

    #[test]
    fn test_validation_field() {
        let err = InventoryError::validation("quantity", "must be a whole number");
        assert_eq!(err.field(), Some("quantity"));
        assert_eq!(err.to_string(), "quantity: must be a whole number");
    }
}
