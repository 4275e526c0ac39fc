use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {body}")]
    AccessDenied { body: String, message: Option<String> },

    #[error("Unauthorized - session may have expired")]
    Unauthorized,

    #[error("Resource not found: {body}")]
    NotFound { body: String, message: Option<String> },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    /// `message` is read from the full body before `body` is truncated.
    #[error("Server error ({status}): {body}")]
    ServerError {
        status: u16,
        body: String,
        message: Option<String>,
    },

    #[error("Request rejected ({status}): {body}")]
    ClientError {
        status: u16,
        body: String,
        message: Option<String>,
    },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Keys checked, in order, for a human-readable message in an error payload.
const MESSAGE_KEYS: [&str; 4] = ["detail", "message", "error", "non_field_errors"];

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = structured_message(body);
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied {
                body: truncated,
                message,
            },
            404 => ApiError::NotFound {
                body: truncated,
                message,
            },
            429 => ApiError::RateLimited,
            code @ 500..=599 => ApiError::ServerError {
                status: code,
                body: truncated,
                message,
            },
            code @ 400..=499 => ApiError::ClientError {
                status: code,
                body: truncated,
                message,
            },
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// True when the server answered and refused the request, as opposed to
    /// the request never completing.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            ApiError::NetworkError(_) | ApiError::InvalidResponse(_)
        )
    }

    /// Message from the server's structured error payload, if it sent one.
    pub fn server_message(&self) -> Option<String> {
        match self {
            ApiError::AccessDenied { message, .. }
            | ApiError::NotFound { message, .. }
            | ApiError::ServerError { message, .. }
            | ApiError::ClientError { message, .. } => message.clone(),
            _ => None,
        }
    }
}

/// Understands `{"detail": "..."}`-style bodies as well as per-field
/// errors such as `{"quantity": ["Ensure this value is >= 0."]}`.
fn structured_message(body: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(body).ok()?;
    let object = payload.as_object()?;

    for key in MESSAGE_KEYS {
        if let Some(text) = object.get(key).and_then(flatten_message) {
            return Some(text);
        }
    }

    let field_errors: Vec<String> = object
        .iter()
        .filter_map(|(field, value)| {
            flatten_message(value).map(|text| format!("{}: {}", field, text))
        })
        .collect();
    if field_errors.is_empty() {
        None
    } else {
        Some(field_errors.join("; "))
    }
}

fn flatten_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(flatten_message).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        _ => None,
    }
}
