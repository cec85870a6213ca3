// Client-side view of backend failures
use serde_json::Value;
use std::collections::BTreeMap;

use crate::storage::StorageError;

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Failure of a backend call, classified so pages can show a soft message.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // 400
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: BTreeMap<String, String>,
    },

    // 401, after the refresh attempt
    #[error("{0}")]
    Unauthorized(String),

    // 403
    #[error("{0}")]
    Forbidden(String),

    // 404
    #[error("{0}")]
    NotFound(String),

    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Could not reach the server: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from the server: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Validation { .. } => Some(400),
            ClientError::Unauthorized(_) => Some(401),
            ClientError::Forbidden(_) => Some(403),
            ClientError::NotFound(_) => Some(404),
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::InvalidResponse(_) | ClientError::Storage(_) => None,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Validation { .. } => "VALIDATION_ERROR",
            ClientError::Unauthorized(_) => "UNAUTHORIZED",
            ClientError::Forbidden(_) => "FORBIDDEN",
            ClientError::NotFound(_) => "NOT_FOUND",
            ClientError::Http { .. } => "HTTP_ERROR",
            ClientError::Transport(_) => "NETWORK_ERROR",
            ClientError::InvalidResponse(_) => "INVALID_RESPONSE",
            ClientError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }

    /// Build from a non-success status and whatever JSON body came back.
    ///
    /// Understands `{"detail": ...}`, `{"error": ...}`, `{"message": ...}`
    /// and per-field lists like `{"email": ["already registered"]}`.
    pub fn from_response(status: u16, body: &Value) -> Self {
        let message = ["detail", "error", "message"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .map(str::to_string);

        let field_errors = field_errors(body);

        match status {
            400 => ClientError::Validation {
                message: message
                    .or_else(|| field_errors.values().next().cloned())
                    .unwrap_or_else(|| "The request was rejected".to_string()),
                field_errors,
            },
            401 => ClientError::Unauthorized(
                message.unwrap_or_else(|| SESSION_EXPIRED_MESSAGE.to_string()),
            ),
            403 => ClientError::Forbidden(
                message.unwrap_or_else(|| "You do not have permission to do that".to_string()),
            ),
            404 => ClientError::NotFound(message.unwrap_or_else(|| "Not found".to_string())),
            _ => ClientError::Http {
                status,
                message: message
                    .unwrap_or_else(|| "Something went wrong, please try again".to_string()),
            },
        }
    }
}

fn field_errors(body: &Value) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();
    let Some(object) = body.as_object() else {
        return errors;
    };

    for (field, value) in object {
        if matches!(field.as_str(), "detail" | "error" | "message" | "code") {
            continue;
        }
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
            _ => continue,
        };
        if !text.is_empty() {
            errors.insert(field.clone(), text);
        }
    }

    errors
}
