use crate::utils::error::{ErrorKind, TaskflowError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error body returned by every handler: `{"error": "...", "details"?: "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn invalid_uuid() -> Self {
        Self::bad_request("Invalid UUID format")
    }

    /// Maps a service failure by its kind. Anything that is not the caller's
    /// fault is logged here and answered with `fallback` only.
    pub fn service(err: TaskflowError, fallback: &str) -> Self {
        match err.kind() {
            ErrorKind::Validation => Self::bad_request(err.to_string()),
            ErrorKind::NotFound => {
                let message = match &err {
                    TaskflowError::NotFoundError { resource, .. } => capitalize(resource) + " not found",
                    other => other.to_string(),
                };
                Self::new(StatusCode::NOT_FOUND, message)
            }
            _ => {
                tracing::error!(error = %err, "{}", fallback);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, fallback)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid request body".to_string(),
            details: Some(rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::RepositoryError;

    #[test]
    fn maps_kinds_to_statuses() {
        let validation = ApiError::service(TaskflowError::validation("bad"), "Failed");
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);

        let missing = ApiError::service(TaskflowError::not_found("todo", "x"), "Failed");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.message, "Todo not found");

        let store = ApiError::service(
            TaskflowError::persistence("get todo", RepositoryError::Backend("down".into())),
            "Failed to retrieve todo",
        );
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.message, "Failed to retrieve todo");
    }
}
