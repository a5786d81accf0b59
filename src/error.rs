use axum::extract::multipart::MultipartError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum PortalError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    Validation(String),

    #[error("Deletion of {0} requires confirmation")]
    ConfirmationRequired(&'static str),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Role `{required}` required")]
    Forbidden { required: &'static str },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Cannot derive storage key from `{0}`")]
    InvalidStorageUrl(String),

    #[error("Unexpected row shape: {0}")]
    RowShape(String),

    #[error("Upstream error with status {status}: {message}")]
    UpstreamStatus { status: StatusCode, message: String },
}

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation(message.into())
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            PortalError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new("VALIDATION_FAILED", message),
            ),
            PortalError::ConfirmationRequired(entity) => (
                StatusCode::PRECONDITION_REQUIRED,
                ApiErrorBody::new(
                    "CONFIRMATION_REQUIRED",
                    format!(
                        "Are you sure you want to delete this {entity}? Repeat with confirm=true."
                    ),
                ),
            ),
            PortalError::Multipart(e) => (
                e.status(),
                ApiErrorBody::new("INVALID_FORM", e.body_text()),
            ),
            PortalError::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                ApiErrorBody::new("NOT_FOUND", format!("{entity} {id} not found")),
            ),
            PortalError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody::new("INVALID_CREDENTIALS", "Invalid email or password."),
            ),
            PortalError::Forbidden { required } => (
                StatusCode::FORBIDDEN,
                ApiErrorBody::new("FORBIDDEN", format!("This page requires the {required} role.")),
            ),
            PortalError::DatabaseError(_)
            | PortalError::Json(_)
            | PortalError::RowShape(_)
            | PortalError::InvalidStorageUrl(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody::new("INTERNAL_ERROR", "An internal server error occurred."),
            ),
            PortalError::Reqwest(_) | PortalError::UrlParse(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody::new("BAD_GATEWAY", "Backend service is unavailable."),
            ),
            PortalError::UpstreamStatus { status, .. } => {
                let (code, msg) = match status {
                    StatusCode::TOO_MANY_REQUESTS => ("RATE_LIMIT", "Backend rate limit exceeded."),
                    StatusCode::UNAUTHORIZED => ("UNAUTHORIZED", "Backend authentication failed."),
                    StatusCode::FORBIDDEN => ("FORBIDDEN", "Backend permission denied."),
                    StatusCode::NOT_FOUND => ("NOT_FOUND", "Backend resource not found."),
                    _ => ("UPSTREAM_ERROR", "A backend error occurred."),
                };
                (StatusCode::BAD_GATEWAY, ApiErrorBody::new(code, msg))
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiErrorBody {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: PortalError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_surface_their_message() {
        let (status, body) = body_of(PortalError::validation("Please fill in all fields")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(body["error"]["message"], "Please fill in all fields");
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_details() {
        let (status, body) = body_of(PortalError::RowShape("secret column".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("secret column"));
    }

    #[tokio::test]
    async fn upstream_status_maps_to_bad_gateway() {
        let (status, body) = body_of(PortalError::UpstreamStatus {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "slow down".into(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "RATE_LIMIT");
    }

    #[tokio::test]
    async fn missing_confirmation_is_precondition_required() {
        let (status, body) = body_of(PortalError::ConfirmationRequired("facility")).await;
        assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
        assert_eq!(body["error"]["code"], "CONFIRMATION_REQUIRED");
    }
}
