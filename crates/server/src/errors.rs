use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::CoreError;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::error;

/// JSON error body: `{"error": "...", "message": "..."}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &str, message: Option<String>) -> Self {
        Self { status, error: error.to_string(), message }
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, &format!("{} not found", what), None)
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg, None)
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.error, message = ?self.message, "request failed");
        }
        let body = match self.message {
            Some(msg) => serde_json::json!({ "error": self.error, "message": msg }),
            None => serde_json::json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => JsonApiError::new(StatusCode::BAD_REQUEST, "Validation Error", Some(msg)),
            ServiceError::Unauthorized(msg) => JsonApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized", Some(msg)),
            ServiceError::NotFound(msg) => JsonApiError::new(StatusCode::NOT_FOUND, "Not Found", Some(msg)),
            ServiceError::Conflict(msg) => JsonApiError::new(StatusCode::CONFLICT, "Conflict", Some(msg)),
            ServiceError::Storage(_) | ServiceError::Corrupt(_) => {
                JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", Some(e.to_string()))
            }
        }
    }
}

// 请求体或路径参数解析失败统一返回 400 + JSON
impl From<JsonRejection> for JsonApiError {
    fn from(e: JsonRejection) -> Self {
        JsonApiError::new(StatusCode::BAD_REQUEST, "Validation Error", Some(e.body_text()))
    }
}

impl From<PathRejection> for JsonApiError {
    fn from(e: PathRejection) -> Self {
        JsonApiError::new(StatusCode::BAD_REQUEST, "Validation Error", Some(e.body_text()))
    }
}

impl From<CoreError> for JsonApiError {
    fn from(e: CoreError) -> Self {
        JsonApiError::new(StatusCode::BAD_GATEWAY, "Upstream Error", Some(e.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
