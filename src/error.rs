use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::pocketbase::UpstreamError;

/// A required input field was missing, empty, or not a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} is required and must be a string")]
pub struct ValidationError {
    pub field: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    #[serde(skip_serializing_if = "Value::is_null")]
    data: Value,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Upstream(UpstreamError::Rejected { status, .. }) => {
                match StatusCode::from_u16(*status) {
                    Ok(s) if s.is_client_error() => s,
                    _ => StatusCode::BAD_GATEWAY,
                }
            }
            AuthError::Upstream(UpstreamError::Transport(_)) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::MalformedBody(_) => "MALFORMED_BODY",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::Upstream(_) if self.status() == StatusCode::BAD_GATEWAY => {
                "UPSTREAM_UNAVAILABLE"
            }
            AuthError::Upstream(_) => "UPSTREAM_REJECTED",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        if status.is_server_error() {
            error!(error = %self, code, "request failed");
        } else {
            warn!(error = %self, code, "request rejected");
        }

        let body = match self {
            AuthError::Validation(e) => ErrorBody {
                code,
                message: e.to_string(),
                field: Some(e.field),
                data: Value::Null,
            },
            AuthError::Upstream(UpstreamError::Rejected { message, data, .. })
                if status.is_client_error() =>
            {
                ErrorBody {
                    code,
                    message,
                    field: None,
                    data,
                }
            }
            AuthError::Upstream(_) => ErrorBody {
                code,
                message: "User service is unavailable. Please try again later.".into(),
                field: None,
                data: Value::Null,
            },
            other => ErrorBody {
                code,
                message: other.to_string(),
                field: None,
                data: Value::Null,
            },
        };

        (status, Json(ErrorResponse { error: body })).into_response()
    }
}
