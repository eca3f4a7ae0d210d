//! HTTP error responses
//!
//! Every failure is rendered as `{"msg": ..., "error"?: ...}`.

use crate::application::ServiceError;
use crate::infrastructure::TokenError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

pub const MSG_INTERNAL_ERROR: &str = "Erro interno do servidor";

#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    Token(TokenError),
    /// Body could not be read as the expected JSON
    BadRequest(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Token(err)
    }
}

impl ApiError {
    fn status_and_body(self) -> (StatusCode, serde_json::Value) {
        match self {
            ApiError::Service(ServiceError::Validation(e)) => {
                let body = match e.detail {
                    Some(detail) => json!({ "msg": e.message, "error": detail }),
                    None => json!({ "msg": e.message }),
                };
                (StatusCode::BAD_REQUEST, body)
            }
            ApiError::Service(ServiceError::Unauthorized(msg)) => {
                (StatusCode::UNAUTHORIZED, json!({ "msg": msg }))
            }
            ApiError::Service(ServiceError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, json!({ "msg": msg }))
            }
            ApiError::Service(ServiceError::Conflict(msg)) => {
                (StatusCode::CONFLICT, json!({ "msg": msg }))
            }
            ApiError::Service(ServiceError::Database(e)) => {
                error!(error = %e, "Database failure while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "msg": MSG_INTERNAL_ERROR }))
            }
            ApiError::Service(ServiceError::Internal(e)) => {
                error!(error = %e, "Internal failure while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "msg": MSG_INTERNAL_ERROR }))
            }
            ApiError::Token(TokenError::Signing(e)) => {
                error!(error = %e, "Token signing failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "msg": MSG_INTERNAL_ERROR }))
            }
            ApiError::Token(e @ (TokenError::Missing | TokenError::Expired)) => {
                (StatusCode::UNAUTHORIZED, json!({ "msg": e.to_string() }))
            }
            ApiError::Token(TokenError::Invalid(msg)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "msg": msg }))
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "msg": msg })),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
