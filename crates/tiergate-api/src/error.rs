use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::ops::Deref;

use tiergate_common::TiergateError;

/// Newtype wrapper for TiergateError to implement IntoResponse
/// (orphan rule prevents implementing external trait on external type)
pub struct ApiError(pub TiergateError);

impl From<TiergateError> for ApiError {
    fn from(err: TiergateError) -> Self {
        ApiError(err)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError(TiergateError::Database(err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError(TiergateError::Internal(err.to_string()))
    }
}

impl Deref for ApiError {
    type Target = TiergateError;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({
            "error": self.0.to_string()
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
