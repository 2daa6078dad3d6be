//! Structured error responses.
//!
//! Gateway-generated failures always carry a JSON body `{"error": "..."}`
//! so API clients never receive the single-page shell or an empty page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

pub const ROUTE_NOT_FOUND: &str = "Route not found";
pub const SHELL_UNAVAILABLE: &str = "Application shell unavailable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn response(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
        (status, Json(Self::new(error)))
    }
}

/// `404 {"error":"Route not found"}`.
pub fn route_not_found() -> Response {
    ErrorBody::response(StatusCode::NOT_FOUND, ROUTE_NOT_FOUND).into_response()
}

/// `500` for a deployment missing its single-page entry document.
pub fn shell_unavailable() -> Response {
    ErrorBody::response(StatusCode::INTERNAL_SERVER_ERROR, SHELL_UNAVAILABLE).into_response()
}
