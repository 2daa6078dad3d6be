use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::routing::{RouteBinding, Tier};

pub const LIVENESS_MESSAGE: &str = "Server is working!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liveness {
    pub message: String,
}

pub async fn liveness() -> Json<Liveness> {
    Json(Liveness {
        message: LIVENESS_MESSAGE.to_string(),
    })
}

/// Diagnostic binding answering `GET path`. `path` must start with `/`.
pub fn liveness_binding(path: &str) -> RouteBinding {
    RouteBinding::paths(
        "liveness",
        Tier::Diagnostic,
        [path],
        Router::new().route(path, get(liveness)),
    )
}
