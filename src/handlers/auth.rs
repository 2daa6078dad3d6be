//! Session endpoints under the auth prefix.
//!
//! Login flows (local credentials, social providers) belong to the auth
//! domain handlers; these only expose and end the current session.

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::session::{CurrentUser, Identity, Session};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub user: Option<Identity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}

pub async fn session_status(user: Option<CurrentUser>) -> Json<SessionStatus> {
    let user = user.map(|CurrentUser(identity)| identity);
    Json(SessionStatus {
        authenticated: user.is_some(),
        user,
    })
}

pub async fn logout(session: Session, user: Option<CurrentUser>) -> Json<LogoutResponse> {
    if let Some(CurrentUser(identity)) = &user {
        tracing::info!(identity = %identity.id, "Logging out");
    }
    session.destroy();
    Json(LogoutResponse {
        message: "Logged out".to_string(),
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/session", get(session_status))
        .route("/logout", post(logout))
}
