use axum::{http::StatusCode, response::IntoResponse, routing::any, Router};

use crate::http::response::ErrorBody;

/// Router answering every path with `503 {"error": "<domain> is unavailable"}`.
pub fn unavailable(domain: &str) -> Router {
    let message = format!("{domain} is unavailable");
    let handler = move || {
        let message = message.clone();
        async move { ErrorBody::response(StatusCode::SERVICE_UNAVAILABLE, message).into_response() }
    };
    Router::new()
        .route("/", any(handler.clone()))
        .route("/{*rest}", any(handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn every_path_and_method_is_unavailable() {
        for (method, path) in [(Method::GET, "/"), (Method::POST, "/generate"), (Method::DELETE, "/a/b")] {
            let request = Request::builder().method(method).uri(path).body(Body::empty()).unwrap();
            let response = unavailable("ai").oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
            let body = to_bytes(response.into_body(), 1024).await.unwrap();
            assert_eq!(&body[..], br#"{"error":"ai is unavailable"}"#);
        }
    }
}
