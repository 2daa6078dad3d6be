//! Terminal resolution for requests no route binding claimed.
//!
//! # Order
//! ```text
//! GET/HEAD and a file exists under the public directory → static asset
//! reserved prefix (/api/, /auth/, ...) or other method   → 404 {"error":"Route not found"}
//! entry document present                                → single-page shell
//! entry document missing                                → 500, path logged
//! ```
//!
//! Reserved prefixes keep the shell from masking genuine API errors. A
//! missing entry document is a deployment fault, logged at `error` with the
//! absolute path it was expected at.

use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::StaticConfig;
use crate::http::response::{route_not_found, shell_unavailable};

/// How the fallback tier answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    StaticAsset,
    NotFound,
    Shell,
    ShellMissing,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::StaticAsset => "static",
            Resolution::NotFound => "not_found",
            Resolution::Shell => "shell",
            Resolution::ShellMissing => "shell_missing",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FallbackResolver {
    public_dir: PathBuf,
    index_path: PathBuf,
    reserved_prefixes: Vec<String>,
    assets: ServeDir,
}

impl FallbackResolver {
    /// `extra_reserved` holds the prefixes of mounted auth and API bindings.
    pub fn new(config: &StaticConfig, extra_reserved: Vec<String>) -> Self {
        let mut reserved_prefixes = config.reserved_prefixes.clone();
        for prefix in extra_reserved {
            if !reserved_prefixes.contains(&prefix) {
                reserved_prefixes.push(prefix);
            }
        }

        Self {
            public_dir: config.public_dir.clone(),
            index_path: config.public_dir.join(&config.index_file),
            reserved_prefixes,
            assets: ServeDir::new(&config.public_dir),
        }
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn reserved_prefixes(&self) -> &[String] {
        &self.reserved_prefixes
    }

    pub fn is_reserved(&self, path: &str) -> bool {
        self.reserved_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub async fn resolve(&self, request: Request<Body>) -> (Resolution, Response) {
        let reads = matches!(*request.method(), Method::GET | Method::HEAD);

        if reads {
            let response = match self.assets.clone().oneshot(asset_request(&request)).await {
                Ok(response) => response,
                Err(never) => match never {},
            };
            if response.status() != StatusCode::NOT_FOUND {
                return (Resolution::StaticAsset, response.map(Body::new));
            }
        }

        if !reads || self.is_reserved(request.uri().path()) {
            return (Resolution::NotFound, route_not_found());
        }

        match tokio::fs::metadata(&self.index_path).await {
            Ok(metadata) if metadata.is_file() => {
                let response = match ServeFile::new(&self.index_path).oneshot(request).await {
                    Ok(response) => response,
                    Err(never) => match never {},
                };
                (Resolution::Shell, response.map(Body::new))
            }
            _ => {
                tracing::error!(
                    path = %self.index_path.display(),
                    "index.html file not found"
                );
                (Resolution::ShellMissing, shell_unavailable())
            }
        }
    }
}

/// Bodiless copy of a read request for the static file lookup.
fn asset_request(request: &Request<Body>) -> Request<Body> {
    let mut copy = Request::new(Body::empty());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.headers_mut() = request.headers().clone();
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn resolver(dir: &Path) -> FallbackResolver {
        let config = StaticConfig {
            public_dir: dir.to_path_buf(),
            ..StaticConfig::default()
        };
        FallbackResolver::new(&config, vec!["/api/ai/".into(), "/auth/".into()])
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    async fn text(response: Response) -> String {
        String::from_utf8(to_bytes(response.into_body(), 1 << 16).await.unwrap().to_vec()).unwrap()
    }

    #[test]
    fn reserved_prefixes_are_merged_without_duplicates() {
        let r = resolver(Path::new("/srv/public"));
        assert_eq!(r.reserved_prefixes(), ["/api/", "/auth/", "/social/", "/api/ai/"]);
        assert!(r.is_reserved("/api/unknown"));
        assert!(r.is_reserved("/social/x"));
        assert!(!r.is_reserved("/api"));
        assert!(!r.is_reserved("/dashboard"));
        assert_eq!(r.index_path(), Path::new("/srv/public/index.html"));
    }

    #[tokio::test]
    async fn serves_assets_then_shell() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>shell</html>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        let r = resolver(dir.path());

        let (resolution, response) = r.resolve(get("/app.js")).await;
        assert_eq!(resolution, Resolution::StaticAsset);
        assert_eq!(text(response).await, "console.log(1)");

        let (resolution, response) = r.resolve(get("/dashboard")).await;
        assert_eq!(resolution, Resolution::Shell);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, "<html>shell</html>");
    }

    #[tokio::test]
    async fn reserved_paths_get_structured_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>shell</html>").unwrap();
        let r = resolver(dir.path());

        let (resolution, response) = r.resolve(get("/api/unknown")).await;
        assert_eq!(resolution, Resolution::NotFound);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, r#"{"error":"Route not found"}"#);
    }

    #[tokio::test]
    async fn writes_never_get_the_shell() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>shell</html>").unwrap();
        let r = resolver(dir.path());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/dashboard")
            .body(Body::empty())
            .unwrap();
        let (resolution, _) = r.resolve(request).await;
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn missing_shell_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver(dir.path());

        let (resolution, response) = r.resolve(get("/dashboard")).await;
        assert_eq!(resolution, Resolution::ShellMissing);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
