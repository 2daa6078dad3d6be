//! Gateway assembly and serving.
//!
//! # Responsibilities
//! - Collect route bindings in precedence order and freeze the route table
//! - Wire the middleware chain in its fixed order
//! - Dispatch each request to exactly one binding or the fallback tier
//! - Serve on a listener with graceful shutdown
//!
//! # Middleware order (outermost first)
//! ```text
//! request id → trace → proxy normalizer → origin guard → CORS → session → request log → dispatch
//! ```
//! The normalizer runs before anything reads the protocol, and identity is
//! attached before any route handler runs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::Request,
    middleware,
    response::Response,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::handlers::liveness_binding;
use crate::http::request::{
    propagate_request_id_layer, request_log_middleware, set_request_id_layer, X_REQUEST_ID,
};
use crate::lifecycle::shutdown::until_shutdown;
use crate::observability::metrics;
use crate::routing::{FallbackResolver, RouteBinding, RouteTable, RouteTableError};
use crate::security::{origin_guard_middleware, proxy_headers_middleware, OriginPolicy, ProxyTrust};
use crate::session::{
    session_middleware, IdentityResolver, MemoryDirectory, MemoryStore, SessionError,
    SessionManager, SessionStore,
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Routes(#[from] RouteTableError),

    #[error("invalid visitor header name `{0}`")]
    VisitorHeader(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Collects everything a [`Gateway`] is assembled from.
///
/// Bindings are kept in the order they are added; the liveness binding is
/// always appended last.
pub struct GatewayBuilder {
    config: GatewayConfig,
    bindings: Vec<RouteBinding>,
    store: Option<Arc<dyn SessionStore>>,
    identities: Option<Arc<dyn IdentityResolver>>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            bindings: Vec::new(),
            store: None,
            identities: None,
        }
    }

    pub fn route(mut self, binding: RouteBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Defaults to an in-memory store.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to an empty in-memory directory, under which no session
    /// is ever authenticated.
    pub fn identity_resolver(mut self, identities: Arc<dyn IdentityResolver>) -> Self {
        self.identities = Some(identities);
        self
    }

    pub fn build(self) -> Result<Gateway, GatewayError> {
        let config = self.config;
        let environment = config.environment;

        let mut bindings = self.bindings;
        if !config.liveness_path.starts_with('/') {
            return Err(RouteTableError::InvalidPath {
                name: "liveness".to_string(),
                path: config.liveness_path.clone(),
            }
            .into());
        }
        bindings.push(liveness_binding(&config.liveness_path));
        let table = Arc::new(RouteTable::new(bindings)?);

        let fallback = Arc::new(FallbackResolver::new(
            &config.static_files,
            table.reserved_prefixes(),
        ));
        let proxy = Arc::new(
            ProxyTrust::from_config(&config.proxy)
                .map_err(|_| GatewayError::VisitorHeader(config.proxy.visitor_header.clone()))?,
        );
        let origins = Arc::new(OriginPolicy::new(config.trusted_origins(), environment));
        let sessions = Arc::new(SessionManager::new(
            &config.session,
            environment,
            self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            self.identities
                .unwrap_or_else(|| Arc::new(MemoryDirectory::new())),
        )?);

        for binding in table.bindings() {
            tracing::debug!(binding = binding.name(), tier = %binding.tier(), "Route bound");
        }

        let router = Router::new()
            .fallback(dispatch)
            .with_state(DispatchState {
                table: table.clone(),
                fallback,
            })
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<Body>| {
                            let request_id = request
                                .headers()
                                .get(X_REQUEST_ID)
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("-");
                            tracing::info_span!(
                                "request",
                                method = %request.method(),
                                path = %request.uri().path(),
                                request_id = %request_id
                            )
                        },
                    ))
                    .layer(propagate_request_id_layer())
                    .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
                    .layer(middleware::from_fn_with_state(proxy, proxy_headers_middleware))
                    .layer(middleware::from_fn_with_state(
                        origins.clone(),
                        origin_guard_middleware,
                    ))
                    .layer(origins.into_layer())
                    .layer(middleware::from_fn_with_state(
                        sessions.clone(),
                        session_middleware,
                    ))
                    .layer(middleware::from_fn_with_state(
                        environment,
                        request_log_middleware,
                    )),
            );

        Ok(Gateway {
            router,
            table,
            sessions,
            config: Arc::new(config),
        })
    }
}

/// An assembled gateway. Immutable once built.
#[derive(Clone)]
pub struct Gateway {
    router: Router,
    table: Arc<RouteTable>,
    sessions: Arc<SessionManager>,
    config: Arc<GatewayConfig>,
}

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    /// The full middleware stack and dispatcher as a router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn route_table(&self) -> &RouteTable {
        &self.table
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve until an OS termination signal or a `Shutdown` trigger.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let address = listener.local_addr()?;
        tracing::info!(
            address = %address,
            environment = %self.config.environment,
            routes = self.table.len(),
            "Gateway listening"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(until_shutdown(shutdown))
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

#[derive(Clone)]
struct DispatchState {
    table: Arc<RouteTable>,
    fallback: Arc<FallbackResolver>,
}

/// Hands the request to the first matching binding, else the fallback tier.
async fn dispatch(State(state): State<DispatchState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    match state.table.resolve(request.uri().path()) {
        Some(binding) => {
            tracing::trace!(binding = binding.name(), "Dispatching to route binding");
            let response = binding.call(request).await;
            metrics::record_request(
                method.as_str(),
                response.status().as_u16(),
                binding.name(),
                start,
            );
            response
        }
        None => {
            let (resolution, response) = state.fallback.resolve(request).await;
            metrics::record_request(
                method.as_str(),
                response.status().as_u16(),
                resolution.as_str(),
                start,
            );
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Tier;
    use axum::routing::get;

    #[test]
    fn liveness_is_bound_last() {
        let gateway = GatewayBuilder::new(GatewayConfig::default())
            .route(RouteBinding::prefix(
                "ai",
                Tier::Api,
                "/api/ai",
                Router::new().route("/generate", get(|| async { "ok" })),
            ))
            .build()
            .unwrap();

        let names: Vec<_> = gateway
            .route_table()
            .bindings()
            .iter()
            .map(RouteBinding::name)
            .collect();
        assert_eq!(names, ["ai", "liveness"]);
    }

    #[test]
    fn unrooted_liveness_path_is_rejected() {
        let config = GatewayConfig {
            liveness_path: "health".into(),
            ..GatewayConfig::default()
        };
        let err = GatewayBuilder::new(config).build().err().unwrap();
        assert!(matches!(
            err,
            GatewayError::Routes(RouteTableError::InvalidPath { .. })
        ));
    }

    #[test]
    fn out_of_order_bindings_fail_the_build() {
        let result = GatewayBuilder::new(GatewayConfig::default())
            .route(RouteBinding::prefix("ai", Tier::Api, "/api/ai", Router::new()))
            .route(RouteBinding::prefix("auth", Tier::Auth, "/auth", Router::new()))
            .build();
        assert!(matches!(
            result,
            Err(GatewayError::Routes(RouteTableError::TierOrder { .. }))
        ));
    }
}
