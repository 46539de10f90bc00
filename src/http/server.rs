//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the range handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener
//! - Swap in a rebuilt pipeline on configuration reload
//! - Sweep expired cache entries in the background
//! - Stop waiting for in-flight requests once the drain deadline passes

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use arc_swap::ArcSwap;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::pipeline::{BuildError, Pipeline};
use crate::http::request::{self, MakeRequestUuidV4};
use crate::lifecycle::ShutdownSignal;
use crate::range::IncomingRequest;
use crate::upstream::ResponseCache;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ArcSwap<Pipeline>>,
}

/// HTTP server for the range proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pipeline: Arc<ArcSwap<Pipeline>>,
    cache: Option<Arc<ResponseCache>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, BuildError> {
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(ResponseCache::new(config.cache)));

        let pipeline = Pipeline::from_config(&config, cache.clone())?;
        let pipeline = Arc::new(ArcSwap::from_pointee(pipeline));

        let state = AppState {
            pipeline: pipeline.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            pipeline,
            cache,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %request::request_id(req.headers()),
                )
            }))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id());

        Router::new()
            .route("/{*path}", any(range_handler))
            .route("/", any(range_handler))
            .with_state(state)
            .layer(middleware)
    }

    /// Router with state and middleware applied, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires. In-flight requests get `timeouts.drain_secs`
    /// to finish before `run` returns without them.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        if let Some(cache) = self.cache.clone() {
            let interval = Duration::from_secs(cache.policy().purge_interval_secs);
            let mut stop = shutdown.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let removed = cache.purge_expired();
                            if removed > 0 {
                                tracing::debug!(removed, remaining = cache.len(), "Purged expired cache entries");
                            }
                        }
                        _ = stop.recv() => break,
                    }
                }
            });
        }

        let pipeline = self.pipeline.clone();
        let cache = self.cache.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                match Pipeline::from_config(&new_config, cache.clone()) {
                    Ok(next) => {
                        pipeline.store(Arc::new(next));
                        tracing::info!(
                            upstream = %new_config.upstream.base_url,
                            "Configuration reloaded"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected reloaded configuration, keeping current");
                    }
                }
            }
        });

        let drain_secs = self.config.timeouts.drain_secs;
        let deadline = shutdown.clone().drained(Duration::from_secs(drain_secs));
        let mut graceful = shutdown;
        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                graceful.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .into_future();

        tokio::select! {
            result = serve => result?,
            _ = deadline => {
                tracing::warn!(drain_secs, "Drain deadline reached, abandoning in-flight requests");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Hand every request to the current pipeline.
async fn range_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, _body) = request.into_parts();
    let incoming = IncomingRequest::new(parts.method, parts.uri, parts.headers);
    let pipeline = state.pipeline.load_full();
    pipeline.handle(incoming).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let mut config = ProxyConfig::default();
        // Never contacted: every request below is answered locally.
        config.upstream.base_url = "http://127.0.0.1:9".into();
        HttpServer::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_preflight_through_router() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/range/ABCDE")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "1728000");
        assert!(response.headers().get(request::X_REQUEST_ID).is_some());
    }

    #[tokio::test]
    async fn test_rejection_through_router() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/range/ABCDE")
                    .header(request::X_REQUEST_ID, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[request::X_REQUEST_ID], "req-42");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Request must be HTTPS");
    }

    #[tokio::test]
    async fn test_root_path_is_invalid_query() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-forwarded-proto", "https")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Invalid API query");
    }
}
