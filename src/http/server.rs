//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the gateway pipeline from configuration
//! - Create the Axum router and wire up middleware (request ID, tracing, limits)
//! - Apply route table updates from the reload channel
//! - Run the cache sweeper and admin listener alongside the main listener
//! - Shut everything down on the shutdown broadcast

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::cache::{CacheSweeper, MemoryCacheStore};
use crate::config::{validate_config, ConfigError, GatewayConfig};
use crate::dispatch::discount::GrpcDiscountClient;
use crate::dispatch::{Dispatcher, HttpForwarder, RpcTranslator};
use crate::gateway::{GatewayPipeline, REQUEST_ID_HEADER};
use crate::http::request::{into_gateway_request, MakeRequestUuid};
use crate::lifecycle::Shutdown;
use crate::routing::{RouteTable, RouteTableHandle, TransportKind};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// State injected into the gateway handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: GatewayPipeline,
    pub max_body_bytes: usize,
}

/// The edge gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    pipeline: GatewayPipeline,
    store: Arc<MemoryCacheStore>,
    config_path: Option<PathBuf>,
    started_at: Instant,
}

impl GatewayServer {
    /// Build the route table, cache and transports from configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let table = RouteTable::load(&config.routes)?;

        let store = Arc::new(MemoryCacheStore::new(
            config.cache.max_entries,
            config.cache.max_body_bytes,
        ));
        let pipeline = GatewayPipeline::new(
            Arc::new(RouteTableHandle::new(table)),
            store.clone(),
            Self::default_dispatcher(&config),
            config.cache.enabled,
        );

        Ok(Self {
            config,
            pipeline,
            store,
            config_path: None,
            started_at: Instant::now(),
        })
    }

    fn default_dispatcher(config: &GatewayConfig) -> Dispatcher {
        let connect = Duration::from_millis(config.timeouts.connect_ms);
        let discount = Arc::new(GrpcDiscountClient::new(connect));

        Dispatcher::new(Duration::from_millis(config.timeouts.downstream_ms))
            .with_transport(
                TransportKind::Http,
                Arc::new(HttpForwarder::new(connect, config.listener.max_body_bytes)),
            )
            .with_transport(TransportKind::Grpc, Arc::new(RpcTranslator::new(discount)))
    }

    /// Replace the transports, keeping the route table and cache.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.pipeline = GatewayPipeline::new(
            self.pipeline.routes().clone(),
            self.pipeline.cache().clone(),
            dispatcher,
            self.config.cache.enabled,
        );
        self
    }

    /// File re-read by `POST /admin/reload`.
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn pipeline(&self) -> &GatewayPipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        let state = AppState {
            pipeline: self.pipeline.clone(),
            max_body_bytes: self.config.listener.max_body_bytes,
        };
        let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "request",
                            request_id = %request_id,
                            method = %request.method(),
                            path = %request.uri().path(),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(request_id))
                    .layer(RequestBodyLimitLayer::new(self.config.listener.max_body_bytes)),
            )
    }

    /// Run the server until the shutdown broadcast fires.
    ///
    /// Configurations arriving on `updates` (file watcher, SIGHUP) replace
    /// the route table; rejected ones leave it untouched.
    pub async fn run(
        self,
        listener: TcpListener,
        mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: Shutdown,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.pipeline.routes().load().len(),
            "Gateway server starting"
        );

        let reloader = self.pipeline.clone();
        let mut reload_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = updates.recv() => match update {
                        Some(config) => {
                            // Errors are logged by the pipeline.
                            let _ = reloader.reload(&config.routes).await;
                        }
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        if self.config.cache.enabled {
            let sweeper = CacheSweeper::new(
                self.store.clone(),
                Duration::from_secs(self.config.cache.sweep_interval_secs),
            );
            tokio::spawn(sweeper.run(shutdown.subscribe()));
        }

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
            let admin = setup_admin_router(AdminState {
                pipeline: self.pipeline.clone(),
                config_path: self.config_path.clone().map(Arc::new),
                api_key: Arc::new(self.config.admin.api_key.clone()),
                started_at: self.started_at,
            });
            let admin_shutdown = shutdown.subscribe();
            tokio::spawn(async move {
                if let Err(e) = axum::serve(admin_listener, admin)
                    .with_graceful_shutdown(wait_for(admin_shutdown))
                    .await
                {
                    tracing::error!(error = %e, "Admin server failed");
                }
            });
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(wait_for(shutdown.subscribe()))
            .await?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}

async fn wait_for(mut shutdown: broadcast::Receiver<()>) {
    let _ = shutdown.recv().await;
}

async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request = match into_gateway_request(request, state.max_body_bytes).await {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };
    state.pipeline.handle(request).await.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, RouteConfig};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig {
            name: "orders".into(),
            upstream_path_template: "/orders".into(),
            upstream_http_methods: vec!["GET".into()],
            transport: "http".into(),
            downstream_scheme: "http".into(),
            downstream_host: "127.0.0.1".into(),
            downstream_port: 1,
            downstream_path_template: None,
            rpc_service: None,
            timeout_ms: None,
            cache: None,
        });
        config
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = config();
        config.listener.bind_address = "not-an-address".into();
        assert!(matches!(GatewayServer::new(config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn duplicate_routes_are_rejected() {
        let mut config = config();
        let mut copy = config.routes[0].clone();
        copy.name = "copy".into();
        config.routes.push(copy);
        assert!(matches!(GatewayServer::new(config), Err(ConfigError::DuplicateRoute { .. })));
    }

    #[tokio::test]
    async fn unmatched_request_gets_404_with_request_id() {
        let server = GatewayServer::new(config()).unwrap();
        let response = server
            .router()
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(response.headers()["x-gateway-cache"], "BYPASS");
    }

    #[tokio::test]
    async fn client_request_id_is_echoed() {
        let server = GatewayServer::new(parse_config("").unwrap()).unwrap();
        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(REQUEST_ID_HEADER, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "abc-123");
    }
}
