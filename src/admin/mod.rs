//! Operator API, served on its own listener behind a bearer token.

pub mod auth;
pub mod handlers;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::gateway::GatewayPipeline;

#[derive(Clone)]
pub struct AdminState {
    pub pipeline: GatewayPipeline,
    pub config_path: Option<Arc<PathBuf>>,
    pub api_key: Arc<String>,
    pub started_at: Instant,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes))
        .route("/admin/cache", get(get_cache).delete(clear_cache))
        .route("/admin/reload", post(reload))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
