use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::admin::AdminState;
use crate::cache::CacheStats;
use crate::routing::RouteDefinition;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub route_generation: u64,
    pub routes: usize,
}

#[derive(Serialize)]
pub struct RouteCacheSummary {
    pub ttl_secs: u64,
    pub region: String,
}

#[derive(Serialize)]
pub struct RouteSummary {
    pub name: String,
    pub methods: String,
    pub upstream: String,
    pub transport: String,
    pub target: String,
    pub downstream_path: Option<String>,
    pub timeout_ms: Option<u64>,
    pub cache: Option<RouteCacheSummary>,
}

impl From<&RouteDefinition> for RouteSummary {
    fn from(route: &RouteDefinition) -> Self {
        Self {
            name: route.name.clone(),
            methods: route.methods.to_string(),
            upstream: route.upstream.as_str().to_string(),
            transport: route.transport.to_string(),
            target: route.target.to_string(),
            downstream_path: route.downstream_path.as_ref().map(|t| t.as_str().to_string()),
            timeout_ms: route.timeout.map(|t| t.as_millis() as u64),
            cache: route.cache.as_ref().map(|c| RouteCacheSummary {
                ttl_secs: c.ttl.as_secs(),
                region: c.region.clone(),
            }),
        }
    }
}

#[derive(Deserialize)]
pub struct ClearParams {
    pub region: Option<String>,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, code: &str, message: String) -> ApiError {
    (status, Json(json!({ "error": { "code": code, "message": message } })))
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let table = state.pipeline.routes().load();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        route_generation: table.generation(),
        routes: table.len(),
    })
}

/// Routes in match order.
pub async fn get_routes(State(state): State<AdminState>) -> Json<Vec<RouteSummary>> {
    let table = state.pipeline.routes().load();
    Json(table.routes().iter().map(|r| RouteSummary::from(r.as_ref())).collect())
}

pub async fn get_cache(State(state): State<AdminState>) -> Result<Json<CacheStats>, ApiError> {
    state
        .pipeline
        .cache()
        .stats()
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::SERVICE_UNAVAILABLE, "CACHE_UNAVAILABLE", e.to_string()))
}

pub async fn clear_cache(
    State(state): State<AdminState>,
    Query(params): Query<ClearParams>,
) -> Result<Json<Value>, ApiError> {
    let region = params.region.filter(|r| !r.is_empty());
    let cleared = state
        .pipeline
        .cache()
        .clear(region.as_deref())
        .await
        .map_err(|e| api_error(StatusCode::SERVICE_UNAVAILABLE, "CACHE_UNAVAILABLE", e.to_string()))?;

    tracing::info!(region = ?region, cleared, "Cache cleared via admin API");
    Ok(Json(json!({ "region": region, "cleared": cleared })))
}

pub async fn reload(State(state): State<AdminState>) -> Result<Json<Value>, ApiError> {
    let path = state.config_path.as_ref().ok_or_else(|| {
        api_error(
            StatusCode::CONFLICT,
            "NO_CONFIG_FILE",
            "gateway was started without a configuration file".to_string(),
        )
    })?;

    let table = state
        .pipeline
        .reload_from_file(path)
        .await
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, "RELOAD_REJECTED", e.to_string()))?;

    Ok(Json(json!({ "generation": table.generation(), "routes": table.len() })))
}
