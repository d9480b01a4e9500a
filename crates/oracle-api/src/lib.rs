//! Oracle host API /v1: runs oracle programs the way the execution VM would
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use oracle_core::{HttpFetch, OracleError, ProgramRunner};
use oracle_stages::Catalog;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::ApiError;
pub use http::ReqwestFetch;
pub use metrics::Metrics;

pub struct AppState {
    pub runners: HashMap<String, ProgramRunner>,
    pub http: Arc<dyn HttpFetch>,
    pub metrics: Metrics,
}

impl AppState {
    /// Build every catalog program up front.
    pub fn new(catalog: &Catalog, http: Arc<dyn HttpFetch>) -> Result<Self, OracleError> {
        let mut runners = HashMap::new();
        for id in catalog.program_ids() {
            runners.insert(id.to_string(), ProgramRunner::new(catalog.build(id)?));
        }
        let metrics = Metrics::new().map_err(|e| OracleError::Config(e.to_string()))?;

        Ok(Self {
            runners,
            http,
            metrics,
        })
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/programs", get(handlers::list_programs))
        .route("/v1/programs/:id/execute", post(handlers::execute))
        .route("/v1/programs/:id/tally", post(handlers::tally))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let catalog = Catalog::new(config.programs.clone())?;
    let http = ReqwestFetch::new(Duration::from_secs(config.request_timeout))?;
    let state = Arc::new(AppState::new(&catalog, Arc::new(http))?);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    tracing::info!("Oracle host API listening on {}", config.addr);
    axum::serve(listener, app).await?;
    Ok(())
}
