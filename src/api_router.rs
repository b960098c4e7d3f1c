use axum::{routing::get, Router};
use std::sync::Arc;

use crate::core::state::AppState;
use crate::leads::configure_lead_routes;
use crate::main_module::{health_check, health_check_simple};
use crate::pipelines::configure_pipeline_routes;
use crate::reports::configure_report_routes;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check_simple))
        .route("/api/health", get(health_check))
        .merge(configure_pipeline_routes())
        .merge(configure_lead_routes())
        .merge(configure_report_routes())
}
