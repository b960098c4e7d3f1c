//! Health check handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;

use crate::core::schema::pipelines;
use crate::core::state::AppState;

/// Deep probe: reaches the database and reports how many pipelines are
/// configured. A pool or query failure degrades the probe to 503.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let pool = state.conn.clone();
    let pipeline_count = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().ok()?;
        pipelines::table.count().get_result::<i64>(&mut conn).ok()
    })
    .await
    .ok()
    .flatten();

    health_payload(pipeline_count)
}

fn health_payload(pipeline_count: Option<i64>) -> (StatusCode, Json<serde_json::Value>) {
    let (code, status) = match pipeline_count {
        Some(_) => (StatusCode::OK, "healthy"),
        None => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "service": "crmserver",
            "version": env!("CARGO_PKG_VERSION"),
            "database": pipeline_count.is_some(),
            "pipelines": pipeline_count
        })),
    )
}

pub async fn health_check_simple() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "crmserver",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_reports_pipeline_count() {
        let (code, Json(body)) = health_payload(Some(3));
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], true);
        assert_eq!(body["pipelines"], 3);
    }

    #[test]
    fn payload_degrades_without_database() {
        let (code, Json(body)) = health_payload(None);
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"], false);
        assert!(body["pipelines"].is_null());
    }
}
