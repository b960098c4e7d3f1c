pub mod storage;
pub mod types;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, put},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::CrmError;
use crate::core::state::{request_context, AppState};

pub use storage::*;
pub use types::*;

pub fn configure_pipeline_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/pipelines",
            get(handle_list_pipelines).post(handle_create_pipeline),
        )
        .route(
            "/api/pipelines/:id",
            get(handle_get_pipeline)
                .put(handle_update_pipeline)
                .delete(handle_delete_pipeline),
        )
        .route(
            "/api/pipelines/:id/stages/:stage_id",
            put(handle_rename_stage).delete(handle_remove_stage),
        )
}

pub async fn handle_create_pipeline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreatePipelineRequest>,
) -> Result<Json<Pipeline>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let pipeline = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        create_pipeline(&mut conn, org_id, req)
    })
    .await??;

    Ok(Json(pipeline))
}

pub async fn handle_list_pipelines(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Pipeline>>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        list_pipelines(&mut conn, org_id)
    })
    .await??;

    Ok(Json(result))
}

pub async fn handle_get_pipeline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(pipeline_id): Path<Uuid>,
) -> Result<Json<Pipeline>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let pipeline = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        get_pipeline(&mut conn, pipeline_id, org_id)
    })
    .await??;

    Ok(Json(pipeline))
}

pub async fn handle_update_pipeline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(pipeline_id): Path<Uuid>,
    Json(req): Json<UpdatePipelineRequest>,
) -> Result<Json<Pipeline>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let pipeline = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        update_pipeline(&mut conn, pipeline_id, org_id, req)
    })
    .await??;

    Ok(Json(pipeline))
}

pub async fn handle_rename_stage(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((pipeline_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<RenameStageRequest>,
) -> Result<Json<Pipeline>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let pipeline = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        rename_stage(&mut conn, pipeline_id, org_id, stage_id, &req.name)
    })
    .await??;

    Ok(Json(pipeline))
}

pub async fn handle_remove_stage(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((pipeline_id, stage_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Pipeline>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let pipeline = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        remove_stage(&mut conn, pipeline_id, org_id, stage_id)
    })
    .await??;

    Ok(Json(pipeline))
}

pub async fn handle_delete_pipeline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(pipeline_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        delete_pipeline(&mut conn, pipeline_id, org_id)
    })
    .await??;

    Ok(Json(serde_json::json!({ "success": true })))
}
