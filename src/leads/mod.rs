pub mod storage;
pub mod timeline;
pub mod transition;
pub mod types;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, put},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::CrmError;
use crate::core::state::{request_context, AppState};

pub use storage::*;
pub use timeline::merge_activity;
pub use transition::*;
pub use types::*;

pub fn configure_lead_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/leads", get(handle_list_leads).post(handle_create_lead))
        .route(
            "/api/leads/:id",
            get(handle_get_lead)
                .put(handle_update_lead)
                .delete(handle_delete_lead),
        )
        .route("/api/leads/:id/stage", put(handle_transition_stage))
        .route(
            "/api/leads/:id/notes",
            get(handle_list_notes).post(handle_add_note),
        )
        .route(
            "/api/leads/:id/followups",
            get(handle_list_followups).post(handle_add_followup),
        )
        .route("/api/leads/:id/timeline", get(handle_get_timeline))
        .route("/api/leads/:id/activity", get(handle_get_activity))
}

pub async fn handle_create_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateLeadRequest>,
) -> Result<Json<LeadWithTimeline>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, actor_id) = request_context(&headers);

    let (lead, seed) = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        create_lead(&mut conn, org_id, actor_id, req)
    })
    .await??;

    Ok(Json(LeadWithTimeline {
        lead,
        timeline: vec![seed],
    }))
}

pub async fn handle_list_leads(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListLeadsQuery>,
) -> Result<Json<Vec<Lead>>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        list_leads(&mut conn, org_id, &query)
    })
    .await??;

    Ok(Json(result))
}

pub async fn handle_get_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<LeadWithTimeline>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        let lead = get_lead(&mut conn, lead_id, org_id)?;
        let timeline = load_timeline_asc(&mut conn, lead_id)?;
        Ok::<LeadWithTimeline, CrmError>(LeadWithTimeline { lead, timeline })
    })
    .await??;

    Ok(Json(result))
}

pub async fn handle_update_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
    Json(req): Json<UpdateLeadRequest>,
) -> Result<Json<Lead>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let lead = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        update_lead(&mut conn, lead_id, org_id, req)
    })
    .await??;

    Ok(Json(lead))
}

pub async fn handle_delete_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        delete_lead(&mut conn, lead_id, org_id)
    })
    .await??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn handle_transition_stage(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<LeadWithTimeline>, CrmError> {
    let (org_id, _) = request_context(&headers);
    let transition = validate_transition(lead_id, req)?;
    let actor_id = transition.actor_id;

    let pool = state.conn.clone();
    let (lead, entry, timeline) = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        let (lead, entry) = transition_stage(&mut conn, lead_id, org_id, &transition)?;
        let timeline = load_timeline_asc(&mut conn, lead_id)?;
        Ok::<_, CrmError>((lead, entry, timeline))
    })
    .await??;

    // Fire-and-forget: the transition is already committed; emitter
    // problems are logged and never surfaced to the caller.
    let notification =
        transition_notification(&lead, &entry, actor_id, &state.config.server.base_url);
    let notifier = Arc::clone(&state.notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.emit(notification).await {
            log::warn!("Failed to emit stage-change notification: {e}");
        }
    });

    Ok(Json(LeadWithTimeline { lead, timeline }))
}

pub async fn handle_add_note(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
    Json(req): Json<AddNoteRequest>,
) -> Result<Json<Note>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, actor_id) = request_context(&headers);

    let note = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        add_note(&mut conn, lead_id, org_id, actor_id, req)
    })
    .await??;

    Ok(Json(note))
}

pub async fn handle_list_notes(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<Vec<Note>>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let notes = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        get_lead(&mut conn, lead_id, org_id)?;
        list_notes(&mut conn, lead_id)
    })
    .await??;

    Ok(Json(notes))
}

pub async fn handle_add_followup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
    Json(req): Json<AddFollowupRequest>,
) -> Result<Json<Followup>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, actor_id) = request_context(&headers);

    let followup = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        add_followup(&mut conn, lead_id, org_id, actor_id, req)
    })
    .await??;

    Ok(Json(followup))
}

pub async fn handle_list_followups(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<Vec<Followup>>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let followups = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        get_lead(&mut conn, lead_id, org_id)?;
        list_followups(&mut conn, lead_id)
    })
    .await??;

    Ok(Json(followups))
}

pub async fn handle_get_timeline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<Vec<TimelineEntry>>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let timeline = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        get_lead(&mut conn, lead_id, org_id)?;
        load_timeline_desc(&mut conn, lead_id)
    })
    .await??;

    Ok(Json(timeline))
}

pub async fn handle_get_activity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<Vec<ActivityEntry>>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let activity = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        get_lead(&mut conn, lead_id, org_id)?;
        let timeline = load_timeline_asc(&mut conn, lead_id)?;
        let followups = list_followups(&mut conn, lead_id)?;
        Ok::<_, CrmError>(merge_activity(&timeline, &followups))
    })
    .await??;

    Ok(Json(activity))
}
