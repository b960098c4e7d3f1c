pub mod buckets;
pub mod classify;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::CrmError;
use crate::core::schema::leads;
use crate::core::state::{request_context, AppState};
use crate::leads::storage::DbLead;
use crate::pipelines::storage::{get_pipeline, list_pipelines};
use crate::pipelines::types::Pipeline;

pub use buckets::{
    aggregate_by_bucket, conversion_rate, BucketRow, LeadSnapshot, ReportPeriod,
};
pub use classify::{classify, derive_stage_sets, Outcome};

pub fn configure_report_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports/leads", get(handle_leads_report))
        .route("/api/reports/revenue", get(handle_revenue_report))
        .route("/api/reports/summary", get(handle_summary_report))
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
    pub pipeline_id: Option<Uuid>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RevenueRow {
    pub bucket: String,
    pub won: i64,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub total_leads: i64,
    pub won: i64,
    pub lost: i64,
    pub open: i64,
    pub conversion_rate: f64,
    pub total_amount: f64,
    pub won_amount: f64,
    pub by_source: HashMap<String, i64>,
    pub by_stage: HashMap<String, i64>,
}

fn parse_period(query: &ReportQuery) -> Result<ReportPeriod, CrmError> {
    match query.period.as_deref() {
        Some(p) => ReportPeriod::parse(p),
        None => Err(CrmError::Validation("period is required".to_string())),
    }
}

/// Stage sets come from the current pipeline configuration, derived per
/// request; a reconfigured won/lost flag reclassifies historical leads.
fn scoped_pipelines(
    conn: &mut PgConnection,
    org_id: Uuid,
    pipeline_id: Option<Uuid>,
) -> Result<Vec<Pipeline>, CrmError> {
    match pipeline_id {
        Some(id) => Ok(vec![get_pipeline(conn, id, org_id)?]),
        None => list_pipelines(conn, org_id),
    }
}

fn load_window(
    conn: &mut PgConnection,
    org_id: Uuid,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    query: &ReportQuery,
) -> Result<Vec<DbLead>, CrmError> {
    let mut q = leads::table
        .filter(leads::org_id.eq(org_id))
        .filter(leads::created_at.ge(window_start))
        .filter(leads::created_at.le(window_end))
        .into_boxed();

    if let Some(pipeline_id) = query.pipeline_id {
        q = q.filter(leads::pipeline_id.eq(pipeline_id));
    }
    if let Some(ref source) = query.source {
        q = q.filter(leads::source.eq(source.clone()));
    }

    Ok(q.order(leads::created_at.asc()).load(conn)?)
}

fn snapshots(rows: &[DbLead]) -> Vec<LeadSnapshot> {
    rows.iter()
        .map(|lead| LeadSnapshot {
            created_at: lead.created_at,
            stage: lead.stage.clone(),
            amount: lead.amount.unwrap_or(0.0),
        })
        .collect()
}

pub async fn handle_leads_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<BucketRow>>, CrmError> {
    let period = parse_period(&query)?;
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let rows = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        let now = Utc::now();

        let pipelines = scoped_pipelines(&mut conn, org_id, query.pipeline_id)?;
        let (won, lost) = derive_stage_sets(&pipelines);

        let window = load_window(&mut conn, org_id, period.window_start(now), now, &query)?;
        Ok::<_, CrmError>(aggregate_by_bucket(
            &snapshots(&window),
            period,
            now,
            &won,
            &lost,
        ))
    })
    .await??;

    Ok(Json(rows))
}

pub async fn handle_revenue_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<RevenueRow>>, CrmError> {
    let period = parse_period(&query)?;
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let rows = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        let now = Utc::now();

        let pipelines = scoped_pipelines(&mut conn, org_id, query.pipeline_id)?;
        let (won, lost) = derive_stage_sets(&pipelines);

        let window = load_window(&mut conn, org_id, period.window_start(now), now, &query)?;

        // Revenue-style report: won classification only.
        let won_only: Vec<LeadSnapshot> = snapshots(&window)
            .into_iter()
            .filter(|lead| classify(&lead.stage, &won, &lost) == Outcome::Won)
            .collect();

        let rows = aggregate_by_bucket(&won_only, period, now, &won, &lost)
            .into_iter()
            .map(|row| RevenueRow {
                bucket: row.bucket,
                won: row.won,
                amount: row.amount,
            })
            .collect::<Vec<_>>();
        Ok::<_, CrmError>(rows)
    })
    .await??;

    Ok(Json(rows))
}

pub async fn handle_summary_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<SummaryReport>, CrmError> {
    let pool = state.conn.clone();
    let (org_id, _) = request_context(&headers);

    let summary = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;

        let pipelines = scoped_pipelines(&mut conn, org_id, query.pipeline_id)?;
        let (won_names, lost_names) = derive_stage_sets(&pipelines);

        let mut q = leads::table.filter(leads::org_id.eq(org_id)).into_boxed();
        if let Some(pipeline_id) = query.pipeline_id {
            q = q.filter(leads::pipeline_id.eq(pipeline_id));
        }
        if let Some(ref source) = query.source {
            q = q.filter(leads::source.eq(source.clone()));
        }
        let rows: Vec<DbLead> = q.load(&mut conn)?;

        let mut won = 0_i64;
        let mut lost = 0_i64;
        let mut open = 0_i64;
        let mut total_amount = 0.0;
        let mut won_amount = 0.0;
        let mut by_source: HashMap<String, i64> = HashMap::new();
        let mut by_stage: HashMap<String, i64> = HashMap::new();

        for lead in &rows {
            let amount = lead.amount.unwrap_or(0.0);
            total_amount += amount;
            match classify(&lead.stage, &won_names, &lost_names) {
                Outcome::Won => {
                    won += 1;
                    won_amount += amount;
                }
                Outcome::Lost => lost += 1,
                Outcome::Open => open += 1,
            }
            let source = lead.source.clone().unwrap_or_else(|| "unknown".to_string());
            *by_source.entry(source).or_insert(0) += 1;
            *by_stage.entry(lead.stage.clone()).or_insert(0) += 1;
        }

        let total_leads = rows.len() as i64;
        Ok::<_, CrmError>(SummaryReport {
            total_leads,
            won,
            lost,
            open,
            conversion_rate: conversion_rate(won, total_leads),
            total_amount,
            won_amount,
            by_source,
            by_stage,
        })
    })
    .await??;

    Ok(Json(summary))
}
