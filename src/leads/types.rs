use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub org_id: Uuid,
    pub lead_code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub pipeline_id: Uuid,
    /// Stage is kept as a name string, not a stage id. Renaming a pipeline
    /// stage does not migrate leads; unknown names classify as open.
    pub stage: String,
    pub amount: Option<f64>,
    pub close_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub files: Vec<String>,
    pub audio_recordings: Vec<String>,
    pub links: Vec<String>,
    pub custom_fields: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub stage: String,
    pub action: String,
    pub remark: Option<String>,
    pub moved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub content: String,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Followup {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub followup_type: String,
    pub note: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub name: String,
    pub pipeline_id: Uuid,
    pub stage: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub amount: Option<f64>,
    pub close_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub custom_fields: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeadRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub amount: Option<f64>,
    pub close_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub custom_fields: Option<serde_json::Value>,
    pub files: Option<Vec<String>>,
    pub audio_recordings: Option<Vec<String>>,
    pub links: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListLeadsQuery {
    pub pipeline_id: Option<Uuid>,
    pub stage: Option<String>,
    pub source: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub new_pipeline: Option<Uuid>,
    pub new_stage: Option<String>,
    pub remark: Option<String>,
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub content: String,
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddFollowupRequest {
    pub followup_type: Option<String>,
    pub note: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct LeadWithTimeline {
    pub lead: Lead,
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Timeline,
    Followup,
}

/// One row of the merged timeline + followups view.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub timestamp: DateTime<Utc>,
    pub stage: Option<String>,
    pub action: Option<String>,
    pub remark: Option<String>,
    pub followup_type: Option<String>,
    pub note: Option<String>,
    pub actor_id: Option<Uuid>,
}
