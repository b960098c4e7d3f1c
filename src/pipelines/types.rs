use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn new_stage_id() -> Uuid {
    Uuid::new_v4()
}

/// An in-progress stage of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDef {
    #[serde(default = "new_stage_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A terminal stage. `won`/`lost` default to false when omitted; the model
/// does not enforce mutual exclusivity between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseStageDef {
    #[serde(default = "new_stage_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub won: bool,
    #[serde(default)]
    pub lost: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CustomFieldType {
    Text,
    Date,
    Number,
    MultiSelect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: CustomFieldType,
    /// Only meaningful when `field_type` is MultiSelect.
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub open_stages: Vec<StageDef>,
    pub close_stages: Vec<CloseStageDef>,
    pub custom_fields: Vec<CustomFieldDef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pipeline {
    /// Rename a stage by id, checking open stages first. A stage id is
    /// unique within a pipeline, so the first match wins.
    pub fn rename_stage(&mut self, stage_id: Uuid, new_name: &str) -> bool {
        if let Some(stage) = self.open_stages.iter_mut().find(|s| s.id == stage_id) {
            stage.name = new_name.to_string();
            return true;
        }
        if let Some(stage) = self.close_stages.iter_mut().find(|s| s.id == stage_id) {
            stage.name = new_name.to_string();
            return true;
        }
        false
    }

    /// Remove a stage from whichever list holds it. Returns false when the
    /// id is absent from both; callers treat that as a no-op, not an error.
    /// Leads sitting in the removed stage are left orphaned by design.
    pub fn remove_stage(&mut self, stage_id: Uuid) -> bool {
        let before = self.open_stages.len() + self.close_stages.len();
        self.open_stages.retain(|s| s.id != stage_id);
        self.close_stages.retain(|s| s.id != stage_id);
        before != self.open_stages.len() + self.close_stages.len()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePipelineRequest {
    pub name: String,
    #[serde(default)]
    pub open_stages: Vec<StageDef>,
    #[serde(default)]
    pub close_stages: Vec<CloseStageDef>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldDef>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePipelineRequest {
    pub name: Option<String>,
    pub open_stages: Option<Vec<StageDef>>,
    pub close_stages: Option<Vec<CloseStageDef>>,
    pub custom_fields: Option<Vec<CustomFieldDef>>,
}

#[derive(Debug, Deserialize)]
pub struct RenameStageRequest {
    pub name: String,
}
