use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::CrmError;
use crate::core::schema::pipelines;

use super::types::{
    CloseStageDef, CreatePipelineRequest, CustomFieldDef, Pipeline, StageDef,
    UpdatePipelineRequest,
};

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = pipelines)]
pub struct DbPipeline {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub open_stages: serde_json::Value,
    pub close_stages: serde_json::Value,
    pub custom_fields: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn db_pipeline_to_pipeline(db: DbPipeline) -> Pipeline {
    let open_stages: Vec<StageDef> =
        serde_json::from_value(db.open_stages).unwrap_or_default();
    let close_stages: Vec<CloseStageDef> =
        serde_json::from_value(db.close_stages).unwrap_or_default();
    let custom_fields: Vec<CustomFieldDef> =
        serde_json::from_value(db.custom_fields).unwrap_or_default();

    Pipeline {
        id: db.id,
        org_id: db.org_id,
        name: db.name,
        open_stages,
        close_stages,
        custom_fields,
        created_at: db.created_at,
        updated_at: db.updated_at,
    }
}

fn pipeline_to_db(p: &Pipeline) -> Result<DbPipeline, CrmError> {
    Ok(DbPipeline {
        id: p.id,
        org_id: p.org_id,
        name: p.name.clone(),
        open_stages: serde_json::to_value(&p.open_stages)
            .map_err(|e| CrmError::Conflict(e.to_string()))?,
        close_stages: serde_json::to_value(&p.close_stages)
            .map_err(|e| CrmError::Conflict(e.to_string()))?,
        custom_fields: serde_json::to_value(&p.custom_fields)
            .map_err(|e| CrmError::Conflict(e.to_string()))?,
        created_at: p.created_at,
        updated_at: p.updated_at,
    })
}

pub(crate) fn validate_pipeline_name(name: &str) -> Result<(), CrmError> {
    if name.trim().is_empty() {
        return Err(CrmError::Validation("Pipeline name is required".to_string()));
    }
    Ok(())
}

/// Merge the request's present fields into the pipeline. A name that is
/// present but blank is rejected, not merged.
pub(crate) fn apply_pipeline_update(
    pipeline: &mut Pipeline,
    req: UpdatePipelineRequest,
) -> Result<(), CrmError> {
    if let Some(name) = req.name {
        validate_pipeline_name(&name)?;
        pipeline.name = name;
    }
    if let Some(open_stages) = req.open_stages {
        pipeline.open_stages = open_stages;
    }
    if let Some(close_stages) = req.close_stages {
        pipeline.close_stages = close_stages;
    }
    if let Some(custom_fields) = req.custom_fields {
        pipeline.custom_fields = custom_fields;
    }
    Ok(())
}

pub fn create_pipeline(
    conn: &mut PgConnection,
    org_id: Uuid,
    req: CreatePipelineRequest,
) -> Result<Pipeline, CrmError> {
    validate_pipeline_name(&req.name)?;

    let now = Utc::now();
    let pipeline = Pipeline {
        id: Uuid::new_v4(),
        org_id,
        name: req.name,
        open_stages: req.open_stages,
        close_stages: req.close_stages,
        custom_fields: req.custom_fields,
        created_at: now,
        updated_at: now,
    };

    let db = pipeline_to_db(&pipeline)?;
    diesel::insert_into(pipelines::table)
        .values(&db)
        .execute(conn)?;

    Ok(pipeline)
}

pub fn list_pipelines(conn: &mut PgConnection, org_id: Uuid) -> Result<Vec<Pipeline>, CrmError> {
    let rows: Vec<DbPipeline> = pipelines::table
        .filter(pipelines::org_id.eq(org_id))
        .order(pipelines::created_at.asc())
        .load(conn)?;
    Ok(rows.into_iter().map(db_pipeline_to_pipeline).collect())
}

pub fn get_pipeline(
    conn: &mut PgConnection,
    pipeline_id: Uuid,
    org_id: Uuid,
) -> Result<Pipeline, CrmError> {
    let db: DbPipeline = pipelines::table
        .filter(pipelines::id.eq(pipeline_id))
        .filter(pipelines::org_id.eq(org_id))
        .first(conn)
        .optional()?
        .ok_or_else(|| CrmError::NotFound("Pipeline not found".to_string()))?;
    Ok(db_pipeline_to_pipeline(db))
}

pub fn update_pipeline(
    conn: &mut PgConnection,
    pipeline_id: Uuid,
    org_id: Uuid,
    req: UpdatePipelineRequest,
) -> Result<Pipeline, CrmError> {
    let mut pipeline = get_pipeline(conn, pipeline_id, org_id)?;
    apply_pipeline_update(&mut pipeline, req)?;
    pipeline.updated_at = Utc::now();

    let db = pipeline_to_db(&pipeline)?;
    diesel::update(pipelines::table.find(pipeline_id))
        .set(&db)
        .execute(conn)?;

    Ok(pipeline)
}

pub fn rename_stage(
    conn: &mut PgConnection,
    pipeline_id: Uuid,
    org_id: Uuid,
    stage_id: Uuid,
    new_name: &str,
) -> Result<Pipeline, CrmError> {
    if new_name.trim().is_empty() {
        return Err(CrmError::Validation("Stage name is required".to_string()));
    }

    let mut pipeline = get_pipeline(conn, pipeline_id, org_id)?;
    if !pipeline.rename_stage(stage_id, new_name) {
        return Err(CrmError::NotFound("Stage not found".to_string()));
    }
    pipeline.updated_at = Utc::now();

    let db = pipeline_to_db(&pipeline)?;
    diesel::update(pipelines::table.find(pipeline_id))
        .set(&db)
        .execute(conn)?;

    Ok(pipeline)
}

pub fn remove_stage(
    conn: &mut PgConnection,
    pipeline_id: Uuid,
    org_id: Uuid,
    stage_id: Uuid,
) -> Result<Pipeline, CrmError> {
    let mut pipeline = get_pipeline(conn, pipeline_id, org_id)?;

    // Absent stage id is a no-op, not an error.
    if pipeline.remove_stage(stage_id) {
        pipeline.updated_at = Utc::now();
        let db = pipeline_to_db(&pipeline)?;
        diesel::update(pipelines::table.find(pipeline_id))
            .set(&db)
            .execute(conn)?;
    }

    Ok(pipeline)
}

pub fn delete_pipeline(
    conn: &mut PgConnection,
    pipeline_id: Uuid,
    org_id: Uuid,
) -> Result<(), CrmError> {
    let deleted = diesel::delete(
        pipelines::table
            .filter(pipelines::id.eq(pipeline_id))
            .filter(pipelines::org_id.eq(org_id)),
    )
    .execute(conn)?;

    if deleted == 0 {
        return Err(CrmError::NotFound("Pipeline not found".to_string()));
    }
    // No cascade: leads referencing this pipeline are left in place.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> Pipeline {
        Pipeline {
            id: Uuid::new_v4(),
            org_id: Uuid::nil(),
            name: "Sales".to_string(),
            open_stages: vec![StageDef {
                id: Uuid::new_v4(),
                name: "New".to_string(),
                color: None,
            }],
            close_stages: vec![],
            custom_fields: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn empty_update() -> UpdatePipelineRequest {
        UpdatePipelineRequest {
            name: None,
            open_stages: None,
            close_stages: None,
            custom_fields: None,
        }
    }

    #[test]
    fn name_validation_rejects_blank() {
        assert!(matches!(
            validate_pipeline_name("   "),
            Err(CrmError::Validation(_))
        ));
        assert!(matches!(
            validate_pipeline_name(""),
            Err(CrmError::Validation(_))
        ));
        assert!(validate_pipeline_name("Sales").is_ok());
    }

    #[test]
    fn update_merge_rejects_blank_name() {
        let mut p = pipeline();
        let err = apply_pipeline_update(
            &mut p,
            UpdatePipelineRequest {
                name: Some("  ".to_string()),
                ..empty_update()
            },
        );
        assert!(matches!(err, Err(CrmError::Validation(_))));
        assert_eq!(p.name, "Sales");
    }

    #[test]
    fn update_merge_only_touches_present_fields() {
        let mut p = pipeline();
        apply_pipeline_update(
            &mut p,
            UpdatePipelineRequest {
                close_stages: Some(vec![CloseStageDef {
                    id: Uuid::new_v4(),
                    name: "Won".to_string(),
                    color: None,
                    won: true,
                    lost: false,
                }]),
                ..empty_update()
            },
        )
        .unwrap();

        assert_eq!(p.name, "Sales");
        assert_eq!(p.open_stages.len(), 1);
        assert_eq!(p.close_stages.len(), 1);
        assert!(p.close_stages[0].won);
    }
}
