use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::core::error::CrmError;
use crate::core::notify::LeadNotification;
use crate::core::schema::{lead_timeline, leads};
use crate::pipelines::storage::get_pipeline;

use super::storage::{db_entry_to_entry, db_lead_to_lead, DbLead, DbTimelineEntry};
use super::types::{Lead, TimelineEntry, TransitionRequest};

/// The validated inputs of a stage move.
#[derive(Debug, Clone)]
pub struct Transition {
    pub new_pipeline: Option<Uuid>,
    pub new_stage: String,
    pub remark: String,
    pub actor_id: Uuid,
}

pub fn validate_transition(lead_id: Uuid, req: TransitionRequest) -> Result<Transition, CrmError> {
    if lead_id.is_nil() {
        return Err(CrmError::Validation("lead id is required".to_string()));
    }
    let new_stage = match req.new_stage {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Err(CrmError::Validation("new_stage is required".to_string())),
    };
    let remark = match req.remark {
        Some(r) if !r.trim().is_empty() => r,
        _ => return Err(CrmError::Validation("remark is required".to_string())),
    };
    let actor_id = match req.actor_id {
        Some(a) if !a.is_nil() => a,
        _ => return Err(CrmError::Validation("actor_id is required".to_string())),
    };
    Ok(Transition {
        new_pipeline: req.new_pipeline,
        new_stage,
        remark,
        actor_id,
    })
}

pub fn compose_action(pipeline_name: Option<&str>, new_stage: &str) -> String {
    match pipeline_name {
        Some(pipeline) => {
            format!("Pipeline changed to {pipeline} and stage changed to {new_stage}")
        }
        None => format!("Stage changed to {new_stage}"),
    }
}

/// Move a lead to a new stage (and optionally a new pipeline). The lead row
/// is locked for the duration of the transaction so the stage update and
/// the timeline append commit as one unit; concurrent transitions serialize
/// on the row lock instead of losing appends.
///
/// The caller's stage name is written as-is. Membership in the pipeline's
/// stage lists is deliberately not re-checked.
pub fn transition_stage(
    conn: &mut PgConnection,
    lead_id: Uuid,
    org_id: Uuid,
    transition: &Transition,
) -> Result<(Lead, TimelineEntry), CrmError> {
    conn.transaction(|conn| {
        let mut lead: DbLead = leads::table
            .filter(leads::id.eq(lead_id))
            .filter(leads::org_id.eq(org_id))
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| CrmError::NotFound("Lead not found".to_string()))?;

        let pipeline_name = match transition.new_pipeline {
            Some(target) if target != lead.pipeline_id => {
                let pipeline = get_pipeline(conn, target, org_id)?;
                lead.pipeline_id = pipeline.id;
                Some(pipeline.name)
            }
            _ => None,
        };

        let action = compose_action(pipeline_name.as_deref(), &transition.new_stage);
        let now = Utc::now();

        lead.stage = transition.new_stage.clone();
        lead.updated_at = now;

        diesel::update(leads::table.find(lead_id))
            .set((
                leads::pipeline_id.eq(lead.pipeline_id),
                leads::stage.eq(&lead.stage),
                leads::updated_at.eq(now),
            ))
            .execute(conn)?;

        let entry = DbTimelineEntry {
            id: Uuid::new_v4(),
            lead_id,
            stage: transition.new_stage.clone(),
            action,
            remark: Some(transition.remark.clone()),
            moved_by: Some(transition.actor_id),
            created_at: now,
        };
        diesel::insert_into(lead_timeline::table)
            .values(&entry)
            .execute(conn)?;

        Ok((db_lead_to_lead(lead), db_entry_to_entry(entry)))
    })
}

/// Build the post-commit notification. The recipient is the assignee,
/// falling back to the acting user when the lead is unassigned.
pub fn transition_notification(
    lead: &Lead,
    entry: &TimelineEntry,
    actor_id: Uuid,
    base_url: &str,
) -> LeadNotification {
    LeadNotification {
        org_id: lead.org_id,
        recipient_id: lead.assigned_to.unwrap_or(actor_id),
        actor_id,
        action: "stage_changed".to_string(),
        entity_type: "lead".to_string(),
        entity_id: lead.id,
        entity_name: lead.name.clone(),
        message: entry.action.clone(),
        url: format!("{base_url}/leads/{}", lead.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        stage: Option<&str>,
        remark: Option<&str>,
        actor: Option<Uuid>,
    ) -> TransitionRequest {
        TransitionRequest {
            new_pipeline: None,
            new_stage: stage.map(String::from),
            remark: remark.map(String::from),
            actor_id: actor,
        }
    }

    #[test]
    fn validation_accepts_complete_input() {
        let actor = Uuid::new_v4();
        let t = validate_transition(
            Uuid::new_v4(),
            request(Some("Qualified"), Some("contacted"), Some(actor)),
        )
        .unwrap();
        assert_eq!(t.new_stage, "Qualified");
        assert_eq!(t.remark, "contacted");
        assert_eq!(t.actor_id, actor);
    }

    #[test]
    fn validation_rejects_missing_stage() {
        let err = validate_transition(Uuid::new_v4(), request(None, Some("r"), Some(Uuid::new_v4())));
        assert!(matches!(err, Err(CrmError::Validation(_))));
    }

    #[test]
    fn validation_rejects_blank_remark() {
        let err = validate_transition(
            Uuid::new_v4(),
            request(Some("Won"), Some("   "), Some(Uuid::new_v4())),
        );
        assert!(matches!(err, Err(CrmError::Validation(_))));
    }

    #[test]
    fn validation_rejects_nil_actor() {
        let err = validate_transition(
            Uuid::new_v4(),
            request(Some("Won"), Some("done"), Some(Uuid::nil())),
        );
        assert!(matches!(err, Err(CrmError::Validation(_))));
    }

    #[test]
    fn validation_rejects_nil_lead_id() {
        let err = validate_transition(
            Uuid::nil(),
            request(Some("Won"), Some("done"), Some(Uuid::new_v4())),
        );
        assert!(matches!(err, Err(CrmError::Validation(_))));
    }

    #[test]
    fn action_message_without_pipeline_change() {
        assert_eq!(compose_action(None, "Qualified"), "Stage changed to Qualified");
    }

    #[test]
    fn action_message_with_pipeline_change() {
        assert_eq!(
            compose_action(Some("Enterprise"), "Won"),
            "Pipeline changed to Enterprise and stage changed to Won"
        );
    }
}
