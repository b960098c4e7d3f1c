use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::CrmError;
use crate::core::schema::{lead_followups, lead_notes, lead_sequences, lead_timeline, leads};
use crate::pipelines::storage::get_pipeline;

use super::types::{
    AddFollowupRequest, AddNoteRequest, CreateLeadRequest, Followup, Lead, ListLeadsQuery,
    Note, TimelineEntry, UpdateLeadRequest,
};

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = leads)]
pub struct DbLead {
    pub id: Uuid,
    pub org_id: Uuid,
    pub lead_code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub pipeline_id: Uuid,
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

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = lead_timeline)]
pub struct DbTimelineEntry {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub stage: String,
    pub action: String,
    pub remark: Option<String>,
    pub moved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = lead_notes)]
pub struct DbNote {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub content: String,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = lead_followups)]
pub struct DbFollowup {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub followup_type: String,
    pub note: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

pub fn db_lead_to_lead(db: DbLead) -> Lead {
    Lead {
        id: db.id,
        org_id: db.org_id,
        lead_code: db.lead_code,
        name: db.name,
        email: db.email,
        phone: db.phone,
        source: db.source,
        pipeline_id: db.pipeline_id,
        stage: db.stage,
        amount: db.amount,
        close_date: db.close_date,
        assigned_to: db.assigned_to,
        files: db.files,
        audio_recordings: db.audio_recordings,
        links: db.links,
        custom_fields: db.custom_fields,
        created_at: db.created_at,
        updated_at: db.updated_at,
    }
}

pub fn db_entry_to_entry(db: DbTimelineEntry) -> TimelineEntry {
    TimelineEntry {
        id: db.id,
        lead_id: db.lead_id,
        stage: db.stage,
        action: db.action,
        remark: db.remark,
        moved_by: db.moved_by,
        created_at: db.created_at,
    }
}

pub fn db_note_to_note(db: DbNote) -> Note {
    Note {
        id: db.id,
        lead_id: db.lead_id,
        content: db.content,
        author_id: db.author_id,
        created_at: db.created_at,
    }
}

pub fn db_followup_to_followup(db: DbFollowup) -> Followup {
    Followup {
        id: db.id,
        lead_id: db.lead_id,
        followup_type: db.followup_type,
        note: db.note,
        due_at: db.due_at,
        created_by: db.created_by,
        created_at: db.created_at,
    }
}

/// Draw the next display-code number from an atomic per-organization
/// sequence row. The upsert-and-return is a single statement, so
/// concurrent creations never observe the same value.
pub fn next_lead_code(conn: &mut PgConnection, org_id: Uuid) -> Result<String, CrmError> {
    let seq: i64 = diesel::insert_into(lead_sequences::table)
        .values((
            lead_sequences::org_id.eq(org_id),
            lead_sequences::next_seq.eq(1_i64),
        ))
        .on_conflict(lead_sequences::org_id)
        .do_update()
        .set(lead_sequences::next_seq.eq(lead_sequences::next_seq + 1))
        .returning(lead_sequences::next_seq)
        .get_result(conn)?;

    Ok(format!("LEAD-{seq:06}"))
}

pub fn create_lead(
    conn: &mut PgConnection,
    org_id: Uuid,
    actor_id: Uuid,
    req: CreateLeadRequest,
) -> Result<(Lead, TimelineEntry), CrmError> {
    if req.name.trim().is_empty() {
        return Err(CrmError::Validation("Lead name is required".to_string()));
    }

    conn.transaction(|conn| {
        let pipeline = get_pipeline(conn, req.pipeline_id, org_id)?;

        let stage = match req.stage {
            Some(s) if !s.trim().is_empty() => s,
            _ => pipeline
                .open_stages
                .first()
                .map(|s| s.name.clone())
                .or_else(|| pipeline.close_stages.first().map(|s| s.name.clone()))
                .ok_or_else(|| {
                    CrmError::Validation(
                        "Pipeline has no stages and no initial stage was given".to_string(),
                    )
                })?,
        };

        let now = Utc::now();
        let lead_code = next_lead_code(conn, org_id)?;

        let db_lead = DbLead {
            id: Uuid::new_v4(),
            org_id,
            lead_code,
            name: req.name,
            email: req.email,
            phone: req.phone,
            source: req.source,
            pipeline_id: pipeline.id,
            stage: stage.clone(),
            amount: req.amount,
            close_date: req.close_date,
            assigned_to: req.assigned_to,
            files: vec![],
            audio_recordings: vec![],
            links: vec![],
            custom_fields: req.custom_fields.unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
            updated_at: now,
        };

        diesel::insert_into(leads::table)
            .values(&db_lead)
            .execute(conn)?;

        let seed = DbTimelineEntry {
            id: Uuid::new_v4(),
            lead_id: db_lead.id,
            stage,
            action: "Lead created".to_string(),
            remark: None,
            moved_by: Some(actor_id),
            created_at: now,
        };
        diesel::insert_into(lead_timeline::table)
            .values(&seed)
            .execute(conn)?;

        Ok((db_lead_to_lead(db_lead), db_entry_to_entry(seed)))
    })
}

pub fn get_lead(conn: &mut PgConnection, lead_id: Uuid, org_id: Uuid) -> Result<Lead, CrmError> {
    let db: DbLead = leads::table
        .filter(leads::id.eq(lead_id))
        .filter(leads::org_id.eq(org_id))
        .first(conn)
        .optional()?
        .ok_or_else(|| CrmError::NotFound("Lead not found".to_string()))?;
    Ok(db_lead_to_lead(db))
}

pub fn list_leads(
    conn: &mut PgConnection,
    org_id: Uuid,
    query: &ListLeadsQuery,
) -> Result<Vec<Lead>, CrmError> {
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut q = leads::table.filter(leads::org_id.eq(org_id)).into_boxed();

    if let Some(pipeline_id) = query.pipeline_id {
        q = q.filter(leads::pipeline_id.eq(pipeline_id));
    }
    if let Some(ref stage) = query.stage {
        q = q.filter(leads::stage.eq(stage.clone()));
    }
    if let Some(ref source) = query.source {
        q = q.filter(leads::source.eq(source.clone()));
    }
    if let Some(assigned_to) = query.assigned_to {
        q = q.filter(leads::assigned_to.eq(assigned_to));
    }
    if let Some(ref search) = query.search {
        let pattern = format!("%{search}%");
        q = q.filter(leads::name.ilike(pattern));
    }

    let rows: Vec<DbLead> = q
        .order(leads::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load(conn)?;

    Ok(rows.into_iter().map(db_lead_to_lead).collect())
}

/// Merge the request's present fields into the row. Stage and pipeline are
/// deliberately absent; the transition endpoint is the only writer for those.
pub(crate) fn apply_lead_update(db: &mut DbLead, req: UpdateLeadRequest) {
    if let Some(name) = req.name {
        db.name = name;
    }
    if let Some(email) = req.email {
        db.email = Some(email);
    }
    if let Some(phone) = req.phone {
        db.phone = Some(phone);
    }
    if let Some(source) = req.source {
        db.source = Some(source);
    }
    if let Some(amount) = req.amount {
        db.amount = Some(amount);
    }
    if let Some(close_date) = req.close_date {
        db.close_date = Some(close_date);
    }
    if let Some(assigned_to) = req.assigned_to {
        db.assigned_to = Some(assigned_to);
    }
    if let Some(custom_fields) = req.custom_fields {
        db.custom_fields = custom_fields;
    }
    if let Some(files) = req.files {
        db.files = files;
    }
    if let Some(audio_recordings) = req.audio_recordings {
        db.audio_recordings = audio_recordings;
    }
    if let Some(links) = req.links {
        db.links = links;
    }
}

pub fn update_lead(
    conn: &mut PgConnection,
    lead_id: Uuid,
    org_id: Uuid,
    req: UpdateLeadRequest,
) -> Result<Lead, CrmError> {
    conn.transaction(|conn| {
        let mut db: DbLead = leads::table
            .filter(leads::id.eq(lead_id))
            .filter(leads::org_id.eq(org_id))
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| CrmError::NotFound("Lead not found".to_string()))?;

        apply_lead_update(&mut db, req);
        db.updated_at = Utc::now();

        // Only the updatable columns are written. Stage and pipeline_id
        // never appear in this set, so a stage transition committed by a
        // concurrent request cannot be overwritten with a stale value.
        diesel::update(leads::table.find(lead_id))
            .set((
                leads::name.eq(db.name.clone()),
                leads::email.eq(db.email.clone()),
                leads::phone.eq(db.phone.clone()),
                leads::source.eq(db.source.clone()),
                leads::amount.eq(db.amount),
                leads::close_date.eq(db.close_date),
                leads::assigned_to.eq(db.assigned_to),
                leads::custom_fields.eq(db.custom_fields.clone()),
                leads::files.eq(db.files.clone()),
                leads::audio_recordings.eq(db.audio_recordings.clone()),
                leads::links.eq(db.links.clone()),
                leads::updated_at.eq(db.updated_at),
            ))
            .execute(conn)?;

        Ok(db_lead_to_lead(db))
    })
}

pub fn delete_lead(conn: &mut PgConnection, lead_id: Uuid, org_id: Uuid) -> Result<(), CrmError> {
    conn.transaction(|conn| {
        let deleted = diesel::delete(
            leads::table
                .filter(leads::id.eq(lead_id))
                .filter(leads::org_id.eq(org_id)),
        )
        .execute(conn)?;

        if deleted == 0 {
            return Err(CrmError::NotFound("Lead not found".to_string()));
        }

        diesel::delete(lead_timeline::table.filter(lead_timeline::lead_id.eq(lead_id)))
            .execute(conn)?;
        diesel::delete(lead_notes::table.filter(lead_notes::lead_id.eq(lead_id)))
            .execute(conn)?;
        diesel::delete(lead_followups::table.filter(lead_followups::lead_id.eq(lead_id)))
            .execute(conn)?;
        Ok(())
    })
}

/// Canonical storage order: chronological ascending.
pub fn load_timeline_asc(
    conn: &mut PgConnection,
    lead_id: Uuid,
) -> Result<Vec<TimelineEntry>, CrmError> {
    let rows: Vec<DbTimelineEntry> = lead_timeline::table
        .filter(lead_timeline::lead_id.eq(lead_id))
        .order(lead_timeline::created_at.asc())
        .load(conn)?;
    Ok(rows.into_iter().map(db_entry_to_entry).collect())
}

/// Presentation order: newest first. Sorted by the database, not re-derived.
pub fn load_timeline_desc(
    conn: &mut PgConnection,
    lead_id: Uuid,
) -> Result<Vec<TimelineEntry>, CrmError> {
    let rows: Vec<DbTimelineEntry> = lead_timeline::table
        .filter(lead_timeline::lead_id.eq(lead_id))
        .order(lead_timeline::created_at.desc())
        .load(conn)?;
    Ok(rows.into_iter().map(db_entry_to_entry).collect())
}

pub fn add_note(
    conn: &mut PgConnection,
    lead_id: Uuid,
    org_id: Uuid,
    actor_id: Uuid,
    req: AddNoteRequest,
) -> Result<Note, CrmError> {
    if req.content.trim().is_empty() {
        return Err(CrmError::Validation("Note content is required".to_string()));
    }

    conn.transaction(|conn| {
        let lead = get_lead(conn, lead_id, org_id)?;
        let now = Utc::now();
        let author = req.actor_id.unwrap_or(actor_id);

        let note = DbNote {
            id: Uuid::new_v4(),
            lead_id,
            content: req.content,
            author_id: Some(author),
            created_at: now,
        };
        diesel::insert_into(lead_notes::table)
            .values(&note)
            .execute(conn)?;

        let entry = DbTimelineEntry {
            id: Uuid::new_v4(),
            lead_id,
            stage: lead.stage,
            action: "Note added to lead".to_string(),
            remark: Some(note.content.clone()),
            moved_by: Some(author),
            created_at: now,
        };
        diesel::insert_into(lead_timeline::table)
            .values(&entry)
            .execute(conn)?;

        Ok(db_note_to_note(note))
    })
}

pub fn list_notes(conn: &mut PgConnection, lead_id: Uuid) -> Result<Vec<Note>, CrmError> {
    let rows: Vec<DbNote> = lead_notes::table
        .filter(lead_notes::lead_id.eq(lead_id))
        .order(lead_notes::created_at.desc())
        .load(conn)?;
    Ok(rows.into_iter().map(db_note_to_note).collect())
}

pub fn add_followup(
    conn: &mut PgConnection,
    lead_id: Uuid,
    org_id: Uuid,
    actor_id: Uuid,
    req: AddFollowupRequest,
) -> Result<Followup, CrmError> {
    let followup_type = match req.followup_type {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            return Err(CrmError::Validation(
                "Followup type is required".to_string(),
            ))
        }
    };

    // Existence check only; followups never write timeline entries.
    get_lead(conn, lead_id, org_id)?;

    let followup = DbFollowup {
        id: Uuid::new_v4(),
        lead_id,
        followup_type,
        note: req.note,
        due_at: req.due_at,
        created_by: Some(req.actor_id.unwrap_or(actor_id)),
        created_at: Utc::now(),
    };
    diesel::insert_into(lead_followups::table)
        .values(&followup)
        .execute(conn)?;

    Ok(db_followup_to_followup(followup))
}

pub fn list_followups(conn: &mut PgConnection, lead_id: Uuid) -> Result<Vec<Followup>, CrmError> {
    let rows: Vec<DbFollowup> = lead_followups::table
        .filter(lead_followups::lead_id.eq(lead_id))
        .order(lead_followups::created_at.asc())
        .load(conn)?;
    Ok(rows.into_iter().map(db_followup_to_followup).collect())
}
