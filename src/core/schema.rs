diesel::table! {
    pipelines (id) {
        id -> Uuid,
        org_id -> Uuid,
        name -> Varchar,
        open_stages -> Jsonb,
        close_stages -> Jsonb,
        custom_fields -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    leads (id) {
        id -> Uuid,
        org_id -> Uuid,
        lead_code -> Varchar,
        name -> Varchar,
        email -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        source -> Nullable<Varchar>,
        pipeline_id -> Uuid,
        stage -> Varchar,
        amount -> Nullable<Float8>,
        close_date -> Nullable<Date>,
        assigned_to -> Nullable<Uuid>,
        files -> Array<Text>,
        audio_recordings -> Array<Text>,
        links -> Array<Text>,
        custom_fields -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    lead_timeline (id) {
        id -> Uuid,
        lead_id -> Uuid,
        stage -> Varchar,
        action -> Varchar,
        remark -> Nullable<Text>,
        moved_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    lead_notes (id) {
        id -> Uuid,
        lead_id -> Uuid,
        content -> Text,
        author_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    lead_followups (id) {
        id -> Uuid,
        lead_id -> Uuid,
        followup_type -> Varchar,
        note -> Nullable<Text>,
        due_at -> Nullable<Timestamptz>,
        created_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    lead_sequences (org_id) {
        org_id -> Uuid,
        next_seq -> Int8,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    pipelines,
    leads,
    lead_timeline,
    lead_notes,
    lead_followups,
);
