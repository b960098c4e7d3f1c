//! End-to-end properties of the stage-flow core: transition validation,
//! timeline growth, classification, and report bucketing, exercised over
//! in-memory structures.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crmserver::leads::transition::{compose_action, validate_transition};
use crmserver::leads::types::{Followup, TimelineEntry, TransitionRequest};
use crmserver::leads::merge_activity;
use crmserver::pipelines::types::{CloseStageDef, Pipeline, StageDef};
use crmserver::reports::{
    aggregate_by_bucket, classify, conversion_rate, derive_stage_sets, LeadSnapshot, Outcome,
    ReportPeriod,
};

fn sales_pipeline() -> Pipeline {
    Pipeline {
        id: Uuid::new_v4(),
        org_id: Uuid::nil(),
        name: "Sales".to_string(),
        open_stages: vec![
            StageDef {
                id: Uuid::new_v4(),
                name: "New".to_string(),
                color: None,
            },
            StageDef {
                id: Uuid::new_v4(),
                name: "Qualified".to_string(),
                color: None,
            },
        ],
        close_stages: vec![
            CloseStageDef {
                id: Uuid::new_v4(),
                name: "Won".to_string(),
                color: None,
                won: true,
                lost: false,
            },
            CloseStageDef {
                id: Uuid::new_v4(),
                name: "Lost".to_string(),
                color: None,
                won: false,
                lost: true,
            },
        ],
        custom_fields: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Mirror of the engine's mutation: set the stage and append exactly one
/// timeline entry, as one unit.
fn apply_transition(
    stage: &mut String,
    timeline: &mut Vec<TimelineEntry>,
    new_stage: &str,
    remark: &str,
    actor: Uuid,
) {
    let request = TransitionRequest {
        new_pipeline: None,
        new_stage: Some(new_stage.to_string()),
        remark: Some(remark.to_string()),
        actor_id: Some(actor),
    };
    let transition = validate_transition(Uuid::new_v4(), request).expect("valid transition");

    *stage = transition.new_stage.clone();
    timeline.push(TimelineEntry {
        id: Uuid::new_v4(),
        lead_id: Uuid::nil(),
        stage: transition.new_stage,
        action: compose_action(None, new_stage),
        remark: Some(transition.remark),
        moved_by: Some(transition.actor_id),
        created_at: Utc::now(),
    });
}

#[test]
fn timeline_grows_by_one_per_transition() {
    let actor = Uuid::new_v4();
    let mut stage = "New".to_string();
    let mut timeline = vec![TimelineEntry {
        id: Uuid::new_v4(),
        lead_id: Uuid::nil(),
        stage: stage.clone(),
        action: "Lead created".to_string(),
        remark: None,
        moved_by: Some(actor),
        created_at: Utc::now(),
    }];

    let moves = ["Qualified", "Won", "Lost", "Qualified", "Won"];
    for (i, target) in moves.iter().enumerate() {
        apply_transition(&mut stage, &mut timeline, target, "moved", actor);
        assert_eq!(timeline.len(), i + 2);
    }

    // final stage matches the last appended entry
    assert_eq!(stage, "Won");
    assert_eq!(timeline.last().unwrap().stage, "Won");
}

#[test]
fn transition_entries_record_call_order() {
    let actor = Uuid::new_v4();
    let mut stage = "New".to_string();
    let mut timeline = Vec::new();

    apply_transition(&mut stage, &mut timeline, "Qualified", "contacted", actor);
    apply_transition(&mut stage, &mut timeline, "Won", "deal closed", actor);

    let stages: Vec<&str> = timeline.iter().map(|e| e.stage.as_str()).collect();
    assert_eq!(stages, vec!["Qualified", "Won"]);
    assert_eq!(
        timeline[1].action,
        "Stage changed to Won"
    );
    assert_eq!(timeline[1].remark.as_deref(), Some("deal closed"));
}

#[test]
fn incomplete_transition_leaves_timeline_untouched() {
    let request = TransitionRequest {
        new_pipeline: None,
        new_stage: Some("Won".to_string()),
        remark: None,
        actor_id: Some(Uuid::new_v4()),
    };
    assert!(validate_transition(Uuid::new_v4(), request).is_err());
}

#[test]
fn scenario_two_transitions_then_won() {
    let pipeline = sales_pipeline();
    let actor = Uuid::new_v4();

    let mut stage = "New".to_string();
    let mut timeline = vec![TimelineEntry {
        id: Uuid::new_v4(),
        lead_id: Uuid::nil(),
        stage: stage.clone(),
        action: "Lead created".to_string(),
        remark: None,
        moved_by: Some(actor),
        created_at: Utc::now(),
    }];

    apply_transition(&mut stage, &mut timeline, "Qualified", "contacted", actor);
    assert_eq!(stage, "Qualified");
    assert_eq!(timeline.len(), 2);

    apply_transition(&mut stage, &mut timeline, "Won", "deal closed", actor);
    assert_eq!(stage, "Won");
    assert_eq!(timeline.len(), 3);

    let (won, lost) = derive_stage_sets(std::slice::from_ref(&pipeline));
    assert_eq!(classify(&stage, &won, &lost), Outcome::Won);
}

#[test]
fn classification_tracks_current_configuration() {
    let mut pipeline = sales_pipeline();
    let (won, lost) = derive_stage_sets(std::slice::from_ref(&pipeline));
    assert_eq!(classify("Won", &won, &lost), Outcome::Won);

    // flipping the flag reclassifies historical leads at the next read
    pipeline.close_stages[0].won = false;
    pipeline.close_stages[0].lost = true;
    let (won, lost) = derive_stage_sets(std::slice::from_ref(&pipeline));
    assert_eq!(classify("Won", &won, &lost), Outcome::Lost);
}

#[test]
fn orphaned_stage_classifies_open() {
    let mut pipeline = sales_pipeline();
    let removed = pipeline.close_stages[0].id;
    assert!(pipeline.remove_stage(removed));

    let (won, lost) = derive_stage_sets(std::slice::from_ref(&pipeline));
    // leads still sitting in the removed stage are tolerated as open
    assert_eq!(classify("Won", &won, &lost), Outcome::Open);
}

#[test]
fn empty_daily_report_gap_fills_seven_buckets() {
    let pipeline = sales_pipeline();
    let (won, lost) = derive_stage_sets(std::slice::from_ref(&pipeline));

    let rows = aggregate_by_bucket(&[], ReportPeriod::Daily, Utc::now(), &won, &lost);
    assert_eq!(rows.len(), 7);
    assert!(rows
        .iter()
        .all(|r| r.won == 0 && r.lost == 0 && r.open == 0 && r.amount == 0.0));
}

#[test]
fn report_counts_follow_classification() {
    let pipeline = sales_pipeline();
    let (won, lost) = derive_stage_sets(std::slice::from_ref(&pipeline));
    let now = Utc::now();

    let leads = vec![
        LeadSnapshot {
            created_at: now - Duration::hours(1),
            stage: "Won".to_string(),
            amount: 4000.0,
        },
        LeadSnapshot {
            created_at: now - Duration::hours(2),
            stage: "Lost".to_string(),
            amount: 1000.0,
        },
        LeadSnapshot {
            created_at: now - Duration::hours(3),
            stage: "Qualified".to_string(),
            amount: 500.0,
        },
    ];

    let rows = aggregate_by_bucket(&leads, ReportPeriod::Daily, now, &won, &lost);
    let total_won: i64 = rows.iter().map(|r| r.won).sum();
    let total_lost: i64 = rows.iter().map(|r| r.lost).sum();
    let total_open: i64 = rows.iter().map(|r| r.open).sum();
    let total_amount: f64 = rows.iter().map(|r| r.amount).sum();

    assert_eq!((total_won, total_lost, total_open), (1, 1, 1));
    assert_eq!(total_amount, 5500.0);
    assert_eq!(conversion_rate(total_won, 3), 100.0 / 3.0);
}

#[test]
fn merged_activity_view_is_chronological_and_complete() {
    let now = Utc::now();
    let timeline: Vec<TimelineEntry> = (0..3)
        .map(|i| TimelineEntry {
            id: Uuid::new_v4(),
            lead_id: Uuid::nil(),
            stage: "New".to_string(),
            action: format!("Stage changed to S{i}"),
            remark: None,
            moved_by: None,
            created_at: now + Duration::minutes(i * 10),
        })
        .collect();
    let followups: Vec<Followup> = (0..2)
        .map(|i| Followup {
            id: Uuid::new_v4(),
            lead_id: Uuid::nil(),
            followup_type: "call".to_string(),
            note: None,
            due_at: None,
            created_by: None,
            created_at: now + Duration::minutes(i * 10 + 5),
        })
        .collect();

    let merged = merge_activity(&timeline, &followups);
    assert_eq!(merged.len(), 5);
    for pair in merged.windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }
}
