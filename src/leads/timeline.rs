use super::types::{ActivityEntry, ActivityKind, Followup, TimelineEntry};

/// Merge a lead's timeline with its followups into one newest-first view.
/// Both inputs arrive in ascending storage order; the merge walks them from
/// the back and never touches either source collection.
pub fn merge_activity(timeline: &[TimelineEntry], followups: &[Followup]) -> Vec<ActivityEntry> {
    let mut merged = Vec::with_capacity(timeline.len() + followups.len());

    let mut t = timeline.len();
    let mut f = followups.len();

    while t > 0 || f > 0 {
        let take_timeline = match (t, f) {
            (0, _) => false,
            (_, 0) => true,
            _ => timeline[t - 1].created_at >= followups[f - 1].created_at,
        };

        if take_timeline {
            t -= 1;
            let entry = &timeline[t];
            merged.push(ActivityEntry {
                kind: ActivityKind::Timeline,
                timestamp: entry.created_at,
                stage: Some(entry.stage.clone()),
                action: Some(entry.action.clone()),
                remark: entry.remark.clone(),
                followup_type: None,
                note: None,
                actor_id: entry.moved_by,
            });
        } else {
            f -= 1;
            let followup = &followups[f];
            merged.push(ActivityEntry {
                kind: ActivityKind::Followup,
                timestamp: followup.created_at,
                stage: None,
                action: None,
                remark: None,
                followup_type: Some(followup.followup_type.clone()),
                note: followup.note.clone(),
                actor_id: followup.created_by,
            });
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn entry(offset_mins: i64) -> TimelineEntry {
        TimelineEntry {
            id: Uuid::new_v4(),
            lead_id: Uuid::nil(),
            stage: "New".to_string(),
            action: "Lead created".to_string(),
            remark: None,
            moved_by: None,
            created_at: Utc::now() + Duration::minutes(offset_mins),
        }
    }

    fn followup(offset_mins: i64) -> Followup {
        Followup {
            id: Uuid::new_v4(),
            lead_id: Uuid::nil(),
            followup_type: "call".to_string(),
            note: Some("call back".to_string()),
            due_at: None,
            created_by: None,
            created_at: Utc::now() + Duration::minutes(offset_mins),
        }
    }

    #[test]
    fn merge_is_newest_first() {
        let timeline = vec![entry(0), entry(10), entry(30)];
        let followups = vec![followup(5), followup(20)];

        let merged = merge_activity(&timeline, &followups);
        assert_eq!(merged.len(), 5);
        for pair in merged.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
        assert_eq!(merged[0].kind, ActivityKind::Timeline);
        assert_eq!(merged[1].kind, ActivityKind::Followup);
    }

    #[test]
    fn merge_with_empty_followups() {
        let timeline = vec![entry(0), entry(10)];
        let merged = merge_activity(&timeline, &[]);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|e| e.kind == ActivityKind::Timeline));
    }

    #[test]
    fn merge_with_empty_timeline() {
        let followups = vec![followup(0)];
        let merged = merge_activity(&[], &followups);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].followup_type.as_deref(), Some("call"));
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        assert!(merge_activity(&[], &[]).is_empty());
    }

    #[test]
    fn merge_does_not_mutate_sources() {
        let timeline = vec![entry(0), entry(10)];
        let followups = vec![followup(5)];
        let before: Vec<_> = timeline.iter().map(|e| e.id).collect();
        let _ = merge_activity(&timeline, &followups);
        let after: Vec<_> = timeline.iter().map(|e| e.id).collect();
        assert_eq!(before, after);
        assert_eq!(followups.len(), 1);
    }
}
