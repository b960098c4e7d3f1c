use std::collections::HashSet;

use crate::pipelines::types::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Open,
    Won,
    Lost,
}

/// Flatten close-stage won/lost flags across pipelines into name sets.
/// No deduplication across pipelines: a name flagged won in one pipeline
/// and lost in another lands in both sets.
pub fn derive_stage_sets(pipelines: &[Pipeline]) -> (HashSet<String>, HashSet<String>) {
    let mut won = HashSet::new();
    let mut lost = HashSet::new();

    for pipeline in pipelines {
        for stage in &pipeline.close_stages {
            if stage.won {
                won.insert(stage.name.clone());
            }
            if stage.lost {
                lost.insert(stage.name.clone());
            }
        }
    }

    (won, lost)
}

/// Exact, case-sensitive match; Won is checked before Lost, which resolves
/// names flagged both ways. Unknown or orphaned stage names are Open.
pub fn classify(stage: &str, won: &HashSet<String>, lost: &HashSet<String>) -> Outcome {
    if won.contains(stage) {
        Outcome::Won
    } else if lost.contains(stage) {
        Outcome::Lost
    } else {
        Outcome::Open
    }
}
