//! # KitFlow Tracker
//!
//! The stage-tracking state model: a fixed, canonically ordered set of
//! fulfillment stages attached to each project, with a cascade rule that
//! keeps them consistent whenever the current stage moves.
//!
//! All functions here are pure over the aggregate plus an explicit
//! clock; persistence is the caller's concern.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use kitflow_core::{Stage, StageKey, StageStatus, TrackedProject};

/// Moves `project` to `new_stage` and recomputes every other stage so
/// the aggregate holds the completed-prefix / in-progress-current /
/// pending-suffix shape.
///
/// Stages before the target become `completed`; a completion timestamp
/// already recorded is kept, otherwise `now` is stamped. The target
/// becomes `in_progress` at `now`. Stages after the target go back to
/// `pending` with their timestamps cleared, so jumping backward fully
/// resets the suffix. Notes and images are left alone on every stage.
///
/// Jumping forward or backward by any distance is allowed, and re-running
/// with the same target converges to the same state.
pub fn advance_stage(project: &mut TrackedProject, new_stage: StageKey, now: DateTime<Utc>) {
    let target = new_stage.index();

    for key in StageKey::ALL {
        let stage = project.stages.entry(key).or_insert_with(Stage::pending);
        match key.index().cmp(&target) {
            std::cmp::Ordering::Less => {
                stage.status = StageStatus::Completed;
                if stage.timestamp.is_none() {
                    stage.timestamp = Some(now);
                }
            }
            std::cmp::Ordering::Equal => {
                stage.status = StageStatus::InProgress;
                stage.timestamp = Some(now);
            }
            std::cmp::Ordering::Greater => {
                stage.status = StageStatus::Pending;
                stage.timestamp = None;
            }
        }
    }

    project.current_stage = new_stage;
    project.updated_at = now;
}

/// Sets only the notes of one stage. Status, timestamps, and the current
/// stage pointer are untouched; setting notes on a pending stage is
/// allowed (pre-staging operator comments).
pub fn update_notes(project: &mut TrackedProject, stage: StageKey, notes: Option<String>) {
    project
        .stages
        .entry(stage)
        .or_insert_with(Stage::pending)
        .notes = notes;
}

/// Sets only the image reference of one stage.
pub fn update_image(project: &mut TrackedProject, stage: StageKey, image_url: Option<String>) {
    project
        .stages
        .entry(stage)
        .or_insert_with(Stage::pending)
        .image_url = image_url;
}

/// Progress through the workflow as a percentage.
///
/// A pure function of the current-stage pointer; per-stage statuses are
/// not consulted.
pub fn progress_percentage(project: &TrackedProject) -> f64 {
    let total = StageKey::ALL.len() as f64;
    ((project.current_stage.index() + 1) as f64 / total) * 100.0
}

/// Stage map for a freshly approved project: the first canonical stage
/// in progress at `now` with the given note, everything else pending.
pub fn new_project_stages(now: DateTime<Utc>, first_note: Option<String>) -> BTreeMap<StageKey, Stage> {
    let mut stages = BTreeMap::new();
    for key in StageKey::ALL {
        stages.insert(key, Stage::pending());
    }

    let first = StageKey::ALL[0];
    stages.insert(
        first,
        Stage {
            status: StageStatus::InProgress,
            timestamp: Some(now),
            notes: first_note,
            image_url: None,
        },
    );

    stages
}
