//! Task view over growing crops, plus cancellation.
//!
//! Per-plot timestamps are the source of truth. `pending_tasks` derives one
//! task per growing crop; stored `GameState::queue` entries only exist in old
//! saves and can be cancelled but are never created.

use crate::commands::CommandOutcome;
use crate::{GameState, Millis, PlotContents, PlotId, QueueTask, TaskId, TaskKind, TaskStatus};

const DERIVED_TASK_PREFIX: &str = "task-";

pub fn task_id_for_plot(plot_id: &PlotId) -> TaskId {
    TaskId(format!("{DERIVED_TASK_PREFIX}{plot_id}"))
}

/// One `processing` task per crop plot that is still growing at `now`,
/// in grid order.
pub fn pending_tasks(state: &GameState, now: Millis) -> Vec<QueueTask> {
    state
        .plots
        .iter()
        .filter_map(|plot| match &plot.contents {
            PlotContents::Crop {
                crop_id,
                planted_at,
                completes_at,
            } if *completes_at > now => Some(QueueTask {
                id: task_id_for_plot(&plot.id),
                kind: TaskKind::Plant,
                target_id: crop_id.0.clone(),
                plot_id: Some(plot.id.clone()),
                started_at: *planted_at,
                completes_at: *completes_at,
                status: TaskStatus::Processing,
            }),
            _ => None,
        })
        .collect()
}

/// Removes a stored task with this id, or abandons the growing crop a derived
/// task id points at. The crop's cost is not refunded. Unknown ids are no-ops.
pub fn cancel_task(state: &GameState, task_id: &TaskId, now: Millis) -> CommandOutcome {
    if state.queue.iter().any(|task| &task.id == task_id) {
        let mut next = state.clone();
        next.queue.retain(|task| &task.id != task_id);
        return applied(next);
    }

    let growing = state.plots.iter().position(|plot| {
        &task_id_for_plot(&plot.id) == task_id
            && matches!(plot.contents, PlotContents::Crop { completes_at, .. } if completes_at > now)
    });
    let Some(index) = growing else {
        tracing::debug!(%task_id, "cancel_task: no such task");
        return CommandOutcome::unchanged(state);
    };
    let mut next = state.clone();
    next.plots[index].contents = PlotContents::Empty;
    applied(next)
}

fn applied(state: GameState) -> CommandOutcome {
    CommandOutcome {
        state,
        applied: true,
        log: Vec::new(),
        roll: None,
    }
}
