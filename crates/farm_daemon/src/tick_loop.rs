use crate::state::{AppState, SimState};
use farm_control::IntentSource;
use farm_core::Millis;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// One loop iteration: autopilot intents (if enabled), then the production
/// tick. Returns the number of achievements completed.
pub fn step(sim: &mut SimState, now: Millis) -> usize {
    let SimState {
        session,
        autopilot,
        ticks,
        ..
    } = sim;
    if let Some(autopilot) = autopilot {
        let intents = autopilot.generate_intents(session.state(), session.content(), now);
        for intent in &intents {
            if let Err(err) = session.apply_intent(intent, now) {
                tracing::debug!(?intent, "autopilot intent rejected: {err}");
            }
        }
    }
    let report = session.tick(now);
    for achievement in &report.achievements {
        tracing::info!(%achievement, "achievement unlocked");
    }
    *ticks += 1;
    report.achievements.len()
}

pub async fn run_tick_loop(app: AppState, max_ticks: Option<u64>) {
    let mut interval = tokio::time::interval(Duration::from_millis(app.tick_interval_ms.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        if app.paused.load(Ordering::Relaxed) {
            continue;
        }
        let done = {
            let mut guard = app.sim.lock();
            step(&mut guard, (app.clock)());
            max_ticks.is_some_and(|max| guard.ticks >= max)
        };
        if done {
            break;
        }
    }
}
