use crate::state::{AppState, SharedSim};
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use farm_core::{Millis, GAME_STATE_KEY};
use std::time::Duration;

/// Serializes the current snapshot under the lock, then writes it outside.
/// The session is only marked saved once the store accepts the write.
pub fn save_now(sim: &SharedSim, store: &dyn KeyValueStore, now: Millis) -> Result<Millis> {
    let (revision, value) = {
        let guard = sim.lock();
        let snapshot = guard.session.snapshot_for_save(now);
        let value = serde_json::to_value(&snapshot).context("serializing game state")?;
        (guard.session.revision(), value)
    };
    store
        .set(GAME_STATE_KEY, &value)
        .with_context(|| format!("writing {GAME_STATE_KEY}"))?;
    sim.lock().session.mark_saved(revision, now);
    Ok(now)
}

/// Writes the snapshot at most once per `debounce`, and only when the
/// session changed since the last save. A failed write leaves the session
/// dirty, so the next interval retries it.
pub async fn run_autosave(app: AppState, debounce: Duration) {
    let mut interval = tokio::time::interval(debounce);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await; // discard the immediate first tick
    loop {
        interval.tick().await;
        if !app.sim.lock().session.is_dirty() {
            continue;
        }
        match save_now(&app.sim, app.store.as_ref(), (app.clock)()) {
            Ok(at) => tracing::info!(at, "autosaved"),
            Err(err) => tracing::warn!("autosave failed: {err:#}"),
        }
    }
}
