use crate::{ActivityLogEntry, GameState, LogEntryId, LogKind, Millis, ResourceBundle};

/// Prepends an entry (newest first) and trims the log to `capacity`.
/// Returns a copy of the entry for callers that report it.
pub fn record(
    state: &mut GameState,
    kind: LogKind,
    message: impl Into<String>,
    resources: Option<ResourceBundle>,
    now: Millis,
    capacity: usize,
) -> ActivityLogEntry {
    let id = LogEntryId(format!("log_{}", state.counters.next_log_id));
    state.counters.next_log_id += 1;
    let entry = ActivityLogEntry {
        id,
        timestamp: now,
        kind,
        message: message.into(),
        resources,
    };
    state.activity_log.insert(0, entry.clone());
    state.activity_log.truncate(capacity);
    entry
}
