use crate::persist::save_now;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use farm_core::{CommandError, Intent, Millis, GAME_STATE_KEY};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, HeaderValue::from_static("http://localhost:5173"))
}

pub fn make_router_with_cors(state: AppState, cors_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/unlocks", get(unlocks_handler))
        .route("/api/v1/tasks", get(tasks_handler))
        .route("/api/v1/intent", post(intent_handler))
        .route("/api/v1/stream", get(stream_handler))
        .route("/api/v1/save", post(save_handler))
        .route("/api/v1/pause", post(pause_handler))
        .route("/api/v1/resume", post(resume_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
pub struct MetaResponse {
    pub content_version: String,
    pub seed: u64,
    pub ticks: u64,
    pub now: Millis,
    pub tick_interval_ms: u64,
    pub paused: bool,
    pub dirty: bool,
    pub autopilot: bool,
}

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<MetaResponse> {
    let sim = app_state.sim.lock();
    Json(MetaResponse {
        content_version: sim.session.content().content_version.clone(),
        seed: sim.seed,
        ticks: sim.ticks,
        now: (app_state.clock)(),
        tick_interval_ms: app_state.tick_interval_ms,
        paused: app_state.paused.load(Ordering::Relaxed),
        dirty: sim.session.is_dirty(),
        autopilot: sim.autopilot.is_some(),
    })
}

pub async fn snapshot_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let sim = app_state.sim.lock();
    match serde_json::to_string(sim.session.state()) {
        Ok(json) => {
            drop(sim);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                json,
            )
        }
        Err(err) => {
            tracing::error!("snapshot serialization failed: {err}");
            drop(sim);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

pub async fn unlocks_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let mut sim = app_state.sim.lock();
    let unlocks = sim.session.unlocks().clone();
    let techs = sim.session.tech_statuses();
    let modifiers = sim.session.modifiers();
    Json(serde_json::json!({
        "unlocks": unlocks,
        "techs": techs,
        "modifiers": modifiers,
    }))
}

pub async fn tasks_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let now = (app_state.clock)();
    let sim = app_state.sim.lock();
    Json(serde_json::json!({ "tasks": sim.session.pending_tasks(now) }))
}

fn rejection_status(err: &CommandError) -> StatusCode {
    match err {
        CommandError::InsufficientResources => StatusCode::PAYMENT_REQUIRED,
        CommandError::Locked { .. } | CommandError::PrerequisitesMissing { .. } => {
            StatusCode::FORBIDDEN
        }
        CommandError::PlotOccupied
        | CommandError::NotReady
        | CommandError::NotACrop
        | CommandError::AlreadyPurchased => StatusCode::CONFLICT,
    }
}

/// Applies one intent under the session lock. Rejections carry the error
/// message; unknown references answer 200 with `applied: false`.
pub async fn intent_handler(
    State(app_state): State<AppState>,
    Json(intent): Json<Intent>,
) -> (StatusCode, Json<serde_json::Value>) {
    let now = (app_state.clock)();
    let mut sim = app_state.sim.lock();
    match sim.session.apply_intent(&intent, now) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "applied": outcome.applied,
                "log": outcome.log,
                "roll": outcome.roll,
                "resources": sim.session.state().resources,
            })),
        ),
        Err(err) => {
            tracing::debug!(?intent, "intent rejected: {err}");
            (
                rejection_status(&err),
                Json(serde_json::json!({ "error": err.to_string() })),
            )
        }
    }
}

pub async fn save_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let now = (app_state.clock)();
    match save_now(&app_state.sim, app_state.store.as_ref(), now) {
        Ok(saved_at) => {
            tracing::info!(saved_at, "game saved");
            (
                StatusCode::OK,
                Json(serde_json::json!({"key": GAME_STATE_KEY, "last_save_time": saved_at})),
            )
        }
        Err(err) => {
            tracing::error!("save failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": format!("{err:#}")})),
            )
        }
    }
}

pub async fn pause_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(true, Ordering::Relaxed);
    Json(serde_json::json!({"paused": true}))
}

pub async fn resume_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(false, Ordering::Relaxed);
    Json(serde_json::json!({"paused": false}))
}

/// Server-sent events: one `saved` event per store write, plus a heartbeat
/// with the tick count.
pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.store.subscribe();
    let sim = app_state.sim.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(1));
        heartbeat.tick().await; // discard the immediate first tick
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(key) => {
                            let data = serde_json::json!({"saved": key});
                            yield Ok(Event::default().event("saved").data(data.to_string()));
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = heartbeat.tick() => {
                    let ticks = sim.lock().ticks;
                    let hb = serde_json::json!({"heartbeat": true, "ticks": ticks});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
