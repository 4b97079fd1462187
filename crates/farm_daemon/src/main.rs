mod persist;
mod routes;
mod state;
mod store;
mod tick_loop;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use farm_control::AutopilotController;
use farm_core::{repair_state, FarmSession, GAME_STATE_KEY};
use farm_world::{build_initial_state, load_content, wall_clock_ms};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use state::{AppState, SimState};
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use store::{FileStore, KeyValueStore, MemoryStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "farm_daemon", about = "Farm simulation daemon with HTTP API")]
struct Args {
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// Directory holding `game-state.json`.
    #[arg(long, default_value = "./data")]
    data_dir: String,
    /// Keep state in memory only; nothing is read or written on disk.
    #[arg(long)]
    memory_store: bool,
    #[arg(long, default_value_t = 3001)]
    port: u16,
    #[arg(long, default_value_t = 100)]
    tick_interval_ms: u64,
    /// Minimum gap between automatic saves.
    #[arg(long, default_value_t = 2_000)]
    save_debounce_ms: u64,
    /// RNG seed for harvest rolls. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Let the autopilot play between requests.
    #[arg(long)]
    autopilot: bool,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let content = load_content(&args.content_dir)?;
    let store: Arc<dyn KeyValueStore> = if args.memory_store {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::open(&args.data_dir)?)
    };

    let now = wall_clock_ms();
    let game_state = match store.get(GAME_STATE_KEY)? {
        Some(value) => {
            tracing::info!("resuming saved farm");
            repair_state(&value, &content, now)
        }
        None => {
            tracing::info!("starting a new farm");
            build_initial_state(&content, now)
        }
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(
        seed,
        content_version = %content.content_version,
        plots = game_state.plots.len(),
        "farm loaded"
    );

    let app_state = AppState {
        sim: Arc::new(Mutex::new(SimState {
            session: FarmSession::new(content, game_state, ChaCha8Rng::seed_from_u64(seed)),
            seed,
            autopilot: args.autopilot.then(AutopilotController::default),
            ticks: 0,
        })),
        store,
        paused: Arc::new(AtomicBool::new(false)),
        tick_interval_ms: args.tick_interval_ms,
        clock: wall_clock_ms,
    };

    tokio::spawn(tick_loop::run_tick_loop(app_state.clone(), None));
    tokio::spawn(persist::run_autosave(
        app_state.clone(),
        Duration::from_millis(args.save_debounce_ms.max(1)),
    ));

    let cors_origin: HeaderValue = args
        .cors_origin
        .parse()
        .with_context(|| format!("invalid cors origin: {}", args.cors_origin))?;
    let app = routes::make_router_with_cors(app_state.clone(), cors_origin);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, app).await.context("serving HTTP")?;

    // Final flush when the server stops.
    if app_state.sim.lock().session.is_dirty() {
        persist::save_now(&app_state.sim, app_state.store.as_ref(), wall_clock_ms())?;
    }
    Ok(())
}
