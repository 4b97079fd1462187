use crate::store::KeyValueStore;
use farm_control::AutopilotController;
use farm_core::{FarmSession, Millis};
use parking_lot::Mutex;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub struct SimState {
    pub session: FarmSession<ChaCha8Rng>,
    pub seed: u64,
    /// Plays intents on every tick when set.
    pub autopilot: Option<AutopilotController>,
    pub ticks: u64,
}

pub type SharedSim = Arc<Mutex<SimState>>;

/// Source of "now" for ticks and intents. Tests pin it.
pub type Clock = fn() -> Millis;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub store: Arc<dyn KeyValueStore>,
    pub paused: Arc<AtomicBool>,
    pub tick_interval_ms: u64,
    pub clock: Clock,
}
