//! `farm_core`: deterministic farm simulation and progression rules.
//!
//! No IO, no clock. Callers pass `now` in milliseconds and a `rand::Rng`.

pub mod achievements;
mod activity;
mod cache;
pub mod commands;
mod engine;
mod error;
pub mod harvest;
pub mod ledger;
pub mod metrics;
pub mod modifiers;
mod persistence;
pub mod production;
pub mod queue;
#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;
mod types;
pub mod unlocks;

pub use activity::record as record_activity;
pub use cache::FifoCache;
pub use commands::CommandOutcome;
pub use engine::{FarmSession, TickReport};
pub use error::CommandError;
pub use harvest::HarvestRoll;
pub use metrics::{compute_metrics, write_metrics_csv, MetricsSnapshot};
pub use modifiers::Modifiers;
pub use persistence::{repair_state, GAME_STATE_KEY};
pub use types::*;
pub use unlocks::{TechStatus, UnlockSet};

#[cfg(test)]
mod tests;
