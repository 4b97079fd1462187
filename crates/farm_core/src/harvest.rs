//! Harvest roll: a random yield bonus drawn once per harvest.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{ledger, ResourceBundle};

const BASE_CRITICAL_CHANCE: f64 = 0.10;
const CRITICAL_CHANCE_PER_LUCK: f64 = 0.02;

const CRITICAL_BASE: f64 = 1.5;
const CRITICAL_SPREAD: f64 = 0.5;
const CRITICAL_PER_LUCK: f64 = 0.1;

const NORMAL_BASE: f64 = 0.75;
const NORMAL_SPREAD: f64 = 0.75;
const NORMAL_PER_LUCK: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarvestRoll {
    pub multiplier: f64,
    pub is_critical: bool,
    /// `multiplier` as a rounded percentage, for display.
    pub roll_value: u32,
}

impl HarvestRoll {
    pub fn from_multiplier(multiplier: f64, is_critical: bool) -> Self {
        Self {
            multiplier,
            is_critical,
            roll_value: roll_value(multiplier),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn roll_value(multiplier: f64) -> u32 {
    (multiplier * 100.0).round().max(0.0) as u32
}

/// Chance in `[0, ∞)` that a harvest at `luck_level` is critical. Not capped;
/// content keeps luck small enough that this stays below 1.
pub fn critical_chance(luck_level: f64) -> f64 {
    BASE_CRITICAL_CHANCE + luck_level * CRITICAL_CHANCE_PER_LUCK
}

pub fn roll_harvest_bonus(luck_level: f64, rng: &mut impl Rng) -> HarvestRoll {
    let roll: f64 = rng.gen();
    if roll < critical_chance(luck_level) {
        let spread: f64 = rng.gen_range(0.0..CRITICAL_SPREAD);
        let multiplier = CRITICAL_BASE + spread + luck_level * CRITICAL_PER_LUCK;
        return HarvestRoll::from_multiplier(multiplier, true);
    }
    let spread: f64 = rng.gen_range(0.0..NORMAL_SPREAD);
    let multiplier = NORMAL_BASE + spread + luck_level * NORMAL_PER_LUCK;
    HarvestRoll::from_multiplier(multiplier, false)
}

/// Scales each yield entry by the roll and floors it.
pub fn apply_harvest_bonus(base_yield: &ResourceBundle, bonus: &HarvestRoll) -> ResourceBundle {
    ledger::scale_floor(base_yield, bonus.multiplier)
}
