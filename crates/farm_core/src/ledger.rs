//! Resource ledger math. Pure functions over `Resources` and `ResourceBundle`.
//!
//! Nothing here clamps: `deduct` can drive a field negative, so callers gate on
//! `can_afford` first when that matters.

use crate::{ResourceBundle, Resources};

/// True iff every key present in `cost` is covered by `resources`.
pub fn can_afford(resources: &Resources, cost: &ResourceBundle) -> bool {
    cost.iter()
        .all(|(kind, amount)| resources.get(*kind) >= *amount)
}

pub fn deduct(resources: &Resources, cost: &ResourceBundle) -> Resources {
    let mut next = *resources;
    for (kind, amount) in cost {
        *next.get_mut(*kind) -= amount;
    }
    next
}

pub fn add(resources: &Resources, gain: &ResourceBundle) -> Resources {
    let mut next = *resources;
    for (kind, amount) in gain {
        *next.get_mut(*kind) += amount;
    }
    next
}

/// Key-wise sum of two bundles.
pub fn merge_bundles(a: &ResourceBundle, b: &ResourceBundle) -> ResourceBundle {
    let mut merged = a.clone();
    for (kind, amount) in b {
        *merged.entry(*kind).or_insert(0.0) += amount;
    }
    merged
}

/// Scales every entry by `factor` and floors to whole units.
pub fn scale_floor(bundle: &ResourceBundle, factor: f64) -> ResourceBundle {
    bundle
        .iter()
        .map(|(kind, amount)| (*kind, (amount * factor).floor()))
        .collect()
}

/// Human-readable list of the positive entries: `"12 gold, 1 seeds"`.
pub fn format_gain(bundle: &ResourceBundle) -> String {
    bundle
        .iter()
        .filter(|(_, amount)| **amount > 0.0)
        .map(|(kind, amount)| format!("{amount} {kind}"))
        .collect::<Vec<_>>()
        .join(", ")
}
