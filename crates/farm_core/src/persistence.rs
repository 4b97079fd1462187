//! Defensive decode of a persisted `"game-state"` record.
//!
//! `repair_state` accepts any JSON value and always produces a valid
//! `GameState`. Fields are read one by one so a single bad value never costs
//! the rest of the save. Both the current snake_case layout and the older
//! camelCase layout are understood. Repair is pure and idempotent.

use serde_json::{Map, Value};

use crate::{
    modifiers, ActivityLogEntry, AchievementId, Counters, GameContent, GameState, Millis,
    PlotContents, PlotState, QueueTask, ResourceKind, Resources, TechId,
};

/// Store key the snapshot lives under.
pub const GAME_STATE_KEY: &str = "game-state";

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| obj.get(*name))
}

fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

/// Non-negative integers only; floats are truncated the way old saves wrote them.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn millis(value: Option<&Value>) -> Option<Millis> {
    match value? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64)),
        _ => None,
    }
}

fn string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn repair_resources(value: Option<&Value>, starting: &Resources) -> Resources {
    let obj = value.and_then(Value::as_object);
    let mut resources = *starting;
    for kind in ResourceKind::ALL {
        if let Some(amount) = finite(obj.and_then(|o| o.get(kind.as_str()))) {
            *resources.get_mut(kind) = amount;
        }
    }
    resources
}

fn repair_contents(obj: &Map<String, Value>, now: Millis) -> PlotContents {
    let kind = field(obj, &["type"]).and_then(Value::as_str).unwrap_or("empty");
    let at = |names: &[&str]| millis(field(obj, names)).unwrap_or(now);
    match kind {
        "crop" => match string(field(obj, &["crop_id", "cropId"])) {
            Some(crop_id) => PlotContents::Crop {
                crop_id: crop_id.into(),
                planted_at: at(&["planted_at", "plantedAt"]),
                completes_at: at(&["completes_at", "completesAt"]),
            },
            None => PlotContents::Empty,
        },
        "building" => match string(field(obj, &["building_id", "buildingId"])) {
            Some(building_id) => PlotContents::Building {
                building_id: building_id.into(),
                placed_at: at(&["placed_at", "placedAt", "plantedAt"]),
                last_production: at(&["last_production", "lastProduction"]),
            },
            None => PlotContents::Empty,
        },
        "animal" => match string(field(obj, &["animal_id", "animalId"])) {
            Some(animal_id) => PlotContents::Animal {
                animal_id: animal_id.into(),
                placed_at: at(&["placed_at", "placedAt", "plantedAt"]),
                last_production: at(&["last_production", "lastProduction"]),
                last_fed: at(&["last_fed", "lastFed"]),
            },
            None => PlotContents::Empty,
        },
        _ => PlotContents::Empty,
    }
}

/// Plot ids are positional, so they are re-derived from the index.
fn repair_plots(value: Option<&Value>, plot_count: usize, now: Millis) -> Vec<PlotState> {
    let stored = value.and_then(Value::as_array);
    (0..plot_count)
        .map(|index| {
            let mut plot = PlotState::empty(index);
            if let Some(obj) = stored.and_then(|plots| plots.get(index)).and_then(Value::as_object)
            {
                plot.contents = repair_contents(obj, now);
            }
            plot
        })
        .collect()
}

/// Keeps the first occurrence of each string id, in stored order.
fn dedup_ids<T: From<String> + PartialEq>(value: Option<&Value>) -> Vec<T> {
    let mut ids: Vec<T> = Vec::new();
    for id in value.and_then(Value::as_array).into_iter().flatten() {
        let Some(id) = id.as_str() else { continue };
        let id = T::from(id.to_string());
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Decodes each element independently, dropping the ones that do not parse.
fn lenient_list<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

fn log_sequence(entry: &ActivityLogEntry) -> Option<u64> {
    entry.id.0.strip_prefix("log_")?.parse().ok()
}

/// Builds a valid state from whatever was stored. `Value::Null` yields a fresh farm.
pub fn repair_state(value: &Value, content: &GameContent, now: Millis) -> GameState {
    let constants = &content.constants;
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    let mut activity_log: Vec<ActivityLogEntry> =
        lenient_list(field(obj, &["activity_log", "activityLog"]));
    activity_log.truncate(constants.activity_log_capacity);

    let stored_counter = field(obj, &["counters"])
        .and_then(Value::as_object)
        .and_then(|c| millis(c.get("next_log_id")))
        .unwrap_or(0);
    let next_log_id = activity_log
        .iter()
        .filter_map(log_sequence)
        .map(|n| n + 1)
        .fold(stored_counter, u64::max);

    let techs: Vec<TechId> = dedup_ids(field(obj, &["techs"]));
    let luck_level = modifiers::luck_level(&techs, content);

    let count = |names: &[&str]| millis(field(obj, names)).unwrap_or(0);

    GameState {
        resources: repair_resources(field(obj, &["resources"]), &constants.starting_resources),
        plots: repair_plots(field(obj, &["plots"]), constants.plot_count, now),
        queue: lenient_list::<QueueTask>(field(obj, &["queue"])),
        achievements: dedup_ids::<AchievementId>(field(obj, &["achievements"])),
        techs,
        activity_log,
        counters: Counters { next_log_id },
        total_harvested: count(&["total_harvested", "totalHarvested"]),
        total_gold_earned: finite(field(obj, &["total_gold_earned", "totalGoldEarned"]))
            .unwrap_or(0.0),
        total_animal_products: count(&["total_animal_products", "totalAnimalProducts"]),
        critical_harvest_count: count(&["critical_harvest_count", "criticalHarvestCount"]),
        luck_level,
        prestige_level: u32::try_from(count(&["prestige_level", "prestigeLevel"])).unwrap_or(0),
        prestige_multiplier: finite(field(obj, &["prestige_multiplier", "prestigeMultiplier"]))
            .filter(|m| *m > 0.0)
            .unwrap_or(1.0),
        start_time: millis(field(obj, &["start_time", "startTime"])).unwrap_or(now),
        last_save_time: millis(field(obj, &["last_save_time", "lastSaveTime"])).unwrap_or(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, base_state, crop_at};
    use serde_json::json;

    fn round_trip(state: &GameState, content: &GameContent, now: Millis) -> GameState {
        let value = serde_json::to_value(state).unwrap();
        repair_state(&value, content, now)
    }

    #[test]
    fn null_becomes_fresh_farm() {
        let content = base_content();
        let state = repair_state(&Value::Null, &content, 77);
        assert_eq!(state, GameState::fresh(&content.constants, 77));
    }

    #[test]
    fn valid_state_survives_unchanged() {
        let content = base_content();
        let mut state = base_state(&content);
        state.plots[2].contents = crop_at("wheat", 5, 10_005);
        state.techs = vec!["tech_root_crops".into()];
        state.total_harvested = 4;
        assert_eq!(round_trip(&state, &content, 999), state);
    }

    #[test]
    fn bad_resources_fall_back_to_starting_values() {
        let content = base_content();
        let value = json!({
            "resources": { "gold": "lots", "seeds": 3.0, "water": null },
        });
        let state = repair_state(&value, &content, 0);
        assert!((state.resources.gold - 150.0).abs() < 1e-9);
        assert!((state.resources.seeds - 3.0).abs() < 1e-9);
        assert!((state.resources.water - 30.0).abs() < 1e-9);
        assert!(state.resources.is_finite());
    }

    #[test]
    fn plot_list_is_padded_and_truncated() {
        let content = base_content();
        let short = json!({ "plots": [{ "type": "crop", "crop_id": "wheat", "planted_at": 1, "completes_at": 2 }] });
        let state = repair_state(&short, &content, 0);
        assert_eq!(state.plots.len(), 20);
        assert_eq!(state.plots[0].contents, crop_at("wheat", 1, 2));
        assert!(state.plots[19].is_empty());

        let long: Vec<Value> = (0..30).map(|_| json!({ "type": "empty" })).collect();
        let state = repair_state(&json!({ "plots": long }), &content, 0);
        assert_eq!(state.plots.len(), 20);
    }

    #[test]
    fn garbage_plots_become_empty_and_missing_times_default_to_now() {
        let content = base_content();
        let value = json!({
            "plots": [
                { "type": "crop" },
                42,
                { "type": "animal", "animal_id": "chicken" },
                { "type": "greenhouse" },
            ],
        });
        let state = repair_state(&value, &content, 500);
        assert!(state.plots[0].is_empty());
        assert!(state.plots[1].is_empty());
        assert_eq!(
            state.plots[2].contents,
            crate::test_fixtures::animal_at("chicken", 500)
        );
        assert!(state.plots[3].is_empty());
    }

    #[test]
    fn camel_case_saves_are_understood() {
        let content = base_content();
        let value = json!({
            "resources": { "gold": 900 },
            "plots": [{ "id": "plot-0", "type": "building", "buildingId": "well", "lastProduction": 10, "placedAt": 5, "level": 1 }],
            "totalHarvested": 12,
            "prestigeMultiplier": 2.0,
            "startTime": 3,
        });
        let state = repair_state(&value, &content, 100);
        assert!((state.resources.gold - 900.0).abs() < 1e-9);
        assert_eq!(state.total_harvested, 12);
        assert!((state.prestige_multiplier - 2.0).abs() < 1e-9);
        assert_eq!(state.start_time, 3);
        assert_eq!(state.last_save_time, 100);
        assert_eq!(
            state.plots[0].contents,
            PlotContents::Building {
                building_id: "well".into(),
                placed_at: 5,
                last_production: 10,
            }
        );
    }

    #[test]
    fn legacy_queue_entries_survive_and_can_be_cancelled() {
        let content = base_content();
        let value = json!({
            "queue": [{
                "id": "task_1", "type": "plant", "targetId": "wheat", "plotId": "plot-0",
                "startedAt": 0, "completesAt": 100, "status": "queued",
            }],
            "plots": [{ "id": "plot-0", "type": "animal", "animalId": "chicken", "plantedAt": 7, "lastProduction": 9, "lastFed": 8 }],
        });
        let state = repair_state(&value, &content, 1_000);
        assert_eq!(state.queue.len(), 1);
        let task = &state.queue[0];
        assert_eq!(task.target_id, "wheat");
        assert_eq!(task.plot_id, Some(crate::plot_id_for_index(0)));
        assert_eq!((task.started_at, task.completes_at), (0, 100));
        assert_eq!(
            state.plots[0].contents,
            PlotContents::Animal {
                animal_id: "chicken".into(),
                placed_at: 7,
                last_production: 9,
                last_fed: 8,
            }
        );

        let outcome = crate::queue::cancel_task(&state, &"task_1".into(), 1_000);
        assert!(outcome.applied);
        assert!(outcome.state.queue.is_empty());
    }

    #[test]
    fn duplicate_ids_are_dropped() {
        let content = base_content();
        let value = json!({
            "techs": ["tech_root_crops", "tech_chickens", "tech_root_crops", 7],
            "achievements": ["first_harvest", "first_harvest"],
        });
        let state = repair_state(&value, &content, 0);
        assert_eq!(
            state.techs,
            vec![TechId::from("tech_root_crops"), TechId::from("tech_chickens")]
        );
        assert_eq!(state.achievements.len(), 1);
    }

    #[test]
    fn log_is_truncated_and_counter_stays_ahead() {
        let content = base_content();
        let entries: Vec<Value> = (0..300_u64)
            .rev()
            .map(|i| json!({ "id": format!("log_{i}"), "timestamp": i, "type": "harvest", "message": "x" }))
            .collect();
        let state = repair_state(&json!({ "activity_log": entries }), &content, 0);
        assert_eq!(state.activity_log.len(), 200);
        assert_eq!(state.counters.next_log_id, 300);
    }

    #[test]
    fn luck_is_rederived_and_multiplier_defaults() {
        let content = base_content();
        let value = json!({
            "techs": ["tech_root_crops", "tech_chickens", "tech_lucky_charm"],
            "luck_level": 50.0,
            "prestige_multiplier": -3.0,
        });
        let state = repair_state(&value, &content, 0);
        assert!((state.luck_level - 1.0).abs() < 1e-9);
        assert!((state.prestige_multiplier - 1.0).abs() < 1e-9);
    }

    #[test]
    fn repair_is_idempotent() {
        let content = base_content();
        let messy = json!({
            "resources": { "gold": 12.5, "hay": "x" },
            "plots": [{ "type": "crop", "cropId": "wheat" }, null],
            "techs": ["tech_chickens", "tech_chickens"],
            "activity_log": [{ "id": "log_4", "timestamp": 1, "type": "plant", "message": "m" }, "junk"],
            "queue": [{ "bad": true }],
        });
        let once = repair_state(&messy, &content, 321);
        let twice = round_trip(&once, &content, 9_999);
        assert_eq!(once, twice);
    }
}
