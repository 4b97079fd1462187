//! Content loading and farm setup shared between farm_cli and farm_daemon.

use anyhow::{Context, Result};
use farm_core::{
    repair_state, AchievementDef, AnimalDef, BuildingDef, Constants, CropDef, GameContent,
    GameState, Millis, TechDef, TechEffect, TechId,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Deserialize)]
struct TechsFile {
    content_version: String,
    techs: Vec<TechDef>,
}

#[derive(Deserialize)]
struct CropsFile {
    crops: Vec<CropDef>,
}

#[derive(Deserialize)]
struct AnimalsFile {
    animals: Vec<AnimalDef>,
}

#[derive(Deserialize)]
struct BuildingsFile {
    buildings: Vec<BuildingDef>,
}

#[derive(Deserialize)]
struct AchievementsFile {
    achievements: Vec<AchievementDef>,
}

fn assert_unique<'a>(table: &str, ids: impl Iterator<Item = &'a str>) {
    let mut seen = HashSet::new();
    for id in ids {
        assert!(!id.is_empty(), "{table} has an entry with an empty id");
        assert!(seen.insert(id), "{table} id '{id}' is defined twice");
    }
}

fn effect_value(effect: TechEffect) -> Option<f64> {
    match effect {
        TechEffect::Unlock => None,
        TechEffect::GrowthSpeed { value }
        | TechEffect::YieldMultiplier { value }
        | TechEffect::WaterCost { value }
        | TechEffect::EnergyProduction { value }
        | TechEffect::FertilizerEfficiency { value }
        | TechEffect::AnimalProduction { value }
        | TechEffect::AnimalYield { value }
        | TechEffect::CropRotation { value }
        | TechEffect::MasterMultiplier { value }
        | TechEffect::Luck { value } => Some(value),
    }
}

/// Validates cross-references in loaded content, panicking on any authoring error.
///
/// Catches mistakes like: a crop gated on a tech that doesn't exist, a tech
/// prereq pointing at a later tier, or a multiplier of zero.
pub fn validate_content(content: &GameContent) {
    assert_unique("crops", content.crops.iter().map(|c| c.id.0.as_str()));
    assert_unique("animals", content.animals.iter().map(|a| a.id.0.as_str()));
    assert_unique("buildings", content.buildings.iter().map(|b| b.id.0.as_str()));
    assert_unique("techs", content.techs.iter().map(|t| t.id.0.as_str()));
    assert_unique(
        "achievements",
        content.achievements.iter().map(|a| a.id.0.as_str()),
    );

    let tech_ids: HashSet<&TechId> = content.techs.iter().map(|t| &t.id).collect();
    let check_gate = |kind: &str, id: &str, required: Option<&TechId>| {
        if let Some(tech) = required {
            assert!(
                tech_ids.contains(tech),
                "{kind} '{id}' requires '{}' which is not a known tech id",
                tech.0,
            );
        }
    };

    // Validate tech prereqs and effects.
    for tech in &content.techs {
        for prereq in &tech.prerequisites {
            assert!(
                tech_ids.contains(prereq),
                "tech '{}' prereq '{}' is not a known tech id",
                tech.id.0,
                prereq.0,
            );
            assert!(prereq != &tech.id, "tech '{}' lists itself as a prereq", tech.id.0);
            // Prereqs must sit at a lower tier, which also rules out cycles.
            let prereq_tier = content.tech(prereq).map_or(0, |p| p.tier);
            assert!(
                prereq_tier < tech.tier,
                "tech '{}' (tier {}) has prereq '{}' at tier {prereq_tier}",
                tech.id.0,
                tech.tier,
                prereq.0,
            );
        }
        assert!(tech.cost >= 0.0, "tech '{}' has a negative cost", tech.id.0);
        if let Some(value) = effect_value(tech.effect) {
            let valid = if matches!(tech.effect, TechEffect::Luck { .. }) {
                value.is_finite() && value >= 0.0
            } else {
                value.is_finite() && value > 0.0
            };
            assert!(valid, "tech '{}' has invalid effect value {value}", tech.id.0);
        }
    }

    // Validate catalog gates and timers.
    for crop in &content.crops {
        check_gate("crop", &crop.id.0, crop.required_tech.as_ref());
        assert!(crop.grow_time_ms > 0, "crop '{}' has zero grow time", crop.id.0);
    }
    for animal in &content.animals {
        check_gate("animal", &animal.id.0, animal.required_tech.as_ref());
        assert!(
            animal.feed_interval_ms > 0 && animal.production_interval_ms > 0,
            "animal '{}' has a zero interval",
            animal.id.0,
        );
    }
    for building in &content.buildings {
        check_gate("building", &building.id.0, building.required_tech.as_ref());
        assert!(
            building.production.is_empty() || building.production_rate_ms > 0,
            "building '{}' produces with a zero rate",
            building.id.0,
        );
    }

    // Validate achievements.
    for achievement in &content.achievements {
        assert!(
            achievement.requirement > 0.0,
            "achievement '{}' has a non-positive requirement",
            achievement.id.0,
        );
    }

    // Validate constants.
    let constants = &content.constants;
    assert!(constants.plot_count > 0, "plot_count must be positive");
    assert!(
        constants.activity_log_capacity > 0,
        "activity_log_capacity must be positive"
    );
    assert!(
        constants.starting_resources.is_finite(),
        "starting_resources must be finite"
    );
    for building_id in &constants.automation_building_ids {
        assert!(
            content.building(building_id).is_some(),
            "automation building '{}' is not a known building id",
            building_id.0,
        );
    }
}

fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let text =
        std::fs::read_to_string(dir.join(name)).with_context(|| format!("reading {name}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {name}"))
}

pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = read_json(dir, "constants.json")?;
    let techs_file: TechsFile = read_json(dir, "techs.json")?;
    let crops_file: CropsFile = read_json(dir, "crops.json")?;
    let animals_file: AnimalsFile = read_json(dir, "animals.json")?;
    let buildings_file: BuildingsFile = read_json(dir, "buildings.json")?;
    let achievements_file: AchievementsFile = read_json(dir, "achievements.json")?;
    let content = GameContent {
        content_version: techs_file.content_version,
        crops: crops_file.crops,
        animals: animals_file.animals,
        buildings: buildings_file.buildings,
        techs: techs_file.techs,
        achievements: achievements_file.achievements,
        constants,
    };
    validate_content(&content);
    Ok(content)
}

/// A new farm started at `now`.
pub fn build_initial_state(content: &GameContent, now: Millis) -> GameState {
    GameState::fresh(&content.constants, now)
}

/// Reads a saved snapshot and repairs it. A missing file starts a new farm;
/// a file that is not JSON at all is an error.
pub fn load_state(path: &Path, content: &GameContent, now: Millis) -> Result<GameState> {
    if !path.exists() {
        return Ok(build_initial_state(content, now));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading state file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing state file: {}", path.display()))?;
    Ok(repair_state(&value, content, now))
}

/// Current wall-clock time as Unix milliseconds.
pub fn wall_clock_ms() -> Millis {
    Millis::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
