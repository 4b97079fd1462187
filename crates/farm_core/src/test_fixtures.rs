//! Shared test fixtures for farm_core and downstream crates.
//!
//! `base_content()` is a small catalog with one item of each kind behind and
//! in front of a tech gate, using round numbers so expected values are easy to
//! work out by hand.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    AchievementCategory, AchievementDef, AchievementMetric, AnimalCategory, AnimalDef,
    BuildingCategory, BuildingDef, BuildingId, Constants, CropCategory, CropDef, GameContent,
    GameState, Millis, PlotContents, ResourceBundle, ResourceKind, Resources, TechCategory,
    TechDef, TechEffect, TechId,
};

pub fn bundle(entries: &[(ResourceKind, f64)]) -> ResourceBundle {
    entries.iter().copied().collect()
}

pub fn tech(id: &str, cost: f64, prerequisites: &[&str], effect: TechEffect) -> TechDef {
    TechDef {
        id: TechId::from(id),
        name: id.to_string(),
        description: String::new(),
        cost,
        category: TechCategory::Efficiency,
        tier: 1,
        prerequisites: prerequisites.iter().map(|p| TechId::from(*p)).collect(),
        effect,
    }
}

pub fn at_tier(tier: u32, mut def: TechDef) -> TechDef {
    def.tier = tier;
    def
}

fn achievement(
    id: &str,
    metric: AchievementMetric,
    requirement: f64,
    reward: ResourceBundle,
) -> AchievementDef {
    AchievementDef {
        id: id.into(),
        name: id.to_string(),
        description: String::new(),
        category: AchievementCategory::Harvest,
        metric,
        requirement,
        reward,
        tier: 1,
    }
}

pub fn base_constants() -> Constants {
    Constants {
        plot_count: 20,
        starting_resources: Resources {
            gold: 150.0,
            seeds: 20.0,
            water: 30.0,
            fertilizer: 10.0,
            ..Resources::default()
        },
        activity_log_capacity: 200,
        achievement_check_cooldown_ms: 1_000,
        unlock_cache_capacity: 100,
        automation_building_ids: vec![BuildingId::from("windmill"), BuildingId::from("well")],
    }
}

/// wheat/well/chicken are open from the start; carrot, windmill and duck
/// each sit behind one tech.
#[allow(clippy::too_many_lines)]
pub fn base_content() -> GameContent {
    use ResourceKind::{Eggs, Energy, Fertilizer, Gold, Hay, Research, Seeds, Water};
    GameContent {
        content_version: "test".to_string(),
        crops: vec![
            CropDef {
                id: "wheat".into(),
                name: "Wheat".to_string(),
                description: String::new(),
                cost: bundle(&[(Seeds, 1.0), (Water, 2.0)]),
                grow_time_ms: 10_000,
                yields: bundle(&[(Gold, 12.0), (Seeds, 1.0), (Hay, 2.0)]),
                required_tech: None,
                tier: 1,
                category: CropCategory::Basic,
            },
            CropDef {
                id: "carrot".into(),
                name: "Carrot".to_string(),
                description: String::new(),
                cost: bundle(&[(Seeds, 2.0), (Water, 3.0), (Fertilizer, 1.0)]),
                grow_time_ms: 20_000,
                yields: bundle(&[(Gold, 30.0), (Seeds, 2.0)]),
                required_tech: Some("tech_root_crops".into()),
                tier: 1,
                category: CropCategory::Vegetable,
            },
        ],
        animals: vec![
            AnimalDef {
                id: "chicken".into(),
                name: "Chicken".to_string(),
                description: String::new(),
                cost: bundle(&[(Gold, 100.0)]),
                feed_cost: bundle(&[(Hay, 1.0)]),
                feed_interval_ms: 20_000,
                production: bundle(&[(Eggs, 3.0), (Gold, 5.0)]),
                production_interval_ms: 15_000,
                required_tech: None,
                tier: 1,
                category: AnimalCategory::Poultry,
            },
            AnimalDef {
                id: "duck".into(),
                name: "Duck".to_string(),
                description: String::new(),
                cost: bundle(&[(Gold, 120.0)]),
                feed_cost: bundle(&[(Hay, 2.0)]),
                feed_interval_ms: 20_000,
                production: bundle(&[(Eggs, 2.0)]),
                production_interval_ms: 15_000,
                required_tech: Some("tech_chickens".into()),
                tier: 1,
                category: AnimalCategory::Poultry,
            },
        ],
        buildings: vec![
            BuildingDef {
                id: "well".into(),
                name: "Well".to_string(),
                description: String::new(),
                cost: bundle(&[(Gold, 50.0)]),
                production: bundle(&[(Water, 5.0)]),
                production_rate_ms: 10_000,
                energy_producer: false,
                required_tech: None,
                tier: 1,
                category: BuildingCategory::Utility,
            },
            BuildingDef {
                id: "research_lab".into(),
                name: "Research Lab".to_string(),
                description: String::new(),
                cost: bundle(&[(Gold, 100.0)]),
                production: bundle(&[(Research, 1.0)]),
                production_rate_ms: 15_000,
                energy_producer: false,
                required_tech: None,
                tier: 1,
                category: BuildingCategory::Utility,
            },
            BuildingDef {
                id: "silo".into(),
                name: "Silo".to_string(),
                description: String::new(),
                cost: bundle(&[(Gold, 80.0)]),
                production: ResourceBundle::new(),
                production_rate_ms: 0,
                energy_producer: false,
                required_tech: None,
                tier: 1,
                category: BuildingCategory::Utility,
            },
            BuildingDef {
                id: "windmill".into(),
                name: "Windmill".to_string(),
                description: String::new(),
                cost: bundle(&[(Gold, 500.0), (Water, 50.0)]),
                production: bundle(&[(Energy, 10.0)]),
                production_rate_ms: 5_000,
                energy_producer: true,
                required_tech: Some("tech_automation_basic".into()),
                tier: 2,
                category: BuildingCategory::Automation,
            },
        ],
        techs: vec![
            tech("tech_root_crops", 10.0, &[], TechEffect::Unlock),
            tech("tech_chickens", 10.0, &[], TechEffect::Unlock),
            tech("tech_automation_basic", 20.0, &[], TechEffect::Unlock),
            at_tier(
                2,
                tech(
                    "tech_yield_1",
                    25.0,
                    &["tech_root_crops"],
                    TechEffect::YieldMultiplier { value: 1.5 },
                ),
            ),
            at_tier(
                3,
                tech(
                    "tech_yield_2",
                    50.0,
                    &["tech_yield_1"],
                    TechEffect::YieldMultiplier { value: 1.5 },
                ),
            ),
            at_tier(
                2,
                tech(
                    "tech_lucky_charm",
                    40.0,
                    &["tech_root_crops", "tech_chickens"],
                    TechEffect::Luck { value: 1.0 },
                ),
            ),
        ],
        achievements: vec![
            achievement(
                "first_harvest",
                AchievementMetric::TotalHarvested,
                1.0,
                bundle(&[(Gold, 50.0)]),
            ),
            achievement(
                "harvest_10",
                AchievementMetric::TotalHarvested,
                10.0,
                bundle(&[(Gold, 100.0), (Seeds, 10.0)]),
            ),
            achievement(
                "first_animal",
                AchievementMetric::AnimalCount,
                1.0,
                bundle(&[(Hay, 10.0)]),
            ),
            achievement(
                "tech_first",
                AchievementMetric::TechCount,
                1.0,
                bundle(&[(Research, 5.0)]),
            ),
            achievement(
                "automation_first",
                AchievementMetric::AutomationBuildingCount,
                1.0,
                bundle(&[(Gold, 25.0)]),
            ),
        ],
        constants: base_constants(),
    }
}

/// Fresh farm at `t = 0` with the fixture's starting resources.
pub fn base_state(content: &GameContent) -> GameState {
    GameState::fresh(&content.constants, 0)
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

/// Puts `contents` on plot `index`, bypassing costs and unlocks.
pub fn with_plot(mut state: GameState, index: usize, contents: PlotContents) -> GameState {
    state.plots[index].contents = contents;
    state
}

pub fn building_at(building_id: &str, placed_at: Millis) -> PlotContents {
    PlotContents::Building {
        building_id: building_id.into(),
        placed_at,
        last_production: placed_at,
    }
}

pub fn animal_at(animal_id: &str, placed_at: Millis) -> PlotContents {
    PlotContents::Animal {
        animal_id: animal_id.into(),
        placed_at,
        last_production: placed_at,
        last_fed: placed_at,
    }
}

pub fn crop_at(crop_id: &str, planted_at: Millis, completes_at: Millis) -> PlotContents {
    PlotContents::Crop {
        crop_id: crop_id.into(),
        planted_at,
        completes_at,
    }
}
