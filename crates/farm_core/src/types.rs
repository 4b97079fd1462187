//! Type definitions for `farm_core`.
//!
//! Game state, content catalog, intents, and ID newtypes used by the simulation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// Wall-clock milliseconds. The driver picks the origin; the core only diffs.
pub type Millis = u64;

/// Sparse resource amounts: costs, yields, rewards, production.
pub type ResourceBundle = BTreeMap<ResourceKind, f64>;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(PlotId);
string_id!(CropId);
string_id!(AnimalId);
string_id!(BuildingId);
string_id!(TechId);
string_id!(AchievementId);
string_id!(TaskId);
string_id!(LogEntryId);

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Gold,
    Seeds,
    Water,
    Fertilizer,
    Energy,
    Research,
    Hay,
    Milk,
    Eggs,
    Wool,
    Leather,
    Meat,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 12] = [
        ResourceKind::Gold,
        ResourceKind::Seeds,
        ResourceKind::Water,
        ResourceKind::Fertilizer,
        ResourceKind::Energy,
        ResourceKind::Research,
        ResourceKind::Hay,
        ResourceKind::Milk,
        ResourceKind::Eggs,
        ResourceKind::Wool,
        ResourceKind::Leather,
        ResourceKind::Meat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Gold => "gold",
            ResourceKind::Seeds => "seeds",
            ResourceKind::Water => "water",
            ResourceKind::Fertilizer => "fertilizer",
            ResourceKind::Energy => "energy",
            ResourceKind::Research => "research",
            ResourceKind::Hay => "hay",
            ResourceKind::Milk => "milk",
            ResourceKind::Eggs => "eggs",
            ResourceKind::Wool => "wool",
            ResourceKind::Leather => "leather",
            ResourceKind::Meat => "meat",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The player's full ledger. Every field is always present and finite;
/// values may be negative after an ungated `deduct`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub gold: f64,
    pub seeds: f64,
    pub water: f64,
    pub fertilizer: f64,
    pub energy: f64,
    pub research: f64,
    pub hay: f64,
    pub milk: f64,
    pub eggs: f64,
    pub wool: f64,
    pub leather: f64,
    pub meat: f64,
}

impl Resources {
    pub fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Seeds => self.seeds,
            ResourceKind::Water => self.water,
            ResourceKind::Fertilizer => self.fertilizer,
            ResourceKind::Energy => self.energy,
            ResourceKind::Research => self.research,
            ResourceKind::Hay => self.hay,
            ResourceKind::Milk => self.milk,
            ResourceKind::Eggs => self.eggs,
            ResourceKind::Wool => self.wool,
            ResourceKind::Leather => self.leather,
            ResourceKind::Meat => self.meat,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Seeds => &mut self.seeds,
            ResourceKind::Water => &mut self.water,
            ResourceKind::Fertilizer => &mut self.fertilizer,
            ResourceKind::Energy => &mut self.energy,
            ResourceKind::Research => &mut self.research,
            ResourceKind::Hay => &mut self.hay,
            ResourceKind::Milk => &mut self.milk,
            ResourceKind::Eggs => &mut self.eggs,
            ResourceKind::Wool => &mut self.wool,
            ResourceKind::Leather => &mut self.leather,
            ResourceKind::Meat => &mut self.meat,
        }
    }

    pub fn is_finite(&self) -> bool {
        ResourceKind::ALL.iter().all(|kind| self.get(*kind).is_finite())
    }
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub resources: Resources,
    /// Fixed length (`Constants::plot_count`), ordered by index.
    pub plots: Vec<PlotState>,
    /// Legacy task list from early saves. Never appended by the core; see
    /// `queue::pending_tasks` for the live view.
    pub queue: Vec<QueueTask>,
    /// Purchased techs in purchase order, no duplicates.
    pub techs: Vec<TechId>,
    /// Completed achievements. Append-only.
    pub achievements: Vec<AchievementId>,
    /// Newest first, bounded by `Constants::activity_log_capacity`.
    pub activity_log: Vec<ActivityLogEntry>,
    pub counters: Counters,
    pub total_harvested: u64,
    pub total_gold_earned: f64,
    pub total_animal_products: u64,
    pub critical_harvest_count: u64,
    /// Derived from purchased techs on every session commit.
    pub luck_level: f64,
    pub prestige_level: u32,
    pub prestige_multiplier: f64,
    pub start_time: Millis,
    pub last_save_time: Millis,
}

impl GameState {
    /// A brand-new farm: starting resources, an empty grid, nothing purchased.
    pub fn fresh(constants: &Constants, now: Millis) -> Self {
        Self {
            resources: constants.starting_resources,
            plots: (0..constants.plot_count).map(PlotState::empty).collect(),
            queue: Vec::new(),
            techs: Vec::new(),
            achievements: Vec::new(),
            activity_log: Vec::new(),
            counters: Counters::default(),
            total_harvested: 0,
            total_gold_earned: 0.0,
            total_animal_products: 0,
            critical_harvest_count: 0,
            luck_level: 0.0,
            prestige_level: 0,
            prestige_multiplier: 1.0,
            start_time: now,
            last_save_time: now,
        }
    }

    pub fn has_tech(&self, tech_id: &TechId) -> bool {
        self.techs.contains(tech_id)
    }

    pub fn has_achievement(&self, achievement_id: &AchievementId) -> bool {
        self.achievements.contains(achievement_id)
    }

    pub fn plot(&self, plot_id: &PlotId) -> Option<&PlotState> {
        self.plots.iter().find(|plot| &plot.id == plot_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_log_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotState {
    pub id: PlotId,
    #[serde(flatten)]
    pub contents: PlotContents,
    pub level: u32,
}

impl PlotState {
    pub fn empty(index: usize) -> Self {
        Self {
            id: plot_id_for_index(index),
            contents: PlotContents::Empty,
            level: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.contents, PlotContents::Empty)
    }
}

pub fn plot_id_for_index(index: usize) -> PlotId {
    PlotId(format!("plot-{index}"))
}

/// What occupies a plot. Exactly one catalog reference per non-empty variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlotContents {
    Empty,
    Crop {
        crop_id: CropId,
        planted_at: Millis,
        completes_at: Millis,
    },
    Building {
        building_id: BuildingId,
        placed_at: Millis,
        last_production: Millis,
    },
    Animal {
        animal_id: AnimalId,
        placed_at: Millis,
        last_production: Millis,
        last_fed: Millis,
    },
}

impl PlotContents {
    pub fn label(&self) -> &'static str {
        match self {
            PlotContents::Empty => "empty",
            PlotContents::Crop { .. } => "crop",
            PlotContents::Building { .. } => "building",
            PlotContents::Animal { .. } => "animal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTask {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(alias = "targetId")]
    pub target_id: String,
    #[serde(default, alias = "plotId", skip_serializing_if = "Option::is_none")]
    pub plot_id: Option<PlotId>,
    #[serde(alias = "startedAt")]
    pub started_at: Millis,
    #[serde(alias = "completesAt")]
    pub completes_at: Millis,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Plant,
    Harvest,
    Build,
    Research,
    Feed,
    Collect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: LogEntryId,
    pub timestamp: Millis,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceBundle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Harvest,
    Plant,
    Build,
    Collect,
    Feed,
    Unlock,
    Achievement,
    Production,
}

// ---------------------------------------------------------------------------
// Intent types
// ---------------------------------------------------------------------------

/// A discrete player action forwarded by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    PlaceCrop { plot_id: PlotId, crop_id: CropId },
    PlaceAnimal { plot_id: PlotId, animal_id: AnimalId },
    PlaceBuilding { plot_id: PlotId, building_id: BuildingId },
    HarvestPlot { plot_id: PlotId },
    PurchaseTech { tech_id: TechId },
    CancelTask { task_id: TaskId },
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub crops: Vec<CropDef>,
    pub animals: Vec<AnimalDef>,
    pub buildings: Vec<BuildingDef>,
    pub techs: Vec<TechDef>,
    pub achievements: Vec<AchievementDef>,
    pub constants: Constants,
}

impl GameContent {
    pub fn crop(&self, id: &CropId) -> Option<&CropDef> {
        self.crops.iter().find(|c| &c.id == id)
    }

    pub fn animal(&self, id: &AnimalId) -> Option<&AnimalDef> {
        self.animals.iter().find(|a| &a.id == id)
    }

    pub fn building(&self, id: &BuildingId) -> Option<&BuildingDef> {
        self.buildings.iter().find(|b| &b.id == id)
    }

    pub fn tech(&self, id: &TechId) -> Option<&TechDef> {
        self.techs.iter().find(|t| &t.id == id)
    }

    pub fn achievement(&self, id: &AchievementId) -> Option<&AchievementDef> {
        self.achievements.iter().find(|a| &a.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropDef {
    pub id: CropId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cost: ResourceBundle,
    pub grow_time_ms: Millis,
    #[serde(rename = "yield")]
    pub yields: ResourceBundle,
    #[serde(default)]
    pub required_tech: Option<TechId>,
    pub tier: u32,
    pub category: CropCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropCategory {
    Basic,
    Vegetable,
    Fruit,
    Grain,
    Exotic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimalDef {
    pub id: AnimalId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cost: ResourceBundle,
    pub feed_cost: ResourceBundle,
    pub feed_interval_ms: Millis,
    pub production: ResourceBundle,
    pub production_interval_ms: Millis,
    #[serde(default)]
    pub required_tech: Option<TechId>,
    pub tier: u32,
    pub category: AnimalCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimalCategory {
    Poultry,
    Livestock,
    Exotic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingDef {
    pub id: BuildingId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cost: ResourceBundle,
    /// Empty for buildings that produce nothing (storage, decoration).
    #[serde(default)]
    pub production: ResourceBundle,
    pub production_rate_ms: Millis,
    /// Energy output of this building scales with the energy-production channel.
    #[serde(default)]
    pub energy_producer: bool,
    #[serde(default)]
    pub required_tech: Option<TechId>,
    pub tier: u32,
    pub category: BuildingCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingCategory {
    Production,
    Processing,
    Automation,
    Utility,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechDef {
    pub id: TechId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Research points.
    pub cost: f64,
    pub category: TechCategory,
    pub tier: u32,
    #[serde(default)]
    pub prerequisites: Vec<TechId>,
    pub effect: TechEffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechCategory {
    Crops,
    Animals,
    Automation,
    Buildings,
    Efficiency,
    Processing,
    Exotic,
}

/// One tech's contribution to the modifier channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TechEffect {
    /// Only gates catalog items via `required_tech`.
    Unlock,
    GrowthSpeed { value: f64 },
    YieldMultiplier { value: f64 },
    WaterCost { value: f64 },
    EnergyProduction { value: f64 },
    FertilizerEfficiency { value: f64 },
    AnimalProduction { value: f64 },
    AnimalYield { value: f64 },
    CropRotation { value: f64 },
    MasterMultiplier { value: f64 },
    /// Additive, unlike every other channel.
    Luck { value: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementDef {
    pub id: AchievementId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: AchievementCategory,
    pub metric: AchievementMetric,
    pub requirement: f64,
    pub reward: ResourceBundle,
    pub tier: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Harvest,
    Wealth,
    Tech,
    Automation,
    Animals,
    Production,
    Special,
}

/// The progress counter an achievement is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementMetric {
    TotalHarvested,
    TotalGoldEarned,
    TechCount,
    AnimalCount,
    TotalAnimalProducts,
    AutomationBuildingCount,
    BuildingCount,
    CropVariety,
    AnimalVariety,
    CriticalHarvests,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    pub plot_count: usize,
    pub starting_resources: Resources,
    pub activity_log_capacity: usize,
    pub achievement_check_cooldown_ms: Millis,
    /// Upper bound on memoized unlock sets held by a session.
    pub unlock_cache_capacity: usize,
    /// Buildings counted by `AchievementMetric::AutomationBuildingCount`.
    pub automation_building_ids: Vec<BuildingId>,
}
