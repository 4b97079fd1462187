use farm_core::ledger::{can_afford, deduct};
use farm_core::modifiers::compute_modifiers;
use farm_core::unlocks::{is_unlocked, resolve_unlocks};
use farm_core::{
    BuildingId, CropDef, GameContent, GameState, Intent, Millis, Modifiers, PlotContents, PlotId,
    ResourceKind, Resources, TechDef,
};
use std::collections::HashMap;

pub trait IntentSource {
    fn generate_intents(
        &mut self,
        state: &GameState,
        content: &GameContent,
        now: Millis,
    ) -> Vec<Intent>;
}

/// Plays the farm automatically:
/// 1. Harvest every ready crop.
/// 2. Buy the cheapest affordable tech.
/// 3. Work through the build plan while buildings fill less than a quarter of the grid.
/// 4. Plant the best-paying affordable crop on the remaining empty plots.
pub struct AutopilotController {
    build_plan: Vec<BuildingId>,
}

const DEFAULT_BUILD_PLAN: &[&str] = &[
    "well",
    "research_lab",
    "well",
    "compost",
    "well",
    "windmill",
    "research_lab",
    "seed_maker",
];

/// Denominator of the grid share buildings may take.
const BUILDING_SHARE: usize = 4;

impl AutopilotController {
    pub fn new(build_plan: Vec<BuildingId>) -> Self {
        Self { build_plan }
    }

    pub fn build_plan(&self) -> &[BuildingId] {
        &self.build_plan
    }
}

impl Default for AutopilotController {
    fn default() -> Self {
        Self::new(DEFAULT_BUILD_PLAN.iter().map(|id| BuildingId::from(*id)).collect())
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Plot ids holding a crop whose timer has run out, in grid order.
fn ready_crops(state: &GameState, now: Millis) -> Vec<PlotId> {
    state
        .plots
        .iter()
        .filter(|plot| {
            matches!(plot.contents, PlotContents::Crop { completes_at, .. } if completes_at <= now)
        })
        .map(|plot| plot.id.clone())
        .collect()
}

/// Cheapest available tech the player can pay for now. Ties break on id.
fn cheapest_affordable_tech<'a>(
    state: &GameState,
    content: &'a GameContent,
) -> Option<&'a TechDef> {
    resolve_unlocks(content, &state.techs)
        .available_techs
        .iter()
        .filter_map(|id| content.tech(id))
        .filter(|tech| tech.cost <= state.resources.research)
        .min_by(|a, b| a.cost.total_cmp(&b.cost).then_with(|| a.id.cmp(&b.id)))
}

fn building_counts(state: &GameState) -> HashMap<&BuildingId, usize> {
    let mut counts = HashMap::new();
    for plot in &state.plots {
        if let PlotContents::Building { building_id, .. } = &plot.contents {
            *counts.entry(building_id).or_insert(0) += 1;
        }
    }
    counts
}

/// First build-plan step not yet satisfied by the grid. Locked or unknown
/// buildings are skipped so one gated step doesn't stall the plan.
fn next_planned_building<'a>(
    plan: &'a [BuildingId],
    state: &GameState,
    content: &GameContent,
) -> Option<&'a BuildingId> {
    let built = building_counts(state);
    let mut wanted: HashMap<&BuildingId, usize> = HashMap::new();
    for building_id in plan {
        let want = wanted.entry(building_id).or_insert(0);
        *want += 1;
        if built.get(building_id).copied().unwrap_or(0) >= *want {
            continue;
        }
        let unlocked = content
            .building(building_id)
            .is_some_and(|def| is_unlocked(def.required_tech.as_ref(), &state.techs));
        if unlocked {
            return Some(building_id);
        }
    }
    None
}

/// Gold per second of growth, after modifiers.
fn crop_score(crop: &CropDef, modifiers: &Modifiers) -> f64 {
    let gold = modifiers
        .crop_yield(&crop.yields)
        .get(&ResourceKind::Gold)
        .copied()
        .unwrap_or(0.0);
    gold / modifiers.grow_time(crop.grow_time_ms).max(1) as f64
}

/// Best unlocked crop whose modified cost fits in `budget`.
fn best_affordable_crop<'a>(
    crops: &[&'a CropDef],
    modifiers: &Modifiers,
    budget: &Resources,
) -> Option<&'a CropDef> {
    crops
        .iter()
        .copied()
        .filter(|crop| can_afford(budget, &modifiers.crop_cost(&crop.cost)))
        .max_by(|a, b| {
            crop_score(a, modifiers)
                .total_cmp(&crop_score(b, modifiers))
                .then_with(|| b.id.cmp(&a.id))
        })
}

// ---------------------------------------------------------------------------
// AutopilotController
// ---------------------------------------------------------------------------

impl IntentSource for AutopilotController {
    fn generate_intents(
        &mut self,
        state: &GameState,
        content: &GameContent,
        now: Millis,
    ) -> Vec<Intent> {
        let mut intents: Vec<Intent> = ready_crops(state, now)
            .into_iter()
            .map(|plot_id| Intent::HarvestPlot { plot_id })
            .collect();

        if let Some(tech) = cheapest_affordable_tech(state, content) {
            intents.push(Intent::PurchaseTech {
                tech_id: tech.id.clone(),
            });
        }

        // Intents below spend from a projected ledger so one pass never
        // plans more than the player holds. Harvest income is not counted.
        let mut budget = state.resources;
        let mut empty_plots = state
            .plots
            .iter()
            .filter(|plot| plot.is_empty())
            .map(|plot| plot.id.clone());

        let building_total: usize = building_counts(state).values().sum();
        let building_cap = state.plots.len() / BUILDING_SHARE;
        if building_total < building_cap {
            if let Some(def) = next_planned_building(&self.build_plan, state, content)
                .and_then(|id| content.building(id))
            {
                if can_afford(&budget, &def.cost) {
                    if let Some(plot_id) = empty_plots.next() {
                        budget = deduct(&budget, &def.cost);
                        intents.push(Intent::PlaceBuilding {
                            plot_id,
                            building_id: def.id.clone(),
                        });
                    }
                }
            }
        }

        let modifiers = compute_modifiers(&state.techs, content, state.prestige_multiplier);
        let unlocked: Vec<&CropDef> = content
            .crops
            .iter()
            .filter(|crop| is_unlocked(crop.required_tech.as_ref(), &state.techs))
            .collect();
        for plot_id in empty_plots {
            let Some(crop) = best_affordable_crop(&unlocked, &modifiers, &budget) else {
                break;
            };
            budget = deduct(&budget, &modifiers.crop_cost(&crop.cost));
            intents.push(Intent::PlaceCrop {
                plot_id,
                crop_id: crop.id.clone(),
            });
        }

        intents
    }
}
