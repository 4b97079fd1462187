//! Player intents applied to a snapshot.
//!
//! Every handler reads `&GameState` and returns a fresh state in its outcome.
//! References to plots or catalog ids that do not exist are not errors: the
//! outcome carries the unchanged state with `applied == false`.

use rand::Rng;

use crate::error::CommandError;
use crate::harvest::{apply_harvest_bonus, roll_harvest_bonus, HarvestRoll};
use crate::modifiers::Modifiers;
use crate::unlocks::missing_prerequisites;
use crate::{
    activity, ledger, ActivityLogEntry, AnimalId, BuildingId, CropId, GameContent, GameState,
    LogKind, Millis, PlotContents, PlotId, ResourceBundle, ResourceKind, TechId,
};

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub state: GameState,
    pub applied: bool,
    /// Entries written by this command, newest first.
    pub log: Vec<ActivityLogEntry>,
    pub roll: Option<HarvestRoll>,
}

impl CommandOutcome {
    pub(crate) fn unchanged(state: &GameState) -> Self {
        Self {
            state: state.clone(),
            applied: false,
            log: Vec::new(),
            roll: None,
        }
    }

    fn applied(state: GameState, entry: ActivityLogEntry) -> Self {
        Self {
            state,
            applied: true,
            log: vec![entry],
            roll: None,
        }
    }
}

fn plot_index(state: &GameState, plot_id: &PlotId) -> Option<usize> {
    state.plots.iter().position(|plot| &plot.id == plot_id)
}

/// Shared gate for every placement: plot empty, item unlocked, cost affordable.
fn check_placement(
    state: &GameState,
    index: usize,
    required_tech: Option<&TechId>,
    cost: &ResourceBundle,
) -> Result<(), CommandError> {
    if !state.plots[index].is_empty() {
        return Err(CommandError::PlotOccupied);
    }
    if let Some(tech) = required_tech.filter(|tech| !state.has_tech(tech)) {
        return Err(CommandError::Locked {
            required_tech: tech.clone(),
        });
    }
    if !ledger::can_afford(&state.resources, cost) {
        return Err(CommandError::InsufficientResources);
    }
    Ok(())
}

pub fn place_crop(
    state: &GameState,
    content: &GameContent,
    modifiers: &Modifiers,
    plot_id: &PlotId,
    crop_id: &CropId,
    now: Millis,
) -> Result<CommandOutcome, CommandError> {
    let (Some(index), Some(crop)) = (plot_index(state, plot_id), content.crop(crop_id)) else {
        tracing::debug!(%plot_id, %crop_id, "place_crop: unknown reference");
        return Ok(CommandOutcome::unchanged(state));
    };
    let cost = modifiers.crop_cost(&crop.cost);
    check_placement(state, index, crop.required_tech.as_ref(), &cost)?;

    let mut next = state.clone();
    next.resources = ledger::deduct(&state.resources, &cost);
    next.plots[index].contents = PlotContents::Crop {
        crop_id: crop_id.clone(),
        planted_at: now,
        completes_at: now + modifiers.grow_time(crop.grow_time_ms),
    };
    let entry = activity::record(
        &mut next,
        LogKind::Plant,
        format!("Planted {}", crop.name),
        Some(cost),
        now,
        content.constants.activity_log_capacity,
    );
    Ok(CommandOutcome::applied(next, entry))
}

pub fn place_animal(
    state: &GameState,
    content: &GameContent,
    plot_id: &PlotId,
    animal_id: &AnimalId,
    now: Millis,
) -> Result<CommandOutcome, CommandError> {
    let (Some(index), Some(animal)) = (plot_index(state, plot_id), content.animal(animal_id))
    else {
        tracing::debug!(%plot_id, %animal_id, "place_animal: unknown reference");
        return Ok(CommandOutcome::unchanged(state));
    };
    check_placement(state, index, animal.required_tech.as_ref(), &animal.cost)?;

    let mut next = state.clone();
    next.resources = ledger::deduct(&state.resources, &animal.cost);
    next.plots[index].contents = PlotContents::Animal {
        animal_id: animal_id.clone(),
        placed_at: now,
        last_production: now,
        last_fed: now,
    };
    let entry = activity::record(
        &mut next,
        LogKind::Build,
        format!("Purchased {}", animal.name),
        Some(animal.cost.clone()),
        now,
        content.constants.activity_log_capacity,
    );
    Ok(CommandOutcome::applied(next, entry))
}

pub fn place_building(
    state: &GameState,
    content: &GameContent,
    plot_id: &PlotId,
    building_id: &BuildingId,
    now: Millis,
) -> Result<CommandOutcome, CommandError> {
    let (Some(index), Some(building)) =
        (plot_index(state, plot_id), content.building(building_id))
    else {
        tracing::debug!(%plot_id, %building_id, "place_building: unknown reference");
        return Ok(CommandOutcome::unchanged(state));
    };
    check_placement(state, index, building.required_tech.as_ref(), &building.cost)?;

    let mut next = state.clone();
    next.resources = ledger::deduct(&state.resources, &building.cost);
    next.plots[index].contents = PlotContents::Building {
        building_id: building_id.clone(),
        placed_at: now,
        last_production: now,
    };
    let entry = activity::record(
        &mut next,
        LogKind::Build,
        format!("Built {}", building.name),
        Some(building.cost.clone()),
        now,
        content.constants.activity_log_capacity,
    );
    Ok(CommandOutcome::applied(next, entry))
}

/// Harvests a mature crop, rolling one bonus for the whole yield.
pub fn harvest_plot(
    state: &GameState,
    content: &GameContent,
    modifiers: &Modifiers,
    plot_id: &PlotId,
    now: Millis,
    rng: &mut impl Rng,
) -> Result<CommandOutcome, CommandError> {
    let Some(index) = plot_index(state, plot_id) else {
        tracing::debug!(%plot_id, "harvest_plot: unknown plot");
        return Ok(CommandOutcome::unchanged(state));
    };
    let PlotContents::Crop {
        crop_id,
        completes_at,
        ..
    } = &state.plots[index].contents
    else {
        return Err(CommandError::NotACrop);
    };
    let Some(crop) = content.crop(crop_id) else {
        tracing::debug!(%plot_id, %crop_id, "harvest_plot: unknown crop");
        return Ok(CommandOutcome::unchanged(state));
    };
    if *completes_at > now {
        return Err(CommandError::NotReady);
    }

    let roll = roll_harvest_bonus(state.luck_level, rng);
    let gained = apply_harvest_bonus(&modifiers.crop_yield(&crop.yields), &roll);

    let mut next = state.clone();
    next.resources = ledger::add(&state.resources, &gained);
    next.total_harvested += 1;
    next.total_gold_earned += gained.get(&ResourceKind::Gold).copied().unwrap_or(0.0);
    if roll.is_critical {
        next.critical_harvest_count += 1;
    }
    next.plots[index].contents = PlotContents::Empty;

    let marker = if roll.is_critical { " - CRITICAL!" } else { "" };
    let entry = activity::record(
        &mut next,
        LogKind::Harvest,
        format!("Harvested {} ({}% yield{marker})", crop.name, roll.roll_value),
        Some(gained),
        now,
        content.constants.activity_log_capacity,
    );
    Ok(CommandOutcome {
        roll: Some(roll),
        ..CommandOutcome::applied(next, entry)
    })
}

pub fn purchase_tech(
    state: &GameState,
    content: &GameContent,
    tech_id: &TechId,
    now: Millis,
) -> Result<CommandOutcome, CommandError> {
    let Some(tech) = content.tech(tech_id) else {
        tracing::debug!(%tech_id, "purchase_tech: unknown tech");
        return Ok(CommandOutcome::unchanged(state));
    };
    if state.has_tech(tech_id) {
        return Err(CommandError::AlreadyPurchased);
    }
    let missing = missing_prerequisites(tech, &state.techs);
    if !missing.is_empty() {
        return Err(CommandError::PrerequisitesMissing { missing });
    }
    let cost = ResourceBundle::from([(ResourceKind::Research, tech.cost)]);
    if !ledger::can_afford(&state.resources, &cost) {
        return Err(CommandError::InsufficientResources);
    }

    let mut next = state.clone();
    next.resources = ledger::deduct(&state.resources, &cost);
    next.techs.push(tech_id.clone());
    let entry = activity::record(
        &mut next,
        LogKind::Unlock,
        format!("Unlocked {}", tech.name),
        None,
        now,
        content.constants.activity_log_capacity,
    );
    Ok(CommandOutcome::applied(next, entry))
}
