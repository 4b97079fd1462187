//! Fixed-interval production step over every plot.
//!
//! Order per plot, in grid order:
//! 1. Buildings with production emit once their rate has elapsed.
//! 2. Animals produce if their (modified) interval has elapsed and they are
//!    not starving, then eat if their feed interval has elapsed and the
//!    projected ledger covers the feed. Both checks read the pre-tick
//!    timestamps.
//! 3. Crops and empty plots are untouched.
//!
//! Gains and feed spends are accumulated and applied to the ledger once.

use serde::Serialize;

use crate::modifiers::Modifiers;
use crate::{
    ledger, AnimalDef, GameContent, GameState, Millis, PlotContents, PlotState, ResourceBundle,
    Resources,
};

/// An animal whose last meal is this many feed intervals old stops producing.
const STARVATION_FEED_INTERVALS: u64 = 2;
/// Fraction of the feed interval after which an animal counts as hungry.
const HUNGRY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub state: GameState,
    pub produced: ResourceBundle,
    pub feed_spent: ResourceBundle,
    pub buildings_fired: u32,
    pub animals_produced: u32,
    pub animals_fed: u32,
}

#[derive(Debug, Default)]
struct TickTotals {
    projected: Resources,
    produced: ResourceBundle,
    feed_spent: ResourceBundle,
    buildings_fired: u32,
    animals_produced: u32,
    animals_fed: u32,
}

impl TickTotals {
    fn gain(&mut self, bundle: &ResourceBundle) {
        self.projected = ledger::add(&self.projected, bundle);
        self.produced = ledger::merge_bundles(&self.produced, bundle);
    }

    fn spend(&mut self, bundle: &ResourceBundle) {
        self.projected = ledger::deduct(&self.projected, bundle);
        self.feed_spent = ledger::merge_bundles(&self.feed_spent, bundle);
    }
}

pub fn tick(
    state: &GameState,
    content: &GameContent,
    modifiers: &Modifiers,
    now: Millis,
) -> TickOutcome {
    let mut totals = TickTotals {
        projected: state.resources,
        ..TickTotals::default()
    };

    let plots: Vec<PlotState> = state
        .plots
        .iter()
        .map(|plot| advance_plot(plot, content, modifiers, now, &mut totals))
        .collect();

    let mut next = state.clone();
    next.plots = plots;
    next.resources = ledger::deduct(
        &ledger::add(&state.resources, &totals.produced),
        &totals.feed_spent,
    );
    next.total_animal_products += u64::from(totals.animals_produced);

    if totals.buildings_fired + totals.animals_produced + totals.animals_fed > 0 {
        tracing::trace!(
            now,
            buildings = totals.buildings_fired,
            animals_produced = totals.animals_produced,
            animals_fed = totals.animals_fed,
            "production tick"
        );
    }

    TickOutcome {
        state: next,
        produced: totals.produced,
        feed_spent: totals.feed_spent,
        buildings_fired: totals.buildings_fired,
        animals_produced: totals.animals_produced,
        animals_fed: totals.animals_fed,
    }
}

fn advance_plot(
    plot: &PlotState,
    content: &GameContent,
    modifiers: &Modifiers,
    now: Millis,
    totals: &mut TickTotals,
) -> PlotState {
    let contents = match &plot.contents {
        PlotContents::Building {
            building_id,
            placed_at,
            last_production,
        } => {
            let Some(def) = content.building(building_id) else {
                tracing::debug!(plot = %plot.id, %building_id, "unknown building, skipping");
                return plot.clone();
            };
            if def.production.is_empty()
                || now.saturating_sub(*last_production) < def.production_rate_ms
            {
                return plot.clone();
            }
            totals.gain(&modifiers.building_output(def));
            totals.buildings_fired += 1;
            PlotContents::Building {
                building_id: building_id.clone(),
                placed_at: *placed_at,
                last_production: now,
            }
        }
        PlotContents::Animal {
            animal_id,
            placed_at,
            last_production,
            last_fed,
        } => {
            let Some(def) = content.animal(animal_id) else {
                tracing::debug!(plot = %plot.id, %animal_id, "unknown animal, skipping");
                return plot.clone();
            };
            let since_production = now.saturating_sub(*last_production);
            let since_fed = now.saturating_sub(*last_fed);

            let mut next_production = *last_production;
            if since_production >= modifiers.animal_interval(def.production_interval_ms)
                && !is_starving(def, since_fed)
            {
                totals.gain(&modifiers.animal_output(&def.production));
                totals.animals_produced += 1;
                next_production = now;
            }

            let mut next_fed = *last_fed;
            if since_fed >= def.feed_interval_ms
                && ledger::can_afford(&totals.projected, &def.feed_cost)
            {
                totals.spend(&def.feed_cost);
                totals.animals_fed += 1;
                next_fed = now;
            }

            PlotContents::Animal {
                animal_id: animal_id.clone(),
                placed_at: *placed_at,
                last_production: next_production,
                last_fed: next_fed,
            }
        }
        PlotContents::Crop { .. } | PlotContents::Empty => return plot.clone(),
    };
    PlotState {
        id: plot.id.clone(),
        contents,
        level: plot.level,
    }
}

fn is_starving(def: &AnimalDef, since_fed: Millis) -> bool {
    since_fed >= def.feed_interval_ms.saturating_mul(STARVATION_FEED_INTERVALS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimalCondition {
    Fed,
    /// Past most of its feed interval; will eat on the next tick that can afford it.
    Hungry,
    /// Not producing until fed.
    Starving,
}

/// Feeding condition of the animal on `plot`, or `None` for any other plot
/// or an unknown animal.
pub fn animal_condition(
    plot: &PlotState,
    content: &GameContent,
    now: Millis,
) -> Option<AnimalCondition> {
    let PlotContents::Animal {
        animal_id, last_fed, ..
    } = &plot.contents
    else {
        return None;
    };
    let def = content.animal(animal_id)?;
    let since_fed = now.saturating_sub(*last_fed);
    if is_starving(def, since_fed) {
        Some(AnimalCondition::Starving)
    } else if since_fed as f64 >= def.feed_interval_ms as f64 * HUNGRY_THRESHOLD {
        Some(AnimalCondition::Hungry)
    } else {
        Some(AnimalCondition::Fed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{animal_at, base_content, base_state, building_at, crop_at, with_plot};
    use crate::ResourceKind;

    fn identity() -> Modifiers {
        Modifiers::default()
    }

    #[test]
    fn building_waits_for_its_rate() {
        let content = base_content();
        let state = with_plot(base_state(&content), 0, building_at("well", 0));

        let early = tick(&state, &content, &identity(), 9_999);
        assert!((early.state.resources.water - 30.0).abs() < 1e-9);
        assert_eq!(early.buildings_fired, 0);

        let due = tick(&state, &content, &identity(), 10_001);
        assert!((due.state.resources.water - 35.0).abs() < 1e-9);
        let PlotContents::Building { last_production, .. } = due.state.plots[0].contents else {
            panic!("expected building");
        };
        assert_eq!(last_production, 10_001);
    }

    #[test]
    fn buildings_without_production_never_fire() {
        let content = base_content();
        let state = with_plot(base_state(&content), 0, building_at("silo", 0));
        let outcome = tick(&state, &content, &identity(), 1_000_000);
        assert_eq!(outcome.buildings_fired, 0);
        assert_eq!(outcome.state.plots, state.plots);
    }

    #[test]
    fn energy_producers_use_the_energy_channel() {
        let content = base_content();
        let state = with_plot(base_state(&content), 0, building_at("windmill", 0));
        let mods = Modifiers {
            energy_production: 1.5,
            ..Modifiers::default()
        };
        let outcome = tick(&state, &content, &mods, 5_000);
        assert!((outcome.state.resources.energy - 15.0).abs() < 1e-9);
    }

    #[test]
    fn starving_animal_does_not_produce() {
        let content = base_content();
        let mut state = with_plot(base_state(&content), 0, animal_at("chicken", 0));
        state.resources.hay = 0.0;
        let outcome = tick(&state, &content, &identity(), 45_000);
        assert_eq!(outcome.animals_produced, 0);
        assert!((outcome.state.resources.eggs - 0.0).abs() < 1e-9);
        assert_eq!(outcome.state.total_animal_products, 0);
        // still on the grid
        assert!(matches!(
            outcome.state.plots[0].contents,
            PlotContents::Animal { .. }
        ));
    }

    #[test]
    fn fed_animal_produces_and_eats() {
        let content = base_content();
        let mut state = with_plot(base_state(&content), 0, animal_at("chicken", 0));
        state.resources.hay = 5.0;
        let outcome = tick(&state, &content, &identity(), 20_000);
        assert_eq!(outcome.animals_produced, 1);
        assert_eq!(outcome.animals_fed, 1);
        assert!((outcome.state.resources.eggs - 3.0).abs() < 1e-9);
        assert!((outcome.state.resources.gold - 155.0).abs() < 1e-9);
        assert!((outcome.state.resources.hay - 4.0).abs() < 1e-9);
        assert_eq!(outcome.state.total_animal_products, 1);
        let PlotContents::Animal {
            last_production,
            last_fed,
            ..
        } = outcome.state.plots[0].contents
        else {
            panic!("expected animal");
        };
        assert_eq!(last_production, 20_000);
        assert_eq!(last_fed, 20_000);
    }

    #[test]
    fn unaffordable_feeding_is_retried_later() {
        let content = base_content();
        let mut state = with_plot(base_state(&content), 0, animal_at("chicken", 0));
        state.resources.hay = 0.0;
        let outcome = tick(&state, &content, &identity(), 20_000);
        assert_eq!(outcome.animals_fed, 0);
        let PlotContents::Animal { last_fed, .. } = outcome.state.plots[0].contents else {
            panic!("expected animal");
        };
        assert_eq!(last_fed, 0);
    }

    #[test]
    fn feeding_never_double_spends() {
        let content = base_content();
        let mut state = base_state(&content);
        state = with_plot(state, 0, animal_at("chicken", 0));
        state = with_plot(state, 1, animal_at("chicken", 0));
        state.resources.hay = 1.0;
        let outcome = tick(&state, &content, &identity(), 20_000);
        assert_eq!(outcome.animals_fed, 1);
        assert!(outcome.state.resources.hay >= 0.0);
        assert!((outcome.feed_spent[&ResourceKind::Hay] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn crops_and_input_are_untouched() {
        let content = base_content();
        let state = with_plot(base_state(&content), 0, crop_at("wheat", 0, 10_000));
        let before = state.clone();
        let outcome = tick(&state, &content, &identity(), 50_000);
        assert_eq!(state, before);
        assert_eq!(outcome.state.plots[0], before.plots[0]);
    }

    #[test]
    fn unknown_ids_are_skipped() {
        let content = base_content();
        let mut state = base_state(&content);
        state = with_plot(state, 0, building_at("gone", 0));
        state = with_plot(state, 1, animal_at("dodo", 0));
        let outcome = tick(&state, &content, &identity(), 100_000);
        assert_eq!(outcome.state.plots, state.plots);
        assert_eq!(outcome.state.resources, state.resources);
    }

    #[test]
    fn production_speed_shortens_animal_interval() {
        let content = base_content();
        let mut state = with_plot(base_state(&content), 0, animal_at("chicken", 0));
        state.resources.hay = 5.0;
        let mods = Modifiers {
            animal_production: 1.5,
            ..Modifiers::default()
        };
        assert_eq!(tick(&state, &content, &mods, 10_000).animals_produced, 1);
        assert_eq!(tick(&state, &content, &identity(), 10_000).animals_produced, 0);
    }

    #[test]
    fn conditions_follow_feed_age() {
        let content = base_content();
        let state = with_plot(base_state(&content), 0, animal_at("chicken", 0));
        let plot = &state.plots[0];
        assert_eq!(animal_condition(plot, &content, 1_000), Some(AnimalCondition::Fed));
        assert_eq!(animal_condition(plot, &content, 16_000), Some(AnimalCondition::Hungry));
        assert_eq!(animal_condition(plot, &content, 40_000), Some(AnimalCondition::Starving));
        assert_eq!(animal_condition(&state.plots[1], &content, 0), None);
    }
}
