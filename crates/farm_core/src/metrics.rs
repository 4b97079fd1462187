//! Snapshot metrics computed from `GameState`.
//!
//! `compute_metrics` samples the farm for time-series analysis of headless
//! runs. No state mutation; the CSV helpers are the only IO.

use std::io::Write;

use serde::Serialize;

use crate::production::{animal_condition, AnimalCondition};
use crate::{GameContent, GameState, Millis, PlotContents};

/// Bump when columns are added, removed or reordered.
const METRICS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub at_ms: Millis,
    pub metrics_version: u32,
    pub playtime_ms: Millis,

    // Ledger
    pub gold: f64,
    pub seeds: f64,
    pub water: f64,
    pub fertilizer: f64,
    pub energy: f64,
    pub research: f64,
    pub hay: f64,
    pub animal_goods: f64,

    // Grid
    pub empty_plots: u32,
    pub crops_growing: u32,
    pub crops_ready: u32,
    pub buildings: u32,
    pub animals: u32,
    pub animals_starving: u32,

    // Progression
    pub techs_purchased: u32,
    pub achievements_completed: u32,
    pub total_harvested: u64,
    pub total_gold_earned: f64,
    pub total_animal_products: u64,
    pub critical_harvests: u64,
    pub luck_level: f64,
}

#[derive(Default)]
struct GridCounts {
    empty: u32,
    growing: u32,
    ready: u32,
    buildings: u32,
    animals: u32,
    starving: u32,
}

pub fn compute_metrics(state: &GameState, content: &GameContent, now: Millis) -> MetricsSnapshot {
    let mut grid = GridCounts::default();
    for plot in &state.plots {
        match &plot.contents {
            PlotContents::Empty => grid.empty += 1,
            PlotContents::Crop { completes_at, .. } if *completes_at > now => grid.growing += 1,
            PlotContents::Crop { .. } => grid.ready += 1,
            PlotContents::Building { .. } => grid.buildings += 1,
            PlotContents::Animal { .. } => {
                grid.animals += 1;
                if animal_condition(plot, content, now) == Some(AnimalCondition::Starving) {
                    grid.starving += 1;
                }
            }
        }
    }

    let r = &state.resources;
    MetricsSnapshot {
        at_ms: now,
        metrics_version: METRICS_VERSION,
        playtime_ms: now.saturating_sub(state.start_time),
        gold: r.gold,
        seeds: r.seeds,
        water: r.water,
        fertilizer: r.fertilizer,
        energy: r.energy,
        research: r.research,
        hay: r.hay,
        animal_goods: r.milk + r.eggs + r.wool + r.leather + r.meat,
        empty_plots: grid.empty,
        crops_growing: grid.growing,
        crops_ready: grid.ready,
        buildings: grid.buildings,
        animals: grid.animals,
        animals_starving: grid.starving,
        techs_purchased: u32::try_from(state.techs.len()).unwrap_or(u32::MAX),
        achievements_completed: u32::try_from(state.achievements.len()).unwrap_or(u32::MAX),
        total_harvested: state.total_harvested,
        total_gold_earned: state.total_gold_earned,
        total_animal_products: state.total_animal_products,
        critical_harvests: state.critical_harvest_count,
        luck_level: state.luck_level,
    }
}

pub fn write_metrics_header(writer: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "at_ms,metrics_version,playtime_ms,\
         gold,seeds,water,fertilizer,energy,research,hay,animal_goods,\
         empty_plots,crops_growing,crops_ready,buildings,animals,animals_starving,\
         techs_purchased,achievements_completed,total_harvested,total_gold_earned,\
         total_animal_products,critical_harvests,luck_level"
    )
}

pub fn append_metrics_row(
    writer: &mut impl Write,
    snapshot: &MetricsSnapshot,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        snapshot.at_ms,
        snapshot.metrics_version,
        snapshot.playtime_ms,
        snapshot.gold,
        snapshot.seeds,
        snapshot.water,
        snapshot.fertilizer,
        snapshot.energy,
        snapshot.research,
        snapshot.hay,
        snapshot.animal_goods,
        snapshot.empty_plots,
        snapshot.crops_growing,
        snapshot.crops_ready,
        snapshot.buildings,
        snapshot.animals,
        snapshot.animals_starving,
        snapshot.techs_purchased,
        snapshot.achievements_completed,
        snapshot.total_harvested,
        snapshot.total_gold_earned,
        snapshot.total_animal_products,
        snapshot.critical_harvests,
        snapshot.luck_level,
    )
}

/// Write a collection of snapshots to one CSV file.
pub fn write_metrics_csv(
    path: &std::path::Path,
    snapshots: &[MetricsSnapshot],
) -> std::io::Result<()> {
    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_metrics_header(&mut writer)?;
    for snapshot in snapshots {
        append_metrics_row(&mut writer, snapshot)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{animal_at, base_content, base_state, building_at, crop_at, with_plot};

    #[test]
    fn grid_is_classified() {
        let content = base_content();
        let mut state = base_state(&content);
        state = with_plot(state, 0, crop_at("wheat", 0, 10_000));
        state = with_plot(state, 1, crop_at("wheat", 0, 1_000));
        state = with_plot(state, 2, building_at("well", 0));
        state = with_plot(state, 3, animal_at("chicken", 0));
        let metrics = compute_metrics(&state, &content, 5_000);
        assert_eq!(metrics.crops_growing, 1);
        assert_eq!(metrics.crops_ready, 1);
        assert_eq!(metrics.buildings, 1);
        assert_eq!(metrics.animals, 1);
        assert_eq!(metrics.animals_starving, 0);
        assert_eq!(metrics.empty_plots, 16);
        assert_eq!(metrics.playtime_ms, 5_000);

        let later = compute_metrics(&state, &content, 40_000);
        assert_eq!(later.animals_starving, 1);
    }

    #[test]
    fn csv_rows_match_header_width() {
        let content = base_content();
        let state = base_state(&content);
        let mut buf = Vec::new();
        write_metrics_header(&mut buf).unwrap();
        append_metrics_row(&mut buf, &compute_metrics(&state, &content, 0)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].split(',').count(),
            lines[1].split(',').count()
        );
    }
}
