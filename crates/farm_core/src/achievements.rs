//! One-time achievements measured against progress counters.
//!
//! Completion is a ratchet: ids are only ever appended, rewards are granted
//! once, and losing progress later (selling a building, say) never revokes.

use std::collections::BTreeSet;

use crate::activity;
use crate::{
    ledger, AchievementDef, AchievementId, AchievementMetric, GameContent, GameState, LogKind,
    Millis, PlotContents, ResourceBundle,
};

/// Plot-derived counters. Scanning the grid is done at most once per check.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlotCounts {
    pub animals: usize,
    pub buildings: usize,
    pub automation_buildings: usize,
    pub crop_variety: usize,
    pub animal_variety: usize,
}

pub fn count_plots(state: &GameState, content: &GameContent) -> PlotCounts {
    let automation = &content.constants.automation_building_ids;
    let mut counts = PlotCounts::default();
    let mut crops = BTreeSet::new();
    let mut animals = BTreeSet::new();
    for plot in &state.plots {
        match &plot.contents {
            PlotContents::Crop { crop_id, .. } => {
                crops.insert(crop_id);
            }
            PlotContents::Animal { animal_id, .. } => {
                counts.animals += 1;
                animals.insert(animal_id);
            }
            PlotContents::Building { building_id, .. } => {
                counts.buildings += 1;
                if automation.contains(building_id) {
                    counts.automation_buildings += 1;
                }
            }
            PlotContents::Empty => {}
        }
    }
    counts.crop_variety = crops.len();
    counts.animal_variety = animals.len();
    counts
}

struct Progress<'a> {
    state: &'a GameState,
    content: &'a GameContent,
    plots: Option<PlotCounts>,
}

impl<'a> Progress<'a> {
    fn new(state: &'a GameState, content: &'a GameContent) -> Self {
        Self {
            state,
            content,
            plots: None,
        }
    }

    fn plots(&mut self) -> PlotCounts {
        *self
            .plots
            .get_or_insert_with(|| count_plots(self.state, self.content))
    }

    fn value(&mut self, metric: AchievementMetric) -> f64 {
        match metric {
            AchievementMetric::TotalHarvested => self.state.total_harvested as f64,
            AchievementMetric::TotalGoldEarned => self.state.total_gold_earned,
            AchievementMetric::TechCount => self.state.techs.len() as f64,
            AchievementMetric::AnimalCount => self.plots().animals as f64,
            AchievementMetric::TotalAnimalProducts => self.state.total_animal_products as f64,
            AchievementMetric::AutomationBuildingCount => self.plots().automation_buildings as f64,
            AchievementMetric::BuildingCount => self.plots().buildings as f64,
            AchievementMetric::CropVariety => self.plots().crop_variety as f64,
            AchievementMetric::AnimalVariety => self.plots().animal_variety as f64,
            AchievementMetric::CriticalHarvests => self.state.critical_harvest_count as f64,
        }
    }
}

/// Current progress toward `def`, for display.
pub fn progress(state: &GameState, content: &GameContent, def: &AchievementDef) -> f64 {
    Progress::new(state, content).value(def.metric)
}

#[derive(Debug, Clone)]
pub struct AchievementOutcome {
    pub state: GameState,
    pub completed: Vec<AchievementId>,
    pub rewards: ResourceBundle,
}

/// Unthrottled scan. Appends every newly met achievement, grants the batched
/// rewards, and writes one log entry per completion.
pub fn check_achievements(
    state: &GameState,
    content: &GameContent,
    now: Millis,
) -> AchievementOutcome {
    let mut progress = Progress::new(state, content);
    let completed: Vec<&AchievementDef> = content
        .achievements
        .iter()
        .filter(|def| !state.has_achievement(&def.id))
        .filter(|def| progress.value(def.metric) >= def.requirement)
        .collect();

    if completed.is_empty() {
        return AchievementOutcome {
            state: state.clone(),
            completed: Vec::new(),
            rewards: ResourceBundle::new(),
        };
    }

    let mut next = state.clone();
    let mut rewards = ResourceBundle::new();
    let capacity = content.constants.activity_log_capacity;
    for def in &completed {
        next.achievements.push(def.id.clone());
        rewards = ledger::merge_bundles(&rewards, &def.reward);
        activity::record(
            &mut next,
            LogKind::Achievement,
            format!("Achievement unlocked: {}", def.name),
            Some(def.reward.clone()),
            now,
            capacity,
        );
    }
    next.resources = ledger::add(&next.resources, &rewards);

    AchievementOutcome {
        state: next,
        completed: completed.iter().map(|def| def.id.clone()).collect(),
        rewards,
    }
}

/// Rate limit for achievement scans: at most one per cooldown window.
#[derive(Debug, Clone)]
pub struct AchievementTracker {
    cooldown_ms: Millis,
    last_check: Option<Millis>,
}

impl AchievementTracker {
    pub fn new(cooldown_ms: Millis) -> Self {
        Self {
            cooldown_ms,
            last_check: None,
        }
    }

    /// `None` inside the cooldown window; the first call always scans.
    pub fn check(
        &mut self,
        state: &GameState,
        content: &GameContent,
        now: Millis,
    ) -> Option<AchievementOutcome> {
        if let Some(last) = self.last_check {
            if now.saturating_sub(last) < self.cooldown_ms {
                tracing::trace!(now, last, "achievement check throttled");
                return None;
            }
        }
        self.last_check = Some(now);
        Some(check_achievements(state, content, now))
    }

    pub fn reset(&mut self) {
        self.last_check = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{animal_at, base_content, base_state, building_at, crop_at, with_plot};
    use crate::ResourceKind;

    #[test]
    fn first_harvest_grants_reward_once() {
        let content = base_content();
        let mut state = base_state(&content);
        state.total_harvested = 1;

        let outcome = check_achievements(&state, &content, 5);
        assert_eq!(outcome.completed, vec![AchievementId::from("first_harvest")]);
        assert!((outcome.state.resources.gold - 200.0).abs() < 1e-9);
        assert_eq!(outcome.state.activity_log[0].kind, LogKind::Achievement);

        let again = check_achievements(&outcome.state, &content, 10);
        assert!(again.completed.is_empty());
        assert!((again.state.resources.gold - 200.0).abs() < 1e-9);
    }

    #[test]
    fn completion_survives_lost_progress() {
        let content = base_content();
        let state = with_plot(base_state(&content), 0, animal_at("chicken", 0));
        let outcome = check_achievements(&state, &content, 0);
        assert!(outcome.state.has_achievement(&"first_animal".into()));

        let mut removed = outcome.state.clone();
        removed.plots[0].contents = PlotContents::Empty;
        let later = check_achievements(&removed, &content, 10);
        assert!(later.state.has_achievement(&"first_animal".into()));
        assert_eq!(later.state.achievements.len(), outcome.state.achievements.len());
    }

    #[test]
    fn rewards_are_batched() {
        let content = base_content();
        let mut state = base_state(&content);
        state.total_harvested = 10;
        let outcome = check_achievements(&state, &content, 0);
        assert_eq!(outcome.completed.len(), 2);
        assert!((outcome.rewards[&ResourceKind::Gold] - 150.0).abs() < 1e-9);
        assert!((outcome.state.resources.gold - 300.0).abs() < 1e-9);
        assert!((outcome.state.resources.seeds - 30.0).abs() < 1e-9);
    }

    #[test]
    fn plot_counts() {
        let content = base_content();
        let mut state = base_state(&content);
        state = with_plot(state, 0, building_at("well", 0));
        state = with_plot(state, 1, building_at("silo", 0));
        state = with_plot(state, 2, animal_at("chicken", 0));
        state = with_plot(state, 3, animal_at("chicken", 0));
        state = with_plot(state, 4, crop_at("wheat", 0, 1));
        state = with_plot(state, 5, crop_at("carrot", 0, 1));
        let counts = count_plots(&state, &content);
        assert_eq!(
            counts,
            PlotCounts {
                animals: 2,
                buildings: 2,
                automation_buildings: 1,
                crop_variety: 2,
                animal_variety: 1,
            }
        );
    }

    #[test]
    fn tracker_throttles_within_cooldown() {
        let content = base_content();
        let mut tracker = AchievementTracker::new(1_000);
        let mut state = base_state(&content);

        assert!(tracker.check(&state, &content, 0).is_some());
        state.total_harvested = 1;
        assert!(tracker.check(&state, &content, 999).is_none());
        let outcome = tracker.check(&state, &content, 1_000).unwrap();
        assert_eq!(outcome.completed, vec![AchievementId::from("first_harvest")]);
    }

    #[test]
    fn tracker_reset_allows_immediate_scan() {
        let content = base_content();
        let mut tracker = AchievementTracker::new(1_000);
        let state = base_state(&content);
        tracker.check(&state, &content, 0);
        tracker.reset();
        assert!(tracker.check(&state, &content, 1).is_some());
    }
}
