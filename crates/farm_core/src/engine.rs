//! `FarmSession`: the single owner of a running farm.
//!
//! Holds the snapshot together with everything derived from it (modifier
//! cache, unlock memo, achievement throttle) and the RNG. Every state change
//! goes through `commit`, which refreshes derived fields and marks the
//! session dirty for the persistence layer.

use rand::Rng;

use crate::achievements::AchievementTracker;
use crate::commands::{self, CommandOutcome};
use crate::error::CommandError;
use crate::modifiers::{self, ModifierCache, Modifiers};
use crate::production::{self, TickOutcome};
use crate::queue;
use crate::unlocks::{self, TechStatus, UnlockResolver, UnlockSet};
use crate::{AchievementId, GameContent, GameState, Intent, Millis, QueueTask};

pub struct FarmSession<R: Rng> {
    state: GameState,
    content: GameContent,
    rng: R,
    modifier_cache: ModifierCache,
    unlock_resolver: UnlockResolver,
    achievement_tracker: AchievementTracker,
    revision: u64,
    saved_revision: u64,
}

/// Summary of one `FarmSession::tick`, without the state copy.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub buildings_fired: u32,
    pub animals_produced: u32,
    pub animals_fed: u32,
    pub achievements: Vec<AchievementId>,
}

impl<R: Rng> FarmSession<R> {
    pub fn new(content: GameContent, state: GameState, rng: R) -> Self {
        let unlock_resolver = UnlockResolver::new(content.constants.unlock_cache_capacity);
        let achievement_tracker =
            AchievementTracker::new(content.constants.achievement_check_cooldown_ms);
        let mut session = Self {
            unlock_resolver,
            achievement_tracker,
            modifier_cache: ModifierCache::default(),
            state,
            content,
            rng,
            revision: 0,
            saved_revision: 0,
        };
        session.state.luck_level = modifiers::luck_level(&session.state.techs, &session.content);
        session
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn content(&self) -> &GameContent {
        &self.content
    }

    pub fn modifiers(&mut self) -> Modifiers {
        self.modifier_cache.get(
            &self.state.techs,
            &self.content,
            self.state.prestige_multiplier,
        )
    }

    pub fn unlocks(&mut self) -> &UnlockSet {
        self.unlock_resolver.resolve(&self.content, &self.state.techs)
    }

    pub fn tech_statuses(&self) -> Vec<TechStatus> {
        unlocks::tech_statuses(&self.content, &self.state.techs)
    }

    pub fn pending_tasks(&self, now: Millis) -> Vec<QueueTask> {
        queue::pending_tasks(&self.state, now)
    }

    // -----------------------------------------------------------------------
    // State updates
    // -----------------------------------------------------------------------

    /// Replaces the snapshot with `update(current)`.
    pub fn apply(&mut self, update: impl FnOnce(&GameState) -> GameState) {
        let next = update(&self.state);
        self.commit(next);
    }

    /// Replaces the snapshot outright (loading a save, resetting).
    pub fn replace(&mut self, next: GameState) {
        self.achievement_tracker.reset();
        self.commit(next);
    }

    fn commit(&mut self, mut next: GameState) {
        next.luck_level = modifiers::luck_level(&next.techs, &self.content);
        self.state = next;
        self.revision += 1;
    }

    /// Applies a player intent, then runs the throttled achievement check.
    /// The returned outcome carries the committed state and log entries from
    /// both passes. Errors leave the snapshot untouched.
    pub fn apply_intent(
        &mut self,
        intent: &Intent,
        now: Millis,
    ) -> Result<CommandOutcome, CommandError> {
        let mods = self.modifiers();
        let outcome = match intent {
            Intent::PlaceCrop { plot_id, crop_id } => {
                commands::place_crop(&self.state, &self.content, &mods, plot_id, crop_id, now)
            }
            Intent::PlaceAnimal { plot_id, animal_id } => {
                commands::place_animal(&self.state, &self.content, plot_id, animal_id, now)
            }
            Intent::PlaceBuilding {
                plot_id,
                building_id,
            } => commands::place_building(&self.state, &self.content, plot_id, building_id, now),
            Intent::HarvestPlot { plot_id } => commands::harvest_plot(
                &self.state,
                &self.content,
                &mods,
                plot_id,
                now,
                &mut self.rng,
            ),
            Intent::PurchaseTech { tech_id } => {
                commands::purchase_tech(&self.state, &self.content, tech_id, now)
            }
            Intent::CancelTask { task_id } => Ok(queue::cancel_task(&self.state, task_id, now)),
        }?;

        let mut outcome = outcome;
        if outcome.applied {
            self.commit(outcome.state.clone());
        }
        let completed = self.check_achievements(now).len();
        if completed > 0 {
            let mut log: Vec<_> = self
                .state
                .activity_log
                .iter()
                .take(completed)
                .cloned()
                .collect();
            log.append(&mut outcome.log);
            outcome.log = log;
        }
        outcome.state = self.state.clone();
        Ok(outcome)
    }

    /// Runs one production step at `now`, then the throttled achievement check.
    pub fn tick(&mut self, now: Millis) -> TickReport {
        let mods = self.modifiers();
        let TickOutcome {
            state,
            buildings_fired,
            animals_produced,
            animals_fed,
            ..
        } = production::tick(&self.state, &self.content, &mods, now);
        if buildings_fired + animals_produced + animals_fed > 0 {
            self.commit(state);
        }
        TickReport {
            buildings_fired,
            animals_produced,
            animals_fed,
            achievements: self.check_achievements(now),
        }
    }

    fn check_achievements(&mut self, now: Millis) -> Vec<AchievementId> {
        let Some(outcome) = self
            .achievement_tracker
            .check(&self.state, &self.content, now)
        else {
            return Vec::new();
        };
        if outcome.completed.is_empty() {
            return Vec::new();
        }
        tracing::debug!(count = outcome.completed.len(), "achievements completed");
        self.commit(outcome.state);
        outcome.completed
    }

    // -----------------------------------------------------------------------
    // Persistence hooks
    // -----------------------------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    /// Bumped by every commit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The snapshot to write, stamped with `last_save_time = now`. The
    /// session stays dirty until `mark_saved` confirms the write.
    pub fn snapshot_for_save(&self, now: Millis) -> GameState {
        GameState {
            last_save_time: now,
            ..self.state.clone()
        }
    }

    /// Records a successful write of the snapshot taken at `revision`.
    /// Commits made after that snapshot keep the session dirty.
    pub fn mark_saved(&mut self, revision: u64, now: Millis) {
        if revision > self.saved_revision {
            self.saved_revision = revision;
            self.state.last_save_time = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, base_state, make_rng};
    use crate::{plot_id_for_index, TechId};
    use rand_chacha::ChaCha8Rng;

    fn session() -> FarmSession<ChaCha8Rng> {
        let content = base_content();
        let state = base_state(&content);
        FarmSession::new(content, state, make_rng())
    }

    #[test]
    fn intents_mark_dirty_and_log() {
        let mut session = session();
        assert!(!session.is_dirty());
        let outcome = session
            .apply_intent(
                &Intent::PlaceCrop {
                    plot_id: plot_id_for_index(0),
                    crop_id: "wheat".into(),
                },
                0,
            )
            .unwrap();
        assert!(outcome.applied);
        assert!(session.is_dirty());
        assert_eq!(session.state().activity_log.len(), 1);
    }

    #[test]
    fn errors_leave_state_alone() {
        let mut session = session();
        let before = session.state().clone();
        let err = session
            .apply_intent(
                &Intent::HarvestPlot {
                    plot_id: plot_id_for_index(0),
                },
                0,
            )
            .unwrap_err();
        assert_eq!(err, CommandError::NotACrop);
        assert_eq!(session.state(), &before);
        assert!(!session.is_dirty());
    }

    #[test]
    fn commit_derives_luck_from_techs() {
        let mut session = session();
        session.apply(|prev| {
            let mut next = prev.clone();
            next.techs = vec![
                TechId::from("tech_root_crops"),
                TechId::from("tech_chickens"),
                TechId::from("tech_lucky_charm"),
            ];
            next.luck_level = 99.0;
            next
        });
        assert!((session.state().luck_level - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unlocks_follow_purchases() {
        let mut session = session();
        assert!(!session.unlocks().crops.contains(&"carrot".into()));
        session.apply(|prev| {
            let mut next = prev.clone();
            next.resources.research = 10.0;
            next
        });
        session
            .apply_intent(
                &Intent::PurchaseTech {
                    tech_id: "tech_root_crops".into(),
                },
                0,
            )
            .unwrap();
        assert!(session.unlocks().crops.contains(&"carrot".into()));
    }

    #[test]
    fn only_a_confirmed_save_clears_dirty() {
        let mut session = session();
        session.replace(base_state(session.content()));
        assert!(session.is_dirty());
        let revision = session.revision();
        let saved = session.snapshot_for_save(1_234);
        assert_eq!(saved.last_save_time, 1_234);
        assert!(session.is_dirty());

        session.mark_saved(revision, 1_234);
        assert!(!session.is_dirty());
        assert_eq!(session.state().last_save_time, 1_234);
    }

    #[test]
    fn commits_after_the_snapshot_stay_dirty() {
        let mut session = session();
        session.replace(base_state(session.content()));
        let revision = session.revision();
        let _ = session.snapshot_for_save(10);
        session.apply(|prev| {
            let mut next = prev.clone();
            next.resources.gold += 1.0;
            next
        });
        session.mark_saved(revision, 10);
        assert!(session.is_dirty());
    }

    #[test]
    fn quiet_ticks_do_not_dirty() {
        let mut session = session();
        let report = session.tick(100);
        assert_eq!(report.buildings_fired, 0);
        assert!(!session.is_dirty());
    }
}
