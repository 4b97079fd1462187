//! Technology modifiers folded from the purchased tech set.
//!
//! Every channel starts at 1.0 and multiplies, except luck which starts at 0
//! and adds. `finalize` applies the master and prestige multipliers once.

use serde::{Deserialize, Serialize};

use crate::{BuildingDef, GameContent, Millis, ResourceBundle, ResourceKind, TechEffect, TechId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    pub growth: f64,
    pub yield_multiplier: f64,
    pub water_cost: f64,
    pub energy_production: f64,
    pub fertilizer_efficiency: f64,
    pub animal_production: f64,
    pub animal_yield: f64,
    pub luck_level: f64,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            growth: 1.0,
            yield_multiplier: 1.0,
            water_cost: 1.0,
            energy_production: 1.0,
            fertilizer_efficiency: 1.0,
            animal_production: 1.0,
            animal_yield: 1.0,
            luck_level: 0.0,
        }
    }
}

/// Raw per-channel products before master/prestige are applied.
#[derive(Debug, Clone, Copy)]
struct Channels {
    growth: f64,
    yield_multiplier: f64,
    water_cost: f64,
    energy_production: f64,
    fertilizer_efficiency: f64,
    animal_production: f64,
    animal_yield: f64,
    crop_rotation: f64,
    master: f64,
    luck: f64,
}

impl Channels {
    fn identity() -> Self {
        Self {
            growth: 1.0,
            yield_multiplier: 1.0,
            water_cost: 1.0,
            energy_production: 1.0,
            fertilizer_efficiency: 1.0,
            animal_production: 1.0,
            animal_yield: 1.0,
            crop_rotation: 1.0,
            master: 1.0,
            luck: 0.0,
        }
    }

    fn fold(mut self, effect: TechEffect) -> Self {
        match effect {
            TechEffect::Unlock => {}
            TechEffect::GrowthSpeed { value } => self.growth *= value,
            TechEffect::YieldMultiplier { value } => self.yield_multiplier *= value,
            TechEffect::WaterCost { value } => self.water_cost *= value,
            TechEffect::EnergyProduction { value } => self.energy_production *= value,
            TechEffect::FertilizerEfficiency { value } => self.fertilizer_efficiency *= value,
            TechEffect::AnimalProduction { value } => self.animal_production *= value,
            TechEffect::AnimalYield { value } => self.animal_yield *= value,
            TechEffect::CropRotation { value } => self.crop_rotation *= value,
            TechEffect::MasterMultiplier { value } => self.master *= value,
            TechEffect::Luck { value } => self.luck += value,
        }
        self
    }

    fn finalize(self, prestige_multiplier: f64) -> Modifiers {
        Modifiers {
            growth: self.growth * self.master,
            yield_multiplier: self.yield_multiplier
                * self.crop_rotation
                * self.master
                * prestige_multiplier,
            // master never discounts water
            water_cost: self.water_cost,
            energy_production: self.energy_production * self.master,
            fertilizer_efficiency: self.fertilizer_efficiency * self.master,
            animal_production: self.animal_production * self.master,
            animal_yield: self.animal_yield * self.master,
            luck_level: self.luck,
        }
    }
}

/// Folds `techs` into modifiers. Ids missing from the catalog contribute nothing.
pub fn compute_modifiers(
    techs: &[TechId],
    content: &GameContent,
    prestige_multiplier: f64,
) -> Modifiers {
    techs
        .iter()
        .filter_map(|id| content.tech(id))
        .fold(Channels::identity(), |channels, tech| channels.fold(tech.effect))
        .finalize(prestige_multiplier)
}

/// Luck contribution of `techs` alone; what the session stores on `GameState`.
pub fn luck_level(techs: &[TechId], content: &GameContent) -> f64 {
    techs
        .iter()
        .filter_map(|id| content.tech(id))
        .filter_map(|tech| match tech.effect {
            TechEffect::Luck { value } => Some(value),
            _ => None,
        })
        .sum()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_millis(value: f64) -> Millis {
    value.floor().max(0.0) as Millis
}

impl Modifiers {
    pub fn grow_time(&self, base: Millis) -> Millis {
        floor_millis(base as f64 / self.growth)
    }

    /// Water is scaled by `water_cost` and fertilizer divided by efficiency,
    /// both rounded up. Other keys pass through.
    pub fn crop_cost(&self, cost: &ResourceBundle) -> ResourceBundle {
        cost.iter()
            .map(|(kind, amount)| {
                let modified = match kind {
                    ResourceKind::Water => (amount * self.water_cost).ceil(),
                    ResourceKind::Fertilizer => (amount / self.fertilizer_efficiency).ceil(),
                    _ => *amount,
                };
                (*kind, modified)
            })
            .collect()
    }

    pub fn crop_yield(&self, base: &ResourceBundle) -> ResourceBundle {
        crate::ledger::scale_floor(base, self.yield_multiplier)
    }

    pub fn animal_interval(&self, base: Millis) -> Millis {
        floor_millis(base as f64 / self.animal_production)
    }

    pub fn animal_output(&self, base: &ResourceBundle) -> ResourceBundle {
        crate::ledger::scale_floor(base, self.animal_yield)
    }

    /// Energy producers scale their energy key; everything else is emitted as authored.
    pub fn building_output(&self, def: &BuildingDef) -> ResourceBundle {
        def.production
            .iter()
            .map(|(kind, amount)| {
                if def.energy_producer && *kind == ResourceKind::Energy {
                    (*kind, (amount * self.energy_production).floor())
                } else {
                    (*kind, *amount)
                }
            })
            .collect()
    }
}

/// Remembers the last computed modifiers, keyed on the inputs that can change them.
#[derive(Debug, Default)]
pub struct ModifierCache {
    key: Option<(Vec<TechId>, u64)>,
    value: Modifiers,
}

impl ModifierCache {
    pub fn get(
        &mut self,
        techs: &[TechId],
        content: &GameContent,
        prestige_multiplier: f64,
    ) -> Modifiers {
        let fresh = match &self.key {
            Some((cached_techs, bits)) => {
                cached_techs.as_slice() == techs && *bits == prestige_multiplier.to_bits()
            }
            None => false,
        };
        if !fresh {
            self.value = compute_modifiers(techs, content, prestige_multiplier);
            self.key = Some((techs.to_vec(), prestige_multiplier.to_bits()));
        }
        self.value
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }
}
