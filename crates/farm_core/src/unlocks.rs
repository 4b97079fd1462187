//! Which catalog items the purchased tech set makes available.

use serde::Serialize;

use crate::cache::FifoCache;
use crate::{AnimalId, BuildingId, CropId, GameContent, TechDef, TechId};

/// An item gated by `required_tech` is unlocked once that tech is purchased.
pub fn is_unlocked(required_tech: Option<&TechId>, techs: &[TechId]) -> bool {
    required_tech.is_none_or(|tech| techs.contains(tech))
}

/// Not yet purchased, and every prerequisite purchased.
pub fn is_tech_available(tech: &TechDef, techs: &[TechId]) -> bool {
    !techs.contains(&tech.id) && tech.prerequisites.iter().all(|p| techs.contains(p))
}

pub fn missing_prerequisites(tech: &TechDef, techs: &[TechId]) -> Vec<TechId> {
    tech.prerequisites
        .iter()
        .filter(|p| !techs.contains(p))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UnlockSet {
    pub crops: Vec<CropId>,
    pub animals: Vec<AnimalId>,
    pub buildings: Vec<BuildingId>,
    pub available_techs: Vec<TechId>,
}

/// Catalog order throughout.
pub fn resolve_unlocks(content: &GameContent, techs: &[TechId]) -> UnlockSet {
    UnlockSet {
        crops: content
            .crops
            .iter()
            .filter(|c| is_unlocked(c.required_tech.as_ref(), techs))
            .map(|c| c.id.clone())
            .collect(),
        animals: content
            .animals
            .iter()
            .filter(|a| is_unlocked(a.required_tech.as_ref(), techs))
            .map(|a| a.id.clone())
            .collect(),
        buildings: content
            .buildings
            .iter()
            .filter(|b| is_unlocked(b.required_tech.as_ref(), techs))
            .map(|b| b.id.clone())
            .collect(),
        available_techs: content
            .techs
            .iter()
            .filter(|t| is_tech_available(t, techs))
            .map(|t| t.id.clone())
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechStatus {
    pub id: TechId,
    pub purchased: bool,
    pub available: bool,
}

/// Every tech that is either purchased or purchasable now, in catalog order.
pub fn tech_statuses(content: &GameContent, techs: &[TechId]) -> Vec<TechStatus> {
    content
        .techs
        .iter()
        .filter_map(|tech| {
            let purchased = techs.contains(&tech.id);
            let available = is_tech_available(tech, techs);
            (purchased || available).then(|| TechStatus {
                id: tech.id.clone(),
                purchased,
                available,
            })
        })
        .collect()
}

fn cache_key(techs: &[TechId]) -> String {
    let mut sorted: Vec<&str> = techs.iter().map(|t| t.0.as_str()).collect();
    sorted.sort_unstable();
    sorted.join(",")
}

/// Memoizes `resolve_unlocks` per tech set. Purchase order does not matter.
#[derive(Debug, Clone)]
pub struct UnlockResolver {
    cache: FifoCache<String, UnlockSet>,
}

impl UnlockResolver {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: FifoCache::new(capacity),
        }
    }

    pub fn resolve(&mut self, content: &GameContent, techs: &[TechId]) -> &UnlockSet {
        self.cache
            .get_or_insert_with(cache_key(techs), || resolve_unlocks(content, techs))
    }

    pub fn cached_sets(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::base_content;

    fn ids(list: &[&str]) -> Vec<TechId> {
        list.iter().map(|id| TechId::from(*id)).collect()
    }

    #[test]
    fn ungated_items_start_unlocked() {
        let content = base_content();
        let unlocks = resolve_unlocks(&content, &[]);
        assert_eq!(unlocks.crops, vec![CropId::from("wheat")]);
        assert_eq!(unlocks.animals, vec![AnimalId::from("chicken")]);
        assert_eq!(
            unlocks.buildings,
            ["well", "research_lab", "silo"]
                .map(BuildingId::from)
                .to_vec()
        );

        let ungated_crops: Vec<CropId> = content
            .crops
            .iter()
            .filter(|c| c.required_tech.is_none())
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(unlocks.crops, ungated_crops);
    }

    #[test]
    fn root_techs_available_at_start() {
        let unlocks = resolve_unlocks(&base_content(), &[]);
        assert_eq!(
            unlocks.available_techs,
            ids(&["tech_root_crops", "tech_chickens", "tech_automation_basic"])
        );
    }

    #[test]
    fn purchase_opens_gated_items_and_dependents() {
        let unlocks = resolve_unlocks(&base_content(), &ids(&["tech_root_crops"]));
        assert!(unlocks.crops.contains(&CropId::from("carrot")));
        assert!(unlocks.available_techs.contains(&TechId::from("tech_yield_1")));
        assert!(!unlocks.available_techs.contains(&TechId::from("tech_root_crops")));
        assert!(!unlocks.available_techs.contains(&TechId::from("tech_lucky_charm")));
    }

    #[test]
    fn unlocks_are_monotonic_in_the_tech_set() {
        let content = base_content();
        let all: Vec<TechId> = content.techs.iter().map(|t| t.id.clone()).collect();
        for n in 0..all.len() {
            let smaller = resolve_unlocks(&content, &all[..n]);
            let larger = resolve_unlocks(&content, &all[..=n]);
            for crop in &smaller.crops {
                assert!(larger.crops.contains(crop));
            }
            for animal in &smaller.animals {
                assert!(larger.animals.contains(animal));
            }
            for building in &smaller.buildings {
                assert!(larger.buildings.contains(building));
            }
        }
    }

    #[test]
    fn every_unlocked_item_has_its_gate_purchased() {
        let content = base_content();
        let techs = ids(&["tech_chickens"]);
        let unlocks = resolve_unlocks(&content, &techs);
        for crop_id in &unlocks.crops {
            let crop = content.crop(crop_id).unwrap();
            assert!(is_unlocked(crop.required_tech.as_ref(), &techs));
        }
        for animal_id in &unlocks.animals {
            let animal = content.animal(animal_id).unwrap();
            assert!(is_unlocked(animal.required_tech.as_ref(), &techs));
        }
    }

    #[test]
    fn statuses_cover_purchased_and_available() {
        let content = base_content();
        let statuses = tech_statuses(&content, &ids(&["tech_root_crops"]));
        let root = statuses
            .iter()
            .find(|s| s.id == TechId::from("tech_root_crops"))
            .unwrap();
        assert!(root.purchased && !root.available);
        let yield_1 = statuses
            .iter()
            .find(|s| s.id == TechId::from("tech_yield_1"))
            .unwrap();
        assert!(!yield_1.purchased && yield_1.available);
        assert!(statuses.iter().all(|s| s.id != TechId::from("tech_yield_2")));
    }

    #[test]
    fn missing_prerequisites_lists_unpurchased() {
        let content = base_content();
        let lucky = content.tech(&"tech_lucky_charm".into()).unwrap();
        assert_eq!(
            missing_prerequisites(lucky, &ids(&["tech_chickens"])),
            ids(&["tech_root_crops"])
        );
    }

    #[test]
    fn resolver_shares_entries_across_purchase_order() {
        let content = base_content();
        let mut resolver = UnlockResolver::new(100);
        let first = resolver
            .resolve(&content, &ids(&["tech_root_crops", "tech_chickens"]))
            .clone();
        let second = resolver
            .resolve(&content, &ids(&["tech_chickens", "tech_root_crops"]))
            .clone();
        assert_eq!(first, second);
        assert_eq!(resolver.cached_sets(), 1);
    }

    #[test]
    fn resolver_stays_bounded() {
        let content = base_content();
        let mut resolver = UnlockResolver::new(2);
        resolver.resolve(&content, &[]);
        resolver.resolve(&content, &ids(&["tech_root_crops"]));
        resolver.resolve(&content, &ids(&["tech_chickens"]));
        assert_eq!(resolver.cached_sets(), 2);
    }
}
