//! Read-only game catalog with lookups precomputed once per data load

use std::collections::{HashMap, HashSet};

use crate::models::{Building, Component, Corporation, Item, Level, Recipe};

/// The unique (building, recipe) pair that produces an item
#[derive(Debug, Clone, Copy)]
pub struct Producer<'a> {
    pub building: &'a Building,
    pub recipe: &'a Recipe,
    pub recipe_index: usize,
}

/// A corporation level that accepts an item as a reward component
#[derive(Debug, Clone, Copy)]
pub struct RewardComponent<'a> {
    pub corporation: &'a Corporation,
    pub level: &'a Level,
    pub component: &'a Component,
}

impl RewardComponent<'_> {
    pub fn level_cost(&self) -> f64 {
        self.level.cost
    }

    pub fn points_per_item(&self) -> f64 {
        self.component.points_per_item
    }
}

/// Problem found while indexing catalog data
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogIssue {
    /// A second (building, recipe) pair produces an item that already has a producer
    DuplicateProducer {
        item_id: String,
        kept: (String, usize),
        ignored: (String, usize),
    },
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    buildings: Vec<Building>,
    corporations: Vec<Corporation>,
    // item id -> (building position, recipe index)
    producers: HashMap<String, (usize, usize)>,
    // id -> position, first occurrence wins
    item_index: HashMap<String, usize>,
    building_index: HashMap<String, usize>,
    known_items: HashSet<String>,
    issues: Vec<CatalogIssue>,
}

impl Catalog {
    pub fn new(items: Vec<Item>, buildings: Vec<Building>, corporations: Vec<Corporation>) -> Self {
        let mut producers: HashMap<String, (usize, usize)> = HashMap::new();
        let mut known_items: HashSet<String> = items.iter().map(|i| i.id.clone()).collect();
        let mut issues = Vec::new();

        let mut item_index = HashMap::new();
        for (i, item) in items.iter().enumerate() {
            item_index.entry(item.id.clone()).or_insert(i);
        }
        let mut building_index = HashMap::new();
        for (b, building) in buildings.iter().enumerate() {
            building_index.entry(building.id.clone()).or_insert(b);
        }

        for (b, building) in buildings.iter().enumerate() {
            for (r, recipe) in building.recipes.iter().enumerate() {
                let output = &recipe.output.item_id;
                known_items.insert(output.clone());
                for input in &recipe.inputs {
                    known_items.insert(input.item_id.clone());
                }

                if let Some(&(kept_b, kept_r)) = producers.get(output) {
                    tracing::warn!(
                        item = %output,
                        kept = %buildings[kept_b].id,
                        ignored = %building.id,
                        "item has more than one producer, keeping the first"
                    );
                    issues.push(CatalogIssue::DuplicateProducer {
                        item_id: output.clone(),
                        kept: (buildings[kept_b].id.clone(), kept_r),
                        ignored: (building.id.clone(), r),
                    });
                } else {
                    producers.insert(output.clone(), (b, r));
                }
            }
        }

        for corp in &corporations {
            for level in &corp.levels {
                for component in &level.components {
                    known_items.insert(component.item_id.clone());
                }
            }
        }

        Self {
            items,
            buildings,
            corporations,
            producers,
            item_index,
            building_index,
            known_items,
            issues,
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn corporations(&self) -> &[Corporation] {
        &self.corporations
    }

    pub fn issues(&self) -> &[CatalogIssue] {
        &self.issues
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.item_index.get(id).map(|&i| &self.items[i])
    }

    pub fn building(&self, id: &str) -> Option<&Building> {
        self.building_index.get(id).map(|&b| &self.buildings[b])
    }

    /// Ids of every item with a producer, sorted
    pub fn producible_items(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.producers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Whether the id appears anywhere: item list, recipes, or reward components
    pub fn is_known(&self, item_id: &str) -> bool {
        self.known_items.contains(item_id)
    }

    pub fn producer(&self, item_id: &str) -> Option<Producer<'_>> {
        let &(b, r) = self.producers.get(item_id)?;
        let building = &self.buildings[b];
        Some(Producer {
            building,
            recipe: &building.recipes[r],
            recipe_index: r,
        })
    }

    /// First corporation level, in catalog order, listing the item as a component
    pub fn reward_component(&self, item_id: &str) -> Option<RewardComponent<'_>> {
        self.corporations.iter().find_map(|corporation| {
            corporation.levels.iter().find_map(|level| {
                level
                    .components
                    .iter()
                    .find(|c| c.item_id == item_id)
                    .map(|component| RewardComponent {
                        corporation,
                        level,
                        component,
                    })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemCategory, ItemRate};

    fn building(id: &str, recipes: Vec<Recipe>) -> Building {
        Building {
            id: id.to_string(),
            name: id.to_string(),
            power_per_unit: 1.0,
            heat_per_unit: None,
            recipes,
        }
    }

    fn recipe(output: &str, rate: f64, inputs: &[(&str, f64)]) -> Recipe {
        Recipe {
            output: ItemRate::new(output, rate),
            inputs: inputs.iter().map(|&(i, r)| ItemRate::new(i, r)).collect(),
        }
    }

    #[test]
    fn producer_lookup_returns_recipe_index() {
        let catalog = Catalog::new(
            vec![],
            vec![building(
                "fab",
                vec![recipe("beam", 30.0, &[("bar", 60.0)]), recipe("sheet", 30.0, &[])],
            )],
            vec![],
        );
        let producer = catalog.producer("sheet").unwrap();
        assert_eq!(producer.building.id, "fab");
        assert_eq!(producer.recipe_index, 1);
        assert!(catalog.producer("bar").is_none());
        assert!(catalog.is_known("bar"));
        assert!(!catalog.is_known("nothing"));
    }

    #[test]
    fn producible_items_are_sorted_outputs() {
        let catalog = Catalog::new(
            vec![],
            vec![
                building(
                    "fab",
                    vec![recipe("sheet", 30.0, &[("bar", 30.0)]), recipe("beam", 30.0, &[])],
                ),
                building("smelter", vec![recipe("bar", 60.0, &[("ore", 90.0)])]),
                building("copy", vec![recipe("bar", 30.0, &[])]),
            ],
            vec![],
        );
        assert_eq!(catalog.producible_items(), vec!["bar", "beam", "sheet"]);
        assert!(Catalog::default().producible_items().is_empty());
    }

    #[test]
    fn lookups_by_id_use_first_occurrence() {
        let item = |id: &str, name: &str| Item {
            id: id.to_string(),
            name: name.to_string(),
            category: ItemCategory::Raw,
        };
        let mut second = building("smelter", vec![]);
        second.power_per_unit = 99.0;
        let catalog = Catalog::new(
            vec![item("ore", "Ore"), item("coal", "Coal"), item("ore", "Other Ore")],
            vec![building("drill", vec![]), building("smelter", vec![]), second],
            vec![],
        );
        assert_eq!(catalog.item("ore").unwrap().name, "Ore");
        assert_eq!(catalog.item("coal").unwrap().name, "Coal");
        assert!(catalog.item("sand").is_none());
        assert_eq!(catalog.building("smelter").unwrap().power_per_unit, 1.0);
        assert_eq!(catalog.building("drill").unwrap().id, "drill");
        assert!(catalog.building("press").is_none());
    }

    #[test]
    fn duplicate_producer_keeps_first() {
        let catalog = Catalog::new(
            vec![],
            vec![
                building("a", vec![recipe("bar", 60.0, &[])]),
                building("b", vec![recipe("bar", 30.0, &[])]),
            ],
            vec![],
        );
        assert_eq!(catalog.producer("bar").unwrap().building.id, "a");
        assert_eq!(
            catalog.issues(),
            &[CatalogIssue::DuplicateProducer {
                item_id: "bar".to_string(),
                kept: ("a".to_string(), 0),
                ignored: ("b".to_string(), 0),
            }]
        );
    }

    #[test]
    fn reward_component_scans_levels_in_order() {
        let level = |n: u32, cost: f64, item: &str, points: f64| Level {
            level: n,
            cost,
            components: vec![Component {
                item_id: item.to_string(),
                points_per_item: points,
                cost_in_items: None,
            }],
        };
        let catalog = Catalog::new(
            vec![Item {
                id: "bar".to_string(),
                name: "Bar".to_string(),
                category: ItemCategory::Processed,
            }],
            vec![],
            vec![Corporation {
                id: "corp".to_string(),
                name: "Corp".to_string(),
                levels: vec![level(1, 100.0, "plate", 1.0), level(2, 500.0, "bar", 4.0)],
            }],
        );
        let reward = catalog.reward_component("bar").unwrap();
        assert_eq!(reward.level_cost(), 500.0);
        assert_eq!(reward.points_per_item(), 4.0);
        assert!(catalog.reward_component("ore").is_none());
        assert!(catalog.is_known("plate"));
    }
}
