//! Built-in sample catalog for trying the planner without a dataset

use crate::calculator::LAUNCHER_BUILDING_ID;
use crate::models::{
    Building, Component, Corporation, Dataset, Item, ItemCategory, ItemRate, Level, Recipe,
};

fn item(id: &str, name: &str, category: ItemCategory) -> Item {
    Item {
        id: id.to_string(),
        name: name.to_string(),
        category,
    }
}

fn recipe(output: (&str, f64), inputs: &[(&str, f64)]) -> Recipe {
    Recipe {
        output: ItemRate::new(output.0, output.1),
        inputs: inputs.iter().map(|&(id, rate)| ItemRate::new(id, rate)).collect(),
    }
}

fn building(id: &str, name: &str, power: f64, heat: Option<f64>, recipes: Vec<Recipe>) -> Building {
    Building {
        id: id.to_string(),
        name: name.to_string(),
        power_per_unit: power,
        heat_per_unit: heat,
        recipes,
    }
}

/// A small ore-to-frame chain with one corporation buying frames and bars
pub fn sample_dataset() -> Dataset {
    let items = vec![
        item("ore", "Titanium Ore", ItemCategory::Raw),
        item("coal", "Coal", ItemCategory::Raw),
        item("bar", "Titanium Bar", ItemCategory::Processed),
        item("beam", "Titanium Beam", ItemCategory::Component),
        item("sheet", "Titanium Sheet", ItemCategory::Component),
        item("frame", "Reinforced Frame", ItemCategory::Final),
        item("rounds", "Kinetic Rounds", ItemCategory::Ammo),
    ];

    let buildings = vec![
        building(
            "ore_excavator",
            "Ore Excavator",
            15.0,
            Some(5.0),
            vec![recipe(("ore", 75.0), &[])],
        ),
        building(
            "smelter",
            "Smelter",
            25.0,
            Some(20.0),
            vec![recipe(("bar", 60.0), &[("ore", 90.0)])],
        ),
        building(
            "fabricator",
            "Fabricator",
            40.0,
            Some(10.0),
            vec![
                recipe(("beam", 30.0), &[("bar", 60.0)]),
                recipe(("sheet", 60.0), &[("bar", 30.0)]),
                recipe(("rounds", 120.0), &[("bar", 15.0), ("coal", 15.0)]),
            ],
        ),
        building(
            "furnace",
            "Furnace",
            60.0,
            Some(40.0),
            vec![recipe(("frame", 60.0), &[("beam", 60.0), ("sheet", 120.0)])],
        ),
        building(LAUNCHER_BUILDING_ID, "Orbital Cargo Launcher", 50.0, None, vec![]),
    ];

    let corporations = vec![Corporation {
        id: "moon_energy".to_string(),
        name: "Moon Energy Corporation".to_string(),
        levels: vec![
            Level {
                level: 1,
                cost: 2_000.0,
                components: vec![Component {
                    item_id: "bar".to_string(),
                    points_per_item: 2.0,
                    cost_in_items: Some(1_000.0),
                }],
            },
            Level {
                level: 2,
                cost: 12_000.0,
                components: vec![Component {
                    item_id: "frame".to_string(),
                    points_per_item: 20.0,
                    cost_in_items: Some(600.0),
                }],
            },
        ],
    }];

    Dataset {
        items,
        buildings,
        corporations,
    }
}
