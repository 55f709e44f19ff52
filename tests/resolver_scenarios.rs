//! End-to-end resolver scenarios over small hand-built catalogs.

use flow_planner::calculator::{
    LAUNCHER_BUILDING_ID, LAUNCHER_ITEMS_PER_MINUTE, aggregate_demand, resolve_production_flow,
};
use flow_planner::models::{
    Building, Component, Corporation, ItemRate, Level, ProductionFlow, ProductionNode, Recipe,
};
use flow_planner::sample::sample_dataset;
use flow_planner::stats::{activation_plan, summarize_flow};
use flow_planner::Catalog;

const EPS: f64 = 1e-9;

fn recipe(output: (&str, f64), inputs: &[(&str, f64)]) -> Recipe {
    Recipe {
        output: ItemRate::new(output.0, output.1),
        inputs: inputs.iter().map(|&(id, rate)| ItemRate::new(id, rate)).collect(),
    }
}

fn building(id: &str, power: f64, recipes: Vec<Recipe>) -> Building {
    Building {
        id: id.to_string(),
        name: id.to_string(),
        power_per_unit: power,
        heat_per_unit: None,
        recipes,
    }
}

/// ore -> bar -> (beam, sheet) -> frame, with frames sold to a corporation
fn catalog() -> Catalog {
    Catalog::new(
        vec![],
        vec![
            building("excavator", 10.0, vec![recipe(("ore", 75.0), &[])]),
            building("smelter", 20.0, vec![recipe(("bar", 60.0), &[("ore", 90.0)])]),
            building(
                "fabricator",
                30.0,
                vec![
                    recipe(("beam", 30.0), &[("bar", 60.0)]),
                    recipe(("sheet", 30.0), &[("bar", 30.0)]),
                ],
            ),
            building(
                "furnace",
                40.0,
                vec![recipe(("frame", 60.0), &[("beam", 60.0), ("sheet", 60.0)])],
            ),
        ],
        vec![Corporation {
            id: "corp".to_string(),
            name: "Corp".to_string(),
            levels: vec![
                Level {
                    level: 1,
                    cost: 500.0,
                    components: vec![],
                },
                Level {
                    level: 2,
                    cost: 3_000.0,
                    components: vec![Component {
                        item_id: "frame".to_string(),
                        points_per_item: 5.0,
                        cost_in_items: None,
                    }],
                },
            ],
        }],
    )
}

fn node<'a>(flow: &'a ProductionFlow, item: &str) -> &'a ProductionNode {
    flow.nodes
        .iter()
        .find(|n| !n.is_launcher() && n.output_item == item)
        .unwrap_or_else(|| panic!("no node for {item}"))
}

#[test]
fn linear_chain() {
    let flow = resolve_production_flow("bar", 60.0, &catalog(), false);

    assert_eq!(flow.nodes.len(), 2);
    assert!((node(&flow, "bar").unit_count - 1.0).abs() < EPS);
    assert!((node(&flow, "ore").unit_count - 1.2).abs() < EPS);

    assert_eq!(flow.edges.len(), 1);
    let edge = &flow.edges[0];
    assert_eq!(edge.item_id, "ore");
    assert_eq!(edge.from, "excavator:0:ore");
    assert_eq!(edge.to, "smelter:0:bar");
    assert!((edge.rate_per_minute - 90.0).abs() < EPS);
}

#[test]
fn shared_producer_is_consolidated() {
    let flow = resolve_production_flow("frame", 60.0, &catalog(), false);

    let smelters: Vec<_> = flow.nodes.iter().filter(|n| n.building_id == "smelter").collect();
    assert_eq!(smelters.len(), 1);
    assert!((smelters[0].unit_count - 3.0).abs() < EPS);

    let order: Vec<&str> = flow.nodes.iter().map(|n| n.output_item.as_str()).collect();
    assert_eq!(order, vec!["frame", "beam", "bar", "ore", "sheet"]);

    let bar_edges: Vec<_> = flow.edges.iter().filter(|e| e.item_id == "bar").collect();
    assert_eq!(bar_edges.len(), 2);
    let to_beam = bar_edges.iter().find(|e| e.to == "fabricator:0:beam").unwrap();
    let to_sheet = bar_edges.iter().find(|e| e.to == "fabricator:1:sheet").unwrap();
    assert!((to_beam.rate_per_minute - 120.0).abs() < EPS);
    assert!((to_sheet.rate_per_minute - 60.0).abs() < EPS);

    assert!((node(&flow, "ore").unit_count - 3.6).abs() < EPS);
}

#[test]
fn raw_material_target() {
    let flow = resolve_production_flow("ore", 150.0, &catalog(), false);
    assert_eq!(flow.nodes.len(), 1);
    assert!((flow.nodes[0].unit_count - 2.0).abs() < EPS);
    assert!(flow.edges.is_empty());
}

#[test]
fn unknown_item_resolves_to_nothing() {
    let flow = resolve_production_flow("unobtainium", 60.0, &catalog(), true);
    assert!(flow.nodes.is_empty());
    assert!(flow.edges.is_empty());
}

#[test]
fn launcher_augmentation() {
    let rate = 30.0;
    let flow = resolve_production_flow("frame", rate, &catalog(), true);

    let launchers: Vec<_> = flow.nodes.iter().filter(|n| n.is_launcher()).collect();
    assert_eq!(launchers.len(), 1);
    let launcher = launchers[0];
    let stats = launcher.launcher_stats().unwrap();
    assert_eq!(launcher.building_id, LAUNCHER_BUILDING_ID);
    assert!((launcher.unit_count - rate / LAUNCHER_ITEMS_PER_MINUTE).abs() < EPS);
    assert_eq!(stats.total_points, 3_000.0);
    assert_eq!(stats.points_per_item, 5.0);
    assert_eq!(stats.launch_time_minutes, Some(20.0));

    let into_launcher: Vec<_> = flow.edges.iter().filter(|e| e.to == launcher.id()).collect();
    assert_eq!(into_launcher.len(), 1);
    assert_eq!(into_launcher[0].from, "furnace:0:frame");
    assert_eq!(into_launcher[0].rate_per_minute, rate);

    let without = resolve_production_flow("frame", rate, &catalog(), false);
    assert!(without.launcher().is_none());
    assert!(without.edges.iter().all(|e| e.to != launcher.id()));
    assert_eq!(without.nodes.len() + 1, flow.nodes.len());
    assert_eq!(without.edges.len() + 1, flow.edges.len());
}

#[test]
fn launcher_skipped_for_non_component() {
    let flow = resolve_production_flow("bar", 60.0, &catalog(), true);
    assert!(flow.launcher().is_none());
}

#[test]
fn demand_conservation_holds_for_every_node() {
    let catalog = catalog();
    let demand = aggregate_demand("frame", 45.0, &catalog);
    let flow = resolve_production_flow("frame", 45.0, &catalog, false);
    for n in &flow.nodes {
        let expected = demand.get(&n.output_item);
        assert!((n.unit_count * n.output_rate_per_unit - expected).abs() < EPS);
    }
}

#[test]
fn catalog_is_not_mutated() {
    let catalog = catalog();
    let before = format!("{:?}", catalog.buildings());
    let _ = resolve_production_flow("frame", 60.0, &catalog, true);
    assert_eq!(format!("{:?}", catalog.buildings()), before);
}

#[test]
fn sample_catalog_plans_frames() {
    let dataset = sample_dataset();
    let catalog = Catalog::new(dataset.items, dataset.buildings, dataset.corporations);
    assert_eq!(catalog.items().len(), 7);
    assert!(catalog.issues().is_empty());
    let flow = resolve_production_flow("frame", 60.0, &catalog, true);

    let summary = summarize_flow(&flow, &catalog, "frame", 60.0);
    let launcher = summary.launcher.as_ref().unwrap();
    assert_eq!(launcher.total_points, 12_000.0);
    assert_eq!(launcher.launch_time_minutes, Some(10.0));

    let plan = activation_plan(&flow);
    assert_eq!(plan.len(), flow.nodes.len());
    let launcher_placement = plan.iter().find(|p| p.recipe_index.is_none()).unwrap();
    assert_eq!(launcher_placement.instances, 6);
    assert_eq!(summary.total_power, flow.nodes.iter().map(|n| n.total_power).sum::<f64>());
}
