//! Production flow resolver
//!
//! Resolution runs in fixed phases over a read-only [`Catalog`]:
//! demand aggregation, node creation, edge consolidation and, when asked for,
//! the reward-launcher augmentation. Nothing is cached between calls.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::catalog::{Catalog, Producer};
use crate::models::{LauncherStats, NodeKind, ProductionEdge, ProductionFlow, ProductionNode};

/// Building id used for the synthetic reward-launcher node
pub const LAUNCHER_BUILDING_ID: &str = "orbital_cargo_launcher";

/// Items one launcher ships per minute
pub const LAUNCHER_ITEMS_PER_MINUTE: f64 = 10.0;

const LAUNCHER_DEFAULT_NAME: &str = "Orbital Cargo Launcher";

/// Total required throughput per item, summed over every consuming path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandMap {
    totals: HashMap<String, f64>,
    order: Vec<String>,
    cycles: Vec<Vec<String>>,
}

impl DemandMap {
    fn add(&mut self, item: &str, amount: f64) {
        match self.totals.get_mut(item) {
            Some(total) => *total += amount,
            None => {
                self.totals.insert(item.to_string(), amount);
                self.order.push(item.to_string());
            }
        }
    }

    /// Demand for an item, zero when it was never reached
    pub fn get(&self, item: &str) -> f64 {
        self.totals.get(item).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.totals.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Items in first-visit order with their totals
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.order
            .iter()
            .map(|item| (item.as_str(), self.totals[item]))
    }

    /// Item paths that closed a cycle; the last element repeats an earlier one
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }
}

/// Clamp a requested rate into something demand propagation can use
pub fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate >= 0.0 {
        rate
    } else {
        tracing::warn!(rate, "invalid target rate, treating it as zero");
        0.0
    }
}

fn units_for(amount: f64, rate_per_unit: f64) -> f64 {
    if rate_per_unit > 0.0 {
        amount / rate_per_unit
    } else {
        0.0
    }
}

/// Walk the recipe graph backward from `target`, accumulating demand per item
pub fn aggregate_demand(target: &str, rate: f64, catalog: &Catalog) -> DemandMap {
    let mut demand = DemandMap::default();
    let mut path = Vec::new();
    accumulate(target, sanitize_rate(rate), catalog, &mut demand, &mut path);
    demand
}

fn accumulate<'a>(
    item: &'a str,
    amount: f64,
    catalog: &'a Catalog,
    demand: &mut DemandMap,
    path: &mut Vec<&'a str>,
) {
    if let Some(start) = path.iter().position(|p| *p == item) {
        let mut cycle: Vec<String> = path[start..].iter().map(|p| p.to_string()).collect();
        cycle.push(item.to_string());
        tracing::warn!(
            cycle = %cycle.join(" -> "),
            "cyclic recipe dependency, truncating branch"
        );
        demand.cycles.push(cycle);
        return;
    }

    // Shared producers must see the sum of every downstream need
    demand.add(item, amount);

    let Some(producer) = catalog.producer(item) else {
        return;
    };
    let buildings_needed = units_for(amount, producer.recipe.output.rate_per_minute);

    path.push(item);
    for input in &producer.recipe.inputs {
        accumulate(
            &input.item_id,
            input.rate_per_minute * buildings_needed,
            catalog,
            demand,
            path,
        );
    }
    path.pop();
}

fn recipe_node(producer: Producer<'_>, unit_count: f64) -> ProductionNode {
    let building = producer.building;
    ProductionNode {
        building_id: building.id.clone(),
        building_name: building.name.clone(),
        output_item: producer.recipe.output.item_id.clone(),
        output_rate_per_unit: producer.recipe.output.rate_per_minute,
        unit_count,
        power_per_unit: building.power_per_unit,
        total_power: unit_count.ceil() * building.power_per_unit,
        kind: NodeKind::Recipe {
            recipe_index: producer.recipe_index,
        },
    }
}

/// One node per produced item reachable from `target`, target first, depth-first
pub fn materialize_nodes(target: &str, demand: &DemandMap, catalog: &Catalog) -> Vec<ProductionNode> {
    let mut nodes = Vec::new();
    let mut processed = HashSet::new();
    visit(target, demand, catalog, &mut processed, &mut nodes);
    nodes
}

fn visit<'a>(
    item: &'a str,
    demand: &DemandMap,
    catalog: &'a Catalog,
    processed: &mut HashSet<&'a str>,
    nodes: &mut Vec<ProductionNode>,
) {
    if !processed.insert(item) {
        return;
    }
    let Some(producer) = catalog.producer(item) else {
        return;
    };

    let unit_count = units_for(demand.get(item), producer.recipe.output.rate_per_minute);
    nodes.push(recipe_node(producer, unit_count));

    for input in &producer.recipe.inputs {
        visit(&input.item_id, demand, catalog, processed, nodes);
    }
}

/// Consolidated transfers from producer nodes to the nodes consuming their output
pub fn materialize_edges(nodes: &[ProductionNode], catalog: &Catalog) -> Vec<ProductionEdge> {
    let producers: HashMap<&str, String> = nodes
        .iter()
        .filter(|n| !n.is_launcher())
        .map(|n| (n.output_item.as_str(), n.id()))
        .collect();

    let mut edges: Vec<ProductionEdge> = Vec::new();
    let mut index: HashMap<(String, String, String), usize> = HashMap::new();

    for consumer in nodes {
        if consumer.is_launcher() {
            continue;
        }
        let Some(recipe) = catalog.producer(&consumer.output_item).map(|p| p.recipe) else {
            continue;
        };
        let consumer_id = consumer.id();

        for input in &recipe.inputs {
            // Raw inputs have no producer node and no edge
            let Some(from) = producers.get(input.item_id.as_str()) else {
                continue;
            };
            let amount = input.rate_per_minute * consumer.unit_count;
            let key = (from.clone(), consumer_id.clone(), input.item_id.clone());

            match index.get(&key) {
                Some(&i) => edges[i].rate_per_minute += amount,
                None => {
                    index.insert(key, edges.len());
                    edges.push(ProductionEdge {
                        from: from.clone(),
                        to: consumer_id.clone(),
                        item_id: input.item_id.clone(),
                        rate_per_minute: amount,
                    });
                }
            }
        }
    }

    edges
}

/// Append a launcher node (and its feeding edge) when `target` is a reward component.
///
/// Returns whether a launcher was added. The edge is omitted when the target
/// has no production node of its own.
pub fn append_launcher(flow: &mut ProductionFlow, target: &str, rate: f64, catalog: &Catalog) -> bool {
    let Some(reward) = catalog.reward_component(target) else {
        return false;
    };
    let rate = sanitize_rate(rate);
    let level_cost = reward.level_cost();
    let points_per_item = reward.points_per_item();

    let point_rate = rate * points_per_item;
    let launch_time_minutes = if point_rate > 0.0 && point_rate.is_finite() {
        Some(level_cost / point_rate)
    } else {
        None
    };

    let (name, power_per_unit) = match catalog.building(LAUNCHER_BUILDING_ID) {
        Some(b) => (b.name.clone(), b.power_per_unit),
        None => (LAUNCHER_DEFAULT_NAME.to_string(), 0.0),
    };
    let unit_count = rate / LAUNCHER_ITEMS_PER_MINUTE;

    let launcher = ProductionNode {
        building_id: LAUNCHER_BUILDING_ID.to_string(),
        building_name: name,
        output_item: target.to_string(),
        output_rate_per_unit: LAUNCHER_ITEMS_PER_MINUTE,
        unit_count,
        power_per_unit,
        total_power: unit_count.ceil() * power_per_unit,
        kind: NodeKind::Launcher(LauncherStats {
            points_per_item,
            launch_time_minutes,
            total_points: level_cost,
        }),
    };
    let launcher_id = launcher.id();

    let source = flow
        .nodes
        .iter()
        .find(|n| !n.is_launcher() && n.output_item == target)
        .map(ProductionNode::id);

    tracing::debug!(
        corporation = %reward.corporation.id,
        level = reward.level.level,
        unit_count,
        "appending reward launcher"
    );

    flow.nodes.push(launcher);
    if let Some(from) = source {
        flow.edges.push(ProductionEdge {
            from,
            to: launcher_id,
            item_id: target.to_string(),
            rate_per_minute: rate,
        });
    }
    true
}

/// Resolve the full production flow needed to sustain `rate` of `target` per minute.
///
/// Never fails: unknown items give an empty flow, invalid rates are treated
/// as zero, and cyclic branches are truncated with a warning.
pub fn resolve_production_flow(
    target: &str,
    rate: f64,
    catalog: &Catalog,
    include_launcher: bool,
) -> ProductionFlow {
    if !catalog.is_known(target) {
        tracing::debug!(item = %target, "unknown item, nothing to resolve");
        return ProductionFlow::default();
    }
    let rate = sanitize_rate(rate);

    let demand = aggregate_demand(target, rate, catalog);
    let nodes = materialize_nodes(target, &demand, catalog);
    let edges = materialize_edges(&nodes, catalog);
    let mut flow = ProductionFlow { nodes, edges };

    if include_launcher {
        append_launcher(&mut flow, target, rate, catalog);
    }

    tracing::debug!(
        item = %target,
        rate,
        nodes = flow.nodes.len(),
        edges = flow.edges.len(),
        cycles = demand.cycles().len(),
        "resolved production flow"
    );
    flow
}
