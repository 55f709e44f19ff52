//! Statistics, activation plans and text rendering over a resolved flow

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{self, Write as _};

use crate::catalog::Catalog;
use crate::models::{LauncherStats, ProductionFlow, ProductionNode};

/// Physical buildings to place for one node of a flow
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub node_id: String,
    pub building_id: String,
    /// `None` for the reward launcher
    pub recipe_index: Option<usize>,
    pub instances: u64,
}

/// Turn each node into a whole number of building instances (`ceil(unit_count)`)
pub fn activation_plan(flow: &ProductionFlow) -> Vec<Placement> {
    flow.nodes
        .iter()
        .map(|node| Placement {
            node_id: node.id(),
            building_id: node.building_id.clone(),
            recipe_index: usize::try_from(node.recipe_index()).ok(),
            instances: node.instances(),
        })
        .collect()
}

/// Summary of a resolved production flow
#[derive(Debug)]
pub struct FlowSummary {
    pub target_item: String,
    pub target_rate: f64,
    pub total_power: f64,
    pub total_heat: f64,
    pub building_counts: Vec<(String, u64)>,
    pub raw_inputs: Vec<(String, f64)>,
    pub launcher: Option<LauncherStats>,
}

pub fn summarize_flow(
    flow: &ProductionFlow,
    catalog: &Catalog,
    target_item: &str,
    target_rate: f64,
) -> FlowSummary {
    let produced: HashSet<&str> = flow
        .nodes
        .iter()
        .filter(|n| !n.is_launcher())
        .map(|n| n.output_item.as_str())
        .collect();

    let mut building_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut raw_inputs: BTreeMap<String, f64> = BTreeMap::new();
    let mut total_power = 0.0;
    let mut total_heat = 0.0;

    for node in &flow.nodes {
        total_power += node.total_power;
        *building_counts.entry(node.building_name.clone()).or_default() += node.instances();

        if let Some(heat) = catalog
            .building(&node.building_id)
            .and_then(|b| b.heat_per_unit)
        {
            total_heat += node.instances() as f64 * heat;
        }

        if node.is_launcher() {
            continue;
        }
        if let Some(producer) = catalog.producer(&node.output_item) {
            for input in &producer.recipe.inputs {
                if !produced.contains(input.item_id.as_str()) {
                    *raw_inputs.entry(input.item_id.clone()).or_default() +=
                        input.rate_per_minute * node.unit_count;
                }
            }
        }
    }

    FlowSummary {
        target_item: target_item.to_string(),
        target_rate,
        total_power,
        total_heat,
        building_counts: building_counts.into_iter().collect(),
        raw_inputs: raw_inputs.into_iter().collect(),
        launcher: flow.launcher().and_then(|n| n.launcher_stats().cloned()),
    }
}

impl fmt::Display for FlowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Production Summary ===")?;
        writeln!(f, "Target: {} @ {:.2}/min", self.target_item, self.target_rate)?;
        writeln!(f)?;

        if self.building_counts.is_empty() {
            writeln!(f, "Nothing to build.")?;
            return Ok(());
        }

        writeln!(f, "Buildings required:")?;
        for (name, count) in &self.building_counts {
            writeln!(f, "  {}x {}", count, name)?;
        }
        writeln!(f)?;

        if !self.raw_inputs.is_empty() {
            writeln!(f, "Raw inputs required:")?;
            for (item, rate) in &self.raw_inputs {
                writeln!(f, "  {} @ {:.2}/min", item, rate)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Power: {:.0}", self.total_power)?;
        if self.total_heat != 0.0 {
            writeln!(f, "Heat:  {:.0}", self.total_heat)?;
        }

        if let Some(launcher) = &self.launcher {
            writeln!(f)?;
            writeln!(f, "Reward track:")?;
            writeln!(f, "  Level cost: {:.0} points", launcher.total_points)?;
            writeln!(f, "  Points per item: {}", launcher.points_per_item)?;
            match launcher.launch_time_minutes {
                Some(minutes) => writeln!(f, "  Time to complete: {:.1} min", minutes)?,
                None => writeln!(f, "  Time to complete: n/a")?,
            }
        }

        Ok(())
    }
}

/// Render the flow as an indented tree, starting at the launcher (if any) or the target node
pub fn format_flow(flow: &ProductionFlow) -> String {
    let mut output = String::new();
    let root = flow.launcher().or_else(|| flow.nodes.first());
    let Some(root) = root else {
        output.push_str("(nothing to produce)\n");
        return output;
    };

    let mut suppliers: HashMap<&str, Vec<(&ProductionNode, &str, f64)>> = HashMap::new();
    for edge in &flow.edges {
        if let Some(from) = flow.nodes.iter().find(|n| n.id() == edge.from) {
            suppliers
                .entry(edge.to.as_str())
                .or_default()
                .push((from, edge.item_id.as_str(), edge.rate_per_minute));
        }
    }

    let mut path = Vec::new();
    write_node(&mut output, root, &suppliers, &mut path, 0);
    output
}

fn write_node(
    output: &mut String,
    node: &ProductionNode,
    suppliers: &HashMap<&str, Vec<(&ProductionNode, &str, f64)>>,
    path: &mut Vec<String>,
    indent: usize,
) {
    let prefix = "  ".repeat(indent);
    let id = node.id();

    let _ = writeln!(
        output,
        "{}{:.2}x {} -> {} ({:.0} power)",
        prefix, node.unit_count, node.building_name, node.output_item, node.total_power
    );

    if path.contains(&id) {
        let _ = writeln!(output, "{}  (cycle)", prefix);
        return;
    }
    path.push(id.clone());

    if let Some(inputs) = suppliers.get(id.as_str()) {
        for (from, item, rate) in inputs {
            let _ = writeln!(output, "{}  needs {} @ {:.2}/min", prefix, item, rate);
            write_node(output, from, suppliers, path, indent + 2);
        }
    }
    path.pop();
}
