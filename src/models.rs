//! Data models for the game catalog and resolved production flows

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Raw,
    Processed,
    Component,
    Ammo,
    Final,
}

impl ItemCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemCategory::Raw => "raw",
            ItemCategory::Processed => "processed",
            ItemCategory::Component => "component",
            ItemCategory::Ammo => "ammo",
            ItemCategory::Final => "final",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "raw" => Some(ItemCategory::Raw),
            "processed" => Some(ItemCategory::Processed),
            "component" => Some(ItemCategory::Component),
            "ammo" => Some(ItemCategory::Ammo),
            "final" => Some(ItemCategory::Final),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category: ItemCategory,
}

/// An item flowing in or out of a recipe, in units per minute per building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRate {
    pub item_id: String,
    pub rate_per_minute: f64,
}

impl ItemRate {
    pub fn new(item_id: impl Into<String>, rate_per_minute: f64) -> Self {
        Self {
            item_id: item_id.into(),
            rate_per_minute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub output: ItemRate,
    #[serde(default)]
    pub inputs: Vec<ItemRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: String,
    pub name: String,
    pub power_per_unit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heat_per_unit: Option<f64>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub item_id: String,
    pub points_per_item: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_in_items: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub level: u32,
    /// Reward points needed to complete this level
    pub cost: f64,
    #[serde(default)]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corporation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub levels: Vec<Level>,
}

/// Reference data of one game version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub items: Vec<Item>,
    pub buildings: Vec<Building>,
    pub corporations: Vec<Corporation>,
}

/// Identity of a node within one resolved flow
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub building_id: String,
    pub recipe_index: i32,
    pub output_item: String,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.building_id, self.recipe_index, self.output_item
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherStats {
    pub points_per_item: f64,
    /// Minutes to earn the level cost at the requested rate; `None` when the
    /// point rate is zero
    pub launch_time_minutes: Option<f64>,
    pub total_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeKind {
    #[serde(rename_all = "camelCase")]
    Recipe { recipe_index: usize },
    Launcher(LauncherStats),
}

/// One (building, recipe) pair in a resolved chain, sized to its total demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionNode {
    pub building_id: String,
    pub building_name: String,
    pub output_item: String,
    pub output_rate_per_unit: f64,
    /// Fractional building count, never rounded
    pub unit_count: f64,
    pub power_per_unit: f64,
    /// Power billed per whole building: `ceil(unit_count) * power_per_unit`
    pub total_power: f64,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl ProductionNode {
    /// Recipe index within the building, `-1` for launchers
    pub fn recipe_index(&self) -> i32 {
        match self.kind {
            NodeKind::Recipe { recipe_index } => recipe_index as i32,
            NodeKind::Launcher(_) => -1,
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey {
            building_id: self.building_id.clone(),
            recipe_index: self.recipe_index(),
            output_item: self.output_item.clone(),
        }
    }

    pub fn id(&self) -> String {
        self.key().to_string()
    }

    pub fn is_launcher(&self) -> bool {
        matches!(self.kind, NodeKind::Launcher(_))
    }

    pub fn launcher_stats(&self) -> Option<&LauncherStats> {
        match &self.kind {
            NodeKind::Launcher(stats) => Some(stats),
            NodeKind::Recipe { .. } => None,
        }
    }

    /// Physical buildings to place for this node
    pub fn instances(&self) -> u64 {
        if self.unit_count > 0.0 {
            self.unit_count.ceil() as u64
        } else {
            0
        }
    }
}

/// Consolidated material transfer between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionEdge {
    pub from: String,
    pub to: String,
    pub item_id: String,
    pub rate_per_minute: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionFlow {
    pub nodes: Vec<ProductionNode>,
    pub edges: Vec<ProductionEdge>,
}

impl ProductionFlow {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&ProductionNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn launcher(&self) -> Option<&ProductionNode> {
        self.nodes.iter().find(|n| n.is_launcher())
    }
}
