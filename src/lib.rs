//! Production flow planner for factory-building games.
//!
//! Given a catalog of items, buildings and corporation reward tracks, resolves
//! the buildings and material flows needed to sustain a target output rate.

pub mod calculator;
pub mod catalog;
pub mod db;
pub mod import;
pub mod models;
pub mod sample;
pub mod stats;

pub use calculator::resolve_production_flow;
pub use catalog::Catalog;
pub use models::{ProductionEdge, ProductionFlow, ProductionNode};
