//! Versioned JSON dataset import
//!
//! A data root holds one directory per game version, each with
//! `items.json`, `buildings.json` and optionally `corporations.json`.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use walkdir::WalkDir;

use crate::db;
pub use crate::models::Dataset;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?(\d+)\.(\d+)(?:\.(\d+))?$").expect("version pattern is valid")
});

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("required file '{file}' not found in {dir}")]
    MissingFile { file: &'static str, dir: PathBuf },

    #[error("parse error in {file}: {source}")]
    Parse {
        file: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("item '{item_id}' is produced by both {first} and {second}")]
    DuplicateProducer {
        item_id: String,
        first: String,
        second: String,
    },

    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("invalid {field} {value} in level {level} of {corporation_id}")]
    InvalidReward {
        corporation_id: String,
        level: u32,
        field: &'static str,
        value: f64,
    },

    #[error("invalid rate {rate} for '{item_id}' in {building_id}")]
    InvalidRate {
        building_id: String,
        item_id: String,
        rate: f64,
    },

    #[error("no data versions found in {0}")]
    NoVersions(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// A dataset directory whose name parses as a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataVersion {
    pub label: String,
    pub path: PathBuf,
    parts: (u32, u32, u32),
}

impl DataVersion {
    pub fn parse(label: &str, path: PathBuf) -> Option<Self> {
        let caps = VERSION_RE.captures(label)?;
        let part = |i: usize| -> Option<u32> {
            caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
        };
        Some(Self {
            label: label.to_string(),
            path,
            parts: (part(1)?, part(2)?, part(3)?),
        })
    }
}

impl Ord for DataVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts
            .cmp(&other.parts)
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl PartialOrd for DataVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find version directories directly under `root`, oldest first
pub fn find_data_versions(root: &Path) -> Result<Vec<DataVersion>, ImportError> {
    let mut versions = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if let Some(version) = DataVersion::parse(name, entry.path().to_path_buf()) {
            versions.push(version);
        }
    }

    versions.sort();
    Ok(versions)
}

pub fn latest_version(root: &Path) -> Result<DataVersion, ImportError> {
    find_data_versions(root)?
        .pop()
        .ok_or_else(|| ImportError::NoVersions(root.to_path_buf()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ImportError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| ImportError::Parse {
        file: path.to_path_buf(),
        source,
    })
}

fn read_required<T: DeserializeOwned>(dir: &Path, file: &'static str) -> Result<T, ImportError> {
    let path = dir.join(file);
    if !path.is_file() {
        return Err(ImportError::MissingFile {
            file,
            dir: dir.to_path_buf(),
        });
    }
    read_json(&path)
}

/// Read a dataset directory; `corporations.json` may be absent
pub fn read_dataset(dir: &Path) -> Result<Dataset, ImportError> {
    let items = read_required(dir, "items.json")?;
    let buildings = read_required(dir, "buildings.json")?;

    let corporations_path = dir.join("corporations.json");
    let corporations = if corporations_path.is_file() {
        read_json(&corporations_path)?
    } else {
        Vec::new()
    };

    Ok(Dataset {
        items,
        buildings,
        corporations,
    })
}

fn valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn unique_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), ImportError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ImportError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// Reject datasets the resolver cannot plan with
pub fn validate_dataset(dataset: &Dataset) -> Result<(), ImportError> {
    unique_ids("item", dataset.items.iter().map(|i| i.id.as_str()))?;
    unique_ids("building", dataset.buildings.iter().map(|b| b.id.as_str()))?;
    unique_ids(
        "corporation",
        dataset.corporations.iter().map(|c| c.id.as_str()),
    )?;

    let mut producers: HashMap<&str, &str> = HashMap::new();

    for building in &dataset.buildings {
        for recipe in &building.recipes {
            for rate in std::iter::once(&recipe.output).chain(&recipe.inputs) {
                if !valid_amount(rate.rate_per_minute) {
                    return Err(ImportError::InvalidRate {
                        building_id: building.id.clone(),
                        item_id: rate.item_id.clone(),
                        rate: rate.rate_per_minute,
                    });
                }
            }

            let output = recipe.output.item_id.as_str();
            if let Some(first) = producers.insert(output, &building.id) {
                return Err(ImportError::DuplicateProducer {
                    item_id: output.to_string(),
                    first: first.to_string(),
                    second: building.id.clone(),
                });
            }
        }
    }

    for corporation in &dataset.corporations {
        for level in &corporation.levels {
            let invalid = |field: &'static str, value: f64| ImportError::InvalidReward {
                corporation_id: corporation.id.clone(),
                level: level.level,
                field,
                value,
            };
            if !valid_amount(level.cost) {
                return Err(invalid("cost", level.cost));
            }
            for component in &level.components {
                if !valid_amount(component.points_per_item) {
                    return Err(invalid("pointsPerItem", component.points_per_item));
                }
                if let Some(cost) = component.cost_in_items {
                    if !valid_amount(cost) {
                        return Err(invalid("costInItems", cost));
                    }
                }
            }
        }
    }

    for building in &dataset.buildings {
        for recipe in &building.recipes {
            for input in &recipe.inputs {
                if !dataset.items.iter().any(|i| i.id == input.item_id) {
                    tracing::warn!(
                        building = %building.id,
                        item = %input.item_id,
                        "recipe input is not in the item list"
                    );
                }
            }
        }
    }

    Ok(())
}

/// Import a dataset directory into the database, replacing the current catalog
pub fn import_to_database(
    conn: &Connection,
    dir: &Path,
    version: &str,
) -> Result<ImportStats, ImportError> {
    tracing::info!(dir = %dir.display(), version, "importing dataset");

    let dataset = read_dataset(dir)?;
    validate_dataset(&dataset)?;

    db::write_dataset(conn, &dataset, version)?;

    Ok(ImportStats {
        items: dataset.items.len(),
        buildings: dataset.buildings.len(),
        recipes: dataset.buildings.iter().map(|b| b.recipes.len()).sum(),
        corporations: dataset.corporations.len(),
        levels: dataset.corporations.iter().map(|c| c.levels.len()).sum(),
    })
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub items: usize,
    pub buildings: usize,
    pub recipes: usize,
    pub corporations: usize,
    pub levels: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} items, {} buildings ({} recipes), {} corporations ({} levels)",
            self.items, self.buildings, self.recipes, self.corporations, self.levels
        )
    }
}
