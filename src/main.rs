//! Flow Planner
//!
//! Plans production chains and corporation reward launches for a
//! factory-building game.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use flow_planner::{calculator, db, import, sample, stats};

#[derive(Parser)]
#[command(name = "flow-planner")]
#[command(about = "Production flow planner for factory-building games")]
struct Cli {
    /// Path to the SQLite catalog database
    #[arg(short, long, env = "PLANNER_DB", default_value = "planner.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a versioned JSON dataset (a data root or one version directory)
    Import {
        /// Data root containing version directories, or a version directory
        data_dir: PathBuf,

        /// Version to import from the data root (defaults to the latest)
        #[arg(long = "data-version")]
        version: Option<String>,
    },

    /// Calculate the production flow for a target item
    Calc {
        /// Target item id (e.g., "bar", "frame")
        item: String,

        /// Target production rate in items per minute
        #[arg(short, long, default_value = "60.0")]
        rate: f64,

        /// Add a reward launcher when the item feeds a corporation level
        #[arg(short, long)]
        launcher: bool,

        /// Show the production tree
        #[arg(short, long)]
        verbose: bool,

        /// Print nodes and edges as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all buildings in the catalog
    ListBuildings,

    /// List all items and whether they can be produced
    ListItems,

    /// Show details for a specific building
    Building {
        /// Building ID
        id: String,
    },

    /// List corporations and their reward levels
    Corporations,

    /// Initialize empty database with schema
    Init,

    /// Load the built-in sample catalog
    LoadSample,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Import { data_dir, version } => {
            let (dir, label) = resolve_dataset_dir(&data_dir, version)?;
            let stats = import::import_to_database(&conn, &dir, &label)
                .with_context(|| format!("Failed to import {}", dir.display()))?;
            println!("{}", stats);
        }

        Commands::Calc {
            item,
            rate,
            launcher,
            verbose,
            json,
        } => {
            let catalog = db::load_catalog(&conn)?;
            if catalog.buildings().is_empty() {
                println!("No buildings in database. Run 'import' or 'load-sample' first.");
                return Ok(());
            }

            let flow = calculator::resolve_production_flow(&item, rate, &catalog, launcher);

            if json {
                println!("{}", serde_json::to_string_pretty(&flow)?);
                return Ok(());
            }
            if flow.is_empty() {
                println!("Unknown item '{}'", item);
                return Ok(());
            }

            if verbose {
                println!("Production flow:\n");
                println!("{}", stats::format_flow(&flow));
            }

            let summary = stats::summarize_flow(&flow, &catalog, &item, rate);
            println!("{}", summary);
        }

        Commands::ListBuildings => {
            let buildings = db::list_buildings(&conn)?;
            if buildings.is_empty() {
                println!("No buildings in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<30} {:>10} {:>10} {:>8}", "Building", "Power", "Heat", "Recipes");
                println!("{}", "-".repeat(61));
                for b in buildings {
                    println!(
                        "{:<30} {:>10.0} {:>10.0} {:>8}",
                        b.name,
                        b.power_per_unit,
                        b.heat_per_unit.unwrap_or(0.0),
                        b.recipes.len()
                    );
                }
            }
        }

        Commands::ListItems => {
            let catalog = db::load_catalog(&conn)?;
            let producible = catalog.producible_items();
            if catalog.items().is_empty() {
                println!("No items in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<20} {:<30} {:<10} {}", "Item", "Name", "Category", "Producible");
                for i in catalog.items() {
                    let yes = producible.binary_search(&i.id.as_str()).is_ok();
                    println!(
                        "{:<20} {:<30} {:<10} {}",
                        i.id,
                        i.name,
                        i.category.as_str(),
                        if yes { "yes" } else { "no" }
                    );
                }
            }
        }

        Commands::Building { id } => {
            let buildings = db::list_buildings(&conn)?;
            if let Some(b) = buildings.iter().find(|b| b.id == id) {
                println!("Building: {}", b.name);
                println!("  ID: {}", b.id);
                println!("  Power per unit: {}", b.power_per_unit);
                if let Some(heat) = b.heat_per_unit {
                    println!("  Heat per unit: {}", heat);
                }

                for (index, recipe) in b.recipes.iter().enumerate() {
                    println!(
                        "  Recipe {}: {} @ {}/min",
                        index, recipe.output.item_id, recipe.output.rate_per_minute
                    );
                    for input in &recipe.inputs {
                        println!("    needs {} @ {}/min", input.item_id, input.rate_per_minute);
                    }
                }
            } else {
                println!("Building '{}' not found", id);
            }
        }

        Commands::Corporations => {
            let corporations = db::list_corporations(&conn)?;
            if corporations.is_empty() {
                println!("No corporations in database.");
            }
            for corp in corporations {
                println!("{} ({})", corp.name, corp.id);
                for level in &corp.levels {
                    println!("  Level {}: {:.0} points", level.level, level.cost);
                    for c in &level.components {
                        println!("    {} x{} points", c.item_id, c.points_per_item);
                    }
                }
            }
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

/// Accept either a version directory or a data root holding version directories
fn resolve_dataset_dir(data_dir: &Path, version: Option<String>) -> Result<(PathBuf, String)> {
    if let Some(label) = version {
        let dir = data_dir.join(&label);
        return Ok((dir, label));
    }
    if data_dir.join("items.json").is_file() {
        let label = data_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unversioned")
            .to_string();
        return Ok((data_dir.to_path_buf(), label));
    }

    let latest = import::latest_version(data_dir)?;
    tracing::info!(version = %latest.label, "using latest data version");
    Ok((latest.path, latest.label))
}

/// Load the built-in sample catalog, replacing existing data
fn load_sample_data(conn: &Connection) -> Result<()> {
    let dataset = sample::sample_dataset();
    db::write_dataset(conn, &dataset, "sample")?;

    println!("Loaded {} sample buildings", dataset.buildings.len());
    Ok(())
}
