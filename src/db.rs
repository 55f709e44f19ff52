//! SQLite catalog store

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension};

use crate::catalog::Catalog;
use crate::models::{
    Building, Component, Corporation, Dataset, Item, ItemCategory, ItemRate, Level, Recipe,
};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS items (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            category TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS buildings (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            power_per_unit REAL NOT NULL,
            heat_per_unit REAL
        );

        -- One row per recipe; recipe_index is the position within the building
        CREATE TABLE IF NOT EXISTS recipes (
            building_id TEXT NOT NULL,
            recipe_index INTEGER NOT NULL,
            output_item TEXT NOT NULL,
            output_rate REAL NOT NULL,
            PRIMARY KEY (building_id, recipe_index)
        );

        CREATE TABLE IF NOT EXISTS recipe_inputs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            building_id TEXT NOT NULL,
            recipe_index INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            rate REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS corporations (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS corporation_levels (
            corporation_id TEXT NOT NULL,
            level_index INTEGER NOT NULL,
            level INTEGER NOT NULL,
            cost REAL NOT NULL,
            PRIMARY KEY (corporation_id, level_index)
        );

        CREATE TABLE IF NOT EXISTS level_components (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            corporation_id TEXT NOT NULL,
            level_index INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            points_per_item REAL NOT NULL,
            cost_in_items REAL
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_output ON recipes(output_item);
        CREATE INDEX IF NOT EXISTS idx_recipe_inputs_recipe ON recipe_inputs(building_id, recipe_index);
        CREATE INDEX IF NOT EXISTS idx_level_components_level ON level_components(corporation_id, level_index);
        "#,
    )?;
    Ok(())
}

/// Remove all catalog data (before importing another data version)
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM level_components;
        DELETE FROM corporation_levels;
        DELETE FROM corporations;
        DELETE FROM recipe_inputs;
        DELETE FROM recipes;
        DELETE FROM buildings;
        DELETE FROM items;
        DELETE FROM meta WHERE key = 'data_version';
        "#,
    )?;
    Ok(())
}

pub fn set_data_version(conn: &Connection, version: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES ('data_version', ?1)",
        [version],
    )?;
    Ok(())
}

pub fn data_version(conn: &Connection) -> Result<Option<String>> {
    let version = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'data_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version)
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, item: &Item) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO items (id, name, category) VALUES (?1, ?2, ?3)",
        (&item.id, &item.name, item.category.as_str()),
    )?;
    Ok(())
}

/// Insert or replace a building together with its recipes
///
/// Runs on the caller's connection; wrap in a transaction to keep the
/// building and its recipes consistent.
pub fn upsert_building(conn: &Connection, building: &Building) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO buildings (id, name, power_per_unit, heat_per_unit)
         VALUES (?1, ?2, ?3, ?4)",
        (
            &building.id,
            &building.name,
            building.power_per_unit,
            building.heat_per_unit,
        ),
    )?;
    conn.execute("DELETE FROM recipe_inputs WHERE building_id = ?1", [&building.id])?;
    conn.execute("DELETE FROM recipes WHERE building_id = ?1", [&building.id])?;

    for (index, recipe) in building.recipes.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipes (building_id, recipe_index, output_item, output_rate)
             VALUES (?1, ?2, ?3, ?4)",
            (
                &building.id,
                index as i64,
                &recipe.output.item_id,
                recipe.output.rate_per_minute,
            ),
        )?;
        for input in &recipe.inputs {
            conn.execute(
                "INSERT INTO recipe_inputs (building_id, recipe_index, item_id, rate)
                 VALUES (?1, ?2, ?3, ?4)",
                (&building.id, index as i64, &input.item_id, input.rate_per_minute),
            )?;
        }
    }
    Ok(())
}

/// Insert or replace a corporation together with its levels
pub fn upsert_corporation(conn: &Connection, corporation: &Corporation) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO corporations (id, name) VALUES (?1, ?2)",
        (&corporation.id, &corporation.name),
    )?;
    conn.execute(
        "DELETE FROM level_components WHERE corporation_id = ?1",
        [&corporation.id],
    )?;
    conn.execute(
        "DELETE FROM corporation_levels WHERE corporation_id = ?1",
        [&corporation.id],
    )?;

    for (index, level) in corporation.levels.iter().enumerate() {
        conn.execute(
            "INSERT INTO corporation_levels (corporation_id, level_index, level, cost)
             VALUES (?1, ?2, ?3, ?4)",
            (&corporation.id, index as i64, level.level, level.cost),
        )?;
        for component in &level.components {
            conn.execute(
                "INSERT INTO level_components
                 (corporation_id, level_index, item_id, points_per_item, cost_in_items)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    &corporation.id,
                    index as i64,
                    &component.item_id,
                    component.points_per_item,
                    component.cost_in_items,
                ),
            )?;
        }
    }
    Ok(())
}

/// Replace the whole catalog with a dataset in one transaction
///
/// On any error the previous catalog and data version are left untouched.
pub fn write_dataset(conn: &Connection, dataset: &Dataset, version: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    clear_catalog(&tx)?;
    for item in &dataset.items {
        upsert_item(&tx, item).with_context(|| format!("Failed to write item {}", item.id))?;
    }
    for building in &dataset.buildings {
        upsert_building(&tx, building)
            .with_context(|| format!("Failed to write building {}", building.id))?;
        tracing::debug!(
            building = %building.id,
            recipes = building.recipes.len(),
            "wrote building"
        );
    }
    for corporation in &dataset.corporations {
        upsert_corporation(&tx, corporation)
            .with_context(|| format!("Failed to write corporation {}", corporation.id))?;
    }
    set_data_version(&tx, version)?;

    tx.commit()?;
    Ok(())
}

/// List all items in insertion order
pub fn list_items(conn: &Connection) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare("SELECT id, name, category FROM items ORDER BY seq")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (id, name, category) = row?;
        let category = ItemCategory::parse(&category)
            .ok_or_else(|| anyhow!("item '{}' has unknown category '{}'", id, category))?;
        results.push(Item { id, name, category });
    }
    Ok(results)
}

fn recipe_inputs(conn: &Connection, building_id: &str, recipe_index: i64) -> Result<Vec<ItemRate>> {
    let mut stmt = conn.prepare_cached(
        "SELECT item_id, rate FROM recipe_inputs
         WHERE building_id = ?1 AND recipe_index = ?2
         ORDER BY id",
    )?;
    let rows = stmt.query_map((building_id, recipe_index), |row| {
        Ok(ItemRate::new(row.get::<_, String>(0)?, row.get(1)?))
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn recipes(conn: &Connection, building_id: &str) -> Result<Vec<Recipe>> {
    let mut stmt = conn.prepare_cached(
        "SELECT recipe_index, output_item, output_rate FROM recipes
         WHERE building_id = ?1
         ORDER BY recipe_index",
    )?;
    let rows = stmt.query_map([building_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (index, output_item, output_rate) = row?;
        results.push(Recipe {
            output: ItemRate::new(output_item, output_rate),
            inputs: recipe_inputs(conn, building_id, index)?,
        });
    }
    Ok(results)
}

/// List all buildings with their recipes, in insertion order
pub fn list_buildings(conn: &Connection) -> Result<Vec<Building>> {
    let mut stmt =
        conn.prepare("SELECT id, name, power_per_unit, heat_per_unit FROM buildings ORDER BY seq")?;
    let rows = stmt.query_map([], |row| {
        Ok(Building {
            id: row.get(0)?,
            name: row.get(1)?,
            power_per_unit: row.get(2)?,
            heat_per_unit: row.get(3)?,
            recipes: Vec::new(),
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        let mut building = row?;
        building.recipes = recipes(conn, &building.id)
            .with_context(|| format!("Failed to read recipes of {}", building.id))?;
        results.push(building);
    }
    Ok(results)
}

fn components(conn: &Connection, corporation_id: &str, level_index: i64) -> Result<Vec<Component>> {
    let mut stmt = conn.prepare_cached(
        "SELECT item_id, points_per_item, cost_in_items FROM level_components
         WHERE corporation_id = ?1 AND level_index = ?2
         ORDER BY id",
    )?;
    let rows = stmt.query_map((corporation_id, level_index), |row| {
        Ok(Component {
            item_id: row.get(0)?,
            points_per_item: row.get(1)?,
            cost_in_items: row.get(2)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all corporations with their levels, in insertion order
pub fn list_corporations(conn: &Connection) -> Result<Vec<Corporation>> {
    let mut stmt = conn.prepare("SELECT id, name FROM corporations ORDER BY seq")?;
    let corporations: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<_>>()?;

    let mut level_stmt = conn.prepare(
        "SELECT level_index, level, cost FROM corporation_levels
         WHERE corporation_id = ?1
         ORDER BY level_index",
    )?;

    let mut results = Vec::new();
    for (id, name) in corporations {
        let rows: Vec<(i64, u32, f64)> = level_stmt
            .query_map([&id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut levels = Vec::new();
        for (index, level, cost) in rows {
            levels.push(Level {
                level,
                cost,
                components: components(conn, &id, index)?,
            });
        }
        results.push(Corporation { id, name, levels });
    }
    Ok(results)
}

/// Load the full reference data and index it for resolution
pub fn load_catalog(conn: &Connection) -> Result<Catalog> {
    let items = list_items(conn).context("Failed to read items")?;
    let buildings = list_buildings(conn).context("Failed to read buildings")?;
    let corporations = list_corporations(conn).context("Failed to read corporations")?;
    Ok(Catalog::new(items, buildings, corporations))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn smelter() -> Building {
        Building {
            id: "smelter".to_string(),
            name: "Smelter".to_string(),
            power_per_unit: 25.0,
            heat_per_unit: Some(4.0),
            recipes: vec![
                Recipe {
                    output: ItemRate::new("bar", 60.0),
                    inputs: vec![ItemRate::new("ore", 90.0), ItemRate::new("coal", 10.0)],
                },
                Recipe {
                    output: ItemRate::new("glass", 30.0),
                    inputs: vec![ItemRate::new("sand", 45.0)],
                },
            ],
        }
    }

    #[test]
    fn building_round_trips_with_recipe_order() {
        let conn = conn();
        upsert_building(&conn, &smelter()).unwrap();
        let buildings = list_buildings(&conn).unwrap();
        assert_eq!(buildings, vec![smelter()]);
    }

    #[test]
    fn upsert_replaces_recipes() {
        let conn = conn();
        upsert_building(&conn, &smelter()).unwrap();
        let mut changed = smelter();
        changed.recipes.truncate(1);
        upsert_building(&conn, &changed).unwrap();
        assert_eq!(list_buildings(&conn).unwrap()[0].recipes.len(), 1);
    }

    #[test]
    fn catalog_loads_items_and_corporations() {
        let conn = conn();
        upsert_item(
            &conn,
            &Item {
                id: "bar".to_string(),
                name: "Iron Bar".to_string(),
                category: ItemCategory::Processed,
            },
        )
        .unwrap();
        upsert_building(&conn, &smelter()).unwrap();
        let corp = Corporation {
            id: "corp".to_string(),
            name: "Corp".to_string(),
            levels: vec![Level {
                level: 3,
                cost: 900.0,
                components: vec![Component {
                    item_id: "bar".to_string(),
                    points_per_item: 3.0,
                    cost_in_items: Some(300.0),
                }],
            }],
        };
        upsert_corporation(&conn, &corp).unwrap();

        let catalog = load_catalog(&conn).unwrap();
        assert_eq!(catalog.item("bar").unwrap().name, "Iron Bar");
        assert_eq!(catalog.corporations(), &[corp]);
        assert_eq!(catalog.producer("glass").unwrap().recipe_index, 1);
    }

    #[test]
    fn clear_removes_catalog_and_version() {
        let conn = conn();
        upsert_building(&conn, &smelter()).unwrap();
        set_data_version(&conn, "v1.2").unwrap();
        assert_eq!(data_version(&conn).unwrap().as_deref(), Some("v1.2"));

        clear_catalog(&conn).unwrap();
        assert!(list_buildings(&conn).unwrap().is_empty());
        assert_eq!(data_version(&conn).unwrap(), None);
    }

    fn building(id: &str) -> Building {
        Building {
            id: id.to_string(),
            name: id.to_string(),
            power_per_unit: 1.0,
            heat_per_unit: None,
            recipes: vec![],
        }
    }

    #[test]
    fn write_dataset_replaces_catalog() {
        let conn = conn();
        let first = Dataset {
            items: vec![],
            buildings: vec![smelter(), building("press")],
            corporations: vec![],
        };
        write_dataset(&conn, &first, "v1.0").unwrap();

        let second = Dataset {
            items: vec![],
            buildings: vec![building("drill")],
            corporations: vec![],
        };
        write_dataset(&conn, &second, "v1.1").unwrap();

        let ids: Vec<String> = list_buildings(&conn).unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec!["drill"]);
        assert_eq!(data_version(&conn).unwrap().as_deref(), Some("v1.1"));
    }

    #[test]
    fn failed_write_keeps_previous_catalog() {
        let conn = conn();
        let first = Dataset {
            items: vec![],
            buildings: vec![smelter()],
            corporations: vec![],
        };
        write_dataset(&conn, &first, "v1.0").unwrap();

        conn.execute_batch(
            "CREATE TRIGGER reject_broken BEFORE INSERT ON buildings
             WHEN NEW.id = 'broken'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

        let second = Dataset {
            items: vec![],
            buildings: vec![building("press"), building("broken")],
            corporations: vec![],
        };
        assert!(write_dataset(&conn, &second, "v2.0").is_err());

        assert_eq!(list_buildings(&conn).unwrap(), vec![smelter()]);
        assert_eq!(data_version(&conn).unwrap().as_deref(), Some("v1.0"));
    }
}
