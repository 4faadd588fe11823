//! Database schema and operations for the building catalog

use std::fmt;

use rusqlite::Connection;
use tracing::info;

use crate::catalog::Catalog;
use crate::classify::Classifier;
use crate::error::CatalogError;
use crate::models::{BuildingDefinition, Category, ProductionRate, ResourceType, UpgradeCandidate};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), CatalogError> {
    conn.execute_batch(
        r#"
        -- Building definitions
        CREATE TABLE IF NOT EXISTS buildings (
            name TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            storage_capacity REAL
        );

        -- Hourly output per level (producers only)
        CREATE TABLE IF NOT EXISTS production_rates (
            building TEXT NOT NULL,
            level INTEGER NOT NULL,
            hourly_rate REAL NOT NULL,
            PRIMARY KEY (building, level)
        );

        -- One row per level transition
        CREATE TABLE IF NOT EXISTS upgrade_costs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            building TEXT NOT NULL,
            level INTEGER NOT NULL,
            cost INTEGER NOT NULL,
            resource_type TEXT NOT NULL,
            time_hours REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_upgrade_costs_building ON upgrade_costs(building);
        "#,
    )?;
    Ok(())
}

/// Clear all imported data
pub fn clear_catalog(conn: &Connection) -> Result<(), CatalogError> {
    conn.execute_batch(
        r#"
        DELETE FROM upgrade_costs;
        DELETE FROM production_rates;
        DELETE FROM buildings;
        "#,
    )?;
    Ok(())
}

/// Insert or replace a building
pub fn upsert_building(conn: &Connection, building: &BuildingDefinition) -> Result<(), CatalogError> {
    conn.execute(
        "INSERT OR REPLACE INTO buildings (name, category, storage_capacity) VALUES (?1, ?2, ?3)",
        (&building.name, building.category.as_str(), building.storage_capacity),
    )?;
    Ok(())
}

pub fn upsert_production_rate(conn: &Connection, rate: &ProductionRate) -> Result<(), CatalogError> {
    conn.execute(
        "INSERT OR REPLACE INTO production_rates (building, level, hourly_rate) VALUES (?1, ?2, ?3)",
        (&rate.building, rate.level, rate.hourly_rate),
    )?;
    Ok(())
}

pub fn insert_upgrade(conn: &Connection, upgrade: &UpgradeCandidate) -> Result<(), CatalogError> {
    let cost = i64::try_from(upgrade.cost).map_err(|_| CatalogError::Malformed {
        table: "upgrade_costs".to_string(),
        line: 0,
        reason: format!("cost {} does not fit in the database", upgrade.cost),
    })?;
    conn.execute(
        "INSERT INTO upgrade_costs (building, level, cost, resource_type, time_hours)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &upgrade.building,
            upgrade.level,
            cost,
            upgrade.resource_type.as_str(),
            upgrade.time_hours,
        ),
    )?;
    Ok(())
}

/// Write a whole catalog in one transaction
pub fn store_catalog(conn: &Connection, catalog: &Catalog) -> Result<ImportStats, CatalogError> {
    let tx = conn.unchecked_transaction()?;
    let mut stats = ImportStats::default();

    for building in catalog.buildings() {
        upsert_building(&tx, building)?;
        stats.buildings += 1;
    }
    for rate in catalog.production().iter() {
        upsert_production_rate(&tx, &rate)?;
        stats.production_rates += 1;
    }
    for upgrade in catalog.upgrades() {
        insert_upgrade(&tx, upgrade)?;
        stats.upgrades += 1;
    }

    tx.commit()?;
    info!(
        buildings = stats.buildings,
        production_rates = stats.production_rates,
        upgrades = stats.upgrades,
        "Stored catalog"
    );
    Ok(stats)
}

fn parse_column<T: std::str::FromStr<Err = String>>(table: &str, value: &str) -> Result<T, CatalogError> {
    value.parse().map_err(|reason| CatalogError::Malformed {
        table: table.to_string(),
        line: 0,
        reason,
    })
}

/// List all buildings in the database
pub fn list_buildings(conn: &Connection, classifier: &Classifier) -> Result<Vec<BuildingDefinition>, CatalogError> {
    let mut stmt = conn.prepare("SELECT name, category, storage_capacity FROM buildings ORDER BY name")?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<f64>>(2)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (name, category, storage_capacity) = row?;
        let category: Category = parse_column("buildings", &category)?;
        results.push(BuildingDefinition {
            profile: classifier.classify(&name),
            name,
            category,
            storage_capacity,
        });
    }
    Ok(results)
}

fn list_production_rates(conn: &Connection) -> Result<Vec<ProductionRate>, CatalogError> {
    let mut stmt = conn.prepare(
        "SELECT building, level, hourly_rate FROM production_rates ORDER BY building, level",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(ProductionRate {
            building: row.get(0)?,
            level: row.get(1)?,
            hourly_rate: row.get(2)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn list_upgrades(conn: &Connection) -> Result<Vec<UpgradeCandidate>, CatalogError> {
    let mut stmt = conn.prepare(
        "SELECT building, level, cost, resource_type, time_hours FROM upgrade_costs ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, u32>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, f64>(4)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (building, level, cost, resource_type, time_hours) = row?;
        let resource_type: ResourceType = parse_column("upgrade_costs", &resource_type)?;
        let cost = u64::try_from(cost).map_err(|_| CatalogError::Malformed {
            table: "upgrade_costs".to_string(),
            line: 0,
            reason: format!("negative cost {} for {}", cost, building),
        })?;
        results.push(UpgradeCandidate {
            building,
            level,
            cost,
            resource_type,
            time_hours,
        });
    }
    Ok(results)
}

/// Read the whole catalog back into memory, in import order
pub fn load_catalog(conn: &Connection, classifier: &Classifier) -> Result<Catalog, CatalogError> {
    let catalog = Catalog::new(
        list_buildings(conn, classifier)?,
        list_production_rates(conn)?,
        list_upgrades(conn)?,
    );
    if catalog.is_empty() {
        return Err(CatalogError::DataUnavailable {
            missing: vec!["buildings".to_string(), "upgrade_costs".to_string()],
        });
    }
    info!(
        buildings = catalog.buildings().len(),
        production_rates = catalog.production().len(),
        upgrades = catalog.upgrades().len(),
        "Loaded catalog from database"
    );
    Ok(catalog)
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportStats {
    pub buildings: usize,
    pub production_rates: usize,
    pub upgrades: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} buildings ({} production rates, {} upgrades)",
            self.buildings, self.production_rates, self.upgrades
        )
    }
}
