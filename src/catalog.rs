//! In-memory catalog of building definitions, production rates and upgrades
//!
//! The catalog is read-only reference data for one planning run. It can be
//! built from the three CSV tables directly or loaded back from the SQLite
//! database (see `db`).

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::classify::Classifier;
use crate::error::CatalogError;
use crate::models::{BuildingDefinition, Category, ProductionRate, ResourceType, UpgradeCandidate};

/// Hourly production per building and level
#[derive(Debug, Clone, Default)]
pub struct ProductionTable {
    rates: HashMap<String, BTreeMap<u32, f64>>,
}

impl ProductionTable {
    pub fn insert(&mut self, rate: ProductionRate) {
        self.rates
            .entry(rate.building)
            .or_default()
            .insert(rate.level, rate.hourly_rate);
    }

    pub fn rate(&self, building: &str, level: u32) -> Option<f64> {
        self.rates.get(building)?.get(&level).copied()
    }

    /// All `(level, rate)` rows for a building, ascending by level
    pub fn rows(&self, building: &str) -> Vec<(u32, f64)> {
        self.rates
            .get(building)
            .map(|levels| levels.iter().map(|(l, r)| (*l, *r)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rates.values().map(BTreeMap::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = ProductionRate> + '_ {
        self.rates.iter().flat_map(|(building, levels)| {
            levels.iter().map(move |(level, rate)| ProductionRate {
                building: building.clone(),
                level: *level,
                hourly_rate: *rate,
            })
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    buildings: HashMap<String, BuildingDefinition>,
    production: ProductionTable,
    upgrades: Vec<UpgradeCandidate>,
}

impl Catalog {
    pub fn new(
        buildings: Vec<BuildingDefinition>,
        production: Vec<ProductionRate>,
        upgrades: Vec<UpgradeCandidate>,
    ) -> Self {
        let mut table = ProductionTable::default();
        for rate in production {
            table.insert(rate);
        }

        // First definition of a name wins, later rows are ignored
        let mut by_name: HashMap<String, BuildingDefinition> = HashMap::with_capacity(buildings.len());
        for building in buildings {
            match by_name.entry(building.name.clone()) {
                Entry::Occupied(_) => warn!(building = %building.name, "Ignoring duplicate building definition"),
                Entry::Vacant(slot) => {
                    slot.insert(building);
                }
            }
        }

        Self {
            buildings: by_name,
            production: table,
            upgrades,
        }
    }

    pub fn building(&self, name: &str) -> Option<&BuildingDefinition> {
        self.buildings.get(name)
    }

    /// All building definitions sorted by name
    pub fn buildings(&self) -> Vec<&BuildingDefinition> {
        let mut list: Vec<_> = self.buildings.values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn production(&self) -> &ProductionTable {
        &self.production
    }

    pub fn upgrades(&self) -> &[UpgradeCandidate] {
        &self.upgrades
    }

    pub fn upgrades_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UpgradeCandidate> {
        self.upgrades.iter().filter(move |u| u.building == name)
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty() && self.upgrades.is_empty()
    }
}

/// File names of the three input tables
#[derive(Debug, Clone)]
pub struct CatalogPaths {
    pub buildings: String,
    pub upgrades: String,
    pub production: String,
}

impl CatalogPaths {
    /// Standard table names for a town hall 11 data set
    pub fn th11() -> Self {
        Self {
            buildings: "th11_building.csv".to_string(),
            upgrades: "upgrade_cost.csv".to_string(),
            production: "production_rates.csv".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BuildingRow {
    building_name: String,
    category: String,
    storage_capacity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct UpgradeRow {
    building: String,
    level: u32,
    cost: f64, // Whole numbers may be written as `1000.0`
    resource_type: String,
    time_hours: f64,
}

#[derive(Debug, Deserialize)]
struct ProductionRow {
    building: String,
    level: u32,
    hourly_rate: f64,
}

/// Search `dir` recursively for a file with exactly this name
fn find_table(dir: &Path, file_name: &str) -> Option<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .find(|e| e.file_name().to_str() == Some(file_name))
        .map(|e| e.into_path())
}

/// Load and validate all three tables from a data directory
pub fn load_from_dir(
    dir: &Path,
    paths: &CatalogPaths,
    classifier: &Classifier,
) -> Result<Catalog, CatalogError> {
    let buildings_path = find_table(dir, &paths.buildings);
    let upgrades_path = find_table(dir, &paths.upgrades);
    let production_path = find_table(dir, &paths.production);

    let (buildings_path, upgrades_path, production_path) =
        match (buildings_path, upgrades_path, production_path) {
            (Some(b), Some(u), Some(p)) => (b, u, p),
            (b, u, p) => {
                let missing = [(&paths.buildings, b), (&paths.upgrades, u), (&paths.production, p)]
                    .into_iter()
                    .filter(|(_, path)| path.is_none())
                    .map(|(name, _)| name.clone())
                    .collect();
                return Err(CatalogError::DataUnavailable { missing });
            }
        };
    debug!(
        buildings = %buildings_path.display(),
        upgrades = %upgrades_path.display(),
        production = %production_path.display(),
        "Found data tables"
    );

    let buildings = read_buildings(&buildings_path, classifier)?;
    let upgrades = read_upgrades(&upgrades_path)?;
    let production = read_production(&production_path)?;

    info!(
        buildings = buildings.len(),
        upgrades = upgrades.len(),
        production = production.len(),
        "Loaded catalog from {}",
        dir.display()
    );

    Ok(Catalog::new(buildings, production, upgrades))
}

fn open_csv(path: &Path) -> Result<csv::Reader<File>, CatalogError> {
    let file = File::open(path).map_err(|source| CatalogError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

fn table_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn malformed(path: &Path, record: &csv::StringRecord, reason: String) -> CatalogError {
    CatalogError::Malformed {
        table: table_name(path),
        line: record.position().map_or(0, |p| p.line()),
        reason,
    }
}

fn read_buildings(path: &Path, classifier: &Classifier) -> Result<Vec<BuildingDefinition>, CatalogError> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    let mut buildings = Vec::new();

    for record in reader.records() {
        let record = record?;
        let row: BuildingRow = record.deserialize(Some(&headers))?;
        let category: Category = row
            .category
            .parse()
            .map_err(|reason| malformed(path, &record, reason))?;

        buildings.push(BuildingDefinition {
            profile: classifier.classify(&row.building_name),
            name: row.building_name,
            category,
            storage_capacity: row.storage_capacity,
        });
    }

    Ok(buildings)
}

fn read_upgrades(path: &Path) -> Result<Vec<UpgradeCandidate>, CatalogError> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    let mut upgrades = Vec::new();

    for record in reader.records() {
        let record = record?;
        let row: UpgradeRow = record.deserialize(Some(&headers))?;
        let resource_type: ResourceType = row
            .resource_type
            .parse()
            .map_err(|reason| malformed(path, &record, reason))?;

        if row.level == 0 {
            return Err(malformed(path, &record, "upgrade level must be at least 1".to_string()));
        }
        let cost = whole_cost(row.cost)
            .ok_or_else(|| malformed(path, &record, format!("invalid cost {}", row.cost)))?;
        if !row.time_hours.is_finite() || row.time_hours < 0.0 {
            return Err(malformed(
                path,
                &record,
                format!("invalid build time {}", row.time_hours),
            ));
        }

        upgrades.push(UpgradeCandidate {
            building: row.building,
            level: row.level,
            cost,
            resource_type,
            time_hours: row.time_hours,
        });
    }

    Ok(upgrades)
}

/// A cost must be a finite, non-negative whole number that fits in `u64`
fn whole_cost(value: f64) -> Option<u64> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value >= u64::MAX as f64 {
        return None;
    }
    Some(value as u64)
}

fn read_production(path: &Path) -> Result<Vec<ProductionRate>, CatalogError> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    let mut rates = Vec::new();

    for record in reader.records() {
        let record = record?;
        let row: ProductionRow = record.deserialize(Some(&headers))?;
        rates.push(ProductionRate {
            building: row.building,
            level: row.level,
            hourly_rate: row.hourly_rate,
        });
    }

    Ok(rates)
}
