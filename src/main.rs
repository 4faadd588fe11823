//! Upgrade Planner
//!
//! Ranks building upgrades for a Clash of Clans base by estimated return on
//! investment and estimates how long the builders need to finish them.

mod catalog;
mod classify;
mod config;
mod db;
mod error;
mod models;
mod optimizer;
mod report;
mod scheduler;
mod valuation;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use crate::catalog::{Catalog, CatalogPaths};
use crate::classify::Classifier;
use crate::config::PlannerConfig;
use crate::error::CatalogError;
use crate::models::{BuildingDefinition, Category, ProductionRate, ResourceType, UpgradeCandidate};
use crate::optimizer::Optimizer;
use crate::report::{PlanReport, format_thousands};
use crate::scheduler::Scheduler;

#[derive(Parser)]
#[command(name = "upgrade-planner")]
#[command(about = "Upgrade path planner for Clash of Clans bases")]
struct Cli {
    /// Path to the SQLite catalog database
    #[arg(short, long, default_value = "upgrade_data.db", global = true)]
    database: PathBuf,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import building, upgrade cost and production tables from CSV files
    Import {
        /// Directory containing the CSV tables (searched recursively)
        data_dir: PathBuf,

        /// Clear existing data before import
        #[arg(long)]
        clear: bool,
    },

    /// Rank affordable upgrades and estimate total build time
    Plan {
        /// Read the catalog from CSV tables in this directory instead of the database
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Available gold
        #[arg(long, default_value_t = 10_000_000)]
        gold: u64,

        /// Available elixir
        #[arg(long, default_value_t = 10_000_000)]
        elixir: u64,

        /// Available dark elixir
        #[arg(long, default_value_t = 200_000)]
        dark_elixir: u64,

        /// Number of builders working in parallel
        #[arg(short, long, default_value_t = 5)]
        builders: usize,

        /// Hours of production credited to resource upgrades
        #[arg(long, default_value_t = valuation::DEFAULT_HORIZON_HOURS)]
        horizon: f64,

        /// Number of upgrades shown in the ranked summary
        #[arg(short, long, default_value_t = 10)]
        top: usize,
    },

    /// List all buildings in the database
    ListBuildings,

    /// Show details for a specific building
    Building {
        /// Building name, e.g. "Gold Mine"
        name: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample data for testing (without CSV tables)
    LoadSample,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let classifier = Classifier::new()?;

    match cli.command {
        Commands::Import { data_dir, clear } => {
            let conn = open_database(&cli.database)?;
            if clear {
                println!("Clearing existing data...");
                db::clear_catalog(&conn)?;
            }

            let catalog = catalog::load_from_dir(&data_dir, &CatalogPaths::th11(), &classifier)
                .with_context(|| format!("Failed to import tables from {}", data_dir.display()))?;
            let stats = db::store_catalog(&conn, &catalog)?;
            println!("{}", stats);
        }

        Commands::Plan {
            data_dir,
            gold,
            elixir,
            dark_elixir,
            builders,
            horizon,
            top,
        } => {
            let config = PlannerConfig::new(gold, elixir, dark_elixir, builders, horizon, top)?;

            let source = CatalogSource::for_plan(data_dir.as_deref(), &cli.database);
            let catalog = match source.load(&classifier) {
                Ok(catalog) => catalog,
                Err(e @ CatalogError::DataUnavailable { .. }) => {
                    eprintln!("{}", load_failure_message(&e, &source));
                    return Ok(());
                }
                Err(e) => return Err(e).context("Failed to load data"),
            };

            println!("{}", plan_text(&catalog, &config)?);
        }

        Commands::ListBuildings => {
            let conn = open_database(&cli.database)?;
            let buildings = db::list_buildings(&conn, &classifier)?;
            if buildings.is_empty() {
                println!("No buildings in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<30} {:<10} {:>14}", "Building", "Category", "Storage");
                println!("{}", "-".repeat(56));
                for b in buildings {
                    let capacity = b
                        .storage_capacity
                        .map(|c| format_thousands(c.round() as u64))
                        .unwrap_or_else(|| "-".to_string());
                    println!("{:<30} {:<10} {:>14}", b.name, b.category, capacity);
                }
            }
        }

        Commands::Building { name } => {
            let conn = open_database(&cli.database)?;
            let catalog = match db::load_catalog(&conn, &classifier) {
                Ok(catalog) => catalog,
                Err(CatalogError::DataUnavailable { .. }) => {
                    println!("No buildings in database. Run 'import' or 'load-sample' first.");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            print_building(&catalog, &name);
        }

        Commands::Init => {
            open_database(&cli.database)?;
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            let conn = open_database(&cli.database)?;
            db::clear_catalog(&conn)?;
            let stats = db::store_catalog(&conn, &sample_catalog(&classifier))?;
            println!("{}", stats);
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

/// Open the catalog database, creating the schema if needed
fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    db::init_schema(&conn)?;
    Ok(conn)
}

/// Where `plan` reads its catalog from
#[derive(Debug)]
enum CatalogSource<'a> {
    Tables(&'a Path),
    Database(&'a Path),
}

impl<'a> CatalogSource<'a> {
    fn for_plan(data_dir: Option<&'a Path>, database: &'a Path) -> Self {
        match data_dir {
            Some(dir) => CatalogSource::Tables(dir),
            None => CatalogSource::Database(database),
        }
    }

    /// Planning only reads. A missing database file is not created.
    fn load(&self, classifier: &Classifier) -> Result<Catalog, CatalogError> {
        match *self {
            CatalogSource::Tables(dir) => catalog::load_from_dir(dir, &CatalogPaths::th11(), classifier),
            CatalogSource::Database(path) => {
                if !path.is_file() {
                    return Err(CatalogError::DataUnavailable {
                        missing: vec![path.display().to_string()],
                    });
                }
                let conn = Connection::open(path)?;
                db::init_schema(&conn)?;
                db::load_catalog(&conn, classifier)
            }
        }
    }
}

fn load_failure_message(err: &CatalogError, source: &CatalogSource) -> String {
    let mut message = format!("Failed to load data: {}. Exiting...", err);
    if matches!(source, CatalogSource::Database(_)) {
        message.push_str("\nRun 'import' or 'load-sample' first, or pass --data-dir.");
    }
    message
}

/// Run the single analysis pass: filter, score, sort, schedule, report
fn plan_text(catalog: &Catalog, config: &PlannerConfig) -> Result<String> {
    let scheduler = Scheduler::new(config.builders)?;
    let optimizer = Optimizer::new(catalog, config.horizon_hours);

    let path = optimizer.optimize_catalog(&config.budget);
    if path.is_empty() {
        return Ok("No viable upgrades found!".to_string());
    }

    let degraded = path.iter().filter(|u| u.degraded).count();
    if degraded > 0 {
        tracing::warn!("{} upgrades could not be scored and were ranked at 0% ROI", degraded);
    }

    Ok(PlanReport::new(path, &scheduler, config.top_n).to_string())
}

fn print_building(catalog: &Catalog, name: &str) {
    let Some(b) = catalog.building(name) else {
        println!("Building '{}' not found", name);
        return;
    };

    println!("Building: {}", b.name);
    println!("  Category: {}", b.category);
    if let Some(capacity) = b.storage_capacity {
        println!("  Storage: {}", format_thousands(capacity.round() as u64));
    }
    match b.category {
        Category::Resource | Category::Storage => {
            println!("  Resource: {:?}", b.profile.resource);
        }
        Category::Defense => println!("  Defense: {:?}", b.profile.defense),
    }

    let rates = catalog.production().rows(name);
    if !rates.is_empty() {
        println!("  Production:");
        for (level, rate) in rates {
            println!("    L{:<3} {} /h", level, rate);
        }
    }

    let upgrades: Vec<_> = catalog.upgrades_for(name).collect();
    if !upgrades.is_empty() {
        println!("  Upgrades:");
        for u in upgrades {
            println!(
                "    L{:<3} {:>12} {:<12} {:>7.1}h",
                u.level,
                format_thousands(u.cost),
                u.resource_type,
                u.time_hours
            );
        }
    }
}

/// Small town hall 11 sample base for trying the planner without CSV tables
fn sample_catalog(classifier: &Classifier) -> Catalog {
    let building = |name: &str, category: Category, capacity: Option<f64>| BuildingDefinition {
        name: name.to_string(),
        category,
        storage_capacity: capacity,
        profile: classifier.classify(name),
    };
    let rate = |name: &str, level: u32, hourly_rate: f64| ProductionRate {
        building: name.to_string(),
        level,
        hourly_rate,
    };
    let upgrade = |name: &str, level: u32, cost: u64, resource_type: ResourceType, time_hours: f64| {
        UpgradeCandidate {
            building: name.to_string(),
            level,
            cost,
            resource_type,
            time_hours,
        }
    };

    let buildings = vec![
        building("Gold Mine", Category::Resource, None),
        building("Elixir Collector", Category::Resource, None),
        building("Dark Elixir Drill", Category::Resource, None),
        building("Gold Storage", Category::Storage, Some(2_000_000.0)),
        building("Elixir Storage", Category::Storage, Some(2_000_000.0)),
        building("Dark Elixir Storage", Category::Storage, Some(200_000.0)),
        building("Eagle Artillery", Category::Defense, None),
        building("Inferno Tower", Category::Defense, None),
        building("Xbow", Category::Defense, None),
        building("Wizard Tower", Category::Defense, None),
        building("Archer Tower", Category::Defense, None),
        building("Cannon", Category::Defense, None),
        building("Mortar", Category::Defense, None),
    ];

    let production = vec![
        rate("Gold Mine", 11, 2800.0),
        rate("Gold Mine", 12, 3000.0),
        rate("Gold Mine", 13, 3500.0),
        rate("Elixir Collector", 11, 2800.0),
        rate("Elixir Collector", 12, 3000.0),
        rate("Elixir Collector", 13, 3500.0),
        rate("Dark Elixir Drill", 5, 90.0),
        rate("Dark Elixir Drill", 6, 120.0),
        rate("Dark Elixir Drill", 7, 160.0),
    ];

    let upgrades = vec![
        upgrade("Gold Mine", 12, 1_300_000, ResourceType::Elixir, 72.0),
        upgrade("Gold Mine", 13, 1_800_000, ResourceType::Elixir, 96.0),
        upgrade("Elixir Collector", 12, 1_300_000, ResourceType::Gold, 72.0),
        upgrade("Elixir Collector", 13, 1_800_000, ResourceType::Gold, 96.0),
        upgrade("Dark Elixir Drill", 6, 1_200_000, ResourceType::Elixir, 96.0),
        upgrade("Dark Elixir Drill", 7, 1_800_000, ResourceType::Elixir, 120.0),
        upgrade("Gold Storage", 12, 3_000_000, ResourceType::Elixir, 168.0),
        upgrade("Elixir Storage", 12, 3_000_000, ResourceType::Gold, 168.0),
        upgrade("Dark Elixir Storage", 7, 4_000_000, ResourceType::Elixir, 168.0),
        upgrade("Eagle Artillery", 2, 9_000_000, ResourceType::Gold, 288.0),
        upgrade("Inferno Tower", 4, 7_500_000, ResourceType::Gold, 240.0),
        upgrade("Xbow", 4, 5_000_000, ResourceType::Gold, 192.0),
        upgrade("Wizard Tower", 10, 4_700_000, ResourceType::Gold, 192.0),
        upgrade("Archer Tower", 15, 5_500_000, ResourceType::Gold, 216.0),
        upgrade("Cannon", 15, 5_000_000, ResourceType::Gold, 192.0),
        upgrade("Mortar", 10, 4_800_000, ResourceType::Gold, 192.0),
    ];

    Catalog::new(buildings, production, upgrades)
}
