//! Data models for buildings, upgrades and resource budgets

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::classify::BuildingProfile;

/// Building category. Decides which valuation formula applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Resource,
    Storage,
    Defense,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Resource, Category::Storage, Category::Defense];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Resource => "resource",
            Category::Storage => "storage",
            Category::Defense => "defense",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Resource => "Resource",
            Category::Storage => "Storage",
            Category::Defense => "Defense",
        }
    }

    /// Inclusive `(min, max)` band the ROI of this category is clamped to
    pub fn roi_bounds(self) -> (f64, f64) {
        match self {
            Category::Resource => (15.0, 60.0),
            Category::Storage => (5.0, 40.0),
            Category::Defense => (-25.0, 35.0),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resource" => Ok(Category::Resource),
            "storage" => Ok(Category::Storage),
            "defense" => Ok(Category::Defense),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Currency an upgrade is paid in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Gold,
    Elixir,
    DarkElixir,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [
        ResourceType::Gold,
        ResourceType::Elixir,
        ResourceType::DarkElixir,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Gold => "gold",
            ResourceType::Elixir => "elixir",
            ResourceType::DarkElixir => "dark_elixir",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceType::Gold => "Gold",
            ResourceType::Elixir => "Elixir",
            ResourceType::DarkElixir => "Dark Elixir",
        }
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gold" => Ok(ResourceType::Gold),
            "elixir" => Ok(ResourceType::Elixir),
            "dark_elixir" => Ok(ResourceType::DarkElixir),
            other => Err(format!("unknown resource type '{}'", other)),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingDefinition {
    pub name: String,
    pub category: Category,
    pub storage_capacity: Option<f64>, // Only meaningful for storages
    pub profile: BuildingProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductionRate {
    pub building: String,
    pub level: u32,
    pub hourly_rate: f64,
}

/// One possible upgrade transition from `level - 1` to `level`
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeCandidate {
    pub building: String,
    pub level: u32,
    pub cost: u64,
    pub resource_type: ResourceType,
    pub time_hours: f64,
}

/// An affordable candidate with its ROI and category attached
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredUpgrade {
    pub building: String,
    pub level: u32,
    pub category: Category,
    pub roi: f64,
    pub cost: u64,
    pub resource_type: ResourceType,
    pub time_hours: f64,
    pub degraded: bool, // Scoring failed and the ROI fell back to 0
}

/// Ordered by category name, then descending ROI
pub type UpgradePath = Vec<ScoredUpgrade>;

/// Available quantity per resource type. Missing types count as 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceBudget {
    amounts: HashMap<ResourceType, u64>,
}

impl ResourceBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: ResourceType, amount: u64) -> Self {
        self.amounts.insert(resource, amount);
        self
    }

    pub fn available(&self, resource: ResourceType) -> u64 {
        self.amounts.get(&resource).copied().unwrap_or(0)
    }

    pub fn can_afford(&self, upgrade: &UpgradeCandidate) -> bool {
        upgrade.cost <= self.available(upgrade.resource_type)
    }
}
