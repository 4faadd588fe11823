//! Resolve resource and defense kinds from building names
//!
//! Names are matched once when the catalog is loaded. Each table is an
//! ordered list of patterns where the first match wins.

use regex::RegexSet;

use crate::error::CatalogError;

/// Which resource a producer or storage deals in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    DarkElixir,
    Elixir,
    Gold,
}

impl ResourceKind {
    /// Value of one unit of hourly production
    pub fn production_multiplier(self) -> f64 {
        match self {
            ResourceKind::DarkElixir => 5.0,
            ResourceKind::Elixir => 2.0,
            ResourceKind::Gold => 1.5,
        }
    }

    /// Value of one unit of extra storage capacity
    pub fn storage_weight(self) -> f64 {
        match self {
            ResourceKind::DarkElixir => 0.8,
            ResourceKind::Elixir => 0.5,
            ResourceKind::Gold => 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefenseKind {
    Eagle,
    Inferno,
    Xbow,
    Tesla,
    Wizard,
    Archer,
    Cannon,
    Mortar,
}

impl DefenseKind {
    /// `(base, scale)` pair of the defense benefit curve
    pub fn weights(self) -> (f64, f64) {
        match self {
            DefenseKind::Eagle => (0.8, 0.95),
            DefenseKind::Inferno => (0.7, 0.9),
            DefenseKind::Xbow => (0.6, 0.85),
            DefenseKind::Tesla => (0.5, 0.8),
            DefenseKind::Wizard => (0.4, 0.75),
            DefenseKind::Archer => (0.35, 0.7),
            DefenseKind::Cannon => (0.3, 0.65),
            DefenseKind::Mortar => (0.25, 0.6),
        }
    }

    /// Eagle artillery and inferno towers get a flat bonus
    pub fn bonus(self) -> f64 {
        match self {
            DefenseKind::Eagle | DefenseKind::Inferno => 1.2,
            _ => 1.0,
        }
    }
}

/// Kinds resolved for one building name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingProfile {
    pub resource: ResourceKind,
    pub defense: DefenseKind,
    pub producer: bool, // Name hints at a mine, collector or drill
}

const RESOURCE_PATTERNS: [(&str, ResourceKind); 3] = [
    ("dark", ResourceKind::DarkElixir),
    ("elixir", ResourceKind::Elixir),
    ("gold", ResourceKind::Gold),
];

const DEFENSE_PATTERNS: [(&str, DefenseKind); 8] = [
    ("eagle", DefenseKind::Eagle),
    ("inferno", DefenseKind::Inferno),
    ("xbow", DefenseKind::Xbow),
    ("tesla", DefenseKind::Tesla),
    ("wizard", DefenseKind::Wizard),
    ("archer", DefenseKind::Archer),
    ("cannon", DefenseKind::Cannon),
    ("mortar", DefenseKind::Mortar),
];

const PRODUCER_PATTERNS: [&str; 3] = ["mine", "collector", "drill"];

pub struct Classifier {
    resources: RegexSet,
    defenses: RegexSet,
    producers: RegexSet,
}

impl Classifier {
    pub fn new() -> Result<Self, CatalogError> {
        Ok(Self {
            resources: case_insensitive(RESOURCE_PATTERNS.iter().map(|(p, _)| *p))?,
            defenses: case_insensitive(DEFENSE_PATTERNS.iter().map(|(p, _)| *p))?,
            producers: case_insensitive(PRODUCER_PATTERNS.iter().copied())?,
        })
    }

    pub fn classify(&self, name: &str) -> BuildingProfile {
        // SetMatches iterates in pattern order, so the first index is the
        // highest-priority match
        let resource = self
            .resources
            .matches(name)
            .iter()
            .next()
            .map_or(ResourceKind::Gold, |i| RESOURCE_PATTERNS[i].1);
        let defense = self
            .defenses
            .matches(name)
            .iter()
            .next()
            .map_or(DefenseKind::Cannon, |i| DEFENSE_PATTERNS[i].1);

        BuildingProfile {
            resource,
            defense,
            producer: self.producers.is_match(name),
        }
    }
}

fn case_insensitive<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<RegexSet, CatalogError> {
    let escaped: Vec<String> = patterns
        .map(|p| format!("(?i){}", regex::escape(p)))
        .collect();
    Ok(RegexSet::new(escaped)?)
}
