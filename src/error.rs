//! Error types for catalog loading, candidate scoring and planning

use std::path::PathBuf;

use thiserror::Error;

/// Failures while acquiring reference data. These abort a run.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("required data tables not found: {}", missing.join(", "))]
    DataUnavailable { missing: Vec<String> },

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{table} line {line}: {reason}")]
    Malformed {
        table: String,
        line: u64,
        reason: String,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid name pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Failures while scoring a single candidate. Never fatal to a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("no building definition for '{0}'")]
    UnknownBuilding(String),

    #[error("invalid target level {0}")]
    InvalidLevel(u32),

    #[error("storage building '{0}' has no storage capacity")]
    MissingStorageCapacity(String),

    #[error("ROI is not a finite number")]
    NonFiniteRoi,
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
