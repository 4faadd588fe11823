//! Settings for one planning run

use crate::error::PlannerError;
use crate::models::{ResourceBudget, ResourceType};

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub budget: ResourceBudget,
    pub builders: usize,
    pub horizon_hours: f64,
    pub top_n: usize,
}

impl PlannerConfig {
    pub fn new(
        gold: u64,
        elixir: u64,
        dark_elixir: u64,
        builders: usize,
        horizon_hours: f64,
        top_n: usize,
    ) -> Result<Self, PlannerError> {
        if builders == 0 {
            return Err(PlannerError::InvalidConfig(
                "builder count must be at least 1".to_string(),
            ));
        }
        if !horizon_hours.is_finite() || horizon_hours < 0.0 {
            return Err(PlannerError::InvalidConfig(format!(
                "time horizon must be a non-negative number of hours, got {}",
                horizon_hours
            )));
        }

        Ok(Self {
            budget: ResourceBudget::new()
                .with(ResourceType::Gold, gold)
                .with(ResourceType::Elixir, elixir)
                .with(ResourceType::DarkElixir, dark_elixir),
            builders,
            horizon_hours,
            top_n,
        })
    }
}
