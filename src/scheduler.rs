//! Builder-time estimation
//!
//! Upgrades are packed onto a fixed number of builders with the
//! longest-processing-time-first heuristic: take durations longest first and
//! hand each one to the builder with the least work so far. This is an
//! approximation of the minimum makespan, not an exact solution.

use crate::error::PlannerError;
use crate::models::UpgradePath;

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    builders: usize,
}

impl Scheduler {
    pub fn new(builders: usize) -> Result<Self, PlannerError> {
        if builders == 0 {
            return Err(PlannerError::InvalidConfig(
                "builder count must be at least 1".to_string(),
            ));
        }
        Ok(Self { builders })
    }

    pub fn builders(&self) -> usize {
        self.builders
    }

    /// Hours of work assigned to each builder after LPT assignment
    pub fn builder_loads(&self, durations: &[f64]) -> Vec<f64> {
        let mut sorted = durations.to_vec();
        sorted.sort_by(|a, b| b.total_cmp(a));

        let mut queues = vec![0.0_f64; self.builders];
        for time in sorted {
            // First builder wins ties
            let mut min_index = 0;
            for (i, load) in queues.iter().enumerate() {
                if *load < queues[min_index] {
                    min_index = i;
                }
            }
            queues[min_index] += time;
        }
        queues
    }

    /// Hours until the last builder finishes
    pub fn makespan(&self, durations: &[f64]) -> f64 {
        self.builder_loads(durations)
            .into_iter()
            .fold(0.0, f64::max)
    }

    pub fn total_time(&self, path: &UpgradePath) -> f64 {
        let durations: Vec<f64> = path.iter().map(|u| u.time_hours).collect();
        self.makespan(&durations)
    }
}
