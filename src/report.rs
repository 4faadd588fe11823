//! Plan summary and terminal charts

use std::fmt;

use crate::models::{Category, ResourceType, ScoredUpgrade, UpgradePath};
use crate::scheduler::Scheduler;

const BAR_WIDTH: usize = 40;

/// Everything the presentation layer needs from one planning run
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub upgrades: UpgradePath,
    pub total_time_hours: f64,
    pub builders: usize,
    pub builder_loads: Vec<f64>,
    pub resource_totals: Vec<(ResourceType, u64)>,
    pub top_n: usize,
}

impl PlanReport {
    pub fn new(upgrades: UpgradePath, scheduler: &Scheduler, top_n: usize) -> Self {
        let durations: Vec<f64> = upgrades.iter().map(|u| u.time_hours).collect();
        let resource_totals = ResourceType::ALL
            .iter()
            .map(|&rt| {
                let total = upgrades
                    .iter()
                    .filter(|u| u.resource_type == rt)
                    .fold(0u64, |acc, u| acc.saturating_add(u.cost));
                (rt, total)
            })
            .collect();

        Self {
            total_time_hours: scheduler.total_time(&upgrades),
            builders: scheduler.builders(),
            builder_loads: scheduler.builder_loads(&durations),
            resource_totals,
            top_n,
            upgrades,
        }
    }

    pub fn top(&self) -> &[ScoredUpgrade] {
        &self.upgrades[..self.top_n.min(self.upgrades.len())]
    }

    /// Entries per category in Resource, Storage, Defense order, skipping empty groups
    pub fn category_groups(&self) -> Vec<(Category, Vec<&ScoredUpgrade>)> {
        Category::ALL
            .iter()
            .map(|&c| (c, self.upgrades.iter().filter(|u| u.category == c).collect::<Vec<_>>()))
            .filter(|(_, group)| !group.is_empty())
            .collect()
    }

    /// Share of total spend per resource type, in percent
    pub fn resource_shares(&self) -> Vec<(ResourceType, f64)> {
        let total: f64 = self.resource_totals.iter().map(|(_, c)| *c as f64).sum();
        self.resource_totals
            .iter()
            .map(|(rt, cost)| {
                let share = if total > 0.0 { *cost as f64 / total * 100.0 } else { 0.0 };
                (*rt, share)
            })
            .collect()
    }
}

/// Group digits in threes: 1234567 -> "1,234,567"
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut output = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            output.push(',');
        }
        output.push(ch);
    }
    output
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let len = ((value.abs() / max) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.min(BAR_WIDTH))
}

fn label(upgrade: &ScoredUpgrade) -> String {
    format!("{} L{}", upgrade.building, upgrade.level)
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Upgrade Path Analysis ===")?;
        writeln!(f, "Total Upgrades: {}", self.upgrades.len())?;
        writeln!(
            f,
            "Total Build Time: {:.1} days (with {} builders)",
            self.total_time_hours / 24.0,
            self.builders
        )?;
        writeln!(f)?;

        writeln!(f, "Resource Requirements:")?;
        for (rt, cost) in &self.resource_totals {
            writeln!(f, "  {}: {}", rt.label(), format_thousands(*cost))?;
        }
        writeln!(f)?;

        writeln!(f, "ROI by Building Category:")?;
        let max_roi = self.upgrades.iter().map(|u| u.roi.abs()).fold(0.0, f64::max);
        for (category, group) in self.category_groups() {
            writeln!(f, "  [{}]", category)?;
            for upgrade in group {
                writeln!(
                    f,
                    "    {:<28} {:>6.1}% {}",
                    label(upgrade),
                    upgrade.roi,
                    bar(upgrade.roi, max_roi)
                )?;
            }
        }
        writeln!(f)?;

        writeln!(
            f,
            "Top {} Upgrade Times (Total: {:.1} days):",
            self.top_n,
            self.total_time_hours / 24.0
        )?;
        let max_time = self.top().iter().map(|u| u.time_hours).fold(0.0, f64::max);
        for upgrade in self.top() {
            writeln!(
                f,
                "  {:<28} {:>7.1}h {}",
                label(upgrade),
                upgrade.time_hours,
                bar(upgrade.time_hours, max_time)
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Resource Distribution:")?;
        for (rt, share) in self.resource_shares() {
            writeln!(f, "  {:<12} {:>5.1}% {}", rt.label(), share, bar(share, 100.0))?;
        }
        writeln!(f)?;

        writeln!(f, "Builder Utilization (days of work):")?;
        let max_load = self.builder_loads.iter().copied().fold(0.0, f64::max);
        for (i, load) in self.builder_loads.iter().enumerate() {
            writeln!(f, "  Builder {:<3} {:>6.1} {}", i + 1, load / 24.0, bar(*load, max_load))?;
        }
        writeln!(f)?;

        writeln!(f, "Top {} Recommended Upgrades:", self.top_n)?;
        for (i, upgrade) in self.top().iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "{}. {} to level {}", i + 1, upgrade.building, upgrade.level)?;
            writeln!(f, "   Category: {}", upgrade.category)?;
            writeln!(f, "   ROI: {:.1}%", upgrade.roi)?;
            writeln!(
                f,
                "   Cost: {} {}",
                format_thousands(upgrade.cost),
                upgrade.resource_type
            )?;
            writeln!(f, "   Build Time: {:.1} hours", upgrade.time_hours)?;
        }

        Ok(())
    }
}
