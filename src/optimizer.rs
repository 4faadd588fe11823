//! Upgrade path optimization
//!
//! Filters candidates by affordability, scores the survivors and orders
//! them by category, then by descending ROI.

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::models::{ResourceBudget, ScoredUpgrade, UpgradeCandidate, UpgradePath};
use crate::valuation;

/// Scored upgrades at or below this ROI are dropped from the path.
///
/// The comparison is made after clamping, where no category band goes
/// below -25, so nothing is dropped with the current bounds.
pub const ROI_FLOOR: f64 = -100.0;

pub struct Optimizer<'a> {
    catalog: &'a Catalog,
    horizon_hours: f64,
}

impl<'a> Optimizer<'a> {
    pub fn new(catalog: &'a Catalog, horizon_hours: f64) -> Self {
        Self {
            catalog,
            horizon_hours,
        }
    }

    /// Rank every candidate in the catalog against the budget
    pub fn optimize_catalog(&self, budget: &ResourceBudget) -> UpgradePath {
        self.optimize(self.catalog.upgrades(), budget)
    }

    /// Each candidate is checked against the full budget; nothing is deducted
    /// between candidates.
    pub fn optimize(&self, candidates: &[UpgradeCandidate], budget: &ResourceBudget) -> UpgradePath {
        let affordable: Vec<&UpgradeCandidate> = candidates
            .iter()
            .filter(|u| budget.can_afford(u))
            .inspect(|u| {
                debug!(
                    "Found valid {} upgrade: {} level {}",
                    u.resource_type, u.building, u.level
                )
            })
            .collect();
        info!("Found {} possible upgrades", affordable.len());

        let mut path: UpgradePath = affordable
            .into_iter()
            .filter_map(|u| self.score(u))
            .filter(|s| s.roi > ROI_FLOOR)
            .collect();

        // Stable: equal keys keep catalog order
        path.sort_by(|a, b| {
            a.category
                .as_str()
                .cmp(b.category.as_str())
                .then_with(|| b.roi.total_cmp(&a.roi))
        });
        path
    }

    fn score(&self, upgrade: &UpgradeCandidate) -> Option<ScoredUpgrade> {
        let building = self.catalog.building(&upgrade.building);
        let valuation = valuation::score(upgrade, building, self.catalog.production(), self.horizon_hours);

        let Some(building) = building else {
            warn!(
                building = %upgrade.building,
                level = upgrade.level,
                "Skipping upgrade with no building definition"
            );
            return None;
        };
        debug!(
            building = %upgrade.building,
            level = upgrade.level,
            raw_roi = valuation.raw_roi,
            roi = valuation.roi,
            "Scored upgrade"
        );

        Some(ScoredUpgrade {
            building: upgrade.building.clone(),
            level: upgrade.level,
            category: building.category,
            roi: valuation.roi,
            cost: upgrade.cost,
            resource_type: upgrade.resource_type,
            time_hours: upgrade.time_hours,
            degraded: valuation.is_degraded(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{building, rate, sample_catalog, upgrade};
    use crate::classify::Classifier;
    use crate::models::{Category, ResourceType};
    use crate::valuation::DEFAULT_HORIZON_HOURS;

    fn names(path: &UpgradePath) -> Vec<(String, u32)> {
        path.iter().map(|u| (u.building.clone(), u.level)).collect()
    }

    fn single_mine_catalog() -> Catalog {
        let classifier = Classifier::new().unwrap();
        Catalog::new(
            vec![building(&classifier, "Gold Mine", Category::Resource, None)],
            vec![rate("Gold Mine", 1, 200.0), rate("Gold Mine", 2, 260.0)],
            vec![upgrade("Gold Mine", 2, 1000, ResourceType::Gold, 1.0)],
        )
    }

    #[test]
    fn cost_equal_to_budget_is_affordable() {
        let catalog = single_mine_catalog();
        let optimizer = Optimizer::new(&catalog, DEFAULT_HORIZON_HOURS);

        let path = optimizer.optimize_catalog(&ResourceBudget::new().with(ResourceType::Gold, 1000));
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].category, Category::Resource);
        assert!(path[0].roi >= 15.0 && path[0].roi <= 60.0);

        let path = optimizer.optimize_catalog(&ResourceBudget::new().with(ResourceType::Gold, 999));
        assert!(path.is_empty());
    }

    #[test]
    fn missing_resource_type_counts_as_zero() {
        let catalog = single_mine_catalog();
        let optimizer = Optimizer::new(&catalog, DEFAULT_HORIZON_HOURS);
        let path = optimizer.optimize_catalog(&ResourceBudget::new().with(ResourceType::Elixir, 1_000_000));
        assert!(path.is_empty());
    }

    #[test]
    fn budget_is_not_consumed_across_candidates() {
        let classifier = Classifier::new().unwrap();
        let catalog = Catalog::new(
            vec![
                building(&classifier, "Cannon", Category::Defense, None),
                building(&classifier, "Archer Tower", Category::Defense, None),
            ],
            vec![],
            vec![
                upgrade("Cannon", 3, 700, ResourceType::Gold, 1.0),
                upgrade("Archer Tower", 3, 700, ResourceType::Gold, 1.0),
            ],
        );
        let optimizer = Optimizer::new(&catalog, DEFAULT_HORIZON_HOURS);

        // 700 + 700 > 1000, yet both fit on their own
        let path = optimizer.optimize_catalog(&ResourceBudget::new().with(ResourceType::Gold, 1000));
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn groups_by_category_then_descending_roi() {
        let catalog = sample_catalog();
        let optimizer = Optimizer::new(&catalog, DEFAULT_HORIZON_HOURS);
        let budget = ResourceBudget::new()
            .with(ResourceType::Gold, 10_000_000)
            .with(ResourceType::Elixir, 10_000_000);

        let path = optimizer.optimize_catalog(&budget);

        let categories: Vec<Category> = path.iter().map(|u| u.category).collect();
        assert_eq!(
            categories,
            vec![
                Category::Defense,
                Category::Defense,
                Category::Resource,
                Category::Resource,
                Category::Resource,
                Category::Storage,
            ]
        );
        for pair in path.windows(2) {
            if pair[0].category == pair[1].category {
                assert!(pair[0].roi >= pair[1].roi);
            }
        }
        // Inferno (13.4%) ranks above the clamped mortar (-25%)
        assert_eq!(path[0].building, "Inferno Tower");
        assert_eq!(path[1].building, "Mortar");
        assert_eq!(path[1].roi, -25.0);
        // Mines hit the 60% cap and keep catalog order, the drill sits at the floor
        assert_eq!(
            names(&path)[2..5].to_vec(),
            vec![
                ("Gold Mine".to_string(), 2),
                ("Gold Mine".to_string(), 3),
                ("Dark Elixir Drill".to_string(), 2),
            ]
        );
    }

    #[test]
    fn three_categories_sort_alphabetically() {
        let classifier = Classifier::new().unwrap();
        let catalog = Catalog::new(
            vec![
                building(&classifier, "Gold Storage", Category::Storage, Some(1_000_000.0)),
                building(&classifier, "Elixir Collector", Category::Resource, None),
                building(&classifier, "Wizard Tower", Category::Defense, None),
            ],
            vec![rate("Elixir Collector", 1, 100.0), rate("Elixir Collector", 2, 150.0)],
            vec![
                upgrade("Gold Storage", 2, 50_000, ResourceType::Elixir, 1.0),
                upgrade("Elixir Collector", 2, 5_000, ResourceType::Gold, 1.0),
                upgrade("Wizard Tower", 2, 50_000, ResourceType::Gold, 1.0),
            ],
        );
        let optimizer = Optimizer::new(&catalog, DEFAULT_HORIZON_HOURS);
        let budget = ResourceBudget::new()
            .with(ResourceType::Gold, 100_000)
            .with(ResourceType::Elixir, 100_000);

        let path = optimizer.optimize_catalog(&budget);
        let order: Vec<&str> = path.iter().map(|u| u.building.as_str()).collect();
        assert_eq!(order, vec!["Wizard Tower", "Elixir Collector", "Gold Storage"]);
    }

    #[test]
    fn roi_bands_hold_for_every_entry() {
        let catalog = sample_catalog();
        let optimizer = Optimizer::new(&catalog, DEFAULT_HORIZON_HOURS);
        let budget = ResourceBudget::new()
            .with(ResourceType::Gold, u64::MAX)
            .with(ResourceType::Elixir, u64::MAX);

        for entry in optimizer.optimize_catalog(&budget) {
            let (min_roi, max_roi) = entry.category.roi_bounds();
            assert!(entry.roi >= min_roi && entry.roi <= max_roi);
            assert!(entry.roi > ROI_FLOOR);
        }
    }

    #[test]
    fn raw_floor_value_is_not_dropped() {
        // No production gain means a raw ROI of -100, but the clamped 15 survives
        let classifier = Classifier::new().unwrap();
        let catalog = Catalog::new(
            vec![building(&classifier, "Gold Mine", Category::Resource, None)],
            vec![],
            vec![upgrade("Gold Mine", 5, 1000, ResourceType::Gold, 1.0)],
        );
        let optimizer = Optimizer::new(&catalog, DEFAULT_HORIZON_HOURS);
        let path = optimizer.optimize_catalog(&ResourceBudget::new().with(ResourceType::Gold, 1000));
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].roi, 15.0);
    }

    #[test]
    fn failed_scoring_keeps_candidate_at_zero() {
        let classifier = Classifier::new().unwrap();
        let catalog = Catalog::new(
            vec![
                building(&classifier, "Gold Storage", Category::Storage, None),
                building(&classifier, "Cannon", Category::Defense, None),
            ],
            vec![],
            vec![
                upgrade("Gold Storage", 4, 100, ResourceType::Elixir, 1.0),
                upgrade("Cannon", 4, 100, ResourceType::Gold, 1.0),
                upgrade("Bomb Tower", 1, 100, ResourceType::Gold, 1.0),
            ],
        );
        let optimizer = Optimizer::new(&catalog, DEFAULT_HORIZON_HOURS);
        let budget = ResourceBudget::new()
            .with(ResourceType::Gold, 100)
            .with(ResourceType::Elixir, 100);

        let path = optimizer.optimize_catalog(&budget);
        assert_eq!(names(&path), vec![("Cannon".to_string(), 4), ("Gold Storage".to_string(), 4)]);
        assert_eq!(path[1].roi, 0.0);
        assert!(path[1].degraded);
        assert!(!path[0].degraded);
    }

    #[test]
    fn optimization_is_repeatable() {
        let catalog = sample_catalog();
        let optimizer = Optimizer::new(&catalog, DEFAULT_HORIZON_HOURS);
        let budget = ResourceBudget::new()
            .with(ResourceType::Gold, 10_000_000)
            .with(ResourceType::Elixir, 10_000_000)
            .with(ResourceType::DarkElixir, 200_000);

        assert_eq!(optimizer.optimize_catalog(&budget), optimizer.optimize_catalog(&budget));
    }

    #[test]
    fn empty_budget_yields_empty_path() {
        let catalog = sample_catalog();
        let optimizer = Optimizer::new(&catalog, DEFAULT_HORIZON_HOURS);
        assert!(optimizer.optimize_catalog(&ResourceBudget::new()).is_empty());
    }
}
