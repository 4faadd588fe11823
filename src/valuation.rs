//! ROI valuation of a single upgrade
//!
//! Each category has its own benefit model. The resulting ROI percentage is
//! clamped to the category's band from [`Category::roi_bounds`].

use tracing::warn;

use crate::catalog::ProductionTable;
use crate::error::ScoringError;
use crate::models::{BuildingDefinition, Category, UpgradeCandidate};

/// Hours of production credited to a resource upgrade (one week)
pub const DEFAULT_HORIZON_HOURS: f64 = 168.0;

const PRODUCTION_DECAY: f64 = 0.85;
const STORAGE_GROWTH: f64 = 1.1;
const DEFENSE_COST_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub enum ValuationOutcome {
    Scored,
    /// Scoring failed and the ROI fell back to 0
    Defaulted(ScoringError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    /// ROI after clamping to the category band
    pub roi: f64,
    /// ROI before clamping, 0 when defaulted
    pub raw_roi: f64,
    pub outcome: ValuationOutcome,
}

impl Valuation {
    fn defaulted(err: ScoringError) -> Self {
        Self {
            roi: 0.0,
            raw_roi: 0.0,
            outcome: ValuationOutcome::Defaulted(err),
        }
    }

    pub fn error(&self) -> Option<&ScoringError> {
        match &self.outcome {
            ValuationOutcome::Scored => None,
            ValuationOutcome::Defaulted(err) => Some(err),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error().is_some()
    }
}

/// Score one candidate. Never fails: errors are logged and scored as 0.
pub fn score(
    upgrade: &UpgradeCandidate,
    building: Option<&BuildingDefinition>,
    production: &ProductionTable,
    horizon_hours: f64,
) -> Valuation {
    let result = building
        .ok_or_else(|| ScoringError::UnknownBuilding(upgrade.building.clone()))
        .and_then(|b| raw_roi(upgrade, b, production, horizon_hours).map(|raw| (b.category, raw)));

    match result {
        Ok((category, raw)) => {
            let (min_roi, max_roi) = category.roi_bounds();
            Valuation {
                roi: raw.clamp(min_roi, max_roi),
                raw_roi: raw,
                outcome: ValuationOutcome::Scored,
            }
        }
        Err(err) => {
            warn!(
                building = %upgrade.building,
                level = upgrade.level,
                "Error calculating ROI: {}",
                err
            );
            Valuation::defaulted(err)
        }
    }
}

/// Unclamped ROI percentage: `(benefit - cost) / cost * 100`, or 0 for free upgrades
pub fn raw_roi(
    upgrade: &UpgradeCandidate,
    building: &BuildingDefinition,
    production: &ProductionTable,
    horizon_hours: f64,
) -> Result<f64, ScoringError> {
    if upgrade.level == 0 {
        return Err(ScoringError::InvalidLevel(upgrade.level));
    }

    let cost = upgrade.cost as f64;
    let benefit = match building.category {
        Category::Resource => resource_benefit(upgrade, building, production, horizon_hours),
        Category::Storage => storage_benefit(upgrade, building)?,
        Category::Defense => defense_benefit(upgrade, building),
    };

    let roi = if cost > 0.0 {
        (benefit - cost) / cost * 100.0
    } else {
        0.0
    };

    if !roi.is_finite() {
        return Err(ScoringError::NonFiniteRoi);
    }
    Ok(roi)
}

fn level_exponent(level: u32) -> i32 {
    i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX)
}

/// Extra hourly output gained by moving from `level - 1` to `level`
pub fn production_increase(upgrade: &UpgradeCandidate, building: &BuildingDefinition, production: &ProductionTable) -> f64 {
    if !building.profile.producer {
        return 0.0;
    }

    let Some(next_rate) = production.rate(&upgrade.building, upgrade.level) else {
        return 0.0;
    };
    let current_rate = match upgrade.level.saturating_sub(1) {
        0 => 0.0,
        previous => match production.rate(&upgrade.building, previous) {
            Some(rate) => rate,
            None => return 0.0,
        },
    };

    next_rate - current_rate
}

fn resource_benefit(
    upgrade: &UpgradeCandidate,
    building: &BuildingDefinition,
    production: &ProductionTable,
    horizon_hours: f64,
) -> f64 {
    let increase = production_increase(upgrade, building, production);
    increase
        * horizon_hours
        * building.profile.resource.production_multiplier()
        * PRODUCTION_DECAY.powi(level_exponent(upgrade.level))
}

fn storage_benefit(upgrade: &UpgradeCandidate, building: &BuildingDefinition) -> Result<f64, ScoringError> {
    let old_capacity = building
        .storage_capacity
        .ok_or_else(|| ScoringError::MissingStorageCapacity(building.name.clone()))?;

    // Early levels grow capacity faster
    let growth = if upgrade.level <= 6 { 1.25 } else { 1.15 };
    let increase = old_capacity * growth - old_capacity;

    Ok(increase
        * building.profile.resource.storage_weight()
        * STORAGE_GROWTH.powi(level_exponent(upgrade.level)))
}

fn defense_benefit(upgrade: &UpgradeCandidate, building: &BuildingDefinition) -> f64 {
    let kind = building.profile.defense;
    let (base, scale) = kind.weights();
    base * upgrade.cost as f64 * DEFENSE_COST_FACTOR * scale.powi(level_exponent(upgrade.level)) * kind.bonus()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{building, rate, sample_catalog, upgrade};
    use crate::catalog::Catalog;
    use crate::classify::Classifier;
    use crate::models::ResourceType;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn score_in(catalog: &Catalog, candidate: &UpgradeCandidate) -> Valuation {
        score(
            candidate,
            catalog.building(&candidate.building),
            catalog.production(),
            DEFAULT_HORIZON_HOURS,
        )
    }

    #[test]
    fn resource_benefit_uses_rate_delta() {
        let catalog = sample_catalog();
        // (400 - 200) * 168 * 1.5 * 0.85 = 42840 on a 1000 cost
        let candidate = upgrade("Gold Mine", 2, 1000, ResourceType::Elixir, 0.5);
        let b = catalog.building("Gold Mine").unwrap();
        let raw = raw_roi(&candidate, b, catalog.production(), DEFAULT_HORIZON_HOURS).unwrap();
        assert!(approx(raw, (42840.0 - 1000.0) / 1000.0 * 100.0));

        let valuation = score_in(&catalog, &candidate);
        assert_eq!(valuation.roi, 60.0);
        assert_eq!(valuation.outcome, ValuationOutcome::Scored);
    }

    #[test]
    fn dark_elixir_production_is_worth_more() {
        let catalog = sample_catalog();
        let candidate = upgrade("Dark Elixir Drill", 2, 1_000_000, ResourceType::Elixir, 12.0);
        let b = catalog.building("Dark Elixir Drill").unwrap();
        // (30 - 20) * 168 * 5.0 * 0.85 = 7140
        let raw = raw_roi(&candidate, b, catalog.production(), DEFAULT_HORIZON_HOURS).unwrap();
        assert!(approx(raw, (7140.0 - 1_000_000.0) / 1_000_000.0 * 100.0));
        assert_eq!(score_in(&catalog, &candidate).roi, 15.0);
    }

    #[test]
    fn first_level_produces_from_nothing() {
        let catalog = sample_catalog();
        let candidate = upgrade("Gold Mine", 1, 100_000, ResourceType::Elixir, 0.1);
        let b = catalog.building("Gold Mine").unwrap();
        assert_eq!(production_increase(&candidate, b, catalog.production()), 200.0);
    }

    #[test]
    fn missing_production_row_gives_no_benefit() {
        let catalog = sample_catalog();
        let candidate = upgrade("Gold Mine", 4, 1000, ResourceType::Elixir, 1.0);
        let b = catalog.building("Gold Mine").unwrap();
        assert_eq!(production_increase(&candidate, b, catalog.production()), 0.0);
        // Zero benefit is a raw ROI of exactly -100, lifted to the band floor
        let valuation = score_in(&catalog, &candidate);
        assert_eq!(valuation.raw_roi, -100.0);
        assert_eq!(valuation.roi, 15.0);
    }

    #[test]
    fn gap_below_target_level_gives_no_benefit() {
        let classifier = Classifier::new().unwrap();
        let catalog = Catalog::new(
            vec![building(&classifier, "Gold Mine", Category::Resource, None)],
            vec![rate("Gold Mine", 5, 900.0)],
            vec![],
        );
        let candidate = upgrade("Gold Mine", 5, 1000, ResourceType::Elixir, 1.0);
        let b = catalog.building("Gold Mine").unwrap();
        assert_eq!(production_increase(&candidate, b, catalog.production()), 0.0);
    }

    #[test]
    fn non_producer_names_get_no_production_credit() {
        let classifier = Classifier::new().unwrap();
        let catalog = Catalog::new(
            vec![building(&classifier, "Gold Pump", Category::Resource, None)],
            vec![rate("Gold Pump", 1, 100.0), rate("Gold Pump", 2, 500.0)],
            vec![],
        );
        let candidate = upgrade("Gold Pump", 2, 10, ResourceType::Elixir, 1.0);
        let b = catalog.building("Gold Pump").unwrap();
        assert_eq!(production_increase(&candidate, b, catalog.production()), 0.0);
    }

    #[test]
    fn storage_growth_slows_after_level_six() {
        let catalog = sample_catalog();
        let b = catalog.building("Elixir Storage").unwrap();

        // 2_000_000 * 0.15 * 0.5 * 1.1^6
        let late = upgrade("Elixir Storage", 7, 300_000, ResourceType::Gold, 24.0);
        let benefit = 2_000_000.0 * 0.15 * 0.5 * 1.1f64.powi(6);
        let raw = raw_roi(&late, b, catalog.production(), DEFAULT_HORIZON_HOURS).unwrap();
        assert!(approx(raw, (benefit - 300_000.0) / 300_000.0 * 100.0));

        // 2_000_000 * 0.25 * 0.5 * 1.1^5
        let early = upgrade("Elixir Storage", 6, 300_000, ResourceType::Gold, 24.0);
        let benefit = 2_000_000.0 * 0.25 * 0.5 * 1.1f64.powi(5);
        let raw = raw_roi(&early, b, catalog.production(), DEFAULT_HORIZON_HOURS).unwrap();
        assert!(approx(raw, (benefit - 300_000.0) / 300_000.0 * 100.0));
    }

    #[test]
    fn defense_roi_is_independent_of_cost() {
        let catalog = sample_catalog();
        let b = catalog.building("Mortar").unwrap();
        // 0.25 * 1.5 * 0.6^3 = 0.081 of cost, so ROI = -91.9
        for cost in [1_000, 100_000] {
            let candidate = upgrade("Mortar", 4, cost, ResourceType::Gold, 8.0);
            let raw = raw_roi(&candidate, b, catalog.production(), DEFAULT_HORIZON_HOURS).unwrap();
            assert!(approx(raw, (0.25 * 1.5 * 0.6f64.powi(3) - 1.0) * 100.0));
        }
        let candidate = upgrade("Mortar", 4, 100_000, ResourceType::Gold, 8.0);
        assert_eq!(score_in(&catalog, &candidate).roi, -25.0);
    }

    #[test]
    fn inferno_gets_bonus() {
        let catalog = sample_catalog();
        let b = catalog.building("Inferno Tower").unwrap();
        let candidate = upgrade("Inferno Tower", 1, 1000, ResourceType::Gold, 1.0);
        // 0.7 * 1.5 * 1.2 = 1.26 of cost
        let raw = raw_roi(&candidate, b, catalog.production(), DEFAULT_HORIZON_HOURS).unwrap();
        assert!(approx(raw, 26.0));
        assert!(approx(score_in(&catalog, &candidate).roi, 26.0));
    }

    #[test]
    fn free_upgrade_scores_zero_before_clamp() {
        let catalog = sample_catalog();
        let candidate = upgrade("Mortar", 2, 0, ResourceType::Gold, 1.0);
        let valuation = score_in(&catalog, &candidate);
        assert_eq!(valuation.raw_roi, 0.0);
        assert_eq!(valuation.roi, 0.0);
        assert!(!valuation.is_degraded());

        let candidate = upgrade("Gold Mine", 2, 0, ResourceType::Elixir, 1.0);
        assert_eq!(score_in(&catalog, &candidate).roi, 15.0);
    }

    #[test]
    fn roi_stays_within_category_bands() {
        let catalog = sample_catalog();
        for candidate in catalog.upgrades() {
            let category = catalog.building(&candidate.building).unwrap().category;
            let (min_roi, max_roi) = category.roi_bounds();
            let valuation = score_in(&catalog, candidate);
            assert!(
                valuation.roi >= min_roi && valuation.roi <= max_roi,
                "{} L{} scored {}",
                candidate.building,
                candidate.level,
                valuation.roi
            );
        }
    }

    #[test]
    fn unknown_building_defaults_to_zero() {
        let catalog = sample_catalog();
        let candidate = upgrade("Clan Castle", 2, 1000, ResourceType::Gold, 1.0);
        let valuation = score_in(&catalog, &candidate);
        assert_eq!(valuation.roi, 0.0);
        assert_eq!(
            valuation.outcome,
            ValuationOutcome::Defaulted(ScoringError::UnknownBuilding("Clan Castle".to_string()))
        );
    }

    #[test]
    fn storage_without_capacity_defaults_to_zero() {
        let classifier = Classifier::new().unwrap();
        let catalog = Catalog::new(
            vec![building(&classifier, "Gold Storage", Category::Storage, None)],
            vec![],
            vec![],
        );
        let candidate = upgrade("Gold Storage", 3, 1000, ResourceType::Elixir, 1.0);
        let valuation = score_in(&catalog, &candidate);
        assert_eq!(valuation.roi, 0.0);
        assert!(valuation.is_degraded());
    }

    #[test]
    fn level_zero_is_a_scoring_error() {
        let catalog = sample_catalog();
        let candidate = upgrade("Mortar", 0, 1000, ResourceType::Gold, 1.0);
        let valuation = score_in(&catalog, &candidate);
        assert_eq!(valuation.outcome, ValuationOutcome::Defaulted(ScoringError::InvalidLevel(0)));
    }

    #[test]
    fn longer_horizon_raises_resource_roi() {
        let catalog = sample_catalog();
        let b = catalog.building("Dark Elixir Drill").unwrap();
        let candidate = upgrade("Dark Elixir Drill", 2, 1_000_000, ResourceType::Elixir, 12.0);
        let week = raw_roi(&candidate, b, catalog.production(), 168.0).unwrap();
        let month = raw_roi(&candidate, b, catalog.production(), 720.0).unwrap();
        assert!(month > week);
    }
}
