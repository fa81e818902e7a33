//! Cost estimation, optimization suggestions and lead scoring
//!
//! Everything here is a pure transform of a `RequirementsResult` and the
//! configuration that produced it. Cost assumptions live in `CostModel` and
//! `CostRateTable` so they can be changed from the settings file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::DecisionEngine;
use crate::error::{Error, Result};
use crate::models::{
    require_positive, AsrsType, ConfigurationInput, ContainerType, CostBreakdown, CostEstimate,
    CostRate, LeadClassification, LeadScore, Optimization, OptimizationKind, RequirementsResult,
    SavingsRange,
};
use crate::seed::{self, INSTALLATION, PIPING_SYSTEM, SPRINKLER_HEAD};

pub const MAX_LEAD_SCORE: u32 = 100;
const HOT_LEAD_ABOVE: u32 = 70;
const WARM_LEAD_ABOVE: u32 = 40;

/// Tunable assumptions behind the cost estimate and savings figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    pub pipe_feet_per_sprinkler: f64,
    /// All-in cost of one sprinkler, used for savings ranges
    pub baseline_cost_per_sprinkler: f64,
    pub savings_min_factor: f64,
    pub savings_max_factor: f64,
    pub deep_rack_threshold_ft: f64,
    pub deep_rack_increment: f64,
    pub tight_spacing_threshold_ft: f64,
    pub tight_spacing_increment: f64,
    pub high_ceiling_threshold_ft: f64,
    pub high_ceiling_increment: f64,
    pub max_complexity_multiplier: f64,
    pub recommended_spacing_ft: f64,
    pub spacing_sprinkler_reduction: f64,
    pub depth_optimization_threshold_ft: f64,
    pub depth_sprinkler_reduction: f64,
    pub container_savings_min: f64,
    pub container_savings_max: f64,
    pub lead: LeadWeights,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            pipe_feet_per_sprinkler: 20.0,
            baseline_cost_per_sprinkler: 400.0,
            savings_min_factor: 0.8,
            savings_max_factor: 1.2,
            deep_rack_threshold_ft: 10.0,
            deep_rack_increment: 0.2,
            tight_spacing_threshold_ft: 3.0,
            tight_spacing_increment: 0.15,
            high_ceiling_threshold_ft: 35.0,
            high_ceiling_increment: 0.1,
            max_complexity_multiplier: 2.0,
            recommended_spacing_ft: 4.0,
            spacing_sprinkler_reduction: 0.25,
            depth_optimization_threshold_ft: 8.0,
            depth_sprinkler_reduction: 0.2,
            container_savings_min: 15_000.0,
            container_savings_max: 50_000.0,
            lead: LeadWeights::default(),
        }
    }
}

/// Points an inquiry earns toward its lead score. Totals are in whole dollars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadWeights {
    pub high_value_total: u64,
    pub high_value_points: u32,
    pub medium_value_total: u64,
    pub medium_value_points: u32,
    pub low_value_total: u64,
    pub low_value_points: u32,
    pub deep_rack_ft: f64,
    pub deep_rack_points: u32,
    pub tight_spacing_ft: f64,
    pub tight_spacing_points: u32,
    pub high_ceiling_ft: f64,
    pub high_ceiling_points: u32,
    pub shuttle_points: u32,
    pub mini_load_points: u32,
}

impl Default for LeadWeights {
    fn default() -> Self {
        Self {
            high_value_total: 100_000,
            high_value_points: 30,
            medium_value_total: 50_000,
            medium_value_points: 20,
            low_value_total: 25_000,
            low_value_points: 10,
            deep_rack_ft: 10.0,
            deep_rack_points: 15,
            tight_spacing_ft: 3.0,
            tight_spacing_points: 10,
            high_ceiling_ft: 35.0,
            high_ceiling_points: 10,
            shuttle_points: 20,
            mini_load_points: 15,
        }
    }
}

impl LeadWeights {
    pub fn validate(&self) -> Result<()> {
        require_positive("lead.deep_rack_ft", self.deep_rack_ft)?;
        require_positive("lead.tight_spacing_ft", self.tight_spacing_ft)?;
        require_positive("lead.high_ceiling_ft", self.high_ceiling_ft)?;

        if !(self.high_value_total >= self.medium_value_total
            && self.medium_value_total >= self.low_value_total)
        {
            return Err(Error::Validation(
                "lead value totals must descend from high to low".to_string(),
            ));
        }
        Ok(())
    }
}

impl CostModel {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("pipe_feet_per_sprinkler", self.pipe_feet_per_sprinkler),
            ("baseline_cost_per_sprinkler", self.baseline_cost_per_sprinkler),
            ("savings_min_factor", self.savings_min_factor),
            ("savings_max_factor", self.savings_max_factor),
            ("deep_rack_threshold_ft", self.deep_rack_threshold_ft),
            ("deep_rack_increment", self.deep_rack_increment),
            ("tight_spacing_threshold_ft", self.tight_spacing_threshold_ft),
            ("tight_spacing_increment", self.tight_spacing_increment),
            ("high_ceiling_threshold_ft", self.high_ceiling_threshold_ft),
            ("high_ceiling_increment", self.high_ceiling_increment),
            ("max_complexity_multiplier", self.max_complexity_multiplier),
            ("recommended_spacing_ft", self.recommended_spacing_ft),
            ("spacing_sprinkler_reduction", self.spacing_sprinkler_reduction),
            ("depth_optimization_threshold_ft", self.depth_optimization_threshold_ft),
            ("depth_sprinkler_reduction", self.depth_sprinkler_reduction),
            ("container_savings_min", self.container_savings_min),
            ("container_savings_max", self.container_savings_max),
        ] {
            require_positive(name, value)?;
        }

        if self.max_complexity_multiplier < 1.0 {
            return Err(Error::Validation(
                "max_complexity_multiplier must be at least 1.0".to_string(),
            ));
        }
        if self.savings_min_factor > self.savings_max_factor {
            return Err(Error::Validation(
                "savings_min_factor exceeds savings_max_factor".to_string(),
            ));
        }
        if self.container_savings_min > self.container_savings_max {
            return Err(Error::Validation(
                "container_savings_min exceeds container_savings_max".to_string(),
            ));
        }
        for (name, value) in [
            ("spacing_sprinkler_reduction", self.spacing_sprinkler_reduction),
            ("depth_sprinkler_reduction", self.depth_sprinkler_reduction),
        ] {
            if value >= 1.0 {
                return Err(Error::Validation(format!("{} must be below 1.0", name)));
            }
        }
        self.lead.validate()
    }
}

/// Component -> unit cost. Components missing from the inputs keep their
/// built-in rates.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRateTable {
    rates: BTreeMap<String, f64>,
}

impl Default for CostRateTable {
    fn default() -> Self {
        Self {
            rates: seed::cost_rates()
                .into_iter()
                .map(|r| (r.component_type, r.base_cost_per_unit))
                .collect(),
        }
    }
}

impl CostRateTable {
    pub fn new(rates: impl IntoIterator<Item = CostRate>) -> Result<Self> {
        let mut table = Self::default();
        for rate in rates {
            table.set(&rate.component_type, rate.base_cost_per_unit)?;
        }
        Ok(table)
    }

    pub fn with_overrides(mut self, overrides: &BTreeMap<String, f64>) -> Result<Self> {
        for (component, cost) in overrides {
            self.set(component, *cost)?;
        }
        Ok(self)
    }

    fn set(&mut self, component: &str, cost: f64) -> Result<()> {
        require_positive(component, cost)?;
        self.rates.insert(component.to_string(), cost);
        Ok(())
    }

    pub fn unit_cost(&self, component: &str) -> f64 {
        self.rates.get(component).copied().unwrap_or(0.0)
    }
}

/// Multiplier for installation difficulty, capped by the model
pub fn complexity_multiplier(input: &ConfigurationInput, model: &CostModel) -> f64 {
    let mut multiplier = 1.0;

    if input.rack_depth_ft > model.deep_rack_threshold_ft {
        multiplier += model.deep_rack_increment;
    }
    if input.rack_spacing_ft < model.tight_spacing_threshold_ft {
        multiplier += model.tight_spacing_increment;
    }
    if input
        .ceiling_height_ft
        .is_some_and(|h| h > model.high_ceiling_threshold_ft)
    {
        multiplier += model.high_ceiling_increment;
    }

    f64::min(multiplier, model.max_complexity_multiplier)
}

/// Estimate the installed cost for the sprinklers a result calls for
pub fn estimate_cost(
    requirements: &RequirementsResult,
    input: &ConfigurationInput,
    rates: &CostRateTable,
    model: &CostModel,
) -> CostEstimate {
    estimate_cost_for(requirements.specifications.sprinkler_count, input, rates, model)
}

pub fn estimate_cost_for(
    sprinkler_count: u32,
    input: &ConfigurationInput,
    rates: &CostRateTable,
    model: &CostModel,
) -> CostEstimate {
    let count = f64::from(sprinkler_count);

    let breakdown = CostBreakdown {
        sprinklers: count * rates.unit_cost(SPRINKLER_HEAD),
        piping: count * rates.unit_cost(PIPING_SYSTEM) * model.pipe_feet_per_sprinkler,
        installation: count * rates.unit_cost(INSTALLATION),
    };
    let subtotal = breakdown.sprinklers + breakdown.piping + breakdown.installation;
    let multiplier = complexity_multiplier(input, model);
    let total = (subtotal * multiplier).round() as u64;

    let cost_per_sprinkler = if sprinkler_count == 0 {
        None
    } else {
        Some((total as f64 / count).round() as u64)
    };

    CostEstimate {
        breakdown,
        complexity_multiplier: multiplier,
        subtotal,
        total,
        cost_per_sprinkler,
        currency: "USD".to_string(),
    }
}

/// Savings range for removing `sprinkler_reduction` sprinklers
pub fn calculate_savings(sprinkler_reduction: u32, model: &CostModel) -> SavingsRange {
    let base = f64::from(sprinkler_reduction) * model.baseline_cost_per_sprinkler;
    SavingsRange {
        min: base * model.savings_min_factor,
        max: base * model.savings_max_factor,
    }
}

/// Design changes that would lower the protection cost.
///
/// Suggestions that work by removing sprinklers are skipped when the
/// configuration has no sprinklers to remove.
pub fn identify_optimizations(
    input: &ConfigurationInput,
    sprinkler_count: u32,
    model: &CostModel,
) -> Vec<Optimization> {
    let mut optimizations = Vec::new();
    let count = f64::from(sprinkler_count);

    if sprinkler_count > 0 && input.rack_spacing_ft < model.recommended_spacing_ft {
        let reduced = (count * (1.0 - model.spacing_sprinkler_reduction)).ceil() as u32;
        optimizations.push(Optimization {
            kind: OptimizationKind::Spacing,
            suggestion: format!("Increase spacing to {} ft", model.recommended_spacing_ft),
            impact: format!(
                "Reduce sprinkler count from {} to ~{}",
                sprinkler_count, reduced
            ),
            savings: calculate_savings(sprinkler_count.saturating_sub(reduced), model),
            feasibility: "High".to_string(),
        });
    }

    if input.container_type == ContainerType::OpenTop {
        optimizations.push(Optimization {
            kind: OptimizationKind::Container,
            suggestion: "Consider closed-top containers".to_string(),
            impact: "Reduced fire protection requirements".to_string(),
            savings: SavingsRange {
                min: model.container_savings_min,
                max: model.container_savings_max,
            },
            feasibility: "Medium - Depends on operational requirements".to_string(),
        });
    }

    if sprinkler_count > 0 && input.rack_depth_ft > model.depth_optimization_threshold_ft {
        let removed = (count * model.depth_sprinkler_reduction).ceil() as u32;
        optimizations.push(Optimization {
            kind: OptimizationKind::Depth,
            suggestion: format!(
                "Consider reducing rack depth to {} ft or less",
                model.depth_optimization_threshold_ft
            ),
            impact: "Simplified sprinkler arrangement and reduced costs".to_string(),
            savings: calculate_savings(removed, model),
            feasibility: "Low - May impact storage density".to_string(),
        });
    }

    optimizations
}

/// Score an inquiry 0-100 for sales follow-up. Points add up and the sum is
/// capped at `MAX_LEAD_SCORE`.
pub fn score_lead(input: &ConfigurationInput, estimate: &CostEstimate, weights: &LeadWeights) -> LeadScore {
    let mut score = 0u32;

    if estimate.total > weights.high_value_total {
        score = score.saturating_add(weights.high_value_points);
    } else if estimate.total > weights.medium_value_total {
        score = score.saturating_add(weights.medium_value_points);
    } else if estimate.total > weights.low_value_total {
        score = score.saturating_add(weights.low_value_points);
    }

    if input.rack_depth_ft > weights.deep_rack_ft {
        score = score.saturating_add(weights.deep_rack_points);
    }
    if input.rack_spacing_ft < weights.tight_spacing_ft {
        score = score.saturating_add(weights.tight_spacing_points);
    }
    if input.ceiling_height_ft.is_some_and(|h| h > weights.high_ceiling_ft) {
        score = score.saturating_add(weights.high_ceiling_points);
    }

    score = score.saturating_add(match input.asrs_type {
        AsrsType::Shuttle => weights.shuttle_points,
        AsrsType::MiniLoad => weights.mini_load_points,
    });

    let score = score.min(MAX_LEAD_SCORE);
    let classification = if score > HOT_LEAD_ABOVE {
        LeadClassification::Hot
    } else if score > WARM_LEAD_ABOVE {
        LeadClassification::Warm
    } else {
        LeadClassification::Cold
    };

    LeadScore {
        score: score as u8,
        classification,
        priority: classification.priority(),
    }
}

/// Requirements plus everything derived from them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub configuration: ConfigurationInput,
    pub requirements: RequirementsResult,
    pub cost_estimate: CostEstimate,
    pub optimizations: Vec<Optimization>,
    /// Sum of the optimizations' upper savings bounds
    pub total_savings: f64,
    pub lead_score: LeadScore,
}

/// Run the whole pipeline for one configuration
pub fn assess(
    engine: &DecisionEngine<'_>,
    input: &ConfigurationInput,
    rates: &CostRateTable,
    model: &CostModel,
) -> Result<Assessment> {
    let requirements = engine.get_design_requirements(input)?;
    let cost_estimate = estimate_cost(&requirements, input, rates, model);
    let optimizations =
        identify_optimizations(input, requirements.specifications.sprinkler_count, model);
    let total_savings: f64 = optimizations.iter().map(|o| o.savings.max).sum();
    let lead_score = score_lead(input, &cost_estimate, &model.lead);

    Ok(Assessment {
        configuration: input.clone(),
        requirements,
        cost_estimate,
        optimizations,
        total_savings,
        lead_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ReferenceCatalog;
    use crate::models::LeadPriority;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn shuttle(depth: f64, spacing: f64) -> ConfigurationInput {
        ConfigurationInput::new(AsrsType::Shuttle, ContainerType::ClosedTop, depth, spacing)
    }

    #[test]
    fn estimates_cost_with_default_rates() {
        let estimate =
            estimate_cost_for(8, &shuttle(3.0, 2.5), &CostRateTable::default(), &CostModel::default());

        assert_close(estimate.breakdown.sprinklers, 1200.0);
        assert_close(estimate.breakdown.piping, 4000.0);
        assert_close(estimate.breakdown.installation, 1600.0);
        assert_close(estimate.subtotal, 6800.0);
        assert_close(estimate.complexity_multiplier, 1.15);
        assert_eq!(estimate.total, 7820);
        assert_eq!(estimate.cost_per_sprinkler, Some(978));
        assert_eq!(estimate.currency, "USD");
    }

    #[test]
    fn zero_sprinklers_has_no_cost_per_sprinkler() {
        let estimate =
            estimate_cost_for(0, &shuttle(3.0, 2.5), &CostRateTable::default(), &CostModel::default());
        assert_eq!(estimate.total, 0);
        assert_eq!(estimate.cost_per_sprinkler, None);
    }

    #[test]
    fn total_strictly_increases_with_sprinkler_count() {
        let rates = CostRateTable::default();
        let model = CostModel::default();
        for input in [
            shuttle(3.0, 5.0),
            shuttle(12.0, 2.0).with_ceiling_height(40.0),
        ] {
            let mut previous = estimate_cost_for(0, &input, &rates, &model).total;
            for count in 1..=250 {
                let total = estimate_cost_for(count, &input, &rates, &model).total;
                assert!(total > previous, "count {} gave {} after {}", count, total, previous);
                previous = total;
            }
        }
    }

    #[test]
    fn complexity_multiplier_stacks_and_caps() {
        let model = CostModel::default();
        assert_close(complexity_multiplier(&shuttle(3.0, 5.0), &model), 1.0);
        assert_close(
            complexity_multiplier(&shuttle(11.0, 2.0).with_ceiling_height(36.0), &model),
            1.45,
        );

        let steep = CostModel {
            deep_rack_increment: 0.9,
            tight_spacing_increment: 0.9,
            ..CostModel::default()
        };
        assert_close(complexity_multiplier(&shuttle(11.0, 2.0), &steep), 2.0);
    }

    #[test]
    fn rate_overrides_replace_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert(SPRINKLER_HEAD.to_string(), 175.0);
        let rates = CostRateTable::new(vec![CostRate {
            component_type: INSTALLATION.to_string(),
            base_cost_per_unit: 250.0,
        }])
        .unwrap()
        .with_overrides(&overrides)
        .unwrap();

        assert_close(rates.unit_cost(SPRINKLER_HEAD), 175.0);
        assert_close(rates.unit_cost(PIPING_SYSTEM), 25.0);
        assert_close(rates.unit_cost(INSTALLATION), 250.0);

        let bad = CostRateTable::new(vec![CostRate {
            component_type: PIPING_SYSTEM.to_string(),
            base_cost_per_unit: -1.0,
        }]);
        assert!(matches!(bad, Err(Error::Validation(_))));
    }

    #[test]
    fn suggests_spacing_container_and_depth_changes() {
        let model = CostModel::default();
        let input = ConfigurationInput::new(AsrsType::Shuttle, ContainerType::OpenTop, 9.0, 2.5);
        let optimizations = identify_optimizations(&input, 8, &model);

        let kinds: Vec<OptimizationKind> = optimizations.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OptimizationKind::Spacing,
                OptimizationKind::Container,
                OptimizationKind::Depth
            ]
        );

        let spacing = &optimizations[0];
        assert_eq!(spacing.suggestion, "Increase spacing to 4 ft");
        assert_eq!(spacing.impact, "Reduce sprinkler count from 8 to ~6");
        assert_close(spacing.savings.min, 640.0);
        assert_close(spacing.savings.max, 960.0);

        assert_close(optimizations[1].savings.min, 15_000.0);
        assert_close(optimizations[1].savings.max, 50_000.0);

        let depth = &optimizations[2];
        assert_eq!(depth.feasibility, "Low - May impact storage density");
        assert_close(depth.savings.min, 640.0);
    }

    #[test]
    fn no_suggestions_for_roomy_closed_top_layout() {
        let optimizations = identify_optimizations(&shuttle(6.0, 5.0), 4, &CostModel::default());
        assert!(optimizations.is_empty());
    }

    #[test]
    fn lead_score_tiers() {
        let rates = CostRateTable::default();
        let model = CostModel::default();

        let cold_input =
            ConfigurationInput::new(AsrsType::MiniLoad, ContainerType::ClosedTop, 3.0, 5.0);
        let cold = score_lead(&cold_input, &estimate_cost_for(8, &cold_input, &rates, &model), &model.lead);
        assert_eq!(cold.score, 15);
        assert_eq!(cold.classification, LeadClassification::Cold);
        assert_eq!(cold.priority, LeadPriority::Low);

        let warm_input = shuttle(11.0, 2.5);
        let warm = score_lead(&warm_input, &estimate_cost_for(4, &warm_input, &rates, &model), &model.lead);
        assert_eq!(warm.score, 45);
        assert_eq!(warm.classification, LeadClassification::Warm);
        assert_eq!(warm.priority, LeadPriority::Medium);
    }

    #[test]
    fn every_trigger_with_default_weights_scores_85() {
        let input = shuttle(14.0, 2.0).with_ceiling_height(45.0);
        let estimate = estimate_cost_for(500, &input, &CostRateTable::default(), &CostModel::default());
        assert!(estimate.total > 100_000);

        let lead = score_lead(&input, &estimate, &LeadWeights::default());
        assert_eq!(lead.score, 85);
        assert_eq!(lead.classification, LeadClassification::Hot);
        assert_eq!(lead.priority, LeadPriority::High);
    }

    #[test]
    fn lead_score_is_capped_at_100() {
        let input = shuttle(14.0, 2.0).with_ceiling_height(45.0);
        let estimate = estimate_cost_for(500, &input, &CostRateTable::default(), &CostModel::default());
        let heavy = LeadWeights {
            high_value_points: 60,
            deep_rack_points: 40,
            shuttle_points: u32::MAX,
            ..LeadWeights::default()
        };

        let lead = score_lead(&input, &estimate, &heavy);
        assert_eq!(lead.score, 100);
        assert_eq!(lead.classification, LeadClassification::Hot);
    }

    #[test]
    fn lead_weights_validation() {
        let inverted = CostModel {
            lead: LeadWeights {
                low_value_total: 200_000,
                ..LeadWeights::default()
            },
            ..CostModel::default()
        };
        assert!(matches!(inverted.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn cost_model_validation() {
        assert!(CostModel::default().validate().is_ok());

        let inverted = CostModel {
            savings_min_factor: 1.5,
            ..CostModel::default()
        };
        assert!(inverted.validate().is_err());

        let negative = CostModel {
            pipe_feet_per_sprinkler: -20.0,
            ..CostModel::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn assess_combines_all_stages() {
        let catalog = ReferenceCatalog::builtin().unwrap();
        let engine = DecisionEngine::new(&catalog);
        let assessment = assess(
            &engine,
            &shuttle(3.0, 2.5),
            &CostRateTable::default(),
            &CostModel::default(),
        )
        .unwrap();

        assert_eq!(assessment.requirements.compliance.applicable_figure, Some(4));
        assert_eq!(assessment.cost_estimate.total, 7820);
        assert_eq!(assessment.optimizations.len(), 1);
        assert_close(assessment.total_savings, 960.0);
        assert_eq!(assessment.lead_score.score, 30);
    }
}
