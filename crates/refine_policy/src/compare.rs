use std::time::Instant;

use serde::Serialize;

use crate::pity::{PityState, StateBound};
use crate::solver::{DecisionRule, RefineSolver, Solution, SolverError};

/// The optimal strategy next to the two fixed baselines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub optimal: Solution,
    pub no_booster: Solution,
    pub full_booster: Solution,
}

impl StrategyComparison {
    pub fn savings_over_no_booster(&self) -> f64 {
        self.no_booster.price() - self.optimal.price()
    }

    pub fn savings_over_full_booster(&self) -> f64 {
        self.full_booster.price() - self.optimal.price()
    }
}

/// Solve the optimal, never-boost and always-boost strategies in parallel.
pub fn compare_strategies(
    solver: &RefineSolver,
    start_state: PityState,
) -> Result<StrategyComparison, SolverError> {
    let start = Instant::now();
    let max = solver.max_booster_uses();

    let (optimal, (no_booster, full_booster)) = rayon::join(
        || solver.solve(DecisionRule::Optimal, start_state),
        || {
            rayon::join(
                || solver.solve(DecisionRule::Fixed(0), start_state),
                || solver.solve(DecisionRule::Fixed(max), start_state),
            )
        },
    );
    let comparison = StrategyComparison {
        optimal: optimal?,
        no_booster: no_booster?,
        full_booster: full_booster?,
    };

    if comparison.optimal.bound() == StateBound::Truncated {
        tracing::warn!(
            last_state = solver.last_state(),
            "pity state limit reached before success became certain; last state treated as stationary"
        );
    }
    tracing::debug!(
        num_states = comparison.optimal.num_states(),
        max_booster_uses = max,
        optimal = comparison.optimal.price(),
        no_booster = comparison.no_booster.price(),
        full_booster = comparison.full_booster.price(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "strategies compared"
    );

    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Grade, ItemType, resolve_table};
    use crate::pity::ProbabilityModel;
    use crate::price::{DiscountMap, PriceTable};

    #[test]
    fn optimal_is_never_worse_than_baselines() {
        let table = resolve_table(ItemType::Weapon, Grade::T3_1340, 18).unwrap();
        let model = ProbabilityModel::new(0.0, 0.005, 0.0).unwrap();
        let solver = RefineSolver::new(
            &table,
            &PriceTable::market_defaults(),
            &DiscountMap::new(),
            model,
        )
        .unwrap();
        let comparison = compare_strategies(&solver, 0).unwrap();
        assert!(comparison.savings_over_no_booster() >= -1e-9);
        assert!(comparison.savings_over_full_booster() >= -1e-9);
        assert_eq!(
            comparison.full_booster.path().steps()[0].boosters_used,
            table.max_booster_uses()
        );
    }
}
