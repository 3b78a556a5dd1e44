mod booster_set;
mod path;
mod state_table;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::item::Item;
use crate::pity::{PityState, ProbabilityModel, StateBound, StateSpace};
use crate::price::{AttemptCosts, DiscountMap, PriceError, PriceTable};
use crate::table::{EnhancementTable, TableError};

pub use booster_set::BoosterSet;
pub use path::{Path, PathStep};
use state_table::StateTable;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("invalid refine table: {0}")]
    InvalidTable(#[from] TableError),
    #[error("invalid price input: {0}")]
    InvalidPrice(#[from] PriceError),
    #[error("{field} = {value} is outside [0, 1]")]
    InvalidProbability { field: &'static str, value: f64 },
    #[error("state limit must be at least 1")]
    InvalidStateLimit,
    #[error("booster count {requested} exceeds the {max} available")]
    BoosterCountOutOfRange { requested: usize, max: usize },
    #[error("success is unreachable from pity state {state}")]
    SuccessUnreachable { state: PityState },
    #[error("pity state {state} is outside the solved range 0..={last}")]
    StateOutOfRange { state: PityState, last: PityState },
}

/// How the booster count is chosen in each pity state.
///
/// Under both rules the cheapest boosters for the chosen count are picked
/// per state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DecisionRule {
    Optimal,
    Fixed(usize),
}

/// Expected price of a strategy and the decisions that realize it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    price: f64,
    path: Path,
    rule: DecisionRule,
    bound: StateBound,
    #[serde(skip)]
    values: Vec<f64>,
    #[serde(skip)]
    decisions: Vec<BoosterSet>,
    #[serde(skip)]
    consumption: BTreeMap<Item, f64>,
}

impl Solution {
    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rule(&self) -> DecisionRule {
        self.rule
    }

    pub fn bound(&self) -> StateBound {
        self.bound
    }

    /// Cost-to-go of a pity state; the absorbing success state (past the
    /// solved range of a certain bound) costs nothing.
    pub fn cost_to_go(&self, state: PityState) -> Option<f64> {
        match self.values.get(state as usize) {
            Some(&value) => Some(value),
            None if self.bound == StateBound::Certain => Some(0.0),
            None => self.values.last().copied(),
        }
    }

    /// Number of boosters used in a pity state.
    pub fn decision(&self, state: PityState) -> Option<usize> {
        self.booster_set(state).map(BoosterSet::len)
    }

    /// The boosters used in a pity state.
    pub fn booster_set(&self, state: PityState) -> Option<BoosterSet> {
        match self.decisions.get(state as usize) {
            Some(&decision) => Some(decision),
            None if self.bound == StateBound::Certain => None,
            None => self.decisions.last().copied(),
        }
    }

    pub fn num_states(&self) -> usize {
        self.values.len()
    }

    pub fn expected_attempts(&self) -> f64 {
        self.path.iter().map(|step| step.expected_attempts).sum()
    }

    /// Expected units consumed per item, before owned stock is subtracted.
    pub fn expected_consumption(&self) -> &BTreeMap<Item, f64> {
        &self.consumption
    }
}

/// Cost-to-go solver for one table under fixed prices and probability bonuses.
pub struct RefineSolver {
    table: EnhancementTable,
    model: ProbabilityModel,
    space: StateSpace,
    max_booster_uses: usize,

    // Indexed by `BoosterSet::mask`.
    attempt_cost_cached: Vec<f64>,
    booster_bonus_cached: Vec<f64>,
    // Every booster subset, by size and then by mask.
    subsets: Vec<BoosterSet>,
}

impl RefineSolver {
    pub fn new(
        table: &EnhancementTable,
        prices: &PriceTable,
        discounts: &DiscountMap,
        model: ProbabilityModel,
    ) -> Result<Self, SolverError> {
        let costs = AttemptCosts::new(table, prices, discounts)?;
        let boosters = table.boosters();
        let all = BoosterSet::all(boosters.len());

        let num_subsets = all.mask() as usize + 1;
        let mut attempt_cost_cached = Vec::with_capacity(num_subsets);
        let mut booster_bonus_cached = Vec::with_capacity(num_subsets);
        for mask in 0..=all.mask() {
            let set = BoosterSet::from_mask(mask);
            let mut attempt_cost = costs.material_cost();
            let mut booster_bonus = 0.0;
            for index in set.indices() {
                attempt_cost += costs.booster_cost(index);
                booster_bonus += boosters[index].probability_bonus;
            }
            attempt_cost_cached.push(attempt_cost);
            booster_bonus_cached.push(booster_bonus);
        }

        let mut subsets: Vec<BoosterSet> = (0..=all.mask()).map(BoosterSet::from_mask).collect();
        subsets.sort_by_key(|set| (set.len(), set.mask()));

        Ok(Self {
            table: table.clone(),
            model,
            space: model.state_space(table.base_probability()),
            max_booster_uses: boosters.len(),
            attempt_cost_cached,
            booster_bonus_cached,
            subsets,
        })
    }

    /// Lower the number of boosters the solver may use per attempt.
    pub fn with_booster_cap(mut self, cap: usize) -> Self {
        self.max_booster_uses = self.max_booster_uses.min(cap);
        self
    }

    pub fn table(&self) -> &EnhancementTable {
        &self.table
    }

    pub fn model(&self) -> &ProbabilityModel {
        &self.model
    }

    pub fn max_booster_uses(&self) -> usize {
        self.max_booster_uses
    }

    pub fn last_state(&self) -> PityState {
        self.space.last
    }

    pub fn bound(&self) -> StateBound {
        self.space.bound
    }

    /// Materials plus the given boosters; `None` if a booster is not in the table.
    pub fn attempt_cost(&self, set: BoosterSet) -> Option<f64> {
        self.attempt_cost_cached.get(set.mask() as usize).copied()
    }

    pub fn booster_bonus(&self, set: BoosterSet) -> Option<f64> {
        self.booster_bonus_cached.get(set.mask() as usize).copied()
    }

    /// Items of the table's boosters in `set`, in table order.
    pub fn boosters_in(&self, set: BoosterSet) -> Vec<Item> {
        set.indices()
            .filter_map(|index| self.table.boosters().get(index))
            .map(|booster| booster.item)
            .collect()
    }

    pub fn success_probability(&self, state: PityState, set: BoosterSet) -> Option<f64> {
        self.booster_bonus(set).map(|bonus| {
            self.model
                .success_probability(self.table.base_probability(), state, bonus)
        })
    }

    pub fn optimize(&self) -> Result<Solution, SolverError> {
        self.solve(DecisionRule::Optimal, 0)
    }

    pub fn optimize_from(&self, start: PityState) -> Result<Solution, SolverError> {
        self.solve(DecisionRule::Optimal, start)
    }

    /// Expected price when every attempt uses exactly `k` boosters.
    pub fn fixed(&self, k: usize) -> Result<Solution, SolverError> {
        self.solve(DecisionRule::Fixed(k), 0)
    }

    pub fn solve(&self, rule: DecisionRule, start: PityState) -> Result<Solution, SolverError> {
        let last = self.space.last;
        if start > last {
            return Err(SolverError::StateOutOfRange { state: start, last });
        }

        let states = self.cost_to_go(rule)?;
        let path = path::reconstruct(self, &states, start, last, self.space.bound);
        let price = states.value(start);
        let consumption = self.expected_consumption(&path);
        let (values, decisions) = states.into_parts();

        Ok(Solution {
            price,
            path,
            rule,
            bound: self.space.bound,
            values,
            decisions,
            consumption,
        })
    }

    /// Must ensure `set` only holds boosters of the table.
    fn cost_of(&self, set: BoosterSet) -> f64 {
        self.attempt_cost_cached[set.mask() as usize]
    }

    /// Must ensure `set` only holds boosters of the table.
    fn probability_of(&self, state: PityState, set: BoosterSet) -> f64 {
        self.model.success_probability(
            self.table.base_probability(),
            state,
            self.booster_bonus_cached[set.mask() as usize],
        )
    }

    fn candidates(&self, rule: DecisionRule) -> Result<Vec<BoosterSet>, SolverError> {
        let sizes = match rule {
            DecisionRule::Optimal => 0..=self.max_booster_uses,
            DecisionRule::Fixed(k) if k <= self.max_booster_uses => k..=k,
            DecisionRule::Fixed(k) => {
                return Err(SolverError::BoosterCountOutOfRange {
                    requested: k,
                    max: self.max_booster_uses,
                });
            }
        };
        Ok(self
            .subsets
            .iter()
            .copied()
            .filter(|set| sizes.contains(&set.len()))
            .collect())
    }

    /// Backward induction from the last pity state down to 0.
    fn cost_to_go(&self, rule: DecisionRule) -> Result<StateTable, SolverError> {
        let candidates = self.candidates(rule)?;
        let last = self.space.last;
        let mut states = StateTable::new(last);

        let (value, decision) = match self.space.bound {
            // Success is absorbing and costs nothing more.
            StateBound::Certain => self.best_decision(last, &candidates, 0.0),
            StateBound::Stationary | StateBound::Truncated => self
                .best_stationary_decision(last, &candidates)
                .ok_or(SolverError::SuccessUnreachable { state: last })?,
        };
        states.set(last, value, decision);

        for state in (0..last).rev() {
            let next_value = states.value(state + 1);
            let (value, decision) = self.best_decision(state, &candidates, next_value);
            states.set(state, value, decision);
        }

        Ok(states)
    }

    /// Ties keep the smaller booster count, then the earlier boosters.
    fn best_decision(
        &self,
        state: PityState,
        candidates: &[BoosterSet],
        next_value: f64,
    ) -> (f64, BoosterSet) {
        let mut best_value = f64::INFINITY;
        let mut best_set = candidates.first().copied().unwrap_or_default();
        for &set in candidates {
            let probability = self.probability_of(state, set);
            let value = if probability >= 1.0 {
                self.cost_of(set)
            } else {
                self.cost_of(set) + (1.0 - probability) * next_value
            };
            if value < best_value {
                best_value = value;
                best_set = set;
            }
        }
        (best_value, best_set)
    }

    /// A state that fails back into itself: `V = min cost / p` over the candidates.
    fn best_stationary_decision(
        &self,
        state: PityState,
        candidates: &[BoosterSet],
    ) -> Option<(f64, BoosterSet)> {
        let mut best: Option<(f64, BoosterSet)> = None;
        for &set in candidates {
            let probability = self.probability_of(state, set);
            if probability <= 0.0 {
                continue;
            }
            let value = self.cost_of(set) / probability;
            if best.is_none_or(|(best_value, _)| value < best_value) {
                best = Some((value, set));
            }
        }
        best
    }

    fn expected_consumption(&self, path: &Path) -> BTreeMap<Item, f64> {
        let mut consumption: BTreeMap<Item, f64> = BTreeMap::new();
        for step in path.iter() {
            for &(item, amount) in self.table.materials().iter() {
                *consumption.entry(item).or_insert(0.0) += step.expected_attempts * amount;
            }
            for index in step.booster_set.indices() {
                let booster = &self.table.boosters()[index];
                *consumption.entry(booster.item).or_insert(0.0) +=
                    step.expected_attempts * booster.amount_per_use;
            }
        }
        consumption
    }
}

/// Minimum expected price over every booster choice, starting with no failures.
pub fn optimize(
    table: &EnhancementTable,
    prices: &PriceTable,
    discounts: &DiscountMap,
    additional_probability: f64,
    pity_increment_per_failure: f64,
    flat_probability_bonus: f64,
) -> Result<Solution, SolverError> {
    let model = ProbabilityModel::new(
        additional_probability,
        pity_increment_per_failure,
        flat_probability_bonus,
    )?;
    RefineSolver::new(table, prices, discounts, model)?.optimize()
}

/// Expected price when `booster_use_count` boosters are used on every attempt.
pub fn fixed(
    table: &EnhancementTable,
    prices: &PriceTable,
    discounts: &DiscountMap,
    additional_probability: f64,
    pity_increment_per_failure: f64,
    flat_probability_bonus: f64,
    booster_use_count: usize,
) -> Result<Solution, SolverError> {
    let model = ProbabilityModel::new(
        additional_probability,
        pity_increment_per_failure,
        flat_probability_bonus,
    )?;
    RefineSolver::new(table, prices, discounts, model)?.fixed(booster_use_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Booster;

    const TOL: f64 = 1e-9;

    fn single_material_table(base_probability: f64, boosters: Vec<Booster>) -> EnhancementTable {
        EnhancementTable::new(base_probability, vec![(Item::GuardianStone, 100.0)], boosters)
            .unwrap()
    }

    fn prices() -> PriceTable {
        PriceTable::new()
            .with(Item::GuardianStone, 1.0)
            .unwrap()
            .with(Item::SolarGrace, 2.0)
            .unwrap()
            .with(Item::SolarProtection, 50.0)
            .unwrap()
    }

    fn grace() -> Booster {
        Booster {
            item: Item::SolarGrace,
            amount_per_use: 10.0,
            probability_bonus: 0.1,
        }
    }

    fn protection() -> Booster {
        Booster {
            item: Item::SolarProtection,
            amount_per_use: 2.0,
            probability_bonus: 0.1,
        }
    }

    fn solver(table: &EnhancementTable, model: ProbabilityModel) -> RefineSolver {
        RefineSolver::new(table, &prices(), &DiscountMap::new(), model).unwrap()
    }

    #[test]
    fn no_pity_matches_geometric_expectation() {
        let table = single_material_table(0.1, vec![]);
        let model = ProbabilityModel::new(0.0, 0.0, 0.0).unwrap();
        let solution = solver(&table, model).optimize().unwrap();
        assert_eq!(solution.price(), 100.0 / 0.1);
        assert_eq!(solution.path().len(), 1);
        assert_eq!(solution.bound(), StateBound::Stationary);
        assert!((solution.expected_attempts() - 10.0).abs() < TOL);
    }

    #[test]
    fn subset_costs_sum_their_members() {
        let table = single_material_table(0.1, vec![protection(), grace()]);
        let model = ProbabilityModel::new(0.0, 0.0, 0.0).unwrap();
        let solver = solver(&table, model);
        let both = BoosterSet::from_indices([0, 1]).unwrap();
        let grace_only = BoosterSet::from_indices([1]).unwrap();
        assert_eq!(solver.attempt_cost(BoosterSet::EMPTY), Some(100.0));
        assert_eq!(solver.attempt_cost(grace_only), Some(120.0));
        assert_eq!(solver.attempt_cost(both), Some(220.0));
        assert!((solver.booster_bonus(both).unwrap() - 0.2).abs() < TOL);
        assert_eq!(
            solver.boosters_in(both),
            vec![Item::SolarProtection, Item::SolarGrace]
        );
    }

    #[test]
    fn boosters_outside_the_table_are_rejected() {
        let table = single_material_table(0.1, vec![grace()]);
        let model = ProbabilityModel::new(0.0, 0.0, 0.0).unwrap();
        let solver = solver(&table, model);
        let foreign = BoosterSet::from_indices([3]).unwrap();
        assert_eq!(solver.attempt_cost(foreign), None);
        assert_eq!(solver.booster_bonus(foreign), None);
        assert_eq!(solver.success_probability(0, foreign), None);
        assert!(solver.boosters_in(foreign).is_empty());
    }

    #[test]
    fn cheap_booster_that_reaches_certainty_beats_efficient_one() {
        // 100 / 0.95 = 105.3, grace 101.2 / 1, protection 105 / 1, both 106.2 / 1.
        let table = single_material_table(
            0.95,
            vec![
                Booster {
                    item: Item::SolarProtection,
                    amount_per_use: 0.1,
                    probability_bonus: 0.5,
                },
                Booster {
                    item: Item::SolarGrace,
                    amount_per_use: 0.6,
                    probability_bonus: 0.05,
                },
            ],
        );
        let model = ProbabilityModel::new(0.0, 0.0, 0.0).unwrap();
        let solution = solver(&table, model).optimize().unwrap();
        assert!((solution.price() - 101.2).abs() < TOL);
        let step = solution.path().final_step().unwrap();
        assert_eq!(step.boosters, vec![Item::SolarGrace]);
        assert_eq!(solution.booster_set(0), BoosterSet::from_indices([1]));
    }

    #[test]
    fn booster_choice_changes_as_pity_grows() {
        // Protection tops up early states, grace alone suffices once pity covers the rest.
        let table = single_material_table(
            0.5,
            vec![
                Booster {
                    item: Item::SolarProtection,
                    amount_per_use: 0.1,
                    probability_bonus: 0.5,
                },
                Booster {
                    item: Item::SolarGrace,
                    amount_per_use: 0.6,
                    probability_bonus: 0.05,
                },
            ],
        );
        let model = ProbabilityModel::new(0.0, 0.45, 0.0).unwrap();
        let solution = solver(&table, model).optimize().unwrap();
        assert_eq!(solution.num_states(), 3);
        assert_eq!(solution.booster_set(0), BoosterSet::from_indices([0]));
        assert_eq!(solution.booster_set(1), BoosterSet::from_indices([1]));
        assert_eq!(solution.booster_set(2), Some(BoosterSet::EMPTY));
    }

    #[test]
    fn fixed_count_picks_cheapest_boosters_per_state() {
        let table = single_material_table(0.1, vec![protection(), grace()]);
        let model = ProbabilityModel::new(0.0, 0.0, 0.0).unwrap();
        let solution = solver(&table, model).fixed(1).unwrap();
        assert_eq!(solution.booster_set(0), BoosterSet::from_indices([1]));
        assert!((solution.price() - 600.0).abs() < TOL);
    }

    #[test]
    fn optimal_picks_cheapest_expected_cost_per_state() {
        // No pity: 100/0.1 = 1000, 120/0.2 = 600, 220/0.3 = 733.
        let table = single_material_table(0.1, vec![grace(), protection()]);
        let model = ProbabilityModel::new(0.0, 0.0, 0.0).unwrap();
        let solution = solver(&table, model).optimize().unwrap();
        assert!((solution.price() - 600.0).abs() < TOL);
        assert_eq!(solution.decision(0), Some(1));
        assert_eq!(solution.booster_set(0), BoosterSet::from_indices([0]));
    }

    #[test]
    fn certain_state_pays_one_attempt_without_boosters() {
        let table = single_material_table(0.5, vec![grace()]);
        let model = ProbabilityModel::new(0.0, 0.5, 0.0).unwrap();
        let solution = solver(&table, model).optimize().unwrap();
        assert_eq!(solution.bound(), StateBound::Certain);
        assert_eq!(solution.num_states(), 2);
        assert_eq!(solution.cost_to_go(1), Some(100.0));
        assert_eq!(solution.decision(1), Some(0));
        assert_eq!(solution.cost_to_go(2), Some(0.0));
        let last = solution.path().final_step().unwrap();
        assert_eq!(last.success_probability, 1.0);
    }

    #[test]
    fn fixed_rejects_too_many_boosters() {
        let table = single_material_table(0.1, vec![grace()]);
        let model = ProbabilityModel::new(0.0, 0.0, 0.0).unwrap();
        assert!(matches!(
            solver(&table, model).fixed(2),
            Err(SolverError::BoosterCountOutOfRange {
                requested: 2,
                max: 1
            })
        ));
    }

    #[test]
    fn booster_cap_limits_choices() {
        let table = single_material_table(0.1, vec![grace(), protection()]);
        let model = ProbabilityModel::new(0.0, 0.0, 0.0).unwrap();
        let capped = solver(&table, model).with_booster_cap(0);
        assert_eq!(capped.max_booster_uses(), 0);
        let solution = capped.optimize().unwrap();
        assert_eq!(solution.price(), 1000.0);
    }

    #[test]
    fn zero_probability_without_pity_is_unreachable() {
        let table = single_material_table(0.0, vec![]);
        let model = ProbabilityModel::new(0.0, 0.0, 0.0).unwrap();
        assert!(matches!(
            solver(&table, model).optimize(),
            Err(SolverError::SuccessUnreachable { state: 0 })
        ));
    }

    #[test]
    fn start_state_must_be_solved() {
        let table = single_material_table(0.5, vec![]);
        let model = ProbabilityModel::new(0.0, 0.25, 0.0).unwrap();
        let solver = solver(&table, model);
        assert_eq!(solver.last_state(), 2);
        assert!(solver.optimize_from(2).is_ok());
        assert!(matches!(
            solver.optimize_from(3),
            Err(SolverError::StateOutOfRange { state: 3, last: 2 })
        ));
    }

    #[test]
    fn price_equals_expected_attempts_times_costs() {
        let table = single_material_table(0.05, vec![grace(), protection()]);
        let model = ProbabilityModel::new(0.0, 0.02, 0.0).unwrap();
        let solution = solver(&table, model).optimize().unwrap();
        let replayed: f64 = solution
            .path()
            .iter()
            .map(|step| step.expected_attempts * step.attempt_cost)
            .sum();
        assert!((replayed - solution.price()).abs() < 1e-6 * solution.price());
        let stones = solution.expected_consumption()[&Item::GuardianStone];
        assert!((stones - 100.0 * solution.expected_attempts()).abs() < 1e-6);
    }
}
