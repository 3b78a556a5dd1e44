use serde::Serialize;

use crate::item::Item;
use crate::pity::{PityState, StateBound};

use super::state_table::StateTable;
use super::{BoosterSet, RefineSolver};

/// One attempt of the strategy, as seen from the pity state it is made in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    pub state: PityState,
    pub pity_bonus: f64,
    pub boosters_used: usize,
    pub boosters: Vec<Item>,
    #[serde(skip)]
    pub booster_set: BoosterSet,
    pub attempt_cost: f64,
    pub success_probability: f64,
    /// Chance that every earlier attempt failed.
    pub reach_probability: f64,
    /// Expected number of attempts made in this state.
    pub expected_attempts: f64,
    pub cost_to_go: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathStep> {
        self.steps.iter()
    }

    pub fn final_step(&self) -> Option<&PathStep> {
        self.steps.last()
    }
}

/// Replay the solved decisions from `start` to the last state.
///
/// Must ensure `start <= last`.
pub(super) fn reconstruct(
    solver: &RefineSolver,
    states: &StateTable,
    start: PityState,
    last: PityState,
    bound: StateBound,
) -> Path {
    let mut steps = Vec::with_capacity((last - start) as usize + 1);
    let mut reach_probability = 1.0;

    for state in start..=last {
        let booster_set = states.decision(state);
        let success_probability = solver.probability_of(state, booster_set);
        // The last state of a non-certain range repeats until it succeeds.
        let expected_attempts = if state == last && bound != StateBound::Certain {
            reach_probability / success_probability
        } else {
            reach_probability
        };

        steps.push(PathStep {
            state,
            pity_bonus: solver.model().pity_bonus(state),
            boosters_used: booster_set.len(),
            boosters: solver.boosters_in(booster_set),
            booster_set,
            attempt_cost: solver.cost_of(booster_set),
            success_probability,
            reach_probability,
            expected_attempts,
            cost_to_go: states.value(state),
        });

        reach_probability *= 1.0 - success_probability;
    }

    Path { steps }
}
