use crate::pity::PityState;

use super::BoosterSet;

/// Cost-to-go and chosen boosters for every pity state.
pub(super) struct StateTable {
    values: Vec<f64>,
    decisions: Vec<BoosterSet>,
}

impl StateTable {
    pub(super) fn new(last: PityState) -> Self {
        let size = last as usize + 1;
        Self {
            values: vec![f64::NAN; size],
            decisions: vec![BoosterSet::EMPTY; size],
        }
    }

    /// Output is NAN if the state has not been solved.
    pub(super) fn value(&self, state: PityState) -> f64 {
        self.values[state as usize]
    }

    pub(super) fn decision(&self, state: PityState) -> BoosterSet {
        self.decisions[state as usize]
    }

    pub(super) fn set(&mut self, state: PityState, value: f64, decision: BoosterSet) {
        let index = state as usize;
        self.values[index] = value;
        self.decisions[index] = decision;
    }

    pub(super) fn into_parts(self) -> (Vec<f64>, Vec<BoosterSet>) {
        (self.values, self.decisions)
    }
}
