use serde::Serialize;

use crate::solver::SolverError;
use crate::table::is_probability;

pub const DEFAULT_STATE_LIMIT: u32 = 10_000;

// A composed probability this close to 1 counts as certain success.
const CERTAINTY_TOLERANCE: f64 = 1e-9;

/// Number of failures accumulated so far.
pub type PityState = u32;

/// How the last pity state of the solved range behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StateBound {
    /// Success is certain without boosters (or forced by hard pity).
    Certain,
    /// Pity stops growing; a failure returns to the same state.
    Stationary,
    /// The state limit was hit before success became certain.
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSpace {
    pub last: PityState,
    pub bound: StateBound,
}

impl StateSpace {
    pub fn num_states(&self) -> usize {
        self.last as usize + 1
    }
}

/// Probability bonuses that stack on top of a table's base probability.
///
/// All bonuses are additive and the sum is capped at 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilityModel {
    additional_probability: f64,
    pity_increment_per_failure: f64,
    flat_probability_bonus: f64,
    max_pity_bonus: Option<f64>,
    guarantee_after: Option<u32>,
    state_limit: u32,
}

fn validate_fraction(field: &'static str, value: f64) -> Result<(), SolverError> {
    if !is_probability(value) {
        return Err(SolverError::InvalidProbability { field, value });
    }
    Ok(())
}

impl ProbabilityModel {
    pub fn new(
        additional_probability: f64,
        pity_increment_per_failure: f64,
        flat_probability_bonus: f64,
    ) -> Result<Self, SolverError> {
        validate_fraction("additional_probability", additional_probability)?;
        validate_fraction("pity_increment_per_failure", pity_increment_per_failure)?;
        validate_fraction("flat_probability_bonus", flat_probability_bonus)?;
        Ok(Self {
            additional_probability,
            pity_increment_per_failure,
            flat_probability_bonus,
            max_pity_bonus: None,
            guarantee_after: None,
            state_limit: DEFAULT_STATE_LIMIT,
        })
    }

    /// Stop accumulating pity once the bonus reaches `max_pity_bonus`.
    pub fn with_max_pity_bonus(mut self, max_pity_bonus: f64) -> Result<Self, SolverError> {
        validate_fraction("max_pity_bonus", max_pity_bonus)?;
        self.max_pity_bonus = Some(max_pity_bonus);
        Ok(self)
    }

    /// Success is forced on the attempt made after `failures` failures.
    pub fn with_guarantee_after(mut self, failures: u32) -> Self {
        self.guarantee_after = Some(failures);
        self
    }

    pub fn with_state_limit(mut self, state_limit: u32) -> Result<Self, SolverError> {
        if state_limit == 0 {
            return Err(SolverError::InvalidStateLimit);
        }
        self.state_limit = state_limit;
        Ok(self)
    }

    pub fn additional_probability(&self) -> f64 {
        self.additional_probability
    }

    pub fn pity_increment_per_failure(&self) -> f64 {
        self.pity_increment_per_failure
    }

    pub fn flat_probability_bonus(&self) -> f64 {
        self.flat_probability_bonus
    }

    pub fn guarantee_after(&self) -> Option<u32> {
        self.guarantee_after
    }

    pub fn pity_bonus(&self, failures: PityState) -> f64 {
        let bonus = failures as f64 * self.pity_increment_per_failure;
        match self.max_pity_bonus {
            Some(max) => bonus.min(max),
            None => bonus,
        }
    }

    pub fn is_forced(&self, failures: PityState) -> bool {
        self.guarantee_after == Some(failures)
    }

    /// Success probability after `failures` failures with `booster_bonus` applied.
    pub fn success_probability(
        &self,
        base_probability: f64,
        failures: PityState,
        booster_bonus: f64,
    ) -> f64 {
        if self.is_forced(failures) {
            return 1.0;
        }
        let probability = base_probability
            + self.additional_probability
            + self.flat_probability_bonus
            + self.pity_bonus(failures)
            + booster_bonus;
        if probability >= 1.0 - CERTAINTY_TOLERANCE {
            1.0
        } else {
            probability.clamp(0.0, 1.0)
        }
    }

    fn pity_saturated(&self, failures: PityState) -> bool {
        self.pity_bonus(failures + 1) <= self.pity_bonus(failures)
    }

    /// Walk the failure counts until success is certain, pity stops moving, or the limit.
    pub fn state_space(&self, base_probability: f64) -> StateSpace {
        let mut failures: PityState = 0;
        loop {
            if self.success_probability(base_probability, failures, 0.0) >= 1.0 {
                return StateSpace {
                    last: failures,
                    bound: StateBound::Certain,
                };
            }
            if failures + 1 >= self.state_limit {
                return StateSpace {
                    last: failures,
                    bound: StateBound::Truncated,
                };
            }
            if self.guarantee_after.is_none() && self.pity_saturated(failures) {
                return StateSpace {
                    last: failures,
                    bound: StateBound::Stationary,
                };
            }
            failures += 1;
        }
    }
}
