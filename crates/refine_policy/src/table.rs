use thiserror::Error;

use crate::catalog::{Grade, ItemType};
use crate::item::Item;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("no refine table for {item_type:?} {grade:?} +{target}")]
    NotFound {
        item_type: ItemType,
        grade: Grade,
        target: u8,
    },
    #[error("base probability {value} is outside [0, 1]")]
    InvalidBaseProbability { value: f64 },
    #[error("booster {item:?} has probability bonus {value} outside [0, 1]")]
    InvalidBoosterProbability { item: Item, value: f64 },
    #[error("{item:?} has invalid amount {value}")]
    InvalidAmount { item: Item, value: f64 },
    #[error("{item:?} is listed more than once")]
    DuplicateItem { item: Item },
    #[error("{item:?} cannot be used as a booster")]
    NotABooster { item: Item },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Booster {
    pub item: Item,
    pub amount_per_use: f64,
    pub probability_bonus: f64,
}

/// One refine attempt: what it consumes and what can be added to it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementTable {
    base_probability: f64,
    materials: Vec<(Item, f64)>,
    boosters: Vec<Booster>,
}

impl EnhancementTable {
    /// Create a table with validation.
    ///
    /// Constraints enforced:
    /// - base probability and booster bonuses are finite and in [0, 1]
    /// - amounts are finite and >= 0
    /// - no item is listed twice, boosters are breaths or books
    pub fn new(
        base_probability: f64,
        materials: Vec<(Item, f64)>,
        boosters: Vec<Booster>,
    ) -> Result<Self, TableError> {
        if !is_probability(base_probability) {
            return Err(TableError::InvalidBaseProbability {
                value: base_probability,
            });
        }

        let mut seen = [false; crate::item::NUM_ITEMS];
        let mut mark = |item: Item| -> Result<(), TableError> {
            if seen[item.index()] {
                return Err(TableError::DuplicateItem { item });
            }
            seen[item.index()] = true;
            Ok(())
        };

        for &(item, amount) in materials.iter() {
            mark(item)?;
            if !amount.is_finite() || amount < 0.0 {
                return Err(TableError::InvalidAmount {
                    item,
                    value: amount,
                });
            }
        }

        for booster in boosters.iter() {
            mark(booster.item)?;
            if !booster.item.is_booster() {
                return Err(TableError::NotABooster { item: booster.item });
            }
            if !booster.amount_per_use.is_finite() || booster.amount_per_use < 0.0 {
                return Err(TableError::InvalidAmount {
                    item: booster.item,
                    value: booster.amount_per_use,
                });
            }
            if !is_probability(booster.probability_bonus) {
                return Err(TableError::InvalidBoosterProbability {
                    item: booster.item,
                    value: booster.probability_bonus,
                });
            }
        }

        Ok(Self {
            base_probability,
            materials,
            boosters,
        })
    }

    pub fn base_probability(&self) -> f64 {
        self.base_probability
    }

    pub fn materials(&self) -> &[(Item, f64)] {
        &self.materials
    }

    pub fn boosters(&self) -> &[Booster] {
        &self.boosters
    }

    pub fn max_booster_uses(&self) -> usize {
        self.boosters.len()
    }

    /// Amount consumed per attempt for a material, or per use for a booster.
    pub fn amount_of(&self, item: Item) -> Option<f64> {
        self.materials
            .iter()
            .find(|(material, _)| *material == item)
            .map(|&(_, amount)| amount)
            .or_else(|| {
                self.boosters
                    .iter()
                    .find(|booster| booster.item == item)
                    .map(|booster| booster.amount_per_use)
            })
    }
}

pub(crate) fn is_probability(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
