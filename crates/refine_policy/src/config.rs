use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Grade, ItemType, additional_probability, resolve_table};
use crate::item::Item;
use crate::pity::{PityState, ProbabilityModel};
use crate::price::{DiscountMap, DiscountScope, PriceError, PriceTable};
use crate::solver::{RefineSolver, SolverError};
use crate::table::{EnhancementTable, TableError};

// Each failure adds a tenth of the base probability, up to the base probability.
const DEFAULT_PITY_SHARE_OF_BASE: f64 = 0.1;
const DEFAULT_MAX_PITY_SHARE_OF_BASE: f64 = 1.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Price(#[from] PriceError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// One refine computation as requested by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    #[serde(default = "default_item_type")]
    pub item_type: ItemType,
    #[serde(default = "default_grade")]
    pub grade: Grade,
    #[serde(default = "default_target")]
    pub target: u8,
    #[serde(default)]
    pub apply_research: bool,
    /// Overrides the catalog's event bonus.
    pub additional_probability: Option<f64>,
    /// Defaults to a tenth of the base probability.
    pub pity_increment_per_failure: Option<f64>,
    /// Defaults to the base probability when the increment is defaulted.
    pub max_pity_bonus: Option<f64>,
    pub guarantee_after: Option<u32>,
    #[serde(default)]
    pub flat_probability_bonus: f64,
    #[serde(default)]
    pub start_failures: PityState,
    pub max_booster_uses: Option<usize>,
    pub state_limit: Option<u32>,
    /// Falls back to the persisted or reference prices.
    pub prices: Option<PriceTable>,
    #[serde(default)]
    pub owned: BTreeMap<Item, f64>,
    #[serde(default)]
    pub discount_scope: DiscountScope,
}

fn default_item_type() -> ItemType {
    ItemType::Armor
}

fn default_grade() -> Grade {
    Grade::T3_1340
}

fn default_target() -> u8 {
    15
}

impl Default for RefineRequest {
    fn default() -> Self {
        Self {
            item_type: default_item_type(),
            grade: default_grade(),
            target: default_target(),
            apply_research: false,
            additional_probability: None,
            pity_increment_per_failure: None,
            max_pity_bonus: None,
            guarantee_after: None,
            flat_probability_bonus: 0.0,
            start_failures: 0,
            max_booster_uses: None,
            state_limit: None,
            prices: None,
            owned: BTreeMap::new(),
            discount_scope: DiscountScope::default(),
        }
    }
}

impl RefineRequest {
    pub fn table(&self) -> Result<EnhancementTable, TableError> {
        resolve_table(self.item_type, self.grade, self.target)
    }

    pub fn probability_model(
        &self,
        table: &EnhancementTable,
    ) -> Result<ProbabilityModel, SolverError> {
        let base = table.base_probability();
        let additional = self.additional_probability.unwrap_or_else(|| {
            additional_probability(self.grade, self.target, self.apply_research)
        });

        let (increment, max_pity_bonus) = match self.pity_increment_per_failure {
            Some(increment) => (increment, self.max_pity_bonus),
            None => (
                base * DEFAULT_PITY_SHARE_OF_BASE,
                Some(
                    self.max_pity_bonus
                        .unwrap_or(base * DEFAULT_MAX_PITY_SHARE_OF_BASE),
                ),
            ),
        };

        let mut model = ProbabilityModel::new(additional, increment, self.flat_probability_bonus)?;
        if let Some(max_pity_bonus) = max_pity_bonus {
            model = model.with_max_pity_bonus(max_pity_bonus)?;
        }
        if let Some(failures) = self.guarantee_after {
            model = model.with_guarantee_after(failures);
        }
        if let Some(state_limit) = self.state_limit {
            model = model.with_state_limit(state_limit)?;
        }
        Ok(model)
    }

    /// Resolve the table and build a solver; `fallback_prices` is used when
    /// the request carries none.
    pub fn build_solver(&self, fallback_prices: &PriceTable) -> Result<RefineSolver, ConfigError> {
        let table = self.table()?;
        let prices = self.prices.as_ref().unwrap_or(fallback_prices);
        let discounts = DiscountMap::from_owned(&self.owned, self.discount_scope, &table)?;
        let model = self.probability_model(&table)?;

        let mut solver = RefineSolver::new(&table, prices, &discounts, model)?;
        if let Some(cap) = self.max_booster_uses {
            solver = solver.with_booster_cap(cap);
        }
        Ok(solver)
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_request(path: &Path) -> Result<RefineRequest, ConfigError> {
    Ok(serde_json::from_str(&read_file(path)?)?)
}

/// Load a persisted price table, validating every entry.
pub fn load_price_table(path: &Path) -> Result<PriceTable, ConfigError> {
    let prices: BTreeMap<Item, f64> = serde_json::from_str(&read_file(path)?)?;
    Ok(PriceTable::from_map(prices)?)
}

pub fn save_price_table(path: &Path, prices: &PriceTable) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(prices)?;
    fs::write(path, json).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_uses_defaults() {
        let request: RefineRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.item_type, ItemType::Armor);
        assert_eq!(request.grade, Grade::T3_1340);
        assert_eq!(request.target, 15);
        assert!(request.prices.is_none());
        assert_eq!(request.discount_scope, DiscountScope::default());
    }

    #[test]
    fn default_pity_is_a_tenth_of_base_capped_at_base() {
        let request = RefineRequest::default();
        let table = request.table().unwrap();
        let model = request.probability_model(&table).unwrap();
        assert!((model.pity_increment_per_failure() - 0.01).abs() < 1e-12);
        assert!((model.pity_bonus(50) - 0.1).abs() < 1e-12);
        assert!((model.additional_probability() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn request_fields_are_camel_case() {
        let request: RefineRequest = serde_json::from_str(
            r#"{
                "itemType": "weapon",
                "grade": "t3_1390",
                "target": 21,
                "pityIncrementPerFailure": 0.003,
                "guaranteeAfter": 40,
                "owned": {"shard": 5000},
                "discountScope": {"materials": true}
            }"#,
        )
        .unwrap();
        assert_eq!(request.item_type, ItemType::Weapon);
        assert_eq!(request.grade, Grade::T3_1390);
        assert_eq!(request.guarantee_after, Some(40));
        assert!(request.discount_scope.materials);
        assert!(!request.discount_scope.breaths);

        let solver = request.build_solver(&PriceTable::market_defaults()).unwrap();
        assert_eq!(solver.last_state(), 40);
    }

    #[test]
    fn unknown_target_is_not_found() {
        let request = RefineRequest {
            target: 30,
            ..RefineRequest::default()
        };
        assert!(matches!(
            request.build_solver(&PriceTable::market_defaults()),
            Err(ConfigError::Table(TableError::NotFound { .. }))
        ));
    }

    #[test]
    fn price_table_persists_as_flat_object() {
        let dir = std::env::temp_dir()
            .join(format!("refine_policy_prices_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("prices.json");

        let prices = PriceTable::market_defaults();
        save_price_table(&path, &prices).unwrap();
        let raw: BTreeMap<String, f64> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["great_honor_leapstone"], 43.0);
        assert_eq!(load_price_table(&path).unwrap(), prices);

        fs::write(&path, r#"{"gold": -1}"#).unwrap();
        assert!(matches!(
            load_price_table(&path),
            Err(ConfigError::Price(PriceError::NegativePrice { .. }))
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
